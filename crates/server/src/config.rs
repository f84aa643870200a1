use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use shared::protocol::USERS_STORAGE_KEY;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub static_dir: String,
    pub collection_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3000".into(),
            database_url: "sqlite://./data/server.db".into(),
            static_dir: "./dist".into(),
            collection_key: USERS_STORAGE_KEY.into(),
        }
    }
}

/// Defaults, then `server.toml`, then environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        tracing::warn!("ignoring server.toml: expected flat string keys");
        return;
    };
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("database_url") {
        settings.database_url = v.clone();
    }
    if let Some(v) = file_cfg.get("static_dir") {
        settings.static_dir = v.clone();
    }
    if let Some(v) = file_cfg.get("collection_key") {
        settings.collection_key = v.clone();
    }
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("APP__BIND_ADDR").or_else(|| var("SERVER_BIND")) {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__DATABASE_URL").or_else(|| var("DATABASE_URL")) {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__STATIC_DIR") {
        settings.static_dir = v;
    }
    if let Some(v) = var("APP__COLLECTION_KEY") {
        settings.collection_key = v;
    }
}

/// Accepts bare file paths as well as `sqlite:` urls.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

pub fn static_dir_exists(settings: &Settings) -> bool {
    Path::new(&settings.static_dir).is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_plain_file_path_to_sqlite_url() {
        assert_eq!(
            normalize_database_url("./data/test.db"),
            "sqlite://./data/test.db"
        );
        assert_eq!(normalize_database_url("sqlite:admin.db"), "sqlite://admin.db");
        assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(normalize_database_url("  "), Settings::default().database_url);
    }

    #[test]
    fn file_overrides_replace_defaults() {
        let mut settings = Settings::default();
        apply_file_overrides(
            &mut settings,
            r#"
            bind_addr = "0.0.0.0:8080"
            static_dir = "public"
            "#,
        );
        assert_eq!(settings.server_bind, "0.0.0.0:8080");
        assert_eq!(settings.static_dir, "public");
        assert_eq!(settings.collection_key, USERS_STORAGE_KEY);
    }

    #[test]
    fn malformed_file_is_ignored() {
        let mut settings = Settings::default();
        apply_file_overrides(&mut settings, "port = 8080");
        assert_eq!(settings.server_bind, Settings::default().server_bind);
    }

    #[test]
    fn app_prefixed_env_vars_take_precedence() {
        let mut settings = Settings::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("SERVER_BIND", "127.0.0.1:9000"),
            ("APP__BIND_ADDR", "127.0.0.1:9999"),
            ("APP__COLLECTION_KEY", "staff"),
        ]);
        apply_env_overrides(&mut settings, |name| env.get(name).map(|v| v.to_string()));
        assert_eq!(settings.server_bind, "127.0.0.1:9999");
        assert_eq!(settings.collection_key, "staff");
        assert_eq!(settings.database_url, Settings::default().database_url);
    }
}
