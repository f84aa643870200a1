use std::{collections::HashMap, fs, str::FromStr, time::Duration};

use clap::ValueEnum;
use shared::domain::{PageSize, Role};

pub const DEFAULT_API_URL: &str = "https://693e775f12c964ee6b6d71d4.mockapi.io/api/v1/users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Local,
    Remote,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend: Backend,
    pub api_url: String,
    pub database_url: String,
    pub page_size: PageSize,
    pub default_role: Role,
    pub search_debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            api_url: DEFAULT_API_URL.into(),
            database_url: "sqlite://./data/admin.db".into(),
            page_size: PageSize::default(),
            default_role: Role::Viewer,
            search_debounce_ms: 300,
        }
    }
}

impl Settings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Flag values given on the command line. They win over file and env.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub backend: Option<Backend>,
    pub api_url: Option<String>,
    pub database_url: Option<String>,
    pub page_size: Option<PageSize>,
    pub default_role: Option<Role>,
}

/// Defaults, then `admin.toml`, then environment variables, then flags.
pub fn load_settings(overrides: &Overrides) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string("admin.toml") {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    apply_flag_overrides(&mut settings, overrides);
    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(values) => values
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    toml::Value::String(text) => text,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect::<HashMap<_, _>>(),
        Err(error) => {
            tracing::warn!(%error, "ignoring admin.toml");
            return;
        }
    };
    apply_values(settings, |key| file_cfg.get(key).cloned());
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    apply_values(settings, |key| var(&format!("APP__{}", key.to_ascii_uppercase())));
}

fn apply_values(settings: &mut Settings, value: impl Fn(&str) -> Option<String>) {
    if let Some(v) = parsed(&value, "backend") {
        settings.backend = v;
    }
    if let Some(v) = value("api_url") {
        settings.api_url = v;
    }
    if let Some(v) = value("database_url") {
        settings.database_url = v;
    }
    if let Some(v) = parsed(&value, "page_size") {
        settings.page_size = v;
    }
    if let Some(v) = parsed(&value, "default_role") {
        settings.default_role = v;
    }
    if let Some(v) = parsed(&value, "search_debounce_ms") {
        settings.search_debounce_ms = v;
    }
}

fn parsed<T: FromStr>(value: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = value(key)?;
    match raw.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

fn apply_flag_overrides(settings: &mut Settings, overrides: &Overrides) {
    if let Some(backend) = overrides.backend {
        settings.backend = backend;
    }
    if let Some(api_url) = &overrides.api_url {
        settings.api_url = api_url.clone();
    }
    if let Some(database_url) = &overrides.database_url {
        settings.database_url = database_url.clone();
    }
    if let Some(page_size) = overrides.page_size {
        settings.page_size = page_size;
    }
    if let Some(role) = overrides.default_role {
        settings.default_role = role;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
