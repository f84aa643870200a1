use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::debug;

use shared::domain::{NewUser, UserId, UserPatch, UserRecord};

/// Key/value store on SQLite. Each key holds one serialized document, the way
/// a browser's local storage does.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    write_lock: Arc<Mutex<()>>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        };
        storage.ensure_kv_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_kv_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key        TEXT PRIMARY KEY NOT NULL,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure kv_store table exists")?;
        Ok(())
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read key '{key}'"))?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write key '{key}'"))?;
        Ok(())
    }

    pub async fn remove_item(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove key '{key}'"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Loads the collection stored under `key`; a missing key is an empty collection.
    pub async fn load_users(&self, key: &str) -> Result<Vec<UserRecord>> {
        let Some(raw) = self.get_item(key).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw)
            .with_context(|| format!("stored collection under '{key}' is not a user array"))
    }

    pub async fn save_users(&self, key: &str, users: &[UserRecord]) -> Result<()> {
        let raw = serde_json::to_string(users).context("failed to serialize user collection")?;
        self.set_item(key, &raw).await
    }

    pub async fn find_user(&self, key: &str, id: &UserId) -> Result<Option<UserRecord>> {
        Ok(self
            .load_users(key)
            .await?
            .into_iter()
            .find(|user| &user.id == id))
    }

    /// Appends a user, assigning the next numeric id when the caller gave none.
    /// An explicit id that is already taken is rejected.
    pub async fn insert_user(&self, key: &str, new_user: NewUser) -> Result<UserRecord> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load_users(key).await?;

        let id = match &new_user.id {
            Some(id) => {
                anyhow::ensure!(
                    users.iter().all(|user| &user.id != id),
                    "user id '{id}' already exists"
                );
                id.clone()
            }
            None => next_user_id(&users)?,
        };

        let record = new_user.into_record(id, Utc::now());
        users.push(record.clone());
        self.save_users(key, &users).await?;
        debug!(key, id = %record.id, "inserted user");
        Ok(record)
    }

    pub async fn update_user(
        &self,
        key: &str,
        id: &UserId,
        patch: &UserPatch,
    ) -> Result<Option<UserRecord>> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load_users(key).await?;
        let Some(user) = users.iter_mut().find(|user| &user.id == id) else {
            return Ok(None);
        };
        patch.apply_to(user);
        let updated = user.clone();
        self.save_users(key, &users).await?;
        Ok(Some(updated))
    }

    pub async fn delete_user(&self, key: &str, id: &UserId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load_users(key).await?;
        let before = users.len();
        users.retain(|user| &user.id != id);
        if users.len() == before {
            return Ok(false);
        }
        self.save_users(key, &users).await?;
        Ok(true)
    }
}

fn next_user_id(users: &[UserRecord]) -> Result<UserId> {
    let highest = users.iter().filter_map(|user| user.id.numeric()).max();
    match highest {
        None => Ok(UserId::from(1)),
        Some(n) => n
            .checked_add(1)
            .map(UserId::from)
            .context("numeric user ids are exhausted"),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
