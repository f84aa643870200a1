use async_trait::async_trait;
use shared::{
    domain::{Filter, NewUser, PageSize, Sort, UserId, UserPatch, UserRecord},
    protocol::USERS_STORAGE_KEY,
    query,
};
use storage::Storage;
use tracing::{debug, warn};

use crate::data_source::{DataSource, DataSourceError, ListPage};

/// Data source over the local key/value store; the whole collection lives as
/// one JSON array under a single key.
#[derive(Clone)]
pub struct LocalDataSource {
    storage: Storage,
    key: String,
}

impl LocalDataSource {
    pub fn new(storage: Storage) -> Self {
        Self::with_key(storage, USERS_STORAGE_KEY)
    }

    pub fn with_key(storage: Storage, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[async_trait]
impl DataSource for LocalDataSource {
    async fn list(
        &self,
        page: u32,
        page_size: PageSize,
        filter: &Filter,
        sort: Sort,
    ) -> Result<ListPage, DataSourceError> {
        let users = self.storage.load_users(&self.key).await?;
        let page = query::run(&users, page, page_size, filter, sort);
        debug!(
            key = %self.key,
            returned = page.records.len(),
            total = page.total_count,
            "listed local users"
        );
        Ok(page)
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, DataSourceError> {
        Ok(self.storage.insert_user(&self.key, user).await?)
    }

    async fn update(&self, id: &UserId, patch: &UserPatch) -> Result<UserRecord, DataSourceError> {
        match self.storage.update_user(&self.key, id, patch).await? {
            Some(updated) => Ok(updated),
            None => {
                warn!(%id, "update targeted a missing local user");
                Err(DataSourceError::NotFound(id.clone()))
            }
        }
    }

    async fn delete(&self, id: &UserId) -> Result<bool, DataSourceError> {
        Ok(self.storage.delete_user(&self.key, id).await?)
    }

    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>, DataSourceError> {
        Ok(self.storage.find_user(&self.key, id).await?)
    }
}
