use async_trait::async_trait;
use shared::domain::{Filter, NewUser, PageSize, Sort, UserId, UserPatch, UserRecord};
use thiserror::Error;

pub use shared::query::QueryPage as ListPage;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("user {0} not found")]
    NotFound(UserId),
    #[error("local storage failure: {0:#}")]
    Storage(anyhow::Error),
    #[error("unexpected backend response: {0}")]
    Decode(String),
}

impl From<anyhow::Error> for DataSourceError {
    fn from(value: anyhow::Error) -> Self {
        Self::Storage(value)
    }
}

/// Backend holding the user collection.
///
/// `list` reports the number of records matching `filter` over the whole
/// collection in [`ListPage::total_count`], independent of the requested page.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn list(
        &self,
        page: u32,
        page_size: PageSize,
        filter: &Filter,
        sort: Sort,
    ) -> Result<ListPage, DataSourceError>;

    async fn create(&self, user: NewUser) -> Result<UserRecord, DataSourceError>;

    async fn update(&self, id: &UserId, patch: &UserPatch) -> Result<UserRecord, DataSourceError>;

    async fn delete(&self, id: &UserId) -> Result<bool, DataSourceError>;

    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>, DataSourceError>;
}
