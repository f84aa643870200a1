use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{Filter, NewUser, PageSize, Sort, UserId, UserPatch, UserRecord},
    protocol::{ListQuery, TOTAL_COUNT_HEADER},
};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::data_source::{DataSource, DataSourceError, ListPage};

#[derive(Debug, Error)]
pub enum RemoteConfigError {
    #[error("invalid collection url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("collection url '{0}' cannot have path segments")]
    NotABase(String),
}

/// Data source over an HTTP resource collection (`GET/POST {base}`,
/// `GET/PUT/DELETE {base}/{id}`).
#[derive(Clone)]
pub struct RemoteDataSource {
    http: Client,
    base_url: Url,
}

impl RemoteDataSource {
    pub fn new(base_url: &str) -> Result<Self, RemoteConfigError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, RemoteConfigError> {
        let parsed = Url::parse(base_url).map_err(|source| RemoteConfigError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(RemoteConfigError::NotABase(base_url.to_string()));
        }
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn item_url(&self, id: &UserId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id.as_str());
        }
        url
    }

    async fn fetch_records(&self, query: &ListQuery) -> Result<Option<(Vec<UserRecord>, Option<usize>)>, DataSourceError> {
        let response = self
            .http
            .get(self.base_url.clone())
            .query(query)
            .send()
            .await?;
        // mockapi-style collections answer an empty search with 404
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let total = total_count_header(&response)?;
        let records: Vec<UserRecord> = response.json().await?;
        Ok(Some((records, total)))
    }
}

fn total_count_header(response: &Response) -> Result<Option<usize>, DataSourceError> {
    let Some(value) = response.headers().get(TOTAL_COUNT_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .map(Some)
        .ok_or_else(|| DataSourceError::Decode(format!("bad {TOTAL_COUNT_HEADER} header")))
}

#[async_trait]
impl DataSource for RemoteDataSource {
    async fn list(
        &self,
        page: u32,
        page_size: PageSize,
        filter: &Filter,
        sort: Sort,
    ) -> Result<ListPage, DataSourceError> {
        let query = ListQuery::new(page, page_size, filter, sort);
        let Some((records, header_total)) = self.fetch_records(&query).await? else {
            // a 404 past the last page says nothing about the remaining matches
            let total_count = if page > 1 && page_size != PageSize::All {
                self.fetch_records(&query.unpaged())
                    .await?
                    .map_or(0, |(all, _)| all.len())
            } else {
                0
            };
            return Ok(ListPage {
                records: Vec::new(),
                total_count,
            });
        };

        let total_count = match (header_total, page_size) {
            (Some(total), _) => total,
            (None, PageSize::All) => records.len(),
            (None, PageSize::Limited(_)) => {
                debug!("no total header; counting matches with an unpaged request");
                self.fetch_records(&query.unpaged())
                    .await?
                    .map_or(0, |(all, _)| all.len())
            }
        };

        Ok(ListPage {
            records,
            total_count,
        })
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, DataSourceError> {
        let created: UserRecord = self
            .http
            .post(self.base_url.clone())
            .json(&user)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(id = %created.id, "user added to remote collection");
        Ok(created)
    }

    async fn update(&self, id: &UserId, patch: &UserPatch) -> Result<UserRecord, DataSourceError> {
        let response = self.http.put(self.item_url(id)).json(patch).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DataSourceError::NotFound(id.clone()));
        }
        let updated: UserRecord = response.error_for_status()?.json().await?;
        info!(%id, "user updated on remote collection");
        Ok(updated)
    }

    async fn delete(&self, id: &UserId) -> Result<bool, DataSourceError> {
        let response = self.http.delete(self.item_url(id)).send().await?;
        let status = response.status();
        if status.is_success() {
            info!(%id, "user deleted from remote collection");
            return Ok(true);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(false)
    }

    async fn get(&self, id: &UserId) -> Result<Option<UserRecord>, DataSourceError> {
        let response = self.http.get(self.item_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let record: UserRecord = response.error_for_status()?.json().await?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_url_appends_escaped_id() {
        let source = RemoteDataSource::new("http://localhost:3000/api/v1/users").expect("url");
        assert_eq!(
            source.item_url(&UserId::from(7)).as_str(),
            "http://localhost:3000/api/v1/users/7"
        );
        assert_eq!(
            source.item_url(&UserId::from("a b")).as_str(),
            "http://localhost:3000/api/v1/users/a%20b"
        );
    }

    #[test]
    fn item_url_handles_trailing_slash() {
        let source = RemoteDataSource::new("http://localhost:3000/users/").expect("url");
        assert_eq!(
            source.item_url(&UserId::from(1)).as_str(),
            "http://localhost:3000/users/1"
        );
    }

    #[test]
    fn rejects_non_hierarchical_urls() {
        assert!(matches!(
            RemoteDataSource::new("mailto:admin@example.com"),
            Err(RemoteConfigError::NotABase(_))
        ));
        assert!(matches!(
            RemoteDataSource::new("not a url"),
            Err(RemoteConfigError::InvalidUrl { .. })
        ));
    }
}
