use serde::{Deserialize, Serialize};

use crate::domain::{Filter, PageSize, Role, Sort, SortDirection, SortField, UserStatus};

/// Response header carrying the number of records that match a list query.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Storage key under which the whole user collection is persisted.
pub const USERS_STORAGE_KEY: &str = "users";

/// Query string of `GET {base}`. Absent parameters are omitted from the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortDirection>,
}

impl ListQuery {
    pub fn new(page: u32, page_size: PageSize, filter: &Filter, sort: Sort) -> Self {
        let limit = page_size.limit();
        let search = filter.search.trim();
        Self {
            page: limit.map(|_| page.max(1)),
            limit,
            search: (!search.is_empty()).then(|| search.to_string()),
            role: filter.role,
            status: filter.status,
            sort_by: Some(sort.field),
            order: Some(sort.direction),
        }
    }

    /// Same filters and ordering without paging; used to count matches.
    pub fn unpaged(&self) -> Self {
        Self {
            page: None,
            limit: None,
            ..self.clone()
        }
    }

    pub fn filter(&self) -> Filter {
        Filter {
            search: self.search.clone().unwrap_or_default(),
            role: self.role,
            status: self.status,
        }
    }

    pub fn sort(&self) -> Sort {
        let default = Sort::default();
        Sort::new(
            self.sort_by.unwrap_or(default.field),
            self.order.unwrap_or(default.direction),
        )
    }

    pub fn page_size(&self) -> PageSize {
        self.limit
            .and_then(PageSize::limited)
            .unwrap_or(PageSize::All)
    }

    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}
