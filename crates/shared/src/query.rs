//! Filtering, ordering and paging over an in-memory slice of records.
//!
//! Both the local store and the mock REST collection answer list requests with
//! [`run`], so the two backends agree on ordering and totals.

use std::cmp::Ordering;

use crate::domain::{Filter, PageSize, Sort, SortDirection, SortField, UserRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPage {
    pub records: Vec<UserRecord>,
    pub total_count: usize,
}

pub fn run(
    records: &[UserRecord],
    page: u32,
    page_size: PageSize,
    filter: &Filter,
    sort: Sort,
) -> QueryPage {
    let mut matching: Vec<&UserRecord> = records.iter().filter(|r| filter.matches(r)).collect();
    matching.sort_by(|a, b| compare(a, b, sort));
    let total_count = matching.len();

    let records = match page_size {
        PageSize::All => matching.into_iter().cloned().collect(),
        PageSize::Limited(rows) => {
            let rows = rows as usize;
            let offset = (page.max(1) as usize - 1).saturating_mul(rows);
            matching
                .into_iter()
                .skip(offset)
                .take(rows)
                .cloned()
                .collect()
        }
    };

    QueryPage {
        records,
        total_count,
    }
}

fn compare(a: &UserRecord, b: &UserRecord, sort: Sort) -> Ordering {
    let ordering = match sort.field {
        SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortField::Email => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
        SortField::Role => a.role.cmp(&b.role),
        SortField::Status => a.status.cmp(&b.status),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
    // stable tie-break so pages never overlap
    .then_with(|| compare_ids(a, b));

    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn compare_ids(a: &UserRecord, b: &UserRecord) -> Ordering {
    match (a.id.numeric(), b.id.numeric()) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => a.id.cmp(&b.id),
    }
}
