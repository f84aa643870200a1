//! List-state controller: paging, filtering, sorting and selection over a
//! [`DataSource`].
//!
//! The controller never holds an authoritative copy of the collection. It keeps
//! the page it fetched last (so export can run without another round trip) and
//! publishes a [`ListSnapshot`] on a watch channel whenever something changes,
//! including a `Loading` snapshot while a fetch is outstanding.

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use shared::domain::{
    Filter, FilterUpdate, PageSize, Sort, UserId, UserPatch, UserRecord, UserStatus,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{data_source::DataSource, debounce::Debouncer, notice::Notice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    pub page: u32,
    pub page_size: PageSize,
    pub filter: Filter,
    pub sort: Sort,
    pub selection: BTreeSet<UserId>,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: PageSize::default(),
            filter: Filter::default(),
            sort: Sort::default(),
            selection: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    /// Nothing fetched yet.
    Idle,
    Loading,
    Loaded,
    /// The backend answered with no matching records.
    Empty,
    /// The backend could not be reached or answered garbage. Rendered like
    /// `Empty`, kept distinct for callers that care.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub total_count: usize,
    pub total_pages: u32,
    /// 1-based index of the first row on the page.
    pub range_start: usize,
    /// 1-based index of the last row on the page; 0 when there are no rows.
    pub range_end: usize,
}

impl Pagination {
    pub fn compute(page: u32, page_size: PageSize, total_count: usize) -> Self {
        let page = page.max(1);
        let (total_pages, range_start, range_end) = match page_size {
            PageSize::All => (u32::from(total_count > 0), 1, total_count),
            PageSize::Limited(rows) => {
                let rows = rows.max(1) as usize;
                let total_pages = total_count.div_ceil(rows);
                let start = if total_count == 0 {
                    1
                } else {
                    (page as usize - 1) * rows + 1
                };
                let end = (start + rows - 1).min(total_count);
                (
                    u32::try_from(total_pages).unwrap_or(u32::MAX),
                    start,
                    end,
                )
            }
        };

        Self {
            page,
            total_count,
            total_pages,
            range_start,
            range_end,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot {
    pub state: ListState,
    pub phase: ListPhase,
    pub records: Vec<UserRecord>,
    pub pagination: Pagination,
    pub error: Option<String>,
}

pub struct ListController {
    source: Arc<dyn DataSource>,
    state: ListState,
    phase: ListPhase,
    records: Vec<UserRecord>,
    total_count: usize,
    last_error: Option<String>,
    observed: HashSet<UserId>,
    snapshots: watch::Sender<ListSnapshot>,
}

impl ListController {
    pub fn new(source: Arc<dyn DataSource>, page_size: PageSize) -> Self {
        Self::with_state(
            source,
            ListState {
                page_size,
                ..ListState::default()
            },
        )
    }

    pub fn with_state(source: Arc<dyn DataSource>, state: ListState) -> Self {
        let initial = ListSnapshot {
            pagination: Pagination::compute(state.page, state.page_size, 0),
            state: state.clone(),
            phase: ListPhase::Idle,
            records: Vec::new(),
            error: None,
        };
        let (snapshots, _) = watch::channel(initial);
        Self {
            source,
            state,
            phase: ListPhase::Idle,
            records: Vec::new(),
            total_count: 0,
            last_error: None,
            observed: HashSet::new(),
            snapshots,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn phase(&self) -> ListPhase {
        self.phase
    }

    /// Records of the most recently fetched page.
    pub fn records(&self) -> &[UserRecord] {
        &self.records
    }

    pub fn selection(&self) -> &BTreeSet<UserId> {
        &self.state.selection
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::compute(self.state.page, self.state.page_size, self.total_count)
    }

    pub fn snapshot(&self) -> ListSnapshot {
        ListSnapshot {
            state: self.state.clone(),
            phase: self.phase,
            records: self.records.clone(),
            pagination: self.pagination(),
            error: self.last_error.clone(),
        }
    }

    pub async fn set_filter(&mut self, update: FilterUpdate) {
        self.state.filter.apply(update);
        self.state.page = 1;
        self.fetch().await;
    }

    pub async fn set_sort(&mut self, sort: Sort) {
        self.state.sort = sort;
        self.state.page = 1;
        self.fetch().await;
    }

    pub async fn set_page_size(&mut self, page_size: PageSize) {
        self.state.page_size = page_size;
        self.state.page = 1;
        self.fetch().await;
    }

    /// Moves to page `n` when it exists; returns `false` and leaves state
    /// untouched otherwise.
    pub async fn go_to_page(&mut self, n: u32) -> bool {
        let total_pages = self.pagination().total_pages;
        if n < 1 || n > total_pages {
            debug!(requested = n, total_pages, "ignoring out-of-range page");
            return false;
        }
        self.state.page = n;
        self.fetch().await;
        true
    }

    pub async fn next_page(&mut self) -> bool {
        let next = self.state.page.saturating_add(1);
        self.go_to_page(next).await
    }

    pub async fn prev_page(&mut self) -> bool {
        let prev = self.state.page.saturating_sub(1);
        self.go_to_page(prev).await
    }

    pub async fn refresh(&mut self) {
        self.fetch().await;
    }

    /// Flips membership of `id` and returns the new membership, or `None` when
    /// the id was never shown on a page.
    pub fn toggle_select(&mut self, id: &UserId) -> Option<bool> {
        if !self.observed.contains(id) {
            debug!(%id, "ignoring selection of an id that was never rendered");
            return None;
        }
        let selected = if self.state.selection.remove(id) {
            false
        } else {
            self.state.selection.insert(id.clone());
            true
        };
        self.publish();
        Some(selected)
    }

    /// Header checkbox: makes every row on the current page match `checked`.
    pub fn toggle_select_all_on_page(&mut self, checked: bool) {
        for record in &self.records {
            if checked {
                self.state.selection.insert(record.id.clone());
            } else {
                self.state.selection.remove(&record.id);
            }
        }
        self.publish();
    }

    pub fn is_page_fully_selected(&self) -> bool {
        !self.records.is_empty()
            && self
                .records
                .iter()
                .all(|record| self.state.selection.contains(&record.id))
    }

    pub fn clear_selection(&mut self) {
        self.state.selection.clear();
        self.publish();
    }

    /// Deletes a user and refreshes the page. `Ok(false)` means the id was
    /// already gone.
    pub async fn delete_user(&mut self, id: &UserId) -> Result<bool, Notice> {
        let outcome = match self.source.delete(id).await {
            Ok(removed) => {
                self.state.selection.remove(id);
                if removed {
                    info!(%id, "user deleted");
                }
                Ok(removed)
            }
            Err(err) => {
                warn!(%id, %err, "failed to delete user");
                Err(Notice::error(format!("Could not delete user: {err}")))
            }
        };
        self.fetch().await;
        outcome
    }

    /// Flips a user's active status and refreshes the page.
    pub async fn toggle_status(&mut self, id: &UserId) -> Result<UserStatus, Notice> {
        let current = match self.records.iter().find(|record| &record.id == id) {
            Some(record) => Some(record.status),
            None => match self.source.get(id).await {
                Ok(found) => found.map(|record| record.status),
                Err(err) => {
                    warn!(%id, %err, "failed to look up user for status toggle");
                    return Err(Notice::error(format!("Could not update status: {err}")));
                }
            },
        };
        let Some(current) = current else {
            return Err(Notice::error(format!("User {id} no longer exists")));
        };

        let outcome = match self
            .source
            .update(id, &UserPatch::status(current.toggled()))
            .await
        {
            Ok(updated) => Ok(updated.status),
            Err(err) => {
                warn!(%id, %err, "failed to toggle user status");
                Err(Notice::error(format!("Could not update status: {err}")))
            }
        };
        self.fetch().await;
        outcome
    }

    /// Applies debounced search terms until the input side closes.
    pub async fn drive_search(&mut self, searches: &mut Debouncer<String>) {
        while let Some(term) = searches.next().await {
            self.set_filter(FilterUpdate::Search(term)).await;
        }
    }

    async fn fetch(&mut self) {
        loop {
            self.phase = ListPhase::Loading;
            self.publish();

            let result = self
                .source
                .list(
                    self.state.page,
                    self.state.page_size,
                    &self.state.filter,
                    self.state.sort,
                )
                .await;

            match result {
                Ok(page) => {
                    if page.records.is_empty() && self.state.page > 1 && page.total_count > 0 {
                        let last_page = Pagination::compute(
                            self.state.page,
                            self.state.page_size,
                            page.total_count,
                        )
                        .total_pages
                        .max(1);
                        let target = (self.state.page - 1).min(last_page);
                        debug!(from = self.state.page, to = target, "page emptied; retreating");
                        self.state.page = target;
                        continue;
                    }
                    if page.total_count == 0 {
                        self.state.page = 1;
                    }
                    self.observed
                        .extend(page.records.iter().map(|record| record.id.clone()));
                    self.phase = if page.records.is_empty() {
                        ListPhase::Empty
                    } else {
                        ListPhase::Loaded
                    };
                    self.records = page.records;
                    self.total_count = page.total_count;
                    self.last_error = None;
                }
                Err(err) => {
                    warn!(%err, "failed to load users");
                    self.phase = ListPhase::Failed;
                    self.records.clear();
                    self.total_count = 0;
                    self.last_error = Some(err.to_string());
                }
            }
            break;
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_ceiling_and_zero_only_when_empty() {
        for page_size in 1..=7u32 {
            for total in 0..=30usize {
                let pagination = Pagination::compute(1, PageSize::Limited(page_size), total);
                let expected = total.div_ceil(page_size as usize) as u32;
                assert_eq!(pagination.total_pages, expected);
                assert_eq!(pagination.total_pages == 0, total == 0);
            }
        }
    }

    #[test]
    fn twelve_rows_by_five_gives_three_ranges() {
        let ranges: Vec<_> = (1..=3)
            .map(|page| {
                let p = Pagination::compute(page, PageSize::Limited(5), 12);
                assert_eq!(p.total_pages, 3);
                (p.range_start, p.range_end)
            })
            .collect();
        assert_eq!(ranges, [(1, 5), (6, 10), (11, 12)]);
    }

    #[test]
    fn empty_collection_clamps_range_start() {
        let p = Pagination::compute(1, PageSize::Limited(5), 0);
        assert_eq!((p.range_start, p.range_end, p.total_pages), (1, 0, 0));
        assert!(!p.has_prev());
        assert!(!p.has_next());
    }

    #[test]
    fn all_rows_is_a_single_page() {
        let p = Pagination::compute(1, PageSize::All, 42);
        assert_eq!((p.total_pages, p.range_start, p.range_end), (1, 1, 42));
        assert_eq!(Pagination::compute(1, PageSize::All, 0).total_pages, 0);
    }
}

#[cfg(test)]
#[path = "tests/list_controller_tests.rs"]
mod controller_tests;
