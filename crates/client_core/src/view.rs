//! Pure mapping from a [`ListSnapshot`] to what the table shows.

use chrono::{DateTime, Utc};
use shared::domain::UserId;

use crate::list_controller::{ListPhase, ListSnapshot};

pub const LOADING_TEXT: &str = "Loading...";
pub const EMPTY_TEXT: &str = "No users found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: UserId,
    pub selected: bool,
    pub initials: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role_label: &'static str,
    pub active: bool,
    pub status_label: &'static str,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBody {
    Loading,
    /// `failed` is set when the list could not be fetched at all.
    Empty { message: &'static str, failed: bool },
    Rows(Vec<RowView>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageButton {
    pub number: u32,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub body: TableBody,
    pub header_checked: bool,
    pub page_label: String,
    pub summary: String,
    pub page_buttons: Vec<PageButton>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

pub fn render(snapshot: &ListSnapshot) -> TableView {
    let pagination = snapshot.pagination;
    let selection = &snapshot.state.selection;

    let body = match snapshot.phase {
        ListPhase::Idle | ListPhase::Loading => TableBody::Loading,
        ListPhase::Failed => TableBody::Empty {
            message: EMPTY_TEXT,
            failed: true,
        },
        ListPhase::Empty | ListPhase::Loaded if snapshot.records.is_empty() => TableBody::Empty {
            message: EMPTY_TEXT,
            failed: false,
        },
        ListPhase::Empty | ListPhase::Loaded => TableBody::Rows(
            snapshot
                .records
                .iter()
                .map(|record| RowView {
                    id: record.id.clone(),
                    selected: selection.contains(&record.id),
                    initials: initials(&record.name),
                    name: record.name.clone(),
                    email: record.email.clone(),
                    phone: record.phone.clone(),
                    role_label: record.role.label(),
                    active: record.status.is_active(),
                    status_label: record.status.label(),
                    created_at: display_timestamp(&record.created_at),
                })
                .collect(),
        ),
    };

    let header_checked = matches!(&body, TableBody::Rows(rows) if rows.iter().all(|row| row.selected));

    let summary = if pagination.total_count == 0 {
        "No users to show".to_string()
    } else {
        format!(
            "Showing {} to {} of {} users",
            pagination.range_start, pagination.range_end, pagination.total_count
        )
    };

    TableView {
        body,
        header_checked,
        page_label: format!("Page {}", pagination.page),
        summary,
        page_buttons: (1..=pagination.total_pages)
            .map(|number| PageButton {
                number,
                current: number == pagination.page,
            })
            .collect(),
        prev_enabled: pagination.has_prev(),
        next_enabled: pagination.has_next(),
    }
}

/// Avatar initials: first letter of each word, upper-cased.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn display_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeZone;
    use shared::domain::{PageSize, Role, UserRecord, UserStatus};

    use super::*;
    use crate::list_controller::{ListState, Pagination};

    fn snapshot(phase: ListPhase, records: Vec<UserRecord>, total: usize) -> ListSnapshot {
        ListSnapshot {
            state: ListState::default(),
            phase,
            pagination: Pagination::compute(1, PageSize::Limited(5), total),
            records,
            error: None,
        }
    }

    fn ada() -> UserRecord {
        UserRecord {
            id: UserId::from(1),
            name: "ada king lovelace".into(),
            email: "ada@example.com".into(),
            phone: "555".into(),
            role: Role::Editor,
            status: UserStatus::Inactive,
            created_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
        }
    }

    #[test]
    fn loading_phase_shows_placeholder() {
        let view = render(&snapshot(ListPhase::Loading, Vec::new(), 0));
        assert_eq!(view.body, TableBody::Loading);
    }

    #[test]
    fn failure_and_empty_render_the_same_message() {
        let failed = render(&snapshot(ListPhase::Failed, Vec::new(), 0));
        let empty = render(&snapshot(ListPhase::Empty, Vec::new(), 0));
        assert_eq!(
            failed.body,
            TableBody::Empty {
                message: EMPTY_TEXT,
                failed: true
            }
        );
        assert_eq!(
            empty.body,
            TableBody::Empty {
                message: EMPTY_TEXT,
                failed: false
            }
        );
        assert_eq!(empty.summary, "No users to show");
        assert!(empty.page_buttons.is_empty());
    }

    #[test]
    fn rows_carry_labels_and_selection() {
        let mut snap = snapshot(ListPhase::Loaded, vec![ada()], 12);
        snap.state.selection = BTreeSet::from([UserId::from(1)]);
        let view = render(&snap);

        let TableBody::Rows(rows) = &view.body else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].initials, "AKL");
        assert_eq!(rows[0].role_label, "Editor");
        assert_eq!(rows[0].status_label, "Inactive");
        assert!(!rows[0].active);
        assert_eq!(rows[0].created_at, "2024-03-09 14:05");
        assert!(rows[0].selected);
        assert!(view.header_checked);
        assert_eq!(view.summary, "Showing 1 to 5 of 12 users");
        assert_eq!(view.page_buttons.len(), 3);
        assert!(view.page_buttons[0].current);
        assert!(!view.prev_enabled);
        assert!(view.next_enabled);
    }
}
