use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Identifier of a user record.
///
/// Remote collections hand out string ids while older local stores used plain
/// integers, so deserialization accepts either and keeps the textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id when it is one; used to allocate the next id.
    pub fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Number(number) => Self(number.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "Admin")]
    Admin,
    #[serde(alias = "Editor")]
    Editor,
    #[serde(alias = "Viewer")]
    Viewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Editor, Role::Viewer];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    /// Capitalized form shown in the role badge.
    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Editor => "Editor",
            Role::Viewer => "Viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseDomainError::new("role", s))
    }
}

/// Account status. Written as `"active"` / `"inactive"`; legacy booleans and
/// capitalized labels are accepted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }

    pub fn is_active(self) -> bool {
        self == UserStatus::Active
    }

    pub fn toggled(self) -> Self {
        match self {
            UserStatus::Active => UserStatus::Inactive,
            UserStatus::Inactive => UserStatus::Active,
        }
    }
}

impl From<bool> for UserStatus {
    fn from(active: bool) -> Self {
        if active {
            UserStatus::Active
        } else {
            UserStatus::Inactive
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "true" => Ok(UserStatus::Active),
            "inactive" | "false" => Ok(UserStatus::Inactive),
            _ => Err(ParseDomainError::new("status", s)),
        }
    }
}

impl<'de> Deserialize<'de> for UserStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawStatus {
            Flag(bool),
            Text(String),
        }

        match RawStatus::deserialize(deserializer)? {
            RawStatus::Flag(active) => Ok(active.into()),
            RawStatus::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseDomainError {
    kind: &'static str,
    value: String,
}

impl ParseDomainError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

/// Body of a create request. The backend fills in `id` and `created_at` when
/// they are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewUser {
    pub fn into_record(self, id: UserId, now: DateTime<Utc>) -> UserRecord {
        UserRecord {
            id: self.id.unwrap_or(id),
            name: self.name,
            email: self.email,
            phone: self.phone,
            role: self.role,
            status: self.status,
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

/// Partial update; only the fields that are `Some` are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl UserPatch {
    pub fn status(status: UserStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, record: &mut UserRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(email) = &self.email {
            record.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            record.phone = phone.clone();
        }
        if let Some(role) = self.role {
            record.role = role;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub search: String,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.role.is_none() && self.status.is_none()
    }

    /// Case-insensitive substring match on name or email, plus exact role and
    /// status matches when those are set.
    pub fn matches(&self, record: &UserRecord) -> bool {
        let needle = self.search.trim().to_lowercase();
        let search_ok = needle.is_empty()
            || record.name.to_lowercase().contains(&needle)
            || record.email.to_lowercase().contains(&needle);
        let role_ok = self.role.map_or(true, |role| role == record.role);
        let status_ok = self.status.map_or(true, |status| status == record.status);
        search_ok && role_ok && status_ok
    }

    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Search(search) => self.search = search,
            FilterUpdate::Role(role) => self.role = role,
            FilterUpdate::Status(status) => self.status = status,
        }
    }
}

/// One component of a [`Filter`]; `None` means "any".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    Search(String),
    Role(Option<Role>),
    Status(Option<UserStatus>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    Email,
    Role,
    Status,
    CreatedAt,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Email => "email",
            SortField::Role => "role",
            SortField::Status => "status",
            SortField::CreatedAt => "createdAt",
        }
    }
}

impl FromStr for SortField {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "name" => Ok(SortField::Name),
            "email" => Ok(SortField::Email),
            "role" => Ok(SortField::Role),
            "status" => Ok(SortField::Status),
            "createdat" | "created" => Ok(SortField::CreatedAt),
            _ => Err(ParseDomainError::new("sort field", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(ParseDomainError::new("sort direction", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::new(SortField::CreatedAt, SortDirection::Asc)
    }
}

/// Rows per page, or every matching row on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Limited(u32),
    All,
}

impl PageSize {
    /// Rejects zero; a page always holds at least one row.
    pub fn limited(rows: u32) -> Option<Self> {
        (rows >= 1).then_some(PageSize::Limited(rows))
    }

    pub fn limit(self) -> Option<u32> {
        match self {
            PageSize::Limited(rows) => Some(rows),
            PageSize::All => None,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Limited(5)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Limited(rows) => write!(f, "{rows}"),
            PageSize::All => f.write_str("all"),
        }
    }
}

impl FromStr for PageSize {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(PageSize::All);
        }
        trimmed
            .parse::<u32>()
            .ok()
            .and_then(PageSize::limited)
            .ok_or_else(|| ParseDomainError::new("page size", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, email: &str, role: Role, status: UserStatus) -> UserRecord {
        UserRecord {
            id: UserId::from(1),
            name: name.to_string(),
            email: email.to_string(),
            phone: String::new(),
            role,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn user_id_accepts_numbers_and_strings() {
        let from_number: UserId = serde_json::from_str("7").expect("number id");
        let from_text: UserId = serde_json::from_str("\"7\"").expect("text id");
        assert_eq!(from_number, from_text);
        assert_eq!(serde_json::to_string(&from_number).expect("json"), "\"7\"");
    }

    #[test]
    fn status_reads_legacy_shapes_and_writes_canonical_text() {
        let flag: UserStatus = serde_json::from_str("false").expect("bool");
        let label: UserStatus = serde_json::from_str("\"Active\"").expect("label");
        assert_eq!(flag, UserStatus::Inactive);
        assert_eq!(label, UserStatus::Active);
        assert_eq!(
            serde_json::to_string(&UserStatus::Inactive).expect("json"),
            "\"inactive\""
        );
    }

    #[test]
    fn record_without_status_defaults_to_active() {
        let json = r#"{"id":"3","name":"Ada","email":"ada@example.com","phone":"1","role":"admin","createdAt":"2024-05-01T10:00:00Z"}"#;
        let parsed: UserRecord = serde_json::from_str(json).expect("record");
        assert_eq!(parsed.status, UserStatus::Active);
        assert_eq!(parsed.role, Role::Admin);
    }

    #[test]
    fn filter_matches_name_or_email_case_insensitively() {
        let filter = Filter {
            search: "ADA".into(),
            ..Filter::default()
        };
        assert!(filter.matches(&record("Ada Lovelace", "x@y.z", Role::Viewer, UserStatus::Active)));
        assert!(filter.matches(&record("Someone", "ada@y.z", Role::Viewer, UserStatus::Active)));
        assert!(!filter.matches(&record("Grace", "grace@y.z", Role::Viewer, UserStatus::Active)));
    }

    #[test]
    fn filter_role_and_status_are_exact() {
        let filter = Filter {
            search: String::new(),
            role: Some(Role::Admin),
            status: Some(UserStatus::Inactive),
        };
        assert!(filter.matches(&record("a", "a@b.c", Role::Admin, UserStatus::Inactive)));
        assert!(!filter.matches(&record("a", "a@b.c", Role::Admin, UserStatus::Active)));
        assert!(!filter.matches(&record("a", "a@b.c", Role::Editor, UserStatus::Inactive)));
    }

    #[test]
    fn patch_merges_only_supplied_fields() {
        let mut target = record("Ada", "ada@b.c", Role::Viewer, UserStatus::Active);
        UserPatch {
            email: Some("new@b.c".into()),
            role: Some(Role::Editor),
            ..UserPatch::default()
        }
        .apply_to(&mut target);
        assert_eq!(target.name, "Ada");
        assert_eq!(target.email, "new@b.c");
        assert_eq!(target.role, Role::Editor);
    }

    #[test]
    fn page_size_rejects_zero() {
        assert_eq!(PageSize::limited(0), None);
        assert!("0".parse::<PageSize>().is_err());
        assert_eq!("all".parse::<PageSize>(), Ok(PageSize::All));
        assert_eq!("10".parse::<PageSize>(), Ok(PageSize::Limited(10)));
    }

    #[test]
    fn unknown_values_name_the_rejected_input() {
        let err = "owner".parse::<Role>().expect_err("unknown role");
        assert_eq!(err.to_string(), "unknown role 'owner'");
        let err: Box<dyn std::error::Error> = Box::new("maybe".parse::<UserStatus>().expect_err("status"));
        assert_eq!(err.to_string(), "unknown status 'maybe'");
    }
}
