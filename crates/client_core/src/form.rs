use std::sync::Arc;

use shared::domain::{NewUser, Role, UserId, UserPatch, UserRecord, UserStatus};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    data_source::{DataSource, DataSourceError},
    list_controller::ListController,
    notice::Notice,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Closed,
    Create,
    Edit(UserId),
}

/// Field values as typed into the modal. `role: None` is the unselected
/// placeholder option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Option<Role>,
    pub status: UserStatus,
}

impl FormFields {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            name: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            role: Some(record.role),
            status: record.status,
        }
    }

    /// Required fields and email shape, the same checks an HTML form applies
    /// before submitting.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::Required(field));
            }
        }
        if !looks_like_email(self.email.trim()) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("the form is not open")]
    NotOpen,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("could not save user: {0}")]
    Backend(#[from] DataSourceError),
}

impl SubmitError {
    pub fn notice(&self) -> Notice {
        Notice::error(self.to_string())
    }
}

/// Create/edit modal state.
pub struct FormController {
    source: Arc<dyn DataSource>,
    default_role: Role,
    mode: FormMode,
    fields: FormFields,
}

impl FormController {
    pub fn new(source: Arc<dyn DataSource>, default_role: Role) -> Self {
        Self {
            source,
            default_role,
            mode: FormMode::Closed,
            fields: FormFields::default(),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_open(&self) -> bool {
        self.mode != FormMode::Closed
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FormFields {
        &mut self.fields
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Edit(_) => "Edit User",
            _ => "Add New User",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::Edit(_) => "Save Changes",
            _ => "Add User",
        }
    }

    pub fn open_create(&mut self) {
        self.mode = FormMode::Create;
        self.fields = FormFields::default();
    }

    /// Opens the modal pre-filled with the stored user. The modal stays closed
    /// when the user cannot be loaded.
    pub async fn open_edit(&mut self, id: &UserId) -> Result<(), Notice> {
        match self.source.get(id).await {
            Ok(Some(record)) => {
                self.fields = FormFields::from_record(&record);
                self.mode = FormMode::Edit(id.clone());
                Ok(())
            }
            Ok(None) => {
                warn!(%id, "cannot edit missing user");
                Err(Notice::error(format!("User {id} was not found")))
            }
            Err(err) => {
                warn!(%id, %err, "failed to load user for editing");
                Err(Notice::error(format!("Could not load user: {err}")))
            }
        }
    }

    pub fn close(&mut self) {
        self.mode = FormMode::Closed;
        self.fields = FormFields::default();
    }

    /// Validates, persists, refreshes `list` and closes the modal.
    ///
    /// Invalid input keeps the modal open and touches nothing. A backend
    /// failure still closes and refreshes, and is returned so the caller can
    /// flash [`SubmitError::notice`].
    pub async fn submit(&mut self, list: &mut ListController) -> Result<UserRecord, SubmitError> {
        if !self.is_open() {
            return Err(SubmitError::NotOpen);
        }
        self.fields.validate()?;

        let fields = &self.fields;
        let role = fields.role.unwrap_or(self.default_role);
        let result = match &self.mode {
            FormMode::Edit(id) => {
                let patch = UserPatch {
                    name: Some(fields.name.trim().to_string()),
                    email: Some(fields.email.trim().to_string()),
                    phone: Some(fields.phone.trim().to_string()),
                    role: Some(role),
                    status: Some(fields.status),
                };
                self.source.update(id, &patch).await
            }
            FormMode::Create => {
                let new_user = NewUser {
                    id: None,
                    name: fields.name.trim().to_string(),
                    email: fields.email.trim().to_string(),
                    phone: fields.phone.trim().to_string(),
                    role,
                    status: fields.status,
                    created_at: None,
                };
                self.source.create(new_user).await
            }
            FormMode::Closed => return Err(SubmitError::NotOpen),
        };

        match &result {
            Ok(saved) => info!(id = %saved.id, "user saved"),
            Err(err) => warn!(%err, "failed to save user"),
        }

        self.close();
        list.refresh().await;
        result.map_err(SubmitError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> FormFields {
        FormFields {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555".into(),
            role: None,
            status: UserStatus::Active,
        }
    }

    #[test]
    fn required_fields_are_enforced() {
        let mut fields = valid();
        fields.phone = "  ".into();
        assert_eq!(fields.validate(), Err(ValidationError::Required("phone")));
    }

    #[test]
    fn email_shape_is_checked() {
        for bad in ["ada", "@example.com", "ada@", "ada@@example.com", "a da@example.com"] {
            let fields = FormFields {
                email: bad.into(),
                ..valid()
            };
            assert!(
                matches!(fields.validate(), Err(ValidationError::InvalidEmail(_))),
                "{bad} should be rejected"
            );
        }
        assert_eq!(valid().validate(), Ok(()));
    }
}
