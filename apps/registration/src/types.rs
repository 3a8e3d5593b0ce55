//! Domain types for the registration flow.
//!
//! This module defines the per-session interaction state, the actions that
//! drive it, and the submitted form.

use crate::services::RegistrationError;
use chrono::{DateTime, Utc};
use eventpass_core::record_store::{Gender, NewRegistration};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown when any form field is left empty.
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields.";

/// Message shown after a successful registration.
pub const REGISTERED_MESSAGE: &str = "Registration successful!";

/// The registration form as submitted by the client.
///
/// Every field defaults to empty so an incomplete submission reaches the
/// reducer (and gets a validation notice) instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    /// Full name
    pub name: String,
    /// Employee or badge identifier
    pub identifier: String,
    /// Email address
    pub email: String,
    /// One of `Male`, `Female`, `Other`
    pub gender: String,
}

/// Why a form could not be turned into a registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// At least one field is empty (or only whitespace).
    #[error("Please fill in all fields.")]
    MissingFields,

    /// The gender is not one of the offered options.
    #[error("Please choose one of Male, Female or Other.")]
    UnknownGender(String),
}

impl RegistrationForm {
    /// Validate completeness and convert into the write-side record.
    ///
    /// Fields are trimmed; a field that is empty after trimming counts as
    /// missing.
    ///
    /// # Errors
    ///
    /// - `MissingFields`: any field is empty
    /// - `UnknownGender`: the gender is not a known option
    pub fn validate(&self) -> Result<NewRegistration, FormError> {
        let name = self.name.trim();
        let identifier = self.identifier.trim();
        let email = self.email.trim();
        let gender = self.gender.trim();

        if [name, identifier, email, gender].iter().any(|f| f.is_empty()) {
            return Err(FormError::MissingFields);
        }

        let gender: Gender = gender
            .parse()
            .map_err(|_| FormError::UnknownGender(gender.to_string()))?;

        Ok(NewRegistration {
            identifier: identifier.to_string(),
            name: name.to_string(),
            gender,
            email: email.to_string(),
        })
    }
}

/// Which view the session is on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Screen {
    /// The registration form (initial)
    #[default]
    Form,
    /// The issued pass for `identifier`
    PassShown {
        /// Identifier encoded in the pass
        identifier: String,
    },
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// The action succeeded
    Success,
    /// The input was rejected before touching the store
    Warning,
    /// The store rejected or failed the action
    Error,
}

/// User-facing message attached to the session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Text to display
    pub message: String,
}

impl Notice {
    /// Success notice
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Warning notice
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    /// Error notice
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Category of the last failed submission, used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionFailure {
    /// Missing field, unknown gender or unencodable identifier
    Invalid,
    /// The identifier is already registered
    Duplicate,
    /// The record store failed
    Unavailable,
}

/// Per-session interaction state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassState {
    /// Current view
    pub screen: Screen,
    /// Message from the last interaction
    pub notice: Option<Notice>,
    /// A registration is being written
    pub submitting: bool,
    /// Outcome category of the last rejected submission
    pub last_failure: Option<SubmissionFailure>,
    /// When the current pass was issued
    pub issued_at: Option<DateTime<Utc>>,
    /// Downloads of the current pass from this session
    pub downloads: u32,
}

impl PassState {
    /// Identifier of the pass on screen, if any.
    #[must_use]
    pub fn pass_identifier(&self) -> Option<&str> {
        match &self.screen {
            Screen::PassShown { identifier } => Some(identifier),
            Screen::Form => None,
        }
    }
}

/// Actions for the pass reducer.
///
/// Commands come from HTTP handlers; the remaining variants are produced by
/// effects and fed back into the same session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassAction {
    // Commands
    /// Submit the registration form
    Submit {
        /// The submitted form
        form: RegistrationForm,
    },
    /// Download the pass on screen (triggers accounting)
    DownloadRequested,
    /// Leave the pass view and start over
    RegisterAnother,

    // Effect outcomes
    /// The registration record was written
    Registered {
        /// Registered identifier
        identifier: String,
    },
    /// The registration was rejected or failed
    RegistrationFailed {
        /// Why
        error: RegistrationError,
    },
    /// Download accounting finished (successfully or not)
    DownloadRecorded {
        /// Identifier whose counter was incremented
        identifier: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, identifier: &str, email: &str, gender: &str) -> RegistrationForm {
        RegistrationForm {
            name: name.to_string(),
            identifier: identifier.to_string(),
            email: email.to_string(),
            gender: gender.to_string(),
        }
    }

    #[test]
    fn test_validate_complete_form() {
        let registration = form(" John Doe ", "EMP12345", "john@example.com", "male").validate();

        assert_eq!(
            registration,
            Ok(NewRegistration {
                identifier: "EMP12345".to_string(),
                name: "John Doe".to_string(),
                gender: Gender::Male,
                email: "john@example.com".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert_eq!(
            form("John", "  ", "john@example.com", "Male").validate(),
            Err(FormError::MissingFields)
        );
        assert_eq!(
            RegistrationForm::default().validate(),
            Err(FormError::MissingFields)
        );
    }

    #[test]
    fn test_validate_rejects_unknown_gender() {
        assert!(matches!(
            form("John", "EMP1", "john@example.com", "robot").validate(),
            Err(FormError::UnknownGender(g)) if g == "robot"
        ));
    }

    #[test]
    fn test_form_missing_json_fields_default_to_empty() {
        let parsed: RegistrationForm =
            serde_json::from_str(r#"{"name":"John"}"#).unwrap_or_default();
        assert_eq!(parsed.name, "John");
        assert!(parsed.identifier.is_empty());
    }

    #[test]
    fn test_state_serialization() {
        let state = PassState {
            screen: Screen::PassShown {
                identifier: "EMP1".to_string(),
            },
            notice: Some(Notice::success(REGISTERED_MESSAGE)),
            ..PassState::default()
        };

        let json = serde_json::to_value(&state).unwrap_or_default();
        assert_eq!(json["screen"]["name"], "pass_shown");
        assert_eq!(json["screen"]["identifier"], "EMP1");
        assert_eq!(json["notice"]["level"], "success");
    }
}
