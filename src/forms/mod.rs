//! HTML form payloads and their field validation.
//!
//! Each form is the raw, string-typed body a browser submits. `clean`
//! converts it into a typed input and records every problem in a
//! [`FormErrors`] keyed by field name, so the page can be re-rendered with
//! the submitted values and one message list per field.

mod admin;
mod auth;
mod comment;
mod post;
mod profile;
pub mod validators;

pub use admin::{CategoryForm, LocationForm, VisibilityForm};
pub use auth::{LoginForm, RegistrationForm, RegistrationInput};
pub use comment::CommentForm;
pub use post::PostForm;
pub use profile::ProfileForm;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Key for errors that belong to the form as a whole
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Validation messages per field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(())` when nothing was recorded, otherwise the errors themselves
    pub fn check(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// HTML checkboxes are absent when unchecked and `on` (or a value) otherwise
pub(crate) fn checkbox(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some(v) if !v.is_empty() && v != "false" && v != "0")
}
