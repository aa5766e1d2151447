//! Request validation at the API boundary.
//!
//! Every create and patch payload implements [`Validate`]. Failures are
//! collected per field and surface as a single
//! [`ErrorCode::ValidationError`](crate::error::ErrorCode) whose details
//! carry the field messages.
//!
//! ```rust,ignore
//! use libris_core::validation::Validate;
//!
//! let author: NewAuthor = serde_json::from_value(body)?;
//! author.validate()?;
//! ```

pub mod rules;

use std::collections::HashMap;

use crate::error::{ErrorDetails, LibrisError};
use crate::models::{AuthorPatch, BookPatch, ClientPatch, NewAuthor, NewBook, NewClient};

use rules::{
    Email, HttpUrl, MaxLength, Range, Required, ValidationRule, EMAIL_MAX, NAME_MAX,
    PHOTO_URL_MAX, TITLE_MAX, YEAR_MAX, YEAR_MIN,
};

/// Field name to messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    fields: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: String) {
        self.fields.entry(field.to_string()).or_default().push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Run `rules` against `value`, recording every failure under `field`.
    fn check<T: ?Sized>(&mut self, field: &str, value: &T, rules: &[&dyn ValidationRule<T>]) {
        for rule in rules {
            if let Some(message) = rule.check(value) {
                self.add(field, message);
            }
        }
    }

    fn into_result(self) -> Result<(), LibrisError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

impl From<ValidationErrors> for LibrisError {
    fn from(errors: ValidationErrors) -> Self {
        let mut names: Vec<&str> = errors.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        let message = format!("Invalid fields: {}", names.join(", "));

        LibrisError::validation(message)
            .with_details(ErrorDetails::new().with_fields(errors.fields))
    }
}

/// Synchronous validation of a request payload.
pub trait Validate {
    fn validate(&self) -> Result<(), LibrisError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Shared field groups
// ═══════════════════════════════════════════════════════════════════════════════

fn name(errors: &mut ValidationErrors, field: &str, value: &str) {
    errors.check(field, value, &[&Required, &MaxLength(NAME_MAX)]);
}

fn photo_url(errors: &mut ValidationErrors, value: Option<&str>, require_http: bool) {
    let Some(url) = value else { return };
    errors.check("photoUrl", url, &[&MaxLength(PHOTO_URL_MAX)]);
    if require_http {
        errors.check("photoUrl", url, &[&HttpUrl]);
    }
}

fn email(errors: &mut ValidationErrors, value: Option<&str>) {
    if let Some(email) = value {
        errors.check("email", email, &[&MaxLength(EMAIL_MAX), &Email]);
    }
}

fn title(errors: &mut ValidationErrors, value: &str) {
    errors.check("title", value, &[&Required, &MaxLength(TITLE_MAX)]);
}

fn year(errors: &mut ValidationErrors, value: i32) {
    errors.check("yearPublished", &value, &[&Range(YEAR_MIN, YEAR_MAX)]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Payloads
// ═══════════════════════════════════════════════════════════════════════════════

impl Validate for NewAuthor {
    fn validate(&self) -> Result<(), LibrisError> {
        let mut errors = ValidationErrors::new();
        name(&mut errors, "firstName", &self.first_name);
        name(&mut errors, "lastName", &self.last_name);
        photo_url(&mut errors, self.photo_url.as_deref(), true);
        errors.into_result()
    }
}

impl Validate for AuthorPatch {
    fn validate(&self) -> Result<(), LibrisError> {
        let mut errors = ValidationErrors::new();
        if let Some(first) = &self.first_name {
            name(&mut errors, "firstName", first);
        }
        if let Some(last) = &self.last_name {
            name(&mut errors, "lastName", last);
        }
        photo_url(&mut errors, self.photo_url.as_ref().and_then(|p| p.as_deref()), true);
        errors.into_result()
    }
}

impl Validate for NewBook {
    fn validate(&self) -> Result<(), LibrisError> {
        let mut errors = ValidationErrors::new();
        title(&mut errors, &self.title);
        year(&mut errors, self.year_published);
        photo_url(&mut errors, self.photo_url.as_deref(), false);
        errors.into_result()
    }
}

impl Validate for BookPatch {
    fn validate(&self) -> Result<(), LibrisError> {
        let mut errors = ValidationErrors::new();
        if let Some(t) = &self.title {
            title(&mut errors, t);
        }
        if let Some(y) = self.year_published {
            year(&mut errors, y);
        }
        photo_url(&mut errors, self.photo_url.as_ref().and_then(|p| p.as_deref()), false);
        errors.into_result()
    }
}

impl Validate for NewClient {
    fn validate(&self) -> Result<(), LibrisError> {
        let mut errors = ValidationErrors::new();
        name(&mut errors, "firstName", &self.first_name);
        name(&mut errors, "lastName", &self.last_name);
        email(&mut errors, self.email.as_deref());
        photo_url(&mut errors, self.photo_url.as_deref(), false);
        errors.into_result()
    }
}

impl Validate for ClientPatch {
    fn validate(&self) -> Result<(), LibrisError> {
        let mut errors = ValidationErrors::new();
        if let Some(first) = &self.first_name {
            name(&mut errors, "firstName", first);
        }
        if let Some(last) = &self.last_name {
            name(&mut errors, "lastName", last);
        }
        email(&mut errors, self.email.as_ref().and_then(|e| e.as_deref()));
        photo_url(&mut errors, self.photo_url.as_ref().and_then(|p| p.as_deref()), false);
        errors.into_result()
    }
}
