//! Field rules used by the request validators.

use regex::Regex;
use std::sync::LazyLock;

/// Email validation regex (RFC 5322 simplified).
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("Invalid email regex")
});

/// http(s) URL validation regex.
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)$"
    ).expect("Invalid URL regex")
});

pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 255;
pub const TITLE_MAX: usize = 255;
pub const PHOTO_URL_MAX: usize = 500;
pub const YEAR_MIN: i32 = 0;
pub const YEAR_MAX: i32 = 9999;

/// A single rule applied to one field value.
pub trait ValidationRule<T: ?Sized> {
    /// Returns a message when the value breaks the rule.
    fn check(&self, value: &T) -> Option<String>;
}

/// Non-blank string.
#[derive(Debug, Clone, Copy)]
pub struct Required;

impl ValidationRule<str> for Required {
    fn check(&self, value: &str) -> Option<String> {
        value
            .trim()
            .is_empty()
            .then(|| "field is required".to_string())
    }
}

/// At most N characters.
#[derive(Debug, Clone, Copy)]
pub struct MaxLength(pub usize);

impl ValidationRule<str> for MaxLength {
    fn check(&self, value: &str) -> Option<String> {
        let actual = value.chars().count();
        (actual > self.0)
            .then(|| format!("must be at most {} characters (got {})", self.0, actual))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Email;

impl ValidationRule<str> for Email {
    fn check(&self, value: &str) -> Option<String> {
        (!EMAIL_REGEX.is_match(value)).then(|| "must be a valid email address".to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HttpUrl;

impl ValidationRule<str> for HttpUrl {
    fn check(&self, value: &str) -> Option<String> {
        (!URL_REGEX.is_match(value)).then(|| "must be a valid URL".to_string())
    }
}

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy)]
pub struct Range(pub i32, pub i32);

impl ValidationRule<i32> for Range {
    fn check(&self, value: &i32) -> Option<String> {
        (!(self.0..=self.1).contains(value)).then(|| {
            format!(
                "must be between {} and {} (got {})",
                self.0, self.1, value
            )
        })
    }
}
