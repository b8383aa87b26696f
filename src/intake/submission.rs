//! Contact form submissions: field extraction, validation and sanitization.

use std::sync::LazyLock;

use lettre::Address;
use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;

/// Shown when the caller leaves `phone` out.
pub const PHONE_PLACEHOLDER: &str = "Not provided";

/// Shown when the caller leaves `service` out.
pub const SERVICE_PLACEHOLDER: &str = "Not specified";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// A submission whose required fields are present and whose email parses.
///
/// Field values are the caller's text, trimmed but otherwise untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub message: String,
}

impl Submission {
    /// Validate a raw request body.
    ///
    /// Non-string values count as absent. Required fields are checked before
    /// the email syntax so a blank form reports the missing fields first.
    pub fn from_raw(raw: &Value) -> Result<Self, ValidationError> {
        let name = text_field(raw, "name");
        let email = text_field(raw, "email");
        let message = text_field(raw, "message");

        let (Some(name), Some(email), Some(message)) = (name, email, message) else {
            return Err(ValidationError::MissingField);
        };

        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail);
        }

        Ok(Self {
            name,
            email,
            phone: text_field(raw, "phone").unwrap_or_else(|| PHONE_PLACEHOLDER.to_string()),
            service: text_field(raw, "service").unwrap_or_else(|| SERVICE_PLACEHOLDER.to_string()),
            message,
        })
    }

    /// Escape every field for embedding in rendered output.
    pub fn sanitized(&self) -> SanitizedSubmission {
        SanitizedSubmission {
            name: sanitize(&self.name),
            email: sanitize(&self.email),
            phone: sanitize(&self.phone),
            service: sanitize(&self.service),
            message: sanitize(&self.message),
        }
    }
}

/// Escaped copy of a [`Submission`], the only form templates accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub message: String,
}

/// `local@domain.tld` shape that the mail transport can also address.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email) && email.parse::<Address>().is_ok()
}

/// Replace `<`, `>`, `"` and `'` with HTML entities.
///
/// Ampersands are left alone, so existing entities pass through unchanged.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn text_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
