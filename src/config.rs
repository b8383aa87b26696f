//! Configuration types.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use secrecy::SecretString;

use crate::error::ConfigError;

/// Submissions allowed per source within one window.
pub const DEFAULT_RATE_LIMIT: u32 = 5;

/// Length of one rate-limit window.
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Account identifier and application credential for the mail provider.
#[derive(Debug, Clone)]
pub struct MailCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Intake service configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Mail account (also the sender address). `None` disables delivery.
    pub mail_user: Option<String>,
    /// Application password for the mail account.
    pub mail_password: Option<SecretString>,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Notification recipient; falls back to `mail_user`.
    pub operator_mailbox: Option<String>,
    /// Send a thank-you message to the submitter after a successful notification.
    pub send_confirmation: bool,
    /// Display name used in From headers and the confirmation template.
    pub company_name: String,
    pub rate_limit: u32,
    pub rate_window: Duration,
    /// Deadline for a single outbound send.
    pub dispatch_timeout: Duration,
    /// How often expired rate-limit records are evicted.
    pub sweep_interval: Duration,
    /// Zone used for the timestamp printed in rendered messages.
    pub utc_offset: FixedOffset,
    pub port: u16,
    pub cors_allow_any: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            mail_user: None,
            mail_password: None,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            operator_mailbox: None,
            send_confirmation: false,
            company_name: "CodeX Infotech".to_string(),
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: DEFAULT_RATE_WINDOW,
            dispatch_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(300),
            utc_offset: ist(),
            port: 3000,
            cors_allow_any: false,
        }
    }
}

impl IntakeConfig {
    /// Build config from environment variables.
    ///
    /// Missing mail credentials are not an error here; they surface per
    /// submission so the site keeps serving while an operator fixes them.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mail_user = non_empty_var("GMAIL_USER");
        let mail_password = non_empty_var("GMAIL_APP_PASSWORD").map(SecretString::from);

        let utc_offset = match parse_var::<i32>("CONTACT_UTC_OFFSET_MINUTES")? {
            Some(minutes) => offset_from_minutes(minutes)?,
            None => defaults.utc_offset,
        };

        let rate_limit = parse_var("CONTACT_RATE_LIMIT")?.unwrap_or(defaults.rate_limit);
        if rate_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CONTACT_RATE_LIMIT".into(),
                message: "must be at least 1".into(),
            });
        }

        let sweep_interval = parse_var("CONTACT_SWEEP_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);
        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "CONTACT_SWEEP_INTERVAL_SECS".into(),
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            mail_user,
            mail_password,
            smtp_host: non_empty_var("CONTACT_SMTP_HOST").unwrap_or(defaults.smtp_host),
            smtp_port: parse_var("CONTACT_SMTP_PORT")?.unwrap_or(defaults.smtp_port),
            operator_mailbox: non_empty_var("CONTACT_OPERATOR_MAILBOX"),
            send_confirmation: flag_var("SEND_CONFIRMATION"),
            company_name: non_empty_var("CONTACT_COMPANY_NAME").unwrap_or(defaults.company_name),
            rate_limit,
            rate_window: parse_var("CONTACT_RATE_WINDOW_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_window),
            dispatch_timeout: parse_var("CONTACT_DISPATCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.dispatch_timeout),
            sweep_interval,
            utc_offset,
            port: parse_var("CONTACT_PORT")?.unwrap_or(defaults.port),
            cors_allow_any: flag_var("CONTACT_CORS_ALLOW_ANY"),
        })
    }

    /// Credentials for the mail provider, or the missing variable's name.
    pub fn credentials(&self) -> Result<MailCredentials, ConfigError> {
        let username = self
            .mail_user
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("GMAIL_USER".into()))?;
        let password = self
            .mail_password
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("GMAIL_APP_PASSWORD".into()))?;
        Ok(MailCredentials { username, password })
    }

    /// Where notifications are delivered.
    pub fn operator_mailbox(&self) -> Option<&str> {
        self.operator_mailbox
            .as_deref()
            .or(self.mail_user.as_deref())
    }
}

/// Offset east of UTC; must lie strictly within one day.
fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, ConfigError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "CONTACT_UTC_OFFSET_MINUTES".into(),
            message: format!("{minutes} is out of range"),
        })
}

/// India Standard Time, +05:30.
fn ist() -> FixedOffset {
    FixedOffset::east_opt(330 * 60).unwrap_or_else(|| Utc.fix())
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn flag_var(key: &str) -> bool {
    non_empty_var(key).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn parse_var<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}
