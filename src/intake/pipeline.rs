//! Contact intake pipeline: rate limit, validate, sanitize, render, deliver.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::rate_limit::{FixedWindowLimiter, RateDecision, source_key};
use super::submission::Submission;
use super::template::{self, OutboundMessage, TemplateContext};
use super::transport::MailTransport;
use crate::config::IntakeConfig;
use crate::error::{ConfigError, IntakeError, TransportError};

/// Body of a successful response.
pub const SUCCESS_MESSAGE: &str = "Email sent successfully!";

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Correlates log lines for one submission.
    pub id: Uuid,
    pub confirmation_sent: bool,
    pub message: &'static str,
}

/// The intake pipeline. Cheap to clone; clones share the limiter and transport.
#[derive(Clone)]
pub struct ContactPipeline {
    config: Arc<IntakeConfig>,
    limiter: FixedWindowLimiter,
    transport: Arc<dyn MailTransport>,
}

impl ContactPipeline {
    pub fn new(
        config: Arc<IntakeConfig>,
        limiter: FixedWindowLimiter,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            config,
            limiter,
            transport,
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn limiter(&self) -> &FixedWindowLimiter {
        &self.limiter
    }

    /// Process one submission from `source`.
    ///
    /// The quota is charged before the body is looked at, so rejected and
    /// malformed submissions still count against the source.
    pub async fn submit(&self, source: Option<&str>, raw: &Value) -> Result<Receipt, IntakeError> {
        let id = Uuid::new_v4();
        let source_id = source_key(source);

        if let RateDecision::Limited { count } = self.limiter.check(source).await {
            warn!(submission_id = %id, source = source_id, count, "Submission rate limited");
            return Err(IntakeError::RateLimited {
                source_id: source_id.to_string(),
                quota: self.limiter.quota(),
            });
        }

        let submission = Submission::from_raw(raw).inspect_err(|e| {
            info!(submission_id = %id, source = source_id, reason = %e, "Submission rejected");
        })?;

        let creds = self.config.credentials().inspect_err(|e| {
            error!(submission_id = %id, error = %e, "Missing email configuration");
        })?;
        let recipient = self
            .config
            .operator_mailbox()
            .ok_or_else(|| ConfigError::MissingEnvVar("GMAIL_USER".into()))?;

        let safe = submission.sanitized();
        let ctx = TemplateContext {
            company_name: &self.config.company_name,
            sender: &creds.username,
            received_at: Utc::now(),
            utc_offset: self.config.utc_offset,
        };

        let notification = template::notification(&ctx, &safe, &submission.email, recipient);
        self.dispatch(&notification).await.inspect_err(|e| {
            error!(submission_id = %id, error = %e, "Error sending email");
        })?;
        info!(submission_id = %id, source = source_id, "Notification delivered");

        let mut confirmation_sent = false;
        if self.config.send_confirmation {
            let confirmation = template::confirmation(&ctx, &safe, &submission.email);
            match self.dispatch(&confirmation).await {
                Ok(()) => confirmation_sent = true,
                // Best-effort: the notification already went out.
                Err(e) => {
                    warn!(submission_id = %id, error = %e, "Confirmation email failed")
                }
            }
        }

        Ok(Receipt {
            id,
            confirmation_sent,
            message: SUCCESS_MESSAGE,
        })
    }

    /// One send attempt bounded by the configured deadline.
    async fn dispatch(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let deadline = self.config.dispatch_timeout;
        tokio::time::timeout(deadline, self.transport.send(message))
            .await
            .map_err(|_| TransportError::Timeout(deadline))?
    }
}
