//! Contact intake: from a raw form body to a delivered notification.

pub mod pipeline;
pub mod rate_limit;
pub mod submission;
pub mod template;
pub mod transport;

pub use pipeline::{ContactPipeline, Receipt, SUCCESS_MESSAGE};
pub use rate_limit::{
    FixedWindowLimiter, InMemoryRateLimitStore, RateDecision, RateLimitRecord, RateLimitStore,
};
pub use submission::{SanitizedSubmission, Submission};
pub use template::OutboundMessage;
pub use transport::{MailTransport, SmtpMailer};
