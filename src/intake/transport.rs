//! Outbound mail transport: trait seam and the SMTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use super::template::OutboundMessage;
use crate::config::{IntakeConfig, MailCredentials};
use crate::error::TransportError;

/// Port on which the relay speaks TLS from the first byte.
const SMTPS_PORT: u16 = 465;

/// Anything that can deliver a rendered message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one message. Single attempt, no retry.
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}

/// SMTP delivery via lettre's blocking transport.
pub struct SmtpMailer {
    transport: Option<SmtpTransport>,
    host: String,
}

impl SmtpMailer {
    /// Build a mailer from service configuration.
    ///
    /// Without credentials the mailer is created but every send fails; the
    /// pipeline reports that case as a configuration error before sending.
    pub fn from_config(config: &IntakeConfig) -> Result<Self, TransportError> {
        let transport = match config.credentials() {
            Ok(creds) => Some(build_transport(
                &config.smtp_host,
                config.smtp_port,
                &creds,
                config.dispatch_timeout,
            )?),
            Err(_) => None,
        };

        Ok(Self {
            transport,
            host: config.smtp_host.clone(),
        })
    }
}

fn build_transport(
    host: &str,
    port: u16,
    creds: &MailCredentials,
    timeout: Duration,
) -> Result<SmtpTransport, TransportError> {
    let builder = if port == SMTPS_PORT {
        SmtpTransport::relay(host)
    } else {
        SmtpTransport::starttls_relay(host)
    }
    .map_err(|e| TransportError::Relay(e.to_string()))?;

    Ok(builder
        .port(port)
        .credentials(Credentials::new(
            creds.username.clone(),
            creds.password.expose_secret().to_string(),
        ))
        .timeout(Some(timeout))
        .build())
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let transport = self
            .transport
            .clone()
            .ok_or_else(|| TransportError::Relay(format!("no credentials for {}", self.host)))?;
        let email = build_message(message)?;
        let recipient = message.recipient.clone();

        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| TransportError::Join(e.to_string()))?
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        tracing::info!(to = %recipient, "Email sent");
        Ok(())
    }
}

/// Convert a rendered message into a MIME message.
///
/// Messages with a plain-text body go out as `multipart/alternative`.
pub fn build_message(message: &OutboundMessage) -> Result<Message, TransportError> {
    let from = Mailbox::new(Some(message.from_name.clone()), parse_address(&message.from)?);
    let mut builder = Message::builder()
        .from(from)
        .to(parse_mailbox(&message.recipient)?)
        .subject(message.subject.as_str());

    if let Some(reply_to) = &message.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }

    let built = match &message.text_body {
        Some(text) => builder.multipart(MultiPart::alternative_plain_html(
            text.clone(),
            message.html_body.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone()),
    };

    built.map_err(|e| TransportError::Build(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    parse_address(address).map(|addr| Mailbox::new(None, addr))
}

fn parse_address(address: &str) -> Result<Address, TransportError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| TransportError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
