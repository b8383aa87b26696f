//! Rendering of notification and confirmation messages.

use chrono::{DateTime, FixedOffset, Utc};

use super::submission::SanitizedSubmission;

/// A rendered email ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Sender display name, e.g. `Acme Website`.
    pub from_name: String,
    /// Sender address.
    pub from: String,
    pub recipient: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: String,
}

/// Inputs shared by every template.
#[derive(Debug, Clone)]
pub struct TemplateContext<'a> {
    pub company_name: &'a str,
    /// Sender mailbox.
    pub sender: &'a str,
    pub received_at: DateTime<Utc>,
    pub utc_offset: FixedOffset,
}

impl TemplateContext<'_> {
    fn long_timestamp(&self) -> String {
        self.received_at
            .with_timezone(&self.utc_offset)
            .format("%-d %B %Y at %-I:%M %p")
            .to_string()
    }

    fn short_timestamp(&self) -> String {
        self.received_at
            .with_timezone(&self.utc_offset)
            .format("%-d/%-m/%Y, %-I:%M:%S %p")
            .to_string()
    }
}

/// Notification sent to the operator mailbox.
///
/// `reply_to` is the caller's address as submitted; every rendered field comes
/// from the sanitized copy.
pub fn notification(
    ctx: &TemplateContext<'_>,
    safe: &SanitizedSubmission,
    reply_to: &str,
    recipient: &str,
) -> OutboundMessage {
    OutboundMessage {
        from_name: format!("{} Website", ctx.company_name),
        from: ctx.sender.to_string(),
        recipient: recipient.to_string(),
        reply_to: Some(reply_to.to_string()),
        subject: format!("New Inquiry from {} - {}", safe.name, safe.service),
        text_body: Some(notification_text(ctx, safe)),
        html_body: notification_html(ctx, safe),
    }
}

/// Thank-you message sent to the submitter.
pub fn confirmation(
    ctx: &TemplateContext<'_>,
    safe: &SanitizedSubmission,
    recipient: &str,
) -> OutboundMessage {
    OutboundMessage {
        from_name: ctx.company_name.to_string(),
        from: ctx.sender.to_string(),
        recipient: recipient.to_string(),
        reply_to: None,
        subject: format!("Thank you for contacting {}!", ctx.company_name),
        text_body: None,
        html_body: confirmation_html(ctx, safe),
    }
}

fn notification_text(ctx: &TemplateContext<'_>, safe: &SanitizedSubmission) -> String {
    format!(
        "New inquiry from website\n\
         ------------------------\n\
         \n\
         {name} wants to connect about {service}\n\
         \n\
         Message:\n\
         {message}\n\
         \n\
         ---\n\
         Email: {email}\n\
         Phone: {phone}\n\
         \n\
         Received: {received}\n",
        name = safe.name,
        service = safe.service,
        message = safe.message,
        email = safe.email,
        phone = safe.phone,
        received = ctx.short_timestamp(),
    )
}

fn notification_html(ctx: &TemplateContext<'_>, safe: &SanitizedSubmission) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="margin: 0; padding: 0; background-color: #ffffff; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; color: #333;">
    <table width="100%" cellpadding="0" cellspacing="0" style="max-width: 560px; margin: 0 auto; padding: 40px 20px;">
        <tr>
            <td>
                <p style="margin: 0 0 24px 0; font-size: 13px; color: #888; text-transform: uppercase; letter-spacing: 1px;">New inquiry from website</p>
                <h1 style="margin: 0 0 8px 0; font-size: 22px; font-weight: 600; color: #111;">{name}</h1>
                <p style="margin: 0 0 32px 0; font-size: 14px; color: #666;">wants to connect about <strong style="color: #333;">{service}</strong></p>
                <hr style="border: none; border-top: 1px solid #eee; margin: 0 0 24px 0;">
                <p style="margin: 0 0 8px 0; font-size: 12px; color: #888; text-transform: uppercase; letter-spacing: 0.5px;">Message</p>
                <p style="margin: 0 0 32px 0; font-size: 15px; line-height: 1.6; color: #333; white-space: pre-wrap;">{message}</p>
                <hr style="border: none; border-top: 1px solid #eee; margin: 0 0 24px 0;">
                <table width="100%" cellpadding="0" cellspacing="0" style="margin-bottom: 32px;">
                    <tr>
                        <td width="50%" style="padding: 0 0 12px 0; vertical-align: top;">
                            <p style="margin: 0 0 4px 0; font-size: 12px; color: #888;">Email</p>
                            <a href="mailto:{email}" style="font-size: 14px; color: #0066cc; text-decoration: none;">{email}</a>
                        </td>
                        <td width="50%" style="padding: 0 0 12px 0; vertical-align: top;">
                            <p style="margin: 0 0 4px 0; font-size: 12px; color: #888;">Phone</p>
                            <a href="tel:{phone}" style="font-size: 14px; color: #333; text-decoration: none;">{phone}</a>
                        </td>
                    </tr>
                </table>
                <a href="mailto:{email}?subject=Re: {service} Inquiry" style="display: inline-block; padding: 12px 24px; background-color: #111; color: #fff; font-size: 14px; font-weight: 500; text-decoration: none; border-radius: 6px;">Reply to {name}</a>
                <p style="margin: 40px 0 0 0; font-size: 12px; color: #aaa;">Received {received}</p>
            </td>
        </tr>
    </table>
</body>
</html>
"#,
        name = safe.name,
        service = safe.service,
        message = safe.message,
        email = safe.email,
        phone = safe.phone,
        received = ctx.long_timestamp(),
    )
}

fn confirmation_html(ctx: &TemplateContext<'_>, safe: &SanitizedSubmission) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
</head>
<body style="margin: 0; padding: 0; background-color: #0a0a0b; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;">
    <table width="100%" cellpadding="0" cellspacing="0" style="background-color: #0a0a0b; padding: 40px 20px;">
        <tr>
            <td align="center">
                <table width="600" cellpadding="0" cellspacing="0" style="background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%); border-radius: 16px; overflow: hidden;">
                    <tr>
                        <td style="background: linear-gradient(135deg, #3b82f6 0%, #8b5cf6 100%); padding: 30px 40px; text-align: center;">
                            <h1 style="margin: 0; color: #ffffff; font-size: 24px;">Thank You, {name}!</h1>
                        </td>
                    </tr>
                    <tr>
                        <td style="padding: 40px; color: #e5e7eb; font-size: 16px; line-height: 1.6;">
                            <p>We've received your message and appreciate you reaching out to us.</p>
                            <p>Our team will review your inquiry and get back to you within <strong>24 hours</strong>.</p>
                            <p style="margin-top: 24px;">Best regards,<br><strong>The {company} Team</strong></p>
                        </td>
                    </tr>
                </table>
            </td>
        </tr>
    </table>
</body>
</html>
"#,
        name = safe.name,
        company = ctx.company_name,
    )
}
