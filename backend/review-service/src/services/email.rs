//! Moderation notification emails
//!
//! Authors are told when an admin bans or restores something they wrote.
//! Delivery is best-effort from the caller's point of view; this module only
//! reports failures.

use crate::config::EmailConfig;
use crate::error::{AppError, Result};
use crate::models::ReportType;
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// SMTP sender, or a logging no-op when no host is configured
#[derive(Clone)]
pub struct SmtpEmailSender {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Unexpected(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; moderation emails will only be logged");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| AppError::Unexpected(format!("Failed to configure SMTP transport: {}", e)))?
            .port(config.smtp_port);

            let builder = match (&config.smtp_username, &config.smtp_password) {
                (Some(username), Some(password)) => {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                }
                _ => builder,
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!(subject, recipient = to, "Email sender in no-op mode; skipping send");
            return Ok(());
        };

        let recipient = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Unexpected(format!("Invalid recipient email address: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| AppError::Unexpected(format!("Failed to build email message: {}", e)))?;

        transport
            .send(email)
            .await
            .map_err(|e| AppError::Unexpected(format!("Failed to send email: {}", e)))?;

        info!(subject, "Moderation email sent");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Ban,
    Unban,
}

/// One ban/unban notice, rendered per target type
#[derive(Debug, Clone)]
pub struct ModerationNotice {
    pub action: ModerationAction,
    pub item: ReportType,
    pub username: String,
    /// What the item was written about, e.g. `movie "Heat"`
    pub context: Option<String>,
    /// Link back to the movie or series page
    pub link: Option<String>,
}

impl ModerationNotice {
    pub fn subject(&self) -> String {
        match self.action {
            ModerationAction::Ban => format!("Your {} has been removed", self.item.label()),
            ModerationAction::Unban => format!("Your {} has been restored", self.item.label()),
        }
    }

    pub fn html(&self) -> String {
        let item = self.item.label();
        let about = self
            .context
            .as_deref()
            .map(|c| format!(" on {}", escape_html(c)))
            .unwrap_or_default();

        let body = match (self.action, self.item) {
            (ModerationAction::Ban, ReportType::ReviewReply) => format!(
                "<p>A reply you posted{about} was reported by the community and has been hidden \
                 by our moderators. Replies beneath it are hidden with it.</p>"
            ),
            (ModerationAction::Ban, _) => format!(
                "<p>Your {item}{about} was reported by the community and has been hidden by our \
                 moderators for violating the community guidelines.</p>"
            ),
            (ModerationAction::Unban, _) => format!(
                "<p>After another look, our moderators restored your {item}{about}. \
                 It is visible to everyone again.</p>"
            ),
        };

        let link = self
            .link
            .as_deref()
            .map(|href| {
                let href = escape_html(href);
                format!(r#"<p><a href="{href}" style="color: #007AFF;">{href}</a></p>"#)
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <p>Hi {username},</p>
    {body}
    {link}
    <p style="color: #999; font-size: 12px; margin-top: 30px;">
        If you believe this was a mistake, reply to this email to contact support.
    </p>
</body>
</html>"#,
            username = escape_html(&self.username),
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(action: ModerationAction, item: ReportType) -> ModerationNotice {
        ModerationNotice {
            action,
            item,
            username: "mara".into(),
            context: Some("movie \"Heat\"".into()),
            link: Some("https://app.nova.dev/movies/42".into()),
        }
    }

    #[test]
    fn test_subject_per_action_and_type() {
        assert_eq!(
            notice(ModerationAction::Ban, ReportType::Review).subject(),
            "Your review has been removed"
        );
        assert_eq!(
            notice(ModerationAction::Unban, ReportType::EpisodeReview).subject(),
            "Your episode review has been restored"
        );
        assert_eq!(
            notice(ModerationAction::Ban, ReportType::ReviewReply).subject(),
            "Your reply has been removed"
        );
    }

    #[test]
    fn test_body_escapes_and_links() {
        let html = notice(ModerationAction::Ban, ReportType::Review).html();
        assert!(html.contains("Hi mara,"));
        assert!(html.contains("movie &quot;Heat&quot;"));
        assert!(html.contains(r#"href="https://app.nova.dev/movies/42""#));

        let reply = notice(ModerationAction::Ban, ReportType::ReviewReply).html();
        assert!(reply.contains("A reply you posted"));
    }

    #[test]
    fn test_body_without_link_or_context() {
        let mut n = notice(ModerationAction::Unban, ReportType::Review);
        n.context = None;
        n.link = None;
        n.username = "<script>".into();

        let html = n.html();
        assert!(html.contains("restored your review."));
        assert!(!html.contains("<a href"));
        assert!(html.contains("Hi &lt;script&gt;,"));
    }

    #[tokio::test]
    async fn test_no_op_sender_accepts_anything() {
        let config = EmailConfig {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "Nova <noreply@nova.dev>".into(),
            use_starttls: true,
            app_base_url: "https://app.nova.dev".into(),
        };
        let sender = SmtpEmailSender::new(&config).unwrap();
        assert!(!sender.is_enabled());
        sender
            .send_email("author@nova.dev", "subject", "<p>hi</p>")
            .await
            .unwrap();
    }

    #[test]
    fn test_rejects_bad_from_address() {
        let config = EmailConfig {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "not an address".into(),
            use_starttls: true,
            app_base_url: String::new(),
        };
        assert!(matches!(
            SmtpEmailSender::new(&config),
            Err(AppError::Unexpected(_))
        ));
    }
}
