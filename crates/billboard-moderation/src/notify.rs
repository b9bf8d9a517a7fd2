//! Decision notifications for the submitting user.
//!
//! There is no push infrastructure on this side: push notifications are
//! delivered as local alerts (logged). Email goes out over SMTP when it is
//! configured and is otherwise logged too.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use billboard_core::models::{BookingDetails, DecisionStatus, ModerationDecision, UserDetails};
use billboard_core::ModerationConfig;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

/// Text of the push and email notifications for one decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub push_title: String,
    pub push_body: String,
    pub email_subject: String,
    pub email_body: String,
}

impl NotificationContent {
    pub fn for_decision(
        user: &UserDetails,
        booking: &BookingDetails,
        decision: &ModerationDecision,
    ) -> Self {
        let billboard = booking
            .billboard_name
            .clone()
            .unwrap_or_else(|| "your billboard".to_string());
        let kind = booking.booking_type.to_string();

        let (push_title, push_body, email_subject) = match decision.status {
            DecisionStatus::Approved => (
                "Video approved".to_string(),
                match decision.estimated_play_time {
                    Some(ref at) => format!("Your {} will play on {} at about {}.", kind, billboard, at),
                    None => format!("Your {} will play on {} shortly.", kind, billboard),
                },
                format!("Your {} for {} has been approved", kind, billboard),
            ),
            DecisionStatus::Rejected => (
                "Video rejected".to_string(),
                format!("Your {} for {} did not pass content review.", kind, billboard),
                format!("Your {} for {} was not approved", kind, billboard),
            ),
            DecisionStatus::Pending => (
                "Video under review".to_string(),
                format!("Your {} for {} is being reviewed by our team.", kind, billboard),
                format!("Your {} for {} is under review", kind, billboard),
            ),
            DecisionStatus::Error => (
                "Video check failed".to_string(),
                "We could not check your video. Please try again later.".to_string(),
                format!("We could not check your {} for {}", kind, billboard),
            ),
        };

        let email_body = format!(
            "Hi {},\n\n{}\n\nBooking: {}\n",
            user.name, decision.message, booking.id
        );

        NotificationContent {
            push_title,
            push_body,
            email_subject,
            email_body,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_push(
        &self,
        user: &UserDetails,
        booking: &BookingDetails,
        decision: &ModerationDecision,
    ) -> Result<()>;

    async fn send_email(
        &self,
        user: &UserDetails,
        booking: &BookingDetails,
        decision: &ModerationDecision,
    ) -> Result<()>;
}

/// Delivers push notifications as local alerts and logs emails
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_push(
        &self,
        user: &UserDetails,
        booking: &BookingDetails,
        decision: &ModerationDecision,
    ) -> Result<()> {
        let content = NotificationContent::for_decision(user, booking, decision);
        tracing::info!(
            user_id = %user.id,
            booking_id = %booking.id,
            has_push_token = user.push_token.is_some(),
            title = %content.push_title,
            body = %content.push_body,
            "Local alert"
        );
        Ok(())
    }

    async fn send_email(
        &self,
        user: &UserDetails,
        booking: &BookingDetails,
        decision: &ModerationDecision,
    ) -> Result<()> {
        let content = NotificationContent::for_decision(user, booking, decision);
        tracing::info!(
            user_id = %user.id,
            booking_id = %booking.id,
            has_email = user.email.is_some(),
            subject = %content.email_subject,
            "Email notification (not sent, SMTP not configured)"
        );
        Ok(())
    }
}

/// Sends decision emails over SMTP
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl EmailNotifier {
    /// Create from config. Returns `None` if email is disabled or SMTP is not configured.
    pub fn from_config(config: &ModerationConfig) -> Option<Self> {
        if !config.email_notifications_enabled {
            tracing::debug!("Email notifications disabled (EMAIL_NOTIFICATIONS_ENABLED=false)");
            return None;
        }
        let host = config.smtp_host.as_deref()?;
        let from = config.smtp_from.clone()?;
        let port = config.smtp_port;

        let credentials = match (config.smtp_user.as_ref(), config.smtp_password.as_ref()) {
            (Some(u), Some(p)) => Some(Credentials::new(u.clone(), p.clone())),
            _ => None,
        };

        let mailer = if config.smtp_tls {
            let b = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                Ok(b) => b.port(port),
                Err(e) => {
                    tracing::error!(error = %e, host = %host, "Invalid SMTP relay, email disabled");
                    return None;
                }
            };
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            tracing::info!(host = %host, port = port, "Email notifier initialized (SMTP with STARTTLS)");
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            tracing::info!(host = %host, port = port, "Email notifier initialized (SMTP)");
            b.build()
        };

        Some(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }

    fn build_message(&self, to: &str, subject: &str, body_plain: &str) -> Result<Message> {
        let to_addr: Mailbox = to
            .parse()
            .map_err(|e| anyhow!("Invalid recipient address {}: {}", to, e))?;
        let from_addr: Mailbox = self
            .from
            .parse()
            .map_err(|e| anyhow!("Invalid SMTP_FROM: {}", e))?;

        Message::builder()
            .from(from_addr)
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body_plain.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_push(
        &self,
        user: &UserDetails,
        booking: &BookingDetails,
        decision: &ModerationDecision,
    ) -> Result<()> {
        LogNotifier.send_push(user, booking, decision).await
    }

    async fn send_email(
        &self,
        user: &UserDetails,
        booking: &BookingDetails,
        decision: &ModerationDecision,
    ) -> Result<()> {
        let Some(ref to) = user.email else {
            tracing::debug!(user_id = %user.id, "User has no email address, skipping email");
            return Ok(());
        };

        let content = NotificationContent::for_decision(user, booking, decision);
        let email = self.build_message(to, &content.email_subject, &content.email_body)?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("SMTP send failed: {}", e))?;

        tracing::info!(user_id = %user.id, booking_id = %booking.id, "Decision email sent");
        Ok(())
    }
}

/// SMTP notifier when configured, local alerts and logs otherwise
pub fn create_notifier(config: &ModerationConfig) -> Arc<dyn Notifier> {
    match EmailNotifier::from_config(config) {
        Some(email) => Arc::new(email),
        None => Arc::new(LogNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billboard_core::models::BookingType;

    fn user() -> UserDetails {
        UserDetails {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
            push_token: None,
        }
    }

    fn booking() -> BookingDetails {
        BookingDetails {
            id: "b1".to_string(),
            booking_type: BookingType::Advertisement,
            billboard_name: Some("Main St".to_string()),
            location: None,
        }
    }

    fn decision(status: DecisionStatus) -> ModerationDecision {
        ModerationDecision {
            status,
            message: "Decision message".to_string(),
            analysis_result: None,
            estimated_play_time: Some("3:05 PM".to_string()),
        }
    }

    #[test]
    fn approved_content_mentions_play_time() {
        let content =
            NotificationContent::for_decision(&user(), &booking(), &decision(DecisionStatus::Approved));
        assert_eq!(content.push_title, "Video approved");
        assert!(content.push_body.contains("3:05 PM"));
        assert!(content.push_body.contains("Main St"));
        assert!(content.email_body.starts_with("Hi Ada"));
        assert!(content.email_body.contains("Decision message"));
    }

    #[test]
    fn each_status_has_its_own_title() {
        let titles: Vec<String> = [
            DecisionStatus::Approved,
            DecisionStatus::Rejected,
            DecisionStatus::Pending,
            DecisionStatus::Error,
        ]
        .into_iter()
        .map(|s| NotificationContent::for_decision(&user(), &booking(), &decision(s)).push_title)
        .collect();
        let mut unique = titles.clone();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn email_notifier_requires_enabled_config() {
        assert!(EmailNotifier::from_config(&ModerationConfig::default()).is_none());

        let config = ModerationConfig {
            email_notifications_enabled: true,
            smtp_host: Some("localhost".to_string()),
            smtp_from: Some("noreply@example.com".to_string()),
            smtp_tls: false,
            ..Default::default()
        };
        let notifier = EmailNotifier::from_config(&config).unwrap();
        assert!(notifier
            .build_message("ada@example.com", "subject", "body")
            .is_ok());
        assert!(notifier.build_message("not an address", "s", "b").is_err());
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        let notifier = LogNotifier;
        let d = decision(DecisionStatus::Rejected);
        assert!(notifier.send_push(&user(), &booking(), &d).await.is_ok());
        assert!(notifier.send_email(&user(), &booking(), &d).await.is_ok());
    }
}
