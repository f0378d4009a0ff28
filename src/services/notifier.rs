//! Notification sink: fire-and-forget delivery of circulation events
//!
//! The circulation core emits events through the `NotificationSink` trait
//! and never inspects delivery outcome. The audit row lives in the owning
//! transaction (see `repository::notifications`); delivery is spawned after
//! commit, and a delivery failure is logged, never propagated.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    repository::users::UsersRepository,
};

/// One emitted circulation event, collected during a transaction and
/// dispatched after commit
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub user_id: i32,
    pub kind: &'static str,
    pub content: String,
}

impl NotificationEvent {
    pub fn new(user_id: i32, kind: &'static str, content: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            content: content.into(),
        }
    }
}

/// Delivery capability consumed by the circulation core
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: i32, kind: &str, content: &str) -> AppResult<()>;
}

/// Spawn delivery of the given events and forget about them. Failures are
/// logged; the caller's transaction has already committed.
pub fn dispatch(sink: Arc<dyn NotificationSink>, events: Vec<NotificationEvent>) {
    if events.is_empty() {
        return;
    }

    tokio::spawn(async move {
        for event in events {
            if let Err(e) = sink.notify(event.user_id, event.kind, &event.content).await {
                tracing::warn!(
                    user_id = event.user_id,
                    kind = event.kind,
                    "Notification delivery failed: {}",
                    e
                );
            }
        }
    });
}

/// SMTP-backed sink. Resolves the member's address and sends a plain-text
/// mail per event; when delivery is disabled it only traces.
#[derive(Clone)]
pub struct SmtpNotificationSink {
    config: EmailConfig,
    users: UsersRepository,
}

impl SmtpNotificationSink {
    pub fn new(config: EmailConfig, users: UsersRepository) -> Self {
        Self { config, users }
    }

    fn build_mailer(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(builder.build())
    }
}

#[async_trait]
impl NotificationSink for SmtpNotificationSink {
    async fn notify(&self, user_id: i32, kind: &str, content: &str) -> AppResult<()> {
        if !self.config.enabled {
            tracing::debug!(user_id, kind, "SMTP delivery disabled, skipping");
            return Ok(());
        }

        let user = self.users.get_by_id(user_id).await?;
        let Some(address) = user.email else {
            tracing::debug!(user_id, kind, "Member has no email address, skipping");
            return Ok(());
        };

        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Calliope");
        let from_mailbox =
            Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
                .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;
        let to_mailbox = Mailbox::from_str(&address)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let subject = match kind {
            "loan_created" => "Your loan is confirmed",
            "loan_renewed" => "Your loan was renewed",
            "loan_returned" => "Return received",
            "loan_overdue" => "Your loan is overdue",
            "fine_issued" => "A fine was added to your account",
            "hold_ready" => "A reserved book is waiting for you",
            "payment_received" => "Payment received",
            "payment_failed" => "Payment failed",
            _ => "Library notification",
        };

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(content.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer = self.build_mailer()?;
        mailer
            .send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_delivers_each_event() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut mock = MockNotificationSink::new();
        mock.expect_notify().times(2).returning(move |user_id, kind, _| {
            tx.send((user_id, kind.to_string())).unwrap();
            Ok(())
        });

        dispatch(
            Arc::new(mock),
            vec![
                NotificationEvent::new(1, "loan_created", "a"),
                NotificationEvent::new(2, "hold_ready", "b"),
            ],
        );

        assert_eq!(rx.recv().await.unwrap(), (1, "loan_created".to_string()));
        assert_eq!(rx.recv().await.unwrap(), (2, "hold_ready".to_string()));
    }

    #[tokio::test]
    async fn dispatch_survives_delivery_failure() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut mock = MockNotificationSink::new();
        mock.expect_notify().times(2).returning(move |user_id, _, _| {
            tx.send(user_id).unwrap();
            if user_id == 1 {
                Err(AppError::Internal("smtp down".to_string()))
            } else {
                Ok(())
            }
        });

        dispatch(
            Arc::new(mock),
            vec![
                NotificationEvent::new(1, "loan_overdue", "a"),
                NotificationEvent::new(2, "loan_overdue", "b"),
            ],
        );

        // the failed first delivery does not stop the second
        assert_eq!(rx.recv().await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), 2);
    }
}
