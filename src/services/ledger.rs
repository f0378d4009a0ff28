//! Fine and payment ledger
//!
//! Records payment intents against fines and settles them on the gateway's
//! confirmation. A failed settlement changes nothing on the fine or the
//! member; a successful one marks the fine paid and reactivates the member
//! account.

use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{AccountStatus, PaymentStatus},
        fine::{Fine, Payment},
    },
    repository::Repository,
    services::notifier::{dispatch, NotificationEvent, NotificationSink},
};

#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
    sink: Arc<dyn NotificationSink>,
}

impl LedgerService {
    pub fn new(repository: Repository, sink: Arc<dyn NotificationSink>) -> Self {
        Self { repository, sink }
    }

    /// Record a payment intent for an unpaid fine under the gateway's
    /// reference.
    pub async fn create_payment_intent(
        &self,
        fine_id: i32,
        external_ref: &str,
    ) -> AppResult<Payment> {
        let now = Utc::now();

        let mut tx = self.repository.pool.begin().await?;

        let fine = self.repository.fines.get_by_id_tx(&mut tx, fine_id).await?;
        if fine.is_paid {
            return Err(AppError::InvalidTransition(format!(
                "Fine {} is already settled",
                fine_id
            )));
        }

        if self
            .repository
            .fines
            .payment_ref_exists(&mut tx, external_ref)
            .await?
        {
            return Err(AppError::BadRequest(format!(
                "Payment reference {} is already in use",
                external_ref
            )));
        }

        let payment = self
            .repository
            .fines
            .insert_payment(&mut tx, fine_id, external_ref, now)
            .await?;

        tx.commit().await?;

        tracing::info!(fine_id, external_ref, "Payment intent recorded");
        Ok(payment)
    }

    /// Settle a payment intent with the gateway outcome. On success the
    /// fine is marked paid and the member reactivated; any successful fine
    /// payment reactivates unconditionally.
    pub async fn confirm_payment(&self, external_ref: &str, succeeded: bool) -> AppResult<Payment> {
        let now = Utc::now();
        let mut events: Vec<NotificationEvent> = Vec::new();

        let mut tx = self.repository.pool.begin().await?;

        let payment = self
            .repository
            .fines
            .get_payment_by_ref(&mut tx, external_ref)
            .await?;
        if payment.status != PaymentStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Payment {} is already {:?}",
                external_ref, payment.status
            )));
        }

        let fine = self
            .repository
            .fines
            .get_by_id_tx(&mut tx, payment.fine_id)
            .await?;

        if succeeded {
            self.repository
                .fines
                .settle_payment(&mut tx, payment.id, PaymentStatus::Confirmed, now)
                .await?;
            self.repository.fines.mark_paid(&mut tx, fine.id).await?;
            self.repository
                .users
                .set_account_status(&mut tx, fine.user_id, AccountStatus::Active)
                .await?;

            let content = format!("Payment of {} received, thank you", fine.amount);
            self.repository
                .notifications
                .insert(&mut tx, fine.user_id, "payment_received", &content)
                .await?;
            events.push(NotificationEvent::new(fine.user_id, "payment_received", content));
        } else {
            self.repository
                .fines
                .settle_payment(&mut tx, payment.id, PaymentStatus::Failed, now)
                .await?;

            let content = format!("Payment of {} failed; your fine is still due", fine.amount);
            self.repository
                .notifications
                .insert(&mut tx, fine.user_id, "payment_failed", &content)
                .await?;
            events.push(NotificationEvent::new(fine.user_id, "payment_failed", content));
        }

        tx.commit().await?;
        dispatch(self.sink.clone(), events);

        Ok(Payment {
            status: if succeeded {
                PaymentStatus::Confirmed
            } else {
                PaymentStatus::Failed
            },
            settled_at: Some(now),
            ..payment
        })
    }

    /// Fines for a user, unpaid first
    pub async fn list_user_fines(&self, user_id: i32) -> AppResult<Vec<Fine>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.fines.list_for_user(user_id).await
    }
}
