//! Overdue sweeper: periodic batch transition of late loans
//!
//! Runs daily (and on demand) alongside live traffic. Loans are processed
//! in bounded batches, each loan in its own small transaction, so one
//! failure never blocks the run and no long lock is held. The pass is
//! idempotent: it only selects on-loan loans, and the conditional update
//! makes a re-run on an already-overdue loan a no-op.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    config::{CirculationConfig, SweeperConfig},
    error::AppResult,
    models::{enums::AccountStatus, loan::Loan},
    repository::Repository,
    services::{
        circulation::{days_late, overdue_fine},
        notifier::{dispatch, NotificationEvent, NotificationSink},
        reservations::ReservationsService,
    },
};

/// Summary of one sweep cycle
#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct SweepReport {
    pub loans_marked_overdue: u32,
    pub fines_created: u32,
    pub holds_expired: u32,
    pub reservations_promoted: u32,
    pub failures: u32,
}

#[derive(Clone)]
pub struct SweeperService {
    repository: Repository,
    circulation_config: CirculationConfig,
    config: SweeperConfig,
    sink: Arc<dyn NotificationSink>,
    reservations: ReservationsService,
}

impl SweeperService {
    pub fn new(
        repository: Repository,
        circulation_config: CirculationConfig,
        config: SweeperConfig,
        sink: Arc<dyn NotificationSink>,
        reservations: ReservationsService,
    ) -> Self {
        Self {
            repository,
            circulation_config,
            config,
            sink,
            reservations,
        }
    }

    /// One full sweep cycle: overdue pass, then hold reaping, then
    /// promotions. Reaping runs before promotions so a stale hold can
    /// never shadow a waiting member.
    pub async fn sweep(&self) -> AppResult<SweepReport> {
        let now = Utc::now();
        let mut report = SweepReport::default();

        loop {
            let batch = self
                .repository
                .loans
                .list_overdue_batch(now, self.config.batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }

            let mut progressed = false;
            for loan in &batch {
                match self.sweep_one(loan).await {
                    Ok(Some(fined)) => {
                        progressed = true;
                        report.loans_marked_overdue += 1;
                        if fined {
                            report.fines_created += 1;
                        }
                    }
                    // a concurrent return or sweep got there first
                    Ok(None) => {
                        progressed = true;
                    }
                    Err(e) => {
                        report.failures += 1;
                        tracing::warn!(loan_id = loan.id, "Overdue transition failed: {}", e);
                    }
                }
            }

            // every loan in the batch failed; bail instead of spinning on
            // the same rows
            if !progressed {
                break;
            }
        }

        let expiry_now = Utc::now();
        report.holds_expired = self.reservations.expire_stale_holds(expiry_now).await?;
        report.reservations_promoted = self.reservations.promote_available(expiry_now).await?;

        tracing::info!(
            overdue = report.loans_marked_overdue,
            fines = report.fines_created,
            holds_expired = report.holds_expired,
            promoted = report.reservations_promoted,
            failures = report.failures,
            "Sweep cycle finished"
        );

        Ok(report)
    }

    /// Transition one loan to overdue: status flip, base fine (unless one
    /// exists), member flagged inactive, notification. Returns whether a
    /// fine was created, or `None` when the loan was already settled.
    async fn sweep_one(&self, loan: &Loan) -> AppResult<Option<bool>> {
        let now = Utc::now();
        let mut events: Vec<NotificationEvent> = Vec::new();

        let mut tx = self.repository.pool.begin().await?;

        // conditional flip keeps a concurrent return or second sweeper run
        // from double-processing
        if !self.repository.loans.mark_overdue(&mut tx, loan.id).await? {
            tx.rollback().await?;
            return Ok(None);
        }

        let mut fined = false;
        if !self.repository.fines.exists_for_loan(&mut tx, loan.id).await? {
            let late = days_late(loan.due_date, now);
            let amount = overdue_fine(late, self.circulation_config.unit_fine_rate);
            self.repository
                .fines
                .insert(
                    &mut tx,
                    loan.id,
                    loan.user_id,
                    amount,
                    crate::models::enums::FineReason::Overdue,
                )
                .await?;
            fined = true;

            let content = format!(
                "Your loan is {} day(s) overdue; a fine of {} was added",
                late, amount
            );
            self.repository
                .notifications
                .insert(&mut tx, loan.user_id, "loan_overdue", &content)
                .await?;
            events.push(NotificationEvent::new(loan.user_id, "loan_overdue", content));
        }

        self.repository
            .users
            .set_account_status(&mut tx, loan.user_id, AccountStatus::Inactive)
            .await?;

        tx.commit().await?;
        dispatch(self.sink.clone(), events);

        Ok(Some(fined))
    }

    /// Spawn the periodic sweep task. The first tick fires immediately,
    /// which is harmless because the pass is idempotent.
    pub fn spawn_periodic(self) -> tokio::task::JoinHandle<()> {
        let period = std::time::Duration::from_secs(self.config.interval_hours * 3600);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::error!("Sweep cycle failed: {}", e);
                }
            }
        })
    }
}
