//! Loan manager: borrow, renew and return as atomic units of work
//!
//! Every operation that spans more than one entity runs inside a single
//! transaction; a failure at any step rolls back every mutation. The copy
//! status column arbitrates concurrent claims (see `repository::copies`),
//! and a lost race surfaces as `ConcurrentConflict` so the caller can
//! decide whether to retry the whole operation.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        enums::{AccountStatus, CopyStatus, FineReason, LoanStatus},
        loan::{Loan, LoanDetails, ReturnOutcome},
    },
    repository::Repository,
    services::{
        notifier::{dispatch, NotificationEvent, NotificationSink},
        reservations::ReservationsService,
    },
};

/// Days late for a return processed at `now`, rounded up to whole days.
/// Zero or negative means the loan came back on time.
pub fn days_late(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (now - due_date).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    (seconds + 86_399) / 86_400
}

/// Classify a return by lateness. Past `lost_threshold_days` the copy is
/// written off as lost rather than merely overdue.
pub fn classify_return(days_late: i64, lost_threshold_days: i64) -> ReturnOutcome {
    if days_late <= 0 {
        ReturnOutcome::Returned
    } else if days_late <= lost_threshold_days {
        ReturnOutcome::Overdue
    } else {
        ReturnOutcome::Lost
    }
}

/// Fine for an overdue return: at least one day's rate
pub fn overdue_fine(days_late: i64, unit_rate: Decimal) -> Decimal {
    Decimal::from(days_late.max(1)) * unit_rate
}

/// Effective loan duration: the member's policy days, optionally shortened
/// by a requested duration. A request can never extend past policy, and a
/// non-positive request falls back to policy.
pub fn effective_loan_days(requested: Option<i64>, policy_days: i64) -> i64 {
    match requested {
        Some(days) if days >= 1 => days.min(policy_days),
        _ => policy_days,
    }
}

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    config: CirculationConfig,
    sink: Arc<dyn NotificationSink>,
    reservations: ReservationsService,
}

impl CirculationService {
    pub fn new(
        repository: Repository,
        config: CirculationConfig,
        sink: Arc<dyn NotificationSink>,
        reservations: ReservationsService,
    ) -> Self {
        Self {
            repository,
            config,
            sink,
            reservations,
        }
    }

    /// Borrow a copy of a title for a member.
    ///
    /// Prefers a copy already held for the member (a promoted reservation);
    /// otherwise takes an available copy, but only when the title has no
    /// live queue. A claim lost to a concurrent request fails the whole
    /// operation; the caller may retry it once.
    pub async fn create_loan(
        &self,
        user_id: i32,
        title_id: i32,
        requested_days: Option<i64>,
    ) -> AppResult<Loan> {
        let now = Utc::now();
        let mut events: Vec<NotificationEvent> = Vec::new();

        let mut tx = self.repository.pool.begin().await?;

        let policy = self.repository.users.get_policy(&mut tx, user_id).await?;
        if policy.account_status == AccountStatus::Suspended {
            return Err(AppError::PermissionDenied(
                "Account is suspended until outstanding fines are paid".to_string(),
            ));
        }

        let live_loans = self
            .repository
            .loans
            .count_live_for_user(&mut tx, user_id)
            .await?;
        if live_loans >= policy.max_active_loans as i64 {
            return Err(AppError::LimitExceeded(format!(
                "Maximum active loans reached ({}/{})",
                live_loans, policy.max_active_loans
            )));
        }

        let title = self.repository.titles.get_by_id_tx(&mut tx, title_id).await?;

        let copy = self
            .repository
            .copies
            .find_claimable(&mut tx, title_id, user_id, now)
            .await?
            .ok_or_else(|| {
                AppError::NoCopyAvailable(format!(
                    "No copy of \"{}\" is available; place a reservation instead",
                    title.title
                ))
            })?;

        let from_reservation = copy.holds_for(user_id, now);

        if !from_reservation {
            // A live queue blocks walk-in borrowing; the queue is served by
            // staff through promotion, never bypassed silently.
            let waiters = self
                .repository
                .reservations
                .live_count_for_title(&mut tx, title_id)
                .await?;
            if waiters > 0 {
                return Err(AppError::ReservationConflict(format!(
                    "{} reservation(s) are queued for this title",
                    waiters
                )));
            }
        }

        let expected = if from_reservation {
            CopyStatus::OnHold
        } else {
            CopyStatus::Available
        };
        self.repository
            .copies
            .claim(&mut tx, copy.id, expected, now)
            .await?;

        let policy_days = if policy.loan_days > 0 {
            policy.loan_days as i64
        } else {
            self.config.default_loan_days
        };
        let due_date = now + Duration::days(effective_loan_days(requested_days, policy_days));

        let loan = self
            .repository
            .loans
            .insert(&mut tx, user_id, copy.id, title_id, now, due_date)
            .await?;

        self.repository
            .titles
            .adjust_borrowed(&mut tx, title_id, 1)
            .await?;

        if from_reservation {
            self.repository
                .reservations
                .resolve_on_borrow(&mut tx, user_id, title_id)
                .await?;
        }

        let content = format!(
            "You borrowed \"{}\", due back on {}",
            title.title,
            due_date.format("%Y-%m-%d")
        );
        self.repository
            .notifications
            .insert(&mut tx, user_id, "loan_created", &content)
            .await?;
        events.push(NotificationEvent::new(user_id, "loan_created", content));

        tx.commit().await?;
        dispatch(self.sink.clone(), events);

        tracing::info!(
            loan_id = loan.id,
            user_id,
            copy_id = copy.id,
            from_reservation,
            "Loan created"
        );

        Ok(loan)
    }

    /// Extend a loan by the renewal window, at most `max_renewals` times.
    /// Renewal is refused while other members wait on the title.
    pub async fn renew_loan(&self, loan_id: i32, user_id: i32) -> AppResult<Loan> {
        let mut events: Vec<NotificationEvent> = Vec::new();

        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.get_by_id_tx(&mut tx, loan_id).await?;
        if loan.user_id != user_id || loan.status != LoanStatus::OnLoan {
            return Err(AppError::NotFound(format!(
                "No active loan {} for user {}",
                loan_id, user_id
            )));
        }

        let queue_blocked = self
            .repository
            .reservations
            .live_exists_for_other(&mut tx, user_id, loan.title_id)
            .await?;
        if queue_blocked {
            return Err(AppError::ReservationConflict(
                "Another member is waiting for this title".to_string(),
            ));
        }

        if loan.renewal_count >= self.config.max_renewals {
            return Err(AppError::LimitExceeded(format!(
                "Renewal limit reached ({}/{})",
                loan.renewal_count, self.config.max_renewals
            )));
        }

        let new_due = loan.due_date + Duration::days(self.config.renewal_window_days);
        let new_count = loan.renewal_count + 1;
        self.repository
            .loans
            .renew(&mut tx, loan_id, new_due, new_count)
            .await?;

        let content = format!(
            "Your loan was renewed; new due date {}",
            new_due.format("%Y-%m-%d")
        );
        self.repository
            .notifications
            .insert(&mut tx, user_id, "loan_renewed", &content)
            .await?;
        events.push(NotificationEvent::new(user_id, "loan_renewed", content));

        tx.commit().await?;
        dispatch(self.sink.clone(), events);

        Ok(Loan {
            due_date: new_due,
            renewal_count: new_count,
            ..loan
        })
    }

    /// Process a return: classify lateness, settle the loan, fine and flag
    /// the member when late, and hand the copy to the next waiter or back
    /// to the shelf. One transaction end to end.
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<LoanDetails> {
        let now = Utc::now();
        let mut events: Vec<NotificationEvent> = Vec::new();

        let mut tx = self.repository.pool.begin().await?;

        let loan = self.repository.loans.get_by_id_tx(&mut tx, loan_id).await?;
        if !loan.status.is_live() {
            return Err(AppError::InvalidTransition(format!(
                "Loan {} is not out (status {:?})",
                loan_id, loan.status
            )));
        }

        let late = days_late(loan.due_date, now);
        let outcome = classify_return(late, self.config.lost_threshold_days);
        let loan_status = match outcome {
            ReturnOutcome::Returned => LoanStatus::Returned,
            ReturnOutcome::Overdue => LoanStatus::Overdue,
            ReturnOutcome::Lost => LoanStatus::Lost,
        };

        self.repository
            .loans
            .close(&mut tx, loan_id, loan_status, now)
            .await?;

        self.repository
            .titles
            .adjust_borrowed(&mut tx, loan.title_id, -1)
            .await?;

        let title = self
            .repository
            .titles
            .get_by_id_tx(&mut tx, loan.title_id)
            .await?;

        if outcome != ReturnOutcome::Returned {
            let (amount, reason, account_status) = match outcome {
                ReturnOutcome::Lost => (title.price, FineReason::Lost, AccountStatus::Suspended),
                _ => (
                    overdue_fine(late, self.config.unit_fine_rate),
                    FineReason::Overdue,
                    AccountStatus::Inactive,
                ),
            };

            // One fine per loan: the sweeper may already have created it
            if !self.repository.fines.exists_for_loan(&mut tx, loan_id).await? {
                self.repository
                    .fines
                    .insert(&mut tx, loan_id, loan.user_id, amount, reason)
                    .await?;

                let content = format!(
                    "A fine of {} was added for \"{}\" ({} day(s) late)",
                    amount, title.title, late
                );
                self.repository
                    .notifications
                    .insert(&mut tx, loan.user_id, "fine_issued", &content)
                    .await?;
                events.push(NotificationEvent::new(loan.user_id, "fine_issued", content));
            }

            self.repository
                .users
                .set_account_status(&mut tx, loan.user_id, account_status)
                .await?;
        }

        if outcome == ReturnOutcome::Lost {
            // A written-off copy never circulates again
            self.repository
                .copies
                .release(&mut tx, loan.copy_id, CopyStatus::Lost)
                .await?;
        } else {
            self.repository
                .copies
                .release(&mut tx, loan.copy_id, CopyStatus::Available)
                .await?;

            if let Some(next) = self
                .repository
                .reservations
                .peek_next(&mut tx, loan.title_id)
                .await?
            {
                self.reservations
                    .promote(&mut tx, &mut events, &next, loan.copy_id, now)
                    .await?;
            }
        }

        let content = format!("Return of \"{}\" processed", title.title);
        self.repository
            .notifications
            .insert(&mut tx, loan.user_id, "loan_returned", &content)
            .await?;
        events.push(NotificationEvent::new(loan.user_id, "loan_returned", content));

        tx.commit().await?;
        dispatch(self.sink.clone(), events);

        tracing::info!(loan_id, outcome = ?outcome, days_late = late, "Loan returned");

        self.repository.loans.get_details(loan_id).await
    }

    /// Get a loan with joined detail
    pub async fn get_loan(&self, loan_id: i32) -> AppResult<LoanDetails> {
        self.repository.loans.get_details(loan_id).await
    }

    /// Get loans for a user
    pub async fn list_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.list_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn on_time_return_is_not_late() {
        let due = Utc::now();
        assert_eq!(days_late(due, due - Duration::hours(5)), 0);
        assert_eq!(days_late(due, due), 0);
    }

    #[test]
    fn lateness_rounds_up_to_whole_days() {
        let due = Utc::now();
        assert_eq!(days_late(due, due + Duration::hours(1)), 1);
        assert_eq!(days_late(due, due + Duration::days(1)), 1);
        assert_eq!(days_late(due, due + Duration::days(4) + Duration::hours(12)), 5);
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(classify_return(0, 30), ReturnOutcome::Returned);
        assert_eq!(classify_return(1, 30), ReturnOutcome::Overdue);
        assert_eq!(classify_return(30, 30), ReturnOutcome::Overdue);
        assert_eq!(classify_return(31, 30), ReturnOutcome::Lost);
    }

    #[test]
    fn overdue_fine_charges_at_least_one_day() {
        let rate = dec!(0.50);
        assert_eq!(overdue_fine(0, rate), dec!(0.50));
        assert_eq!(overdue_fine(1, rate), dec!(0.50));
        assert_eq!(overdue_fine(5, rate), dec!(2.50));
    }

    #[test]
    fn requested_duration_is_capped_at_policy() {
        assert_eq!(effective_loan_days(None, 21), 21);
        assert_eq!(effective_loan_days(Some(7), 21), 7);
        assert_eq!(effective_loan_days(Some(90), 21), 21);
        assert_eq!(effective_loan_days(Some(0), 21), 21);
        assert_eq!(effective_loan_days(Some(-3), 21), 21);
    }

    #[test]
    fn five_days_late_scenario() {
        // due 5 days ago, returned today: overdue, 5 x unit rate
        let now = Utc::now();
        let late = days_late(now - Duration::days(5), now);
        assert_eq!(late, 5);
        assert_eq!(classify_return(late, 30), ReturnOutcome::Overdue);
        assert_eq!(overdue_fine(late, dec!(0.50)), dec!(2.50));
    }

    #[test]
    fn thirty_five_days_late_scenario() {
        // due 35 days ago, returned today: lost
        let now = Utc::now();
        let late = days_late(now - Duration::days(35), now);
        assert_eq!(classify_return(late, 30), ReturnOutcome::Lost);
    }
}
