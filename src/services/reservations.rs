//! Reservation queue service: FIFO fairness for titles with contention
//!
//! Reservations exist only for out-of-stock titles; when stock exists the
//! member must borrow directly. Promotion places a time-boxed hold on the
//! freed copy for the head of the queue; expiry is enforced lazily at
//! claim, probe and sweep time rather than by a timer per hold.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        enums::{AccountStatus, ReservationStatus},
        reservation::Reservation,
    },
    repository::Repository,
    services::notifier::{dispatch, NotificationEvent, NotificationSink},
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    config: CirculationConfig,
    sink: Arc<dyn NotificationSink>,
}

impl ReservationsService {
    pub fn new(
        repository: Repository,
        config: CirculationConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            repository,
            config,
            sink,
        }
    }

    /// Queue a member for a title with no available stock.
    pub async fn create(&self, user_id: i32, title_id: i32) -> AppResult<Reservation> {
        let now = Utc::now();

        let mut tx = self.repository.pool.begin().await?;

        let policy = self.repository.users.get_policy(&mut tx, user_id).await?;
        if policy.account_status == AccountStatus::Suspended {
            return Err(AppError::PermissionDenied(
                "Account is suspended until outstanding fines are paid".to_string(),
            ));
        }

        let title = self.repository.titles.get_by_id_tx(&mut tx, title_id).await?;

        if self
            .repository
            .reservations
            .live_exists_for_user(&mut tx, user_id, title_id)
            .await?
        {
            return Err(AppError::AlreadyQueued(format!(
                "You already have a reservation for \"{}\"",
                title.title
            )));
        }

        let available = self
            .repository
            .copies
            .available_count(&mut tx, title_id)
            .await?;
        if available > 0 {
            return Err(AppError::CopyAvailable(format!(
                "\"{}\" has {} available cop{}; borrow it directly",
                title.title,
                available,
                if available == 1 { "y" } else { "ies" }
            )));
        }

        let reservation = self
            .repository
            .reservations
            .insert(&mut tx, user_id, title_id, now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = reservation.id,
            user_id,
            title_id,
            "Reservation queued"
        );

        Ok(reservation)
    }

    /// Withdraw a reservation. Canceling a notified reservation frees the
    /// held copy, which is handed to the next waiter if one exists.
    pub async fn cancel(&self, reservation_id: i32, user_id: i32) -> AppResult<()> {
        let now = Utc::now();
        let mut events: Vec<NotificationEvent> = Vec::new();

        let mut tx = self.repository.pool.begin().await?;

        let reservation = self
            .repository
            .reservations
            .get_by_id_tx(&mut tx, reservation_id)
            .await?;
        if reservation.user_id != user_id {
            return Err(AppError::NotFound(format!(
                "Reservation with id {} not found",
                reservation_id
            )));
        }
        if !reservation.status.is_live() {
            return Err(AppError::InvalidTransition(format!(
                "Reservation {} is already {:?}",
                reservation_id, reservation.status
            )));
        }

        let was_notified = reservation.status == ReservationStatus::Notified;
        self.repository
            .reservations
            .set_status(&mut tx, reservation_id, ReservationStatus::Canceled)
            .await?;

        if was_notified {
            if let Some(copy) = self
                .repository
                .copies
                .find_held_for_user(&mut tx, reservation.title_id, user_id)
                .await?
            {
                // conditional: the member may be borrowing this very copy
                // concurrently, in which case the hold is no longer ours to
                // free and nobody gets promoted onto it
                if self
                    .repository
                    .copies
                    .release_hold(&mut tx, copy.id, user_id)
                    .await?
                {
                    if let Some(next) = self
                        .repository
                        .reservations
                        .peek_next(&mut tx, reservation.title_id)
                        .await?
                    {
                        self.promote(&mut tx, &mut events, &next, copy.id, now).await?;
                    }
                }
            }
        }

        tx.commit().await?;
        dispatch(self.sink.clone(), events);

        Ok(())
    }

    /// Promote a pending reservation onto a freed copy: the reservation
    /// becomes notified and the copy goes on hold for its member until
    /// `now + hold TTL`. Runs inside the caller's transaction.
    pub async fn promote(
        &self,
        conn: &mut sqlx::PgConnection,
        events: &mut Vec<NotificationEvent>,
        reservation: &Reservation,
        copy_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let expiry = now + Duration::days(self.config.hold_ttl_days);

        self.repository
            .copies
            .place_hold(conn, copy_id, reservation.user_id, expiry)
            .await?;
        self.repository
            .reservations
            .set_status(conn, reservation.id, ReservationStatus::Notified)
            .await?;

        let title = self
            .repository
            .titles
            .get_by_id_tx(conn, reservation.title_id)
            .await?;
        let content = format!(
            "\"{}\" is being held for you until {}",
            title.title,
            expiry.format("%Y-%m-%d %H:%M")
        );
        self.repository
            .notifications
            .insert(conn, reservation.user_id, "hold_ready", &content)
            .await?;
        events.push(NotificationEvent::new(
            reservation.user_id,
            "hold_ready",
            content,
        ));

        tracing::info!(
            reservation_id = reservation.id,
            copy_id,
            user_id = reservation.user_id,
            "Reservation promoted"
        );

        Ok(())
    }

    /// Reap every hold whose expiry has passed: the copy returns to the
    /// shelf and the backing reservation reverts to pending, keeping its
    /// original queue position. Each copy is its own small transaction so
    /// one failure does not block the rest.
    pub async fn expire_stale_holds(&self, now: DateTime<Utc>) -> AppResult<u32> {
        let mut conn = self.repository.pool.acquire().await?;
        let expired = self
            .repository
            .copies
            .list_expired_holds(&mut conn, now)
            .await?;
        drop(conn);

        let mut reaped = 0;
        for copy in expired {
            // held_by_user is always set on an on-hold copy (schema CHECK)
            let Some(held_by) = copy.held_by_user else {
                continue;
            };
            match self.expire_one(copy.id, held_by, copy.title_id).await {
                Ok(true) => reaped += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(copy_id = copy.id, "Failed to reap expired hold: {}", e);
                }
            }
        }

        Ok(reaped)
    }

    /// Returns false when a concurrent claim took the copy before the hold
    /// could be reaped.
    async fn expire_one(&self, copy_id: i32, held_by: i32, title_id: i32) -> AppResult<bool> {
        let mut tx = self.repository.pool.begin().await?;

        // release first: it takes the row lock, and losing the race to an
        // in-flight claim must leave the reservation untouched
        if !self
            .repository
            .copies
            .release_hold(&mut tx, copy_id, held_by)
            .await?
        {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(reservation) = self
            .repository
            .reservations
            .find_notified(&mut tx, held_by, title_id)
            .await?
        {
            self.repository
                .reservations
                .set_status(&mut tx, reservation.id, ReservationStatus::Pending)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(copy_id, "Expired hold reaped");
        Ok(true)
    }

    /// Match available copies to pending queues and promote the FIFO head
    /// for each. Runs after hold reaping in the sweep cycle so a stale hold
    /// can never shadow a promotion.
    pub async fn promote_available(&self, now: DateTime<Utc>) -> AppResult<u32> {
        let mut conn = self.repository.pool.acquire().await?;
        let copies = self
            .repository
            .copies
            .list_available_with_waiters(&mut conn)
            .await?;
        drop(conn);

        let mut promoted = 0;
        for copy in copies {
            let mut events: Vec<NotificationEvent> = Vec::new();
            let result: AppResult<bool> = async {
                let mut tx = self.repository.pool.begin().await?;
                let next = self
                    .repository
                    .reservations
                    .peek_next(&mut tx, copy.title_id)
                    .await?;
                let Some(next) = next else {
                    return Ok(false);
                };
                self.promote(&mut tx, &mut events, &next, copy.id, now).await?;
                tx.commit().await?;
                Ok(true)
            }
            .await;

            match result {
                Ok(true) => {
                    promoted += 1;
                    dispatch(self.sink.clone(), events);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(copy_id = copy.id, "Promotion failed: {}", e);
                }
            }
        }

        Ok(promoted)
    }
}
