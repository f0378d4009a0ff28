//! Business logic services

pub mod circulation;
pub mod ledger;
pub mod notifier;
pub mod reservations;
pub mod sweeper;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    repository::Repository,
};

use notifier::{NotificationSink, SmtpNotificationSink};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub circulation: circulation::CirculationService,
    pub reservations: reservations::ReservationsService,
    pub sweeper: sweeper::SweeperService,
    pub ledger: ledger::LedgerService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let sink: Arc<dyn NotificationSink> = Arc::new(SmtpNotificationSink::new(
            config.email.clone(),
            repository.users.clone(),
        ));
        Self::with_sink(repository, config, sink)
    }

    /// Create all services with an injected notification sink
    pub fn with_sink(
        repository: Repository,
        config: &AppConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let reservations = reservations::ReservationsService::new(
            repository.clone(),
            config.circulation.clone(),
            sink.clone(),
        );

        Self {
            circulation: circulation::CirculationService::new(
                repository.clone(),
                config.circulation.clone(),
                sink.clone(),
                reservations.clone(),
            ),
            sweeper: sweeper::SweeperService::new(
                repository.clone(),
                config.circulation.clone(),
                config.sweeper.clone(),
                sink.clone(),
                reservations.clone(),
            ),
            ledger: ledger::LedgerService::new(repository, sink),
            reservations,
        }
    }
}
