//! Repository layer for database operations
//!
//! Methods that participate in a multi-entity unit of work take a
//! `&mut PgConnection` so the calling service can run them inside a single
//! transaction; standalone reads go straight to the pool.

pub mod copies;
pub mod fines;
pub mod loans;
pub mod notifications;
pub mod reservations;
pub mod titles;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub copies: copies::CopiesRepository,
    pub loans: loans::LoansRepository,
    pub reservations: reservations::ReservationsRepository,
    pub fines: fines::FinesRepository,
    pub users: users::UsersRepository,
    pub titles: titles::TitlesRepository,
    pub notifications: notifications::NotificationsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            copies: copies::CopiesRepository::new(),
            loans: loans::LoansRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(),
            fines: fines::FinesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            titles: titles::TitlesRepository::new(),
            notifications: notifications::NotificationsRepository::new(),
            pool,
        }
    }
}
