//! Domain models for the circulation core

pub mod copy;
pub mod enums;
pub mod fine;
pub mod loan;
pub mod reservation;
pub mod title;
pub mod user;
