//! Calliope Library Circulation Server
//!
//! A Rust implementation of a library circulation backend: loans,
//! reservation queues, holds, overdue processing and fines, exposed as a
//! REST JSON API. Catalog management, credential authentication and
//! payment-gateway internals live in separate services.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
