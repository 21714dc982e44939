//! Clinicore — appointment booking and prescription core for a clinic
//! backend.
//!
//! The crate is organized as a thin stack: SQLite store and repositories
//! under [`db`], domain types under [`models`], and the two engines
//! ([`scheduling`] and [`prescriptions`]) that enforce slot exclusivity,
//! the appointment lifecycle, and prescription issuance on top of the
//! row-level [`access`] guard. [`registration`] handles account intake,
//! [`export`] renders prescription documents.

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod prescriptions;
pub mod registration;
pub mod scheduling;
pub mod validate;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for an embedding binary. RUST_LOG overrides the
/// built-in default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Clinicore starting v{}", config::APP_VERSION);
}
