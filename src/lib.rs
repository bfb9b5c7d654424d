//! # Ekiwi - Electric Kiwi API session manager
//!
//! A client for the Electric Kiwi customer API that keeps the two
//! provider credentials alive and exposes the Hour of Power controls on
//! top of them.
//!
//! ## Features
//!
//! - **Session lifecycle**: bootstrap and login sessions refreshed on
//!   expiry, single-flight under concurrency, persisted across restarts
//! - **Request signing**: per-request `x-token` built with a
//!   CryptoJS-compatible AES passphrase cipher
//! - **Hour of Power**: read and move the daily free hour, utilisation
//!   averages and single-day lookups
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `error`: Crate error type
//! - `cipher`: Token cipher and password digest
//! - `persistence`: Session record storage
//! - `session`: Auth and customer session managers, request signer
//! - `api`: Transport seam, request dispatch and the authenticated client
//! - `hop`: Hour of Power slot table and service
//! - `account`: Connection and balance reads

pub mod account;
pub mod api;
pub mod cipher;
pub mod config;
pub mod error;
pub mod hop;
pub mod logging;
pub mod persistence;
pub mod session;

#[cfg(test)]
mod config_tests;

// Re-export commonly used types
pub use account::AccountService;
pub use api::ApiClient;
pub use config::Config;
pub use error::{EkiwiError, RemoteApiError, Result};
pub use hop::{HourOfPowerService, HourOfPowerTable};
