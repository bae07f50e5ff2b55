//! Fitlog sync engine
//!
//! Local-first state for a wellness tracker: per-domain logs persisted on
//! the device, aggregates derived from them on demand, and reconciliation
//! with the hosted tables on sign-in and sign-out.

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod remote;
pub mod services;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod tracker;

pub use domain::Domain;
pub use error::{RemoteError, StorageError, TrackerError, TrackerResult};
pub use tracker::{AuthSync, Tracker};
