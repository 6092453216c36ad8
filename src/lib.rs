//! Service Reconciler Library
//!
//! Idempotent reconciliation of a systemd-managed service: render the unit and
//! settings file from the desired configuration, write only what changed, and
//! restart the service only when something did.
//! Tests are included in the module files and under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use service_reconciler::prelude::*;
//! ```

pub mod artifact;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod observability;
pub mod prelude;
pub mod reconciler;
pub mod render;
pub mod service;
pub mod state;
pub mod status;
