//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use service_reconciler::prelude::*;
//! ```
//!
//! This brings into scope:
//! - Reconciler types (Reconciler, Outcome, Trigger, ReconcilerError)
//! - Config types (HookConfig, DesiredConfig, DatabaseInfo, ...)
//! - Collaborator traits (ServiceManager, StatusReporter, FlagStore)

// Reconciler types - core functionality
pub use crate::reconciler::{Outcome, Reconciler, ReconcilerError, Trigger};

// Config types - inputs of a reconcile call
pub use crate::config::{
    CharmConfig, DatabaseInfo, DesiredConfig, HookConfig, ServiceEnvironment, ServiceLayout,
};

// Collaborator traits and their default implementations
pub use crate::service::{ServiceManager, ServiceManagerError, SystemctlManager};
pub use crate::state::{FileFlagStore, FlagStore, MemoryFlagStore, ReconciliationState};
pub use crate::status::{StatusReporter, StatusState};

pub use crate::dispatch::{ActiveFlags, Dispatcher};
