//! # Routeward Reconcile
//!
//! Reconciliation engine for single managed routes.
//!
//! Given a desired route (a route table, a destination and exactly one
//! next-hop target), this crate converges a remote routing table to match
//! it, tolerating the remote system's eventual consistency and transient
//! rejections.
//!
//! ## Core Components
//!
//! - [`select_target`]: Validates the flat target fields and picks the single target
//! - [`identity::compute`]: Deterministic `r-<table><hash>` identity
//! - [`RouteLocator`]: Finds a route in a remote table by destination
//! - [`ConvergenceLoop`]: Bounded retry with one final attempt on timeout
//! - [`Reconciler`]: The create/read/update/delete/import lifecycle
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use routeward_core::{DesiredRoute, TargetKind};
//! use routeward_reconcile::{Reconciler, ReconcilerConfig};
//!
//! let reconciler = Reconciler::with_config(Arc::new(client), ReconcilerConfig::default());
//!
//! let desired = DesiredRoute::new("rtb-1")
//!     .with_ipv4_destination("10.0.0.0/16")
//!     .with_target(TargetKind::Gateway, "igw-1");
//!
//! let created = reconciler.create(&desired).await?;
//! println!("managing {}", created.identity);
//!
//! match reconciler.read(&desired).await? {
//!     Observation::Present(route) => { /* persist route.to_desired() */ }
//!     Observation::Gone(reason) => { /* forget the route */ }
//! }
//! ```

pub mod config;
pub mod convergence;
pub mod identity;
pub mod import;
pub mod locator;
pub mod reconciler;
pub mod selector;
pub mod validate;

// Re-export main types
pub use config::{BackoffConfig, ConfigError, MAX_TIMEOUT, ReconcilerConfig};
pub use convergence::{Attempt, ConvergenceError, ConvergenceLoop, deadline_after};
pub use import::parse_import_id;
pub use locator::{RouteLocator, ipv6_cidrs_equal};
pub use reconciler::{CreateOutcome, GoneReason, ImportedRoute, Observation, Reconciler};
pub use selector::{TargetOperation, select_target};
pub use validate::validate_destinations;

// Re-export core types for convenience
pub use routeward_core::{DesiredRoute, ReconcileError, ReconcileResult, RouteIdentity};
