//! # Routeward Core
//!
//! Core types, traits, and errors for the Routeward route reconciler.
//!
//! This crate holds everything the reconciliation engine and its callers
//! share: the declarative route model, the remote routing API seam, and the
//! error taxonomy surfaced to operators.
//!
//! ## Key Types
//!
//! - [`DesiredRoute`]: The declarative input (table, destination, flat target fields)
//! - [`RouteTarget`]: Tagged union over the eight next-hop target kinds
//! - [`ObservedRoute`]: The remote view of a route, including read-only metadata
//! - [`RoutingApi`]: Abstraction over the remote describe/create/replace/delete calls
//! - [`MockRoutingApi`]: In-memory, eventually consistent API for tests
//! - [`ReconcileError`]: Errors surfaced by lifecycle operations

pub mod api;
pub mod error;
pub mod mock_api;
pub mod route;

// Re-export main types
pub use api::*;
pub use error::*;
pub use mock_api::*;
pub use route::*;
