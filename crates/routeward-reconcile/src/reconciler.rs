//! Route lifecycle operations
//!
//! The [`Reconciler`] drives one managed route through
//! `absent → creating → present → updating → present → deleting → absent`.
//! It holds no per-route state: the caller supplies the desired route on
//! every call and persists the returned identity and observation.
//!
//! ## Budgets
//!
//! - Create: the create call and its confirmation lookups share one
//!   deadline of `create_timeout`.
//! - Update: a single replace call, no retries.
//! - Delete: retried within `delete_timeout`; a missing route counts as
//!   deleted.

use std::fmt;
use std::sync::Arc;

use routeward_core::{
    DeleteRoutePayload, DesiredRoute, LookupMiss, ObservedRoute, Operation, ReconcileError,
    ReconcileResult, RouteIdentity, RoutePayload, RoutingApi,
};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::ReconcilerConfig;
use crate::convergence::{Attempt, ConvergenceError, ConvergenceLoop, deadline_after};
use crate::identity;
use crate::import::parse_import_id;
use crate::locator::RouteLocator;
use crate::selector::{TargetOperation, select_target};
use crate::validate::validate_destinations;

/// Why a route is no longer present remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoneReason {
    /// The whole route table is gone
    TableNotFound,
    /// The table exists but holds no matching route
    RouteNotFound,
}

impl fmt::Display for GoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoneReason::TableNotFound => write!(f, "route table not found"),
            GoneReason::RouteNotFound => write!(f, "route not found"),
        }
    }
}

/// Result of reading a route
///
/// `Gone` tells the state layer to forget the route; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Present(ObservedRoute),
    Gone(GoneReason),
}

impl Observation {
    /// Check if the route exists remotely
    pub fn is_present(&self) -> bool {
        matches!(self, Observation::Present(_))
    }

    /// The observed route, if present
    pub fn route(&self) -> Option<&ObservedRoute> {
        match self {
            Observation::Present(route) => Some(route),
            Observation::Gone(_) => None,
        }
    }

    /// Consume into the observed route, if present
    pub fn into_route(self) -> Option<ObservedRoute> {
        match self {
            Observation::Present(route) => Some(route),
            Observation::Gone(_) => None,
        }
    }

    /// Why the route is gone, if it is
    pub fn gone_reason(&self) -> Option<GoneReason> {
        match self {
            Observation::Present(_) => None,
            Observation::Gone(reason) => Some(*reason),
        }
    }
}

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    /// Identity assigned to the new route
    pub identity: RouteIdentity,
    /// Observed state right after creation
    pub observation: Observation,
}

/// Result of importing an existing route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRoute {
    /// Identity of the imported route
    pub identity: RouteIdentity,
    /// Table and destination parsed from the import id (no target)
    pub desired: DesiredRoute,
    /// Observed state, including the active target
    pub observation: Observation,
}

/// Reconciles single routes against a remote routing API
pub struct Reconciler<A: RoutingApi> {
    /// Remote API handle
    api: Arc<A>,
    /// Lookup over the same handle
    locator: RouteLocator<A>,
    /// Retry executor for create, confirmation and delete
    convergence: ConvergenceLoop,
    /// Timeout budgets
    config: ReconcilerConfig,
}

impl<A: RoutingApi> Reconciler<A> {
    /// Create a reconciler with default budgets
    pub fn new(api: Arc<A>) -> Self {
        Self::with_config(api, ReconcilerConfig::default())
    }

    /// Create a reconciler with custom budgets
    pub fn with_config(api: Arc<A>, config: ReconcilerConfig) -> Self {
        Self {
            locator: RouteLocator::new(Arc::clone(&api)),
            api,
            convergence: ConvergenceLoop::new(config.backoff),
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Get the route locator
    pub fn locator(&self) -> &RouteLocator<A> {
        &self.locator
    }

    /// Create a route and wait until it is visible
    ///
    /// Validation failures abort before any remote call. The identity is
    /// computed from the destination of the confirmed remote route.
    #[instrument(
        skip(self, desired),
        fields(route_table_id = %desired.route_table_id, destination = %desired.destination_label())
    )]
    pub async fn create(&self, desired: &DesiredRoute) -> ReconcileResult<CreateOutcome> {
        let target = select_target(desired, TargetOperation::Create)?;
        validate_destinations(desired)?;

        let table = desired.route_table_id.as_str();
        let deadline = deadline_after(self.config.create_timeout);

        let mut payload = RoutePayload::new(table, target);
        payload.destination_cidr_block = desired.ipv4_destination().map(str::to_string);
        payload.destination_ipv6_cidr_block = desired.ipv6_destination().map(str::to_string);

        debug!(%payload, "Route create payload");
        self.create_until(&payload, desired, deadline).await?;

        let mut resolved = None;
        if let Some(cidr) = desired.ipv4_destination() {
            resolved = Some(self.confirm(table, Some(cidr), None, deadline).await?);
        }
        if let Some(cidr) = desired.ipv6_destination() {
            resolved = Some(self.confirm(table, None, Some(cidr), deadline).await?);
        }
        let resolved = resolved.ok_or_else(|| ReconcileError::NoDestination {
            route_table_id: table.to_string(),
        })?;

        let identity = identity::compute(
            table,
            resolved.destination_cidr_block.as_deref(),
            resolved.destination_ipv6_cidr_block.as_deref(),
        )?;
        info!(%identity, target = %payload.target, "Route created");

        let observation = self.read(desired).await?;
        Ok(CreateOutcome {
            identity,
            observation,
        })
    }

    /// Read the remote state of a route
    ///
    /// A missing table or route is reported as [`Observation::Gone`], not
    /// as an error.
    #[instrument(
        skip(self, desired),
        fields(route_table_id = %desired.route_table_id, destination = %desired.destination_label())
    )]
    pub async fn read(&self, desired: &DesiredRoute) -> ReconcileResult<Observation> {
        let table = desired.route_table_id.as_str();
        let ipv4 = desired.ipv4_destination();
        let ipv6 = desired.ipv6_destination();

        if ipv4.is_none() && ipv6.is_none() {
            warn!("No destination recorded, removing from state");
            return Ok(Observation::Gone(GoneReason::RouteNotFound));
        }

        let route = match self.locator.find(table, ipv4, ipv6).await {
            Ok(Some(route)) => route,
            Ok(None) => {
                warn!("Matching route not found, removing from state");
                return Ok(Observation::Gone(GoneReason::RouteNotFound));
            }
            Err(ReconcileError::TableNotFound { .. }) => {
                warn!("Route table not found, removing from state");
                return Ok(Observation::Gone(GoneReason::TableNotFound));
            }
            Err(e) => return Err(e),
        };

        let desired_target = select_target(desired, TargetOperation::Update).ok();
        let active_target = route.active_target();
        if let (Some(wanted), Some(active)) = (&desired_target, &active_target)
            && wanted != active
        {
            warn!(desired = %wanted, active = %active, "Route target drifted");
        }

        debug!(state = ?route.state, origin = ?route.origin, "Route present");
        Ok(Observation::Present(route))
    }

    /// Point an existing route at a new target
    ///
    /// Sends the full replacement once; errors are not retried.
    #[instrument(
        skip(self, desired),
        fields(route_table_id = %desired.route_table_id, destination = %desired.destination_label())
    )]
    pub async fn update(&self, desired: &DesiredRoute) -> ReconcileResult<()> {
        let target = select_target(desired, TargetOperation::Update)?;
        let table = desired.route_table_id.as_str();
        let destination =
            desired
                .primary_destination()
                .ok_or_else(|| ReconcileError::NoDestination {
                    route_table_id: table.to_string(),
                })?;

        let payload = RoutePayload::new(table, target).with_destination(destination.clone());
        debug!(%payload, "Route replace payload");

        self.api
            .replace_route(&payload)
            .await
            .map_err(|source| ReconcileError::Replace {
                route_table_id: table.to_string(),
                destination: destination.to_string(),
                source,
            })?;

        info!(target = %payload.target, "Route updated");
        Ok(())
    }

    /// Delete a route
    ///
    /// Idempotent: a route that is already gone counts as deleted.
    #[instrument(
        skip(self, desired),
        fields(route_table_id = %desired.route_table_id, destination = %desired.destination_label())
    )]
    pub async fn delete(&self, desired: &DesiredRoute) -> ReconcileResult<()> {
        let table = desired.route_table_id.as_str();
        if desired.ipv4_destination().is_none() && desired.ipv6_destination().is_none() {
            return Err(ReconcileError::NoDestination {
                route_table_id: table.to_string(),
            });
        }

        let payload = DeleteRoutePayload {
            route_table_id: table.to_string(),
            destination_cidr_block: desired.ipv4_destination().map(str::to_string),
            destination_ipv6_cidr_block: desired.ipv6_destination().map(str::to_string),
        };
        debug!(%payload, "Route delete payload");

        let api = &self.api;
        let payload = &payload;
        let result = self
            .convergence
            .run(self.config.delete_timeout, move || async move {
                match api.delete_route(payload).await {
                    Ok(()) => Attempt::Done(()),
                    Err(e) if e.is_route_not_found() => {
                        debug!("Route already gone");
                        Attempt::Done(())
                    }
                    Err(e) if e.is_parameter_propagating() => Attempt::Retry(e),
                    Err(e) => Attempt::Fail(e),
                }
            })
            .await;

        result.map_err(|err| match err {
            ConvergenceError::Fatal(source) => ReconcileError::Remote {
                operation: Operation::Delete,
                route_table_id: table.to_string(),
                destination: desired.destination_label(),
                source,
            },
            ConvergenceError::TimedOut {
                last_error,
                attempts,
            } => {
                warn!(attempts, error = %last_error, "Timed out deleting route");
                ReconcileError::DeleteTimeout {
                    route_table_id: table.to_string(),
                    destination: desired.destination_label(),
                    source: last_error,
                }
            }
        })?;

        info!("Route deleted");
        Ok(())
    }

    /// Import an existing route by `<route_table_id>_<destination>`
    #[instrument(skip(self))]
    pub async fn import(&self, id: &str) -> ReconcileResult<ImportedRoute> {
        let (table, destination) = parse_import_id(id)?;
        let desired = DesiredRoute::new(table).with_destination(destination);
        let identity = identity::compute(
            &desired.route_table_id,
            desired.ipv4_destination(),
            desired.ipv6_destination(),
        )?;

        let observation = self.read(&desired).await?;
        info!(%identity, present = observation.is_present(), "Route imported");
        Ok(ImportedRoute {
            identity,
            desired,
            observation,
        })
    }

    /// Issue the create call, retrying transient rejections until `deadline`
    async fn create_until(
        &self,
        payload: &RoutePayload,
        desired: &DesiredRoute,
        deadline: Instant,
    ) -> ReconcileResult<()> {
        let api = &self.api;
        let result = self
            .convergence
            .run_until(deadline, move || async move {
                match api.create_route(payload).await {
                    Ok(()) => Attempt::Done(()),
                    Err(e) if e.is_parameter_propagating() || e.is_reference_not_found() => {
                        Attempt::Retry(e)
                    }
                    Err(e) => Attempt::Fail(e),
                }
            })
            .await;

        result.map_err(|err| match err {
            ConvergenceError::Fatal(source) => ReconcileError::Remote {
                operation: Operation::Create,
                route_table_id: payload.route_table_id.clone(),
                destination: desired.destination_label(),
                source,
            },
            ConvergenceError::TimedOut {
                last_error,
                attempts,
            } => {
                warn!(attempts, error = %last_error, "Timed out creating route");
                ReconcileError::CreateTimeout {
                    route_table_id: payload.route_table_id.clone(),
                    destination: desired.destination_label(),
                    source: last_error,
                }
            }
        })
    }

    /// Wait for a just-created route to become visible
    ///
    /// An absent route or missing table is retried until `deadline`.
    async fn confirm(
        &self,
        route_table_id: &str,
        ipv4: Option<&str>,
        ipv6: Option<&str>,
        deadline: Instant,
    ) -> ReconcileResult<ObservedRoute> {
        let locator = &self.locator;
        let result = self
            .convergence
            .run_until(deadline, move || async move {
                match locator.find(route_table_id, ipv4, ipv6).await {
                    Ok(Some(route)) => Attempt::Done(route),
                    Ok(None) => Attempt::Retry(LookupMiss::Absent),
                    Err(e @ ReconcileError::TableNotFound { .. }) => {
                        Attempt::Retry(LookupMiss::Failed(Box::new(e)))
                    }
                    Err(e) => Attempt::Fail(LookupMiss::Failed(Box::new(e))),
                }
            })
            .await;

        let destination = ipv4.or(ipv6).unwrap_or_default().to_string();
        match result {
            Ok(route) => {
                debug!(%destination, "Route confirmed");
                Ok(route)
            }
            Err(ConvergenceError::Fatal(LookupMiss::Failed(e))) => Err(*e),
            // Absent routes are classified as retryable above
            Err(ConvergenceError::Fatal(LookupMiss::Absent)) => {
                unreachable!("an absent route is never a fatal lookup result")
            }
            Err(ConvergenceError::TimedOut {
                last_error,
                attempts,
            }) => {
                warn!(%destination, attempts, error = %last_error, "Route never became visible");
                Err(ReconcileError::ConfirmationTimeout {
                    route_table_id: route_table_id.to_string(),
                    destination,
                    attempts,
                    last_miss: last_error,
                })
            }
        }
    }
}
