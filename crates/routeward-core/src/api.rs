//! Remote routing API abstraction
//!
//! The [`RoutingApi`] trait is the seam between the reconciler and the
//! remote routing service. Production code backs it with an SDK client;
//! tests use [`MockRoutingApi`](crate::MockRoutingApi).
//!
//! Every implementation must report failures as [`ApiError`] values whose
//! [`ApiErrorKind`] distinguishes the rejections the reconciler treats
//! specially (propagation delays, missing references, missing routes).

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::route::{Destination, ObservedRoute, RouteTarget, TargetFields};

/// Classification of a remote rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiErrorKind {
    /// A parameter is still propagating through the remote system
    ParameterPropagating,
    /// A referenced resource (e.g. a just-created transit gateway) is not yet visible
    ReferenceNotFound,
    /// The route addressed by the call does not exist
    RouteNotFound,
    /// The route table addressed by the call does not exist
    RouteTableNotFound,
    /// Any other rejection
    Other,
}

impl ApiErrorKind {
    /// Map a remote error code onto its kind
    pub fn from_code(code: &str) -> Self {
        match code {
            "InvalidParameterException" => Self::ParameterPropagating,
            "InvalidRoute.NotFound" => Self::RouteNotFound,
            "InvalidRouteTableID.NotFound" => Self::RouteTableNotFound,
            c if c.starts_with("Invalid") && c.ends_with("ID.NotFound") => Self::ReferenceNotFound,
            _ => Self::Other,
        }
    }
}

/// An error returned by the remote routing API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// Classified kind
    pub kind: ApiErrorKind,
    /// Remote error code, e.g. `InvalidParameterException`
    pub code: String,
    /// Remote error message
    pub message: String,
}

impl ApiError {
    /// Build an error from a remote code, classifying it
    pub fn from_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            kind: ApiErrorKind::from_code(&code),
            code,
            message: message.into(),
        }
    }

    /// "Parameter still propagating" rejection
    pub fn parameter_propagating(message: impl Into<String>) -> Self {
        Self::from_code("InvalidParameterException", message)
    }

    /// Referenced resource not yet visible
    pub fn reference_not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::ReferenceNotFound,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Route does not exist
    pub fn route_not_found(message: impl Into<String>) -> Self {
        Self::from_code("InvalidRoute.NotFound", message)
    }

    /// Route table does not exist
    pub fn route_table_not_found(route_table_id: &str) -> Self {
        Self::from_code(
            "InvalidRouteTableID.NotFound",
            format!("The routeTable ID '{route_table_id}' does not exist"),
        )
    }

    /// Unclassified rejection
    pub fn other(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Other,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Check if this rejection is caused by propagation lag
    pub fn is_parameter_propagating(&self) -> bool {
        self.kind == ApiErrorKind::ParameterPropagating
    }

    /// Check if this rejection names a resource that is not yet visible
    pub fn is_reference_not_found(&self) -> bool {
        self.kind == ApiErrorKind::ReferenceNotFound
    }

    /// Check if this rejection reports a missing route
    pub fn is_route_not_found(&self) -> bool {
        self.kind == ApiErrorKind::RouteNotFound
    }

    /// Check if this rejection reports a missing route table
    pub fn is_route_table_not_found(&self) -> bool {
        self.kind == ApiErrorKind::RouteTableNotFound
    }
}

/// A route record as returned by the describe call
///
/// All fields are optional; exactly one target field is normally populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRoute {
    pub destination_cidr_block: Option<String>,
    pub destination_ipv6_cidr_block: Option<String>,
    pub destination_prefix_list_id: Option<String>,
    #[serde(flatten)]
    pub targets: TargetFields,
    pub instance_owner_id: Option<String>,
    pub origin: Option<String>,
    pub state: Option<String>,
}

impl RemoteRoute {
    /// Convert into the observed view for the given table
    pub fn into_observed(self, route_table_id: impl Into<String>) -> ObservedRoute {
        ObservedRoute {
            route_table_id: route_table_id.into(),
            destination_cidr_block: self.destination_cidr_block,
            destination_ipv6_cidr_block: self.destination_ipv6_cidr_block,
            destination_prefix_list_id: self.destination_prefix_list_id,
            targets: self.targets,
            instance_owner_id: self.instance_owner_id,
            origin: self.origin,
            state: self.state,
        }
    }
}

/// Result of describing one route table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTableDescription {
    /// Whether the table exists
    pub found: bool,
    /// The table's routes, in remote order
    pub routes: Vec<RemoteRoute>,
}

impl RouteTableDescription {
    /// A table that exists with the given routes
    pub fn found(routes: Vec<RemoteRoute>) -> Self {
        Self {
            found: true,
            routes,
        }
    }

    /// A table that does not exist
    pub fn missing() -> Self {
        Self::default()
    }
}

/// Payload of a create or replace call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePayload {
    pub route_table_id: String,
    pub destination_cidr_block: Option<String>,
    pub destination_ipv6_cidr_block: Option<String>,
    pub target: RouteTarget,
}

impl RoutePayload {
    /// Payload with no destination set yet
    pub fn new(route_table_id: impl Into<String>, target: RouteTarget) -> Self {
        Self {
            route_table_id: route_table_id.into(),
            destination_cidr_block: None,
            destination_ipv6_cidr_block: None,
            target,
        }
    }

    /// Add a destination of either family
    pub fn with_destination(mut self, destination: Destination) -> Self {
        match destination {
            Destination::Ipv4(cidr) => self.destination_cidr_block = Some(cidr),
            Destination::Ipv6(cidr) => self.destination_ipv6_cidr_block = Some(cidr),
        }
        self
    }
}

impl fmt::Display for RoutePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route_table_id={}", self.route_table_id)?;
        if let Some(cidr) = &self.destination_cidr_block {
            write!(f, " destination_cidr_block={cidr}")?;
        }
        if let Some(cidr) = &self.destination_ipv6_cidr_block {
            write!(f, " destination_ipv6_cidr_block={cidr}")?;
        }
        write!(f, " {}", self.target)
    }
}

/// Payload of a delete call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRoutePayload {
    pub route_table_id: String,
    pub destination_cidr_block: Option<String>,
    pub destination_ipv6_cidr_block: Option<String>,
}

impl fmt::Display for DeleteRoutePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route_table_id={}", self.route_table_id)?;
        if let Some(cidr) = &self.destination_cidr_block {
            write!(f, " destination_cidr_block={cidr}")?;
        }
        if let Some(cidr) = &self.destination_ipv6_cidr_block {
            write!(f, " destination_ipv6_cidr_block={cidr}")?;
        }
        Ok(())
    }
}

/// Remote routing API
///
/// Implementations are shared across concurrent reconciliations of
/// different routes, so they must be `Send + Sync`. The describe call is
/// read-only; the mutating calls may race at the remote system when issued
/// for different routes of the same table.
#[async_trait]
pub trait RoutingApi: Send + Sync {
    /// Describe the routes of one route table
    async fn describe_routes(&self, route_table_id: &str)
    -> Result<RouteTableDescription, ApiError>;

    /// Create a route
    async fn create_route(&self, payload: &RoutePayload) -> Result<(), ApiError>;

    /// Replace the target of an existing route
    async fn replace_route(&self, payload: &RoutePayload) -> Result<(), ApiError>;

    /// Delete a route
    async fn delete_route(&self, payload: &DeleteRoutePayload) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_from_code() {
        assert_eq!(
            ApiErrorKind::from_code("InvalidParameterException"),
            ApiErrorKind::ParameterPropagating
        );
        assert_eq!(
            ApiErrorKind::from_code("InvalidTransitGatewayID.NotFound"),
            ApiErrorKind::ReferenceNotFound
        );
        assert_eq!(
            ApiErrorKind::from_code("InvalidRoute.NotFound"),
            ApiErrorKind::RouteNotFound
        );
        assert_eq!(
            ApiErrorKind::from_code("InvalidRouteTableID.NotFound"),
            ApiErrorKind::RouteTableNotFound
        );
        assert_eq!(
            ApiErrorKind::from_code("UnauthorizedOperation"),
            ApiErrorKind::Other
        );
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::route_table_not_found("rtb-9");
        let msg = format!("{}", err);
        assert!(msg.contains("InvalidRouteTableID.NotFound"));
        assert!(msg.contains("rtb-9"));
        assert!(err.is_route_table_not_found());
    }

    #[test]
    fn test_payload_display() {
        let payload = RoutePayload::new("rtb-1", RouteTarget::Gateway("igw-1".to_string()))
            .with_destination(Destination::Ipv4("10.0.0.0/16".to_string()));
        assert_eq!(
            payload.to_string(),
            "route_table_id=rtb-1 destination_cidr_block=10.0.0.0/16 gateway_id=igw-1"
        );
    }

    #[test]
    fn test_remote_route_into_observed() {
        let mut remote = RemoteRoute {
            destination_cidr_block: Some("10.0.0.0/16".to_string()),
            origin: Some("CreateRoute".to_string()),
            state: Some("active".to_string()),
            ..Default::default()
        };
        remote.targets.set(crate::TargetKind::Gateway, "igw-1");

        let observed = remote.into_observed("rtb-1");
        assert_eq!(observed.route_table_id, "rtb-1");
        assert_eq!(observed.origin.as_deref(), Some("CreateRoute"));
        assert_eq!(
            observed.active_target(),
            Some(RouteTarget::Gateway("igw-1".to_string()))
        );
    }
}
