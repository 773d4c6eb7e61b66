//! Route lookup
//!
//! The [`RouteLocator`] describes one route table and picks out the route
//! for a destination. IPv4 destinations match by exact string equality;
//! IPv6 destinations match by CIDR block, so `2001:db8::1/128` and
//! `2001:0db8:0000:0000:0000:0000:0000:0001/128` are the same route.

use std::str::FromStr;
use std::sync::Arc;

use ipnetwork::Ipv6Network;
use routeward_core::{
    ObservedRoute, Operation, ReconcileError, ReconcileResult, RemoteRoute, RoutingApi,
};
use tracing::{debug, trace};

/// Finds a route in a remote route table by destination
pub struct RouteLocator<A: RoutingApi> {
    api: Arc<A>,
}

impl<A: RoutingApi> Clone for RouteLocator<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: RoutingApi> RouteLocator<A> {
    /// Create a locator over the given API handle
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Find the route for a destination
    ///
    /// The IPv4 destination takes precedence when both are given. Returns
    /// `Ok(None)` when the table exists but holds no matching route, and
    /// [`ReconcileError::TableNotFound`] when the table itself is gone.
    pub async fn find(
        &self,
        route_table_id: &str,
        ipv4: Option<&str>,
        ipv6: Option<&str>,
    ) -> ReconcileResult<Option<ObservedRoute>> {
        let ipv4 = ipv4.filter(|cidr| !cidr.is_empty());
        let ipv6 = ipv6.filter(|cidr| !cidr.is_empty());
        let destination = ipv4.or(ipv6).unwrap_or_default();

        let description = match self.api.describe_routes(route_table_id).await {
            Ok(description) => description,
            Err(e) if e.is_route_table_not_found() => {
                return Err(ReconcileError::TableNotFound {
                    route_table_id: route_table_id.to_string(),
                });
            }
            Err(e) => {
                return Err(ReconcileError::Remote {
                    operation: Operation::Read,
                    route_table_id: route_table_id.to_string(),
                    destination: destination.to_string(),
                    source: e,
                });
            }
        };

        if !description.found {
            return Err(ReconcileError::TableNotFound {
                route_table_id: route_table_id.to_string(),
            });
        }

        trace!(
            route_table_id,
            route_count = description.routes.len(),
            "Described route table"
        );

        let found = description
            .routes
            .into_iter()
            .find(|route| matches_destination(route, ipv4, ipv6));

        match found {
            Some(route) => {
                debug!(route_table_id, destination, "Found matching route");
                Ok(Some(route.into_observed(route_table_id)))
            }
            None => {
                debug!(route_table_id, destination, "No matching route");
                Ok(None)
            }
        }
    }
}

fn matches_destination(route: &RemoteRoute, ipv4: Option<&str>, ipv6: Option<&str>) -> bool {
    if let Some(cidr) = ipv4 {
        return route.destination_cidr_block.as_deref() == Some(cidr);
    }
    match (ipv6, route.destination_ipv6_cidr_block.as_deref()) {
        (Some(wanted), Some(actual)) => ipv6_cidrs_equal(wanted, actual),
        _ => false,
    }
}

/// Compare two IPv6 CIDR blocks by address and prefix length
///
/// Unparseable input never matches.
pub fn ipv6_cidrs_equal(a: &str, b: &str) -> bool {
    match (Ipv6Network::from_str(a), Ipv6Network::from_str(b)) {
        (Ok(a), Ok(b)) => a.ip() == b.ip() && a.prefix() == b.prefix(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeward_core::{ApiError, ApiOperation, MockRoutingApi, TargetKind};

    fn make_route(ipv4: Option<&str>, ipv6: Option<&str>, gateway: &str) -> RemoteRoute {
        let mut route = RemoteRoute {
            destination_cidr_block: ipv4.map(str::to_string),
            destination_ipv6_cidr_block: ipv6.map(str::to_string),
            state: Some("active".to_string()),
            ..Default::default()
        };
        route.targets.set(TargetKind::Gateway, gateway);
        route
    }

    fn make_locator() -> (Arc<MockRoutingApi>, RouteLocator<MockRoutingApi>) {
        let api = Arc::new(MockRoutingApi::new());
        api.insert_route("rtb-1", make_route(Some("10.0.0.0/16"), None, "igw-v4"));
        api.insert_route("rtb-1", make_route(None, Some("2001:db8::1/128"), "igw-v6"));
        (api.clone(), RouteLocator::new(api))
    }

    #[test]
    fn test_ipv6_cidrs_equal() {
        assert!(ipv6_cidrs_equal(
            "2001:db8::1/128",
            "2001:0db8:0000:0000:0000:0000:0000:0001/128"
        ));
        assert!(ipv6_cidrs_equal("::1/128", "0:0:0:0:0:0:0:1/128"));
        assert!(!ipv6_cidrs_equal("2001:db8::/32", "2001:db8::/48"));
        assert!(!ipv6_cidrs_equal("2001:db8::/32", "garbage"));
    }

    #[tokio::test]
    async fn test_find_ipv4_by_string() {
        let (_, locator) = make_locator();
        let found = locator
            .find("rtb-1", Some("10.0.0.0/16"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.route_table_id, "rtb-1");
        assert_eq!(found.targets.get(TargetKind::Gateway), Some("igw-v4"));

        let missing = locator
            .find("rtb-1", Some("10.0.0.0/24"), None)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_ipv6_by_block() {
        let (_, locator) = make_locator();
        let found = locator
            .find(
                "rtb-1",
                None,
                Some("2001:0db8:0000:0000:0000:0000:0000:0001/128"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.targets.get(TargetKind::Gateway), Some("igw-v6"));
    }

    #[tokio::test]
    async fn test_ipv4_takes_precedence() {
        let (_, locator) = make_locator();
        let found = locator
            .find("rtb-1", Some("10.0.0.0/16"), Some("2001:db8::1/128"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.targets.get(TargetKind::Gateway), Some("igw-v4"));
    }

    #[tokio::test]
    async fn test_missing_table() {
        let (_, locator) = make_locator();
        let err = locator
            .find("rtb-gone", Some("10.0.0.0/16"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::TableNotFound { .. }));
    }

    #[tokio::test]
    async fn test_table_not_found_error_from_api() {
        let (api, locator) = make_locator();
        api.fail_next(
            ApiOperation::Describe,
            ApiError::route_table_not_found("rtb-1"),
        );
        let err = locator
            .find("rtb-1", Some("10.0.0.0/16"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::TableNotFound { .. }));
    }

    #[tokio::test]
    async fn test_other_describe_error_is_remote() {
        let (api, locator) = make_locator();
        api.fail_next(
            ApiOperation::Describe,
            ApiError::other("UnauthorizedOperation", "denied"),
        );
        let err = locator
            .find("rtb-1", Some("10.0.0.0/16"), None)
            .await
            .unwrap_err();
        match err {
            ReconcileError::Remote {
                operation, source, ..
            } => {
                assert_eq!(operation, Operation::Read);
                assert_eq!(source.code, "UnauthorizedOperation");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
