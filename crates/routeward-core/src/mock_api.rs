//! Mock routing API for testing
//!
//! Provides an in-memory, eventually consistent routing service so the
//! reconciler can be exercised without a real cloud account.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use routeward_core::{ApiError, ApiOperation, MockRoutingApi};
//!
//! let api = MockRoutingApi::new().with_visibility_lag(2);
//! api.add_table("rtb-1");
//!
//! // The next create call is rejected once before succeeding
//! api.fail_next(ApiOperation::Create, ApiError::parameter_propagating("propagating"));
//! ```
//!
//! Freshly created routes stay hidden from the next `visibility_lag`
//! describe calls against their table, mimicking the remote system's
//! eventual consistency window.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::api::{
    ApiError, DeleteRoutePayload, RemoteRoute, RouteTableDescription, RoutePayload, RoutingApi,
};
use crate::route::{RouteTarget, TargetFields, TargetKind};

/// The four remote operations, used to script failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    Describe,
    Create,
    Replace,
    Delete,
}

/// A call received by the mock, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    DescribeRoutes { route_table_id: String },
    CreateRoute(RoutePayload),
    ReplaceRoute(RoutePayload),
    DeleteRoute(DeleteRoutePayload),
}

impl ApiCall {
    /// The operation this call belongs to
    pub fn operation(&self) -> ApiOperation {
        match self {
            ApiCall::DescribeRoutes { .. } => ApiOperation::Describe,
            ApiCall::CreateRoute(_) => ApiOperation::Create,
            ApiCall::ReplaceRoute(_) => ApiOperation::Replace,
            ApiCall::DeleteRoute(_) => ApiOperation::Delete,
        }
    }
}

/// A stored route and how many more describe calls it stays hidden from
#[derive(Debug, Clone)]
struct MockRouteEntry {
    route: RemoteRoute,
    hidden_reads: u32,
}

impl MockRouteEntry {
    fn matches(&self, ipv4: Option<&str>, ipv6: Option<&str>) -> bool {
        let v4_match = ipv4.is_some() && self.route.destination_cidr_block.as_deref() == ipv4;
        let v6_match = ipv6.is_some() && self.route.destination_ipv6_cidr_block.as_deref() == ipv6;
        v4_match || v6_match
    }
}

/// Interface and owner the remote system attaches to instance routes
#[derive(Debug, Clone)]
struct InstanceAttachment {
    network_interface_id: String,
    owner_id: String,
}

/// In-memory routing API
pub struct MockRoutingApi {
    /// Routes per table id
    tables: DashMap<String, Vec<MockRouteEntry>>,
    /// Errors to return from the next calls of each operation
    scripted: DashMap<ApiOperation, VecDeque<ApiError>>,
    /// Every call received, in order
    calls: Mutex<Vec<ApiCall>>,
    /// Describe calls a new route stays hidden from
    visibility_lag: AtomicU32,
    /// Auto-populated metadata for instance targets
    instances: DashMap<String, InstanceAttachment>,
}

impl Default for MockRoutingApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRoutingApi {
    /// Create an empty mock with no tables and immediate visibility
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            scripted: DashMap::new(),
            calls: Mutex::new(Vec::new()),
            visibility_lag: AtomicU32::new(0),
            instances: DashMap::new(),
        }
    }

    /// Hide new routes from the next `lag` describe calls of their table
    pub fn with_visibility_lag(self, lag: u32) -> Self {
        self.set_visibility_lag(lag);
        self
    }

    /// Change the visibility lag for routes created from now on
    pub fn set_visibility_lag(&self, lag: u32) {
        self.visibility_lag.store(lag, Ordering::SeqCst);
    }

    /// Create an empty route table
    pub fn add_table(&self, route_table_id: impl Into<String>) {
        self.tables.entry(route_table_id.into()).or_default();
    }

    /// Delete a route table and all of its routes
    pub fn remove_table(&self, route_table_id: &str) {
        self.tables.remove(route_table_id);
    }

    /// Insert a route that is immediately visible, creating the table if needed
    pub fn insert_route(&self, route_table_id: impl Into<String>, route: RemoteRoute) {
        self.tables
            .entry(route_table_id.into())
            .or_default()
            .push(MockRouteEntry {
                route,
                hidden_reads: 0,
            });
    }

    /// Remove routes matching either destination, bypassing the API
    pub fn remove_route(&self, route_table_id: &str, ipv4: Option<&str>, ipv6: Option<&str>) {
        if let Some(mut routes) = self.tables.get_mut(route_table_id) {
            routes.retain(|entry| !entry.matches(ipv4, ipv6));
        }
    }

    /// Register the interface and owner reported for routes through an instance
    pub fn register_instance(
        &self,
        instance_id: impl Into<String>,
        network_interface_id: impl Into<String>,
        owner_id: impl Into<String>,
    ) {
        self.instances.insert(
            instance_id.into(),
            InstanceAttachment {
                network_interface_id: network_interface_id.into(),
                owner_id: owner_id.into(),
            },
        );
    }

    /// Fail the next call of `operation` with `error`
    ///
    /// Errors queue up: scripting the same operation twice fails its next
    /// two calls, in order.
    pub fn fail_next(&self, operation: ApiOperation, error: ApiError) {
        self.scripted.entry(operation).or_default().push_back(error);
    }

    /// Fail the next `times` calls of `operation` with clones of `error`
    pub fn fail_times(&self, operation: ApiOperation, error: ApiError, times: usize) {
        for _ in 0..times {
            self.fail_next(operation, error.clone());
        }
    }

    /// Current routes of a table (ignoring visibility), `None` if the table is missing
    pub fn routes(&self, route_table_id: &str) -> Option<Vec<RemoteRoute>> {
        self.tables
            .get(route_table_id)
            .map(|routes| routes.iter().map(|entry| entry.route.clone()).collect())
    }

    /// Every call received so far
    pub async fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls received for one operation
    pub async fn call_count(&self, operation: ApiOperation) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    async fn record(&self, call: ApiCall) {
        self.calls.lock().await.push(call);
    }

    fn take_scripted(&self, operation: ApiOperation) -> Option<ApiError> {
        self.scripted
            .get_mut(&operation)
            .and_then(|mut queue| queue.pop_front())
    }

    fn build_route(&self, payload: &RoutePayload) -> RemoteRoute {
        let mut targets = TargetFields::from_target(&payload.target);
        let mut instance_owner_id = None;

        if let RouteTarget::Instance(instance_id) = &payload.target {
            if let Some(attachment) = self.instances.get(instance_id) {
                targets.set(
                    TargetKind::NetworkInterface,
                    attachment.network_interface_id.clone(),
                );
                instance_owner_id = Some(attachment.owner_id.clone());
            }
        }

        RemoteRoute {
            destination_cidr_block: payload.destination_cidr_block.clone(),
            destination_ipv6_cidr_block: payload.destination_ipv6_cidr_block.clone(),
            destination_prefix_list_id: None,
            targets,
            instance_owner_id,
            origin: Some("CreateRoute".to_string()),
            state: Some("active".to_string()),
        }
    }
}

#[async_trait]
impl RoutingApi for MockRoutingApi {
    async fn describe_routes(
        &self,
        route_table_id: &str,
    ) -> Result<RouteTableDescription, ApiError> {
        self.record(ApiCall::DescribeRoutes {
            route_table_id: route_table_id.to_string(),
        })
        .await;

        if let Some(error) = self.take_scripted(ApiOperation::Describe) {
            return Err(error);
        }

        let Some(mut entries) = self.tables.get_mut(route_table_id) else {
            return Ok(RouteTableDescription::missing());
        };

        let mut visible = Vec::with_capacity(entries.len());
        for entry in entries.iter_mut() {
            if entry.hidden_reads > 0 {
                entry.hidden_reads -= 1;
            } else {
                visible.push(entry.route.clone());
            }
        }
        Ok(RouteTableDescription::found(visible))
    }

    async fn create_route(&self, payload: &RoutePayload) -> Result<(), ApiError> {
        self.record(ApiCall::CreateRoute(payload.clone())).await;

        if let Some(error) = self.take_scripted(ApiOperation::Create) {
            return Err(error);
        }

        let route = self.build_route(payload);
        let hidden_reads = self.visibility_lag.load(Ordering::SeqCst);

        let Some(mut entries) = self.tables.get_mut(&payload.route_table_id) else {
            return Err(ApiError::route_table_not_found(&payload.route_table_id));
        };

        let ipv4 = payload.destination_cidr_block.as_deref();
        let ipv6 = payload.destination_ipv6_cidr_block.as_deref();
        if entries.iter().any(|entry| entry.matches(ipv4, ipv6)) {
            return Err(ApiError::other(
                "RouteAlreadyExists",
                format!("The route identified by {payload} already exists"),
            ));
        }

        entries.push(MockRouteEntry {
            route,
            hidden_reads,
        });
        Ok(())
    }

    async fn replace_route(&self, payload: &RoutePayload) -> Result<(), ApiError> {
        self.record(ApiCall::ReplaceRoute(payload.clone())).await;

        if let Some(error) = self.take_scripted(ApiOperation::Replace) {
            return Err(error);
        }

        let replacement = self.build_route(payload);

        let Some(mut entries) = self.tables.get_mut(&payload.route_table_id) else {
            return Err(ApiError::route_table_not_found(&payload.route_table_id));
        };

        let ipv4 = payload.destination_cidr_block.as_deref();
        let ipv6 = payload.destination_ipv6_cidr_block.as_deref();
        let entry = entries
            .iter_mut()
            .find(|entry| entry.matches(ipv4, ipv6))
            .ok_or_else(|| {
                ApiError::route_not_found(format!("no route matching {payload}"))
            })?;

        entry.route.targets = replacement.targets;
        entry.route.instance_owner_id = replacement.instance_owner_id;
        entry.route.origin = Some("CreateRoute".to_string());
        Ok(())
    }

    async fn delete_route(&self, payload: &DeleteRoutePayload) -> Result<(), ApiError> {
        self.record(ApiCall::DeleteRoute(payload.clone())).await;

        if let Some(error) = self.take_scripted(ApiOperation::Delete) {
            return Err(error);
        }

        let Some(mut entries) = self.tables.get_mut(&payload.route_table_id) else {
            return Err(ApiError::route_table_not_found(&payload.route_table_id));
        };

        let ipv4 = payload.destination_cidr_block.as_deref();
        let ipv6 = payload.destination_ipv6_cidr_block.as_deref();
        let before = entries.len();
        entries.retain(|entry| !entry.matches(ipv4, ipv6));

        if entries.len() == before {
            return Err(ApiError::route_not_found(format!(
                "no route matching {payload}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Destination;

    fn gateway_payload(table: &str, cidr: &str) -> RoutePayload {
        RoutePayload::new(table, RouteTarget::Gateway("igw-1".to_string()))
            .with_destination(Destination::Ipv4(cidr.to_string()))
    }

    #[tokio::test]
    async fn test_create_then_describe() {
        let api = MockRoutingApi::new();
        api.add_table("rtb-1");

        api.create_route(&gateway_payload("rtb-1", "10.0.0.0/16"))
            .await
            .unwrap();

        let description = api.describe_routes("rtb-1").await.unwrap();
        assert!(description.found);
        assert_eq!(description.routes.len(), 1);
        assert_eq!(
            description.routes[0].destination_cidr_block.as_deref(),
            Some("10.0.0.0/16")
        );
        assert_eq!(description.routes[0].state.as_deref(), Some("active"));
    }

    #[tokio::test]
    async fn test_missing_table() {
        let api = MockRoutingApi::new();

        let description = api.describe_routes("rtb-none").await.unwrap();
        assert!(!description.found);

        let err = api
            .create_route(&gateway_payload("rtb-none", "10.0.0.0/16"))
            .await
            .unwrap_err();
        assert!(err.is_route_table_not_found());
    }

    #[tokio::test]
    async fn test_visibility_lag_hides_new_routes() {
        let api = MockRoutingApi::new().with_visibility_lag(2);
        api.add_table("rtb-1");
        api.create_route(&gateway_payload("rtb-1", "10.0.0.0/16"))
            .await
            .unwrap();

        assert!(api.describe_routes("rtb-1").await.unwrap().routes.is_empty());
        assert!(api.describe_routes("rtb-1").await.unwrap().routes.is_empty());
        assert_eq!(api.describe_routes("rtb-1").await.unwrap().routes.len(), 1);
    }

    #[tokio::test]
    async fn test_scripted_errors_are_consumed_in_order() {
        let api = MockRoutingApi::new();
        api.add_table("rtb-1");
        api.fail_next(
            ApiOperation::Create,
            ApiError::parameter_propagating("first"),
        );
        api.fail_next(ApiOperation::Create, ApiError::other("Boom", "second"));

        let payload = gateway_payload("rtb-1", "10.0.0.0/16");
        let first = api.create_route(&payload).await.unwrap_err();
        assert!(first.is_parameter_propagating());
        let second = api.create_route(&payload).await.unwrap_err();
        assert_eq!(second.code, "Boom");
        tokio_test::assert_ok!(api.create_route(&payload).await);

        assert_eq!(api.call_count(ApiOperation::Create).await, 3);
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let api = MockRoutingApi::new();
        api.add_table("rtb-1");
        let payload = gateway_payload("rtb-1", "10.0.0.0/16");
        api.create_route(&payload).await.unwrap();

        let err = api.create_route(&payload).await.unwrap_err();
        assert_eq!(err.code, "RouteAlreadyExists");
    }

    #[tokio::test]
    async fn test_instance_route_reports_interface() {
        let api = MockRoutingApi::new();
        api.add_table("rtb-1");
        api.register_instance("i-1", "eni-1", "123456789012");

        let payload = RoutePayload::new("rtb-1", RouteTarget::Instance("i-1".to_string()))
            .with_destination(Destination::Ipv4("10.1.0.0/16".to_string()));
        api.create_route(&payload).await.unwrap();

        let routes = api.routes("rtb-1").unwrap();
        assert_eq!(routes[0].targets.get(TargetKind::Instance), Some("i-1"));
        assert_eq!(
            routes[0].targets.get(TargetKind::NetworkInterface),
            Some("eni-1")
        );
        assert_eq!(routes[0].instance_owner_id.as_deref(), Some("123456789012"));
    }

    #[tokio::test]
    async fn test_replace_and_delete() {
        let api = MockRoutingApi::new();
        api.add_table("rtb-1");
        api.create_route(&gateway_payload("rtb-1", "10.0.0.0/16"))
            .await
            .unwrap();

        let replacement = RoutePayload::new("rtb-1", RouteTarget::NatGateway("nat-1".to_string()))
            .with_destination(Destination::Ipv4("10.0.0.0/16".to_string()));
        api.replace_route(&replacement).await.unwrap();

        let routes = api.routes("rtb-1").unwrap();
        assert_eq!(routes[0].targets.populated(), vec![TargetKind::NatGateway]);

        let delete = DeleteRoutePayload {
            route_table_id: "rtb-1".to_string(),
            destination_cidr_block: Some("10.0.0.0/16".to_string()),
            destination_ipv6_cidr_block: None,
        };
        api.delete_route(&delete).await.unwrap();
        assert!(api.routes("rtb-1").unwrap().is_empty());

        let err = api.delete_route(&delete).await.unwrap_err();
        assert!(err.is_route_not_found());
    }
}
