//! Route model types
//!
//! A route is addressed by its route table and destination and forwards
//! matching traffic to exactly one next-hop target. The configuration layer
//! presents targets as a flat record of optional fields ([`TargetFields`]);
//! inside the engine they travel as the tagged union [`RouteTarget`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// The eight kinds of next-hop target a route can forward to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Internet or virtual private gateway
    Gateway,
    /// Egress-only internet gateway (IPv6 only)
    EgressOnlyGateway,
    /// NAT gateway
    NatGateway,
    /// Local gateway (outpost)
    LocalGateway,
    /// NAT instance
    Instance,
    /// Elastic network interface
    NetworkInterface,
    /// Transit gateway
    TransitGateway,
    /// VPC peering connection
    VpcPeeringConnection,
}

impl TargetKind {
    /// Every target kind, in declaration order
    pub const ALL: [TargetKind; 8] = [
        TargetKind::Gateway,
        TargetKind::EgressOnlyGateway,
        TargetKind::NatGateway,
        TargetKind::LocalGateway,
        TargetKind::Instance,
        TargetKind::NetworkInterface,
        TargetKind::TransitGateway,
        TargetKind::VpcPeeringConnection,
    ];

    /// Configuration attribute name for this kind
    pub fn field_name(&self) -> &'static str {
        match self {
            TargetKind::Gateway => "gateway_id",
            TargetKind::EgressOnlyGateway => "egress_only_gateway_id",
            TargetKind::NatGateway => "nat_gateway_id",
            TargetKind::LocalGateway => "local_gateway_id",
            TargetKind::Instance => "instance_id",
            TargetKind::NetworkInterface => "network_interface_id",
            TargetKind::TransitGateway => "transit_gateway_id",
            TargetKind::VpcPeeringConnection => "vpc_peering_connection_id",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A single selected next-hop target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RouteTarget {
    Gateway(String),
    EgressOnlyGateway(String),
    NatGateway(String),
    LocalGateway(String),
    Instance(String),
    NetworkInterface(String),
    TransitGateway(String),
    VpcPeeringConnection(String),
}

impl RouteTarget {
    /// Build a target from its kind and remote resource id
    pub fn new(kind: TargetKind, id: impl Into<String>) -> Self {
        let id = id.into();
        match kind {
            TargetKind::Gateway => Self::Gateway(id),
            TargetKind::EgressOnlyGateway => Self::EgressOnlyGateway(id),
            TargetKind::NatGateway => Self::NatGateway(id),
            TargetKind::LocalGateway => Self::LocalGateway(id),
            TargetKind::Instance => Self::Instance(id),
            TargetKind::NetworkInterface => Self::NetworkInterface(id),
            TargetKind::TransitGateway => Self::TransitGateway(id),
            TargetKind::VpcPeeringConnection => Self::VpcPeeringConnection(id),
        }
    }

    /// The kind of this target
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Gateway(_) => TargetKind::Gateway,
            Self::EgressOnlyGateway(_) => TargetKind::EgressOnlyGateway,
            Self::NatGateway(_) => TargetKind::NatGateway,
            Self::LocalGateway(_) => TargetKind::LocalGateway,
            Self::Instance(_) => TargetKind::Instance,
            Self::NetworkInterface(_) => TargetKind::NetworkInterface,
            Self::TransitGateway(_) => TargetKind::TransitGateway,
            Self::VpcPeeringConnection(_) => TargetKind::VpcPeeringConnection,
        }
    }

    /// The remote resource id this target points at
    pub fn id(&self) -> &str {
        match self {
            Self::Gateway(id)
            | Self::EgressOnlyGateway(id)
            | Self::NatGateway(id)
            | Self::LocalGateway(id)
            | Self::Instance(id)
            | Self::NetworkInterface(id)
            | Self::TransitGateway(id)
            | Self::VpcPeeringConnection(id) => id,
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind(), self.id())
    }
}

/// Flat record of optional target fields, as the configuration layer sees them
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetFields {
    pub gateway_id: Option<String>,
    pub egress_only_gateway_id: Option<String>,
    pub nat_gateway_id: Option<String>,
    pub local_gateway_id: Option<String>,
    pub instance_id: Option<String>,
    pub network_interface_id: Option<String>,
    pub transit_gateway_id: Option<String>,
    pub vpc_peering_connection_id: Option<String>,
}

impl TargetFields {
    /// Record holding exactly the given target
    pub fn from_target(target: &RouteTarget) -> Self {
        let mut fields = Self::default();
        fields.set(target.kind(), target.id());
        fields
    }

    /// Non-empty value of the field for `kind`
    pub fn get(&self, kind: TargetKind) -> Option<&str> {
        self.slot(kind).as_deref().filter(|v| !v.is_empty())
    }

    /// Set the field for `kind`
    pub fn set(&mut self, kind: TargetKind, value: impl Into<String>) {
        *self.slot_mut(kind) = Some(value.into());
    }

    /// Kinds whose field holds a non-empty value, in declaration order
    pub fn populated(&self) -> Vec<TargetKind> {
        TargetKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }

    fn slot(&self, kind: TargetKind) -> &Option<String> {
        match kind {
            TargetKind::Gateway => &self.gateway_id,
            TargetKind::EgressOnlyGateway => &self.egress_only_gateway_id,
            TargetKind::NatGateway => &self.nat_gateway_id,
            TargetKind::LocalGateway => &self.local_gateway_id,
            TargetKind::Instance => &self.instance_id,
            TargetKind::NetworkInterface => &self.network_interface_id,
            TargetKind::TransitGateway => &self.transit_gateway_id,
            TargetKind::VpcPeeringConnection => &self.vpc_peering_connection_id,
        }
    }

    fn slot_mut(&mut self, kind: TargetKind) -> &mut Option<String> {
        match kind {
            TargetKind::Gateway => &mut self.gateway_id,
            TargetKind::EgressOnlyGateway => &mut self.egress_only_gateway_id,
            TargetKind::NatGateway => &mut self.nat_gateway_id,
            TargetKind::LocalGateway => &mut self.local_gateway_id,
            TargetKind::Instance => &mut self.instance_id,
            TargetKind::NetworkInterface => &mut self.network_interface_id,
            TargetKind::TransitGateway => &mut self.transit_gateway_id,
            TargetKind::VpcPeeringConnection => &mut self.vpc_peering_connection_id,
        }
    }
}

/// A route destination selector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", content = "cidr", rename_all = "snake_case")]
pub enum Destination {
    /// IPv4 CIDR block, e.g. `10.0.0.0/16`
    Ipv4(String),
    /// IPv6 CIDR block, e.g. `2001:db8::/32`
    Ipv6(String),
}

impl Destination {
    /// Classify an external destination string: a colon marks IPv6
    pub fn parse(value: &str) -> Self {
        if value.contains(':') {
            Self::Ipv6(value.to_string())
        } else {
            Self::Ipv4(value.to_string())
        }
    }

    /// The CIDR string
    pub fn cidr(&self) -> &str {
        match self {
            Self::Ipv4(cidr) | Self::Ipv6(cidr) => cidr,
        }
    }

    /// Check if this is an IPv6 destination
    pub fn is_ipv6(&self) -> bool {
        matches!(self, Self::Ipv6(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cidr())
    }
}

/// Declarative description of one managed route
///
/// Supplied by the configuration layer and never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRoute {
    /// Route table the route lives in (immutable for the route's lifetime)
    pub route_table_id: String,
    /// IPv4 destination CIDR
    #[serde(default)]
    pub destination_cidr_block: Option<String>,
    /// IPv6 destination CIDR
    #[serde(default)]
    pub destination_ipv6_cidr_block: Option<String>,
    /// Next-hop target fields; exactly one should be set
    #[serde(flatten)]
    pub targets: TargetFields,
}

impl DesiredRoute {
    /// Create a route description with no destination or target
    pub fn new(route_table_id: impl Into<String>) -> Self {
        Self {
            route_table_id: route_table_id.into(),
            ..Default::default()
        }
    }

    /// Set the IPv4 destination
    pub fn with_ipv4_destination(mut self, cidr: impl Into<String>) -> Self {
        self.destination_cidr_block = Some(cidr.into());
        self
    }

    /// Set the IPv6 destination
    pub fn with_ipv6_destination(mut self, cidr: impl Into<String>) -> Self {
        self.destination_ipv6_cidr_block = Some(cidr.into());
        self
    }

    /// Set a destination of either family
    pub fn with_destination(self, destination: Destination) -> Self {
        match destination {
            Destination::Ipv4(cidr) => self.with_ipv4_destination(cidr),
            Destination::Ipv6(cidr) => self.with_ipv6_destination(cidr),
        }
    }

    /// Set the target field for `kind`
    pub fn with_target(mut self, kind: TargetKind, id: impl Into<String>) -> Self {
        self.targets.set(kind, id);
        self
    }

    /// Non-empty IPv4 destination
    pub fn ipv4_destination(&self) -> Option<&str> {
        non_empty(&self.destination_cidr_block)
    }

    /// Non-empty IPv6 destination
    pub fn ipv6_destination(&self) -> Option<&str> {
        non_empty(&self.destination_ipv6_cidr_block)
    }

    /// The destination used for single-destination calls (IPv4 preferred)
    pub fn primary_destination(&self) -> Option<Destination> {
        self.ipv4_destination()
            .map(|cidr| Destination::Ipv4(cidr.to_string()))
            .or_else(|| {
                self.ipv6_destination()
                    .map(|cidr| Destination::Ipv6(cidr.to_string()))
            })
    }

    /// Human-readable destination for log and error messages
    pub fn destination_label(&self) -> String {
        match (self.ipv4_destination(), self.ipv6_destination()) {
            (Some(v4), Some(v6)) => format!("{v4}, {v6}"),
            (Some(v4), None) => v4.to_string(),
            (None, Some(v6)) => v6.to_string(),
            (None, None) => "<none>".to_string(),
        }
    }
}

/// The remote system's view of a route
///
/// Mirrors [`DesiredRoute`] and adds fields the remote system computes.
/// The computed fields are never sent on mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRoute {
    pub route_table_id: String,
    pub destination_cidr_block: Option<String>,
    pub destination_ipv6_cidr_block: Option<String>,
    pub destination_prefix_list_id: Option<String>,
    #[serde(flatten)]
    pub targets: TargetFields,
    pub instance_owner_id: Option<String>,
    pub origin: Option<String>,
    pub state: Option<String>,
}

impl ObservedRoute {
    /// The target the remote system reports as active
    ///
    /// When a route was created through an instance the remote system also
    /// reports the instance's network interface; the instance wins.
    pub fn active_target(&self) -> Option<RouteTarget> {
        if let Some(id) = self.targets.get(TargetKind::Instance) {
            return Some(RouteTarget::Instance(id.to_string()));
        }
        self.targets
            .populated()
            .first()
            .and_then(|kind| self.targets.get(*kind).map(|id| RouteTarget::new(*kind, id)))
    }

    /// Overwrite a desired-state record with everything observed
    ///
    /// This is how drift in destination or active target reaches the
    /// configuration layer.
    pub fn to_desired(&self) -> DesiredRoute {
        DesiredRoute {
            route_table_id: self.route_table_id.clone(),
            destination_cidr_block: self.destination_cidr_block.clone(),
            destination_ipv6_cidr_block: self.destination_ipv6_cidr_block.clone(),
            targets: self.targets.clone(),
        }
    }
}

/// Deterministic external handle of a managed route
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteIdentity(String);

impl RouteIdentity {
    /// Wrap an already-computed identifier
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_roundtrip_through_fields() {
        for kind in TargetKind::ALL {
            let target = RouteTarget::new(kind, "res-1");
            let fields = TargetFields::from_target(&target);
            assert_eq!(fields.populated(), vec![kind]);
            assert_eq!(fields.get(kind), Some("res-1"));
        }
    }

    #[test]
    fn test_empty_field_is_unset() {
        let mut fields = TargetFields::default();
        fields.set(TargetKind::Gateway, "");
        assert!(fields.get(TargetKind::Gateway).is_none());
        assert!(fields.populated().is_empty());
    }

    #[test]
    fn test_target_display() {
        let target = RouteTarget::NatGateway("nat-1".to_string());
        assert_eq!(target.to_string(), "nat_gateway_id=nat-1");
        assert_eq!(target.kind(), TargetKind::NatGateway);
        assert_eq!(target.id(), "nat-1");
    }

    #[test]
    fn test_destination_parse() {
        assert_eq!(
            Destination::parse("10.0.0.0/16"),
            Destination::Ipv4("10.0.0.0/16".to_string())
        );
        assert!(Destination::parse("2001:db8::/32").is_ipv6());
    }

    #[test]
    fn test_primary_destination_prefers_ipv4() {
        let route = DesiredRoute::new("rtb-1")
            .with_ipv4_destination("10.0.0.0/16")
            .with_ipv6_destination("2001:db8::/32");
        assert_eq!(
            route.primary_destination(),
            Some(Destination::Ipv4("10.0.0.0/16".to_string()))
        );

        let v6_only = DesiredRoute::new("rtb-1").with_ipv6_destination("2001:db8::/32");
        assert_eq!(
            v6_only.primary_destination(),
            Some(Destination::Ipv6("2001:db8::/32".to_string()))
        );

        let empty = DesiredRoute::new("rtb-1").with_ipv4_destination("");
        assert!(empty.primary_destination().is_none());
        assert_eq!(empty.destination_label(), "<none>");
    }

    #[test]
    fn test_active_target_prefers_instance() {
        let mut observed = ObservedRoute::default();
        observed.targets.set(TargetKind::NetworkInterface, "eni-1");
        observed.targets.set(TargetKind::Instance, "i-1");
        assert_eq!(
            observed.active_target(),
            Some(RouteTarget::Instance("i-1".to_string()))
        );

        let mut observed = ObservedRoute::default();
        observed.targets.set(TargetKind::Gateway, "igw-1");
        assert_eq!(
            observed.active_target(),
            Some(RouteTarget::Gateway("igw-1".to_string()))
        );

        assert!(ObservedRoute::default().active_target().is_none());
    }

    #[test]
    fn test_desired_route_deserializes_flat_record() {
        let json = r#"{
            "route_table_id": "rtb-1",
            "destination_cidr_block": "10.0.0.0/16",
            "gateway_id": "igw-1"
        }"#;
        let route: DesiredRoute = serde_json::from_str(json).unwrap();
        assert_eq!(route.route_table_id, "rtb-1");
        assert_eq!(route.ipv4_destination(), Some("10.0.0.0/16"));
        assert_eq!(route.targets.get(TargetKind::Gateway), Some("igw-1"));
        assert!(route.ipv6_destination().is_none());
    }
}
