//! Destination validation
//!
//! Runs before any remote call on create. An IPv4 destination must be the
//! network address of its block written canonically; an IPv6 destination
//! must carry no host bits.

use std::str::FromStr;

use ipnetwork::{Ipv4Network, Ipv6Network};
use routeward_core::{DesiredRoute, ReconcileError, ReconcileResult};

/// Validate the destinations of `route`, requiring at least one
pub fn validate_destinations(route: &DesiredRoute) -> ReconcileResult<()> {
    let ipv4 = route.ipv4_destination();
    let ipv6 = route.ipv6_destination();

    if ipv4.is_none() && ipv6.is_none() {
        return Err(ReconcileError::NoDestination {
            route_table_id: route.route_table_id.clone(),
        });
    }

    let invalid = |destination: &str, reason: String| ReconcileError::InvalidDestination {
        route_table_id: route.route_table_id.clone(),
        destination: destination.to_string(),
        reason,
    };

    if let Some(cidr) = ipv4 {
        check_ipv4_network(cidr).map_err(|reason| invalid(cidr, reason))?;
    }
    if let Some(cidr) = ipv6 {
        check_ipv6_network(cidr).map_err(|reason| invalid(cidr, reason))?;
    }
    Ok(())
}

/// Check that `cidr` is an IPv4 network address in canonical CIDR notation
pub fn check_ipv4_network(cidr: &str) -> Result<(), String> {
    if !cidr.contains('/') {
        return Err("missing prefix length".to_string());
    }
    let network = Ipv4Network::from_str(cidr).map_err(|e| e.to_string())?;
    let canonical = format!("{}/{}", network.network(), network.prefix());
    if canonical != cidr {
        return Err(format!(
            "expected a network address in canonical CIDR notation, got {cidr}, expected {canonical}"
        ));
    }
    Ok(())
}

/// Check that `cidr` is an IPv6 CIDR block with no host bits set
pub fn check_ipv6_network(cidr: &str) -> Result<(), String> {
    if !cidr.contains('/') {
        return Err("missing prefix length".to_string());
    }
    let network = Ipv6Network::from_str(cidr).map_err(|e| e.to_string())?;
    if network.ip() != network.network() {
        return Err(format!(
            "expected a network address, got {cidr}, expected {}/{}",
            network.network(),
            network.prefix()
        ));
    }
    Ok(())
}
