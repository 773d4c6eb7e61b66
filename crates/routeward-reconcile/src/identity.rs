//! Route identity generation
//!
//! A route's identity is `r-<route_table_id><hash>` where the hash is the
//! 32-bit FNV-1a digest of the destination's UTF-8 bytes, rendered in
//! decimal. The IPv6 destination is hashed when present. Target ids never
//! participate, so retargeting a route keeps its identity.

use routeward_core::{ReconcileError, ReconcileResult, RouteIdentity};

const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x01000193;

/// 32-bit FNV-1a hash
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Compute the identity of a route from its table and destinations
///
/// Empty strings count as absent.
pub fn compute(
    route_table_id: &str,
    ipv4: Option<&str>,
    ipv6: Option<&str>,
) -> ReconcileResult<RouteIdentity> {
    let destination = ipv6
        .filter(|cidr| !cidr.is_empty())
        .or_else(|| ipv4.filter(|cidr| !cidr.is_empty()))
        .ok_or_else(|| ReconcileError::NoDestination {
            route_table_id: route_table_id.to_string(),
        })?;

    Ok(RouteIdentity::from_raw(format!(
        "r-{}{}",
        route_table_id,
        fnv1a_32(destination.as_bytes())
    )))
}
