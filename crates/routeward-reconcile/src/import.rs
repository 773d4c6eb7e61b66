//! Import id parsing
//!
//! An existing route is imported by the id `<route_table_id>_<destination>`.
//! A colon in the destination marks it as IPv6.

use routeward_core::{Destination, ReconcileError, ReconcileResult};

/// Split an import id into its route table and destination
pub fn parse_import_id(id: &str) -> ReconcileResult<(String, Destination)> {
    let invalid = || ReconcileError::InvalidImportId { id: id.to_string() };

    let parts: Vec<&str> = id.split('_').collect();
    match parts.as_slice() {
        [table, destination] if !table.is_empty() && !destination.is_empty() => {
            Ok((table.to_string(), Destination::parse(destination)))
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4() {
        let (table, destination) = parse_import_id("rtb-1_10.0.0.0/16").unwrap();
        assert_eq!(table, "rtb-1");
        assert_eq!(destination, Destination::Ipv4("10.0.0.0/16".to_string()));
    }

    #[test]
    fn test_parse_ipv6() {
        let (table, destination) = parse_import_id("rtb-2_2001:db8::/32").unwrap();
        assert_eq!(table, "rtb-2");
        assert_eq!(destination, Destination::Ipv6("2001:db8::/32".to_string()));
    }

    #[test]
    fn test_rejects_malformed_ids() {
        for id in [
            "",
            "rtb-1",
            "_10.0.0.0/16",
            "rtb-1_",
            "rtb_1_10.0.0.0/16",
            "_",
        ] {
            let err = parse_import_id(id).unwrap_err();
            assert!(
                matches!(err, ReconcileError::InvalidImportId { .. }),
                "expected rejection of {id:?}"
            );
        }
    }
}
