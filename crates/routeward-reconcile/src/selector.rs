//! Target selection
//!
//! The single translation point from the flat record of optional target
//! fields to a [`RouteTarget`]. Exactly one field may be populated, with one
//! exception on update: the remote system fills in `network_interface_id`
//! for routes created through an instance, so an update carrying both
//! `instance_id` and `network_interface_id` selects the instance.

use routeward_core::{DesiredRoute, ReconcileError, ReconcileResult, RouteTarget, TargetKind};

/// Field order checked on create
const CREATE_FIELDS: [TargetKind; 8] = [
    TargetKind::EgressOnlyGateway,
    TargetKind::Gateway,
    TargetKind::NatGateway,
    TargetKind::LocalGateway,
    TargetKind::Instance,
    TargetKind::NetworkInterface,
    TargetKind::TransitGateway,
    TargetKind::VpcPeeringConnection,
];

/// Field order checked on update
const UPDATE_FIELDS: [TargetKind; 8] = [
    TargetKind::EgressOnlyGateway,
    TargetKind::Gateway,
    TargetKind::NatGateway,
    TargetKind::LocalGateway,
    TargetKind::NetworkInterface,
    TargetKind::Instance,
    TargetKind::TransitGateway,
    TargetKind::VpcPeeringConnection,
];

/// The lifecycle operation a target is selected for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOperation {
    Create,
    Update,
}

impl TargetOperation {
    /// Target kinds considered for this operation, in check order
    pub fn allowed_kinds(&self) -> &'static [TargetKind] {
        match self {
            TargetOperation::Create => &CREATE_FIELDS,
            TargetOperation::Update => &UPDATE_FIELDS,
        }
    }

    /// Configuration attribute names considered for this operation
    pub fn allowed_fields(&self) -> Vec<&'static str> {
        self.allowed_kinds()
            .iter()
            .map(|kind| kind.field_name())
            .collect()
    }
}

/// Select the single configured target of `route`
///
/// Pure validation; no remote call is made.
pub fn select_target(route: &DesiredRoute, op: TargetOperation) -> ReconcileResult<RouteTarget> {
    let populated: Vec<TargetKind> = op
        .allowed_kinds()
        .iter()
        .copied()
        .filter(|kind| route.targets.get(*kind).is_some())
        .collect();

    let selected = match populated.as_slice() {
        [] => {
            return Err(ReconcileError::MissingTarget {
                route_table_id: route.route_table_id.clone(),
                allowed: op.allowed_fields(),
            });
        }
        [kind] => *kind,
        kinds if op == TargetOperation::Update && is_instance_with_interface(kinds) => {
            TargetKind::Instance
        }
        kinds => {
            return Err(ReconcileError::AmbiguousTarget {
                route_table_id: route.route_table_id.clone(),
                fields: kinds.iter().map(|kind| kind.field_name()).collect(),
                allowed: op.allowed_fields(),
            });
        }
    };

    // Only populated kinds reach this point, so the lookup is infallible
    let id = route.targets.get(selected).unwrap_or_default();
    Ok(RouteTarget::new(selected, id))
}

fn is_instance_with_interface(kinds: &[TargetKind]) -> bool {
    kinds.len() == 2
        && kinds.contains(&TargetKind::Instance)
        && kinds.contains(&TargetKind::NetworkInterface)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_route(targets: &[(TargetKind, &str)]) -> DesiredRoute {
        targets
            .iter()
            .fold(
                DesiredRoute::new("rtb-1").with_ipv4_destination("10.0.0.0/16"),
                |route, (kind, id)| route.with_target(*kind, *id),
            )
    }

    #[test]
    fn test_single_target_selected() {
        for kind in TargetKind::ALL {
            let route = make_route(&[(kind, "res-1")]);
            for op in [TargetOperation::Create, TargetOperation::Update] {
                let target = select_target(&route, op).unwrap();
                assert_eq!(target, RouteTarget::new(kind, "res-1"));
            }
        }
    }

    #[test]
    fn test_missing_target() {
        let route = make_route(&[]);
        let err = select_target(&route, TargetOperation::Create).unwrap_err();
        match err {
            ReconcileError::MissingTarget {
                route_table_id,
                allowed,
            } => {
                assert_eq!(route_table_id, "rtb-1");
                assert_eq!(allowed.len(), 8);
                assert_eq!(allowed[0], "egress_only_gateway_id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_strings_do_not_count() {
        let route = make_route(&[(TargetKind::Gateway, ""), (TargetKind::NatGateway, "nat-1")]);
        let target = select_target(&route, TargetOperation::Create).unwrap();
        assert_eq!(target, RouteTarget::NatGateway("nat-1".to_string()));
    }

    #[test]
    fn test_two_targets_ambiguous() {
        let route = make_route(&[
            (TargetKind::Gateway, "igw-1"),
            (TargetKind::NatGateway, "nat-1"),
        ]);
        for op in [TargetOperation::Create, TargetOperation::Update] {
            let err = select_target(&route, op).unwrap_err();
            match err {
                ReconcileError::AmbiguousTarget { fields, .. } => {
                    assert_eq!(fields, vec!["gateway_id", "nat_gateway_id"]);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_instance_with_interface_on_update() {
        let route = make_route(&[
            (TargetKind::Instance, "i-1"),
            (TargetKind::NetworkInterface, "eni-1"),
        ]);
        let target = select_target(&route, TargetOperation::Update).unwrap();
        assert_eq!(target, RouteTarget::Instance("i-1".to_string()));
    }

    #[test]
    fn test_instance_with_interface_on_create_is_ambiguous() {
        let route = make_route(&[
            (TargetKind::Instance, "i-1"),
            (TargetKind::NetworkInterface, "eni-1"),
        ]);
        let err = select_target(&route, TargetOperation::Create).unwrap_err();
        assert!(matches!(err, ReconcileError::AmbiguousTarget { .. }));
    }

    #[test]
    fn test_instance_exception_needs_exactly_two() {
        let route = make_route(&[
            (TargetKind::Instance, "i-1"),
            (TargetKind::NetworkInterface, "eni-1"),
            (TargetKind::Gateway, "igw-1"),
        ]);
        let err = select_target(&route, TargetOperation::Update).unwrap_err();
        match err {
            ReconcileError::AmbiguousTarget { fields, .. } => {
                assert_eq!(
                    fields,
                    vec!["gateway_id", "network_interface_id", "instance_id"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_update_order_swaps_instance_and_interface() {
        let create = TargetOperation::Create.allowed_fields();
        let update = TargetOperation::Update.allowed_fields();
        assert_eq!(create[4], "instance_id");
        assert_eq!(create[5], "network_interface_id");
        assert_eq!(update[4], "network_interface_id");
        assert_eq!(update[5], "instance_id");
    }
}
