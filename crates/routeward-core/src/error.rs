//! Error types for Routeward
//!
//! Every surfaced error names the route table and, where relevant, the
//! destination and offending target fields, so an operator can locate the
//! failing declaration without cross-referencing logs.

use std::fmt;

use thiserror::Error;

use crate::api::ApiError;

/// The lifecycle operation a remote failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "creating",
            Operation::Read => "reading",
            Operation::Delete => "deleting",
        };
        f.write_str(name)
    }
}

/// Why a lookup for a just-created route came back empty
#[derive(Debug, Error)]
pub enum LookupMiss {
    /// The table holds no matching route yet
    #[error("route not yet visible")]
    Absent,

    /// The lookup itself failed
    #[error(transparent)]
    Failed(Box<ReconcileError>),
}

/// Errors surfaced by route lifecycle operations
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "route in table {route_table_id}: more than 1 target specified ({}); only one of {} is allowed",
        .fields.join(", "),
        .allowed.join(", ")
    )]
    AmbiguousTarget {
        route_table_id: String,
        fields: Vec<&'static str>,
        allowed: Vec<&'static str>,
    },

    #[error(
        "route in table {route_table_id}: a valid target type is missing; specify one of the following attributes: {}",
        .allowed.join(", ")
    )]
    MissingTarget {
        route_table_id: String,
        allowed: Vec<&'static str>,
    },

    #[error("route in table {route_table_id}: no destination CIDR block specified")]
    NoDestination { route_table_id: String },

    #[error("route in table {route_table_id}: invalid destination {destination}: {reason}")]
    InvalidDestination {
        route_table_id: String,
        destination: String,
        reason: String,
    },

    #[error("unexpected format of ID ({id:?}), expected ROUTETABLEID_DESTINATION")]
    InvalidImportId { id: String },

    #[error("route table {route_table_id} not found")]
    TableNotFound { route_table_id: String },

    #[error(
        "unable to find matching route for route table ({route_table_id}) and destination ({destination}) after {attempts} attempts: {last_miss}"
    )]
    ConfirmationTimeout {
        route_table_id: String,
        destination: String,
        attempts: u32,
        #[source]
        last_miss: LookupMiss,
    },

    #[error("timed out creating route in table {route_table_id} for {destination}: {source}")]
    CreateTimeout {
        route_table_id: String,
        destination: String,
        #[source]
        source: ApiError,
    },

    #[error("timed out deleting route in table {route_table_id} for {destination}: {source}")]
    DeleteTimeout {
        route_table_id: String,
        destination: String,
        #[source]
        source: ApiError,
    },

    #[error("error replacing route in table {route_table_id} for {destination}: {source}")]
    Replace {
        route_table_id: String,
        destination: String,
        #[source]
        source: ApiError,
    },

    #[error("error {operation} route in table {route_table_id} for {destination}: {source}")]
    Remote {
        operation: Operation,
        route_table_id: String,
        destination: String,
        #[source]
        source: ApiError,
    },
}

impl ReconcileError {
    /// The route table the failure concerns, when one is known
    pub fn route_table_id(&self) -> Option<&str> {
        match self {
            Self::AmbiguousTarget { route_table_id, .. }
            | Self::MissingTarget { route_table_id, .. }
            | Self::NoDestination { route_table_id }
            | Self::InvalidDestination { route_table_id, .. }
            | Self::TableNotFound { route_table_id }
            | Self::ConfirmationTimeout { route_table_id, .. }
            | Self::CreateTimeout { route_table_id, .. }
            | Self::DeleteTimeout { route_table_id, .. }
            | Self::Replace { route_table_id, .. }
            | Self::Remote { route_table_id, .. } => Some(route_table_id),
            Self::InvalidImportId { .. } => None,
        }
    }

    /// Check if this error was raised before any remote call was made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousTarget { .. }
                | Self::MissingTarget { .. }
                | Self::NoDestination { .. }
                | Self::InvalidDestination { .. }
                | Self::InvalidImportId { .. }
        )
    }
}

/// Result type alias for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_target_display() {
        let err = ReconcileError::AmbiguousTarget {
            route_table_id: "rtb-1".to_string(),
            fields: vec!["gateway_id", "nat_gateway_id"],
            allowed: vec!["gateway_id", "nat_gateway_id", "instance_id"],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("rtb-1"));
        assert!(msg.contains("more than 1 target"));
        assert!(msg.contains("gateway_id, nat_gateway_id"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_target_lists_allowed_fields() {
        let err = ReconcileError::MissingTarget {
            route_table_id: "rtb-1".to_string(),
            allowed: vec!["gateway_id", "instance_id"],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("gateway_id, instance_id"));
        assert_eq!(err.route_table_id(), Some("rtb-1"));
    }

    #[test]
    fn test_timeout_errors_keep_last_remote_error() {
        let err = ReconcileError::DeleteTimeout {
            route_table_id: "rtb-1".to_string(),
            destination: "10.0.0.0/16".to_string(),
            source: ApiError::parameter_propagating("still propagating"),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("rtb-1"));
        assert!(msg.contains("10.0.0.0/16"));
        assert!(msg.contains("InvalidParameterException"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_confirmation_timeout_keeps_last_miss() {
        let err = ReconcileError::ConfirmationTimeout {
            route_table_id: "rtb-1".to_string(),
            destination: "10.0.0.0/16".to_string(),
            attempts: 3,
            last_miss: LookupMiss::Failed(Box::new(ReconcileError::TableNotFound {
                route_table_id: "rtb-1".to_string(),
            })),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("after 3 attempts"));
        assert!(msg.ends_with("route table rtb-1 not found"));

        let source = std::error::Error::source(&err).unwrap();
        let miss = source.downcast_ref::<LookupMiss>().unwrap();
        assert!(matches!(
            miss,
            LookupMiss::Failed(inner) if matches!(**inner, ReconcileError::TableNotFound { .. })
        ));

        let absent = ReconcileError::ConfirmationTimeout {
            route_table_id: "rtb-1".to_string(),
            destination: "10.0.0.0/16".to_string(),
            attempts: 3,
            last_miss: LookupMiss::Absent,
        };
        assert!(format!("{}", absent).ends_with("route not yet visible"));
    }

    #[test]
    fn test_remote_error_names_operation() {
        let err = ReconcileError::Remote {
            operation: Operation::Create,
            route_table_id: "rtb-1".to_string(),
            destination: "10.0.0.0/16".to_string(),
            source: ApiError::other("UnauthorizedOperation", "denied"),
        };
        let msg = format!("{}", err);
        assert!(msg.starts_with("error creating route"));
        assert!(msg.contains("UnauthorizedOperation"));
    }

    #[test]
    fn test_import_id_error_has_no_table() {
        let err = ReconcileError::InvalidImportId {
            id: "bogus".to_string(),
        };
        assert!(err.route_table_id().is_none());
        assert!(format!("{}", err).contains("ROUTETABLEID_DESTINATION"));
    }
}
