//! Fatal routing conditions and their diagnostic codes.

use crate::ids::{ConnectionId, NetId, UnitId};
use strand_common::InternalError;
use strand_config::ConfigError;
use strand_diagnostics::{Category, Diagnostic, DiagnosticCode, Locus};

/// A connection's sink could not be reached.
pub const UNREACHABLE_SINK: DiagnosticCode = DiagnosticCode::new(Category::Error, 401);
/// Two adjacent path units have no switch point between them.
pub const MISSING_SWITCH_POINT: DiagnosticCode = DiagnosticCode::new(Category::Error, 402);
/// A net's driver is taken and no usable alternate driver exists.
pub const MISSING_ALTERNATE_SOURCE: DiagnosticCode = DiagnosticCode::new(Category::Error, 403);
/// The configuration failed validation.
pub const INVALID_CONFIG: DiagnosticCode = DiagnosticCode::new(Category::Error, 404);
/// A router invariant broke.
pub const INTERNAL_DEFECT: DiagnosticCode = DiagnosticCode::new(Category::Error, 499);
/// The iteration budget ran out before convergence.
pub const ITERATIONS_EXHAUSTED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 410);
/// Tree repair could not make a net legal.
pub const REPAIR_INCOMPLETE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 411);
/// A net without sinks was not routed.
pub const NET_WITHOUT_SINKS: DiagnosticCode = DiagnosticCode::new(Category::Warning, 412);
/// A net's bounding box was dropped after a failed search.
pub const BOUNDING_BOX_RELAXED: DiagnosticCode = DiagnosticCode::new(Category::Routing, 420);

/// Errors that abort a routing run.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The search queue emptied before reaching the sink.
    #[error("sink of connection {connection} on net `{name}` is unreachable")]
    UnreachableSink {
        /// The owning net.
        net: NetId,
        /// The failed connection.
        connection: ConnectionId,
        /// The net's name.
        name: String,
    },

    /// A finished path contains a hop the fabric cannot realize.
    #[error("no switch point joins unit {from} to unit {to}")]
    MissingSwitchPoint {
        /// The upstream unit.
        from: UnitId,
        /// The downstream unit.
        to: UnitId,
    },

    /// The driver is reserved and there is no unreserved alternate.
    #[error("net `{name}` has no usable alternate driver")]
    MissingAlternateSource {
        /// The net.
        net: NetId,
        /// The net's name.
        name: String,
    },

    /// The router configuration was rejected.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// A router invariant broke.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl RouteError {
    /// The diagnostic code reported for this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            RouteError::UnreachableSink { .. } => UNREACHABLE_SINK,
            RouteError::MissingSwitchPoint { .. } => MISSING_SWITCH_POINT,
            RouteError::MissingAlternateSource { .. } => MISSING_ALTERNATE_SOURCE,
            RouteError::InvalidConfig(_) => INVALID_CONFIG,
            RouteError::Internal(_) => INTERNAL_DEFECT,
        }
    }

    /// The routing object the error concerns.
    pub fn locus(&self) -> Locus {
        match self {
            RouteError::UnreachableSink {
                net, connection, ..
            } => Locus::Connection {
                net: net.as_raw(),
                connection: connection.as_raw(),
            },
            RouteError::MissingSwitchPoint { from, to } => {
                Locus::UnitPair(from.as_raw(), to.as_raw())
            }
            RouteError::MissingAlternateSource { net, .. } => Locus::Net(net.as_raw()),
            RouteError::InvalidConfig(_) | RouteError::Internal(_) => Locus::Run,
        }
    }

    /// Converts the error into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string(), self.locus());
        match self {
            RouteError::UnreachableSink { .. } => diag.with_help(
                "check that the sink is not walled off by reserved or blocked resources",
            ),
            RouteError::MissingSwitchPoint { .. } | RouteError::Internal(_) => {
                diag.with_note("this is a router defect, not a property of the design")
            }
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_diagnostics::Severity;

    #[test]
    fn unreachable_sink_diagnostic() {
        let err = RouteError::UnreachableSink {
            net: NetId::from_raw(2),
            connection: ConnectionId::from_raw(7),
            name: "data".into(),
        };
        assert_eq!(
            err.to_string(),
            "sink of connection 7 on net `data` is unreachable"
        );
        let diag = err.to_diagnostic();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.to_string(), "E401");
        assert_eq!(diag.locus.to_string(), "net 2, connection 7");
        assert_eq!(diag.help.len(), 1);
    }

    #[test]
    fn missing_switch_point_names_both_units() {
        let err = RouteError::MissingSwitchPoint {
            from: UnitId::from_raw(8),
            to: UnitId::from_raw(9),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code.to_string(), "E402");
        assert_eq!(diag.locus, Locus::UnitPair(8, 9));
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn internal_error_passes_through() {
        let err: RouteError = InternalError::new("lost sink").into();
        assert_eq!(err.to_string(), "internal router error: lost sink");
        assert_eq!(err.locus(), Locus::Run);
    }

    #[test]
    fn config_error_converts() {
        let err: RouteError = ConfigError::ValidationError("bad".into()).into();
        assert_eq!(err.code().to_string(), "E404");
    }
}
