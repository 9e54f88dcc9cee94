//! Error taxonomy for remote and inventory failures.

use thiserror::Error;

/// Typed failures surfaced by the gateway and the reconciliation engine.
///
/// The single-action ticket surface propagates these to its caller; the
/// batch surfaces catch them at the per-device boundary and convert them
/// into the `failed` counter.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Transport unreachable.
    #[error("cannot connect to RT: {0}")]
    Connection(String),

    /// Credential rejected or lacking permissions.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// RT answered with a non-2xx status and a body.
    #[error("RT API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Inventory lookup miss.
    #[error("device not found in inventory: {0}")]
    DeviceNotFound(String),
}

impl BridgeError {
    /// Failures that abort daemon startup rather than being retried on
    /// the next trigger.
    pub fn is_fatal_at_setup(&self) -> bool {
        matches!(self, BridgeError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_cause() {
        let err = BridgeError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn test_only_auth_is_fatal_at_setup() {
        assert!(BridgeError::Auth("bad token".into()).is_fatal_at_setup());
        assert!(!BridgeError::Connection("refused".into()).is_fatal_at_setup());
        assert!(!BridgeError::DeviceNotFound("dev-1".into()).is_fatal_at_setup());
    }
}
