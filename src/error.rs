use thiserror::Error;

use crate::ids::{AlchemistId, MaterialId, TransmutationId};
use crate::lifecycle::TransmutationStatus;

/// Errors returned synchronously by `simulate`, `start` and `transition`.
///
/// A failed call leaves the store untouched and emits no change event.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("transmutation {0} not found")]
    NotFound(TransmutationId),

    #[error("transmutation {id} cannot move from {from} to {to}: {reason}")]
    IllegalTransition {
        id: TransmutationId,
        from: TransmutationStatus,
        to: TransmutationStatus,
        reason: TransitionDenial,
    },

    #[error("{alchemist_id} already has transmutation {existing} pending or running")]
    ActiveTransmutation {
        alchemist_id: AlchemistId,
        existing: TransmutationId,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("material {material_id} quantity must be positive, got {quantity}")]
    NonPositiveQuantity {
        material_id: MaterialId,
        quantity: f64,
    },

    #[error("invalid material id {0}")]
    InvalidMaterialId(MaterialId),

    #[error("{0} not found")]
    UnknownAlchemist(AlchemistId),
}

/// Why a transition was refused. Callers present these differently:
/// a capability problem needs escalation, a stale precondition needs a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionDenial {
    #[error("target is not reachable from the current status")]
    Unreachable,

    #[error("current status is terminal")]
    Terminal,

    #[error("actor lacks the capability for this transition")]
    Capability,

    #[error("expected status {expected} no longer holds")]
    StalePrecondition { expected: TransmutationStatus },
}

/// Change-feed failures. Consumed by the observer session's reconnect loop,
/// never surfaced to callers of the engine.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("could not connect to change feed: {0}")]
    ConnectFailed(String),

    #[error("change feed disconnected")]
    Disconnected,

    #[error("full-list resync failed: {0}")]
    ResyncFailed(String),
}

impl EngineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, EngineError::IllegalTransition { .. })
    }

    /// The denial reason when this is an illegal-transition error.
    pub fn denial(&self) -> Option<TransitionDenial> {
        match self {
            EngineError::IllegalTransition { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let err = EngineError::from(ValidationError::NonPositiveQuantity {
            material_id: MaterialId(4),
            quantity: 0.0,
        });
        assert_eq!(
            err.to_string(),
            "invalid request: material #4 quantity must be positive, got 0"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn illegal_transition_display_names_reason() {
        let err = EngineError::IllegalTransition {
            id: TransmutationId(9),
            from: TransmutationStatus::PendingApproval,
            to: TransmutationStatus::InProgress,
            reason: TransitionDenial::Capability,
        };
        assert_eq!(
            err.to_string(),
            "transmutation #9 cannot move from PENDING_APPROVAL to IN_PROGRESS: \
             actor lacks the capability for this transition"
        );
        assert_eq!(err.denial(), Some(TransitionDenial::Capability));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
        assert_send_sync::<ChannelError>();
    }
}
