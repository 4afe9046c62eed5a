use std::fmt;

use serde::{Deserialize, Serialize};

use super::actor::{Actor, ActorRole};
use crate::error::TransitionDenial;
use crate::ids::AlchemistId;

/// Lifecycle status of a transmutation.
///
/// Each transmutation flows through: PENDING_APPROVAL → IN_PROGRESS → COMPLETED,
/// and may be CANCELLED from either non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransmutationStatus {
    PendingApproval,
    InProgress,
    Completed,
    Cancelled,
}

impl TransmutationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransmutationStatus::Completed | TransmutationStatus::Cancelled
        )
    }

    /// Statuses reachable in one step.
    pub fn successors(self) -> &'static [TransmutationStatus] {
        match self {
            TransmutationStatus::PendingApproval => &[
                TransmutationStatus::InProgress,
                TransmutationStatus::Cancelled,
            ],
            TransmutationStatus::InProgress => &[
                TransmutationStatus::Completed,
                TransmutationStatus::Cancelled,
            ],
            TransmutationStatus::Completed | TransmutationStatus::Cancelled => &[],
        }
    }
}

impl fmt::Display for TransmutationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmutationStatus::PendingApproval => write!(f, "PENDING_APPROVAL"),
            TransmutationStatus::InProgress => write!(f, "IN_PROGRESS"),
            TransmutationStatus::Completed => write!(f, "COMPLETED"),
            TransmutationStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl std::str::FromStr for TransmutationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING_APPROVAL" => Ok(TransmutationStatus::PendingApproval),
            "IN_PROGRESS" => Ok(TransmutationStatus::InProgress),
            "COMPLETED" => Ok(TransmutationStatus::Completed),
            "CANCELLED" => Ok(TransmutationStatus::Cancelled),
            other => Err(format!("invalid status {other}")),
        }
    }
}

/// The result of evaluating a requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Target equals the current status; nothing to apply.
    Unchanged,
    /// Move from `from` to `to`.
    Advance {
        from: TransmutationStatus,
        to: TransmutationStatus,
    },
}

/// Decides whether a status change is allowed.
pub struct StateMachine;

impl StateMachine {
    /// Evaluate moving a transmutation owned by `owner` from `current` to
    /// `target` on behalf of `actor`.
    ///
    /// - Same status is always `Unchanged`, whoever asks.
    /// - Terminal statuses refuse everything else.
    /// - Approval (→ IN_PROGRESS) and completion (→ COMPLETED) need a supervisor.
    /// - Cancellation needs a supervisor or the owning alchemist.
    pub fn evaluate(
        current: TransmutationStatus,
        target: TransmutationStatus,
        actor: &Actor,
        owner: AlchemistId,
    ) -> Result<Transition, TransitionDenial> {
        if current == target {
            return Ok(Transition::Unchanged);
        }
        if current.is_terminal() {
            return Err(TransitionDenial::Terminal);
        }
        if !current.successors().contains(&target) {
            return Err(TransitionDenial::Unreachable);
        }

        let allowed = match target {
            TransmutationStatus::InProgress | TransmutationStatus::Completed => {
                actor.role == ActorRole::Supervisor
            }
            TransmutationStatus::Cancelled => {
                actor.role == ActorRole::Supervisor || actor.alchemist_id == Some(owner)
            }
            TransmutationStatus::PendingApproval => false,
        };
        if !allowed {
            return Err(TransitionDenial::Capability);
        }

        Ok(Transition::Advance {
            from: current,
            to: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransmutationStatus::*;

    const OWNER: AlchemistId = AlchemistId(7);

    fn supervisor() -> Actor {
        Actor::supervisor()
    }

    #[test]
    fn pending_reaches_only_in_progress_or_cancelled() {
        for target in [InProgress, Cancelled] {
            assert!(matches!(
                StateMachine::evaluate(PendingApproval, target, &supervisor(), OWNER),
                Ok(Transition::Advance { .. })
            ));
        }
        assert_eq!(
            StateMachine::evaluate(PendingApproval, Completed, &supervisor(), OWNER),
            Err(TransitionDenial::Unreachable)
        );
    }

    #[test]
    fn in_progress_reaches_only_completed_or_cancelled() {
        for target in [Completed, Cancelled] {
            assert_eq!(
                StateMachine::evaluate(InProgress, target, &supervisor(), OWNER),
                Ok(Transition::Advance {
                    from: InProgress,
                    to: target
                })
            );
        }
        assert_eq!(
            StateMachine::evaluate(InProgress, PendingApproval, &supervisor(), OWNER),
            Err(TransitionDenial::Unreachable)
        );
    }

    #[test]
    fn terminal_statuses_refuse_every_change() {
        for from in [Completed, Cancelled] {
            for to in [PendingApproval, InProgress, Completed, Cancelled] {
                if from == to {
                    continue;
                }
                assert_eq!(
                    StateMachine::evaluate(from, to, &supervisor(), OWNER),
                    Err(TransitionDenial::Terminal)
                );
            }
        }
    }

    #[test]
    fn same_status_is_unchanged() {
        for s in [PendingApproval, InProgress, Completed, Cancelled] {
            assert_eq!(
                StateMachine::evaluate(s, s, &Actor::alchemist(AlchemistId(1)), OWNER),
                Ok(Transition::Unchanged)
            );
        }
    }

    #[test]
    fn alchemist_cannot_approve_or_complete() {
        let owner = Actor::alchemist(OWNER);
        assert_eq!(
            StateMachine::evaluate(PendingApproval, InProgress, &owner, OWNER),
            Err(TransitionDenial::Capability)
        );
        assert_eq!(
            StateMachine::evaluate(InProgress, Completed, &owner, OWNER),
            Err(TransitionDenial::Capability)
        );
    }

    #[test]
    fn only_owner_or_supervisor_cancels() {
        assert!(
            StateMachine::evaluate(PendingApproval, Cancelled, &Actor::alchemist(OWNER), OWNER)
                .is_ok()
        );
        assert_eq!(
            StateMachine::evaluate(
                InProgress,
                Cancelled,
                &Actor::alchemist(AlchemistId(8)),
                OWNER
            ),
            Err(TransitionDenial::Capability)
        );
    }

    #[test]
    fn status_display_and_parse() {
        assert_eq!(PendingApproval.to_string(), "PENDING_APPROVAL");
        assert_eq!(InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(" in_progress ".parse::<TransmutationStatus>().unwrap(), InProgress);
        assert!("FAILED".parse::<TransmutationStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&Cancelled).unwrap(),
            "\"CANCELLED\""
        );
    }
}
