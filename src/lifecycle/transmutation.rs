use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::TransmutationStatus;
use crate::ids::{AlchemistId, TransmutationId};
use crate::pricing::SimulationResult;

/// A transmutation work order with its estimation snapshot.
///
/// `revision` starts at 1 and grows by one with every applied transition, so
/// two snapshots of the same id can be ordered without trusting arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transmutation {
    pub id: TransmutationId,
    pub alchemist_id: AlchemistId,
    pub description: String,
    pub status: TransmutationStatus,
    pub estimated_cost: f64,
    pub estimated_duration_seconds: u64,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transmutation {
    pub fn new(
        id: TransmutationId,
        alchemist_id: AlchemistId,
        description: String,
        estimate: &SimulationResult,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            alchemist_id,
            description,
            status: TransmutationStatus::PendingApproval,
            estimated_cost: estimate.estimated_cost,
            estimated_duration_seconds: estimate.duration_seconds,
            revision: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending approval or in progress.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Applies an already-validated status change.
    pub(crate) fn advance(&mut self, to: TransmutationStatus) {
        self.status = to;
        self.revision += 1;
        self.updated_at = Utc::now();
    }
}
