use serde::{Deserialize, Serialize};

use crate::ids::AlchemistId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Alchemist,
    Supervisor,
}

/// Identity of the caller, passed explicitly into every lifecycle call.
/// Supplied by the identity collaborator and trusted as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: ActorRole,
    #[serde(default)]
    pub alchemist_id: Option<AlchemistId>,
}

impl Actor {
    pub fn supervisor() -> Self {
        Self {
            role: ActorRole::Supervisor,
            alchemist_id: None,
        }
    }

    pub fn alchemist(id: AlchemistId) -> Self {
        Self {
            role: ActorRole::Alchemist,
            alchemist_id: Some(id),
        }
    }
}
