mod model;
mod policy;
mod request;
mod tables;

pub use model::{MaterialBreakdown, PricingModel, SimulationResult};
pub use policy::{GENERIC_DESCRIPTION, arcane_energy_cost, default_complexity, default_risk};
pub use request::{MaterialLine, SimulationRequest};
pub use tables::{
    Complexity, DEFAULT_CATALYST_QUALITY, MAX_CATALYST_QUALITY, MIN_CATALYST_QUALITY, RiskLevel,
    catalyst_modifier, resolve_catalyst_quality, round2,
};
