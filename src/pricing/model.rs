use serde::{Deserialize, Serialize};

use super::policy::{arcane_energy_cost, default_complexity, default_risk, word_count};
use super::request::SimulationRequest;
use super::tables::{Complexity, RiskLevel, catalyst_modifier, resolve_catalyst_quality, round2};
use crate::catalog::MaterialCatalog;
use crate::ids::MaterialId;

const DURATION_PER_MATERIAL: f64 = 0.04;
const DURATION_WORD_ALLOWANCE: usize = 22;
const DURATION_PER_EXTRA_WORD: f64 = 0.8;

/// One priced row of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialBreakdown {
    pub material_id: MaterialId,
    pub name: String,
    pub quantity: f64,
    pub unit_cost: f64,
    pub subtotal: f64,
}

/// Cost and duration estimate for a [`SimulationRequest`].
///
/// `estimated_cost` is always `round2((base_material_cost + arcane_energy_cost)
/// * complexity_weight * risk_multiplier * catalyst_modifier)` over the fields
/// as stored, and the breakdown subtotals sum to `base_material_cost`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub complexity: Complexity,
    pub risk_level: RiskLevel,
    pub catalyst_quality: u8,
    pub base_material_cost: f64,
    pub arcane_energy_cost: f64,
    pub complexity_weight: f64,
    pub risk_multiplier: f64,
    pub catalyst_modifier: f64,
    pub estimated_cost: f64,
    pub duration_seconds: u64,
    pub materials_breakdown: Vec<MaterialBreakdown>,
}

/// Deterministic pricing over materials, complexity, risk and catalyst.
#[derive(Debug, Clone, Copy)]
pub struct PricingModel {
    base_duration_secs: f64,
}

impl PricingModel {
    pub fn new(base_duration_secs: u64) -> Self {
        Self {
            base_duration_secs: base_duration_secs as f64,
        }
    }

    /// Prices a request. Total for validated input: unknown materials are
    /// left out of the breakdown instead of failing.
    pub fn simulate(
        &self,
        request: &SimulationRequest,
        catalog: &dyn MaterialCatalog,
    ) -> SimulationResult {
        let description = request.resolved_description();

        let complexity = request
            .complexity
            .unwrap_or_else(|| default_complexity(&description));
        let risk_level = request
            .risk_level
            .unwrap_or_else(|| default_risk(&description));
        let catalyst_quality = resolve_catalyst_quality(request.catalyst_quality);

        let materials_breakdown = price_materials(request, catalog);
        let base_material_cost = round2(materials_breakdown.iter().map(|b| b.subtotal).sum());
        let arcane_energy_cost = round2(arcane_energy_cost(&description));

        let complexity_weight = complexity.weight();
        let risk_multiplier = risk_level.multiplier();
        let catalyst_modifier = round2(catalyst_modifier(catalyst_quality));
        let scale = complexity_weight * risk_multiplier * catalyst_modifier;

        let estimated_cost = round2((base_material_cost + arcane_energy_cost) * scale);

        let extra_words = word_count(&description).saturating_sub(DURATION_WORD_ALLOWANCE);
        let base_duration = self.base_duration_secs
            * (1.0 + materials_breakdown.len() as f64 * DURATION_PER_MATERIAL)
            + extra_words as f64 * DURATION_PER_EXTRA_WORD;
        let duration_seconds = (base_duration * scale).round().max(0.0) as u64;

        SimulationResult {
            complexity,
            risk_level,
            catalyst_quality,
            base_material_cost,
            arcane_energy_cost,
            complexity_weight,
            risk_multiplier,
            catalyst_modifier,
            estimated_cost,
            duration_seconds,
            materials_breakdown,
        }
    }
}

fn price_materials(
    request: &SimulationRequest,
    catalog: &dyn MaterialCatalog,
) -> Vec<MaterialBreakdown> {
    request
        .merged_materials()
        .into_iter()
        .filter_map(|line| {
            let Some(material) = catalog.lookup(line.material_id) else {
                tracing::debug!(material_id = line.material_id.0, "unknown material dropped from simulation");
                return None;
            };
            let name = if material.name.trim().is_empty() {
                line.material_id.to_string()
            } else {
                material.name
            };
            Some(MaterialBreakdown {
                material_id: line.material_id,
                name,
                quantity: round2(line.quantity),
                unit_cost: round2(material.unit_cost),
                subtotal: round2(material.unit_cost * line.quantity),
            })
        })
        .collect()
}
