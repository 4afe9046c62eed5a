use serde::{Deserialize, Serialize};

use super::policy::GENERIC_DESCRIPTION;
use super::tables::{Complexity, RiskLevel};
use crate::error::ValidationError;
use crate::ids::MaterialId;

/// One requested material and how much of it to consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub material_id: MaterialId,
    pub quantity: f64,
}

/// A hypothetical transmutation to price. Also the payload of a start action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalyst_quality: Option<f64>,
    #[serde(default)]
    pub materials: Vec<MaterialLine>,
}

impl MaterialLine {
    pub fn new(material_id: i64, quantity: f64) -> Self {
        Self {
            material_id: MaterialId(material_id),
            quantity,
        }
    }
}

impl SimulationRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_material(mut self, material_id: i64, quantity: f64) -> Self {
        self.materials.push(MaterialLine::new(material_id, quantity));
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = Some(risk);
        self
    }

    pub fn with_catalyst(mut self, quality: f64) -> Self {
        self.catalyst_quality = Some(quality);
        self
    }

    /// Boundary validation. Pricing itself never fails; malformed lines are
    /// rejected here before they reach it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for line in &self.materials {
            if line.material_id.0 <= 0 {
                return Err(ValidationError::InvalidMaterialId(line.material_id));
            }
            // NaN fails this comparison too.
            if !(line.quantity > 0.0 && line.quantity.is_finite()) {
                return Err(ValidationError::NonPositiveQuantity {
                    material_id: line.material_id,
                    quantity: line.quantity,
                });
            }
        }
        Ok(())
    }

    /// Trimmed description, or the generic placeholder when blank.
    pub fn resolved_description(&self) -> String {
        let trimmed = self.description.trim();
        if trimmed.is_empty() {
            GENERIC_DESCRIPTION.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Lines with repeated material ids summed, in order of first appearance.
    pub fn merged_materials(&self) -> Vec<MaterialLine> {
        let mut merged: Vec<MaterialLine> = Vec::with_capacity(self.materials.len());
        for line in &self.materials {
            match merged.iter_mut().find(|m| m.material_id == line.material_id) {
                Some(existing) => existing.quantity += line.quantity,
                None => merged.push(line.clone()),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_repeated_materials_in_first_seen_order() {
        let req = SimulationRequest::new("x")
            .with_material(2, 1.0)
            .with_material(1, 2.0)
            .with_material(2, 0.5);
        let merged = req.merged_materials();
        assert_eq!(merged, vec![MaterialLine::new(2, 1.5), MaterialLine::new(1, 2.0)]);
    }

    #[test]
    fn rejects_non_positive_quantities() {
        for qty in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let req = SimulationRequest::new("x").with_material(1, qty);
            assert!(matches!(
                req.validate(),
                Err(ValidationError::NonPositiveQuantity { .. })
            ));
        }
    }

    #[test]
    fn rejects_non_positive_material_ids() {
        let req = SimulationRequest::new("x").with_material(0, 1.0);
        assert_eq!(
            req.validate(),
            Err(ValidationError::InvalidMaterialId(MaterialId(0)))
        );
    }

    #[test]
    fn empty_materials_are_valid() {
        assert!(SimulationRequest::new("").validate().is_ok());
    }

    #[test]
    fn blank_description_falls_back_to_generic() {
        assert_eq!(
            SimulationRequest::new("   ").resolved_description(),
            "Generic transmutation"
        );
        assert_eq!(
            SimulationRequest::new("  iron to gold ").resolved_description(),
            "iron to gold"
        );
    }

    #[test]
    fn deserializes_minimal_payload() {
        let req: SimulationRequest = serde_json::from_str(
            r#"{"materials": [{"material_id": 1, "quantity": 2}], "catalyst_quality": 5}"#,
        )
        .unwrap();
        assert_eq!(req.description, "");
        assert!(req.complexity.is_none());
        assert_eq!(req.catalyst_quality, Some(5.0));
        assert_eq!(req.materials, vec![MaterialLine::new(1, 2.0)]);
    }

    #[test]
    fn unknown_complexity_is_a_decode_error() {
        let res: Result<SimulationRequest, _> =
            serde_json::from_str(r#"{"complexity": "IMPOSSIBLE"}"#);
        assert!(res.is_err());
    }
}
