//! Default policy for inputs the caller left out.
//!
//! Complexity and risk are inferred from the description with keyword and
//! word-count rules. The rules are deterministic: the same description always
//! resolves to the same levels.

use super::tables::{Complexity, RiskLevel};

pub const GENERIC_DESCRIPTION: &str = "Generic transmutation";

const GENERIC_ENERGY_COST: f64 = 30.0;
const BASE_ENERGY_COST: f64 = 45.0;
const ENERGY_PER_WORD: f64 = 3.2;
const LONG_DESCRIPTION_CHARS: usize = 120;

fn is_generic(description: &str) -> bool {
    let trimmed = description.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(GENERIC_DESCRIPTION)
}

fn mentions_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lower.contains(k))
}

/// Infers a complexity level from the description.
pub fn default_complexity(description: &str) -> Complexity {
    if is_generic(description) {
        return Complexity::Low;
    }

    let lower = description.to_lowercase();
    let word_count = lower.split_whitespace().count();

    if mentions_any(&lower, &["philosopher", "forbidden"]) {
        Complexity::Master
    } else if word_count > 18 {
        Complexity::High
    } else if word_count > 10 {
        Complexity::Medium
    } else if word_count <= 3 {
        Complexity::Trivial
    } else {
        Complexity::Low
    }
}

/// Infers a risk level from the description.
pub fn default_risk(description: &str) -> RiskLevel {
    if is_generic(description) {
        return RiskLevel::Guarded;
    }

    let lower = description.to_lowercase();
    if mentions_any(&lower, &["forbidden", "human"]) {
        RiskLevel::Critical
    } else if mentions_any(&lower, &["unstable", "volatile", "experimental"]) {
        RiskLevel::High
    } else if lower.contains("prototype") {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Baseline energy charge. Depends on the description only, never on materials.
pub fn arcane_energy_cost(description: &str) -> f64 {
    if is_generic(description) {
        return GENERIC_ENERGY_COST;
    }

    let trimmed = description.trim();
    let lower = trimmed.to_lowercase();
    let words = trimmed.split_whitespace().count();

    let mut cost = BASE_ENERGY_COST + words as f64 * ENERGY_PER_WORD;
    if trimmed.chars().count() > LONG_DESCRIPTION_CHARS {
        cost += 18.0;
    }
    if lower.contains("human") {
        cost += 40.0;
    } else if lower.contains("metal") {
        cost += 12.0;
    }
    if lower.contains("philosopher") {
        cost += 55.0;
    }
    cost
}

/// Word count used by the duration formula.
pub fn word_count(description: &str) -> usize {
    description.split_whitespace().count()
}
