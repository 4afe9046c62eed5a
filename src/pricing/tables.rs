use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CATALYST_QUALITY: u8 = 3;
pub const MIN_CATALYST_QUALITY: u8 = 1;
pub const MAX_CATALYST_QUALITY: u8 = 5;

const CATALYST_STEP: f64 = 0.07;
const CATALYST_MODIFIER_FLOOR: f64 = 0.6;
const CATALYST_MODIFIER_CEIL: f64 = 1.4;

/// How demanding a transmutation is. Ordered from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Complexity {
    Trivial,
    Low,
    Medium,
    High,
    Master,
}

/// How dangerous a transmutation is. Ordered from safest to most dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Guarded,
    Medium,
    High,
    Critical,
}

impl Complexity {
    pub const ALL: [Complexity; 5] = [
        Complexity::Trivial,
        Complexity::Low,
        Complexity::Medium,
        Complexity::High,
        Complexity::Master,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Complexity::Trivial => 0.8,
            Complexity::Low => 1.0,
            Complexity::Medium => 1.35,
            Complexity::High => 1.75,
            Complexity::Master => 2.15,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Trivial => "TRIVIAL",
            Complexity::Low => "LOW",
            Complexity::Medium => "MEDIUM",
            Complexity::High => "HIGH",
            Complexity::Master => "MASTER",
        }
    }
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Low,
        RiskLevel::Guarded,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn multiplier(self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Guarded => 1.12,
            RiskLevel::Medium => 1.25,
            RiskLevel::High => 1.55,
            RiskLevel::Critical => 1.9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Guarded => "GUARDED",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_uppercase();
        Complexity::ALL
            .into_iter()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| format!("invalid complexity level: {s}"))
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_uppercase();
        RiskLevel::ALL
            .into_iter()
            .find(|r| r.as_str() == key)
            .ok_or_else(|| format!("invalid risk level: {s}"))
    }
}

/// Rounds and clamps a requested catalyst quality into `[1, 5]`.
/// Absent or non-finite input resolves to the default of 3.
pub fn resolve_catalyst_quality(input: Option<f64>) -> u8 {
    match input {
        Some(q) if q.is_finite() => q
            .round()
            .clamp(f64::from(MIN_CATALYST_QUALITY), f64::from(MAX_CATALYST_QUALITY))
            as u8,
        _ => DEFAULT_CATALYST_QUALITY,
    }
}

/// Cost/time modifier for a resolved catalyst quality. Decreases as quality rises.
pub fn catalyst_modifier(quality: u8) -> f64 {
    let diff = f64::from(DEFAULT_CATALYST_QUALITY) - f64::from(quality);
    (1.0 + diff * CATALYST_STEP).clamp(CATALYST_MODIFIER_FLOOR, CATALYST_MODIFIER_CEIL)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
