//! Affordability scoring
//!
//! Deterministic bands over burden ratios (cost / income). The band limits
//! are parameters; the defaults mirror the dashboard's published verdicts.

use crate::models::CityRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffordabilityThresholds {
    /// Upper limits (exclusive) for general-cost burden bands
    pub cost_of_living: [f64; 3],
    pub rent: [f64; 3],
    /// Applied to total burden (rent + general)
    pub purchasing_power: [f64; 3],
    pub hidden_gem_below: f64,
    pub high_risk_above: f64,
    pub housing_trap_rent_above: f64,
    pub high_stress_above: f64,
}

impl Default for AffordabilityThresholds {
    fn default() -> Self {
        Self {
            cost_of_living: [0.40, 0.60, 0.80],
            rent: [0.20, 0.35, 0.50],
            purchasing_power: [0.60, 0.80, 0.95],
            hidden_gem_below: 0.50,
            high_risk_above: 0.90,
            housing_trap_rent_above: 0.40,
            high_stress_above: 1.5,
        }
    }
}

fn band(value: f64, limits: &[f64; 3]) -> usize {
    limits.iter().position(|limit| value < *limit).unwrap_or(limits.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostVerdict {
    HighlyAffordable,
    Moderate,
    Expensive,
    SevereRisk,
}

impl CostVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            CostVerdict::HighlyAffordable => "Highly Affordable",
            CostVerdict::Moderate => "Moderate",
            CostVerdict::Expensive => "Expensive",
            CostVerdict::SevereRisk => "Severe Risk",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CostVerdict::HighlyAffordable => "General living costs are comfortably low.",
            CostVerdict::Moderate => "Balanced living expenses.",
            CostVerdict::Expensive => "Basic expenses consume most of the salary.",
            CostVerdict::SevereRisk => "General expenses exceed standard income.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentVerdict {
    VeryAffordable,
    Manageable,
    High,
    Extreme,
}

impl RentVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            RentVerdict::VeryAffordable => "Very Affordable",
            RentVerdict::Manageable => "Manageable",
            RentVerdict::High => "High",
            RentVerdict::Extreme => "Extreme",
        }
    }

    pub fn description(&self, rent_pct: f64) -> String {
        match self {
            RentVerdict::Extreme => format!("Takes up {}% of local income (Crisis).", rent_pct),
            _ => format!("Takes up {}% of local income.", rent_pct),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerVerdict {
    Excellent,
    Strong,
    Low,
    Deficit,
}

impl PowerVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            PowerVerdict::Excellent => "Excellent",
            PowerVerdict::Strong => "Strong",
            PowerVerdict::Low => "Low",
            PowerVerdict::Deficit => "Deficit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PowerVerdict::Excellent => "High savings potential.",
            PowerVerdict::Strong => "Comfortable buffer for savings.",
            PowerVerdict::Low => "Living paycheck to paycheck.",
            PowerVerdict::Deficit => "Financial deficit. Total expenses exceed income.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    HiddenGem,
    HighRisk,
    HousingTrap,
    Stable,
}

impl Recommendation {
    pub fn summary(&self) -> &'static str {
        match self {
            Recommendation::HiddenGem => {
                "HIDDEN GEM: High purchasing power with highly manageable local costs."
            }
            Recommendation::HighRisk => {
                "HIGH RISK: Total estimated costs severely outweigh expected purchasing power."
            }
            Recommendation::HousingTrap => {
                "HOUSING TRAP: General costs are okay, but housing is highly unaffordable."
            }
            Recommendation::Stable => "STABLE: Income generally balances well against costs.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurdenAnalysis {
    pub rent_burden: f64,
    pub cost_of_living_burden: f64,
    pub total_burden: f64,
    /// Rent burden as a percentage, one decimal place
    pub rent_pct: f64,
    pub cost_of_living: CostVerdict,
    pub rent: RentVerdict,
    pub purchasing_power: PowerVerdict,
    pub recommendation: Recommendation,
}

/// Classify monthly USD amounts. A non-positive income counts every burden
/// as 1.0.
pub fn assess(
    income: f64,
    rent: f64,
    general: f64,
    thresholds: &AffordabilityThresholds,
) -> BurdenAnalysis {
    let (rent_burden, cost_of_living_burden) = if income > 0.0 {
        (rent / income, general / income)
    } else {
        (1.0, 1.0)
    };
    let total_burden = rent_burden + cost_of_living_burden;

    let cost_of_living = match band(cost_of_living_burden, &thresholds.cost_of_living) {
        0 => CostVerdict::HighlyAffordable,
        1 => CostVerdict::Moderate,
        2 => CostVerdict::Expensive,
        _ => CostVerdict::SevereRisk,
    };

    let rent_verdict = match band(rent_burden, &thresholds.rent) {
        0 => RentVerdict::VeryAffordable,
        1 => RentVerdict::Manageable,
        2 => RentVerdict::High,
        _ => RentVerdict::Extreme,
    };

    let purchasing_power = match band(total_burden, &thresholds.purchasing_power) {
        0 => PowerVerdict::Excellent,
        1 => PowerVerdict::Strong,
        2 => PowerVerdict::Low,
        _ => PowerVerdict::Deficit,
    };

    let recommendation = if total_burden < thresholds.hidden_gem_below {
        Recommendation::HiddenGem
    } else if total_burden > thresholds.high_risk_above {
        Recommendation::HighRisk
    } else if rent_burden > thresholds.housing_trap_rent_above {
        Recommendation::HousingTrap
    } else {
        Recommendation::Stable
    };

    BurdenAnalysis {
        rent_burden,
        cost_of_living_burden,
        total_burden,
        rent_pct: (rent_burden * 1000.0).round() / 10.0,
        cost_of_living,
        rent: rent_verdict,
        purchasing_power,
        recommendation,
    }
}

/// (rent + cost of living) / purchasing power; 0 when power is 0
pub fn stress_ratio(city: &CityRecord) -> f64 {
    if city.purchasing_power_index == 0.0 {
        return 0.0;
    }
    let ratio = (city.rent_index + city.cost_of_living_index) / city.purchasing_power_index;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}
