//! Core data models for the advisor

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= City =================
//

/// One dataset row. Indices are normalized so the reference city equals 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    #[serde(rename = "City")]
    pub name: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Cost of Living Index")]
    pub cost_of_living_index: f64,
    #[serde(rename = "Rent Index")]
    pub rent_index: f64,
    #[serde(rename = "Groceries Index")]
    pub groceries_index: f64,
    #[serde(rename = "Restaurant Price Index")]
    pub restaurant_price_index: f64,
    #[serde(rename = "Local Purchasing Power Index")]
    pub purchasing_power_index: f64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

impl CityRecord {
    /// The four model inputs at their current (unprojected) values
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            rent_index: self.rent_index,
            groceries_index: self.groceries_index,
            restaurant_price_index: self.restaurant_price_index,
            purchasing_power_index: self.purchasing_power_index,
        }
    }
}

//
// ================= Model I/O =================
//

/// Canonical feature names, in the order the composite model consumes them
pub const FEATURE_NAMES: [&str; 4] = [
    "Rent Index",
    "Groceries Index",
    "Restaurant Price Index",
    "Local Purchasing Power Index",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub rent_index: f64,
    pub groceries_index: f64,
    pub restaurant_price_index: f64,
    pub purchasing_power_index: f64,
}

impl FeatureVector {
    /// Values in `FEATURE_NAMES` order
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.rent_index,
            self.groceries_index,
            self.restaurant_price_index,
            self.purchasing_power_index,
        ]
    }
}

//
// ================= Projection =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub city: String,
    pub target_year: i32,
    pub years_ahead: i32,
    pub cost_multiplier: f64,
    pub wage_multiplier: f64,
    pub projected: FeatureVector,
    /// Model-predicted overall cost-of-living index
    pub composite_index: f64,
}

//
// ================= User Profile =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum IncomeBracket {
    Student,
    #[default]
    Average,
    Senior,
}

impl IncomeBracket {
    /// Accepts the snake_case names and the display labels; unknown values
    /// mean `Average`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "student" | "entry" | "student / entry level" => IncomeBracket::Student,
            "senior" | "senior professional" => IncomeBracket::Senior,
            _ => IncomeBracket::Average,
        }
    }
}

impl From<String> for IncomeBracket {
    fn from(value: String) -> Self {
        IncomeBracket::parse(&value)
    }
}

impl fmt::Display for IncomeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IncomeBracket::Student => "Student / Entry Level",
            IncomeBracket::Average => "Average Worker",
            IncomeBracket::Senior => "Senior Professional",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_parsing_defaults_to_average() {
        assert_eq!(IncomeBracket::parse("Student"), IncomeBracket::Student);
        assert_eq!(IncomeBracket::parse("SENIOR"), IncomeBracket::Senior);
        assert_eq!(IncomeBracket::parse("whatever"), IncomeBracket::Average);
    }

    #[test]
    fn test_bracket_deserializes_from_labels() {
        let brackets: Vec<IncomeBracket> =
            serde_json::from_str(r#"["student", "Senior Professional", "Average Worker"]"#).unwrap();
        assert_eq!(
            brackets,
            vec![IncomeBracket::Student, IncomeBracket::Senior, IncomeBracket::Average]
        );

        let label = IncomeBracket::parse(&IncomeBracket::Student.to_string());
        assert_eq!(label, IncomeBracket::Student);
        assert_eq!(serde_json::to_value(IncomeBracket::Senior).unwrap(), "senior");
    }

    #[test]
    fn test_feature_order_matches_names() {
        let features = FeatureVector {
            rent_index: 1.0,
            groceries_index: 2.0,
            restaurant_price_index: 3.0,
            purchasing_power_index: 4.0,
        };
        assert_eq!(features.as_array(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(FEATURE_NAMES[3], "Local Purchasing Power Index");
    }
}
