//! Financial projection engine
//!
//! `projected = current * (1 + rate) ^ (target_year - base_year)`
//! Rent, groceries and restaurant prices follow inflation; purchasing power
//! follows the configured adjustment. The composite index comes from the
//! regression model applied to the projected features.

use crate::error::AdvisorError;
use crate::models::{CityRecord, FeatureVector, ProjectionResult};
use crate::regression::CompositeModel;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PowerAdjustment {
    /// Purchasing power held at its current value
    Unscaled,
    /// Divided by the cost multiplier
    CounterScaled,
    /// Wage growth over cost growth
    WageAdjusted { annual_increment: f64 },
}

/// Compound growth factor; exactly 1.0 at horizon 0
pub fn compound_multiplier(rate: f64, years: i32) -> f64 {
    (1.0 + rate).powi(years)
}

pub fn project_value(current: f64, rate: f64, years: i32) -> f64 {
    current * compound_multiplier(rate, years)
}

pub struct ProjectionEngine {
    model: Arc<dyn CompositeModel>,
    base_year: i32,
}

impl ProjectionEngine {
    pub fn new(model: Arc<dyn CompositeModel>, base_year: i32) -> Self {
        Self { model, base_year }
    }

    pub fn base_year(&self) -> i32 {
        self.base_year
    }

    pub fn years_ahead(&self, target_year: i32) -> Result<i32> {
        if target_year < self.base_year {
            return Err(AdvisorError::InvalidHorizon {
                target_year,
                base_year: self.base_year,
            });
        }
        Ok(target_year - self.base_year)
    }

    pub fn project(
        &self,
        city: &CityRecord,
        target_year: i32,
        annual_inflation: f64,
        power: PowerAdjustment,
    ) -> Result<ProjectionResult> {
        let years_ahead = self.years_ahead(target_year)?;
        let cost_multiplier = compound_multiplier(annual_inflation, years_ahead);

        let wage_multiplier = match power {
            PowerAdjustment::Unscaled | PowerAdjustment::CounterScaled => 1.0,
            PowerAdjustment::WageAdjusted { annual_increment } => {
                compound_multiplier(annual_increment, years_ahead)
            }
        };

        let purchasing_power_index = match power {
            PowerAdjustment::Unscaled => city.purchasing_power_index,
            PowerAdjustment::CounterScaled => city.purchasing_power_index / cost_multiplier,
            PowerAdjustment::WageAdjusted { .. } => {
                city.purchasing_power_index * (wage_multiplier / cost_multiplier)
            }
        };

        let projected = FeatureVector {
            rent_index: city.rent_index * cost_multiplier,
            groceries_index: city.groceries_index * cost_multiplier,
            restaurant_price_index: city.restaurant_price_index * cost_multiplier,
            purchasing_power_index,
        };

        Ok(ProjectionResult {
            city: city.name.clone(),
            target_year,
            years_ahead,
            cost_multiplier,
            wage_multiplier,
            composite_index: self.model.predict(&projected),
            projected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::LinearRegressionModel;

    fn paris() -> CityRecord {
        CityRecord {
            name: "Paris".into(),
            country: "France".into(),
            cost_of_living_index: 75.0,
            rent_index: 50.0,
            groceries_index: 60.0,
            restaurant_price_index: 55.0,
            purchasing_power_index: 90.0,
            latitude: 48.8566,
            longitude: 2.3522,
        }
    }

    fn engine() -> ProjectionEngine {
        let model = LinearRegressionModel::new([0.3, 0.35, 0.3, 0.05], 2.0);
        ProjectionEngine::new(Arc::new(model), 2025)
    }

    #[test]
    fn test_paris_two_years_at_five_percent() {
        let result = engine()
            .project(&paris(), 2027, 0.05, PowerAdjustment::Unscaled)
            .unwrap();

        assert_eq!(result.years_ahead, 2);
        assert!((result.projected.rent_index - 55.125).abs() < 1e-9);
        assert!((result.projected.groceries_index - 66.15).abs() < 1e-9);
        assert!((result.projected.restaurant_price_index - 60.6375).abs() < 1e-9);
        assert_eq!(result.projected.purchasing_power_index, 90.0);
    }

    #[test]
    fn test_horizon_zero_is_identity() {
        for rate in [0.0, 0.03, 0.15, 1.0] {
            let result = engine()
                .project(&paris(), 2025, rate, PowerAdjustment::CounterScaled)
                .unwrap();
            assert_eq!(result.projected, paris().features());
            assert_eq!(result.cost_multiplier, 1.0);
        }
    }

    #[test]
    fn test_projection_monotonic_in_rate() {
        for years in 1..10 {
            let mut previous = project_value(50.0, 0.0, years);
            for step in 1..=30 {
                let rate = step as f64 * 0.005;
                let current = project_value(50.0, rate, years);
                assert!(current > previous, "years={} rate={}", years, rate);
                previous = current;
            }
        }
    }

    #[test]
    fn test_power_adjustments() {
        let engine = engine();

        let counter = engine
            .project(&paris(), 2027, 0.05, PowerAdjustment::CounterScaled)
            .unwrap();
        assert!((counter.projected.purchasing_power_index - 90.0 / 1.1025).abs() < 1e-9);

        let wage = engine
            .project(
                &paris(),
                2027,
                0.05,
                PowerAdjustment::WageAdjusted {
                    annual_increment: 0.05,
                },
            )
            .unwrap();
        assert!((wage.projected.purchasing_power_index - 90.0).abs() < 1e-9);
        assert!((wage.wage_multiplier - 1.1025).abs() < 1e-9);
    }

    #[test]
    fn test_composite_is_model_of_projected_features() {
        let model = LinearRegressionModel::new([0.3, 0.35, 0.3, 0.05], 2.0);
        let result = engine()
            .project(&paris(), 2030, 0.06, PowerAdjustment::Unscaled)
            .unwrap();

        assert_eq!(result.composite_index, model.predict(&result.projected));

        let again = engine()
            .project(&paris(), 2030, 0.06, PowerAdjustment::Unscaled)
            .unwrap();
        assert_eq!(again.composite_index, result.composite_index);
    }

    #[test]
    fn test_target_before_base_year_rejected() {
        let err = engine()
            .project(&paris(), 2020, 0.05, PowerAdjustment::Unscaled)
            .unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::InvalidHorizon {
                target_year: 2020,
                base_year: 2025
            }
        ));
    }
}
