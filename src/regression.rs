//! Composite cost-of-living model
//!
//! The training side exports a linear regression over the four named index
//! features as JSON. Prediction is a pure function of the feature vector.

use crate::error::AdvisorError;
use crate::models::{FeatureVector, FEATURE_NAMES};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Anything that maps four projected indices to one composite index
pub trait CompositeModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> f64;
}

/// On-disk artifact layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressionModel {
    /// Coefficients in `FEATURE_NAMES` order
    coefficients: [f64; 4],
    intercept: f64,
}

impl LinearRegressionModel {
    pub fn new(coefficients: [f64; 4], intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AdvisorError::MissingAsset(format!(
                "model artifact not found at {}",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .map_err(|e| AdvisorError::Model(format!("unreadable model artifact: {}", e)))?;

        let model = Self::from_artifact(&artifact)?;
        info!(path = %path.display(), "Composite model loaded");
        Ok(model)
    }

    /// Validates feature names and re-orders coefficients canonically
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self> {
        if artifact.feature_names.len() != FEATURE_NAMES.len()
            || artifact.coefficients.len() != FEATURE_NAMES.len()
        {
            return Err(AdvisorError::Model(format!(
                "expected {} features and coefficients, got {} and {}",
                FEATURE_NAMES.len(),
                artifact.feature_names.len(),
                artifact.coefficients.len()
            )));
        }

        let mut coefficients = [0.0; 4];
        for (slot, expected) in FEATURE_NAMES.iter().enumerate() {
            let position = artifact
                .feature_names
                .iter()
                .position(|name| name.trim() == *expected)
                .ok_or_else(|| {
                    AdvisorError::Model(format!("artifact is missing feature '{}'", expected))
                })?;
            coefficients[slot] = artifact.coefficients[position];
        }

        Ok(Self::new(coefficients, artifact.intercept))
    }
}

impl CompositeModel for LinearRegressionModel {
    fn predict(&self, features: &FeatureVector) -> f64 {
        features
            .as_array()
            .iter()
            .zip(self.coefficients.iter())
            .fold(self.intercept, |acc, (x, w)| acc + x * w)
    }
}
