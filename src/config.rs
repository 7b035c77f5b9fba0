//! Runtime configuration
//!
//! Everything is read from the environment (a `.env` file is loaded by the
//! binaries). Financial constants can additionally be overridden from a JSON
//! file pointed to by `FINANCIAL_PARAMS_PATH`.

use crate::affordability::AffordabilityThresholds;
use crate::currency::{BracketIncomes, BudgetShares};
use crate::error::AdvisorError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CITY_DATA_PATH: &str = "city_stats_with_coords.csv";
pub const DEFAULT_MODEL_PATH: &str = "cost_of_living_model.json";
pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://open.er-api.com/v6/latest/USD";
pub const DEFAULT_RATE_CACHE_TTL: Duration = Duration::from_secs(86_400);
pub const DEFAULT_BASE_YEAR: i32 = 2025;

#[derive(Debug, Clone)]
pub struct AssetPaths {
    pub city_data: PathBuf,
    pub model: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub groq_api_key: String,
    pub groq_model: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub claude_api_key: String,
    pub claude_model: String,
    /// Fan out to providers concurrently (one task each) instead of in turn
    pub parallel: bool,
}

#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub url: String,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSettings {
    pub base_year: i32,
    pub default_inflation: f64,
    pub default_increment: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            base_year: DEFAULT_BASE_YEAR,
            default_inflation: 0.06,
            default_increment: 0.04,
        }
    }
}

/// Constants that have varied between revisions of the dashboard; treated as
/// parameters rather than truths.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialParams {
    pub incomes: BracketIncomes,
    pub shares: BudgetShares,
    pub thresholds: AffordabilityThresholds,
}

impl FinancialParams {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AdvisorError::Config(format!(
                "Failed to read financial params {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub assets: AssetPaths,
    pub providers: ProviderSettings,
    pub exchange: ExchangeSettings,
    pub projection: ProjectionSettings,
    pub financial: FinancialParams,
    pub api_port: u16,
}

impl AdvisorConfig {
    pub fn from_env() -> Result<Self> {
        let financial = match env::var("FINANCIAL_PARAMS_PATH").ok() {
            Some(path) => FinancialParams::from_file(path.as_ref())?,
            None => FinancialParams::default(),
        };

        let defaults = ProjectionSettings::default();

        Ok(Self {
            assets: AssetPaths {
                city_data: env_or("CITY_DATA_PATH", DEFAULT_CITY_DATA_PATH).into(),
                model: env_or("MODEL_PATH", DEFAULT_MODEL_PATH).into(),
            },
            providers: ProviderSettings {
                groq_api_key: env_or("GROQ_API_KEY", ""),
                groq_model: env_or("GROQ_MODEL", crate::providers::groq::DEFAULT_MODEL),
                gemini_api_key: env_or("GEMINI_API_KEY", ""),
                gemini_model: env_or("GEMINI_MODEL", crate::providers::gemini::DEFAULT_MODEL),
                claude_api_key: env_or("CLAUDE_API_KEY", ""),
                claude_model: env_or("CLAUDE_MODEL", crate::providers::claude::DEFAULT_MODEL),
                parallel: env_parse("PARALLEL_PROVIDERS", true)?,
            },
            exchange: ExchangeSettings {
                url: env_or("EXCHANGE_RATE_URL", DEFAULT_EXCHANGE_RATE_URL),
                cache_ttl: Duration::from_secs(env_parse(
                    "RATE_CACHE_TTL_SECS",
                    DEFAULT_RATE_CACHE_TTL.as_secs(),
                )?),
            },
            projection: ProjectionSettings {
                base_year: env_parse("BASE_YEAR", defaults.base_year)?,
                default_inflation: env_parse("DEFAULT_INFLATION", defaults.default_inflation)?,
                default_increment: env_parse("DEFAULT_INCREMENT", defaults.default_increment)?,
            },
            financial,
            api_port: match env::var("PORT").or_else(|_| env::var("API_PORT")) {
                Ok(port) => parse_value("PORT", &port)?,
                Err(_) => 8080,
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => parse_value(key, &value),
        _ => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AdvisorError::Config(format!("{} has an invalid value: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert_eq!(parse_value::<bool>("PARALLEL_PROVIDERS", " false ").unwrap(), false);
    }

    #[test]
    fn test_financial_params_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "incomes": {{ "average": 5000.0 }} }}"#).unwrap();

        let params = FinancialParams::from_file(file.path()).unwrap();
        assert_eq!(params.incomes.average, 5000.0);
        assert_eq!(params.incomes.student, BracketIncomes::default().student);
        assert_eq!(params.shares, BudgetShares::default());
        assert_eq!(params.thresholds, AffordabilityThresholds::default());
    }

    #[test]
    fn test_missing_params_file_is_config_error() {
        let err = FinancialParams::from_file("/nonexistent/params.json".as_ref()).unwrap_err();
        assert!(matches!(err, AdvisorError::Config(_)));
    }
}
