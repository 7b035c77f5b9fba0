//! Advisor orchestrator
//!
//! FORECAST → CONTEXT → FAN-OUT → LOG (detached)
//!
//! Wires the dataset, projection engine, currency converter, provider gateway
//! and interaction logger together for one request at a time. All collaborators
//! are injected so tests can substitute fakes.

use crate::affordability::{self, BurdenAnalysis};
use crate::config::{AdvisorConfig, FinancialParams, ProjectionSettings, DEFAULT_RATE_CACHE_TTL};
use crate::currency::{Baseline, Category, CurrencyConverter, HttpRateSource, RateSnapshot, RateSource};
use crate::dataset::CityDataset;
use crate::gateway::LlmGateway;
use crate::history::ChatTurn;
use crate::logger::{build_store, InteractionLogEntry, InteractionLogger, StoreCredentials};
use crate::models::{CityRecord, IncomeBracket, ProjectionResult};
use crate::projection::{PowerAdjustment, ProjectionEngine};
use crate::providers::{build_http_client, default_providers, LlmProvider, ProviderOutcome};
use crate::regression::{CompositeModel, LinearRegressionModel};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};

//
// ================= Requests =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub city: String,
    pub year: i32,
    /// Annual inflation as a fraction; engine default when absent
    #[serde(default)]
    pub inflation: Option<f64>,
    /// Annual income increment as a fraction; engine default when absent
    #[serde(default)]
    pub increment: Option<f64>,
    #[serde(default)]
    pub bracket: IncomeBracket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultRequest {
    #[serde(flatten)]
    pub forecast: ForecastRequest,
    pub question: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

//
// ================= Reports =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFigures {
    pub rent: f64,
    pub groceries: f64,
    pub purchasing_power: f64,
    pub cost_of_living: f64,
}

/// Local-currency monthly amounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostFigures {
    pub rent: String,
    pub groceries: String,
    pub net_income: String,
    pub general: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub symbol: String,
    pub code: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub city: String,
    pub country: String,
    pub base_year: i32,
    pub target_year: i32,
    pub bracket: IncomeBracket,
    pub currency: CurrencyInfo,
    pub current: IndexFigures,
    pub current_costs: CostFigures,
    pub projection: ProjectionResult,
    pub projected: IndexFigures,
    pub projected_costs: CostFigures,
    pub affordability: BurdenAnalysis,
    pub breakdown: String,
}

pub struct Consultation {
    pub report: ForecastReport,
    /// Query sent to the gateway (forecast context + question)
    pub query: String,
    pub outcomes: Vec<ProviderOutcome>,
    /// Detached log write; resolving it is optional
    pub log_task: JoinHandle<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerClass {
    Selected,
    HighStress,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub stress_ratio: f64,
    pub class: MarkerClass,
}

//
// ================= Wiring =================
//

pub struct AdvisorComponents {
    pub dataset: Arc<CityDataset>,
    pub model: Arc<dyn CompositeModel>,
    pub rate_source: Arc<dyn RateSource>,
    pub providers: Vec<Arc<dyn LlmProvider>>,
    pub logger: InteractionLogger,
}

#[derive(Debug, Clone)]
pub struct AdvisorSettings {
    pub projection: ProjectionSettings,
    pub financial: FinancialParams,
    pub rate_cache_ttl: Duration,
    pub parallel_providers: bool,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            projection: ProjectionSettings::default(),
            financial: FinancialParams::default(),
            rate_cache_ttl: DEFAULT_RATE_CACHE_TTL,
            parallel_providers: true,
        }
    }
}

pub struct Advisor {
    dataset: Arc<CityDataset>,
    engine: ProjectionEngine,
    converter: CurrencyConverter,
    gateway: LlmGateway,
    logger: InteractionLogger,
    settings: AdvisorSettings,
}

impl Advisor {
    pub fn new(components: AdvisorComponents, settings: AdvisorSettings) -> Self {
        let gateway = LlmGateway::new(components.providers)
            .with_dataset(components.dataset.clone())
            .with_parallel(settings.parallel_providers);

        Self {
            engine: ProjectionEngine::new(components.model, settings.projection.base_year),
            converter: CurrencyConverter::new(components.rate_source, settings.rate_cache_ttl),
            dataset: components.dataset,
            gateway,
            logger: components.logger,
            settings,
        }
    }

    /// Load local assets and connect the external collaborators.
    ///
    /// Missing dataset or model files are fatal; a missing document store
    /// only takes logging offline.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        let dataset = Arc::new(CityDataset::load(&config.assets.city_data)?);
        let model = Arc::new(LinearRegressionModel::load(&config.assets.model)?);
        let client = build_http_client()?;

        let providers = default_providers(&config.providers, &client);

        let credentials = StoreCredentials::discover().unwrap_or_else(|e| {
            warn!("Ignoring unreadable document store credentials: {}", e);
            None
        });

        let components = AdvisorComponents {
            dataset,
            model,
            rate_source: Arc::new(HttpRateSource::new(client, &config.exchange.url)),
            providers,
            logger: InteractionLogger::from_store(build_store(credentials)),
        };

        let settings = AdvisorSettings {
            projection: config.projection,
            financial: config.financial.clone(),
            rate_cache_ttl: config.exchange.cache_ttl,
            parallel_providers: config.providers.parallel,
        };

        Ok(Self::new(components, settings))
    }

    pub fn dataset(&self) -> &CityDataset {
        &self.dataset
    }

    pub fn gateway(&self) -> &LlmGateway {
        &self.gateway
    }

    pub fn logger(&self) -> &InteractionLogger {
        &self.logger
    }

    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastReport> {
        let city = self.dataset.find(&request.city)?;
        let inflation = request
            .inflation
            .unwrap_or(self.settings.projection.default_inflation);
        let increment = request
            .increment
            .unwrap_or(self.settings.projection.default_increment);

        let projection = self.engine.project(
            city,
            request.year,
            inflation,
            PowerAdjustment::WageAdjusted {
                annual_increment: increment,
            },
        )?;

        let snapshot = self.converter.snapshot().await;
        let baseline = Baseline::new(
            self.settings
                .financial
                .incomes
                .monthly_income(request.bracket),
            self.settings.financial.shares,
        );

        let current = IndexFigures {
            rent: city.rent_index,
            groceries: city.groceries_index,
            purchasing_power: city.purchasing_power_index,
            cost_of_living: city.cost_of_living_index,
        };
        let projected = IndexFigures {
            rent: projection.projected.rent_index,
            groceries: projection.projected.groceries_index,
            purchasing_power: projection.projected.purchasing_power_index,
            cost_of_living: projection.composite_index,
        };

        let current_costs = cost_figures(&current, city, &baseline, &snapshot);
        let projected_costs = cost_figures(&projected, city, &baseline, &snapshot);

        let affordability = affordability::assess(
            baseline.usd_amount(
                projected.purchasing_power,
                Category::Income {
                    cost_of_living_index: projected.cost_of_living,
                },
            ),
            baseline.usd_amount(projected.rent, Category::Rent),
            baseline.usd_amount(projected.cost_of_living, Category::General),
            &self.settings.financial.thresholds,
        );

        let local = snapshot.convert(0.0, &city.country);
        let breakdown = format!(
            "In {}, the average person taking home {} will spend roughly {} on rent and {} on general living expenses each month.",
            request.year,
            projected_costs.net_income,
            projected_costs.rent,
            projected_costs.general
        );

        info!(
            city = %city.name,
            year = request.year,
            bracket = %request.bracket,
            composite = projection.composite_index,
            recommendation = ?affordability.recommendation,
            "Forecast computed"
        );

        Ok(ForecastReport {
            city: city.name.clone(),
            country: city.country.clone(),
            base_year: self.engine.base_year(),
            target_year: request.year,
            bracket: request.bracket,
            currency: CurrencyInfo {
                symbol: local.symbol.to_string(),
                code: local.code.to_string(),
                rate: local.rate,
            },
            current,
            current_costs,
            projection,
            projected,
            projected_costs,
            affordability,
            breakdown,
        })
    }

    /// Forecast, ask every provider, and hand the exchange to the logger
    /// without waiting for the write
    pub async fn consult(&self, request: &ConsultRequest) -> Result<Consultation> {
        let started = Instant::now();
        let report = self.forecast(&request.forecast).await?;
        let query = format!(
            "{}User Question: {}",
            forecast_context(&report),
            request.question
        );

        let outcomes = self.gateway.ask(&query, &request.history).await;

        let entry = InteractionLogEntry::new(
            report.city.clone(),
            report.target_year,
            request.question.clone(),
            report.projection.composite_index,
            &outcomes,
        );
        let log_task = self.logger.log_detached(entry);

        info!(
            city = %report.city,
            succeeded = outcomes.iter().filter(|o| o.is_success()).count(),
            total = outcomes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Consultation completed"
        );

        Ok(Consultation {
            report,
            query,
            outcomes,
            log_task,
        })
    }

    /// Stress markers for every city; `selected` wins over stress class
    pub fn map_markers(&self, selected: Option<&str>) -> Vec<MapMarker> {
        let threshold = self.settings.financial.thresholds.high_stress_above;
        let selected = selected.map(|s| s.trim().to_lowercase());

        self.dataset
            .records()
            .iter()
            .map(|city| {
                let stress_ratio = affordability::stress_ratio(city);
                let class = if selected.as_deref() == Some(city.name.to_lowercase().as_str()) {
                    MarkerClass::Selected
                } else if stress_ratio > threshold {
                    MarkerClass::HighStress
                } else {
                    MarkerClass::Normal
                };

                MapMarker {
                    city: city.name.clone(),
                    country: city.country.clone(),
                    latitude: city.latitude,
                    longitude: city.longitude,
                    stress_ratio,
                    class,
                }
            })
            .collect()
    }
}

fn cost_figures(
    indices: &IndexFigures,
    city: &CityRecord,
    baseline: &Baseline,
    snapshot: &RateSnapshot,
) -> CostFigures {
    let local = |index: f64, category: Category| {
        snapshot
            .convert(baseline.usd_amount(index, category), &city.country)
            .monthly()
    };

    CostFigures {
        rent: local(indices.rent, Category::Rent),
        groceries: local(indices.groceries, Category::Groceries),
        net_income: local(
            indices.purchasing_power,
            Category::Income {
                cost_of_living_index: indices.cost_of_living,
            },
        ),
        general: local(indices.cost_of_living, Category::General),
    }
}

/// Context block pinning providers to the computed local-currency figures
pub fn forecast_context(report: &ForecastReport) -> String {
    format!(
        "REAL-TIME DATABASE CONTEXT for {}, {} in {}:\n\
         - Estimated Net Monthly Income: {}\n\
         - Estimated Monthly Rent: {}\n\
         - Estimated Monthly General Living Costs: {}\n\
         CRITICAL INSTRUCTION: You MUST use these exact {} figures in your response to accurately answer the user. Do not use generic US Dollars unless the city uses USD.\n\n",
        report.city,
        report.country,
        report.target_year,
        report.projected_costs.net_income,
        report.projected_costs.rent,
        report.projected_costs.general,
        report.currency.code,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordability::Recommendation;
    use crate::error::AdvisorError;
    use crate::gateway::tests::FakeProvider;
    use crate::logger::tests::UnreachableStore;
    use crate::logger::InMemoryInteractionStore;
    use std::collections::HashMap;

    struct FixedRates;

    #[async_trait::async_trait]
    impl RateSource for FixedRates {
        async fn fetch_rates(&self) -> Result<HashMap<String, f64>> {
            Ok(HashMap::from([
                ("INR".to_string(), 80.0),
                ("EUR".to_string(), 1.0),
                ("USD".to_string(), 1.0),
            ]))
        }
    }

    /// Composite = cost-of-living proxy: mean of rent, groceries, restaurant
    struct MeanModel;

    impl CompositeModel for MeanModel {
        fn predict(&self, f: &crate::models::FeatureVector) -> f64 {
            (f.rent_index + f.groceries_index + f.restaurant_price_index) / 3.0
        }
    }

    fn advisor_with(
        providers: Vec<Arc<dyn LlmProvider>>,
        logger: InteractionLogger,
    ) -> Advisor {
        Advisor::new(
            AdvisorComponents {
                dataset: Arc::new(crate::dataset::tests::sample_dataset()),
                model: Arc::new(MeanModel),
                rate_source: Arc::new(FixedRates),
                providers,
                logger,
            },
            AdvisorSettings::default(),
        )
    }

    fn request(city: &str, year: i32) -> ForecastRequest {
        ForecastRequest {
            city: city.into(),
            year,
            inflation: Some(0.05),
            increment: Some(0.05),
            bracket: IncomeBracket::Average,
        }
    }

    #[tokio::test]
    async fn test_forecast_base_year_uses_current_indices() {
        let advisor = advisor_with(vec![], InteractionLogger::offline());
        let report = advisor.forecast(&request("pune", 2025)).await.unwrap();

        assert_eq!(report.city, "Pune");
        assert_eq!(report.currency.code, "INR");
        assert_eq!(report.projected.rent, 6.0);
        // rent: 6/100 * 4500 * 0.4 * 80
        assert_eq!(report.current_costs.rent, "₹8,640/mo");
        assert!(report.breakdown.starts_with("In 2025, the average person taking home"));
    }

    #[tokio::test]
    async fn test_forecast_projects_and_scores() {
        let advisor = advisor_with(vec![], InteractionLogger::offline());
        let report = advisor.forecast(&request("Paris", 2027)).await.unwrap();

        assert!((report.projected.rent - 55.125).abs() < 1e-9);
        assert!((report.projected.purchasing_power - 90.0).abs() < 1e-9);
        assert_eq!(report.projected.cost_of_living, report.projection.composite_index);
        assert_eq!(report.currency.symbol, "€");
    }

    #[tokio::test]
    async fn test_forecast_errors() {
        let advisor = advisor_with(vec![], InteractionLogger::offline());
        assert!(matches!(
            advisor.forecast(&request("Atlantis", 2027)).await,
            Err(AdvisorError::CityNotFound(_))
        ));
        assert!(matches!(
            advisor.forecast(&request("Paris", 2019)).await,
            Err(AdvisorError::InvalidHorizon { .. })
        ));
    }

    #[tokio::test]
    async fn test_affordability_uses_projected_usd_amounts() {
        let advisor = advisor_with(vec![], InteractionLogger::offline());
        let report = advisor.forecast(&request("Pune", 2025)).await.unwrap();

        // income 808.5, rent 108, general 330.75
        let analysis = &report.affordability;
        assert!((analysis.total_burden - 438.75 / 808.5).abs() < 1e-9);
        assert!(analysis.rent_burden < analysis.cost_of_living_burden);
        assert_eq!(analysis.recommendation, Recommendation::Stable);
    }

    #[tokio::test]
    async fn test_consult_logs_all_failures() {
        let store = Arc::new(InMemoryInteractionStore::new());
        let advisor = advisor_with(
            vec![
                FakeProvider::failing("Groq", "boom"),
                FakeProvider::failing("Gemini", "boom"),
                FakeProvider::failing("Claude", "boom"),
            ],
            InteractionLogger::new(store.clone()),
        );

        let consultation = advisor
            .consult(&ConsultRequest {
                forecast: request("Paris", 2026),
                question: "Is Paris affordable for a student?".into(),
                history: vec![],
            })
            .await
            .unwrap();

        assert!(consultation.query.contains("REAL-TIME DATABASE CONTEXT for Paris, France in 2026"));
        assert!(consultation.query.contains("exact EUR figures"));
        assert!(consultation.log_task.await.unwrap());

        let stored = store.entries().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_query, "Is Paris affordable for a student?");
        assert_eq!(stored[0].responses.len(), 3);
        assert!(stored[0].responses[2].text.starts_with("Claude Error:"));
    }

    #[tokio::test]
    async fn test_consult_unaffected_by_logger_failure() {
        let advisor = advisor_with(
            vec![
                FakeProvider::ok("Groq", "Paris is pricey."),
                FakeProvider::ok("Gemini", "Consider Lyon."),
            ],
            InteractionLogger::new(Arc::new(UnreachableStore)),
        );

        let consultation = advisor
            .consult(&ConsultRequest {
                forecast: request("Paris", 2026),
                question: "Thoughts?".into(),
                history: vec![],
            })
            .await
            .unwrap();

        assert_eq!(consultation.outcomes.len(), 2);
        assert_eq!(consultation.outcomes[0].result, Ok("Paris is pricey.".to_string()));
        assert!(!consultation.log_task.await.unwrap());
    }

    #[test]
    fn test_map_marker_classes() {
        let advisor = advisor_with(vec![], InteractionLogger::offline());
        let markers = advisor.map_markers(Some("paris"));

        let class_of = |name: &str| markers.iter().find(|m| m.city == name).unwrap().class;
        assert_eq!(class_of("Paris"), MarkerClass::Selected);
        // (100 + 100) / 100 = 2.0
        assert_eq!(class_of("New York"), MarkerClass::HighStress);
        // (6 + 22) / 110
        assert_eq!(class_of("Pune"), MarkerClass::Normal);
    }
}
