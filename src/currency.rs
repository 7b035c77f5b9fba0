//! Currency conversion
//!
//! Index values are turned into USD amounts using fixed budget shares of a
//! reference monthly income (reference city = index 100), then into local
//! currency with a daily exchange-rate snapshot.

use crate::models::IncomeBracket;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const FALLBACK_SYMBOL: &str = "$";
pub const FALLBACK_CODE: &str = "USD";

/// Country → (symbol, ISO code)
const CURRENCY_TABLE: &[(&str, &str, &str)] = &[
    ("India", "₹", "INR"),
    ("United States", "$", "USD"),
    ("United Kingdom", "£", "GBP"),
    ("Germany", "€", "EUR"),
    ("France", "€", "EUR"),
    ("Italy", "€", "EUR"),
    ("Spain", "€", "EUR"),
    ("Canada", "C$", "CAD"),
    ("Australia", "A$", "AUD"),
    ("Japan", "¥", "JPY"),
    ("Brazil", "R$", "BRL"),
    ("South Africa", "R", "ZAR"),
    ("China", "¥", "CNY"),
    ("Mexico", "Mex$", "MXN"),
    ("United Arab Emirates", "AED", "AED"),
];

/// Symbol and currency code for a country, `$`/USD when unmapped
pub fn currency_for(country: &str) -> (&'static str, &'static str) {
    let country = country.trim();
    CURRENCY_TABLE
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(country))
        .map(|(_, symbol, code)| (*symbol, *code))
        .unwrap_or((FALLBACK_SYMBOL, FALLBACK_CODE))
}

//
// ================= Baselines =================
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Category {
    Rent,
    Groceries,
    /// Net salary; scaled by the city's overall cost of living as well
    Income { cost_of_living_index: f64 },
    General,
}

impl Category {
    pub fn income() -> Self {
        Category::Income {
            cost_of_living_index: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetShares {
    pub rent: f64,
    pub groceries: f64,
    pub general: f64,
}

impl Default for BudgetShares {
    fn default() -> Self {
        Self {
            rent: 0.40,
            groceries: 0.15,
            general: 0.45,
        }
    }
}

/// Reference-city monthly net income (USD) per bracket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BracketIncomes {
    pub student: f64,
    pub average: f64,
    pub senior: f64,
}

impl Default for BracketIncomes {
    fn default() -> Self {
        Self {
            student: 2500.0,
            average: 4500.0,
            senior: 9000.0,
        }
    }
}

impl BracketIncomes {
    pub fn monthly_income(&self, bracket: IncomeBracket) -> f64 {
        match bracket {
            IncomeBracket::Student => self.student,
            IncomeBracket::Average => self.average,
            IncomeBracket::Senior => self.senior,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub monthly_income: f64,
    pub shares: BudgetShares,
}

impl Baseline {
    pub fn new(monthly_income: f64, shares: BudgetShares) -> Self {
        Self {
            monthly_income,
            shares,
        }
    }

    /// USD per month for `index` in `category`
    pub fn usd_amount(&self, index: f64, category: Category) -> f64 {
        let scale = index / 100.0;
        match category {
            Category::Rent => scale * self.monthly_income * self.shares.rent,
            Category::Groceries => scale * self.monthly_income * self.shares.groceries,
            Category::Income {
                cost_of_living_index,
            } => scale * (cost_of_living_index / 100.0) * self.monthly_income,
            Category::General => scale * self.monthly_income * self.shares.general,
        }
    }
}

//
// ================= Rate Sources =================
//

#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    /// Currency code → units per USD
    async fn fetch_rates(&self) -> Result<HashMap<String, f64>>;
}

#[derive(Debug, Deserialize)]
struct RatesPayload {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

pub struct HttpRateSource {
    client: Client,
    url: String,
}

impl HttpRateSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl RateSource for HttpRateSource {
    async fn fetch_rates(&self) -> Result<HashMap<String, f64>> {
        let payload: RatesPayload = self
            .client
            .get(&self.url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(payload.rates)
    }
}

//
// ================= Cache & Converter =================
//

struct CachedRates {
    rates: Arc<HashMap<String, f64>>,
    fetched_at: Instant,
}

/// Rates frozen at one point in time; conversion against it is pure
#[derive(Debug, Clone, Default)]
pub struct RateSnapshot {
    rates: Arc<HashMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalAmount {
    pub symbol: &'static str,
    pub code: &'static str,
    pub rate: f64,
    pub value: f64,
}

impl LocalAmount {
    pub fn monthly(&self) -> String {
        format_monthly(self.symbol, self.value)
    }
}

impl RateSnapshot {
    pub fn from_rates(rates: HashMap<String, f64>) -> Self {
        Self {
            rates: Arc::new(rates),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Falls back to plain USD when the country is unmapped or its rate is
    /// absent from the snapshot
    pub fn convert(&self, usd: f64, country: &str) -> LocalAmount {
        let (symbol, code) = currency_for(country);
        match self.rates.get(code) {
            Some(rate) => LocalAmount {
                symbol,
                code,
                rate: *rate,
                value: usd * rate,
            },
            None => LocalAmount {
                symbol: FALLBACK_SYMBOL,
                code: FALLBACK_CODE,
                rate: 1.0,
                value: usd,
            },
        }
    }
}

/// Exchange-rate snapshot with time-based invalidation.
///
/// A failed fetch caches an empty mapping for the full TTL, so every
/// conversion degrades to USD parity until the next refresh.
pub struct CurrencyConverter {
    source: Arc<dyn RateSource>,
    ttl: Duration,
    cached: RwLock<Option<CachedRates>>,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn RateSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub async fn snapshot(&self) -> RateSnapshot {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    debug!("Exchange rates served from cache");
                    return RateSnapshot {
                        rates: entry.rates.clone(),
                    };
                }
            }
        }

        let rates = match self.source.fetch_rates().await {
            Ok(rates) => {
                info!(currencies = rates.len(), "Exchange rates refreshed");
                rates
            }
            Err(e) => {
                warn!("Exchange rate fetch failed, using USD parity: {}", e);
                HashMap::new()
            }
        };

        let rates = Arc::new(rates);
        let mut cached = self.cached.write().await;
        *cached = Some(CachedRates {
            rates: rates.clone(),
            fetched_at: Instant::now(),
        });

        RateSnapshot { rates }
    }

    /// Formatted local-currency monthly amount for an index value
    pub async fn format(
        &self,
        index: f64,
        category: Category,
        country: &str,
        baseline: &Baseline,
    ) -> String {
        let snapshot = self.snapshot().await;
        snapshot
            .convert(baseline.usd_amount(index, category), country)
            .monthly()
    }
}

/// `<symbol><amount, 0 dp, thousands separated>/mo`
pub fn format_monthly(symbol: &str, value: f64) -> String {
    format!("{}{}/mo", symbol, group_thousands(value))
}

fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) if rest != "0" => ("-", rest),
        Some(rest) => ("", rest),
        None => ("", rounded.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}", sign, grouped)
}
