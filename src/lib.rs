//! Cost of Living Advisor
//!
//! Projects city living costs forward in time and asks several hosted LLM
//! providers for relocation advice grounded in those numbers:
//! - City index dataset with context lookup for free-text questions
//! - Compound-growth projection scored by a linear regression model
//! - Local-currency conversion with a TTL-cached rate table
//! - Concurrent fan-out to Groq, Gemini and Claude
//! - Best-effort interaction logging to a document store
//!
//! FLOW:
//! FORECAST → CONTEXT → FAN-OUT → LOG

pub mod advisor;
pub mod affordability;
pub mod api;
pub mod cli;
pub mod config;
pub mod currency;
pub mod dataset;
pub mod error;
pub mod gateway;
pub mod history;
pub mod logger;
pub mod models;
pub mod projection;
pub mod providers;
pub mod regression;

pub use error::Result;

// Re-export common types
pub use advisor::{Advisor, ConsultRequest, ForecastReport, ForecastRequest};
pub use models::*;
