//! Labor ML - прогноз трудозатрат на уборку (Ridge регрессия)

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod pricing;
pub mod rate_check;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use types::*;
pub use models::*;
pub use preprocessing::*;

// Re-export для удобства
pub use config::{ServerConfig, TrainingConfig};
pub use error::{ModelError, Result};
pub use export::{ExportedModel, ModelExporter};
pub use pipeline::{train, FittedPipeline, LaborHoursPipeline, TrainingReport};
pub use pricing::{build_matrix, PricingOptions, PricingRow};
pub use rate_check::ProductionRates;
