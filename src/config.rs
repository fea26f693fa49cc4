/// Настройки обучения и сервера

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::models::ridge::{logspace, AlphaCriterion};
use crate::models::BootstrapEstimator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaGrid {
    #[serde(default = "default_start_exp")]
    pub start_exp: f64,
    #[serde(default = "default_end_exp")]
    pub end_exp: f64,
    #[serde(default = "default_num_alphas")]
    pub num: usize,
}

impl AlphaGrid {
    pub fn values(&self) -> Vec<f64> {
        logspace(self.start_exp, self.end_exp, self.num)
    }
}

impl Default for AlphaGrid {
    fn default() -> Self {
        Self {
            start_exp: default_start_exp(),
            end_exp: default_end_exp(),
            num: default_num_alphas(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_resamples")]
    pub resamples: usize,
    #[serde(default = "default_lower_quantile")]
    pub lower_quantile: f64,
    #[serde(default = "default_upper_quantile")]
    pub upper_quantile: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl BootstrapConfig {
    /// Проверяет число ресэмплов и квантили
    pub fn estimator(&self) -> Result<BootstrapEstimator> {
        BootstrapEstimator::new(
            self.resamples,
            (self.lower_quantile, self.upper_quantile),
            self.seed,
        )
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: default_resamples(),
            lower_quantile: default_lower_quantile(),
            upper_quantile: default_upper_quantile(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub alpha_grid: AlphaGrid,
    #[serde(default)]
    pub criterion: AlphaCriterion,
    /// None: min(5, n), не меньше 2
    #[serde(default)]
    pub folds: Option<usize>,
    #[serde(default = "default_seed")]
    pub cv_seed: u64,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl TrainingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.alpha_grid.num == 0 {
            return Err(ModelError::InvalidConfig(
                "alpha grid must contain at least one value".to_string(),
            ));
        }
        if !self.alpha_grid.start_exp.is_finite() || !self.alpha_grid.end_exp.is_finite() {
            return Err(ModelError::InvalidConfig(
                "alpha grid exponents must be finite".to_string(),
            ));
        }
        if let Some(k) = self.folds {
            if k < 2 {
                return Err(ModelError::InvalidConfig(format!(
                    "number of folds must be at least 2, got {}",
                    k
                )));
            }
        }
        self.bootstrap.estimator()?;
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            alpha_grid: AlphaGrid::default(),
            criterion: AlphaCriterion::default(),
            folds: None,
            cv_seed: default_seed(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

fn default_start_exp() -> f64 {
    -3.0
}

fn default_end_exp() -> f64 {
    3.0
}

fn default_num_alphas() -> usize {
    50
}

fn default_resamples() -> usize {
    1000
}

fn default_lower_quantile() -> f64 {
    0.025
}

fn default_upper_quantile() -> f64 {
    0.975
}

fn default_seed() -> u64 {
    42
}

pub const ADDR_ENV: &str = "LABOR_ML_ADDR";
pub const CONFIG_ENV: &str = "LABOR_ML_CONFIG";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub training: TrainingConfig,
}

impl ServerConfig {
    /// LABOR_ML_ADDR (по умолчанию 0.0.0.0:8000), LABOR_ML_CONFIG - путь к JSON
    pub fn from_env() -> Result<Self> {
        let addr = match std::env::var(ADDR_ENV) {
            Ok(value) => value.parse().map_err(|e| {
                ModelError::InvalidConfig(format!(
                    "{}={} is not a socket address: {}",
                    ADDR_ENV, value, e
                ))
            })?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 8000)),
        };

        let training = match std::env::var(CONFIG_ENV) {
            Ok(path) => TrainingConfig::from_json_file(path)?,
            Err(_) => TrainingConfig::default(),
        };

        Ok(Self { addr, training })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = TrainingConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TrainingConfig::default());
        assert_eq!(config.alpha_grid.values().len(), 50);
        assert_eq!(config.bootstrap.resamples, 1000);
        assert_eq!(config.cv_seed, 42);
        assert_eq!(config.criterion, AlphaCriterion::LeaveOneOut);
    }

    #[test]
    fn test_partial_override() {
        let config = TrainingConfig::from_json_str(
            r#"{"folds": 3, "criterion": "generalized", "bootstrap": {"resamples": 200}}"#,
        )
        .unwrap();
        assert_eq!(config.folds, Some(3));
        assert_eq!(config.criterion, AlphaCriterion::Generalized);
        assert_eq!(config.bootstrap.resamples, 200);
        assert_eq!(config.bootstrap.upper_quantile, 0.975);
    }

    #[test]
    fn test_invalid_config() {
        assert!(TrainingConfig::from_json_str(r#"{"folds": 1}"#).is_err());
        assert!(TrainingConfig::from_json_str(r#"{"alpha_grid": {"num": 0}}"#).is_err());
        assert!(TrainingConfig::from_json_str(r#"{"bootstrap": {"resamples": 0}}"#).is_err());
        assert!(
            TrainingConfig::from_json_str(r#"{"bootstrap": {"lower_quantile": -0.1}}"#).is_err()
        );
        assert!(TrainingConfig::from_json_str(
            r#"{"bootstrap": {"lower_quantile": 0.9, "upper_quantile": 0.1}}"#
        )
        .is_err());
        assert!(matches!(
            TrainingConfig::from_json_str(r#"{"bootstrap": {"upper_quantile": 1.5}}"#),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(TrainingConfig::from_json_str("not json").is_err());
    }
}
