//! Матрица цен: сетка параметров работ -> часы и стоимость

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::pipeline::FittedPipeline;
use crate::rate_check::ProductionRates;
use crate::types::{JobFeatures, CLUTTER_LEVELS};

/// Минимальное время работ, часов
const MIN_LABOR_HOURS: f64 = 0.5;
const PRICE_STEP: f64 = 5.0;
/// Верхняя граница числа строк матрицы (по умолчанию строк 15 840)
pub const MAX_GRID_ROWS: usize = 200_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingOptions {
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,
    #[serde(default = "default_min_charge")]
    pub min_charge: f64,
    #[serde(default)]
    pub travel_fee: f64,
    #[serde(default = "default_sqft_values")]
    pub sqft_values: Vec<f64>,
    #[serde(default = "default_bedrooms")]
    pub bedrooms: Vec<i32>,
    #[serde(default = "default_bathrooms")]
    pub bathrooms: Vec<f64>,
    #[serde(default = "default_flags")]
    pub deep_values: Vec<bool>,
    #[serde(default = "default_clutter_levels")]
    pub clutter_levels: Vec<String>,
    #[serde(default = "default_flags")]
    pub appliance_values: Vec<bool>,
    #[serde(default = "default_cleaners")]
    pub cleaners: u32,
}

impl PricingOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.hourly_rate.is_finite() || self.hourly_rate <= 0.0 {
            return Err(ModelError::InvalidConfig(format!(
                "hourly rate must be positive, got {}",
                self.hourly_rate
            )));
        }
        if !self.min_charge.is_finite() || self.min_charge < 0.0 {
            return Err(ModelError::InvalidConfig(
                "minimum charge must be non-negative".to_string(),
            ));
        }
        if !self.travel_fee.is_finite() || self.travel_fee < 0.0 {
            return Err(ModelError::InvalidConfig("travel fee must be non-negative".to_string()));
        }
        if self.cleaners == 0 {
            return Err(ModelError::InvalidConfig("at least one cleaner is required".to_string()));
        }
        if self.sqft_values.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ModelError::InvalidConfig("sqft values must be positive".to_string()));
        }
        if self.sqft_values.is_empty()
            || self.bedrooms.is_empty()
            || self.bathrooms.is_empty()
            || self.deep_values.is_empty()
            || self.clutter_levels.is_empty()
            || self.appliance_values.is_empty()
        {
            return Err(ModelError::InvalidConfig("pricing grid has an empty axis".to_string()));
        }
        match self.grid_size() {
            Some(rows) if rows <= MAX_GRID_ROWS => Ok(()),
            Some(rows) => Err(ModelError::InvalidConfig(format!(
                "pricing grid has {} rows, limit is {}",
                rows, MAX_GRID_ROWS
            ))),
            None => Err(ModelError::InvalidConfig("pricing grid size overflows".to_string())),
        }
    }

    /// Число строк матрицы; None при переполнении
    pub fn grid_size(&self) -> Option<usize> {
        [
            self.bedrooms.len(),
            self.bathrooms.len(),
            self.deep_values.len(),
            self.clutter_levels.len(),
            self.appliance_values.len(),
            self.appliance_values.len(),
        ]
        .iter()
        .try_fold(self.sqft_values.len(), |acc, &len| acc.checked_mul(len))
    }
}

impl Default for PricingOptions {
    fn default() -> Self {
        Self {
            hourly_rate: default_hourly_rate(),
            min_charge: default_min_charge(),
            travel_fee: 0.0,
            sqft_values: default_sqft_values(),
            bedrooms: default_bedrooms(),
            bathrooms: default_bathrooms(),
            deep_values: default_flags(),
            clutter_levels: default_clutter_levels(),
            appliance_values: default_flags(),
            cleaners: default_cleaners(),
        }
    }
}

fn default_hourly_rate() -> f64 {
    80.0
}

fn default_min_charge() -> f64 {
    120.0
}

fn default_cleaners() -> u32 {
    2
}

fn default_flags() -> Vec<bool> {
    vec![false, true]
}

fn default_bedrooms() -> Vec<i32> {
    (1..=6).collect()
}

fn default_bathrooms() -> Vec<f64> {
    (1..=5i32).map(f64::from).collect()
}

fn default_sqft_values() -> Vec<f64> {
    (800..=5000i32).step_by(200).map(f64::from).collect()
}

fn default_clutter_levels() -> Vec<String> {
    CLUTTER_LEVELS.iter().map(|level| level.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRow {
    pub sqft: f64,
    pub bedrooms: i32,
    pub bathrooms: f64,
    pub clean_type: String,
    pub clutter: String,
    pub fridge: String,
    pub oven: String,
    pub labor_hours: f64,
    pub clock_hours: f64,
    pub rate_check_hours: Option<f64>,
    pub price: f64,
}

/// Округление до ближайших 5
pub fn round_to_step(value: f64) -> f64 {
    (value / PRICE_STEP).round() * PRICE_STEP
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn yes_no(flag: bool) -> String {
    let value = if flag { "yes" } else { "no" };
    value.to_string()
}

/// Цена одной работы по часам модели
pub fn quote(labor_hours: f64, options: &PricingOptions) -> (f64, f64, f64) {
    let labor = labor_hours.max(MIN_LABOR_HOURS);
    let clock = labor / options.cleaners as f64;
    let price =
        round_to_step(clock * options.hourly_rate).max(options.min_charge) + options.travel_fee;
    (labor, clock, price)
}

pub fn build_matrix(
    fitted: &FittedPipeline,
    rates: Option<&ProductionRates>,
    options: &PricingOptions,
) -> Result<Vec<PricingRow>> {
    options.validate()?;

    let mut rows = Vec::with_capacity(options.grid_size().unwrap_or_default());
    for &sqft in &options.sqft_values {
        for &bedrooms in &options.bedrooms {
            for &bathrooms in &options.bathrooms {
                for &deep in &options.deep_values {
                    for clutter in &options.clutter_levels {
                        for &fridge in &options.appliance_values {
                            for &oven in &options.appliance_values {
                                let job = JobFeatures::new(
                                    sqft, bedrooms, bathrooms, deep, fridge, oven, clutter,
                                );
                                let prediction = fitted.predict(&job)?;
                                let (labor, clock, price) = quote(prediction, options);

                                rows.push(PricingRow {
                                    sqft,
                                    bedrooms,
                                    bathrooms,
                                    clean_type: if deep { "deep" } else { "standard" }.to_string(),
                                    clutter: job.clutter.clone(),
                                    fridge: yes_no(fridge),
                                    oven: yes_no(oven),
                                    labor_hours: round2(labor),
                                    clock_hours: round2(clock),
                                    rate_check_hours: rates
                                        .and_then(|r| r.estimate_hours(&job))
                                        .map(round2),
                                    price,
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    tracing::info!("Pricing matrix built: {} rows", rows.len());
    Ok(rows)
}
