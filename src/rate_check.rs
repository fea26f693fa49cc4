//! Проверка по производительности: sqft в час, выученные из данных

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::metrics::median;
use crate::types::{JobFeatures, RawRecord, CLUTTER_LEVELS};

const DEFAULT_DEEP_MULTIPLIER: f64 = 1.3;
/// Запасная добавка за прибор (30 минут)
const DEFAULT_ADD_ON_HOURS: f64 = 0.5;
const MIN_RECORDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOnHours {
    pub fridge: f64,
    pub oven: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRates {
    pub base_rate_sqft_per_hour: f64,
    pub deep_multiplier: f64,
    pub clutter_multipliers: BTreeMap<String, f64>,
    pub add_on_hours: AddOnHours,
}

impl ProductionRates {
    /// None, если записей с положительными часами меньше трех
    pub fn learn(records: &[RawRecord]) -> Option<Self> {
        let usable: Vec<&RawRecord> = records
            .iter()
            .filter(|r| r.labor_hours > 0.0 && r.features.sqft > 0.0)
            .collect();
        if usable.len() < MIN_RECORDS {
            return None;
        }

        let productivity = |r: &RawRecord| r.features.sqft / r.labor_hours;
        let overall = median(&usable.iter().map(|r| productivity(r)).collect::<Vec<_>>());

        // Медиана производительности по группе, при пустой группе - общая
        let group = |pred: &dyn Fn(&RawRecord) -> bool| {
            let values: Vec<f64> = usable
                .iter()
                .filter(|r| pred(r))
                .map(|r| productivity(r))
                .collect();
            if values.is_empty() {
                overall
            } else {
                median(&values)
            }
        };

        let base = group(&|r: &RawRecord| !r.features.deep_clean);
        let deep = group(&|r: &RawRecord| r.features.deep_clean);
        let deep_multiplier = if base > 0.0 { base / deep } else { 1.0 };
        let deep_multiplier = if deep_multiplier.is_finite() && deep_multiplier > 0.0 {
            deep_multiplier
        } else {
            DEFAULT_DEEP_MULTIPLIER
        };

        // Стандартные уровни всегда есть; без данных - через общую медиану
        let mut levels: Vec<&str> = CLUTTER_LEVELS.to_vec();
        levels.extend(usable.iter().map(|r| r.features.clutter.as_str()));
        let mut clutter_multipliers = BTreeMap::new();
        for level in levels {
            if clutter_multipliers.contains_key(level) {
                continue;
            }
            let rate = group(&|r: &RawRecord| r.features.clutter == level);
            let multiplier = if base > 0.0 { base / rate } else { 1.0 };
            clutter_multipliers.insert(level.to_string(), multiplier);
        }

        // Медианная разница часов с прибором и без
        let add_on = |flag: fn(&JobFeatures) -> bool| {
            let (with, without): (Vec<&&RawRecord>, Vec<&&RawRecord>) =
                usable.iter().partition(|r| flag(&r.features));
            let with: Vec<f64> = with.iter().map(|r| r.labor_hours).collect();
            let without: Vec<f64> = without.iter().map(|r| r.labor_hours).collect();
            if with.is_empty() || without.is_empty() {
                DEFAULT_ADD_ON_HOURS
            } else {
                (median(&with) - median(&without)).max(0.0)
            }
        };

        let rates = Self {
            base_rate_sqft_per_hour: base,
            deep_multiplier,
            clutter_multipliers,
            add_on_hours: AddOnHours {
                fridge: add_on(|f: &JobFeatures| f.fridge),
                oven: add_on(|f: &JobFeatures| f.oven),
            },
        };
        tracing::debug!("Production rates learned: {:?}", rates);
        Some(rates)
    }

    /// Оценка часов по производительности; None при некорректной базе
    pub fn estimate_hours(&self, job: &JobFeatures) -> Option<f64> {
        let base = self.base_rate_sqft_per_hour;
        if !base.is_finite() || base <= 0.0 {
            return None;
        }

        let clutter = match self.clutter_multipliers.get(&job.clutter) {
            Some(m) if *m != 0.0 => *m,
            _ => 1.0,
        };
        let deep = if job.deep_clean { self.deep_multiplier } else { 1.0 };
        let effective_rate = base / (deep * clutter);

        let mut add = 0.0;
        if job.fridge {
            add += self.add_on_hours.fridge;
        }
        if job.oven {
            add += self.add_on_hours.oven;
        }

        Some(job.sqft / effective_rate + add)
    }
}
