//! Performance records produced by plant models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known metric names.
pub mod metrics {
    pub const OVERALL_EFFICIENCY: &str = "overall_efficiency";
    pub const NET_POWER_KW: &str = "net_power_kw";
    pub const SPECIFIC_COST: &str = "specific_cost";
    pub const SELF_SUFFICIENCY_RATIO: &str = "self_sufficiency_ratio";
    pub const BIOGAS_ENERGY_KW: &str = "biogas_energy_kw";
    pub const HTC_HEAT_DEMAND_KW: &str = "htc_heat_demand_kw";
    pub const WASTE_HEAT_AVAILABLE_KW: &str = "waste_heat_available_kw";
}

/// Metric name → value produced by one model evaluation.
///
/// Records are built once and never mutated. Reading a metric the model did
/// not report yields `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceRecord {
    values: BTreeMap<String, f64>,
}

impl PerformanceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used while the record is being assembled.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Value of `name`, or `None` if the model did not report it.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value of `name`, defaulting to `0.0`.
    pub fn get(&self, name: &str) -> f64 {
        self.metric(name).unwrap_or(0.0)
    }

    pub fn overall_efficiency(&self) -> f64 {
        self.get(metrics::OVERALL_EFFICIENCY)
    }

    pub fn net_power_kw(&self) -> f64 {
        self.get(metrics::NET_POWER_KW)
    }

    pub fn specific_cost(&self) -> f64 {
        self.get(metrics::SPECIFIC_COST)
    }

    pub fn self_sufficiency_ratio(&self) -> f64 {
        self.get(metrics::SELF_SUFFICIENCY_RATIO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PerformanceRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_metrics_read_as_zero() {
        let record = PerformanceRecord::new().with(metrics::OVERALL_EFFICIENCY, 0.31);
        assert_eq!(record.overall_efficiency(), 0.31);
        assert_eq!(record.specific_cost(), 0.0);
        assert_eq!(record.metric(metrics::SPECIFIC_COST), None);
    }

    #[test]
    fn serializes_as_flat_map() {
        let record: PerformanceRecord = [
            (metrics::NET_POWER_KW, 42_000.0),
            (metrics::SELF_SUFFICIENCY_RATIO, 1.0),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["net_power_kw"], 42_000.0);
        assert_eq!(json["self_sufficiency_ratio"], 1.0);
        assert_eq!(record.len(), 2);
    }
}
