//! Performance model contract and the reference plant surrogate.

use std::collections::HashMap;

use adhtc_types::{metrics, AdhtcResult, PerformanceRecord};

use crate::space::{ParameterAssignment, ParameterSpace};

/// Maps a parameter assignment to plant performance metrics.
///
/// Implementations must be pure and deterministic: the optimizers call them
/// thousands of times per run, possibly from several threads at once. An
/// error aborts the run and is returned unchanged to the caller.
pub trait PerformanceModel: Send + Sync {
    fn evaluate(&self, params: &ParameterAssignment) -> AdhtcResult<PerformanceRecord>;
}

impl<F> PerformanceModel for F
where
    F: Fn(&ParameterAssignment) -> AdhtcResult<PerformanceRecord> + Send + Sync,
{
    fn evaluate(&self, params: &ParameterAssignment) -> AdhtcResult<PerformanceRecord> {
        self(params)
    }
}

/// Simplified steady-state model of the integrated AD-HTC-Brayton plant.
///
/// Couples a Brayton-cycle efficiency estimate with AD biogas yield and HTC
/// heat demand so the optimizer has realistic trade-offs to work against.
/// Parameters absent from the assignment take the values in
/// [`PlantSurrogateModel::initial_guess`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantSurrogateModel {
    /// Ratio of specific heats for the working gas.
    pub gamma: f64,
    /// Net power at the reference efficiency, kW.
    pub reference_power_kw: f64,
    pub reference_efficiency: f64,
    /// Biogas energy at the reference yield, kW.
    pub reference_biogas_kw: f64,
    /// HTC reactor heat duty before efficiency losses, kW.
    pub htc_base_heat_kw: f64,
    /// Fraction of biogas energy recoverable as waste heat.
    pub waste_heat_fraction: f64,
    /// Specific cost at the reference pressure ratio, $/kW.
    pub base_specific_cost: f64,
}

impl Default for PlantSurrogateModel {
    fn default() -> Self {
        Self {
            gamma: 1.4,
            reference_power_kw: 100_000.0,
            reference_efficiency: 0.35,
            reference_biogas_kw: 50_000.0,
            htc_base_heat_kw: 20_000.0,
            waste_heat_fraction: 0.6,
            base_specific_cost: 1000.0,
        }
    }
}

pub const PRESSURE_RATIO: &str = "pressure_ratio";
pub const MAX_TURBINE_TEMP: &str = "max_turbine_temp";
pub const COMPRESSOR_EFFICIENCY: &str = "compressor_efficiency";
pub const TURBINE_EFFICIENCY: &str = "turbine_efficiency";
pub const AD_RETENTION_TIME: &str = "ad_retention_time";
pub const HTC_TEMPERATURE: &str = "htc_temperature";
pub const HTC_RESIDENCE_TIME: &str = "htc_residence_time";

impl PlantSurrogateModel {
    /// Default design space of the plant, in crossover order.
    pub fn parameter_space() -> AdhtcResult<ParameterSpace> {
        ParameterSpace::builder()
            .add(PRESSURE_RATIO, 3.0, 25.0)
            .add(MAX_TURBINE_TEMP, 800.0, 1600.0)
            .add(COMPRESSOR_EFFICIENCY, 0.75, 0.95)
            .add(TURBINE_EFFICIENCY, 0.80, 0.95)
            .add(AD_RETENTION_TIME, 10.0, 40.0)
            .add(HTC_TEMPERATURE, 453.0, 523.0)
            .add(HTC_RESIDENCE_TIME, 0.5, 4.0)
            .build()
    }

    /// Nominal operating point, used as the gradient starting guess.
    pub fn initial_guess() -> HashMap<String, f64> {
        [
            (PRESSURE_RATIO, 12.0),
            (MAX_TURBINE_TEMP, 1400.0),
            (COMPRESSOR_EFFICIENCY, 0.85),
            (TURBINE_EFFICIENCY, 0.88),
            (AD_RETENTION_TIME, 20.0),
            (HTC_TEMPERATURE, 473.0),
            (HTC_RESIDENCE_TIME, 2.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Values held fixed while the Pareto sweep varies pressure ratio and
    /// turbine inlet temperature.
    pub fn pareto_fixed_values() -> HashMap<String, f64> {
        let mut fixed = Self::initial_guess();
        fixed.remove(PRESSURE_RATIO);
        fixed.remove(MAX_TURBINE_TEMP);
        fixed.insert(TURBINE_EFFICIENCY.to_string(), 0.90);
        fixed
    }

    fn param(params: &ParameterAssignment, name: &str, default: f64) -> f64 {
        params.get(name).unwrap_or(default)
    }

    fn brayton_efficiency(&self, pr: f64, t3: f64, eta_comp: f64, eta_turb: f64) -> f64 {
        let ideal = 1.0 - 1.0 / pr.powf((self.gamma - 1.0) / self.gamma);
        ideal * eta_comp * eta_turb * (1.0 - 0.1 * (t3 - 1000.0) / 1000.0)
    }
}

impl PerformanceModel for PlantSurrogateModel {
    fn evaluate(&self, params: &ParameterAssignment) -> AdhtcResult<PerformanceRecord> {
        let pr = Self::param(params, PRESSURE_RATIO, 12.0);
        let t3 = Self::param(params, MAX_TURBINE_TEMP, 1400.0);
        let eta_comp = Self::param(params, COMPRESSOR_EFFICIENCY, 0.85);
        let eta_turb = Self::param(params, TURBINE_EFFICIENCY, 0.88);
        let retention = Self::param(params, AD_RETENTION_TIME, 20.0);
        let htc_temp = Self::param(params, HTC_TEMPERATURE, 473.0);

        let efficiency = self.brayton_efficiency(pr, t3, eta_comp, eta_turb);
        let net_power = self.reference_power_kw * (efficiency / self.reference_efficiency);

        // Shorter retention raises the biogas yield.
        let biogas_yield = if retention > 0.0 {
            0.8 * (20.0 / retention)
        } else {
            0.0
        };
        let biogas_energy = self.reference_biogas_kw * biogas_yield;

        let htc_efficiency = 0.75 - 0.001 * (htc_temp - 473.0);
        let heat_demand = if htc_efficiency > 0.0 {
            self.htc_base_heat_kw / htc_efficiency
        } else {
            0.0
        };

        let waste_heat = biogas_energy * self.waste_heat_fraction;
        let self_sufficiency = if heat_demand > 0.0 {
            (waste_heat / heat_demand).min(1.0)
        } else {
            0.0
        };

        let specific_cost = self.base_specific_cost * (1.0 + 0.1 * (pr - 6.0) / 6.0);

        Ok(PerformanceRecord::new()
            .with(metrics::OVERALL_EFFICIENCY, efficiency)
            .with(metrics::NET_POWER_KW, net_power)
            .with(metrics::BIOGAS_ENERGY_KW, biogas_energy)
            .with(metrics::HTC_HEAT_DEMAND_KW, heat_demand)
            .with(metrics::WASTE_HEAT_AVAILABLE_KW, waste_heat)
            .with(metrics::SELF_SUFFICIENCY_RATIO, self_sufficiency)
            .with(metrics::SPECIFIC_COST, specific_cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adhtc_types::AdhtcError;

    #[test]
    fn nominal_point_is_physically_plausible() {
        let space = PlantSurrogateModel::parameter_space().unwrap();
        let params = space
            .assign_named(&PlantSurrogateModel::initial_guess())
            .unwrap();
        let perf = PlantSurrogateModel::default().evaluate(&params).unwrap();

        let eff = perf.overall_efficiency();
        assert!(eff > 0.2 && eff < 0.45, "efficiency {eff}");
        assert!(perf.net_power_kw() > 0.0);
        assert!((0.0..=1.0).contains(&perf.self_sufficiency_ratio()));
        // pr = 12 → 1000 * (1 + 0.1)
        assert!((perf.specific_cost() - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn higher_pressure_ratio_raises_efficiency_and_cost() {
        let space = PlantSurrogateModel::parameter_space().unwrap();
        let model = PlantSurrogateModel::default();
        let mut low = PlantSurrogateModel::initial_guess();
        low.insert(PRESSURE_RATIO.into(), 6.0);
        let mut high = low.clone();
        high.insert(PRESSURE_RATIO.into(), 20.0);

        let p_low = model.evaluate(&space.assign_named(&low).unwrap()).unwrap();
        let p_high = model.evaluate(&space.assign_named(&high).unwrap()).unwrap();
        assert!(p_high.overall_efficiency() > p_low.overall_efficiency());
        assert!(p_high.specific_cost() > p_low.specific_cost());
    }

    #[test]
    fn missing_parameters_use_nominal_values() {
        let space = ParameterSpace::builder()
            .add(PRESSURE_RATIO, 3.0, 25.0)
            .build()
            .unwrap();
        let full = PlantSurrogateModel::parameter_space().unwrap();
        let model = PlantSurrogateModel::default();

        let partial = model.evaluate(&space.assign(vec![12.0]).unwrap()).unwrap();
        let nominal = model
            .evaluate(&full.assign_named(&PlantSurrogateModel::initial_guess()).unwrap())
            .unwrap();
        assert_eq!(partial, nominal);
    }

    #[test]
    fn closures_are_models() {
        let space = ParameterSpace::builder()
            .add("x", 0.0, 1.0)
            .build()
            .unwrap();
        let failing = |_: &ParameterAssignment| -> AdhtcResult<PerformanceRecord> {
            Err(AdhtcError::model("solver diverged"))
        };
        assert!(failing.evaluate(&space.midpoint()).is_err());
    }
}
