//! Parameter space definitions and bounded parameter assignments.

use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use adhtc_types::{settings_error, AdhtcError, AdhtcResult, OptimizationError};

/// A single tunable variable with inclusive bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Variable name (e.g. "pressure_ratio").
    pub name: String,
    pub lower: f64,
    pub upper: f64,
}

impl ParameterDef {
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
        }
    }

    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn midpoint(&self) -> f64 {
        self.lower + 0.5 * self.span()
    }

    /// Clamp `value` into `[lower, upper]`. NaN collapses to the midpoint.
    pub fn clip(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.midpoint()
        } else {
            value.clamp(self.lower, self.upper)
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// `steps` evenly spaced values spanning the full range. A single step
    /// yields the lower bound.
    pub fn linspace(&self, steps: usize) -> Vec<f64> {
        match steps {
            0 => Vec::new(),
            1 => vec![self.lower],
            _ => (0..steps)
                .map(|i| {
                    let t = i as f64 / (steps - 1) as f64;
                    self.clip(self.lower + t * self.span())
                })
                .collect(),
        }
    }

    fn validate(&self) -> AdhtcResult<()> {
        let invalid = |message: String| {
            AdhtcError::from(OptimizationError::InvalidParameterSpace {
                name: self.name.clone(),
                message,
            })
        };
        if self.name.trim().is_empty() {
            return Err(invalid("parameter name must not be empty".into()));
        }
        if !self.lower.is_finite() || !self.upper.is_finite() {
            return Err(invalid(format!(
                "bounds must be finite, got [{}, {}]",
                self.lower, self.upper
            )));
        }
        if self.lower >= self.upper {
            return Err(invalid(format!(
                "lower bound {} must be below upper bound {}",
                self.lower, self.upper
            )));
        }
        Ok(())
    }
}

/// The ordered, immutable set of variables an optimizer searches over.
///
/// Variable order is significant: crossover splits individuals positionally
/// and the gradient optimizer works on vectors in this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ParameterDef>", into = "Vec<ParameterDef>")]
pub struct ParameterSpace {
    parameters: Vec<ParameterDef>,
    names: Arc<[String]>,
}

impl ParameterSpace {
    /// Validate `parameters` and build a space from them.
    pub fn new(parameters: Vec<ParameterDef>) -> AdhtcResult<Self> {
        if parameters.is_empty() {
            return Err(OptimizationError::InvalidParameterSpace {
                name: String::new(),
                message: "parameter space must declare at least one variable".into(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for param in &parameters {
            param.validate()?;
            if !seen.insert(param.name.as_str()) {
                return Err(OptimizationError::InvalidParameterSpace {
                    name: param.name.clone(),
                    message: "duplicate parameter name".into(),
                }
                .into());
            }
        }

        let names: Arc<[String]> = parameters.iter().map(|p| p.name.clone()).collect();
        Ok(Self { parameters, names })
    }

    pub fn builder() -> ParameterSpaceBuilder {
        ParameterSpaceBuilder::default()
    }

    pub fn parameters(&self) -> &[ParameterDef] {
        &self.parameters
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /// Build an assignment from positional values, clipping each into bounds.
    pub fn assign(&self, values: impl Into<Vec<f64>>) -> AdhtcResult<ParameterAssignment> {
        let mut values = values.into();
        if values.len() != self.len() {
            return Err(settings_error!(
                "expected {} parameter values, got {}",
                self.len(),
                values.len()
            ));
        }
        for (value, def) in values.iter_mut().zip(&self.parameters) {
            *value = def.clip(*value);
        }
        Ok(ParameterAssignment {
            names: Arc::clone(&self.names),
            values,
        })
    }

    /// Build an assignment from named values. Variables not mentioned take
    /// their mid-range value; names outside the space are rejected.
    pub fn assign_named(&self, values: &HashMap<String, f64>) -> AdhtcResult<ParameterAssignment> {
        if let Some(unknown) = values.keys().find(|name| self.get(name).is_none()) {
            return Err(settings_error!("unknown parameter '{unknown}'"));
        }
        let positional: Vec<f64> = self
            .parameters
            .iter()
            .map(|p| values.get(&p.name).copied().unwrap_or_else(|| p.midpoint()))
            .collect();
        self.assign(positional)
    }

    pub fn midpoint(&self) -> ParameterAssignment {
        ParameterAssignment {
            names: Arc::clone(&self.names),
            values: self.parameters.iter().map(ParameterDef::midpoint).collect(),
        }
    }

    /// Draw every variable uniformly from its bounds.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> ParameterAssignment {
        ParameterAssignment {
            names: Arc::clone(&self.names),
            values: self
                .parameters
                .iter()
                .map(|p| rng.random_range(p.lower..=p.upper))
                .collect(),
        }
    }

    /// Whether every value of `assignment` lies within its bounds.
    pub fn contains(&self, assignment: &ParameterAssignment) -> bool {
        assignment.values.len() == self.len()
            && self
                .parameters
                .iter()
                .zip(&assignment.values)
                .all(|(p, v)| p.contains(*v))
    }
}

impl TryFrom<Vec<ParameterDef>> for ParameterSpace {
    type Error = AdhtcError;

    fn try_from(parameters: Vec<ParameterDef>) -> Result<Self, Self::Error> {
        Self::new(parameters)
    }
}

impl From<ParameterSpace> for Vec<ParameterDef> {
    fn from(space: ParameterSpace) -> Self {
        space.parameters
    }
}

/// Builder that validates the space once all variables are declared.
#[derive(Debug, Clone, Default)]
pub struct ParameterSpaceBuilder {
    parameters: Vec<ParameterDef>,
}

impl ParameterSpaceBuilder {
    pub fn add(mut self, name: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.parameters.push(ParameterDef::new(name, lower, upper));
        self
    }

    pub fn build(self) -> AdhtcResult<ParameterSpace> {
        ParameterSpace::new(self.parameters)
    }
}

/// One value per variable of a [`ParameterSpace`], always within bounds.
///
/// Assignments are only created by their space and never change afterwards;
/// operators derive new assignments instead of editing shared ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterAssignment {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl ParameterAssignment {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Positional values in space order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        self.iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

impl Serialize for ParameterAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_space() -> ParameterSpace {
        ParameterSpace::builder()
            .add("pressure_ratio", 3.0, 25.0)
            .add("max_turbine_temp", 800.0, 1600.0)
            .add("htc_temperature", 453.0, 523.0)
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = ParameterSpace::builder()
            .add("x", 5.0, 5.0)
            .build()
            .unwrap_err();
        match err {
            AdhtcError::Optimization(OptimizationError::InvalidParameterSpace { name, .. }) => {
                assert_eq!(name, "x")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_duplicates_and_non_finite_bounds() {
        assert!(ParameterSpace::builder()
            .add("x", 0.0, 1.0)
            .add("x", 0.0, 2.0)
            .build()
            .is_err());
        assert!(ParameterSpace::builder()
            .add("x", 0.0, f64::INFINITY)
            .build()
            .is_err());
        assert!(ParameterSpace::new(Vec::new()).is_err());
    }

    #[test]
    fn assign_clips_into_bounds() {
        let space = sample_space();
        let a = space.assign(vec![30.0, 100.0, 500.0]).unwrap();
        assert_eq!(a.values(), &[25.0, 800.0, 500.0]);
        assert!(space.contains(&a));
        assert!(space.assign(vec![1.0]).is_err());
    }

    #[test]
    fn assign_named_fills_midpoints() {
        let space = sample_space();
        let mut named = HashMap::new();
        named.insert("pressure_ratio".to_string(), 12.0);
        let a = space.assign_named(&named).unwrap();
        assert_eq!(a.get("pressure_ratio"), Some(12.0));
        assert_eq!(a.get("max_turbine_temp"), Some(1200.0));

        named.insert("bogus".to_string(), 1.0);
        assert!(space.assign_named(&named).is_err());
    }

    #[test]
    fn uniform_samples_stay_in_bounds() {
        let space = sample_space();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let a = space.sample_uniform(&mut rng);
            assert!(space.contains(&a), "out of bounds: {a:?}");
        }
    }

    #[test]
    fn linspace_spans_full_range() {
        let def = ParameterDef::new("t", 800.0, 1600.0);
        let grid = def.linspace(5);
        assert_eq!(grid.first().copied(), Some(800.0));
        assert_eq!(grid.last().copied(), Some(1600.0));
        assert_eq!(grid.len(), 5);
        assert_eq!(def.linspace(1), vec![800.0]);
    }

    #[test]
    fn nan_clips_to_midpoint() {
        let def = ParameterDef::new("x", 0.0, 10.0);
        assert_eq!(def.clip(f64::NAN), 5.0);
    }

    #[test]
    fn space_round_trips_through_json() {
        let space = sample_space();
        let json = serde_json::to_string(&space).unwrap();
        let back: ParameterSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(space, back);

        let bad = r#"[{"name":"x","lower":2.0,"upper":1.0}]"#;
        assert!(serde_json::from_str::<ParameterSpace>(bad).is_err());
    }

    #[test]
    fn assignment_serializes_by_name() {
        let space = sample_space();
        let json = serde_json::to_value(space.midpoint()).unwrap();
        assert_eq!(json["pressure_ratio"], 14.0);
        assert_eq!(json["htc_temperature"], 488.0);
    }
}
