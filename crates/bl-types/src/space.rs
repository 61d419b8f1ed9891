//! Parameter space definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::{BoResult, SpaceError};

/// A real-valued parameter bounded by the closed interval `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousParameter {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl ContinuousParameter {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Result<Self, SpaceError> {
        let name = name.into();
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(SpaceError::InvalidBounds { name, min, max });
        }
        Ok(Self { name, min, max })
    }
}

/// A parameter restricted to a finite set of real values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteParameter {
    pub name: String,
    /// Sorted, deduplicated domain values.
    pub domain: Vec<f64>,
}

impl DiscreteParameter {
    pub fn new(name: impl Into<String>, domain: Vec<f64>) -> Result<Self, SpaceError> {
        let name = name.into();
        if domain.is_empty() || domain.iter().any(|v| !v.is_finite()) {
            return Err(SpaceError::EmptyDomain { name });
        }
        let mut domain = domain;
        domain.sort_by(f64::total_cmp);
        domain.dedup();
        Ok(Self { name, domain })
    }

    fn nearest(&self, value: f64) -> f64 {
        self.domain
            .iter()
            .copied()
            .min_by(|a, b| (a - value).abs().total_cmp(&(b - value).abs()))
            .unwrap_or(value)
    }
}

/// One dimension of a [`ParameterSpace`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parameter {
    Continuous(ContinuousParameter),
    Discrete(DiscreteParameter),
}

impl Parameter {
    pub fn name(&self) -> &str {
        match self {
            Self::Continuous(p) => &p.name,
            Self::Discrete(p) => &p.name,
        }
    }

    /// Smallest and largest admissible value.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Self::Continuous(p) => (p.min, p.max),
            Self::Discrete(p) => (p.domain[0], p.domain[p.domain.len() - 1]),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        match self {
            Self::Continuous(p) => value >= p.min && value <= p.max,
            Self::Discrete(p) => p.domain.iter().any(|d| *d == value),
        }
    }

    /// Snap `value` into the domain: clamp for continuous, nearest member
    /// for discrete.
    pub fn round(&self, value: f64) -> f64 {
        match self {
            Self::Continuous(p) => value.clamp(p.min, p.max),
            Self::Discrete(p) => p.nearest(value),
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Continuous(_))
    }
}

/// The full search space: an ordered list of uniquely named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    parameters: Vec<Parameter>,
}

impl ParameterSpace {
    pub fn new(parameters: Vec<Parameter>) -> Result<Self, SpaceError> {
        if parameters.is_empty() {
            return Err(SpaceError::EmptySpace);
        }
        let mut seen = HashSet::new();
        for param in &parameters {
            if !seen.insert(param.name().to_string()) {
                return Err(SpaceError::DuplicateName {
                    name: param.name().to_string(),
                });
            }
        }
        Ok(Self { parameters })
    }

    pub fn builder() -> ParameterSpaceBuilder {
        ParameterSpaceBuilder::default()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn dimension(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(Parameter::name).collect()
    }

    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.parameters.iter().map(Parameter::bounds).collect()
    }

    /// One flag per point; wrong-dimension points are reported as outside.
    pub fn check_points_in_domain(&self, points: &[Vec<f64>]) -> Vec<bool> {
        points.iter().map(|p| self.contains(p)).collect()
    }

    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dimension()
            && self
                .parameters
                .iter()
                .zip(point)
                .all(|(param, v)| param.contains(*v))
    }

    /// Returns the first dimension or domain violation among `points`.
    pub fn validate_points(&self, points: &[Vec<f64>]) -> BoResult<()> {
        for point in points {
            if point.len() != self.dimension() {
                return Err(SpaceError::DimensionMismatch {
                    expected: self.dimension(),
                    actual: point.len(),
                }
                .into());
            }
            if !self.contains(point) {
                return Err(SpaceError::OutOfDomain {
                    point: point.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn round(&self, point: &[f64]) -> Vec<f64> {
        self.parameters
            .iter()
            .zip(point)
            .map(|(param, v)| param.round(*v))
            .collect()
    }

    /// Clamp every coordinate to its parameter's bounds without snapping
    /// discrete values.
    pub fn clip(&self, point: &[f64]) -> Vec<f64> {
        self.parameters
            .iter()
            .zip(point)
            .map(|(param, v)| {
                let (lo, hi) = param.bounds();
                v.clamp(lo, hi)
            })
            .collect()
    }
}

/// Chained builder for [`ParameterSpace`].
#[derive(Debug, Default)]
pub struct ParameterSpaceBuilder {
    parameters: Vec<Parameter>,
    error: Option<SpaceError>,
}

impl ParameterSpaceBuilder {
    pub fn add_continuous(mut self, name: impl Into<String>, min: f64, max: f64) -> Self {
        match ContinuousParameter::new(name, min, max) {
            Ok(p) => self.parameters.push(Parameter::Continuous(p)),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    pub fn add_discrete(mut self, name: impl Into<String>, domain: Vec<f64>) -> Self {
        match DiscreteParameter::new(name, domain) {
            Ok(p) => self.parameters.push(Parameter::Discrete(p)),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    pub fn build(self) -> Result<ParameterSpace, SpaceError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        ParameterSpace::new(self.parameters)
    }
}
