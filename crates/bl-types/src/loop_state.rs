//! Evaluation records and the append-only loop state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{BoError, BoResult, LoopError};
use crate::validation_error;

/// One evaluated point: the input row and the observed output row.
///
/// Deserialization goes through [`UserFunctionResult::new`], so a decoded
/// result always has a non-empty input and output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawUserFunctionResult")]
pub struct UserFunctionResult {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Named auxiliary outputs recorded alongside the objective (e.g. cost).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_outputs: BTreeMap<String, Vec<f64>>,
}

#[derive(Deserialize)]
struct RawUserFunctionResult {
    x: Vec<f64>,
    y: Vec<f64>,
    #[serde(default)]
    extra_outputs: BTreeMap<String, Vec<f64>>,
}

impl TryFrom<RawUserFunctionResult> for UserFunctionResult {
    type Error = BoError;

    fn try_from(raw: RawUserFunctionResult) -> Result<Self, Self::Error> {
        let mut result = Self::new(raw.x, raw.y)?;
        result.extra_outputs = raw.extra_outputs;
        Ok(result)
    }
}

impl UserFunctionResult {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> BoResult<Self> {
        if x.is_empty() {
            return Err(validation_error!("result input row is empty"));
        }
        if y.is_empty() {
            return Err(LoopError::EmptyFunctionOutput { point: x }.into());
        }
        Ok(Self {
            x,
            y,
            extra_outputs: BTreeMap::new(),
        })
    }

    pub fn with_extra_output(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.extra_outputs.insert(name.into(), values);
        self
    }

    /// First output column; the value the loop minimizes.
    pub fn objective(&self) -> f64 {
        self.y[0]
    }
}

/// Everything the loop has evaluated so far.
///
/// Rows are only ever appended; `iteration` counts calls to [`LoopState::update`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    results: Vec<UserFunctionResult>,
    pub iteration: usize,
}

impl LoopState {
    pub fn new(results: Vec<UserFunctionResult>) -> BoResult<Self> {
        let mut state = Self::default();
        for result in results {
            state.push_checked(result)?;
        }
        Ok(state)
    }

    /// Build a state from paired input/output matrices.
    pub fn from_arrays(x: &[Vec<f64>], y: &[Vec<f64>]) -> BoResult<Self> {
        if x.len() != y.len() {
            return Err(validation_error!(
                "x has {} rows but y has {} rows",
                x.len(),
                y.len()
            ));
        }
        let results = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| UserFunctionResult::new(xi.clone(), yi.clone()))
            .collect::<BoResult<Vec<_>>>()?;
        Self::new(results)
    }

    /// Append new results and advance the iteration counter.
    ///
    /// The batch is checked as a whole first; on error nothing is appended
    /// and the counter stays put.
    pub fn update(&mut self, results: Vec<UserFunctionResult>) -> BoResult<()> {
        let shape = self
            .results
            .first()
            .or(results.first())
            .map(|r| (r.x.len(), r.y.len()));
        if let Some(shape) = shape {
            for result in &results {
                check_shape(shape, result)?;
            }
        }
        self.results.extend(results);
        self.iteration += 1;
        Ok(())
    }

    fn push_checked(&mut self, result: UserFunctionResult) -> BoResult<()> {
        if let Some(first) = self.results.first() {
            check_shape((first.x.len(), first.y.len()), &result)?;
        }
        self.results.push(result);
        Ok(())
    }

    pub fn results(&self) -> &[UserFunctionResult] {
        &self.results
    }

    pub fn x(&self) -> Vec<Vec<f64>> {
        self.results.iter().map(|r| r.x.clone()).collect()
    }

    pub fn y(&self) -> Vec<Vec<f64>> {
        self.results.iter().map(|r| r.y.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn input_dim(&self) -> Option<usize> {
        self.results.first().map(|r| r.x.len())
    }

    pub fn output_dim(&self) -> Option<usize> {
        self.results.first().map(|r| r.y.len())
    }

    /// Result with the smallest objective.
    pub fn best(&self) -> Option<&UserFunctionResult> {
        self.results
            .iter()
            .min_by(|a, b| a.objective().total_cmp(&b.objective()))
    }
}

fn check_shape((x_dim, y_dim): (usize, usize), result: &UserFunctionResult) -> BoResult<()> {
    if result.x.len() != x_dim || result.y.len() != y_dim {
        return Err(LoopError::ResultDimension {
            expected_x: x_dim,
            expected_y: y_dim,
            actual_x: result.x.len(),
            actual_y: result.y.len(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BoError;

    fn result(x: f64, y: f64) -> UserFunctionResult {
        UserFunctionResult::new(vec![x], vec![y]).unwrap()
    }

    #[test]
    fn empty_output_rejected() {
        let err = UserFunctionResult::new(vec![0.5], vec![]).unwrap_err();
        assert!(matches!(
            err,
            BoError::Loop(LoopError::EmptyFunctionOutput { .. })
        ));
        assert!(UserFunctionResult::new(vec![], vec![1.0]).is_err());
    }

    #[test]
    fn update_appends_and_counts_iterations() {
        let mut state = LoopState::from_arrays(&[vec![0.2], vec![0.6]], &[vec![1.0], vec![2.0]])
            .unwrap();
        assert_eq!(state.len(), 2);
        assert_eq!(state.iteration, 0);

        state.update(vec![result(0.9, -3.0)]).unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.iteration, 1);
        assert_eq!(state.x(), vec![vec![0.2], vec![0.6], vec![0.9]]);
        assert_eq!(state.y()[2], vec![-3.0]);

        // An empty batch still counts as an iteration
        state.update(vec![]).unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.iteration, 2);
    }

    #[test]
    fn mismatched_rows_rejected() {
        let err = LoopState::from_arrays(&[vec![0.2]], &[]).unwrap_err();
        assert!(matches!(err, BoError::Validation(_)));

        let mut state = LoopState::new(vec![result(0.1, 1.0)]).unwrap();
        let bad = UserFunctionResult::new(vec![0.1, 0.2], vec![1.0]).unwrap();
        let err = state.update(vec![bad]).unwrap_err();
        assert!(matches!(
            err,
            BoError::Loop(LoopError::ResultDimension { expected_x: 1, actual_x: 2, .. })
        ));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn failed_batch_appends_nothing() {
        let mut state = LoopState::new(vec![result(0.1, 1.0)]).unwrap();
        let bad = UserFunctionResult::new(vec![0.4], vec![1.0, 2.0]).unwrap();
        let err = state.update(vec![result(0.3, 1.0), bad]).unwrap_err();
        assert!(matches!(
            err,
            BoError::Loop(LoopError::ResultDimension { expected_y: 1, actual_y: 2, .. })
        ));
        assert_eq!(state.len(), 1);
        assert_eq!(state.iteration, 0);

        // A fresh state takes its shape from the first row of the batch
        let mut empty = LoopState::default();
        let wide = UserFunctionResult::new(vec![0.4, 0.5], vec![1.0]).unwrap();
        assert!(empty.update(vec![result(0.3, 1.0), wide]).is_err());
        assert!(empty.is_empty());
    }

    #[test]
    fn best_is_minimum_objective() {
        let state =
            LoopState::new(vec![result(0.1, 3.0), result(0.7, -6.0), result(0.4, 0.5)]).unwrap();
        assert_eq!(state.best().unwrap().x, vec![0.7]);
        assert!(LoopState::default().best().is_none());
    }

    #[test]
    fn extra_outputs_round_trip() {
        let r = result(0.3, 1.0).with_extra_output("cost", vec![2.5]);
        let json = serde_json::to_string(&r).unwrap();
        let back: UserFunctionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.extra_outputs["cost"], vec![2.5]);

        let plain = serde_json::to_value(result(0.3, 1.0)).unwrap();
        assert!(plain.get("extra_outputs").is_none());
    }

    #[test]
    fn decoding_rejects_empty_rows() {
        let err = serde_json::from_str::<UserFunctionResult>(r#"{"x": [0.1], "y": []}"#);
        assert!(err.is_err());
        assert!(serde_json::from_str::<UserFunctionResult>(r#"{"x": [], "y": [1.0]}"#).is_err());

        let ok: UserFunctionResult = serde_json::from_str(r#"{"x": [0.1], "y": [2.0]}"#).unwrap();
        assert_eq!(ok.objective(), 2.0);
        assert!(ok.extra_outputs.is_empty());
    }
}
