//! Objective wrappers that turn plain closures into evaluation records.

use bl_types::{BoResult, LoopError, UserFunctionResult};

/// Something the loop can evaluate at a batch of input rows.
pub trait UserFunction {
    fn evaluate(&mut self, x: &[Vec<f64>]) -> BoResult<Vec<UserFunctionResult>>;
}

/// Wraps a per-point closure returning the output row.
///
/// When built with [`UserFunctionWrapper::with_extra_outputs`], the closure's
/// output is the objective followed by one value per named extra output.
pub struct UserFunctionWrapper<F> {
    f: F,
    extra_output_names: Vec<String>,
    evaluations: usize,
}

impl<F> UserFunctionWrapper<F>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            extra_output_names: Vec::new(),
            evaluations: 0,
        }
    }

    pub fn with_extra_outputs(f: F, names: Vec<String>) -> Self {
        Self {
            f,
            extra_output_names: names,
            evaluations: 0,
        }
    }

    pub fn evaluation_count(&self) -> usize {
        self.evaluations
    }

    fn evaluate_one(&mut self, point: &[f64]) -> BoResult<UserFunctionResult> {
        let mut output = (self.f)(point);
        self.evaluations += 1;

        let n_extra = self.extra_output_names.len();
        if output.len() <= n_extra {
            return Err(LoopError::EmptyFunctionOutput {
                point: point.to_vec(),
            }
            .into());
        }
        let extras = output.split_off(output.len() - n_extra);
        if output.iter().any(|v| !v.is_finite()) {
            return Err(LoopError::NonFiniteObjective {
                point: point.to_vec(),
            }
            .into());
        }

        let mut result = UserFunctionResult::new(point.to_vec(), output)?;
        for (name, value) in self.extra_output_names.iter().zip(extras) {
            result = result.with_extra_output(name.clone(), vec![value]);
        }
        Ok(result)
    }
}

impl<F> UserFunction for UserFunctionWrapper<F>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    fn evaluate(&mut self, x: &[Vec<f64>]) -> BoResult<Vec<UserFunctionResult>> {
        x.iter().map(|point| self.evaluate_one(point)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_types::BoError;

    #[test]
    fn wraps_closure_per_point() {
        let mut wrapper = UserFunctionWrapper::new(|x: &[f64]| vec![x[0] * x[0]]);
        let results = wrapper.evaluate(&[vec![1.0], vec![3.0]]).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].x, vec![3.0]);
        assert_eq!(results[1].y, vec![9.0]);
        assert_eq!(wrapper.evaluation_count(), 2);
    }

    #[test]
    fn splits_extra_outputs() {
        let mut wrapper = UserFunctionWrapper::with_extra_outputs(
            |x: &[f64]| vec![x[0] + 1.0, 42.0],
            vec!["cost".to_string()],
        );
        let results = wrapper.evaluate(&[vec![0.5]]).unwrap();
        assert_eq!(results[0].y, vec![1.5]);
        assert_eq!(results[0].extra_outputs["cost"], vec![42.0]);
    }

    #[test]
    fn missing_objective_is_an_error() {
        let mut wrapper =
            UserFunctionWrapper::with_extra_outputs(|_: &[f64]| vec![1.0], vec!["cost".into()]);
        let err = wrapper.evaluate(&[vec![0.5]]).unwrap_err();
        assert!(matches!(
            err,
            BoError::Loop(LoopError::EmptyFunctionOutput { .. })
        ));
    }

    #[test]
    fn nan_objective_is_an_error() {
        let mut wrapper = UserFunctionWrapper::new(|_: &[f64]| vec![f64::NAN]);
        let err = wrapper.evaluate(&[vec![0.5]]).unwrap_err();
        assert!(matches!(
            err,
            BoError::Loop(LoopError::NonFiniteObjective { .. })
        ));
    }
}
