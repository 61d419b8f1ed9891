//! Acquisition functions: scores that rank candidate points for the next
//! evaluation. Larger is better; the loop minimizes the objective.

use serde::{Deserialize, Serialize};

use bl_types::{BoResult, ModelError};

use crate::gp::Model;

/// Ranks a candidate point under the model's posterior.
pub trait Acquisition {
    fn evaluate(&self, model: &dyn Model, x: &[f64]) -> BoResult<f64>;

    fn name(&self) -> &str;
}

/// Best (lowest) observed objective in the model's training data.
fn y_min(model: &dyn Model) -> BoResult<f64> {
    model
        .y()
        .iter()
        .filter_map(|row| row.first().copied())
        .reduce(f64::min)
        .ok_or_else(|| ModelError::NoData.into())
}

fn mean_and_std(model: &dyn Model, x: &[f64]) -> BoResult<(f64, f64)> {
    let (mean, variance) = model.predict_point(x)?;
    Ok((mean, variance.max(0.0).sqrt()))
}

// ---------------------------------------------------------------------------
// Normal distribution helpers
// ---------------------------------------------------------------------------

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Zelen & Severo rational approximation, |err| < 7.5e-8).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    let poly = t
        * (0.319_381_530
            + t * (-0.356_563_782
                + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 {
        cdf
    } else {
        1.0 - cdf
    }
}

// ---------------------------------------------------------------------------
// Expected Improvement
// ---------------------------------------------------------------------------

/// `EI(x) = (y_min - μ - ξ) Φ(z) + σ φ(z)`, `z = (y_min - μ - ξ) / σ`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedImprovement {
    pub jitter: f64,
}

impl Acquisition for ExpectedImprovement {
    fn evaluate(&self, model: &dyn Model, x: &[f64]) -> BoResult<f64> {
        let f_best = y_min(model)?;
        let (mean, std) = mean_and_std(model, x)?;
        let gap = f_best - mean - self.jitter;
        if std < 1e-12 {
            return Ok(gap.max(0.0));
        }
        let z = gap / std;
        Ok((gap * norm_cdf(z) + std * norm_pdf(z)).max(0.0))
    }

    fn name(&self) -> &str {
        "expected_improvement"
    }
}

/// `PI(x) = Φ((y_min - μ - ξ) / σ)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityOfImprovement {
    pub jitter: f64,
}

impl Acquisition for ProbabilityOfImprovement {
    fn evaluate(&self, model: &dyn Model, x: &[f64]) -> BoResult<f64> {
        let f_best = y_min(model)?;
        let (mean, std) = mean_and_std(model, x)?;
        let gap = f_best - mean - self.jitter;
        if std < 1e-12 {
            return Ok(if gap > 0.0 { 1.0 } else { 0.0 });
        }
        Ok(norm_cdf(gap / std))
    }

    fn name(&self) -> &str {
        "probability_of_improvement"
    }
}

/// `-(μ - β σ)`: prefers low means and high uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegativeLowerConfidenceBound {
    pub beta: f64,
}

impl Default for NegativeLowerConfidenceBound {
    fn default() -> Self {
        Self { beta: 1.0 }
    }
}

impl Acquisition for NegativeLowerConfidenceBound {
    fn evaluate(&self, model: &dyn Model, x: &[f64]) -> BoResult<f64> {
        let (mean, std) = mean_and_std(model, x)?;
        Ok(-(mean - self.beta * std))
    }

    fn name(&self) -> &str {
        "negative_lower_confidence_bound"
    }
}

/// Config-selectable acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AcquisitionKind {
    ExpectedImprovement { jitter: f64 },
    ProbabilityOfImprovement { jitter: f64 },
    NegativeLowerConfidenceBound { beta: f64 },
}

impl Default for AcquisitionKind {
    fn default() -> Self {
        Self::ExpectedImprovement { jitter: 0.0 }
    }
}

impl Acquisition for AcquisitionKind {
    fn evaluate(&self, model: &dyn Model, x: &[f64]) -> BoResult<f64> {
        match *self {
            Self::ExpectedImprovement { jitter } => {
                ExpectedImprovement { jitter }.evaluate(model, x)
            }
            Self::ProbabilityOfImprovement { jitter } => {
                ProbabilityOfImprovement { jitter }.evaluate(model, x)
            }
            Self::NegativeLowerConfidenceBound { beta } => {
                NegativeLowerConfidenceBound { beta }.evaluate(model, x)
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::ExpectedImprovement { .. } => "expected_improvement",
            Self::ProbabilityOfImprovement { .. } => "probability_of_improvement",
            Self::NegativeLowerConfidenceBound { .. } => "negative_lower_confidence_bound",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Fixed-posterior model for exercising the formulas.
    struct FixedModel {
        mean: f64,
        variance: f64,
        y: Vec<Vec<f64>>,
    }

    impl Model for FixedModel {
        fn set_data(&mut self, _: &[Vec<f64>], _: &[Vec<f64>]) -> BoResult<()> {
            Ok(())
        }

        fn optimize(&mut self) -> BoResult<()> {
            Ok(())
        }

        fn predict(&self, x: &[Vec<f64>]) -> BoResult<(Vec<f64>, Vec<f64>)> {
            Ok((vec![self.mean; x.len()], vec![self.variance; x.len()]))
        }

        fn x(&self) -> &[Vec<f64>] {
            &[]
        }

        fn y(&self) -> &[Vec<f64>] {
            &self.y
        }
    }

    fn model(mean: f64, variance: f64) -> FixedModel {
        FixedModel {
            mean,
            variance,
            y: vec![vec![1.0], vec![0.0], vec![2.0]],
        }
    }

    #[test]
    fn normal_helpers() {
        assert_abs_diff_eq!(norm_cdf(0.0), 0.5, epsilon = 1e-7);
        assert_abs_diff_eq!(norm_cdf(1.96), 0.975_002_1, epsilon = 1e-6);
        assert_abs_diff_eq!(norm_cdf(-1.0), 0.158_655_3, epsilon = 1e-6);
        assert_abs_diff_eq!(norm_pdf(0.0), 0.398_942_28, epsilon = 1e-8);
    }

    #[test]
    fn ei_at_incumbent_mean() {
        // gap = 0 -> EI = σ φ(0)
        let m = model(0.0, 4.0);
        let ei = ExpectedImprovement::default().evaluate(&m, &[0.5]).unwrap();
        assert_abs_diff_eq!(ei, 2.0 * norm_pdf(0.0), epsilon = 1e-9);
    }

    #[test]
    fn ei_without_uncertainty() {
        let m = model(-0.5, 0.0);
        let ei = ExpectedImprovement::default().evaluate(&m, &[0.5]).unwrap();
        assert_abs_diff_eq!(ei, 0.5, epsilon = 1e-12);

        let m = model(0.5, 0.0);
        assert_eq!(ExpectedImprovement::default().evaluate(&m, &[0.5]).unwrap(), 0.0);
    }

    #[test]
    fn ei_prefers_uncertainty_and_low_means() {
        let ei = ExpectedImprovement::default();
        let low_var = ei.evaluate(&model(0.5, 0.01), &[0.0]).unwrap();
        let high_var = ei.evaluate(&model(0.5, 1.0), &[0.0]).unwrap();
        assert!(high_var > low_var);

        let high_mean = ei.evaluate(&model(0.5, 1.0), &[0.0]).unwrap();
        let low_mean = ei.evaluate(&model(-0.5, 1.0), &[0.0]).unwrap();
        assert!(low_mean > high_mean);
    }

    #[test]
    fn jitter_reduces_ei() {
        let m = model(0.0, 1.0);
        let plain = ExpectedImprovement::default().evaluate(&m, &[0.0]).unwrap();
        let jittered = ExpectedImprovement { jitter: 0.1 }.evaluate(&m, &[0.0]).unwrap();
        assert!(jittered < plain);
    }

    #[test]
    fn probability_of_improvement() {
        let pi = ProbabilityOfImprovement::default();
        assert_abs_diff_eq!(pi.evaluate(&model(0.0, 1.0), &[0.0]).unwrap(), 0.5, epsilon = 1e-7);
        assert_eq!(pi.evaluate(&model(-1.0, 0.0), &[0.0]).unwrap(), 1.0);
    }

    #[test]
    fn lcb() {
        let lcb = NegativeLowerConfidenceBound { beta: 2.0 };
        assert_abs_diff_eq!(lcb.evaluate(&model(1.0, 0.25), &[0.0]).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn kind_dispatches_and_serializes() {
        let kind = AcquisitionKind::NegativeLowerConfidenceBound { beta: 2.0 };
        assert_eq!(kind.name(), "negative_lower_confidence_bound");
        assert_abs_diff_eq!(
            kind.evaluate(&model(1.0, 0.25), &[0.0]).unwrap(),
            0.0,
            epsilon = 1e-12
        );

        let json = serde_json::to_value(AcquisitionKind::default()).unwrap();
        assert_eq!(json["type"], "expected_improvement");
    }

    #[test]
    fn empty_model_is_an_error() {
        let m = FixedModel {
            mean: 0.0,
            variance: 1.0,
            y: vec![],
        };
        assert!(ExpectedImprovement::default().evaluate(&m, &[0.0]).is_err());
    }
}
