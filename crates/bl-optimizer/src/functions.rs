//! Pre-built benchmark objectives paired with their parameter spaces.

use std::f64::consts::PI;

use bl_types::{BoResult, ParameterSpace, UserFunctionResult};

use crate::user_function::UserFunction;

/// A closed-form benchmark objective.
pub trait TestFunction {
    fn evaluate_point(&self, x: &[f64]) -> f64;

    /// Known global minimum as `(location, value)`.
    fn global_minimum(&self) -> (Vec<f64>, f64);

    fn name(&self) -> &str;

    fn evaluate_batch(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        x.iter().map(|p| vec![self.evaluate_point(p)]).collect()
    }
}

/// `f(x) = (6x - 2)^2 sin(12x - 4)` on `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Forrester;

impl TestFunction for Forrester {
    fn evaluate_point(&self, x: &[f64]) -> f64 {
        let x = x[0];
        (6.0 * x - 2.0).powi(2) * (12.0 * x - 4.0).sin()
    }

    fn global_minimum(&self) -> (Vec<f64>, f64) {
        (vec![0.757_248_8], -6.020_740_1)
    }

    fn name(&self) -> &str {
        "forrester"
    }
}

/// Low-fidelity Forrester: `0.5 f(x) + 10 (x - 0.5) - 5`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForresterLow;

impl TestFunction for ForresterLow {
    fn evaluate_point(&self, x: &[f64]) -> f64 {
        0.5 * Forrester.evaluate_point(x) + 10.0 * (x[0] - 0.5) - 5.0
    }

    // No closed form; located on a 1e-5 grid.
    fn global_minimum(&self) -> (Vec<f64>, f64) {
        (0..=100_000)
            .map(|i| {
                let x = f64::from(i) * 1e-5;
                (x, self.evaluate_point(&[x]))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(x, y)| (vec![x], y))
            .unwrap_or((vec![0.0], self.evaluate_point(&[0.0])))
    }

    fn name(&self) -> &str {
        "forrester_low"
    }
}

/// Branin-Hoo on `[-5, 10] x [0, 15]`; three global minima.
#[derive(Debug, Clone, Copy, Default)]
pub struct Branin;

impl TestFunction for Branin {
    fn evaluate_point(&self, x: &[f64]) -> f64 {
        let (x1, x2) = (x[0], x[1]);
        let b = 5.1 / (4.0 * PI * PI);
        let c = 5.0 / PI;
        let t = 1.0 / (8.0 * PI);
        (x2 - b * x1 * x1 + c * x1 - 6.0).powi(2) + 10.0 * (1.0 - t) * x1.cos() + 10.0
    }

    fn global_minimum(&self) -> (Vec<f64>, f64) {
        (vec![PI, 2.275], 0.397_887)
    }

    fn name(&self) -> &str {
        "branin"
    }
}

/// Six-hump camel on `[-2, 2] x [-1, 1]`; two global minima.
#[derive(Debug, Clone, Copy, Default)]
pub struct SixHumpCamel;

impl TestFunction for SixHumpCamel {
    fn evaluate_point(&self, x: &[f64]) -> f64 {
        let (x1, x2) = (x[0], x[1]);
        let x1_sq = x1 * x1;
        let x2_sq = x2 * x2;
        (4.0 - 2.1 * x1_sq + x1_sq * x1_sq / 3.0) * x1_sq + x1 * x2 + (-4.0 + 4.0 * x2_sq) * x2_sq
    }

    fn global_minimum(&self) -> (Vec<f64>, f64) {
        (vec![0.0898, -0.7126], -1.031_628_5)
    }

    fn name(&self) -> &str {
        "six_hump_camel"
    }
}

macro_rules! impl_user_function {
    ($($ty:ty),*) => {
        $(
            impl UserFunction for $ty {
                fn evaluate(&mut self, x: &[Vec<f64>]) -> BoResult<Vec<UserFunctionResult>> {
                    x.iter()
                        .map(|p| UserFunctionResult::new(p.clone(), vec![self.evaluate_point(p)]))
                        .collect()
                }
            }
        )*
    };
}

impl_user_function!(Forrester, ForresterLow, Branin, SixHumpCamel);

pub fn forrester() -> BoResult<(Forrester, ParameterSpace)> {
    let space = ParameterSpace::builder()
        .add_continuous("x", 0.0, 1.0)
        .build()?;
    Ok((Forrester, space))
}

pub fn forrester_low() -> BoResult<(ForresterLow, ParameterSpace)> {
    let space = ParameterSpace::builder()
        .add_continuous("x", 0.0, 1.0)
        .build()?;
    Ok((ForresterLow, space))
}

pub fn branin() -> BoResult<(Branin, ParameterSpace)> {
    let space = ParameterSpace::builder()
        .add_continuous("x1", -5.0, 10.0)
        .add_continuous("x2", 0.0, 15.0)
        .build()?;
    Ok((Branin, space))
}

pub fn six_hump_camel() -> BoResult<(SixHumpCamel, ParameterSpace)> {
    let space = ParameterSpace::builder()
        .add_continuous("x1", -2.0, 2.0)
        .add_continuous("x2", -1.0, 1.0)
        .build()?;
    Ok((SixHumpCamel, space))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn forrester_known_values() {
        let (f, space) = forrester().unwrap();
        assert_eq!(space.dimension(), 1);
        // f(1) = 16 sin(8)
        assert_abs_diff_eq!(f.evaluate_point(&[1.0]), 16.0 * 8f64.sin(), epsilon = 1e-12);
        assert_abs_diff_eq!(f.evaluate_point(&[1.0 / 3.0]), 0.0, epsilon = 1e-12);

        let (x_min, y_min) = f.global_minimum();
        assert_abs_diff_eq!(f.evaluate_point(&x_min), y_min, epsilon = 1e-5);
    }

    #[test]
    fn forrester_minimum_beats_grid() {
        let f = Forrester;
        let (_, y_min) = f.global_minimum();
        for i in 0..=1000 {
            let x = i as f64 / 1000.0;
            assert!(f.evaluate_point(&[x]) >= y_min - 1e-6);
        }
    }

    #[test]
    fn forrester_low_is_shifted() {
        let x = [0.3];
        let expected = 0.5 * Forrester.evaluate_point(&x) + 10.0 * (0.3 - 0.5) - 5.0;
        assert_abs_diff_eq!(ForresterLow.evaluate_point(&x), expected, epsilon = 1e-12);

        let (x_min, y_min) = ForresterLow.global_minimum();
        assert!(x_min[0] > 0.05 && x_min[0] < 0.15, "x_min = {x_min:?}");
        assert!(y_min < -9.3);
    }

    #[test]
    fn branin_minima() {
        let (f, space) = branin().unwrap();
        assert_eq!(space.bounds(), vec![(-5.0, 10.0), (0.0, 15.0)]);
        for point in [[-PI, 12.275], [PI, 2.275], [9.424_78, 2.475]] {
            assert_abs_diff_eq!(f.evaluate_point(&point), 0.397_887, epsilon = 1e-5);
        }
    }

    #[test]
    fn six_hump_camel_minima() {
        let (f, _) = six_hump_camel().unwrap();
        assert_abs_diff_eq!(f.evaluate_point(&[0.0898, -0.7126]), -1.0316, epsilon = 1e-4);
        assert_abs_diff_eq!(f.evaluate_point(&[-0.0898, 0.7126]), -1.0316, epsilon = 1e-4);
    }

    #[test]
    fn test_functions_are_user_functions() {
        let (mut f, _) = forrester().unwrap();
        let results = f.evaluate(&[vec![0.2], vec![0.6]]).unwrap();
        assert_eq!(results.len(), 2);
        assert_abs_diff_eq!(results[0].y[0], Forrester.evaluate_point(&[0.2]), epsilon = 1e-12);
        assert_eq!(Forrester.evaluate_batch(&[vec![0.2]])[0], results[0].y);
    }
}
