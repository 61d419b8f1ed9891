//! Bounded derivative-free maximization shared by hyperparameter fitting and
//! acquisition refinement.

/// Compass (coordinate pattern) search over a box.
///
/// Each sweep probes `±step` along every axis and moves to the first
/// improving probe; a sweep without improvement halves the step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompassSearch {
    pub initial_step: f64,
    pub min_step: f64,
    pub max_evaluations: usize,
}

impl CompassSearch {
    /// Maximize `f` from `start`, never leaving `bounds`.
    ///
    /// Returns the best point and its value. The start is clamped into the
    /// box first.
    pub fn maximize<F>(&self, start: &[f64], bounds: &[(f64, f64)], mut f: F) -> (Vec<f64>, f64)
    where
        F: FnMut(&[f64]) -> f64,
    {
        let mut x: Vec<f64> = start
            .iter()
            .zip(bounds)
            .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
            .collect();
        let mut fx = f(&x);
        let mut evaluations = 1;
        let mut step = self.initial_step;

        while step >= self.min_step && evaluations < self.max_evaluations {
            let mut improved = false;

            'sweep: for i in 0..x.len() {
                for direction in [1.0, -1.0] {
                    let (lo, hi) = bounds[i];
                    let candidate_value = (x[i] + direction * step).clamp(lo, hi);
                    if candidate_value == x[i] {
                        continue;
                    }
                    let mut candidate = x.clone();
                    candidate[i] = candidate_value;
                    let fc = f(&candidate);
                    evaluations += 1;
                    if fc > fx {
                        x = candidate;
                        fx = fc;
                        improved = true;
                        break 'sweep;
                    }
                    if evaluations >= self.max_evaluations {
                        break 'sweep;
                    }
                }
            }

            if !improved {
                step *= 0.5;
            }
        }

        (x, fx)
    }
}
