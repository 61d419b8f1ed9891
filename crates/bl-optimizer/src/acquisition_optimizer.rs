//! Maximizes an acquisition function over a parameter space.
//!
//! Random anchor points are scored first; the best few are then refined
//! with a bounded compass search in coordinates normalized to `[0, 1]`.
//! Every returned point is rounded into the space.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use bl_types::{internal_error, BoResult, ParameterSpace};

use crate::acquisition::Acquisition;
use crate::gp::Model;
use crate::local_search::CompassSearch;

/// Default number of random anchor candidates.
const DEFAULT_ANCHORS: usize = 1000;
/// Default number of anchors refined locally.
const DEFAULT_LOCAL_STARTS: usize = 5;

#[derive(Debug, Clone)]
pub struct AcquisitionOptimizer {
    pub num_anchor_points: usize,
    pub num_local_starts: usize,
    pub local_search: CompassSearch,
    rng: StdRng,
}

impl AcquisitionOptimizer {
    pub fn new(seed: u64) -> Self {
        Self {
            num_anchor_points: DEFAULT_ANCHORS,
            num_local_starts: DEFAULT_LOCAL_STARTS,
            local_search: CompassSearch {
                initial_step: 0.05,
                min_step: 1e-5,
                max_evaluations: 200,
            },
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_anchor_points(mut self, n: usize) -> Self {
        self.num_anchor_points = n.max(1);
        self
    }

    pub fn with_local_starts(mut self, n: usize) -> Self {
        self.num_local_starts = n;
        self
    }

    /// Returns the best point found and its acquisition value.
    pub fn optimize<A>(
        &mut self,
        acquisition: &A,
        model: &dyn Model,
        space: &ParameterSpace,
    ) -> BoResult<(Vec<f64>, f64)>
    where
        A: Acquisition + ?Sized,
    {
        let bounds = space.bounds();
        let to_space = |u: &[f64]| -> Vec<f64> {
            let raw: Vec<f64> = u
                .iter()
                .zip(&bounds)
                .map(|(v, (lo, hi))| lo + v * (hi - lo))
                .collect();
            space.round(&raw)
        };

        let mut anchors = Vec::with_capacity(self.num_anchor_points);
        for _ in 0..self.num_anchor_points {
            let u: Vec<f64> = (0..bounds.len())
                .map(|_| self.rng.random_range(0.0..=1.0))
                .collect();
            let value = acquisition.evaluate(model, &to_space(&u))?;
            anchors.push((u, value));
        }
        anchors.sort_by(|a, b| b.1.total_cmp(&a.1));

        let unit_box = vec![(0.0, 1.0); bounds.len()];
        let Some(mut best) = anchors.first().cloned() else {
            return Err(internal_error!("acquisition optimizer needs at least one anchor point"));
        };
        for (start, _) in anchors.iter().take(self.num_local_starts) {
            let (u, value) = self.local_search.maximize(start, &unit_box, |u| {
                acquisition
                    .evaluate(model, &to_space(u))
                    .unwrap_or(f64::NEG_INFINITY)
            });
            if value > best.1 {
                best = (u, value);
            }
        }

        let point = to_space(&best.0);
        debug!(
            acquisition = acquisition.name(),
            ?point,
            value = best.1,
            "Optimized acquisition"
        );
        Ok((point, best.1))
    }
}

impl Default for AcquisitionOptimizer {
    fn default() -> Self {
        Self::new(0)
    }
}
