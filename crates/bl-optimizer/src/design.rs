//! Initial-design strategies for seeding the loop.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use bl_types::ParameterSpace;

/// Common trait for all experimental designs.
pub trait ExperimentalDesign {
    /// Produce `count` points inside the space.
    fn get_samples(&mut self, count: usize) -> Vec<Vec<f64>>;

    fn name(&self) -> &str;
}

// ---- Random design ----

/// Independent uniform sampling across the space.
#[derive(Debug, Clone)]
pub struct RandomDesign {
    space: ParameterSpace,
    rng: StdRng,
}

impl RandomDesign {
    pub fn new(space: ParameterSpace, seed: u64) -> Self {
        Self {
            space,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ExperimentalDesign for RandomDesign {
    fn get_samples(&mut self, count: usize) -> Vec<Vec<f64>> {
        let bounds = self.space.bounds();
        (0..count)
            .map(|_| {
                let raw: Vec<f64> = bounds
                    .iter()
                    .map(|(lo, hi)| self.rng.random_range(*lo..=*hi))
                    .collect();
                self.space.round(&raw)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "random"
    }
}

// ---- Latin hypercube ----

/// Latin-hypercube design: each axis is cut into `count` strata and every
/// stratum holds exactly one sample.
#[derive(Debug, Clone)]
pub struct LatinDesign {
    space: ParameterSpace,
    rng: StdRng,
}

impl LatinDesign {
    pub fn new(space: ParameterSpace, seed: u64) -> Self {
        Self {
            space,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ExperimentalDesign for LatinDesign {
    fn get_samples(&mut self, count: usize) -> Vec<Vec<f64>> {
        if count == 0 {
            return Vec::new();
        }
        let n = count as f64;
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.space.dimension());

        for (lo, hi) in self.space.bounds() {
            let mut strata: Vec<usize> = (0..count).collect();
            strata.shuffle(&mut self.rng);
            let column = strata
                .into_iter()
                .map(|s| {
                    let u = (s as f64 + self.rng.random::<f64>()) / n;
                    lo + u * (hi - lo)
                })
                .collect();
            columns.push(column);
        }

        (0..count)
            .map(|i| {
                let raw: Vec<f64> = columns.iter().map(|c| c[i]).collect();
                self.space.round(&raw)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "latin"
    }
}

// ---- Grid design ----

/// Cartesian grid with `steps` evenly spaced values per continuous axis.
/// Discrete axes use their full domain.
#[derive(Debug, Clone)]
pub struct GridDesign {
    cursor: usize,
    points: Vec<Vec<f64>>,
}

impl GridDesign {
    pub fn new(space: &ParameterSpace, steps: usize) -> Self {
        Self {
            cursor: 0,
            points: Self::build_grid(space, steps),
        }
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn build_grid(space: &ParameterSpace, steps: usize) -> Vec<Vec<f64>> {
        let steps = steps.max(2);
        let axes: Vec<Vec<f64>> = space
            .parameters()
            .iter()
            .map(|param| match param {
                bl_types::Parameter::Continuous(p) => (0..steps)
                    .map(|i| {
                        let t = i as f64 / (steps - 1) as f64;
                        p.min + t * (p.max - p.min)
                    })
                    .collect(),
                bl_types::Parameter::Discrete(p) => p.domain.clone(),
            })
            .collect();

        // Cartesian product
        let mut result: Vec<Vec<f64>> = vec![Vec::new()];
        for axis in &axes {
            let mut next = Vec::with_capacity(result.len() * axis.len());
            for existing in &result {
                for value in axis {
                    let mut point = existing.clone();
                    point.push(*value);
                    next.push(point);
                }
            }
            result = next;
        }
        result
    }
}

impl ExperimentalDesign for GridDesign {
    /// Returns the next `count` grid points; fewer once the grid is exhausted.
    fn get_samples(&mut self, count: usize) -> Vec<Vec<f64>> {
        let end = (self.cursor + count).min(self.points.len());
        let batch = self.points[self.cursor..end].to_vec();
        self.cursor = end;
        batch
    }

    fn name(&self) -> &str {
        "grid"
    }
}
