//! Conditions that end the built-in loop.

use bl_types::LoopState;

pub trait StoppingCondition {
    fn should_stop(&self, state: &LoopState) -> bool;
}

/// Stops after `i_max` loop iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedIterationsStoppingCondition {
    pub i_max: usize,
}

impl FixedIterationsStoppingCondition {
    pub fn new(i_max: usize) -> Self {
        Self { i_max }
    }
}

impl StoppingCondition for FixedIterationsStoppingCondition {
    fn should_stop(&self, state: &LoopState) -> bool {
        state.iteration >= self.i_max
    }
}

/// Stops once the two most recent samples are closer than `eps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceStoppingCondition {
    pub eps: f64,
}

impl ConvergenceStoppingCondition {
    pub fn new(eps: f64) -> Self {
        Self { eps }
    }
}

impl StoppingCondition for ConvergenceStoppingCondition {
    fn should_stop(&self, state: &LoopState) -> bool {
        // Needs at least one completed iteration and two samples.
        let results = state.results();
        if state.iteration == 0 || results.len() < 2 {
            return false;
        }
        let last = &results[results.len() - 1].x;
        let prev = &results[results.len() - 2].x;
        let dist = last
            .iter()
            .zip(prev)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        dist < self.eps
    }
}

/// Stops when any of its conditions does.
#[derive(Default)]
pub struct AnyStoppingCondition {
    conditions: Vec<Box<dyn StoppingCondition>>,
}

impl AnyStoppingCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn or(mut self, condition: impl StoppingCondition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }
}

impl StoppingCondition for AnyStoppingCondition {
    fn should_stop(&self, state: &LoopState) -> bool {
        self.conditions.iter().any(|c| c.should_stop(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_types::UserFunctionResult;

    fn state_with(points: &[f64], iteration: usize) -> LoopState {
        let mut state = LoopState::new(
            points
                .iter()
                .map(|x| UserFunctionResult::new(vec![*x], vec![0.0]).unwrap())
                .collect(),
        )
        .unwrap();
        state.iteration = iteration;
        state
    }

    #[test]
    fn fixed_iterations() {
        let cond = FixedIterationsStoppingCondition::new(3);
        assert!(!cond.should_stop(&state_with(&[0.1], 2)));
        assert!(cond.should_stop(&state_with(&[0.1], 3)));
        assert!(FixedIterationsStoppingCondition::new(0).should_stop(&LoopState::default()));
    }

    #[test]
    fn convergence() {
        let cond = ConvergenceStoppingCondition::new(1e-3);
        assert!(!cond.should_stop(&state_with(&[0.1, 0.1], 0)));
        assert!(cond.should_stop(&state_with(&[0.5, 0.1, 0.1005], 1)));
        assert!(!cond.should_stop(&state_with(&[0.1, 0.2], 1)));
        assert!(!cond.should_stop(&state_with(&[0.1], 1)));
    }

    #[test]
    fn any_of() {
        let cond = AnyStoppingCondition::new()
            .or(FixedIterationsStoppingCondition::new(10))
            .or(ConvergenceStoppingCondition::new(1e-3));
        assert!(cond.should_stop(&state_with(&[0.2, 0.2], 1)));
        assert!(cond.should_stop(&state_with(&[0.2, 0.9], 10)));
        assert!(!cond.should_stop(&state_with(&[0.2, 0.9], 1)));
        assert!(!AnyStoppingCondition::new().should_stop(&state_with(&[0.2], 5)));
    }
}
