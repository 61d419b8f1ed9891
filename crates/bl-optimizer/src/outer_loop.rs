//! The Bayesian-optimization loop.
//!
//! Two ways to drive it:
//!
//! - **External evaluation**: call [`BayesianOptimizationLoop::get_next_points`]
//!   with the results of the previous suggestion, evaluate the returned
//!   points yourself, and repeat.
//! - **Built-in driver**: hand a [`UserFunction`] and a
//!   [`StoppingCondition`] to [`BayesianOptimizationLoop::run_loop`].
//!
//! Both paths perform the same sequence of model fits and acquisition
//! optimizations, so equal seeds and equal initial data give equal
//! trajectories.

use tracing::{debug, info};

use bl_types::{BoResult, LoopError, LoopState, ParameterSpace, SpaceError, UserFunctionResult};

use crate::acquisition::Acquisition;
use crate::acquisition_optimizer::AcquisitionOptimizer;
use crate::gp::Model;
use crate::status::LoopStatus;
use crate::stopping::StoppingCondition;
use crate::user_function::UserFunction;

/// Callback invoked with the loop state at loop start or iteration end.
pub type LoopObserver = Box<dyn FnMut(&LoopState)>;

pub struct BayesianOptimizationLoop<M, A> {
    space: ParameterSpace,
    model: M,
    acquisition: A,
    acquisition_optimizer: AcquisitionOptimizer,
    loop_state: LoopState,
    batch_size: usize,
    update_interval: usize,
    status: LoopStatus,
    loop_start: Vec<LoopObserver>,
    iteration_end: Vec<LoopObserver>,
}

impl<M, A> BayesianOptimizationLoop<M, A>
where
    M: Model + Clone,
    A: Acquisition,
{
    /// Build a loop around a model; the model's current data seeds the
    /// loop state.
    pub fn new(space: ParameterSpace, model: M, acquisition: A) -> BoResult<Self> {
        let loop_state = LoopState::from_arrays(model.x(), model.y())?;
        for point in model.x() {
            if point.len() != space.dimension() {
                return Err(SpaceError::DimensionMismatch {
                    expected: space.dimension(),
                    actual: point.len(),
                }
                .into());
            }
        }

        let mut status = LoopStatus::new();
        status.record(loop_state.results());

        Ok(Self {
            space,
            model,
            acquisition,
            acquisition_optimizer: AcquisitionOptimizer::default(),
            loop_state,
            batch_size: 1,
            update_interval: 1,
            status,
            loop_start: Vec::new(),
            iteration_end: Vec::new(),
        })
    }

    pub fn with_acquisition_optimizer(mut self, optimizer: AcquisitionOptimizer) -> Self {
        self.acquisition_optimizer = optimizer;
        self
    }

    /// Number of points suggested per step.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Refit hyperparameters every `interval` iterations; the data itself
    /// is refreshed on every step.
    pub fn with_update_interval(mut self, interval: usize) -> Self {
        self.update_interval = interval.max(1);
        self
    }

    pub fn subscribe_loop_start(&mut self, observer: impl FnMut(&LoopState) + 'static) {
        self.loop_start.push(Box::new(observer));
    }

    pub fn subscribe_iteration_end(&mut self, observer: impl FnMut(&LoopState) + 'static) {
        self.iteration_end.push(Box::new(observer));
    }

    pub fn loop_state(&self) -> &LoopState {
        &self.loop_state
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn status(&self) -> &LoopStatus {
        &self.status
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Append externally evaluated results to the loop state without
    /// suggesting anything.
    pub fn record_results(&mut self, results: Vec<UserFunctionResult>) -> BoResult<()> {
        let batch_len = results.len();
        for result in &results {
            if result.x.len() != self.space.dimension() {
                return Err(SpaceError::DimensionMismatch {
                    expected: self.space.dimension(),
                    actual: result.x.len(),
                }
                .into());
            }
            if result.y.iter().any(|v| !v.is_finite()) {
                return Err(LoopError::NonFiniteObjective {
                    point: result.x.clone(),
                }
                .into());
            }
        }
        self.loop_state.update(results)?;
        let logged = self.loop_state.results();
        self.status.record(&logged[logged.len() - batch_len..]);
        self.status.iterations_completed = self.loop_state.iteration;
        Ok(())
    }

    /// One external-evaluation step: log `results` (if any), refit the
    /// model on everything logged so far, and return the next
    /// `batch_size` points to evaluate.
    pub fn get_next_points(
        &mut self,
        results: Option<Vec<UserFunctionResult>>,
    ) -> BoResult<Vec<Vec<f64>>> {
        if let Some(results) = results {
            self.record_results(results)?;
        }
        self.update_model()?;
        let points = self.compute_next_points()?;
        debug!(
            iteration = self.loop_state.iteration,
            ?points,
            "Suggested next points"
        );
        Ok(points)
    }

    /// Run the built-in loop until `stopping_condition` holds.
    ///
    /// Every evaluated point ends up in the loop state; the model is
    /// refreshed once more after the last evaluation.
    pub fn run_loop<U, S>(
        &mut self,
        user_function: &mut U,
        stopping_condition: &S,
    ) -> BoResult<()>
    where
        U: UserFunction + ?Sized,
        S: StoppingCondition + ?Sized,
    {
        info!(
            run_id = %self.status.id,
            initial_points = self.loop_state.len(),
            "Starting optimization loop"
        );
        self.status.mark_running();
        for observer in &mut self.loop_start {
            observer(&self.loop_state);
        }

        match self.run_iterations(user_function, stopping_condition) {
            Ok(()) => {
                self.status.mark_completed();
                info!(
                    run_id = %self.status.id,
                    iterations = self.loop_state.iteration,
                    best = ?self.status.best.as_ref().map(|b| (&b.x, b.objective())),
                    "Optimization loop finished"
                );
                Ok(())
            }
            Err(e) => {
                self.status.mark_failed(e.to_string());
                Err(e)
            }
        }
    }

    fn run_iterations<U, S>(
        &mut self,
        user_function: &mut U,
        stopping_condition: &S,
    ) -> BoResult<()>
    where
        U: UserFunction + ?Sized,
        S: StoppingCondition + ?Sized,
    {
        while !stopping_condition.should_stop(&self.loop_state) {
            self.update_model()?;
            let points = self.compute_next_points()?;
            let results = user_function.evaluate(&points)?;
            self.record_results(results)?;

            info!(
                iteration = self.loop_state.iteration,
                points = ?points,
                best = ?self.status.best.as_ref().map(|b| b.objective()),
                "Completed iteration"
            );
            for observer in &mut self.iteration_end {
                observer(&self.loop_state);
            }
        }
        self.update_model()
    }

    fn update_model(&mut self) -> BoResult<()> {
        self.model.set_data(&self.loop_state.x(), &self.loop_state.y())?;
        if self.loop_state.iteration % self.update_interval == 0 {
            self.model.optimize()?;
        }
        Ok(())
    }

    fn compute_next_points(&mut self) -> BoResult<Vec<Vec<f64>>> {
        if self.batch_size == 1 {
            let (point, _) = self.acquisition_optimizer.optimize(
                &self.acquisition,
                &self.model,
                &self.space,
            )?;
            return Ok(vec![point]);
        }

        // Kriging believer: pretend each pick was observed at its predicted
        // mean before choosing the next one.
        let mut believer = self.model.clone();
        let mut x = self.loop_state.x();
        let mut y = self.loop_state.y();
        let mut points = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            let (point, _) = self.acquisition_optimizer.optimize(
                &self.acquisition,
                &believer,
                &self.space,
            )?;
            let (mean, _) = believer.predict_point(&point)?;
            x.push(point.clone());
            y.push(vec![mean]);
            believer.set_data(&x, &y)?;
            points.push(point);
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::ExpectedImprovement;
    use crate::functions::{forrester, TestFunction};
    use crate::gp::GaussianProcess;
    use crate::kernel::{Kernel, Rbf};
    use crate::status::RunState;
    use crate::stopping::FixedIterationsStoppingCondition;
    use crate::user_function::UserFunctionWrapper;
    use bl_types::BoError;
    use std::cell::RefCell;
    use std::rc::Rc;

    type ForresterLoop = BayesianOptimizationLoop<GaussianProcess<Rbf>, ExpectedImprovement>;

    fn initial_loop(seed: u64) -> ForresterLoop {
        build_loop(seed, false)
    }

    fn build_loop(seed: u64, noiseless: bool) -> ForresterLoop {
        let (f, space) = forrester().unwrap();
        let x: Vec<Vec<f64>> = vec![vec![0.2], vec![0.6], vec![0.9]];
        let y = f.evaluate_batch(&x);
        let mut model = GaussianProcess::new(Rbf::default())
            .noiseless(noiseless)
            .with_seed(seed);
        model.set_data(&x, &y).unwrap();
        BayesianOptimizationLoop::new(space, model, ExpectedImprovement::default())
            .unwrap()
            .with_acquisition_optimizer(AcquisitionOptimizer::new(seed).with_anchor_points(200))
    }

    #[test]
    fn new_seeds_state_from_model() {
        let bo = initial_loop(0);
        assert_eq!(bo.loop_state().len(), 3);
        assert_eq!(bo.loop_state().iteration, 0);
        assert_eq!(bo.status().evaluations, 3);
        assert_eq!(bo.status().state, RunState::Pending);
    }

    #[test]
    fn get_next_points_does_not_evaluate() {
        let mut bo = initial_loop(0);
        let points = bo.get_next_points(None).unwrap();
        assert_eq!(points.len(), 1);
        assert!(bo.space().contains(&points[0]));
        assert_eq!(bo.loop_state().len(), 3);
        assert_eq!(bo.loop_state().iteration, 0);
    }

    #[test]
    fn get_next_points_logs_results() {
        let mut bo = initial_loop(0);
        let f = crate::functions::Forrester;
        let x_new = bo.get_next_points(None).unwrap();
        let results = vec![UserFunctionResult::new(
            x_new[0].clone(),
            vec![f.evaluate_point(&x_new[0])],
        )
        .unwrap()];
        bo.get_next_points(Some(results)).unwrap();
        assert_eq!(bo.loop_state().len(), 4);
        assert_eq!(bo.loop_state().iteration, 1);
        assert_eq!(bo.loop_state().x()[3], x_new[0]);
        assert_eq!(bo.model().x().len(), 4);
    }

    #[test]
    fn wrong_dimension_results_rejected() {
        let mut bo = initial_loop(0);
        let bad = UserFunctionResult::new(vec![0.1, 0.2], vec![1.0]).unwrap();
        assert!(bo.get_next_points(Some(vec![bad])).is_err());
        assert_eq!(bo.loop_state().len(), 3);
    }

    #[test]
    fn non_finite_results_rejected_without_logging() {
        let mut bo = initial_loop(0);
        let x_new = bo.get_next_points(None).unwrap();
        let evaluations = bo.status().evaluations;

        let bad = UserFunctionResult::new(x_new[0].clone(), vec![f64::NAN]).unwrap();
        let err = bo.get_next_points(Some(vec![bad])).unwrap_err();
        assert!(matches!(
            err,
            BoError::Loop(LoopError::NonFiniteObjective { .. })
        ));
        assert_eq!(bo.loop_state().len(), 3);
        assert_eq!(bo.loop_state().iteration, 0);
        assert_eq!(bo.status().evaluations, evaluations);

        // The loop is still usable afterwards
        assert_eq!(bo.get_next_points(None).unwrap().len(), 1);
        assert_eq!(bo.loop_state().len(), 3);
    }

    #[test]
    fn partially_bad_batch_changes_nothing() {
        let mut bo = initial_loop(0);
        let good = UserFunctionResult::new(vec![0.3], vec![1.0]).unwrap();
        let bad = UserFunctionResult::new(vec![0.4], vec![1.0, 2.0]).unwrap();
        let err = bo.record_results(vec![good, bad]).unwrap_err();
        assert!(matches!(
            err,
            BoError::Loop(LoopError::ResultDimension { .. })
        ));
        assert_eq!(bo.loop_state().len(), 3);
        assert_eq!(bo.loop_state().iteration, 0);
        assert_eq!(bo.status().evaluations, 3);
        assert_eq!(bo.status().iterations_completed, 0);
    }

    #[test]
    fn update_interval_limits_hyperparameter_refits() {
        let mut bo = initial_loop(2).with_update_interval(3);
        let f = crate::functions::Forrester;
        let params = |bo: &ForresterLoop| bo.model().kernel().log_params();

        let mut x_new = bo.get_next_points(None).unwrap();
        let mut fitted = params(&bo);
        assert_ne!(fitted, Rbf::default().log_params());

        for iteration in 1..=6 {
            let results = vec![UserFunctionResult::new(
                x_new[0].clone(),
                vec![f.evaluate_point(&x_new[0])],
            )
            .unwrap()];
            x_new = bo.get_next_points(Some(results)).unwrap();
            assert_eq!(bo.loop_state().iteration, iteration);
            assert_eq!(bo.model().x().len(), 3 + iteration);

            let current = params(&bo);
            if iteration % 3 == 0 {
                assert_ne!(current, fitted, "refit expected at iteration {iteration}");
            } else {
                assert_eq!(current, fitted, "no refit expected at iteration {iteration}");
            }
            fitted = current;
        }
    }

    #[test]
    fn run_loop_evaluates_fixed_iterations() {
        let mut bo = initial_loop(1);
        let (mut f, _) = forrester().unwrap();
        bo.run_loop(&mut f, &FixedIterationsStoppingCondition::new(5))
            .unwrap();
        assert_eq!(bo.loop_state().len(), 8);
        assert_eq!(bo.loop_state().iteration, 5);
        assert_eq!(bo.status().state, RunState::Completed);
        assert_eq!(bo.status().iterations_completed, 5);
        assert_eq!(bo.model().x().len(), 8);
    }

    #[test]
    fn observers_fire() {
        let mut bo = initial_loop(2);
        let starts = Rc::new(RefCell::new(0));
        let ends = Rc::new(RefCell::new(Vec::new()));
        {
            let starts = Rc::clone(&starts);
            bo.subscribe_loop_start(move |_| *starts.borrow_mut() += 1);
            let ends = Rc::clone(&ends);
            bo.subscribe_iteration_end(move |state| ends.borrow_mut().push(state.len()));
        }
        let (mut f, _) = forrester().unwrap();
        bo.run_loop(&mut f, &FixedIterationsStoppingCondition::new(3))
            .unwrap();
        assert_eq!(*starts.borrow(), 1);
        assert_eq!(*ends.borrow(), vec![4, 5, 6]);
    }

    #[test]
    fn failing_function_marks_run_failed() {
        let mut bo = initial_loop(3);
        let mut broken = UserFunctionWrapper::new(|_: &[f64]| vec![f64::NAN]);
        let err = bo.run_loop(&mut broken, &FixedIterationsStoppingCondition::new(2));
        assert!(err.is_err());
        assert_eq!(bo.status().state, RunState::Failed);
        assert!(bo.status().error.is_some());
        assert_eq!(bo.loop_state().len(), 3);
    }

    #[test]
    fn batch_points_are_distinct() {
        let mut bo = build_loop(4, true).with_batch_size(3);
        let points = bo.get_next_points(None).unwrap();
        assert_eq!(points.len(), 3);
        for (i, a) in points.iter().enumerate() {
            assert!(bo.space().contains(a));
            for b in &points[i + 1..] {
                assert!((a[0] - b[0]).abs() > 1e-6, "duplicate batch point {a:?}");
            }
        }
    }

    #[test]
    fn manual_and_builtin_loops_agree() {
        let iterations = 4;
        let f = crate::functions::Forrester;

        let mut manual = initial_loop(7);
        let mut results = None;
        for _ in 0..iterations {
            let x_new = manual.get_next_points(results.take()).unwrap();
            let y_new = f.evaluate_batch(&x_new);
            results = Some(
                x_new
                    .into_iter()
                    .zip(y_new)
                    .map(|(x, y)| UserFunctionResult::new(x, y).unwrap())
                    .collect(),
            );
        }
        manual.record_results(results.unwrap()).unwrap();

        let mut builtin = initial_loop(7);
        let (mut target, _) = forrester().unwrap();
        builtin
            .run_loop(&mut target, &FixedIterationsStoppingCondition::new(iterations))
            .unwrap();

        assert_eq!(manual.loop_state().x(), builtin.loop_state().x());
        assert_eq!(manual.loop_state().y(), builtin.loop_state().y());
    }
}
