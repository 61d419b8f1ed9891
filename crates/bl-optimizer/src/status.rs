//! Run tracking for an optimization loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bl_types::UserFunctionResult;

/// Unique optimization run identifier.
pub type RunId = Uuid;

/// Lifecycle state for an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Aggregate status of an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopStatus {
    pub id: RunId,
    pub state: RunState,
    pub iterations_completed: usize,
    pub evaluations: usize,
    /// Lowest-objective result seen so far.
    pub best: Option<UserFunctionResult>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl LoopStatus {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: RunState::Pending,
            iterations_completed: 0,
            evaluations: 0,
            best: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = RunState::Running;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.error = None;
    }

    pub fn mark_completed(&mut self) {
        self.state = RunState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = RunState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// Count a batch of evaluations and update the best result.
    pub fn record(&mut self, results: &[UserFunctionResult]) {
        self.evaluations += results.len();
        for result in results {
            self.update_best(result);
        }
    }

    /// Replace the best result if `result` improves on it.
    pub fn update_best(&mut self, result: &UserFunctionResult) {
        let improves = match &self.best {
            None => true,
            Some(current_best) => result.objective() < current_best.objective(),
        };
        if improves {
            self.best = Some(result.clone());
        }
    }
}

impl Default for LoopStatus {
    fn default() -> Self {
        Self::new()
    }
}
