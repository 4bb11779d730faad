//! Bounded history of refresh outcomes.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::RefreshOutcome;

#[derive(Debug)]
pub(crate) struct RefreshLog {
    window: usize,
    outcomes: VecDeque<RefreshOutcome>,
    last_success_at: Option<DateTime<Utc>>,
}

impl RefreshLog {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            outcomes: VecDeque::with_capacity(window),
            last_success_at: None,
        }
    }

    pub fn record(&mut self, outcome: RefreshOutcome) {
        if outcome.succeeded {
            self.last_success_at = Some(outcome.finished_at);
        }
        if self.outcomes.len() == self.window {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(outcome);
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded).count()
    }

    /// Success time survives the window so an old success is still reported.
    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.last_success_at
    }

    pub fn last_failure(&self) -> Option<&RefreshOutcome> {
        self.outcomes.iter().rev().find(|o| !o.succeeded)
    }

    /// Healthy unless the recent window is non-empty and all failures.
    pub fn is_healthy(&self) -> bool {
        self.outcomes.is_empty() || self.outcomes.iter().any(|o| o.succeeded)
    }
}
