use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::registry::TargetId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkOutcome {
    Marked { count: usize, required: usize },
    Completed { required: usize },
    AlreadyMarked,
    InvalidTarget,
    SessionComplete,
}

/// One-shot completion set with a completion latch.
///
/// The required count is supplied at configuration time, either statically
/// (four limbs) or from whatever helper points a freshly loaded specimen carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerTracker {
    required_count: usize,
    valid_prefix: String,
    allowed: Option<HashSet<TargetId>>,
    marked: Vec<TargetId>,
    latched: bool,
}

impl MarkerTracker {
    pub fn new(required_count: usize, valid_prefix: impl Into<String>) -> Self {
        let mut tracker = Self::default();
        tracker.configure(required_count, valid_prefix);
        tracker
    }

    /// Restricts valid targets to an explicit set in addition to the prefix.
    pub fn with_allowed(mut self, allowed: impl IntoIterator<Item = TargetId>) -> Self {
        self.allowed = Some(allowed.into_iter().collect());
        self
    }

    /// Reconfigures for a new target set. Prior marks and the latch are discarded.
    pub fn configure(&mut self, required_count: usize, valid_prefix: impl Into<String>) {
        self.required_count = required_count;
        self.valid_prefix = valid_prefix.into();
        self.allowed = None;
        self.reset();
    }

    pub fn submit(&mut self, target: &str) -> MarkOutcome {
        if !self.is_valid(target) {
            debug!(target_id = target, prefix = %self.valid_prefix, "marker_invalid_target");
            return MarkOutcome::InvalidTarget;
        }
        if self.contains(target) {
            return MarkOutcome::AlreadyMarked;
        }
        if self.latched {
            return MarkOutcome::SessionComplete;
        }

        self.marked.push(TargetId::from(target));
        let count = self.marked.len();
        info!(target_id = target, count, required = self.required_count, "marker_set");
        if count >= self.required_count {
            self.latched = true;
            return MarkOutcome::Completed {
                required: self.required_count,
            };
        }
        MarkOutcome::Marked {
            count,
            required: self.required_count,
        }
    }

    pub fn reset(&mut self) {
        self.marked.clear();
        self.latched = false;
    }

    pub fn is_valid(&self, target: &str) -> bool {
        if !target.starts_with(self.valid_prefix.as_str()) {
            return false;
        }
        match &self.allowed {
            Some(allowed) => allowed.iter().any(|id| id.as_str() == target),
            None => true,
        }
    }

    pub fn contains(&self, target: &str) -> bool {
        self.marked.iter().any(|id| id.as_str() == target)
    }

    pub fn marked(&self) -> &[TargetId] {
        &self.marked
    }

    pub fn count(&self) -> usize {
        self.marked.len()
    }

    pub fn required_count(&self) -> usize {
        self.required_count
    }

    pub fn valid_prefix(&self) -> &str {
        &self.valid_prefix
    }

    pub fn is_complete(&self) -> bool {
        self.latched
    }
}
