//! Bookkeeping owned by one reconstruction pass.
//!
//! - [`PendingTransitions`]: per-state FIFO queues of transitions that have
//!   been decided but not yet picked up by a scheduled task.
//! - [`ScheduleTable`]: schedule id -> logical event index, so a completion
//!   can find the event its task started.
//! - [`ExecutionBridge`]: state execution id -> wait-until event index, so an
//!   execute step continues the activation its wait-until step began.
//!
//! None of these ever shrink except by consuming pending transitions; the
//! log is scanned once, front to back.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::Serialize;
use statescope_interchange::{EncodedObject, StateOptions};

use crate::event::Origin;

// ──────────────────────────────────────────────
// Pending transitions
// ──────────────────────────────────────────────

/// A decided-but-unconsumed move into a state.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransition {
    pub origin: Origin,
    pub options: Option<StateOptions>,
    pub input: Option<EncodedObject>,
}

/// Unconsumed transitions into one state, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingState {
    pub state_id: String,
    pub from_event_ids: Vec<Origin>,
}

#[derive(Debug, Clone, Default)]
pub struct PendingTransitions {
    queues: BTreeMap<String, VecDeque<PendingTransition>>,
}

impl PendingTransitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state_id: &str, transition: PendingTransition) {
        self.queues
            .entry(state_id.to_string())
            .or_default()
            .push_back(transition);
    }

    /// Take the oldest transition queued for `state_id`.
    pub fn pop(&mut self, state_id: &str) -> Option<PendingTransition> {
        let queue = self.queues.get_mut(state_id)?;
        let transition = queue.pop_front();
        if queue.is_empty() {
            self.queues.remove(state_id);
        }
        transition
    }

    pub fn pending_count(&self, state_id: &str) -> usize {
        self.queues.get(state_id).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Per-state view of what is still pending, ordered by state id.
    pub fn summary(&self) -> Vec<PendingState> {
        self.queues
            .iter()
            .map(|(state_id, queue)| PendingState {
                state_id: state_id.clone(),
                from_event_ids: queue.iter().map(|t| t.origin).collect(),
            })
            .collect()
    }
}

// ──────────────────────────────────────────────
// Schedule resolution
// ──────────────────────────────────────────────

/// What a schedule id resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleTarget {
    /// Index of the logical event the task produced.
    Event(usize),
    /// A runtime task with no logical counterpart; completions are ignored.
    Untracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    Duplicate,
    Unknown,
    AlreadyCompleted,
}

#[derive(Debug, Clone, Copy)]
struct ScheduleEntry {
    target: ScheduleTarget,
    completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleTable {
    entries: HashMap<i64, ScheduleEntry>,
}

impl ScheduleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schedule_id: i64, target: ScheduleTarget) -> Result<(), ScheduleError> {
        if self.entries.contains_key(&schedule_id) {
            return Err(ScheduleError::Duplicate);
        }
        self.entries.insert(
            schedule_id,
            ScheduleEntry {
                target,
                completed: false,
            },
        );
        Ok(())
    }

    /// Resolve a completion. Each schedule id completes at most once.
    pub fn complete(&mut self, schedule_id: i64) -> Result<ScheduleTarget, ScheduleError> {
        let entry = self
            .entries
            .get_mut(&schedule_id)
            .ok_or(ScheduleError::Unknown)?;
        if entry.completed {
            return Err(ScheduleError::AlreadyCompleted);
        }
        entry.completed = true;
        Ok(entry.target)
    }

    pub fn get(&self, schedule_id: i64) -> Option<ScheduleTarget> {
        self.entries.get(&schedule_id).map(|e| e.target)
    }
}

// ──────────────────────────────────────────────
// Execution-id bridge
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// An execute step already continued this activation.
    AlreadyContinued,
}

#[derive(Debug, Clone, Copy)]
struct BridgeEntry {
    wait_index: usize,
    continued: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionBridge {
    wait_events: HashMap<String, BridgeEntry>,
}

impl ExecutionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the state execution id was already bridged.
    pub fn insert(&mut self, state_execution_id: &str, wait_index: usize) -> bool {
        if self.wait_events.contains_key(state_execution_id) {
            return false;
        }
        self.wait_events.insert(
            state_execution_id.to_string(),
            BridgeEntry {
                wait_index,
                continued: false,
            },
        );
        true
    }

    /// Claim the wait-until event for the execute step of an activation.
    /// `Ok(None)` means no wait-until step ran. Each entry is claimed once.
    pub fn take(&mut self, state_execution_id: &str) -> Result<Option<usize>, BridgeError> {
        let Some(entry) = self.wait_events.get_mut(state_execution_id) else {
            return Ok(None);
        };
        if entry.continued {
            return Err(BridgeError::AlreadyContinued);
        }
        entry.continued = true;
        Ok(Some(entry.wait_index))
    }

    pub fn get(&self, state_execution_id: &str) -> Option<usize> {
        self.wait_events
            .get(state_execution_id)
            .map(|entry| entry.wait_index)
    }
}
