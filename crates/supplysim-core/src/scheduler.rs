//! One-shot tasks keyed by the tick instant they are due at.
//!
//! The engine drains the scheduler after every tick: every task whose
//! instant is at or before the current game time runs, oldest instant
//! first and, within an instant, in registration order. Nothing is ever
//! cancelled; a task whose subject has since changed decides for itself
//! whether it still has work to do.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use supplysim_types::TickInstant;

/// A serialized scheduler entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEntry<T> {
    /// When the tasks are due.
    pub at: TickInstant,
    /// Tasks in registration order.
    pub tasks: Vec<T>,
}

/// Pending tasks ordered by due instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Vec<ScheduledEntry<T>>",
    into = "Vec<ScheduledEntry<T>>",
    bound(
        serialize = "T: Clone + Serialize",
        deserialize = "T: Deserialize<'de>"
    )
)]
pub struct Scheduler<T> {
    queue: BTreeMap<TickInstant, Vec<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            queue: BTreeMap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task` to run once the clock reaches `at`.
    pub fn schedule(&mut self, at: TickInstant, task: T) {
        self.queue.entry(at).or_default().push(task);
    }

    /// Remove and return every task due at or before `now`.
    pub fn drain_due(&mut self, now: TickInstant) -> Vec<T> {
        let due: Vec<TickInstant> = self.queue.range(..=now).map(|(at, _)| *at).collect();
        let mut tasks = Vec::new();
        for at in due {
            if let Some(batch) = self.queue.remove(&at) {
                tasks.extend(batch);
            }
        }
        tasks
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.queue.values().map(Vec::len).sum()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The earliest pending instant.
    pub fn next_due(&self) -> Option<TickInstant> {
        self.queue.keys().next().copied()
    }

    /// Pending tasks with their instants, in drain order.
    pub fn pending(&self) -> impl Iterator<Item = (TickInstant, &T)> {
        self.queue
            .iter()
            .flat_map(|(at, tasks)| tasks.iter().map(move |task| (*at, task)))
    }
}

impl<T> From<Vec<ScheduledEntry<T>>> for Scheduler<T> {
    fn from(entries: Vec<ScheduledEntry<T>>) -> Self {
        let mut scheduler = Self::new();
        for entry in entries {
            scheduler.queue.entry(entry.at).or_default().extend(entry.tasks);
        }
        scheduler
    }
}

impl<T> From<Scheduler<T>> for Vec<ScheduledEntry<T>> {
    fn from(scheduler: Scheduler<T>) -> Self {
        scheduler
            .queue
            .into_iter()
            .map(|(at, tasks)| ScheduledEntry { at, tasks })
            .collect()
    }
}
