use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskId};

/// Heap entry ordered by `(due_date, id)`.
#[derive(Debug, Clone)]
struct Pending(Task);

impl Pending {
    fn key(&self) -> (chrono::NaiveDate, TaskId) {
        (self.0.due_date, self.0.id)
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Tasks that still need hours placed, earliest due first.
///
/// Ties on the due date pop in id order, and ids are handed out in
/// creation order, so equal-due tasks keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct Backlog {
    heap: BinaryHeap<Reverse<Pending>>,
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.heap.push(Reverse(Pending(task)));
    }

    /// Removes the earliest-due task.
    pub fn pop(&mut self) -> Option<Task> {
        self.heap.pop().map(|Reverse(Pending(t))| t)
    }

    pub fn peek(&self) -> Option<&Task> {
        self.heap.peek().map(|Reverse(Pending(t))| t)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.heap.iter().any(|Reverse(Pending(t))| t.id == id)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.heap.iter().map(|Reverse(Pending(t))| t).find(|t| t.id == id)
    }

    /// Takes a task out regardless of its position.
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        if !self.contains(id) {
            return None;
        }
        let mut found = None;
        let rest: Vec<Reverse<Pending>> = std::mem::take(&mut self.heap)
            .into_iter()
            .filter_map(|Reverse(Pending(t))| {
                if t.id == id {
                    found = Some(t);
                    None
                } else {
                    Some(Reverse(Pending(t)))
                }
            })
            .collect();
        self.heap = rest.into();
        found
    }

    /// Edits a task in place. The key may change, so the heap is rebuilt.
    pub fn update<F>(&mut self, id: TaskId, f: F) -> bool
    where
        F: FnOnce(&mut Task),
    {
        match self.remove(id) {
            Some(mut task) => {
                f(&mut task);
                self.push(task);
                true
            }
            None => false,
        }
    }

    /// Drains every task, clears its per-build fields and reinserts it.
    pub fn reset(&mut self) {
        let tasks: Vec<Task> = self.drain_sorted();
        for mut task in tasks {
            task.reset();
            self.push(task);
        }
    }

    pub fn drain_sorted(&mut self) -> Vec<Task> {
        let mut out = Vec::with_capacity(self.len());
        while let Some(t) = self.pop() {
            out.push(t);
        }
        out
    }

    /// Tasks in pop order, without consuming the backlog.
    pub fn sorted(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.heap.iter().map(|Reverse(Pending(t))| t).collect();
        tasks.sort_by_key(|t| (t.due_date, t.id));
        tasks
    }
}

impl FromIterator<Task> for Backlog {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        let mut backlog = Backlog::new();
        for t in iter {
            backlog.push(t);
        }
        backlog
    }
}

/// Why a task left the backlog.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveReason {
    /// Every hour was placed before the due date.
    Allocated,
    /// The deadline could not be met; placed hours are overflow-flagged.
    Infeasible,
    /// The due date had passed before any hours were placed.
    Expired,
}

impl ArchiveReason {
    /// Outcomes of a build that the next build recomputes.
    pub fn is_build_outcome(&self) -> bool {
        matches!(self, ArchiveReason::Allocated | ArchiveReason::Infeasible)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveReason::Allocated => "Scheduled",
            ArchiveReason::Infeasible => "Infeasible",
            ArchiveReason::Expired => "Expired",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArchivedTask {
    pub task: Task,
    pub reason: ArchiveReason,
}

/// Tasks removed from active scheduling.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    entries: Vec<ArchivedTask>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task, reason: ArchiveReason) {
        self.entries.push(ArchivedTask { task, reason });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&ArchivedTask> {
        self.entries.iter().find(|e| e.task.id == id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut ArchivedTask> {
        self.entries.iter_mut().find(|e| e.task.id == id)
    }

    pub fn remove(&mut self, id: TaskId) -> Option<ArchivedTask> {
        let idx = self.entries.iter().position(|e| e.task.id == id)?;
        Some(self.entries.remove(idx))
    }

    /// Removes and returns every entry matching `pred`, keeping the rest in order.
    pub fn take_where<F>(&mut self, mut pred: F) -> Vec<ArchivedTask>
    where
        F: FnMut(&ArchivedTask) -> bool,
    {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| pred(e));
        self.entries = kept;
        taken
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchivedTask> {
        self.entries.iter()
    }

    /// Entries ordered by due date for display.
    pub fn sorted(&self) -> Vec<&ArchivedTask> {
        let mut entries: Vec<&ArchivedTask> = self.entries.iter().collect();
        entries.sort_by_key(|e| (e.task.due_date, e.task.id));
        entries
    }
}

impl FromIterator<ArchivedTask> for Archive {
    fn from_iter<I: IntoIterator<Item = ArchivedTask>>(iter: I) -> Self {
        Archive { entries: iter.into_iter().collect() }
    }
}
