//! Deadline-ordered task queue.
//!
//! The queue is not synchronised: each loop keeps it inside its own state
//! mutex and performs every mutation under that lock.

use crate::task::{SharedTask, TaskHandle};
use crate::time::Timestamp;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ordered multiset of pending tasks.
///
/// Tasks come out by ascending `next_call`; ties come out in insertion order.
/// Nothing but [`TaskQueue::pop_task`] removes a task: cancellation mutates
/// the task in place and leaves it queued.
pub trait TaskQueue: Send {
    /// Inserts `task` in deadline order and returns a handle observing it.
    fn add_task(&mut self, task: SharedTask) -> TaskHandle;

    /// Removes and returns the earliest task, or `None` if the queue is empty.
    fn pop_task(&mut self) -> Option<SharedTask>;

    /// Deadline of the earliest task, or `None` if the queue is empty.
    fn next_task_call_time(&self) -> Option<Timestamp>;

    /// Number of queued tasks, cancelled ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Heap entry. The deadline is captured at insertion so ordering never needs
/// to lock the task itself.
struct Entry {
    next_call: Timestamp,
    seq: u64,
    task: SharedTask,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.next_call == other.next_call && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: earliest deadline, then lowest sequence, first.
        match other.next_call.cmp(&self.next_call) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ordering => ordering,
        }
    }
}

/// [`TaskQueue`] backed by a binary heap.
///
/// `add_task` and `pop_task` are O(log n); `next_task_call_time` is O(1).
#[derive(Default)]
pub struct PriorityTaskQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl PriorityTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskQueue for PriorityTaskQueue {
    fn add_task(&mut self, task: SharedTask) -> TaskHandle {
        let handle = task.handle();
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        self.heap.push(Entry {
            next_call: task.next_call(),
            seq,
            task,
        });

        handle
    }

    fn pop_task(&mut self) -> Option<SharedTask> {
        self.heap.pop().map(|entry| entry.task)
    }

    fn next_task_call_time(&self) -> Option<Timestamp> {
        self.heap.peek().map(|entry| entry.next_call)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

impl std::fmt::Debug for PriorityTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityTaskQueue")
            .field("len", &self.heap.len())
            .field("next_call", &self.next_task_call_time())
            .finish()
    }
}
