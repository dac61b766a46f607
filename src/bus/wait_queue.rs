use std::collections::VecDeque;

use crate::runtime::{Scheduler, TaskId};

/// FIFO queue of coros suspended on one side of a channel.
///
/// Wakers pop an id before waking it, so a normally-woken coro is already
/// unlinked by the time it resumes. A coro resumed through any other path
/// finds its id still queued and removes it itself ([`WaitQueue::remove`]).
#[derive(Default)]
pub(crate) struct WaitQueue {
    waiters: VecDeque<TaskId>,
}

impl WaitQueue {
    /// Append the coro to the tail. The caller suspends right after.
    pub(crate) fn push(&mut self, task: TaskId) {
        self.waiters.push_back(task);
    }

    /// Pop the longest-waiting coro and mark it runnable. Waking only
    /// schedules; the coro re-checks the channel when it actually runs.
    pub(crate) fn wake_one(&mut self, sched: &Scheduler) {
        if let Some(task) = self.waiters.pop_front() {
            sched.wake(task);
        }
    }

    /// [`WaitQueue::wake_one`] up to `count` times or until empty.
    pub(crate) fn wake_n(&mut self, sched: &Scheduler, count: usize) {
        for _ in 0..count {
            if self.waiters.is_empty() {
                return;
            }
            self.wake_one(sched);
        }
    }

    /// Wake every queued coro. Used when the channel goes away, so each
    /// waiter can observe the handle is dead.
    pub(crate) fn wake_all(&mut self, sched: &Scheduler) {
        while !self.waiters.is_empty() {
            self.wake_one(sched);
        }
    }

    /// Unlink `task` if it is still queued.
    pub(crate) fn remove(&mut self, task: TaskId) {
        if let Some(pos) = self.waiters.iter().position(|&t| t == task) {
            self.waiters.remove(pos);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }
}
