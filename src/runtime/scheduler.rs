// Cooperative run-token runtime. Each coro runs on its own OS thread, but a
// single run token gates execution: at most one coro (or the driver inside
// `run`) makes progress at any instant, and the token changes hands only at
// explicit suspension points.

use std::any::Any;
use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{error, trace};

/// Identifier of a spawned coro, dense from 0 in spawn order.
pub type TaskId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Runnable,
    Running,
    Suspended,
    Finished,
}

struct SchedState {
    states: Vec<TaskState>,
    ready: VecDeque<TaskId>,
    /// Current holder of the run token. `None` means the driver may hand it
    /// to the next runnable coro.
    running: Option<TaskId>,
    /// Coros spawned but not yet finished.
    live: usize,
    panics: Vec<Box<dyn Any + Send>>,
}

/// Cooperative scheduler for the bus's coros.
///
/// Satisfies the contract blocking bus operations rely on: a coro can ask
/// who it is ([`Scheduler::current`]), park itself
/// ([`Scheduler::suspend_current`]), and mark another coro runnable
/// ([`Scheduler::wake`]). Waking never transfers a resource; a woken coro
/// re-checks its condition when it next holds the run token.
pub struct Scheduler {
    state: Mutex<SchedState>,
    turn: Condvar,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

thread_local! {
    static CURRENT_TASK: Cell<Option<TaskId>> = const { Cell::new(None) };
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SchedState {
                states: Vec::new(),
                ready: VecDeque::new(),
                running: None,
                live: 0,
                panics: Vec::new(),
            }),
            turn: Condvar::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn a coro. It is runnable immediately but does not execute until
    /// the driver hands it the run token.
    pub fn spawn<F>(self: &Arc<Self>, f: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = {
            let mut st = self.state.lock();
            let id = st.states.len() as TaskId;
            st.states.push(TaskState::Runnable);
            st.ready.push_back(id);
            st.live += 1;
            id
        };
        trace!(task = id, "spawn");
        let sched = Arc::clone(self);
        let worker = thread::Builder::new()
            .name(format!("coro-{id}"))
            .spawn(move || {
                CURRENT_TASK.with(|cur| cur.set(Some(id)));
                sched.wait_for_turn(id);
                let outcome = panic::catch_unwind(AssertUnwindSafe(f));
                sched.finish(id, outcome.err());
            })
            .expect("failed to spawn coro worker thread");
        self.workers.lock().push(worker);
        id
    }

    /// Drive runnable coros in FIFO order until every spawned coro has
    /// finished, then join their worker threads. Re-raises the first coro
    /// panic, if any.
    ///
    /// Panics with a diagnostic if every remaining coro is suspended and
    /// nothing is runnable, rather than hanging.
    pub fn run(&self) {
        loop {
            let mut st = self.state.lock();
            if st.live == 0 {
                break;
            }
            match st.ready.pop_front() {
                Some(id) => {
                    // A stale queue entry (coro already ran or finished
                    // through another wake path) grants nothing.
                    if st.states[id as usize] != TaskState::Runnable {
                        continue;
                    }
                    st.running = Some(id);
                    self.turn.notify_all();
                    while st.running.is_some() {
                        self.turn.wait(&mut st);
                    }
                }
                None => {
                    if !st.panics.is_empty() {
                        let payload = st.panics.remove(0);
                        drop(st);
                        panic::resume_unwind(payload);
                    }
                    let stalled = st
                        .states
                        .iter()
                        .filter(|s| **s == TaskState::Suspended)
                        .count();
                    error!(stalled, "scheduler stalled");
                    panic!("scheduler stalled: {stalled} coro(s) suspended with nothing runnable");
                }
            }
        }
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            let _ = worker.join();
        }
        let mut st = self.state.lock();
        if !st.panics.is_empty() {
            let payload = st.panics.remove(0);
            drop(st);
            panic::resume_unwind(payload);
        }
    }

    /// Id of the calling coro; `None` on the driver or any foreign thread.
    pub fn current(&self) -> Option<TaskId> {
        CURRENT_TASK.with(|cur| cur.get())
    }

    /// Park the calling coro and hand the run token back to the driver.
    /// Returns when another coro (or a channel close) wakes this one and
    /// the driver grants it the token again.
    pub fn suspend_current(&self) {
        let id = self
            .current()
            .expect("suspend_current called outside of a coro");
        let mut st = self.state.lock();
        st.states[id as usize] = TaskState::Suspended;
        st.running = None;
        self.turn.notify_all();
        while st.running != Some(id) {
            self.turn.wait(&mut st);
        }
        st.states[id as usize] = TaskState::Running;
    }

    /// Mark a suspended coro runnable. Does not run it and does not
    /// transfer any resource. No-op on runnable, running, or finished
    /// coros, and on ids this scheduler never issued.
    pub fn wake(&self, id: TaskId) {
        let mut st = self.state.lock();
        if st.states.get(id as usize) == Some(&TaskState::Suspended) {
            st.states[id as usize] = TaskState::Runnable;
            st.ready.push_back(id);
            trace!(task = id, "wake");
        }
    }

    /// Requeue the calling coro behind every currently runnable one.
    pub fn yield_now(&self) {
        let id = self.current().expect("yield_now called outside of a coro");
        let mut st = self.state.lock();
        st.states[id as usize] = TaskState::Runnable;
        st.ready.push_back(id);
        st.running = None;
        self.turn.notify_all();
        while st.running != Some(id) {
            self.turn.wait(&mut st);
        }
        st.states[id as usize] = TaskState::Running;
    }

    /// Number of spawned coros that have not finished.
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    /// Number of coros currently queued for the run token.
    pub fn runnable(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Number of coros parked in a suspend call.
    pub fn suspended(&self) -> usize {
        self.state
            .lock()
            .states
            .iter()
            .filter(|s| **s == TaskState::Suspended)
            .count()
    }

    fn wait_for_turn(&self, id: TaskId) {
        let mut st = self.state.lock();
        while st.running != Some(id) {
            self.turn.wait(&mut st);
        }
        st.states[id as usize] = TaskState::Running;
    }

    fn finish(&self, id: TaskId, panic_payload: Option<Box<dyn Any + Send>>) {
        let mut st = self.state.lock();
        st.states[id as usize] = TaskState::Finished;
        st.live -= 1;
        st.running = None;
        if let Some(payload) = panic_payload {
            st.panics.push(payload);
        }
        self.turn.notify_all();
        trace!(task = id, "finish");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
