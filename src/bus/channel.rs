use std::collections::VecDeque;

use super::WaitQueue;

/// A single bounded channel: the message FIFO plus its two waiter queues.
///
/// Pure data; behavior lives in the bus operations, which maintain these
/// invariants: `data.len() <= capacity`, a non-full channel has no send
/// waiters, and a non-empty channel has no recv waiters.
pub(crate) struct Channel {
    /// Fixed at open time. A zero-capacity channel rejects every
    /// non-blocking send.
    pub(crate) capacity: usize,
    pub(crate) data: VecDeque<u32>,
    /// Coros blocked because the channel was full.
    pub(crate) send_waiters: WaitQueue,
    /// Coros blocked because the channel was empty.
    pub(crate) recv_waiters: WaitQueue,
}

impl Channel {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            data: VecDeque::new(),
            send_waiters: WaitQueue::default(),
            recv_waiters: WaitQueue::default(),
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub(crate) fn free_space(&self) -> usize {
        self.capacity - self.data.len()
    }
}
