use super::{Bus, ChannelId};

/// Read-only accessors for tests and diagnostics. None of these touch
/// waiter queues or wake anything.
impl Bus {
    /// Buffered message count, or `None` for a dead handle.
    pub fn channel_len(&self, id: ChannelId) -> Option<usize> {
        self.slots.lock().channel(id).map(|ch| ch.data.len())
    }

    /// Capacity fixed at open time, or `None` for a dead handle.
    pub fn channel_capacity(&self, id: ChannelId) -> Option<usize> {
        self.slots.lock().channel(id).map(|ch| ch.capacity)
    }

    /// Number of live channels in the table.
    pub fn live_channels(&self) -> usize {
        self.slots.lock().channels.iter().flatten().count()
    }

    /// Number of coros suspended waiting to send on `id`.
    pub fn send_waiters(&self, id: ChannelId) -> usize {
        self.slots
            .lock()
            .channel(id)
            .map(|ch| ch.send_waiters.len())
            .unwrap_or(0)
    }

    /// Number of coros suspended waiting to receive on `id`.
    pub fn recv_waiters(&self, id: ChannelId) -> usize {
        self.slots
            .lock()
            .channel(id)
            .map(|ch| ch.recv_waiters.len())
            .unwrap_or(0)
    }

    /// True when either waiter queue of `id` is non-empty.
    pub fn has_waiters(&self, id: ChannelId) -> bool {
        self.slots
            .lock()
            .channel(id)
            .map(|ch| !ch.send_waiters.is_empty() || !ch.recv_waiters.is_empty())
            .unwrap_or(false)
    }
}
