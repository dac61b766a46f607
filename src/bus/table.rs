use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::Channel;
use crate::error::BusError;
use crate::runtime::Scheduler;

/// Index of a channel slot in the bus table. The index alone is reusable;
/// `(index, generation)` uniquely identifies one occupant of the slot for
/// the lifetime of the process.
pub type ChannelId = usize;

/// The channel table: live slots, tombstones awaiting reuse, and one
/// generation counter per slot.
pub(crate) struct Slots {
    pub(crate) channels: Vec<Option<Channel>>,
    pub(crate) generations: Vec<u64>,
}

impl Slots {
    pub(crate) fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(id).and_then(|slot| slot.as_mut())
    }

    /// Current generation of a slot regardless of liveness; 0 for an index
    /// that has never been allocated.
    pub(crate) fn generation(&self, id: ChannelId) -> u64 {
        self.generations.get(id).copied().unwrap_or(0)
    }

    /// True when the slot is live and still holds the occupant the caller
    /// snapshotted before suspending.
    pub(crate) fn is_current(&self, id: ChannelId, generation: u64) -> bool {
        self.channel(id).is_some() && self.generation(id) == generation
    }
}

/// Which side of a channel a coro waits on.
#[derive(Clone, Copy)]
pub(crate) enum Side {
    Send,
    Recv,
}

/// A bounded multi-channel message bus for coros scheduled on one
/// [`Scheduler`].
///
/// Channels are addressed by [`ChannelId`] and sized independently.
/// Blocking operations suspend the calling coro through the scheduler and
/// re-check channel state every time they resume; non-blocking variants
/// report [`BusError::WouldBlock`] instead.
pub struct Bus {
    pub(crate) sched: Arc<Scheduler>,
    pub(crate) slots: Mutex<Slots>,
}

impl Bus {
    pub fn new(sched: Arc<Scheduler>) -> Self {
        Self {
            sched,
            slots: Mutex::new(Slots {
                channels: Vec::new(),
                generations: Vec::new(),
            }),
        }
    }

    /// Open a channel with the given capacity, reusing the lowest-indexed
    /// free slot if any, and return its handle.
    ///
    /// A reused slot keeps the generation its close already bumped; a
    /// freshly appended slot starts at generation 1.
    pub fn open(&self, capacity: usize) -> ChannelId {
        let mut slots = self.slots.lock();
        let id = match slots.channels.iter().position(|slot| slot.is_none()) {
            Some(free) => {
                slots.channels[free] = Some(Channel::new(capacity));
                free
            }
            None => {
                slots.channels.push(Some(Channel::new(capacity)));
                slots.generations.push(1);
                slots.channels.len() - 1
            }
        };
        debug!(channel = id, generation = slots.generations[id], capacity, "open");
        id
    }

    /// Close a channel: tombstone the slot, bump its generation, then wake
    /// every waiter so each can observe the handle is gone. Buffered
    /// messages are discarded. No-op on a dead handle.
    pub fn close(&self, id: ChannelId) {
        let mut slots = self.slots.lock();
        let Some(mut channel) = slots.channels.get_mut(id).and_then(|slot| slot.take()) else {
            return;
        };
        slots.generations[id] += 1;
        debug!(channel = id, generation = slots.generations[id], "close");
        channel.send_waiters.wake_all(&self.sched);
        channel.recv_waiters.wake_all(&self.sched);
    }

    /// Generation currently recorded for `id`, regardless of liveness.
    pub fn generation(&self, id: ChannelId) -> u64 {
        self.slots.lock().generation(id)
    }

    /// Queue the calling coro on one side of `id`, suspend, and on
    /// resumption unlink it and verify the channel survived.
    ///
    /// Fails with [`BusError::NoChannel`] when the handle is already dead,
    /// or when the slot was closed (and possibly reused by a new channel)
    /// while the coro was suspended.
    pub(crate) fn wait_on(&self, id: ChannelId, side: Side) -> Result<(), BusError> {
        let me = self
            .sched
            .current()
            .expect("blocking bus operation called outside of a coro");
        let generation = {
            let mut slots = self.slots.lock();
            let generation = slots.generation(id);
            let Some(channel) = slots.channel_mut(id) else {
                return Err(BusError::NoChannel);
            };
            match side {
                Side::Send => channel.send_waiters.push(me),
                Side::Recv => channel.recv_waiters.push(me),
            }
            generation
        };
        self.sched.suspend_current();
        let mut slots = self.slots.lock();
        if !slots.is_current(id, generation) {
            return Err(BusError::NoChannel);
        }
        if let Some(channel) = slots.channel_mut(id) {
            match side {
                Side::Send => channel.send_waiters.remove(me),
                Side::Recv => channel.recv_waiters.remove(me),
            }
        }
        Ok(())
    }
}

impl Drop for Bus {
    fn drop(&mut self) {
        let slots = self.slots.get_mut();
        for (id, slot) in slots.channels.iter().enumerate() {
            if let Some(channel) = slot {
                assert!(
                    channel.send_waiters.is_empty() && channel.recv_waiters.is_empty(),
                    "bus dropped while channel {id} still has suspended waiters",
                );
            }
        }
    }
}
