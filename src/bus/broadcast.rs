use super::table::Slots;
use super::{Bus, ChannelId};
use crate::error::BusError;

/// Outcome of one pass over the table.
enum Scan {
    /// Every live channel had room; the value was appended everywhere.
    Published,
    /// At least one live channel is full. Index and generation of the
    /// first one found, so the blocked coro can unlink itself later.
    Blocked(ChannelId, u64),
}

impl Bus {
    /// Append `value` to every live channel, or to none at all.
    ///
    /// All-or-none: a single full channel refuses the whole broadcast,
    /// which keeps per-channel FIFO order intact for receivers. On success
    /// one receiver is woken per channel, and from any single channel's
    /// perspective the write is indistinguishable from an ordinary send.
    ///
    /// # Returns
    /// * `Ok(())` on success.
    /// * `Err(BusError::NoChannel)` when the bus has no live channels.
    /// * `Err(BusError::WouldBlock)` when some live channel is full.
    pub fn try_broadcast(&self, value: u32) -> Result<(), BusError> {
        let mut slots = self.slots.lock();
        match self.scan_and_publish(&mut slots, value)? {
            Scan::Published => Ok(()),
            Scan::Blocked(..) => Err(BusError::WouldBlock),
        }
    }

    /// Broadcast, suspending on whichever channel currently blocks it.
    ///
    /// The blocker may be closed while this coro waits, and a different
    /// channel may be full by the time it runs again; the scan simply
    /// restarts and handles every such transition. The write itself always
    /// happens in one non-suspending pass.
    pub fn broadcast(&self, value: u32) -> Result<(), BusError> {
        let me = self
            .sched
            .current()
            .expect("blocking bus operation called outside of a coro");
        loop {
            let (blocker, generation) = {
                let mut slots = self.slots.lock();
                match self.scan_and_publish(&mut slots, value)? {
                    Scan::Published => return Ok(()),
                    Scan::Blocked(id, generation) => {
                        if let Some(channel) = slots.channel_mut(id) {
                            channel.send_waiters.push(me);
                        }
                        (id, generation)
                    }
                }
            };
            self.sched.suspend_current();
            // Unlink only from the same occupant; a reused slot's queue
            // never held this coro.
            let mut slots = self.slots.lock();
            if slots.is_current(blocker, generation) {
                if let Some(channel) = slots.channel_mut(blocker) {
                    channel.send_waiters.remove(me);
                }
            }
        }
    }

    /// One pass over the table: fail on an empty bus, report the first
    /// full live channel, or append `value` everywhere and wake one
    /// receiver per channel.
    fn scan_and_publish(&self, slots: &mut Slots, value: u32) -> Result<Scan, BusError> {
        let mut live = false;
        let mut blocker = None;
        for (id, slot) in slots.channels.iter().enumerate() {
            let Some(channel) = slot else { continue };
            live = true;
            if channel.is_full() {
                blocker = Some(id);
                break;
            }
        }
        if !live {
            return Err(BusError::NoChannel);
        }
        if let Some(id) = blocker {
            return Ok(Scan::Blocked(id, slots.generation(id)));
        }
        for slot in slots.channels.iter_mut() {
            if let Some(channel) = slot {
                channel.data.push_back(value);
                channel.recv_waiters.wake_one(&self.sched);
            }
        }
        Ok(Scan::Published)
    }
}
