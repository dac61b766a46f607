use super::table::Side;
use super::{Bus, ChannelId};
use crate::error::BusError;

impl Bus {
    /// Push `value` without suspending.
    ///
    /// # Returns
    /// * `Ok(())` once the value sits at the tail of the FIFO; the
    ///   longest-waiting receiver, if any, is marked runnable.
    /// * `Err(BusError::NoChannel)` for a dead handle.
    /// * `Err(BusError::WouldBlock)` when the channel is full.
    pub fn try_send(&self, id: ChannelId, value: u32) -> Result<(), BusError> {
        let mut slots = self.slots.lock();
        let channel = slots.channel_mut(id).ok_or(BusError::NoChannel)?;
        if channel.is_full() {
            return Err(BusError::WouldBlock);
        }
        channel.data.push_back(value);
        channel.recv_waiters.wake_one(&self.sched);
        Ok(())
    }

    /// Push `value`, suspending while the channel is full.
    ///
    /// A wake never carries the free slot with it: the coro retries from
    /// the top and may lose the race to another sender woken in the same
    /// turn, in which case it suspends again. Fails with
    /// [`BusError::NoChannel`] if the handle is invalid or the channel is
    /// closed while this coro waits.
    pub fn send(&self, id: ChannelId, value: u32) -> Result<(), BusError> {
        loop {
            match self.try_send(id, value) {
                Err(BusError::WouldBlock) => {}
                done => return done,
            }
            self.wait_on(id, Side::Send)?;
        }
    }
}
