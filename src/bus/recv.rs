use super::table::Side;
use super::{Bus, ChannelId};
use crate::error::BusError;

impl Bus {
    /// Pop the head of the FIFO without suspending.
    ///
    /// # Returns
    /// * `Ok(value)` on success; the longest-waiting sender, if any, is
    ///   marked runnable.
    /// * `Err(BusError::NoChannel)` for a dead handle.
    /// * `Err(BusError::WouldBlock)` when the channel is empty.
    pub fn try_recv(&self, id: ChannelId) -> Result<u32, BusError> {
        let mut slots = self.slots.lock();
        let channel = slots.channel_mut(id).ok_or(BusError::NoChannel)?;
        let Some(value) = channel.data.pop_front() else {
            return Err(BusError::WouldBlock);
        };
        channel.send_waiters.wake_one(&self.sched);
        Ok(value)
    }

    /// Pop the head of the FIFO, suspending while the channel is empty.
    ///
    /// Fails with [`BusError::NoChannel`] if the handle is invalid or the
    /// channel is closed while this coro waits.
    pub fn recv(&self, id: ChannelId) -> Result<u32, BusError> {
        loop {
            match self.try_recv(id) {
                Err(BusError::WouldBlock) => {}
                done => return done,
            }
            self.wait_on(id, Side::Recv)?;
        }
    }
}
