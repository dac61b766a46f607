use super::table::Side;
use super::{Bus, ChannelId};
use crate::error::BusError;

impl Bus {
    /// Append as many leading elements of `values` as currently fit.
    ///
    /// A partial write is success, not failure: the count is returned and
    /// the caller decides whether to call again. One receiver is woken per
    /// value appended. An empty slice returns 0 without examining the
    /// handle.
    ///
    /// # Returns
    /// * `Ok(n)` with `1 <= n <= values.len()` on any progress, `Ok(0)`
    ///   for an empty slice.
    /// * `Err(BusError::NoChannel)` for a dead handle.
    /// * `Err(BusError::WouldBlock)` when the channel has no free space.
    pub fn try_send_v(&self, id: ChannelId, values: &[u32]) -> Result<usize, BusError> {
        if values.is_empty() {
            return Ok(0);
        }
        let mut slots = self.slots.lock();
        let channel = slots.channel_mut(id).ok_or(BusError::NoChannel)?;
        let free = channel.free_space();
        if free == 0 {
            return Err(BusError::WouldBlock);
        }
        let count = values.len().min(free);
        channel.data.extend(values[..count].iter().copied());
        channel.recv_waiters.wake_n(&self.sched, count);
        Ok(count)
    }

    /// Append a batch, suspending only while the channel has no free space
    /// at all. Returns the (possibly partial) count written.
    pub fn send_v(&self, id: ChannelId, values: &[u32]) -> Result<usize, BusError> {
        if values.is_empty() {
            return Ok(0);
        }
        loop {
            match self.try_send_v(id, values) {
                Err(BusError::WouldBlock) => {}
                done => return done,
            }
            self.wait_on(id, Side::Send)?;
        }
    }

    /// Drain up to `buf.len()` buffered values into `buf`, preserving FIFO
    /// order. One sender is woken per value drained. An empty buffer
    /// returns 0 without examining the handle.
    ///
    /// # Returns
    /// * `Ok(n)` with the number of values written to `buf[..n]`.
    /// * `Err(BusError::NoChannel)` for a dead handle.
    /// * `Err(BusError::WouldBlock)` when the channel is empty.
    pub fn try_recv_v(&self, id: ChannelId, buf: &mut [u32]) -> Result<usize, BusError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut slots = self.slots.lock();
        let channel = slots.channel_mut(id).ok_or(BusError::NoChannel)?;
        if channel.data.is_empty() {
            return Err(BusError::WouldBlock);
        }
        let count = buf.len().min(channel.data.len());
        for (slot, value) in buf.iter_mut().zip(channel.data.drain(..count)) {
            *slot = value;
        }
        channel.send_waiters.wake_n(&self.sched, count);
        Ok(count)
    }

    /// Drain a batch, suspending while the channel is empty. Returns the
    /// count read, at least 1 for a non-empty `buf`.
    pub fn recv_v(&self, id: ChannelId, buf: &mut [u32]) -> Result<usize, BusError> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.try_recv_v(id, buf) {
                Err(BusError::WouldBlock) => {}
                done => return done,
            }
            self.wait_on(id, Side::Recv)?;
        }
    }
}
