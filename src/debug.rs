use std::fmt;

use crate::bus::Bus;
use crate::runtime::Scheduler;

/// Debug formatter for [`Bus`]: table size, live channel count, and the
/// per-slot generation counters. Buffer contents stay opaque.
pub fn debug_bus(bus: &Bus, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let slots = bus.slots.lock();
    f.debug_struct("Bus")
        .field("slots", &slots.channels.len())
        .field("live", &slots.channels.iter().flatten().count())
        .field("generations", &slots.generations)
        .finish_non_exhaustive()
}

/// Debug formatter for [`Scheduler`]: coro counts by state.
pub fn debug_scheduler(sched: &Scheduler, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Scheduler")
        .field("live", &sched.live())
        .field("runnable", &sched.runnable())
        .field("suspended", &sched.suspended())
        .finish_non_exhaustive()
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_bus(self, f)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_scheduler(self, f)
    }
}
