mod channel;
mod getters;
mod recv;
mod send;
mod table;
mod wait_queue;

#[cfg(feature = "batch")]
mod batch;
#[cfg(feature = "broadcast")]
mod broadcast;

pub use table::{Bus, ChannelId};

pub(crate) use channel::Channel;
pub(crate) use wait_queue::WaitQueue;
