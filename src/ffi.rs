use std::cell::Cell;
use std::slice;
use std::sync::{Arc, OnceLock};

use crate::bus::{Bus, ChannelId};
use crate::error::{BusError, ErrorCode};
use crate::runtime::Scheduler;

/// Handle to a bus instance (opaque pointer). Owned by the caller; created
/// with [`coopbus_new`] and released with [`coopbus_delete`].
pub struct BusHandle {
    inner: Bus,
}

static RUNTIME: OnceLock<Arc<Scheduler>> = OnceLock::new();

/// The process-wide runtime every FFI bus is bound to. Blocking entry
/// points must be called from coros spawned here; hosts embedding the
/// crate spawn their coros through this handle.
pub fn runtime() -> Arc<Scheduler> {
    Arc::clone(RUNTIME.get_or_init(|| Arc::new(Scheduler::new())))
}

thread_local! {
    static LAST_ERROR: Cell<ErrorCode> = const { Cell::new(ErrorCode::None) };
}

/// Record the terminal code for one entry point. Exactly one write per
/// call: success clears the slot, failure stores the specific code.
fn record<T>(result: Result<T, BusError>) -> Option<T> {
    match result {
        Ok(value) => {
            LAST_ERROR.with(|code| code.set(ErrorCode::None));
            Some(value)
        }
        Err(err) => {
            LAST_ERROR.with(|code| code.set(err.code()));
            None
        }
    }
}

fn finish_status(result: Result<(), BusError>) -> i32 {
    match record(result) {
        Some(()) => 0,
        None => -1,
    }
}

fn finish_count(result: Result<usize, BusError>) -> i32 {
    match record(result) {
        Some(count) => count as i32,
        None => -1,
    }
}

fn fail(code: ErrorCode) -> i32 {
    LAST_ERROR.with(|slot| slot.set(code));
    -1
}

fn clear() {
    LAST_ERROR.with(|slot| slot.set(ErrorCode::None));
}

/// Map a C channel handle to a table index. Negative handles resolve like
/// any other dead handle.
fn channel_id(handle: i32) -> Result<ChannelId, BusError> {
    usize::try_from(handle).map_err(|_| BusError::NoChannel)
}

/// Error code recorded by the most recent bus call on this thread.
#[no_mangle]
pub extern "C" fn coopbus_errno() -> ErrorCode {
    LAST_ERROR.with(|code| code.get())
}

/// Overwrite the thread's last-error code.
#[no_mangle]
pub extern "C" fn coopbus_errno_set(code: ErrorCode) {
    LAST_ERROR.with(|slot| slot.set(code));
}

/// Create a bus bound to the shared process runtime.
#[no_mangle]
pub extern "C" fn coopbus_new() -> *mut BusHandle {
    clear();
    Box::into_raw(Box::new(BusHandle {
        inner: Bus::new(runtime()),
    }))
}

/// Destroy a bus. Asserts that no channel still has suspended waiters.
#[no_mangle]
pub extern "C" fn coopbus_delete(bus: *mut BusHandle) {
    if bus.is_null() {
        return;
    }
    clear();
    unsafe {
        drop(Box::from_raw(bus));
    }
}

/// Open a channel with the given capacity.
///
/// # Returns
/// * Handle `>= 0` on success, or −1 on a null bus.
#[no_mangle]
pub extern "C" fn coopbus_channel_open(bus: *mut BusHandle, capacity: usize) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    let id = bus.inner.open(capacity);
    clear();
    id as i32
}

/// Close a channel, waking every coro suspended on it. No-op on a dead
/// handle or a null bus.
#[no_mangle]
pub extern "C" fn coopbus_channel_close(bus: *mut BusHandle, channel: i32) {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return;
    };
    clear();
    if let Ok(id) = channel_id(channel) {
        bus.inner.close(id);
    }
}

/// Non-blocking send. 0 on success, −1 with the errno set otherwise.
#[no_mangle]
pub extern "C" fn coopbus_try_send(bus: *mut BusHandle, channel: i32, value: u32) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    finish_status(channel_id(channel).and_then(|id| bus.inner.try_send(id, value)))
}

/// Blocking send. Must be called from a coro spawned on [`runtime`].
/// 0 on success, −1 with `NoChannel` if the channel disappears.
#[no_mangle]
pub extern "C" fn coopbus_send(bus: *mut BusHandle, channel: i32, value: u32) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    finish_status(channel_id(channel).and_then(|id| bus.inner.send(id, value)))
}

/// Non-blocking receive into `out`. 0 on success, −1 otherwise.
#[no_mangle]
pub extern "C" fn coopbus_try_recv(bus: *mut BusHandle, channel: i32, out: *mut u32) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    if out.is_null() {
        return fail(ErrorCode::NoChannel);
    }
    match record(channel_id(channel).and_then(|id| bus.inner.try_recv(id))) {
        Some(value) => {
            unsafe { *out = value };
            0
        }
        None => -1,
    }
}

/// Blocking receive into `out`. Must be called from a coro spawned on
/// [`runtime`]. 0 on success, −1 with `NoChannel` if the channel
/// disappears.
#[no_mangle]
pub extern "C" fn coopbus_recv(bus: *mut BusHandle, channel: i32, out: *mut u32) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    if out.is_null() {
        return fail(ErrorCode::NoChannel);
    }
    match record(channel_id(channel).and_then(|id| bus.inner.recv(id))) {
        Some(value) => {
            unsafe { *out = value };
            0
        }
        None => -1,
    }
}

/// Non-blocking batched send of `count` values from `data`.
///
/// # Returns
/// * Number written (possibly less than `count`) on success; 0 when
///   `count` is 0.
/// * −1 with the errno set otherwise.
#[cfg(feature = "batch")]
#[no_mangle]
pub extern "C" fn coopbus_try_send_v(
    bus: *mut BusHandle,
    channel: i32,
    data: *const u32,
    count: u32,
) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    if count == 0 {
        clear();
        return 0;
    }
    if data.is_null() {
        return fail(ErrorCode::NoChannel);
    }
    let values = unsafe { slice::from_raw_parts(data, count as usize) };
    finish_count(channel_id(channel).and_then(|id| bus.inner.try_send_v(id, values)))
}

/// Blocking batched send. Suspends only while the channel has no free
/// space at all; a partial write is success.
#[cfg(feature = "batch")]
#[no_mangle]
pub extern "C" fn coopbus_send_v(
    bus: *mut BusHandle,
    channel: i32,
    data: *const u32,
    count: u32,
) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    if count == 0 {
        clear();
        return 0;
    }
    if data.is_null() {
        return fail(ErrorCode::NoChannel);
    }
    let values = unsafe { slice::from_raw_parts(data, count as usize) };
    finish_count(channel_id(channel).and_then(|id| bus.inner.send_v(id, values)))
}

/// Non-blocking batched receive of up to `capacity` values into `data`.
///
/// # Returns
/// * Number read on success; 0 when `capacity` is 0.
/// * −1 with the errno set otherwise.
#[cfg(feature = "batch")]
#[no_mangle]
pub extern "C" fn coopbus_try_recv_v(
    bus: *mut BusHandle,
    channel: i32,
    data: *mut u32,
    capacity: u32,
) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    if capacity == 0 {
        clear();
        return 0;
    }
    if data.is_null() {
        return fail(ErrorCode::NoChannel);
    }
    let buf = unsafe { slice::from_raw_parts_mut(data, capacity as usize) };
    finish_count(channel_id(channel).and_then(|id| bus.inner.try_recv_v(id, buf)))
}

/// Blocking batched receive. Suspends only while the channel is empty.
#[cfg(feature = "batch")]
#[no_mangle]
pub extern "C" fn coopbus_recv_v(
    bus: *mut BusHandle,
    channel: i32,
    data: *mut u32,
    capacity: u32,
) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    if capacity == 0 {
        clear();
        return 0;
    }
    if data.is_null() {
        return fail(ErrorCode::NoChannel);
    }
    let buf = unsafe { slice::from_raw_parts_mut(data, capacity as usize) };
    finish_count(channel_id(channel).and_then(|id| bus.inner.recv_v(id, buf)))
}

/// Non-blocking broadcast: append `value` to every live channel or to
/// none. 0 on success, −1 otherwise.
#[cfg(feature = "broadcast")]
#[no_mangle]
pub extern "C" fn coopbus_try_broadcast(bus: *mut BusHandle, value: u32) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    finish_status(bus.inner.try_broadcast(value))
}

/// Blocking broadcast. Must be called from a coro spawned on [`runtime`].
#[cfg(feature = "broadcast")]
#[no_mangle]
pub extern "C" fn coopbus_broadcast(bus: *mut BusHandle, value: u32) -> i32 {
    let Some(bus) = (unsafe { bus.as_ref() }) else {
        return fail(ErrorCode::NoChannel);
    };
    finish_status(bus.inner.broadcast(value))
}
