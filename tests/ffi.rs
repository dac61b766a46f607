use coopbus::ffi::{self, BusHandle};
use coopbus::ErrorCode;
use parking_lot::Mutex;
use serial_test::serial;
use std::ptr;
use std::sync::Arc;

#[test]
fn open_send_recv_and_errno_discipline() {
    let bus = ffi::coopbus_new();
    assert_eq!(ffi::coopbus_errno(), ErrorCode::None);

    let ch = ffi::coopbus_channel_open(bus, 1);
    assert_eq!(ch, 0);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::None);

    let mut out = 0u32;
    assert_eq!(ffi::coopbus_try_recv(bus, ch, &mut out), -1);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::WouldBlock);

    assert_eq!(ffi::coopbus_try_send(bus, ch, 7), 0);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::None);
    assert_eq!(ffi::coopbus_try_send(bus, ch, 8), -1);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::WouldBlock);

    assert_eq!(ffi::coopbus_try_recv(bus, ch, &mut out), 0);
    assert_eq!(out, 7);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::None);

    ffi::coopbus_channel_close(bus, ch);
    assert_eq!(ffi::coopbus_try_send(bus, ch, 9), -1);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::NoChannel);

    ffi::coopbus_delete(bus);
}

#[test]
fn null_and_negative_handles_fail_cleanly() {
    assert_eq!(ffi::coopbus_try_send(ptr::null_mut(), 0, 1), -1);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::NoChannel);
    assert_eq!(ffi::coopbus_channel_open(ptr::null_mut(), 4), -1);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::NoChannel);

    let bus = ffi::coopbus_new();
    let mut out = 0u32;
    assert_eq!(ffi::coopbus_try_recv(bus, -5, &mut out), -1);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::NoChannel);
    let ch = ffi::coopbus_channel_open(bus, 1);
    assert_eq!(ffi::coopbus_try_recv(bus, ch, ptr::null_mut()), -1);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::NoChannel);
    ffi::coopbus_delete(bus);
}

#[test]
fn errno_set_round_trips() {
    ffi::coopbus_errno_set(ErrorCode::WouldBlock);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::WouldBlock);
    ffi::coopbus_errno_set(ErrorCode::None);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::None);
}

#[cfg(feature = "batch")]
#[test]
fn zero_count_batches_succeed_without_buffers() {
    let bus = ffi::coopbus_new();
    // No channel open and null data pointers: a zero count is still success.
    assert_eq!(ffi::coopbus_try_send_v(bus, 3, ptr::null(), 0), 0);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::None);
    assert_eq!(ffi::coopbus_try_recv_v(bus, 3, ptr::null_mut(), 0), 0);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::None);
    ffi::coopbus_delete(bus);
}

#[cfg(feature = "batch")]
#[test]
fn batched_calls_report_partial_counts() {
    let bus = ffi::coopbus_new();
    let ch = ffi::coopbus_channel_open(bus, 2);
    let data = [1u32, 2, 3, 4];
    assert_eq!(ffi::coopbus_try_send_v(bus, ch, data.as_ptr(), 4), 2);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::None);

    let mut out = [0u32; 4];
    assert_eq!(ffi::coopbus_try_recv_v(bus, ch, out.as_mut_ptr(), 4), 2);
    assert_eq!(&out[..2], &[1, 2]);
    ffi::coopbus_delete(bus);
}

#[cfg(feature = "broadcast")]
#[test]
fn broadcast_over_ffi_matches_the_rust_semantics() {
    let bus = ffi::coopbus_new();
    assert_eq!(ffi::coopbus_try_broadcast(bus, 1), -1);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::NoChannel);

    let a = ffi::coopbus_channel_open(bus, 1);
    let b = ffi::coopbus_channel_open(bus, 1);
    assert_eq!(ffi::coopbus_try_broadcast(bus, 6), 0);
    assert_eq!(ffi::coopbus_try_broadcast(bus, 7), -1);
    assert_eq!(ffi::coopbus_errno(), ErrorCode::WouldBlock);

    let mut out = 0u32;
    assert_eq!(ffi::coopbus_try_recv(bus, a, &mut out), 0);
    assert_eq!(out, 6);
    assert_eq!(ffi::coopbus_try_recv(bus, b, &mut out), 0);
    assert_eq!(out, 6);

    ffi::coopbus_channel_close(bus, a);
    ffi::coopbus_channel_close(bus, b);
    ffi::coopbus_delete(bus);
}

/// Raw bus pointers are not `Send`; the coro closures only ever use them
/// one at a time under the run token.
struct SharedBus(*mut BusHandle);
unsafe impl Send for SharedBus {}

#[test]
#[serial]
fn blocking_send_recv_through_the_c_api() {
    let sched = ffi::runtime();
    let bus = ffi::coopbus_new();
    let ch = ffi::coopbus_channel_open(bus, 1);
    assert!(ch >= 0);

    let sender = SharedBus(bus);
    sched.spawn(move || {
        let sender = sender;
        assert_eq!(ffi::coopbus_send(sender.0, ch, 7), 0);
        assert_eq!(ffi::coopbus_send(sender.0, ch, 8), 0);
    });

    let receiver = SharedBus(bus);
    let got: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let got_inner = Arc::clone(&got);
    sched.spawn(move || {
        let receiver = receiver;
        let mut out = 0u32;
        for _ in 0..2 {
            assert_eq!(ffi::coopbus_recv(receiver.0, ch, &mut out), 0);
            got_inner.lock().push(out);
        }
    });

    sched.run();
    assert_eq!(*got.lock(), vec![7, 8]);
    ffi::coopbus_delete(bus);
}

#[cfg(feature = "batch")]
#[test]
#[serial]
fn blocking_batched_send_through_the_c_api() {
    let sched = ffi::runtime();
    let bus = ffi::coopbus_new();
    let ch = ffi::coopbus_channel_open(bus, 2);

    let sender = SharedBus(bus);
    sched.spawn(move || {
        let sender = sender;
        let first = [1u32, 2];
        let second = [3u32, 4];
        assert_eq!(ffi::coopbus_send_v(sender.0, ch, first.as_ptr(), 2), 2);
        // Full now; parks until the receiver drains.
        assert_eq!(ffi::coopbus_send_v(sender.0, ch, second.as_ptr(), 2), 2);
    });

    let receiver = SharedBus(bus);
    let got: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let got_inner = Arc::clone(&got);
    sched.spawn(move || {
        let receiver = receiver;
        let mut out = [0u32; 4];
        for _ in 0..2 {
            let count = ffi::coopbus_recv_v(receiver.0, ch, out.as_mut_ptr(), 4);
            assert!(count > 0);
            got_inner.lock().extend_from_slice(&out[..count as usize]);
        }
    });

    sched.run();
    assert_eq!(*got.lock(), vec![1, 2, 3, 4]);
    ffi::coopbus_delete(bus);
}
