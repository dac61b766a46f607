#![cfg(feature = "batch")]

use std::sync::Arc;

use coopbus::{Bus, BusError, Scheduler};
use parking_lot::Mutex;

fn setup() -> (Arc<Scheduler>, Arc<Bus>) {
    let sched = Arc::new(Scheduler::new());
    let bus = Arc::new(Bus::new(Arc::clone(&sched)));
    (sched, bus)
}

#[test]
fn partial_write_then_full_drain() {
    let (_sched, bus) = setup();
    let ch = bus.open(4);
    assert_eq!(bus.try_send(ch, 1), Ok(()));
    assert_eq!(bus.try_send(ch, 2), Ok(()));

    // Only two of the four fit; a partial write is success.
    assert_eq!(bus.try_send_v(ch, &[3, 4, 5, 6]), Ok(2));
    assert_eq!(bus.channel_len(ch), Some(4));

    let mut buf = [0u32; 10];
    assert_eq!(bus.try_recv_v(ch, &mut buf), Ok(4));
    assert_eq!(&buf[..4], &[1, 2, 3, 4]);
    assert_eq!(bus.channel_len(ch), Some(0));
}

#[test]
fn empty_batches_complete_without_a_handle_check() {
    let (_sched, bus) = setup();
    // Handle 99 was never opened; a zero-length batch succeeds anyway.
    assert_eq!(bus.try_send_v(99, &[]), Ok(0));
    assert_eq!(bus.send_v(99, &[]), Ok(0));
    let mut empty: [u32; 0] = [];
    assert_eq!(bus.try_recv_v(99, &mut empty), Ok(0));
    assert_eq!(bus.recv_v(99, &mut empty), Ok(0));
}

#[test]
fn batch_errors_match_the_scalar_ones() {
    let (_sched, bus) = setup();
    assert_eq!(bus.try_send_v(0, &[1]), Err(BusError::NoChannel));

    let ch = bus.open(1);
    assert_eq!(bus.try_send_v(ch, &[1, 2]), Ok(1));
    assert_eq!(bus.try_send_v(ch, &[3]), Err(BusError::WouldBlock));

    let mut buf = [0u32; 4];
    assert_eq!(bus.try_recv_v(ch, &mut buf), Ok(1));
    assert_eq!(bus.try_recv_v(ch, &mut buf), Err(BusError::WouldBlock));
}

#[test]
fn bulk_send_wakes_one_receiver_per_value() {
    let (sched, bus) = setup();
    let ch = bus.open(4);
    let order: Arc<Mutex<Vec<(&str, u32)>>> = Arc::new(Mutex::new(Vec::new()));

    for name in ["a", "b", "c"] {
        let bus = Arc::clone(&bus);
        let order = Arc::clone(&order);
        sched.spawn(move || {
            let value = bus.recv(ch).expect("each receiver gets one value");
            order.lock().push((name, value));
        });
    }
    let sender_bus = Arc::clone(&bus);
    sched.spawn(move || {
        assert_eq!(sender_bus.try_send_v(ch, &[10, 20, 30]), Ok(3));
    });

    sched.run();
    assert_eq!(*order.lock(), vec![("a", 10), ("b", 20), ("c", 30)]);
}

#[test]
fn send_v_parks_only_while_the_channel_is_full() {
    let (sched, bus) = setup();
    let ch = bus.open(2);
    let batches: Arc<Mutex<Vec<Vec<u32>>>> = Arc::new(Mutex::new(Vec::new()));

    let producer_bus = Arc::clone(&bus);
    sched.spawn(move || {
        assert_eq!(producer_bus.send_v(ch, &[1, 2]), Ok(2));
        // Channel is full now; this call parks until space frees up.
        assert_eq!(producer_bus.send_v(ch, &[3, 4]), Ok(2));
    });
    let consumer_bus = Arc::clone(&bus);
    let consumer_log = Arc::clone(&batches);
    sched.spawn(move || {
        for _ in 0..2 {
            let mut buf = [0u32; 4];
            let count = consumer_bus.recv_v(ch, &mut buf).expect("recv_v");
            consumer_log.lock().push(buf[..count].to_vec());
        }
    });

    sched.run();
    assert_eq!(*batches.lock(), vec![vec![1, 2], vec![3, 4]]);
}

#[test]
fn close_fails_a_parked_batch_sender() {
    let (sched, bus) = setup();
    let ch = bus.open(1);
    let result: Arc<Mutex<Option<Result<usize, BusError>>>> = Arc::new(Mutex::new(None));

    let sender_bus = Arc::clone(&bus);
    let sender_result = Arc::clone(&result);
    sched.spawn(move || {
        assert_eq!(sender_bus.send_v(ch, &[1]), Ok(1));
        *sender_result.lock() = Some(sender_bus.send_v(ch, &[2, 3]));
    });
    let closer_bus = Arc::clone(&bus);
    sched.spawn(move || {
        closer_bus.close(ch);
    });

    sched.run();
    assert_eq!(*result.lock(), Some(Err(BusError::NoChannel)));
}

#[test]
fn recv_v_parks_until_data_arrives() {
    let (sched, bus) = setup();
    let ch = bus.open(4);
    let drained: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

    let consumer_bus = Arc::clone(&bus);
    let consumer_log = Arc::clone(&drained);
    sched.spawn(move || {
        let mut buf = [0u32; 8];
        let count = consumer_bus.recv_v(ch, &mut buf).expect("recv_v");
        consumer_log.lock().extend_from_slice(&buf[..count]);
    });
    let producer_bus = Arc::clone(&bus);
    sched.spawn(move || {
        assert_eq!(producer_bus.try_send_v(ch, &[6, 7, 8]), Ok(3));
    });

    sched.run();
    assert_eq!(*drained.lock(), vec![6, 7, 8]);
}
