use std::sync::Arc;

use coopbus::{Bus, Scheduler};

// Sent on the results channel after the last real value.
const DONE: u32 = u32::MAX;

fn main() {
    let sched = Arc::new(Scheduler::new());
    let bus = Arc::new(Bus::new(Arc::clone(&sched)));

    let jobs = bus.open(4);
    let results = bus.open(4);

    let producer_bus = Arc::clone(&bus);
    sched.spawn(move || {
        for value in 1..=10 {
            producer_bus.send(jobs, value).expect("send job");
        }
        producer_bus.send(jobs, DONE).expect("send end marker");
        println!("producer: 10 jobs queued");
    });

    let worker_bus = Arc::clone(&bus);
    sched.spawn(move || {
        loop {
            let value = worker_bus.recv(jobs).expect("recv job");
            if value == DONE {
                worker_bus.send(results, DONE).expect("forward end marker");
                break;
            }
            worker_bus.send(results, value * value).expect("send result");
        }
        println!("worker: all jobs squared");
    });

    let collector_bus = Arc::clone(&bus);
    sched.spawn(move || {
        loop {
            let value = collector_bus.recv(results).expect("recv result");
            if value == DONE {
                break;
            }
            println!("result: {value}");
        }
    });

    sched.run();

    bus.close(jobs);
    bus.close(results);
    println!("bus drained, {} live channels", bus.live_channels());
}
