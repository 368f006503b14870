//! A handful of producers feeding one blocking consumer.
//!
//! Run with `RUST_LOG=debug` to see pool activity.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rif::Val;
use rif_queue::BlockingQueue;
use tracing::info;

const PRODUCERS: i64 = 4;
const PER_PRODUCER: i64 = 250;

fn main() {
    tracing_subscriber::fmt::init();

    let queue = Arc::new(BlockingQueue::new().expect("queue"));
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let val = Val::pair(
                        Val::int(p).expect("int"),
                        Val::int(i).expect("int"),
                    )
                    .expect("pair");
                    queue.push(val).expect("push");
                }
                info!(producer = p, "producer done");
            })
        })
        .collect();

    let mut sum = 0;
    let mut received = 0;
    while let Some(val) = queue.pop_timeout(Duration::from_secs(1)) {
        if let Some((_, i)) = val.as_pair() {
            sum += i.as_int().unwrap_or(0);
        }
        received += 1;
        if received == PRODUCERS * PER_PRODUCER {
            break;
        }
    }

    for producer in producers {
        producer.join().expect("producer panicked");
    }
    info!(received, sum, remaining = queue.len(), "consumer done");
}
