use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rif::{Queue, Val};
use rif_queue::BlockingQueue;

#[test]
fn test_try_pop_on_empty_returns_immediately() {
    let queue = BlockingQueue::new().unwrap();
    assert!(queue.try_pop().is_none());
    queue.push(Val::Null).unwrap();
    assert!(queue.try_pop().unwrap().is_null());
    assert!(queue.try_pop().is_none());
}

#[test]
fn test_pop_timeout_on_empty_returns_none() {
    let queue = BlockingQueue::new().unwrap();
    let started = Instant::now();
    assert!(queue.pop_timeout(Duration::from_millis(30)).is_none());
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_pop_timeout_returns_ready_value() {
    let queue = BlockingQueue::new().unwrap();
    queue.push(Val::int(5).unwrap()).unwrap();
    let val = queue.pop_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(val.as_int(), Some(5));
    assert_eq!(queue.len(), 0);
}

#[test]
fn test_trait_pop_waits_like_inherent_pop() {
    let queue = BlockingQueue::new().unwrap();
    let queue: &dyn Queue = &queue;
    queue.push(Val::Bool(true)).unwrap();
    assert_eq!(queue.size(), 1);
    assert_eq!(queue.pop().and_then(|v| v.as_bool()), Some(true));
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_pop_wakes_on_push_from_another_thread() {
    let queue = Arc::new(BlockingQueue::new().unwrap());
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.pop().as_int())
    };
    thread::sleep(Duration::from_millis(20));
    queue.push(Val::int(42).unwrap()).unwrap();
    assert_eq!(consumer.join().unwrap(), Some(42));
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_many_waiters_each_get_one_value() {
    const WAITERS: usize = 8;

    let queue = Arc::new(BlockingQueue::new().unwrap());
    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop_timeout(Duration::from_secs(10)))
        })
        .collect();

    for v in 0..WAITERS as i64 {
        queue.push(Val::int(v).unwrap()).unwrap();
    }
    let mut got: Vec<i64> = waiters
        .into_iter()
        .map(|w| w.join().unwrap().and_then(|v| v.as_int()).unwrap())
        .collect();
    got.sort_unstable();
    assert_eq!(got, (0..WAITERS as i64).collect::<Vec<_>>());
    assert!(queue.try_pop().is_none());
}
