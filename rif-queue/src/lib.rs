//! Concurrent value queues for rif.
//!
//! [`ConcurrentQueue`] never blocks: `pop` on an empty queue returns `None`.
//! [`BlockingQueue`] layers a counting semaphore on top so consumers can wait,
//! with `try_pop` and timed variants.
//!
//! Both queues are push-at-head: a single thread sees values in reverse push
//! order, and nothing is promised about order across producers.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use rif::Val;
//! use rif_queue::BlockingQueue;
//!
//! let queue = Arc::new(BlockingQueue::new().unwrap());
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || queue.push(Val::int(7).unwrap()).unwrap())
//! };
//! assert_eq!(queue.pop().as_int(), Some(7));
//! producer.join().unwrap();
//! ```

#![warn(missing_docs)]

pub mod blocking_queue;
pub mod concurrent_queue;
mod semaphore;

pub use blocking_queue::BlockingQueue;
pub use concurrent_queue::ConcurrentQueue;
