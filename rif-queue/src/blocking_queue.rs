//! Semaphore-gated wrapper around [`ConcurrentQueue`].

use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;
use rif::collection;
use rif::{Kind, Object, Queue, Result, Val};
use tracing::trace;

use crate::concurrent_queue::ConcurrentQueue;
use crate::semaphore::Semaphore;

/// Queue whose consumers can wait for values.
///
/// Every successful push posts one permit and every pop consumes one, so a
/// consumer holding a permit is owed a value. If the value it is owed is still
/// being linked, the consumer spins until it shows up rather than waiting for
/// another permit.
pub struct BlockingQueue {
    queue: ConcurrentQueue,
    permits: Semaphore,
}

impl BlockingQueue {
    /// Empty queue.
    pub fn new() -> Result<Self> {
        Ok(Self {
            queue: ConcurrentQueue::new()?,
            permits: Semaphore::default(),
        })
    }

    /// Approximate number of queued values.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue looked empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Enqueues `val` and wakes one waiting consumer.
    pub fn push(&self, val: Val) -> Result<()> {
        self.queue.push(val)?;
        self.permits.post();
        Ok(())
    }

    /// Waits for a value.
    pub fn pop(&self) -> Val {
        self.permits.wait();
        self.claim()
    }

    /// Takes a value if one is ready, without waiting.
    pub fn try_pop(&self) -> Option<Val> {
        if !self.permits.try_wait() {
            return None;
        }
        Some(self.claim())
    }

    /// Waits at most `timeout` for a value.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Val> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.pop_until(deadline),
            None => Some(self.pop()),
        }
    }

    /// Waits until `deadline` for a value.
    pub fn pop_until(&self, deadline: Instant) -> Option<Val> {
        if !self.permits.wait_until(deadline) {
            trace!("blocking pop timed out");
            return None;
        }
        Some(self.claim())
    }

    fn claim(&self) -> Val {
        let backoff = Backoff::new();
        loop {
            if let Some(val) = self.queue.pop() {
                return val;
            }
            backoff.snooze();
        }
    }
}

impl Object for BlockingQueue {
    fn kind(&self) -> Kind {
        Kind::Queue
    }

    fn hashcode(&self) -> u32 {
        collection::queue_hashcode(self)
    }

    fn equals(&self, other: &dyn Object) -> bool {
        collection::queue_equals(self, other)
    }

    fn tostring(&self) -> Option<String> {
        collection::queue_tostring(self)
    }

    fn as_queue(&self) -> Option<&dyn Queue> {
        Some(self)
    }
}

impl Queue for BlockingQueue {
    fn size(&self) -> usize {
        self.len()
    }

    fn push(&self, val: Val) -> Result<()> {
        BlockingQueue::push(self, val)
    }

    /// Blocks until a value arrives.
    fn pop(&self) -> Option<Val> {
        Some(BlockingQueue::pop(self))
    }
}
