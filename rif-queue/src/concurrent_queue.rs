//! Lock-free value queue.

use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicUsize, Ordering};
use std::alloc::Layout;

use rif::collection;
use rif::queue_base::{QueueBase, QueueLink};
use rif::{ConcurrentPool, Kind, Object, Queue, Result, Val};
use tracing::debug;

#[repr(C)]
struct Node {
    link: QueueLink,
    val: MaybeUninit<Val>,
}

/// Multi-producer, multi-consumer queue of values.
///
/// Nodes come from a [`ConcurrentPool`] and are threaded through a
/// [`QueueBase`], so pops return the most recently linked value first.
/// Neither operation blocks.
pub struct ConcurrentQueue {
    base: QueueBase,
    pool: ConcurrentPool,
    size: AtomicUsize,
}

impl ConcurrentQueue {
    /// Empty queue.
    pub fn new() -> Result<Self> {
        Ok(Self {
            base: QueueBase::new(),
            pool: ConcurrentPool::new(Layout::new::<Node>())?,
            size: AtomicUsize::new(0),
        })
    }

    /// Approximate number of queued values.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Whether the queue looked empty.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Enqueues `val`. On failure the value is released.
    pub fn push(&self, val: Val) -> Result<()> {
        let node = self.pool.borrow()?.cast::<Node>();
        // The link keeps its counter across reuse; only the value is written.
        unsafe { (&raw mut (*node.as_ptr()).val).write(MaybeUninit::new(val)) };
        self.size.fetch_add(1, Ordering::Relaxed);
        unsafe { self.base.push(node.cast()) };
        Ok(())
    }

    /// Dequeues a value, if one is linked.
    pub fn pop(&self) -> Option<Val> {
        let node = self.base.pop()?.cast::<Node>();
        let val = unsafe { Self::take(node) };
        unsafe { self.pool.give_back(node.cast()) };
        self.size.fetch_sub(1, Ordering::Relaxed);
        Some(val)
    }

    unsafe fn take(node: NonNull<Node>) -> Val {
        unsafe { ptr::read(&raw const (*node.as_ptr()).val).assume_init() }
    }
}

impl Drop for ConcurrentQueue {
    fn drop(&mut self) {
        let pool = &self.pool;
        let mut released = 0usize;
        unsafe {
            self.base.drain_with(|link| {
                let node = link.cast::<Node>();
                drop(Self::take(node));
                pool.give_back(node.cast());
                released += 1;
            })
        };
        if released > 0 {
            debug!(released, "queue dropped with values still queued");
        }
    }
}

impl Object for ConcurrentQueue {
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

impl Queue for ConcurrentQueue {
    fn size(&self) -> usize {
        self.len()
    }

    fn push(&self, val: Val) -> Result<()> {
        ConcurrentQueue::push(self, val)
    }

    fn pop(&self) -> Option<Val> {
        ConcurrentQueue::pop(self)
    }
}
