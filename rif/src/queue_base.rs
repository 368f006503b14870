//! Lock-free intrusive LIFO used as a free list and as the backbone of the
//! concurrent value queue.
//!
//! Every node embeds a [`QueueLink`] at offset 0. The link's counter packs a
//! reference count (low 31 bits) with a "should be pushed" flag (bit 31).
//! Poppers claim a node by bumping its count before reading its successor; a
//! push that races with outstanding claims only raises the flag, and the last
//! claimer to let go finishes the push. This is what keeps the stack free of
//! ABA without tagged pointers, at the price that node memory must never be
//! returned to the system while the queue is in use. Node counters are never
//! reset: a reused node keeps whatever count stale claimers left behind.
//!
//! ```rust
//! use core::ptr::NonNull;
//! use rif::queue_base::{QueueBase, QueueLink};
//!
//! let nodes = [QueueLink::new(), QueueLink::new()];
//! let queue = QueueBase::new();
//! unsafe {
//!     queue.push(NonNull::from(&nodes[0]));
//!     queue.push(NonNull::from(&nodes[1]));
//! }
//! assert_eq!(queue.pop(), Some(NonNull::from(&nodes[1])));
//! assert_eq!(queue.pop(), Some(NonNull::from(&nodes[0])));
//! assert_eq!(queue.pop(), None);
//! ```

use core::mem;
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

/// Count bits of a node's counter.
pub const REFS_MASK: u32 = 0x7FFF_FFFF;
/// Flag marking a node whose push is pending on outstanding claims.
pub const QUEUE_PUSH: u32 = 0x8000_0000;

/// Intrusive header; must be the first field of a `#[repr(C)]` node.
#[repr(C)]
#[derive(Debug, Default)]
pub struct QueueLink {
    refs: AtomicU32,
    succ: AtomicPtr<QueueLink>,
}

impl QueueLink {
    /// Fresh, unlinked header. All-zero memory is an equivalent starting
    /// state.
    pub const fn new() -> Self {
        Self {
            refs: AtomicU32::new(0),
            succ: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Raw counter snapshot (count and flag).
    pub fn refs(&self) -> u32 {
        self.refs.load(Ordering::Relaxed)
    }
}

/// Head of the intrusive stack.
#[derive(Debug)]
pub struct QueueBase {
    head: CachePadded<AtomicPtr<QueueLink>>,
}

impl Default for QueueBase {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueBase {
    /// Empty queue.
    pub const fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
        }
    }

    /// Whether the queue looked empty at the time of the call.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }

    /// Pushes `node`.
    ///
    /// # Safety
    ///
    /// The caller must own `node` (it is in no queue), and its memory must
    /// stay valid for as long as this queue, or any queue it was ever pushed
    /// to, is in use.
    pub unsafe fn push(&self, node: NonNull<QueueLink>) {
        let link = unsafe { node.as_ref() };
        if link.refs.fetch_add(QUEUE_PUSH, Ordering::Release) == 0 {
            unsafe { self.link(node) };
        }
    }

    /// Links a node whose count has dropped to zero.
    unsafe fn link(&self, node: NonNull<QueueLink>) {
        let link = unsafe { node.as_ref() };
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            link.succ.store(head, Ordering::Relaxed);
            link.refs.store(1, Ordering::Release);
            match self.head.compare_exchange(
                head,
                node.as_ptr(),
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => {
                    head = actual;
                    // Swap our count for the flag. If a claimer got in, it
                    // links the node once its claim is dropped.
                    if link.refs.fetch_add(QUEUE_PUSH - 1, Ordering::Release) == 1 {
                        continue;
                    }
                    return;
                }
            }
        }
    }

    /// Pops the most recently pushed node.
    pub fn pop(&self) -> Option<NonNull<QueueLink>> {
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Acquire);
        while let Some(node) = NonNull::new(head) {
            // SAFETY: node memory stays valid while the queue is in use.
            let link = unsafe { node.as_ref() };
            let refs = link.refs.load(Ordering::Relaxed);
            if refs & REFS_MASK == 0
                || link
                    .refs
                    .compare_exchange(refs, refs + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_err()
            {
                backoff.spin();
                head = self.head.load(Ordering::Acquire);
                continue;
            }

            let next = link.succ.load(Ordering::Relaxed);
            match self
                .head
                .compare_exchange(head, next, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => {
                    debug_assert_eq!(link.refs.load(Ordering::Relaxed) & QUEUE_PUSH, 0);
                    // Our claim and the list's own count.
                    link.refs.fetch_sub(2, Ordering::Release);
                    return Some(node);
                }
                Err(actual) => {
                    head = actual;
                    let refs = link.refs.fetch_sub(1, Ordering::AcqRel);
                    if refs == QUEUE_PUSH + 1 {
                        unsafe { self.link(node) };
                    }
                    backoff.spin();
                }
            }
        }
        None
    }

    /// Detaches every node and hands each to `f`, head first.
    ///
    /// # Safety
    ///
    /// No node may be concurrently claimed by a stale popper of this queue;
    /// exclusive access guarantees that for this queue alone.
    pub unsafe fn drain_with(&mut self, mut f: impl FnMut(NonNull<QueueLink>)) {
        let mut current = mem::replace(self.head.get_mut(), ptr::null_mut());
        while let Some(node) = NonNull::new(current) {
            current = unsafe { node.as_ref() }.succ.load(Ordering::Relaxed);
            f(node);
        }
    }
}
