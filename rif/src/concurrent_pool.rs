//! Thread-caching pool safe to share between threads.
//!
//! Each thread that touches a pool gets a private [`PagedPool`] for it, kept
//! in a thread-local table and created on first use. Every slot carries a
//! small header in front of the caller's payload:
//!
//! ```text
//! +-----------+--------------+-----------------+-----------+
//! | free word | owner token  | QueueLink       | payload   |
//! +-----------+--------------+-----------------+-----------+
//! ```
//!
//! A slot handed out from a thread's own pages is stamped with that thread's
//! token. Returning it from the same thread puts it back on the private free
//! list; returning it from anywhere else pushes it onto the pool's shared
//! remote list (a [`QueueBase`]), which borrowers consult before growing.
//!
//! When a thread exits, its free slots move to the remote list and its pages
//! are adopted by the pool, so slots still in flight stay valid. Pages are
//! zero-filled: a payload is all zeros the first time it is handed out and
//! keeps its last contents afterwards.

use core::cell::RefCell;
use core::mem;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU64, Ordering};
use std::alloc::Layout;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::paged_pool::PagedPool;
use crate::pool::{Pool, PoolConfig};
use crate::queue_base::{QueueBase, QueueLink};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

#[repr(C)]
struct SlotHeader {
    // Owned by the paged pool while the slot is on a private free list.
    _free: usize,
    owner: AtomicU64,
    link: QueueLink,
}

struct PoolShared {
    id: u64,
    payload: Layout,
    slot: Layout,
    payload_offset: usize,
    config: PoolConfig,
    remote: QueueBase,
    orphans: Mutex<Vec<PagedPool>>,
}

impl PoolShared {
    fn page_config(&self) -> PoolConfig {
        PoolConfig {
            lazy: true,
            zeroed: true,
            ..self.config
        }
    }

    #[inline]
    fn header(&self, slot: NonNull<u8>) -> &SlotHeader {
        unsafe { slot.cast::<SlotHeader>().as_ref() }
    }

    #[inline]
    fn link(&self, slot: NonNull<u8>) -> NonNull<QueueLink> {
        NonNull::from(&self.header(slot).link)
    }

    /// Slot whose header embeds `link`.
    #[inline]
    fn slot_of_link(&self, link: NonNull<QueueLink>) -> NonNull<u8> {
        unsafe { link.cast::<u8>().sub(mem::offset_of!(SlotHeader, link)) }
    }

    /// Next slot on the remote list, as a payload.
    fn pop_remote(&self) -> Option<NonNull<u8>> {
        let link = self.remote.pop()?;
        Some(self.payload_of(self.slot_of_link(link)))
    }

    #[inline]
    fn payload_of(&self, slot: NonNull<u8>) -> NonNull<u8> {
        unsafe { slot.add(self.payload_offset) }
    }

    #[inline]
    fn slot_of(&self, payload: NonNull<u8>) -> NonNull<u8> {
        unsafe { payload.sub(self.payload_offset) }
    }

    fn borrow_from(&self, cache: &mut ThreadCache) -> Result<NonNull<u8>> {
        let slot = match cache.pages.pop_free() {
            Some(slot) => slot,
            None => {
                if let Some(payload) = self.pop_remote() {
                    return Ok(payload);
                }
                cache.pages.borrow()?
            }
        };
        self.header(slot).owner.store(cache.token, Ordering::Relaxed);
        Ok(self.payload_of(slot))
    }

    /// Borrow path for threads whose cache is gone or busy.
    fn borrow_detached(&self) -> Result<NonNull<u8>> {
        if let Some(payload) = self.pop_remote() {
            return Ok(payload);
        }
        let mut pages = PagedPool::with_config(self.slot, self.page_config())?;
        let slot = pages.borrow()?;
        self.adopt(pages);
        Ok(self.payload_of(slot))
    }

    fn adopt(&self, mut pages: PagedPool) {
        let mut released = 0usize;
        while let Some(slot) = pages.pop_free() {
            unsafe { self.remote.push(self.link(slot)) };
            released += 1;
        }
        debug!(
            pool = self.id,
            pages = pages.pages(),
            released,
            "pool adopted thread pages"
        );
        self.orphans.lock().push(pages);
    }
}

impl Drop for PoolShared {
    fn drop(&mut self) {
        let orphans = self.orphans.get_mut();
        debug!(
            pool = self.id,
            pages = orphans.iter().map(PagedPool::pages).sum::<usize>(),
            "releasing adopted pool pages"
        );
    }
}

struct ThreadCache {
    pool: u64,
    token: u64,
    shared: Weak<PoolShared>,
    pages: PagedPool,
}

#[derive(Default)]
struct ThreadCaches {
    caches: Vec<ThreadCache>,
}

impl ThreadCaches {
    fn find(&mut self, pool: u64) -> Option<&mut ThreadCache> {
        self.caches.iter_mut().find(|cache| cache.pool == pool)
    }

    fn get_or_create(&mut self, shared: &Arc<PoolShared>) -> Result<&mut ThreadCache> {
        if let Some(index) = self.caches.iter().position(|cache| cache.pool == shared.id) {
            return Ok(&mut self.caches[index]);
        }
        // Caches of dropped pools give their pages back here.
        self.caches.retain(|cache| cache.shared.strong_count() > 0);

        let pages = PagedPool::with_config(shared.slot, shared.page_config())?;
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        debug!(pool = shared.id, token, "thread cache created");
        self.caches.push(ThreadCache {
            pool: shared.id,
            token,
            shared: Arc::downgrade(shared),
            pages,
        });
        let last = self.caches.len() - 1;
        Ok(&mut self.caches[last])
    }
}

impl Drop for ThreadCaches {
    fn drop(&mut self) {
        for cache in self.caches.drain(..) {
            if let Some(shared) = cache.shared.upgrade() {
                shared.adopt(cache.pages);
            }
        }
    }
}

thread_local! {
    static CACHES: RefCell<ThreadCaches> = RefCell::new(ThreadCaches::default());
}

/// Fixed-size pool usable from many threads at once.
///
/// Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct ConcurrentPool {
    shared: Arc<PoolShared>,
}

impl ConcurrentPool {
    /// Pool of `layout`-sized payloads with the default configuration.
    pub fn new(layout: Layout) -> Result<Self> {
        Self::with_config(layout, PoolConfig::default())
    }

    /// Pool of `layout`-sized payloads. Pages are always zero-filled and
    /// allocated lazily per thread; `config.block_size` sets the page size.
    pub fn with_config(layout: Layout, config: PoolConfig) -> Result<Self> {
        if config.block_size == 0 {
            return Err(Error::Capacity);
        }
        let (slot, payload_offset) = Layout::new::<SlotHeader>()
            .extend(layout)
            .map_err(|_| Error::Capacity)?;
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        Ok(Self {
            shared: Arc::new(PoolShared {
                id,
                payload: layout,
                slot: slot.pad_to_align(),
                payload_offset,
                config,
                remote: QueueBase::new(),
                orphans: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Hands out a payload.
    ///
    /// Order of preference: the calling thread's free list, the shared remote
    /// list, a new page for the calling thread.
    pub fn borrow(&self) -> Result<NonNull<u8>> {
        let shared = &self.shared;
        let cached = CACHES.try_with(|caches| match caches.try_borrow_mut() {
            Ok(mut caches) => Some(
                caches
                    .get_or_create(shared)
                    .and_then(|cache| shared.borrow_from(cache)),
            ),
            Err(_) => None,
        });
        match cached {
            Ok(Some(result)) => result,
            _ => shared.borrow_detached(),
        }
    }

    /// Takes a payload back.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`ConcurrentPool::borrow`] on this pool and must
    /// not have been returned since.
    pub unsafe fn give_back(&self, ptr: NonNull<u8>) {
        let shared = &self.shared;
        let slot = shared.slot_of(ptr);
        let owner = shared.header(slot).owner.load(Ordering::Relaxed);
        let kept = CACHES
            .try_with(|caches| match caches.try_borrow_mut() {
                Ok(mut caches) => match caches.find(shared.id) {
                    Some(cache) if cache.token == owner => {
                        unsafe { cache.pages.give_back(slot) };
                        true
                    }
                    _ => false,
                },
                Err(_) => false,
            })
            .unwrap_or(false);
        if !kept {
            unsafe { shared.remote.push(shared.link(slot)) };
        }
    }

    /// Layout of the payload area of every slot.
    pub fn payload_layout(&self) -> Layout {
        self.shared.payload
    }
}

impl Pool for ConcurrentPool {
    fn element_layout(&self) -> Layout {
        self.payload_layout()
    }

    fn borrow(&mut self) -> Result<NonNull<u8>> {
        ConcurrentPool::borrow(self)
    }

    unsafe fn give_back(&mut self, ptr: NonNull<u8>) {
        unsafe { ConcurrentPool::give_back(self, ptr) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_zeroed_on_first_use() {
        let pool = ConcurrentPool::new(Layout::new::<[u64; 4]>()).unwrap();
        let payload = pool.borrow().unwrap();
        let words = unsafe { payload.cast::<[u64; 4]>().read() };
        assert_eq!(words, [0; 4]);
        unsafe { pool.give_back(payload) };
    }

    #[test]
    fn test_payload_keeps_contents_on_reuse() {
        let config = PoolConfig {
            block_size: 1,
            ..PoolConfig::default()
        };
        let pool = ConcurrentPool::with_config(Layout::new::<u64>(), config).unwrap();
        let payload = pool.borrow().unwrap();
        unsafe { payload.cast::<u64>().write(0xfeed) };
        unsafe { pool.give_back(payload) };
        let again = pool.borrow().unwrap();
        assert_eq!(again, payload);
        assert_eq!(unsafe { again.cast::<u64>().read() }, 0xfeed);
        unsafe { pool.give_back(again) };
    }

    #[test]
    fn test_link_maps_back_to_its_slot() {
        let pool = ConcurrentPool::new(Layout::new::<u64>()).unwrap();
        let shared = &pool.shared;
        let payload = pool.borrow().unwrap();
        let slot = shared.slot_of(payload);
        assert_eq!(shared.slot_of_link(shared.link(slot)), slot);
        unsafe { pool.give_back(payload) };
    }

    #[test]
    fn test_remote_slot_comes_back_at_its_payload() {
        let pool = ConcurrentPool::new(Layout::new::<u64>()).unwrap();
        let shared = &pool.shared;
        let payload = pool.borrow().unwrap();
        unsafe { shared.remote.push(shared.link(shared.slot_of(payload))) };
        assert_eq!(shared.pop_remote(), Some(payload));
        assert!(shared.pop_remote().is_none());
        unsafe { pool.give_back(payload) };
    }

    #[test]
    fn test_owner_is_stamped_on_local_borrow() {
        let pool = ConcurrentPool::new(Layout::new::<u64>()).unwrap();
        let payload = pool.borrow().unwrap();
        let shared = &pool.shared;
        let owner = shared
            .header(shared.slot_of(payload))
            .owner
            .load(Ordering::Relaxed);
        let token = CACHES.with(|caches| caches.borrow_mut().find(shared.id).map(|c| c.token));
        assert_eq!(Some(owner), token);
        unsafe { pool.give_back(payload) };
    }
}
