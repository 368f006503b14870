//! Single-threaded fixed-size allocator.
//!
//! Memory is obtained a page at a time; each page holds `block_size`
//! elements. Free elements are threaded into a FIFO list through their first
//! word: [`PagedPool::borrow`] takes from the head, [`PagedPool::give_back`]
//! appends to the tail. Pages are released only when the pool is dropped, so
//! element memory stays valid for the pool's whole life.

use core::mem;
use core::ptr::{self, NonNull};
use std::alloc::Layout;

use tracing::trace;

use crate::alloc;
use crate::error::{Error, Result};
use crate::pool::{Pool, PoolConfig};

#[repr(C)]
struct Page {
    next: *mut Page,
}

/// Page-backed pool of fixed-size elements.
pub struct PagedPool {
    element: Layout,
    page: Layout,
    elements_offset: usize,
    config: PoolConfig,
    first_available: *mut u8,
    last_available: *mut u8,
    first_page: *mut Page,
    pages: usize,
}

// SAFETY: the pool exclusively owns its pages.
unsafe impl Send for PagedPool {}

impl PagedPool {
    /// Pool of `layout`-sized elements with the default configuration.
    pub fn new(layout: Layout) -> Result<Self> {
        Self::with_config(layout, PoolConfig::default())
    }

    /// Pool of `layout`-sized elements. Elements are widened to hold at least
    /// one pointer. A non-lazy pool allocates its first page immediately.
    pub fn with_config(layout: Layout, config: PoolConfig) -> Result<Self> {
        if config.block_size == 0 {
            return Err(Error::Capacity);
        }
        let element = Layout::from_size_align(
            layout.size().max(mem::size_of::<*mut u8>()),
            layout.align().max(mem::align_of::<*mut u8>()),
        )
        .map_err(|_| Error::Capacity)?
        .pad_to_align();
        let elements = Layout::from_size_align(
            element
                .size()
                .checked_mul(config.block_size)
                .ok_or(Error::Capacity)?,
            element.align(),
        )
        .map_err(|_| Error::Capacity)?;
        let (page, elements_offset) = Layout::new::<Page>()
            .extend(elements)
            .map_err(|_| Error::Capacity)?;

        let mut pool = Self {
            element,
            page,
            elements_offset,
            config,
            first_available: ptr::null_mut(),
            last_available: ptr::null_mut(),
            first_page: ptr::null_mut(),
            pages: 0,
        };
        if !config.lazy {
            pool.grow()?;
        }
        Ok(pool)
    }

    /// Number of pages allocated so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    #[inline]
    unsafe fn link_of(element: *mut u8) -> *mut *mut u8 {
        element.cast::<*mut u8>()
    }

    fn grow(&mut self) -> Result<()> {
        let raw = if self.config.zeroed {
            alloc::allocate_zeroed(self.page, "POOL_PAGE")
        } else {
            alloc::allocate(self.page, "POOL_PAGE")
        }
        .ok_or(Error::Memory)?;

        let page = raw.cast::<Page>().as_ptr();
        unsafe { page.write(Page { next: self.first_page }) };
        self.first_page = page;
        self.pages += 1;

        let stride = self.element.size();
        let count = self.config.block_size;
        let first = unsafe { raw.as_ptr().add(self.elements_offset) };
        unsafe {
            for index in 0..count - 1 {
                let element = first.add(index * stride);
                Self::link_of(element).write(element.add(stride));
            }
            let last = first.add((count - 1) * stride);
            Self::link_of(last).write(self.first_available);
            if self.last_available.is_null() {
                self.last_available = last;
            }
        }
        self.first_available = first;

        trace!(
            pages = self.pages,
            elements = count,
            element_size = stride,
            "pool page allocated"
        );
        Ok(())
    }

    /// Takes the head of the free list without growing.
    pub fn pop_free(&mut self) -> Option<NonNull<u8>> {
        let element = NonNull::new(self.first_available)?;
        self.first_available = unsafe { Self::link_of(element.as_ptr()).read() };
        if element.as_ptr() == self.last_available {
            self.last_available = ptr::null_mut();
        }
        Some(element)
    }

    /// Hands out an element, allocating a page when the free list is empty.
    pub fn borrow(&mut self) -> Result<NonNull<u8>> {
        if let Some(element) = self.pop_free() {
            return Ok(element);
        }
        self.grow()?;
        self.pop_free().ok_or(Error::Memory)
    }

    /// Appends `element` to the tail of the free list.
    ///
    /// # Safety
    ///
    /// `element` must have been borrowed from this pool and not returned
    /// since.
    pub unsafe fn give_back(&mut self, element: NonNull<u8>) {
        let element = element.as_ptr();
        unsafe {
            Self::link_of(element).write(ptr::null_mut());
            if !self.last_available.is_null() {
                Self::link_of(self.last_available).write(element);
            }
        }
        self.last_available = element;
        if self.first_available.is_null() {
            self.first_available = element;
        }
    }
}

impl Pool for PagedPool {
    fn element_layout(&self) -> Layout {
        self.element
    }

    fn borrow(&mut self) -> Result<NonNull<u8>> {
        PagedPool::borrow(self)
    }

    unsafe fn give_back(&mut self, ptr: NonNull<u8>) {
        unsafe { PagedPool::give_back(self, ptr) }
    }
}

impl Drop for PagedPool {
    fn drop(&mut self) {
        let mut page = self.first_page;
        while let Some(current) = NonNull::new(page) {
            page = unsafe { current.as_ref().next };
            unsafe { alloc::deallocate(current.cast(), self.page) };
        }
    }
}
