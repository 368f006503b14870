//! The interface shared by both pools.

use core::ptr::NonNull;
use std::alloc::Layout;

use crate::error::Result;

/// Page size used when a caller does not pick one.
pub const DEFAULT_BLOCK_SIZE: usize = 32;

/// Pool tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Elements per page. Must be non-zero.
    pub block_size: usize,
    /// Defer the first page until the first borrow.
    pub lazy: bool,
    /// Zero-fill pages when they are allocated.
    pub zeroed: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            lazy: true,
            zeroed: false,
        }
    }
}

/// Fixed-size element allocator.
pub trait Pool {
    /// Layout every borrowed element satisfies.
    fn element_layout(&self) -> Layout;

    /// Hands out an element, growing by a page when needed.
    fn borrow(&mut self) -> Result<NonNull<u8>>;

    /// Takes an element back for reuse.
    ///
    /// # Safety
    ///
    /// `ptr` must have been borrowed from this pool and not returned since.
    unsafe fn give_back(&mut self, ptr: NonNull<u8>);
}
