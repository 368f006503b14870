//! Process-wide allocator override.
//!
//! Value cells, hashmap tables, list buffers and pool pages all obtain their
//! memory through the three hooks stored here. The defaults forward to the
//! global allocator. Hooks are swapped as a whole with [`set_allocators`]:
//!
//! ```rust
//! use rif::alloc::{self, Allocators};
//! use std::alloc::Layout;
//!
//! unsafe fn counting_malloc(layout: Layout) -> *mut u8 {
//!     unsafe { std::alloc::alloc(layout) }
//! }
//!
//! static COUNTING: Allocators = Allocators {
//!     malloc: counting_malloc,
//!     ..Allocators::SYSTEM
//! };
//!
//! alloc::set_allocators(&COUNTING);
//! alloc::reset_allocators();
//! ```

use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicPtr, Ordering};
use std::alloc::Layout;

use tracing::warn;

/// Allocate a block for `layout`; null signals failure.
pub type MallocFn = unsafe fn(Layout) -> *mut u8;
/// Resize a block previously obtained for `layout` to `new_size` bytes.
pub type ReallocFn = unsafe fn(*mut u8, Layout, usize) -> *mut u8;
/// Release a block previously obtained for `layout`.
pub type FreeFn = unsafe fn(*mut u8, Layout);

/// The allocation hooks used by every rif structure.
///
/// Layouts handed to the hooks always have a non-zero size.
#[derive(Debug, Clone, Copy)]
pub struct Allocators {
    /// Allocation hook.
    pub malloc: MallocFn,
    /// Reallocation hook.
    pub realloc: ReallocFn,
    /// Deallocation hook.
    pub free: FreeFn,
}

unsafe fn system_malloc(layout: Layout) -> *mut u8 {
    unsafe { std::alloc::alloc(layout) }
}

unsafe fn system_realloc(ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
    unsafe { std::alloc::realloc(ptr, layout, new_size) }
}

unsafe fn system_free(ptr: *mut u8, layout: Layout) {
    unsafe { std::alloc::dealloc(ptr, layout) }
}

impl Allocators {
    /// Hooks forwarding to the global allocator.
    pub const SYSTEM: Allocators = Allocators {
        malloc: system_malloc,
        realloc: system_realloc,
        free: system_free,
    };
}

static SYSTEM: Allocators = Allocators::SYSTEM;
static CURRENT: AtomicPtr<Allocators> = AtomicPtr::new(ptr::null_mut());

/// Installs `hooks` for every subsequent allocation in the process.
///
/// A block is released through whatever hooks are installed at that moment,
/// so the new hooks must be able to free blocks of the old ones (typically by
/// forwarding to the same underlying allocator), or no rif structure may be
/// alive across the switch.
pub fn set_allocators(hooks: &'static Allocators) {
    CURRENT.store(hooks as *const Allocators as *mut Allocators, Ordering::Release);
}

/// Restores the global-allocator hooks.
pub fn reset_allocators() {
    CURRENT.store(ptr::null_mut(), Ordering::Release);
}

/// The hooks currently installed.
pub fn allocators() -> &'static Allocators {
    let current = CURRENT.load(Ordering::Acquire);
    if current.is_null() {
        &SYSTEM
    } else {
        // SAFETY: only `&'static Allocators` are ever stored.
        unsafe { &*current }
    }
}

/// Allocates `layout` through the installed hook. `tag` names the caller in
/// diagnostics.
pub fn allocate(layout: Layout, tag: &'static str) -> Option<NonNull<u8>> {
    debug_assert!(layout.size() > 0);
    let ptr = NonNull::new(unsafe { (allocators().malloc)(layout) });
    if ptr.is_none() {
        warn!(tag, size = layout.size(), "allocation failed");
    }
    ptr
}

/// Like [`allocate`], with the block zero-filled.
pub fn allocate_zeroed(layout: Layout, tag: &'static str) -> Option<NonNull<u8>> {
    let ptr = allocate(layout, tag)?;
    unsafe { ptr::write_bytes(ptr.as_ptr(), 0, layout.size()) };
    Some(ptr)
}

/// Grows or shrinks a block. On failure the original block is untouched.
///
/// # Safety
///
/// `ptr` must come from these hooks with `layout`, and `new_size` must be
/// non-zero and valid for `layout.align()`.
pub unsafe fn reallocate(
    ptr: NonNull<u8>,
    layout: Layout,
    new_size: usize,
    tag: &'static str,
) -> Option<NonNull<u8>> {
    let grown = NonNull::new(unsafe { (allocators().realloc)(ptr.as_ptr(), layout, new_size) });
    if grown.is_none() {
        warn!(tag, size = new_size, "reallocation failed");
    }
    grown
}

/// Releases a block.
///
/// # Safety
///
/// `ptr` must come from these hooks with exactly `layout` and must not be used
/// afterwards.
pub unsafe fn deallocate(ptr: NonNull<u8>, layout: Layout) {
    unsafe { (allocators().free)(ptr.as_ptr(), layout) }
}
