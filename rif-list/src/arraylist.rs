//! Contiguous list backed by a buffer from the allocator hooks.

use core::ptr::{self, NonNull};
use std::alloc::Layout;

use rif::collection::{self, ListIter};
use rif::{Error, Kind, List, Object, Result, Val, alloc};
use tracing::trace;

/// Growable (or fixed) array of possibly absent values.
///
/// Capacity grows in whole multiples of `block_size`. A `block_size` of zero
/// makes the list fixed: its first allocation is final and further growth
/// reports [`Error::Capacity`].
pub struct ArrayList {
    elements: NonNull<Option<Val>>,
    capacity: usize,
    size: usize,
    block_size: usize,
}

// SAFETY: the list owns its elements, and values are Send + Sync.
unsafe impl Send for ArrayList {}
unsafe impl Sync for ArrayList {}

impl ArrayList {
    /// List with room for `capacity` elements, allocated up front when
    /// non-zero.
    pub fn new(capacity: usize, block_size: usize) -> Result<Self> {
        let mut list = Self {
            elements: NonNull::dangling(),
            capacity: 0,
            size: 0,
            block_size,
        };
        if capacity > 0 {
            list.ensure_capacity(capacity)?;
        }
        Ok(list)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of element slots allocated.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Makes room for `capacity` elements.
    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.capacity {
            return Ok(());
        }
        if self.block_size == 0 && self.capacity > 0 {
            return Err(Error::Capacity);
        }
        let needed = match self.block_size {
            0 => capacity,
            block => capacity
                .div_ceil(block)
                .checked_mul(block)
                .ok_or(Error::Capacity)?,
        };
        let layout = Layout::array::<Option<Val>>(needed).map_err(|_| Error::Capacity)?;
        let grown = if self.capacity > 0 {
            let current = Layout::array::<Option<Val>>(self.capacity).map_err(|_| Error::Capacity)?;
            unsafe {
                alloc::reallocate(
                    self.elements.cast(),
                    current,
                    layout.size(),
                    "ARRAYLIST_CAPACITY_REALLOC",
                )
            }
        } else {
            alloc::allocate(layout, "ARRAYLIST_CAPACITY_ALLOC")
        };
        self.elements = grown.ok_or(Error::Memory)?.cast();
        trace!(from = self.capacity, to = needed, "array list grown");
        self.capacity = needed;
        Ok(())
    }

    fn as_slice(&self) -> &[Option<Val>] {
        unsafe { core::slice::from_raw_parts(self.elements.as_ptr(), self.size) }
    }

    /// Element at `index`; `None` when absent or out of range.
    pub fn get(&self, index: usize) -> Option<&Val> {
        self.as_slice().get(index)?.as_ref()
    }

    /// Inserts before `index`.
    pub fn insert(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        if index > self.size {
            return Err(Error::OutOfBounds);
        }
        self.ensure_capacity(self.size + 1)?;
        unsafe {
            let at = self.elements.as_ptr().add(index);
            ptr::copy(at, at.add(1), self.size - index);
            at.write(val);
        }
        self.size += 1;
        Ok(())
    }

    /// Replaces the element at `index`, releasing the old one.
    pub fn set(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        if index >= self.size {
            return Err(Error::OutOfBounds);
        }
        unsafe { *self.elements.as_ptr().add(index) = val };
        Ok(())
    }

    /// Removes the element at `index`, releasing it.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.size {
            return Err(Error::OutOfBounds);
        }
        let removed = unsafe {
            let at = self.elements.as_ptr().add(index);
            let removed = at.read();
            ptr::copy(at.add(1), at, self.size - index - 1);
            removed
        };
        self.size -= 1;
        drop(removed);
        Ok(())
    }
}

impl Drop for ArrayList {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.elements.as_ptr(),
                self.size,
            ))
        };
        if self.capacity > 0 {
            if let Ok(layout) = Layout::array::<Option<Val>>(self.capacity) {
                unsafe { alloc::deallocate(self.elements.cast(), layout) };
            }
        }
    }
}

impl Object for ArrayList {
    fn kind(&self) -> Kind {
        Kind::List
    }

    fn hashcode(&self) -> u32 {
        collection::list_hashcode(self)
    }

    fn equals(&self, other: &dyn Object) -> bool {
        collection::list_equals(self, other)
    }

    fn tostring(&self) -> Option<String> {
        collection::list_tostring(self)
    }

    fn as_list(&self) -> Option<&dyn List> {
        Some(self)
    }

    fn as_list_mut(&mut self) -> Option<&mut dyn List> {
        Some(self)
    }
}

impl List for ArrayList {
    fn size(&self) -> usize {
        self.size
    }

    fn get(&self, index: usize) -> Option<&Val> {
        ArrayList::get(self, index)
    }

    fn iter(&self) -> ListIter<'_> {
        ListIter::new(self.as_slice().iter().map(Option::as_ref))
    }

    fn insert(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        ArrayList::insert(self, index, val)
    }

    fn set(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        ArrayList::set(self, index, val)
    }

    fn remove(&mut self, index: usize) -> Result<()> {
        ArrayList::remove(self, index)
    }
}
