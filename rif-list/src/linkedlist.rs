//! Doubly-linked list whose nodes come from a paged pool.

use core::ptr::{self, NonNull};
use std::alloc::Layout;

use rif::collection::{self, ListIter};
use rif::{Error, Kind, List, Object, PagedPool, PoolConfig, Result, Val};

/// Nodes per pool page.
pub const POOL_SIZE: usize = 32;

struct Node {
    val: Option<Val>,
    pred: *mut Node,
    succ: *mut Node,
}

/// Doubly-linked list of possibly absent values.
///
/// Index lookups walk from whichever end is nearer.
pub struct LinkedList {
    first: *mut Node,
    last: *mut Node,
    size: usize,
    pool: PagedPool,
}

// SAFETY: the list owns its nodes, and values are Send + Sync.
unsafe impl Send for LinkedList {}
unsafe impl Sync for LinkedList {}

impl LinkedList {
    /// Empty list. No memory is taken until the first insertion.
    pub fn new() -> Result<Self> {
        let config = PoolConfig {
            block_size: POOL_SIZE,
            lazy: true,
            zeroed: false,
        };
        Ok(Self {
            first: ptr::null_mut(),
            last: ptr::null_mut(),
            size: 0,
            pool: PagedPool::with_config(Layout::new::<Node>(), config)?,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn node_at(&self, index: usize) -> *mut Node {
        if index >= self.size {
            return ptr::null_mut();
        }
        unsafe {
            if index < self.size / 2 {
                let mut node = self.first;
                for _ in 0..index {
                    node = (*node).succ;
                }
                node
            } else {
                let mut node = self.last;
                for _ in 0..self.size - index - 1 {
                    node = (*node).pred;
                }
                node
            }
        }
    }

    /// Element at `index`; `None` when absent or out of range.
    pub fn get(&self, index: usize) -> Option<&Val> {
        let node = self.node_at(index);
        if node.is_null() {
            return None;
        }
        unsafe { (*node).val.as_ref() }
    }

    /// Inserts before `index`.
    pub fn insert(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        let (pred, succ) = if index == 0 {
            (ptr::null_mut(), self.first)
        } else if index == self.size {
            (self.last, ptr::null_mut())
        } else if index < self.size {
            let current = self.node_at(index);
            (unsafe { (*current).pred }, current)
        } else {
            return Err(Error::OutOfBounds);
        };

        let node = self.pool.borrow()?.cast::<Node>().as_ptr();
        unsafe { node.write(Node { val, pred, succ }) };
        match NonNull::new(pred) {
            Some(pred) => unsafe { (*pred.as_ptr()).succ = node },
            None => self.first = node,
        }
        match NonNull::new(succ) {
            Some(succ) => unsafe { (*succ.as_ptr()).pred = node },
            None => self.last = node,
        }
        self.size += 1;
        Ok(())
    }

    /// Replaces the element at `index`, releasing the old one.
    pub fn set(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        if index >= self.size {
            return Err(Error::OutOfBounds);
        }
        let node = self.node_at(index);
        unsafe { (*node).val = val };
        Ok(())
    }

    /// Removes the element at `index`, releasing it.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.size {
            return Err(Error::OutOfBounds);
        }
        let node = self.node_at(index);
        let Node { val, pred, succ } = unsafe { node.read() };
        match NonNull::new(pred) {
            Some(pred) => unsafe { (*pred.as_ptr()).succ = succ },
            None => self.first = succ,
        }
        match NonNull::new(succ) {
            Some(succ) => unsafe { (*succ.as_ptr()).pred = pred },
            None => self.last = pred,
        }
        self.size -= 1;
        unsafe { self.pool.give_back(NonNull::new_unchecked(node).cast()) };
        drop(val);
        Ok(())
    }

    fn values(&self) -> Values<'_> {
        Values {
            node: self.first,
            _list: self,
        }
    }
}

impl Drop for LinkedList {
    fn drop(&mut self) {
        let mut node = self.first;
        while !node.is_null() {
            unsafe {
                let next = (*node).succ;
                ptr::drop_in_place(&raw mut (*node).val);
                node = next;
            }
        }
        // Pages go with the pool.
    }
}

/// Front-to-back walk over node values.
struct Values<'a> {
    node: *mut Node,
    _list: &'a LinkedList,
}

impl<'a> Iterator for Values<'a> {
    type Item = Option<&'a Val>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = NonNull::new(self.node)?;
        let node: &'a Node = unsafe { node.as_ref() };
        self.node = node.succ;
        Some(node.val.as_ref())
    }
}

impl Object for LinkedList {
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

impl List for LinkedList {
    fn size(&self) -> usize {
        self.size
    }

    fn get(&self, index: usize) -> Option<&Val> {
        LinkedList::get(self, index)
    }

    fn iter(&self) -> ListIter<'_> {
        ListIter::new(self.values())
    }

    fn insert(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        LinkedList::insert(self, index, val)
    }

    fn set(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        LinkedList::set(self, index, val)
    }

    fn remove(&mut self, index: usize) -> Result<()> {
        LinkedList::remove(self, index)
    }
}
