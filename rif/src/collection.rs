//! Collection interfaces and the callbacks every backend shares.
//!
//! Backends implement [`Object`] by forwarding to the `list_*`, `map_*` and
//! `queue_*` functions here, so hashing, equality and rendering agree across
//! implementations of the same interface. Mutating operations a backend does
//! not override answer [`Error::Unsupported`].

use core::iter::Peekable;
use core::ptr;

use crate::error::{Error, Result};
use crate::hash::{hash_64, mix_32};
use crate::scalar::Pair;
use crate::val::{self, Object, UNDEF_STR, Val};

/// Ordered sequence of possibly absent elements.
pub trait List: Object {
    /// Number of elements.
    fn size(&self) -> usize;

    /// Element at `index`; `None` when absent or out of range.
    fn get(&self, index: usize) -> Option<&Val>;

    /// Front-to-back traversal.
    fn iter(&self) -> ListIter<'_>;

    /// Inserts before `index`; `index == size` appends.
    fn insert(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        let _ = (index, val);
        Err(Error::Unsupported)
    }

    /// Inserts at the back.
    fn append(&mut self, val: Option<Val>) -> Result<()> {
        let size = self.size();
        self.insert(size, val)
    }

    /// Inserts at the front.
    fn prepend(&mut self, val: Option<Val>) -> Result<()> {
        self.insert(0, val)
    }

    /// Replaces the element at `index`, releasing the old one.
    fn set(&mut self, index: usize, val: Option<Val>) -> Result<()> {
        let _ = (index, val);
        Err(Error::Unsupported)
    }

    /// Removes and releases the element at `index`.
    fn remove(&mut self, index: usize) -> Result<()> {
        let _ = index;
        Err(Error::Unsupported)
    }
}

/// Iterator over a list, with a `has_next` probe.
pub struct ListIter<'a> {
    inner: Peekable<Box<dyn Iterator<Item = Option<&'a Val>> + 'a>>,
}

impl<'a> ListIter<'a> {
    /// Wraps a backend traversal.
    pub fn new(inner: impl Iterator<Item = Option<&'a Val>> + 'a) -> Self {
        let inner: Box<dyn Iterator<Item = Option<&'a Val>> + 'a> = Box::new(inner);
        Self {
            inner: inner.peekable(),
        }
    }

    /// Whether another element follows.
    pub fn has_next(&mut self) -> bool {
        self.inner.peek().is_some()
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Option<&'a Val>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Borrowed `(key, value)` traversal of a map.
pub type Entries<'a> = Box<dyn Iterator<Item = (&'a Val, &'a Val)> + 'a>;

/// Key/value association.
pub trait Map: Object {
    /// Number of live entries.
    fn size(&self) -> usize;

    /// Value stored under `key`.
    fn get(&self, key: &Val) -> Option<&Val>;

    /// Whether `key` is present.
    fn exists(&self, key: &Val) -> bool {
        self.get(key).is_some()
    }

    /// All live entries, in backend order.
    fn entries(&self) -> Entries<'_>;

    /// Stores `val` under `key`, replacing (and releasing) an equal key and
    /// its value.
    fn put(&mut self, key: Val, val: Val) -> Result<()> {
        let _ = (key, val);
        Err(Error::Unsupported)
    }

    /// Removes `key` if present.
    fn remove(&mut self, key: &Val) -> Result<()> {
        let _ = key;
        Err(Error::Unsupported)
    }

    /// Pair-yielding cursor over the entries.
    fn cursor(&self) -> MapCursor<'_> {
        MapCursor::new(self.entries())
    }
}

/// Map traversal yielding one reusable pair value.
///
/// The pair returned by [`MapCursor::next`] is rewritten by the following
/// call unless the caller retained it, in which case a fresh pair is made.
pub struct MapCursor<'a> {
    entries: Peekable<Entries<'a>>,
    pair: Option<Val>,
}

impl<'a> MapCursor<'a> {
    /// Wraps a backend traversal.
    pub fn new(entries: Entries<'a>) -> Self {
        Self {
            entries: entries.peekable(),
            pair: None,
        }
    }

    /// Whether another entry follows.
    pub fn has_next(&mut self) -> bool {
        self.entries.peek().is_some()
    }

    /// The next entry as a `(key, value)` pair; `Ok(None)` past the end.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<&Val>> {
        let Some((key, val)) = self.entries.next() else {
            return Ok(None);
        };
        let reused = match self.pair.as_mut().and_then(Val::downcast_mut::<Pair>) {
            Some(pair) => {
                pair.set(key.clone(), val.clone());
                true
            }
            None => false,
        };
        if !reused {
            self.pair = Some(Val::pair(key.clone(), val.clone())?);
        }
        Ok(self.pair.as_ref())
    }
}

/// Concurrent queue of values, mutated through shared references.
pub trait Queue: Object {
    /// Approximate number of queued values.
    fn size(&self) -> usize;

    /// Enqueues `val`.
    fn push(&self, val: Val) -> Result<()>;

    /// Dequeues a value, if one is available.
    fn pop(&self) -> Option<Val>;
}

/// Fold from 37 over element hashes; absent elements hash as 31.
pub fn list_hashcode(list: &dyn List) -> u32 {
    list.iter()
        .fold(37, |hash, elem| mix_32(hash, elem.map_or(31, Val::hashcode)))
}

/// Same length and pairwise-equal elements.
pub fn list_equals(list: &dyn List, other: &dyn Object) -> bool {
    let Some(other) = other.as_list() else {
        return false;
    };
    list.size() == other.size()
        && list
            .iter()
            .zip(other.iter())
            .all(|(a, b)| val::equals(a, b))
}

/// `[a, b, ...]`; absent elements render as `[UNDEF]`.
pub fn list_tostring(list: &dyn List) -> Option<String> {
    let mut out = String::from("[");
    for (index, elem) in list.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        match elem {
            Some(val) => out.push_str(&val.tostring()?),
            None => out.push_str(UNDEF_STR),
        }
    }
    out.push(']');
    Some(out)
}

/// Order-independent combination of entry hashes.
pub fn map_hashcode(map: &dyn Map) -> u32 {
    map.entries().fold(43u32, |hash, (key, val)| {
        hash.wrapping_add(mix_32(key.hashcode(), val.hashcode()))
    })
}

/// Same size and every key maps to an equal value in `other`.
pub fn map_equals(map: &dyn Map, other: &dyn Object) -> bool {
    let Some(other) = other.as_map() else {
        return false;
    };
    map.size() == other.size()
        && map
            .entries()
            .all(|(key, val)| other.get(key).is_some_and(|found| found.equals(val)))
}

/// `{k: v, ...}` in backend order.
pub fn map_tostring(map: &dyn Map) -> Option<String> {
    let mut out = String::from("{");
    for (index, (key, val)) in map.entries().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push_str(&key.tostring()?);
        out.push_str(": ");
        out.push_str(&val.tostring()?);
    }
    out.push('}');
    Some(out)
}

/// Identity hash of a queue.
pub fn queue_hashcode(queue: &dyn Queue) -> u32 {
    hash_64(ptr::from_ref(queue).cast::<()>() as usize as u64)
}

/// Queues are equal only to themselves.
pub fn queue_equals(queue: &dyn Queue, other: &dyn Object) -> bool {
    ptr::addr_eq(ptr::from_ref(queue), ptr::from_ref(other))
}

/// `<Queue [items: N]>`.
pub fn queue_tostring(queue: &dyn Queue) -> Option<String> {
    Some(format!("<Queue [items: {}]>", queue.size()))
}
