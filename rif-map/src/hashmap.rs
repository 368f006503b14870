//! Robin Hood hash map over rif values.
//!
//! Open addressing over a power-of-two table with linear probing. An
//! inserting entry steals the slot of any resident that sits closer to its
//! own ideal slot, which keeps probe lengths even across the table and lets
//! lookups stop early. Removal leaves a tombstone carrying the old hash with
//! bit 31 set, so probe distances stay intact.
//!
//! Hashes are salted with the address of the slot array: a rehash into a new
//! array reshuffles every entry.

use core::mem::{self, MaybeUninit};
use core::ptr::NonNull;
use core::slice;
use std::alloc::Layout;

use rif::collection::{self, Entries, Map};
use rif::hash::{hash_64, mix_32};
use rif::{Error, Kind, Object, Result, Val, alloc};
use tracing::debug;

/// Smallest table ever allocated.
pub const MIN_CAPACITY: usize = 8;

/// Hash value of a never-used slot.
const EMPTY: u32 = 0;

/// Marks a slot whose entry was removed.
const TOMBSTONE: u32 = 0x8000_0000;

/// A slot. `key` and `val` are initialized exactly when the slot is live.
#[repr(C)]
struct Element {
    hash: u32,
    key: MaybeUninit<Val>,
    val: MaybeUninit<Val>,
}

impl Element {
    #[inline(always)]
    fn is_live(&self) -> bool {
        self.hash != EMPTY && self.hash & TOMBSTONE == 0
    }

    #[inline(always)]
    fn key(&self) -> &Val {
        debug_assert!(self.is_live());
        unsafe { self.key.assume_init_ref() }
    }

    #[inline(always)]
    fn val(&self) -> &Val {
        debug_assert!(self.is_live());
        unsafe { self.val.assume_init_ref() }
    }

    /// Moves the entry out, leaving the slot empty.
    fn take(&mut self) -> (Val, Val) {
        debug_assert!(self.is_live());
        self.hash = EMPTY;
        unsafe { (self.key.assume_init_read(), self.val.assume_init_read()) }
    }

    fn fill(&mut self, hash: u32, key: Val, val: Val) {
        self.hash = hash;
        self.key.write(key);
        self.val.write(val);
    }
}

/// How an insertion found its slot.
enum Placement {
    Replaced,
    Empty,
    Tombstone,
}

/// Distance of the slot at `index` from the ideal slot of `hash`.
#[inline(always)]
fn probe_distance(mask: usize, hash: u32, index: usize) -> usize {
    index.wrapping_sub(hash as usize) & mask
}

/// The slot array.
struct Table {
    elements: NonNull<Element>,
    capacity: usize,
    salt: u32,
}

impl Table {
    fn new(capacity: usize) -> Result<Self> {
        debug_assert!(capacity.is_power_of_two());
        let layout = Layout::array::<Element>(capacity).map_err(|_| Error::Capacity)?;
        let elements = alloc::allocate_zeroed(layout, "MAP_TABLE")
            .ok_or(Error::Memory)?
            .cast::<Element>();
        Ok(Self {
            elements,
            capacity,
            salt: hash_64(elements.as_ptr() as usize as u64),
        })
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.capacity - 1
    }

    #[inline(always)]
    fn slots(&self) -> &[Element] {
        unsafe { slice::from_raw_parts(self.elements.as_ptr(), self.capacity) }
    }

    #[inline(always)]
    fn slots_mut(&mut self) -> &mut [Element] {
        unsafe { slice::from_raw_parts_mut(self.elements.as_ptr(), self.capacity) }
    }

    /// Salted hash of `key`; never `EMPTY`, never has the tombstone bit.
    #[inline]
    fn hash_of(&self, key: &Val) -> u32 {
        let hash = mix_32(key.hashcode(), self.salt) & !TOMBSTONE;
        if hash == EMPTY { 1 } else { hash }
    }

    fn find(&self, key: &Val) -> Option<usize> {
        let mask = self.mask();
        let hash = self.hash_of(key);
        let slots = self.slots();
        let mut index = hash as usize & mask;
        let mut dist = 0;
        loop {
            let slot = &slots[index];
            if slot.hash == hash && slot.key().equals(key) {
                return Some(index);
            }
            if slot.hash == EMPTY || dist > probe_distance(mask, slot.hash, index) {
                return None;
            }
            index = (index + 1) & mask;
            dist += 1;
        }
    }

    /// Robin Hood insertion. The table must hold at least one empty slot.
    fn place(&mut self, key: Val, val: Val) -> Placement {
        let mask = self.mask();
        let mut hash = self.hash_of(&key);
        let (mut key, mut val) = (key, val);
        let mut index = hash as usize & mask;
        let mut dist = 0;
        let slots = self.slots_mut();
        loop {
            let slot = &mut slots[index];
            if slot.hash == hash && slot.key().equals(&key) {
                unsafe {
                    slot.key.assume_init_drop();
                    slot.val.assume_init_drop();
                }
                slot.key.write(key);
                slot.val.write(val);
                return Placement::Replaced;
            }
            if slot.hash == EMPTY {
                slot.fill(hash, key, val);
                return Placement::Empty;
            }
            let resident = probe_distance(mask, slot.hash, index);
            if resident < dist {
                if slot.hash & TOMBSTONE != 0 {
                    slot.fill(hash, key, val);
                    return Placement::Tombstone;
                }
                mem::swap(&mut slot.hash, &mut hash);
                key = mem::replace(unsafe { slot.key.assume_init_mut() }, key);
                val = mem::replace(unsafe { slot.val.assume_init_mut() }, val);
                dist = resident;
            }
            index = (index + 1) & mask;
            dist += 1;
        }
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        for slot in self.slots_mut() {
            if slot.is_live() {
                drop(slot.take());
            }
        }
        // Layout was validated when the table was allocated.
        if let Ok(layout) = Layout::array::<Element>(self.capacity) {
            unsafe { alloc::deallocate(self.elements.cast(), layout) };
        }
    }
}

// SAFETY: the table owns its entries, and values are Send + Sync.
unsafe impl Send for Table {}
unsafe impl Sync for Table {}

/// Robin Hood hash map from [`Val`] keys to [`Val`] values.
///
/// # Examples
///
/// ```rust
/// use rif::Val;
/// use rif_map::HashMap;
///
/// let mut map = HashMap::new();
/// map.put(Val::string("answer").unwrap(), Val::int(42).unwrap()).unwrap();
///
/// let key = Val::string("answer").unwrap();
/// assert_eq!(map.get(&key).and_then(Val::as_int), Some(42));
/// map.remove(&key).unwrap();
/// assert!(map.is_empty());
/// ```
pub struct HashMap {
    table: Option<Table>,
    size: usize,
    tombstones: usize,
    fixed: bool,
}

impl Default for HashMap {
    fn default() -> Self {
        Self::new()
    }
}

impl HashMap {
    /// Growable map; the table is allocated on first insertion.
    pub const fn new() -> Self {
        Self {
            table: None,
            size: 0,
            tombstones: 0,
            fixed: false,
        }
    }

    /// Map with room for `capacity` entries. A `fixed` map refuses to grow
    /// once its table exists; with `capacity == 0` nothing is allocated yet.
    pub fn with_capacity(capacity: usize, fixed: bool) -> Result<Self> {
        let mut map = Self {
            fixed,
            ..Self::new()
        };
        if capacity > 0 {
            map.ensure_capacity(capacity)?;
        }
        Ok(map)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the map has no live entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of slots in the table.
    pub fn capacity(&self) -> usize {
        self.table.as_ref().map_or(0, |table| table.capacity)
    }

    /// Whether growth is refused.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Makes room for `capacity` entries: the table grows to the next power
    /// of two at or above 110% of `max(capacity, MIN_CAPACITY)`.
    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<()> {
        let capacity = capacity.max(MIN_CAPACITY);
        let needed = capacity
            .checked_add(capacity / 10)
            .and_then(usize::checked_next_power_of_two)
            .ok_or(Error::Capacity)?;
        let current = self.capacity();
        if needed <= current {
            return Ok(());
        }
        if self.fixed && self.table.is_some() {
            return Err(Error::Capacity);
        }
        self.rehash(needed)
    }

    /// Moves every live entry into a fresh table of `capacity` slots. On
    /// failure the map is unchanged.
    fn rehash(&mut self, capacity: usize) -> Result<()> {
        let mut fresh = Table::new(capacity)?;
        let from = self.capacity();
        if let Some(mut old) = self.table.take() {
            for slot in old.slots_mut() {
                if slot.is_live() {
                    let (key, val) = slot.take();
                    fresh.place(key, val);
                }
            }
        }
        debug!(
            from,
            to = capacity,
            live = self.size,
            tombstones = self.tombstones,
            "rehashing map"
        );
        self.table = Some(fresh);
        self.tombstones = 0;
        Ok(())
    }

    /// Whether inserting one more entry would leave no empty slot once
    /// tombstones are counted.
    fn needs_compaction(&self) -> bool {
        let occupied = self.size + self.tombstones + 1;
        occupied + occupied / 10 > self.capacity()
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &Val) -> Option<&Val> {
        let table = self.table.as_ref()?;
        let index = table.find(key)?;
        Some(table.slots()[index].val())
    }

    /// Whether `key` is present.
    pub fn exists(&self, key: &Val) -> bool {
        self.get(key).is_some()
    }

    /// Stores `val` under `key`. An equal key already present is replaced
    /// together with its value, and both old values are released.
    pub fn put(&mut self, key: Val, val: Val) -> Result<()> {
        self.ensure_capacity(self.size + 1)?;
        if self.needs_compaction() {
            self.rehash(self.capacity())?;
        }
        let Some(table) = self.table.as_mut() else {
            return Err(Error::Memory);
        };
        match table.place(key, val) {
            Placement::Replaced => {}
            Placement::Empty => self.size += 1,
            Placement::Tombstone => {
                self.size += 1;
                self.tombstones -= 1;
            }
        }
        Ok(())
    }

    /// Removes `key`, releasing the stored key and value. Removing an absent
    /// key succeeds.
    pub fn remove(&mut self, key: &Val) -> Result<()> {
        let Some(table) = self.table.as_mut() else {
            return Ok(());
        };
        let Some(index) = table.find(key) else {
            return Ok(());
        };
        let slot = &mut table.slots_mut()[index];
        let hash = slot.hash;
        drop(slot.take());
        slot.hash = hash | TOMBSTONE;
        self.size -= 1;
        self.tombstones += 1;
        Ok(())
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: self.table.as_ref().map_or(&[][..], Table::slots).iter(),
        }
    }

    /// Mean probe distance of the live entries.
    pub fn average_distance(&self) -> f64 {
        let Some(table) = self.table.as_ref() else {
            return 0.0;
        };
        if self.size == 0 {
            return 0.0;
        }
        let mask = table.mask();
        let total: usize = table
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_live())
            .map(|(index, slot)| probe_distance(mask, slot.hash, index))
            .sum();
        total as f64 / self.size as f64
    }
}

/// Iterator over the live entries of a [`HashMap`].
pub struct Iter<'a> {
    slots: slice::Iter<'a, Element>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Val, &'a Val);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots
            .find(|slot| slot.is_live())
            .map(|slot| (slot.key(), slot.val()))
    }
}

impl<'a> IntoIterator for &'a HashMap {
    type Item = (&'a Val, &'a Val);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Object for HashMap {
    fn kind(&self) -> Kind {
        Kind::Map
    }

    fn hashcode(&self) -> u32 {
        collection::map_hashcode(self)
    }

    fn equals(&self, other: &dyn Object) -> bool {
        collection::map_equals(self, other)
    }

    fn tostring(&self) -> Option<String> {
        collection::map_tostring(self)
    }

    fn as_map(&self) -> Option<&dyn Map> {
        Some(self)
    }

    fn as_map_mut(&mut self) -> Option<&mut dyn Map> {
        Some(self)
    }
}

impl Map for HashMap {
    fn size(&self) -> usize {
        self.size
    }

    fn get(&self, key: &Val) -> Option<&Val> {
        HashMap::get(self, key)
    }

    fn exists(&self, key: &Val) -> bool {
        HashMap::exists(self, key)
    }

    fn entries(&self) -> Entries<'_> {
        Box::new(self.iter())
    }

    fn put(&mut self, key: Val, val: Val) -> Result<()> {
        HashMap::put(self, key, val)
    }

    fn remove(&mut self, key: &Val) -> Result<()> {
        HashMap::remove(self, key)
    }
}
