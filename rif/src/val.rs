//! Reference-counted polymorphic values.
//!
//! A [`Val`] is either one of the three payload-free singletons (`Undef`,
//! `Null`, `Bool`) or a counted handle ([`Obj`]) to a heap cell whose layout
//! is a common [`Header`] followed by a type-specific body. The body's
//! behaviour is reached through the [`Object`] trait, which plays the role of
//! a per-type dispatch table.
//!
//! Cloning a `Val` retains it, dropping releases it. The final release drops
//! the body (releasing whatever it owns) and frees the cell when the cell was
//! allocated by rif rather than supplied by the caller through [`Slot`].

use core::any::Any;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem::{self, MaybeUninit};
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicU32, Ordering, fence};
use std::alloc::Layout;

use crate::alloc;
use crate::collection::{List, Map, Queue};
use crate::error::{Error, Result};
use crate::scalar::{Double, Int, Pair, Str};

/// Rendering used by containers for absent elements.
pub const UNDEF_STR: &str = "[UNDEF]";

/// Type tag of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    /// Undefined singleton.
    Undef,
    /// Null singleton.
    Null,
    /// Boolean singletons.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Double,
    /// Immutable byte string.
    String,
    /// Ordered sequence.
    List,
    /// Key/value association.
    Map,
    /// Concurrent FIFO-ish queue.
    Queue,
    /// Two retained members.
    Pair,
}

/// Access to the concrete type behind a `dyn Object`.
pub trait AsAny {
    /// The body as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// The body as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour of a value body.
///
/// Destruction is the body's `Drop`. The collection accessors default to
/// `None`, so a body only opts into the interfaces it implements.
pub trait Object: AsAny + Send + Sync + 'static {
    /// Type tag stored in the cell header.
    fn kind(&self) -> Kind;

    /// Hash consistent with [`Object::equals`].
    fn hashcode(&self) -> u32;

    /// Structural equality. `other` always has the same [`Kind`].
    fn equals(&self, other: &dyn Object) -> bool;

    /// Human-readable rendering, `None` when the value has none.
    fn tostring(&self) -> Option<String>;

    /// List view.
    fn as_list(&self) -> Option<&dyn List> {
        None
    }

    /// Mutable list view.
    fn as_list_mut(&mut self) -> Option<&mut dyn List> {
        None
    }

    /// Map view.
    fn as_map(&self) -> Option<&dyn Map> {
        None
    }

    /// Mutable map view.
    fn as_map_mut(&mut self) -> Option<&mut dyn Map> {
        None
    }

    /// Queue view. Queues are mutated through shared references.
    fn as_queue(&self) -> Option<&dyn Queue> {
        None
    }
}

/// Common prefix of every counted cell.
#[repr(C)]
#[derive(Debug)]
pub struct Header {
    refs: AtomicU32,
    kind: Kind,
    owns_memory: bool,
}

impl Header {
    const fn new(kind: Kind, owns_memory: bool) -> Self {
        Self {
            refs: AtomicU32::new(1),
            kind,
            owns_memory,
        }
    }
}

/// A counted cell: header first, body after it.
#[repr(C)]
pub struct ObjCell<T: ?Sized> {
    header: Header,
    body: T,
}

/// Raw pointer to a counted cell, as produced by [`Obj::into_raw`].
pub type RawObj = NonNull<ObjCell<dyn Object>>;

/// Caller-owned storage for a counted cell.
///
/// Values initialized in a slot are never freed by rif; the final release only
/// drops the body. The slot may be reused afterwards.
pub struct Slot<T> {
    cell: MaybeUninit<ObjCell<T>>,
}

impl<T: Object> Slot<T> {
    /// Empty storage.
    pub const fn new() -> Self {
        Self {
            cell: MaybeUninit::uninit(),
        }
    }
}

impl<T: Object> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Atomically counted handle to a value cell.
pub struct Obj {
    ptr: RawObj,
}

// SAFETY: bodies are `Send + Sync` and the count is atomic.
unsafe impl Send for Obj {}
unsafe impl Sync for Obj {}

impl Obj {
    /// Allocates a cell through the allocator hook, with a count of one.
    ///
    /// On allocation failure `body` is dropped, releasing anything it owns.
    pub fn new<T: Object>(body: T) -> Result<Obj> {
        let kind = body.kind();
        let Some(raw) = alloc::allocate(Layout::new::<ObjCell<T>>(), "VAL_NEW") else {
            return Err(Error::Memory);
        };
        let cell = raw.cast::<ObjCell<T>>();
        unsafe {
            cell.as_ptr().write(ObjCell {
                header: Header::new(kind, true),
                body,
            })
        };
        Ok(Obj { ptr: cell })
    }

    /// Initializes a cell in caller-owned storage, with a count of one.
    ///
    /// # Safety
    ///
    /// The slot must not be moved, reused or dropped while any handle derived
    /// from the returned one is alive.
    pub unsafe fn init<T: Object>(slot: &mut Slot<T>, body: T) -> Obj {
        let kind = body.kind();
        let cell = NonNull::from(&mut slot.cell).cast::<ObjCell<T>>();
        unsafe {
            cell.as_ptr().write(ObjCell {
                header: Header::new(kind, false),
                body,
            })
        };
        Obj { ptr: cell }
    }

    /// Gives up the handle without releasing it.
    pub fn into_raw(self) -> RawObj {
        let ptr = self.ptr;
        mem::forget(self);
        ptr
    }

    /// Rebuilds a handle from [`Obj::into_raw`], taking over its count.
    ///
    /// # Safety
    ///
    /// `ptr` must carry a count owned by the caller and point to a live cell.
    pub unsafe fn from_raw(ptr: RawObj) -> Obj {
        Obj { ptr }
    }

    /// Adds one to the count of a raw cell.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live cell.
    pub unsafe fn retain_raw(ptr: RawObj) -> RawObj {
        unsafe { ptr.as_ref() }
            .header
            .refs
            .fetch_add(1, Ordering::Relaxed);
        ptr
    }

    /// Drops one count of a raw cell.
    ///
    /// Returns `None` when this was the final count and the value has been
    /// destroyed. Otherwise returns `ptr` unchanged; in particular a cell whose
    /// count is already zero is left completely untouched.
    ///
    /// # Safety
    ///
    /// The cell memory behind `ptr` must still be valid, and the caller must
    /// own the count it gives up.
    pub unsafe fn release_raw(ptr: RawObj) -> Option<RawObj> {
        let refs = &unsafe { ptr.as_ref() }.header.refs;
        if refs.load(Ordering::Relaxed) == 0 {
            return Some(ptr);
        }
        if refs.fetch_sub(1, Ordering::Release) != 1 {
            return Some(ptr);
        }
        fence(Ordering::Acquire);
        unsafe { Self::destroy(ptr) };
        None
    }

    unsafe fn destroy(ptr: RawObj) {
        let cell = ptr.as_ptr();
        let layout = Layout::for_value(unsafe { &*cell });
        let owns_memory = unsafe { (*cell).header.owns_memory };
        unsafe { ptr::drop_in_place(&raw mut (*cell).body) };
        if owns_memory {
            unsafe { alloc::deallocate(ptr.cast(), layout) };
        }
    }

    #[inline]
    fn header(&self) -> &Header {
        unsafe { &self.ptr.as_ref().header }
    }

    /// Current count. Only a snapshot under concurrency.
    pub fn ref_count(&self) -> u32 {
        self.header().refs.load(Ordering::Acquire)
    }

    /// Kind recorded in the header.
    pub fn kind(&self) -> Kind {
        self.header().kind
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Obj) -> bool {
        ptr::addr_eq(self.ptr.as_ptr(), other.ptr.as_ptr())
    }

    /// Shared access to the body.
    pub fn body(&self) -> &dyn Object {
        unsafe { &self.ptr.as_ref().body }
    }

    /// Exclusive access to the body, available only while this is the sole
    /// handle.
    pub fn get_mut(&mut self) -> Option<&mut dyn Object> {
        if self.header().refs.load(Ordering::Acquire) == 1 {
            Some(unsafe { &mut (*self.ptr.as_ptr()).body })
        } else {
            None
        }
    }
}

impl Clone for Obj {
    #[inline]
    fn clone(&self) -> Self {
        Obj {
            ptr: unsafe { Obj::retain_raw(self.ptr) },
        }
    }
}

impl Drop for Obj {
    #[inline]
    fn drop(&mut self) {
        unsafe { Obj::release_raw(self.ptr) };
    }
}

/// A rif value.
///
/// Clone retains, drop releases. The singleton variants are never counted.
#[derive(Clone, Default)]
pub enum Val {
    /// The undefined singleton.
    #[default]
    Undef,
    /// The null singleton.
    Null,
    /// One of the two boolean singletons.
    Bool(bool),
    /// A counted value.
    Obj(Obj),
}

impl Val {
    /// New integer.
    pub fn int(value: i64) -> Result<Val> {
        Obj::new(Int::new(value)).map(Val::Obj)
    }

    /// New double.
    pub fn double(value: f64) -> Result<Val> {
        Obj::new(Double::new(value)).map(Val::Obj)
    }

    /// New string holding a copy of `value`.
    pub fn string(value: &str) -> Result<Val> {
        Obj::new(Str::new(value)).map(Val::Obj)
    }

    /// New pair taking over both members.
    pub fn pair(first: Val, second: Val) -> Result<Val> {
        Obj::new(Pair::new(first, second)).map(Val::Obj)
    }

    /// Wraps any body, typically a collection backend.
    pub fn object<T: Object>(body: T) -> Result<Val> {
        Obj::new(body).map(Val::Obj)
    }

    /// Initializes a value in caller-owned storage.
    ///
    /// # Safety
    ///
    /// See [`Obj::init`].
    pub unsafe fn init_in<T: Object>(slot: &mut Slot<T>, body: T) -> Val {
        Val::Obj(unsafe { Obj::init(slot, body) })
    }

    /// Type tag.
    pub fn kind(&self) -> Kind {
        match self {
            Val::Undef => Kind::Undef,
            Val::Null => Kind::Null,
            Val::Bool(_) => Kind::Bool,
            Val::Obj(obj) => obj.kind(),
        }
    }

    /// Reference count; always 0 for singletons.
    pub fn ref_count(&self) -> u32 {
        match self {
            Val::Obj(obj) => obj.ref_count(),
            _ => 0,
        }
    }

    /// Hash consistent with [`Val::equals`].
    pub fn hashcode(&self) -> u32 {
        match self {
            Val::Undef | Val::Null => 0,
            Val::Bool(value) => *value as u32,
            Val::Obj(obj) => obj.body().hashcode(),
        }
    }

    /// Identity first, then kind, then the kind's own comparison.
    pub fn equals(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Obj(a), Val::Obj(b)) => {
                a.ptr_eq(b) || (a.kind() == b.kind() && a.body().equals(b.body()))
            }
            (Val::Undef, Val::Undef) | (Val::Null, Val::Null) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            _ => false,
        }
    }

    /// Rendering; `None` for `Undef` and for values without one.
    pub fn tostring(&self) -> Option<String> {
        match self {
            Val::Undef => None,
            Val::Null => Some("NULL".to_owned()),
            Val::Bool(true) => Some("TRUE".to_owned()),
            Val::Bool(false) => Some("FALSE".to_owned()),
            Val::Obj(obj) => obj.body().tostring(),
        }
    }

    /// The counted handle, if any.
    pub fn as_obj(&self) -> Option<&Obj> {
        match self {
            Val::Obj(obj) => Some(obj),
            _ => None,
        }
    }

    /// Whether this is the null singleton.
    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    /// Boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Val::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer payload.
    pub fn as_int(&self) -> Option<i64> {
        self.downcast_ref::<Int>().map(Int::get)
    }

    /// Double payload.
    pub fn as_double(&self) -> Option<f64> {
        self.downcast_ref::<Double>().map(Double::get)
    }

    /// String payload.
    pub fn as_str(&self) -> Option<&str> {
        self.downcast_ref::<Str>().map(Str::as_str)
    }

    /// Pair members.
    pub fn as_pair(&self) -> Option<(&Val, &Val)> {
        self.downcast_ref::<Pair>().map(|pair| (pair.first(), pair.second()))
    }

    /// List view.
    pub fn as_list(&self) -> Option<&dyn List> {
        self.as_obj()?.body().as_list()
    }

    /// Map view.
    pub fn as_map(&self) -> Option<&dyn Map> {
        self.as_obj()?.body().as_map()
    }

    /// Queue view.
    pub fn as_queue(&self) -> Option<&dyn Queue> {
        self.as_obj()?.body().as_queue()
    }

    /// Mutable list view; `None` unless this handle is unique.
    pub fn as_list_mut(&mut self) -> Option<&mut dyn List> {
        match self {
            Val::Obj(obj) => obj.get_mut()?.as_list_mut(),
            _ => None,
        }
    }

    /// Mutable map view; `None` unless this handle is unique.
    pub fn as_map_mut(&mut self) -> Option<&mut dyn Map> {
        match self {
            Val::Obj(obj) => obj.get_mut()?.as_map_mut(),
            _ => None,
        }
    }

    /// The body as a concrete type.
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_obj()?.body().as_any().downcast_ref::<T>()
    }

    /// The body as a concrete mutable type; `None` unless this handle is
    /// unique.
    pub fn downcast_mut<T: Object>(&mut self) -> Option<&mut T> {
        match self {
            Val::Obj(obj) => obj.get_mut()?.as_any_mut().downcast_mut::<T>(),
            _ => None,
        }
    }
}

impl From<bool> for Val {
    fn from(value: bool) -> Self {
        Val::Bool(value)
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

// Identity is checked first, so every value equals itself, NaN included.
impl Eq for Val {}

impl Hash for Val {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hashcode());
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tostring() {
            Some(text) => f.write_str(&text),
            None => f.write_str(UNDEF_STR),
        }
    }
}

impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Val")
            .field(&self.kind())
            .field(&format_args!("{self}"))
            .finish()
    }
}

/// Equality where `None` stands for an absent value: two absent values are
/// equal, an absent and a present one are not.
pub fn equals(a: Option<&Val>, b: Option<&Val>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.equals(b),
        (None, None) => true,
        _ => false,
    }
}

/// Hash of a possibly absent value; 0 when absent.
pub fn hashcode(val: Option<&Val>) -> u32 {
    val.map_or(0, Val::hashcode)
}

/// Rendering of a possibly absent value; `None` when absent.
pub fn tostring(val: Option<&Val>) -> Option<String> {
    val?.tostring()
}
