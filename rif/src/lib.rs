//! Rif: reference-counted polymorphic values for embedding in host programs.
//!
//! Values are either payload-free singletons (`Undef`, `Null`, `Bool`) or
//! atomically counted cells (integers, doubles, strings, pairs and the
//! collections provided by `rif-map`, `rif-list` and `rif-queue`). Every value
//! answers the same small protocol: hashcode, equality and a textual
//! rendering. Collections reach their elements through the [`List`], [`Map`]
//! and [`Queue`] interfaces.
//!
//! This crate also carries the memory plumbing the collections share:
//!
//! - [`alloc`]: a process-wide allocator override.
//! - [`PagedPool`]: a single-threaded page allocator with a FIFO free list.
//! - [`queue_base`]: a lock-free intrusive stack immune to ABA.
//! - [`ConcurrentPool`]: a thread-caching pool built from the two above.
//!
//! # Example
//!
//! ```rust
//! use rif::Val;
//!
//! let answer = Val::int(42).unwrap();
//! let pair = Val::pair(Val::string("answer").unwrap(), answer.clone()).unwrap();
//!
//! assert_eq!(answer.ref_count(), 2);
//! assert_eq!(pair.tostring().as_deref(), Some("(\"answer\", 42)"));
//!
//! drop(pair);
//! assert_eq!(answer.ref_count(), 1);
//! ```

#![warn(missing_docs)]

pub mod alloc;
pub mod collection;
pub mod concurrent_pool;
mod error;
pub mod hash;
pub mod paged_pool;
pub mod pool;
pub mod queue_base;
pub mod scalar;
pub mod val;

pub use collection::{List, ListIter, Map, MapCursor, Queue};
pub use concurrent_pool::ConcurrentPool;
pub use error::{Error, Result};
pub use paged_pool::PagedPool;
pub use pool::{Pool, PoolConfig};
pub use val::{Kind, Obj, Object, Slot, Val};
