//! Robin Hood hash map backend for rif values.
//!
//! [`HashMap`] implements the [`rif::Map`] interface, so it can be wrapped in
//! a [`rif::Val`] and nested inside other values, or used directly.
//!
//! # Features
//!
//! - **Robin Hood probing**: even probe lengths and early-terminating misses.
//! - **Tombstone removal**: removal never moves other entries.
//! - **Fixed or growable**: a fixed map reports [`rif::Error::Capacity`]
//!   instead of reallocating.
//! - **Pluggable memory**: tables come from the [`rif::alloc`] hooks.
//!
//! # Example
//!
//! ```rust
//! use rif::Val;
//! use rif_map::HashMap;
//!
//! let mut map = Val::object(HashMap::new()).unwrap();
//! let entries = map.as_map_mut().unwrap();
//! entries.put(Val::int(1).unwrap(), Val::string("one").unwrap()).unwrap();
//! entries.put(Val::int(2).unwrap(), Val::string("two").unwrap()).unwrap();
//!
//! let view = map.as_map().unwrap();
//! assert_eq!(view.size(), 2);
//! assert_eq!(
//!     view.get(&Val::int(2).unwrap()).and_then(Val::as_str),
//!     Some("two")
//! );
//!
//! let mut cursor = view.cursor();
//! let mut seen = 0;
//! while let Some(pair) = cursor.next().unwrap() {
//!     assert!(pair.as_pair().is_some());
//!     seen += 1;
//! }
//! assert_eq!(seen, 2);
//! ```

#![warn(missing_docs)]

pub mod hashmap;

pub use hashmap::{HashMap, Iter, MIN_CAPACITY};
