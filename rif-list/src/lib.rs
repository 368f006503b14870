//! List backends for rif values.
//!
//! Both [`ArrayList`] and [`LinkedList`] implement [`rif::List`]: elements are
//! `Option<Val>`, so a list may hold absent entries. Inserting at an index
//! past the end, or setting/removing at or past the end, reports
//! [`rif::Error::OutOfBounds`] and leaves the list untouched.
//!
//! ```rust
//! use rif::{List, Val};
//! use rif_list::LinkedList;
//!
//! let mut list = LinkedList::new().unwrap();
//! List::append(&mut list, Some(Val::int(2).unwrap())).unwrap();
//! List::prepend(&mut list, Some(Val::int(1).unwrap())).unwrap();
//! List::append(&mut list, None).unwrap();
//!
//! let list = Val::object(list).unwrap();
//! assert_eq!(list.tostring().as_deref(), Some("[1, 2, [UNDEF]]"));
//! ```

#![warn(missing_docs)]

pub mod arraylist;
pub mod linkedlist;

pub use arraylist::ArrayList;
pub use linkedlist::LinkedList;
