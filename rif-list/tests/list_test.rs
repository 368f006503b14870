//! Behaviour both list backends must share.

use rif::hash::mix_32;
use rif::{Error, List, Val};
use rif_list::{ArrayList, LinkedList};

fn backends() -> Vec<(&'static str, Box<dyn List>)> {
    vec![
        ("array", Box::new(ArrayList::new(0, 4).unwrap())),
        ("linked", Box::new(LinkedList::new().unwrap())),
    ]
}

fn int(v: i64) -> Option<Val> {
    Some(Val::int(v).unwrap())
}

fn ints(list: &dyn List) -> Vec<Option<i64>> {
    list.iter().map(|v| v.and_then(Val::as_int)).collect()
}

#[test]
fn test_insert_append_prepend() {
    for (name, mut list) in backends() {
        list.append(int(2)).unwrap();
        list.prepend(int(0)).unwrap();
        list.insert(1, int(1)).unwrap();
        list.append(int(3)).unwrap();
        list.insert(4, int(4)).unwrap();
        assert_eq!(
            ints(&*list),
            vec![Some(0), Some(1), Some(2), Some(3), Some(4)],
            "{name}"
        );
        assert_eq!(list.size(), 5, "{name}");
        for index in 0..5 {
            assert_eq!(list.get(index).and_then(Val::as_int), Some(index as i64));
        }
        assert!(list.get(5).is_none(), "{name}");
    }
}

#[test]
fn test_out_of_bounds_leaves_list_unchanged() {
    for (name, mut list) in backends() {
        list.append(int(1)).unwrap();
        assert!(matches!(list.insert(2, int(9)), Err(Error::OutOfBounds)), "{name}");
        assert!(matches!(list.set(1, int(9)), Err(Error::OutOfBounds)), "{name}");
        assert!(matches!(list.remove(1), Err(Error::OutOfBounds)), "{name}");
        assert_eq!(ints(&*list), vec![Some(1)], "{name}");
    }
}

#[test]
fn test_remove_from_every_position() {
    for (name, mut list) in backends() {
        for v in 0..6 {
            list.append(int(v)).unwrap();
        }
        list.remove(5).unwrap();
        list.remove(0).unwrap();
        list.remove(2).unwrap();
        assert_eq!(ints(&*list), vec![Some(1), Some(2), Some(4)], "{name}");
        while list.size() > 0 {
            list.remove(0).unwrap();
        }
        assert!(list.iter().next().is_none(), "{name}");
        list.append(int(7)).unwrap();
        assert_eq!(ints(&*list), vec![Some(7)], "{name}");
    }
}

#[test]
fn test_absent_elements() {
    for (name, mut list) in backends() {
        list.append(None).unwrap();
        list.append(int(1)).unwrap();
        assert_eq!(list.size(), 2, "{name}");
        assert!(list.get(0).is_none(), "{name}");

        let mut iter = list.iter();
        assert!(iter.has_next());
        assert_eq!(iter.next(), Some(None));
        assert!(iter.has_next());
        assert!(iter.next().flatten().is_some());
        assert!(!iter.has_next(), "{name}");
    }
}

#[test]
fn test_release_on_set_remove_and_drop() {
    for (name, mut list) in backends() {
        let shared = Val::string("shared").unwrap();
        list.append(Some(shared.clone())).unwrap();
        list.append(Some(shared.clone())).unwrap();
        list.append(Some(shared.clone())).unwrap();
        assert_eq!(shared.ref_count(), 4, "{name}");

        list.set(0, int(0)).unwrap();
        assert_eq!(shared.ref_count(), 3, "{name}");
        list.remove(1).unwrap();
        assert_eq!(shared.ref_count(), 2, "{name}");
        drop(list);
        assert_eq!(shared.ref_count(), 1, "{name}");
    }
}

#[test]
fn test_hash_of_single_absent_element() {
    for (name, mut list) in backends() {
        list.append(None).unwrap();
        assert_eq!(list.hashcode(), mix_32(37, 31), "{name}");
    }
}

#[test]
fn test_empty_list_renders_brackets() {
    for (name, list) in backends() {
        assert_eq!(list.tostring().as_deref(), Some("[]"), "{name}");
        assert_eq!(list.hashcode(), 37, "{name}");
    }
}

#[test]
fn test_rendering() {
    for (name, mut list) in backends() {
        list.append(int(1)).unwrap();
        list.append(None).unwrap();
        list.append(Some(Val::string("x").unwrap())).unwrap();
        list.append(Some(Val::Null)).unwrap();
        assert_eq!(
            list.tostring().as_deref(),
            Some("[1, [UNDEF], \"x\", NULL]"),
            "{name}"
        );
    }
}

#[test]
fn test_backends_compare_equal_by_content() {
    let mut array = ArrayList::new(2, 2).unwrap();
    let mut linked = LinkedList::new().unwrap();
    for v in [int(1), None, Some(Val::string("two").unwrap())] {
        array.insert(array.len(), v.clone()).unwrap();
        linked.insert(linked.len(), v).unwrap();
    }
    let array = Val::object(array).unwrap();
    let linked = Val::object(linked).unwrap();
    assert_eq!(array, linked);
    assert_eq!(array.hashcode(), linked.hashcode());

    let mut shorter = LinkedList::new().unwrap();
    shorter.insert(0, int(1)).unwrap();
    assert_ne!(array, Val::object(shorter).unwrap());
}

#[test]
fn test_unique_list_value_is_mutable() {
    let mut list = Val::object(LinkedList::new().unwrap()).unwrap();
    list.as_list_mut().unwrap().append(int(1)).unwrap();
    let other = list.clone();
    assert!(list.as_list_mut().is_none());
    drop(other);
    assert_eq!(list.as_list().unwrap().size(), 1);
}

#[test]
fn test_array_list_grows_in_blocks() {
    let mut list = ArrayList::new(0, 8).unwrap();
    assert_eq!(list.capacity(), 0);
    list.insert(0, None).unwrap();
    assert_eq!(list.capacity(), 8);
    for _ in 0..8 {
        list.insert(list.len(), None).unwrap();
    }
    assert_eq!(list.capacity(), 16);
    list.ensure_capacity(17).unwrap();
    assert_eq!(list.capacity(), 24);
}

#[test]
fn test_fixed_array_list_refuses_growth() {
    let mut list = ArrayList::new(2, 0).unwrap();
    assert_eq!(list.capacity(), 2);
    list.insert(0, int(1)).unwrap();
    list.insert(1, int(2)).unwrap();
    assert!(matches!(list.insert(2, int(3)), Err(Error::Capacity)));
    assert_eq!(list.len(), 2);
    list.remove(0).unwrap();
    list.insert(0, int(0)).unwrap();
    assert_eq!(ints(&list), vec![Some(0), Some(2)]);
}

#[test]
fn test_huge_array_list_capacity_is_refused() {
    assert!(matches!(ArrayList::new(usize::MAX, 8), Err(Error::Capacity)));
    assert!(matches!(ArrayList::new(usize::MAX, 0), Err(Error::Capacity)));
    let mut list = ArrayList::new(0, 3).unwrap();
    assert!(matches!(list.ensure_capacity(usize::MAX - 1), Err(Error::Capacity)));
    assert_eq!(list.capacity(), 0);
}

#[test]
fn test_linked_list_reaches_both_halves() {
    let mut list = LinkedList::new().unwrap();
    for v in 0..100 {
        list.insert(list.len(), int(v)).unwrap();
    }
    for index in [0, 1, 49, 50, 51, 98, 99] {
        assert_eq!(list.get(index).and_then(Val::as_int), Some(index as i64));
    }
    list.insert(75, int(-1)).unwrap();
    assert_eq!(list.get(75).and_then(Val::as_int), Some(-1));
    assert_eq!(list.get(76).and_then(Val::as_int), Some(75));
}

#[test]
fn test_linked_list_reuses_nodes() {
    let mut list = LinkedList::new().unwrap();
    for round in 0..10 {
        for v in 0..50 {
            list.insert(0, int(v)).unwrap();
        }
        for _ in 0..50 {
            list.remove(list.len() - 1).unwrap();
        }
        assert!(list.is_empty(), "round {round}");
    }
}
