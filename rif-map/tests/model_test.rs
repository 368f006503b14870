//! Model-based checks against `std::collections::HashMap`.

use std::collections::HashMap as StdMap;

use proptest::prelude::*;
use rif::Val;
use rif_map::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Put(i64, i64),
    Remove(i64),
    Get(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..64i64, any::<i64>()).prop_map(|(k, v)| Op::Put(k, v)),
        2 => (0..64i64).prop_map(Op::Remove),
        1 => (0..64i64).prop_map(Op::Get),
    ]
}

fn int(v: i64) -> Val {
    Val::int(v).unwrap()
}

proptest! {
    #[test]
    fn behaves_like_std_map(ops in prop::collection::vec(op(), 1..400)) {
        let mut map = HashMap::new();
        let mut model = StdMap::new();

        for op in ops {
            match op {
                Op::Put(k, v) => {
                    map.put(int(k), int(v)).unwrap();
                    model.insert(k, v);
                }
                Op::Remove(k) => {
                    map.remove(&int(k)).unwrap();
                    model.remove(&k);
                }
                Op::Get(k) => {
                    prop_assert_eq!(map.get(&int(k)).and_then(Val::as_int), model.get(&k).copied());
                }
            }
            prop_assert_eq!(map.len(), model.len());
        }

        for (k, v) in &model {
            prop_assert_eq!(map.get(&int(*k)).and_then(Val::as_int), Some(*v));
        }
        prop_assert_eq!(map.iter().count(), model.len());
    }

    #[test]
    fn fixed_map_never_loses_entries(keys in prop::collection::vec(0..1_000i64, 1..64)) {
        let mut map = HashMap::with_capacity(32, true).unwrap();
        let mut model = StdMap::new();
        for k in keys {
            match map.put(int(k), int(k)) {
                Ok(()) => { model.insert(k, k); }
                Err(rif::Error::Capacity) => {}
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
        prop_assert_eq!(map.capacity(), 64);
        for k in model.keys() {
            prop_assert!(map.exists(&int(*k)));
        }
    }
}
