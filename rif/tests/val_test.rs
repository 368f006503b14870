use rif::hash::{hash_64, mix_32};
use rif::{Kind, Val};

#[test]
fn test_singleton_rendering_and_hashes() {
    assert_eq!(Val::Null.tostring().as_deref(), Some("NULL"));
    assert_eq!(Val::Bool(true).tostring().as_deref(), Some("TRUE"));
    assert_eq!(Val::Bool(false).tostring().as_deref(), Some("FALSE"));
    assert_eq!(Val::Undef.tostring(), None);

    assert_eq!(Val::Null.hashcode(), 0);
    assert_eq!(Val::Undef.hashcode(), 0);
    assert_eq!(Val::Bool(false).hashcode(), 0);
    assert_eq!(Val::Bool(true).hashcode(), 1);
}

#[test]
fn test_kinds() {
    assert_eq!(Val::Undef.kind(), Kind::Undef);
    assert_eq!(Val::from(true).kind(), Kind::Bool);
    assert_eq!(Val::int(1).unwrap().kind(), Kind::Int);
    assert_eq!(Val::double(1.0).unwrap().kind(), Kind::Double);
    assert_eq!(Val::string("x").unwrap().kind(), Kind::String);
    assert_eq!(
        Val::pair(Val::Null, Val::Null).unwrap().kind(),
        Kind::Pair
    );
}

#[test]
fn test_int_semantics() {
    let a = Val::int(-7).unwrap();
    let b = Val::int(-7).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.hashcode(), b.hashcode());
    assert_eq!(a.hashcode(), hash_64((-7i64 as u64).wrapping_mul(13)));
    assert_eq!(a.tostring().as_deref(), Some("-7"));
    assert_eq!(a.as_int(), Some(-7));
    assert_ne!(a, Val::int(7).unwrap());
}

#[test]
fn test_double_rendering() {
    let render = |v: f64| Val::double(v).unwrap().tostring().unwrap();
    assert_eq!(render(3.0), "3.0");
    assert_eq!(render(-2.0), "-2.0");
    assert_eq!(render(0.25), "0.25");
    assert_eq!(render(f64::NAN), "nan.0");
    assert_eq!(render(f64::INFINITY), "inf.0");
    assert_eq!(render(f64::NEG_INFINITY), "-inf.0");
    assert_eq!(render(1e20), "1e+20.0");
    assert_eq!(render(1.5e-7), "1.5e-07");
    assert_eq!(render(0.1 + 0.2), "0.3");
    assert_eq!(render(0.0001), "0.0001");
    assert_eq!(render(1e15), "1000000000000000.0");
    assert_eq!(render(1e16), "1e+16.0");
    assert_eq!(render(-0.0), "-0.0");
    assert_eq!(render(123.456), "123.456");
}

#[test]
fn test_double_equality_and_hash() {
    let zero = Val::double(0.0).unwrap();
    let negative_zero = Val::double(-0.0).unwrap();
    assert_eq!(zero, negative_zero);
    assert_eq!(zero.hashcode(), negative_zero.hashcode());

    let nan = Val::double(f64::NAN).unwrap();
    assert_ne!(nan, Val::double(f64::NAN).unwrap());
    // Identity wins over the float comparison.
    assert_eq!(nan, nan.clone());
}

#[test]
fn test_int_and_double_never_compare_equal() {
    assert_ne!(Val::int(1).unwrap(), Val::double(1.0).unwrap());
}

#[test]
fn test_string_semantics() {
    let a = Val::string("hello").unwrap();
    let b = Val::string("hello").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.hashcode(), b.hashcode());
    assert_eq!(a.tostring().as_deref(), Some("\"hello\""));
    assert_eq!(a.as_str(), Some("hello"));
    assert_ne!(a, Val::string("world").unwrap());

    let expected = "hello".bytes().fold(0, |h, c| mix_32(h, c as u32));
    assert_eq!(a.hashcode(), expected);
    assert_eq!(Val::string("").unwrap().hashcode(), 0);
}

#[test]
fn test_pair_semantics() {
    let key = Val::string("k").unwrap();
    let value = Val::int(2).unwrap();
    let pair = Val::pair(key.clone(), value.clone()).unwrap();
    assert_eq!(key.ref_count(), 2);
    assert_eq!(value.ref_count(), 2);

    let (first, second) = pair.as_pair().unwrap();
    assert_eq!(first, &key);
    assert_eq!(second, &value);
    assert_eq!(pair.tostring().as_deref(), Some("(\"k\", 2)"));
    assert_eq!(
        pair.hashcode(),
        mix_32(key.hashcode(), value.hashcode()).wrapping_mul(11)
    );

    let same = Val::pair(Val::string("k").unwrap(), Val::int(2).unwrap()).unwrap();
    assert_eq!(pair, same);

    drop(pair);
    assert_eq!(key.ref_count(), 1);
    assert_eq!(value.ref_count(), 1);
}

#[test]
fn test_pair_without_rendering_has_none() {
    let pair = Val::pair(Val::Undef, Val::Null).unwrap();
    assert_eq!(pair.tostring(), None);
    assert_eq!(format!("{pair}"), "[UNDEF]");
}

#[test]
fn test_null_safe_helpers() {
    let one = Val::int(1).unwrap();
    assert!(rif::val::equals(None, None));
    assert!(!rif::val::equals(Some(&one), None));
    assert!(rif::val::equals(Some(&one), Some(&Val::int(1).unwrap())));
    assert_eq!(rif::val::hashcode(None), 0);
    assert_eq!(rif::val::tostring(None), None);
    assert_eq!(rif::val::tostring(Some(&one)).as_deref(), Some("1"));
}

#[test]
fn test_values_are_usable_as_std_keys() {
    let mut seen = std::collections::HashSet::new();
    seen.insert(Val::string("a").unwrap());
    seen.insert(Val::string("a").unwrap());
    seen.insert(Val::int(1).unwrap());
    assert_eq!(seen.len(), 2);

    let nan = Val::double(f64::NAN).unwrap();
    assert!(seen.insert(nan.clone()));
    assert!(!seen.insert(nan));
    assert_eq!(seen.len(), 3);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_concurrent_retain_release() {
    use std::thread;

    let shared = Val::string("shared").unwrap();
    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..10_000 {
                    let copy = shared.clone();
                    assert!(copy.ref_count() >= 2);
                    drop(copy);
                }
            });
        }
    });
    assert_eq!(shared.ref_count(), 1);
}
