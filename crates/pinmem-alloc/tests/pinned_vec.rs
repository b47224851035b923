//! Container behaviour over the mock runtime, for every supported element
//! type.

use pinmem_alloc::{pinned_vec, AllocVec, BufferError};
use pinmem_test_utils::{MockRuntime, MockVec};

macro_rules! element_type_tests {
    ($($module:ident => $t:ty),+ $(,)?) => {$(
        mod $module {
            use super::*;

            #[test]
            fn init_with_values() {
                let rt = MockRuntime::new();
                let v = pinned_vec![in rt.alloc::<$t>(); 1 as $t, 2 as $t, 3 as $t].unwrap();
                assert_eq!(v.len(), 3);
                assert_eq!(v.capacity(), 3);
                assert_eq!(v, [1 as $t, 2 as $t, 3 as $t]);
            }

            #[test]
            fn init_with_size_and_value() {
                let rt = MockRuntime::new();
                let v = MockVec::<$t>::from_elem_in(3, 8 as $t, rt.alloc()).unwrap();
                assert_eq!(v.len(), 3);
                assert_eq!(v.capacity(), 3);
                assert_eq!(rt.acquire_count(), 1);
                assert_eq!(rt.live_bytes(), 3 * std::mem::size_of::<$t>());
                assert!(v.iter().all(|&x| x == 8 as $t));
            }

            #[test]
            fn push_back_regrows() {
                let rt = MockRuntime::new();
                let mut v = MockVec::<$t>::new_in(rt.alloc());
                for i in 0..17 {
                    v.try_push(i as $t).unwrap();
                }
                assert_eq!(v.len(), 17);
                assert!(v.capacity() >= 17);
                for (i, x) in v.iter().enumerate() {
                    assert_eq!(*x, i as $t);
                }
                assert!(rt.acquire_count() > 1);
                assert_eq!(rt.live_allocations(), 1);
                drop(v);
                assert_eq!(rt.live_allocations(), 0);
                assert_eq!(rt.acquire_count(), rt.release_count());
            }

            #[test]
            fn with_capacity_then_fill() {
                let rt = MockRuntime::new();
                let mut v = MockVec::<$t>::with_capacity_in(64, rt.alloc()).unwrap();
                for i in 0..64 {
                    v.try_push(i as $t).unwrap();
                }
                assert_eq!(v.len(), 64);
                assert_eq!(v.capacity(), 64);
                assert_eq!(rt.acquire_count(), 1);
            }
        }
    )+};
}

element_type_tests! {
    f32_elements => f32,
    f64_elements => f64,
    i8_elements => i8,
    u8_elements => u8,
    i16_elements => i16,
    u16_elements => u16,
    i32_elements => i32,
    u32_elements => u32,
    i64_elements => i64,
    u64_elements => u64,
}

#[test]
fn with_capacity_allocates_eagerly_and_exactly_once() {
    let rt = MockRuntime::new();
    let v = MockVec::<u32>::with_capacity_in(1000, rt.alloc()).unwrap();
    assert_eq!(v.len(), 0);
    assert_eq!(v.capacity(), 1000);
    assert_eq!(rt.acquire_count(), 1);
    assert_eq!(rt.live_bytes(), 4000);
    assert!(rt.is_live(v.as_ptr()));
}

#[test]
fn construction_failure_leaves_nothing_behind() {
    let rt = MockRuntime::exhausted();
    let err = MockVec::<f32>::with_capacity_in(16, rt.alloc()).unwrap_err();
    assert_eq!(err.message, "out of memory");
    assert_eq!(err.requested_bytes, 64);
    assert_eq!(rt.live_allocations(), 0);

    let err = MockVec::<f32>::from_elem_in(16, 1.0, rt.alloc()).unwrap_err();
    assert_eq!(err.message, "out of memory");
    let err = pinned_vec![in rt.alloc::<u8>(); 1, 2, 3].unwrap_err();
    assert_eq!(err.requested_bytes, 3);
}

#[test]
fn growth_failure_leaves_container_unchanged() {
    let rt = MockRuntime::new();
    let mut v = MockVec::<i64>::with_capacity_in(4, rt.alloc()).unwrap();
    for i in 0..4 {
        v.try_push(i).unwrap();
    }
    let ptr_before = v.as_ptr();
    rt.fail_acquire_after(0);

    let err = v.try_push(4).unwrap_err();
    assert!(matches!(err, BufferError::Allocation(_)));
    assert_eq!(err.message(), "out of memory");
    assert_eq!(v.len(), 4);
    assert_eq!(v.capacity(), 4);
    assert_eq!(v.as_ptr(), ptr_before);
    assert_eq!(v, [0, 1, 2, 3]);
    assert!(rt.is_live(ptr_before));

    rt.allow_acquire();
    v.try_push(4).unwrap();
    assert_eq!(v, [0, 1, 2, 3, 4]);
    assert!(!rt.is_live(ptr_before));
}

#[test]
fn release_failure_during_growth_keeps_new_buffer() {
    let rt = MockRuntime::new();
    let mut v = MockVec::<u16>::from_slice_in(&[1, 2], rt.alloc()).unwrap();
    rt.fail_releases(true);

    let err = v.try_push(3).unwrap_err();
    assert!(matches!(err, BufferError::Deallocation(_)));
    assert_eq!(err.message(), "invalid argument");
    assert_eq!(v, [1, 2]);
    assert!(v.capacity() > 2);
    assert!(rt.is_live(v.as_ptr()));

    // Room is already there now.
    v.try_push(3).unwrap();
    assert_eq!(v, [1, 2, 3]);
    rt.fail_releases(false);
}

#[test]
fn free_reports_release_failure() {
    let rt = MockRuntime::new();
    let v = MockVec::<u8>::from_elem_in(10, 0, rt.alloc()).unwrap();
    rt.fail_releases(true);
    let err = v.free().unwrap_err();
    assert_eq!(err.message, "invalid argument");
    rt.fail_releases(false);
}

#[test]
fn free_releases_exactly_once() {
    let rt = MockRuntime::new();
    let v = MockVec::<u8>::from_elem_in(10, 0, rt.alloc()).unwrap();
    v.free().unwrap();
    assert_eq!(rt.release_count(), 1);
    assert_eq!(rt.live_allocations(), 0);
}

#[test]
fn empty_container_never_touches_runtime() {
    let rt = MockRuntime::exhausted();
    let v = MockVec::<f64>::new_in(rt.alloc());
    assert!(v.is_empty());
    drop(v);
    let v = MockVec::<f64>::with_capacity_in(0, rt.alloc()).unwrap();
    v.free().unwrap();
    assert_eq!(rt.acquire_count(), 0);
    assert_eq!(rt.release_count(), 0);
}

#[test]
fn elements_are_dropped_once() {
    use std::rc::Rc;

    let rt = MockRuntime::new();
    let token = Rc::new(());
    let mut v = MockVec::<Rc<()>>::new_in(rt.alloc());
    for _ in 0..10 {
        v.try_push(Rc::clone(&token)).unwrap();
    }
    assert_eq!(Rc::strong_count(&token), 11);
    v.truncate(4);
    assert_eq!(Rc::strong_count(&token), 5);
    let popped = v.pop();
    assert_eq!(Rc::strong_count(&token), 5);
    drop(popped);
    assert_eq!(Rc::strong_count(&token), 4);
    drop(v);
    assert_eq!(Rc::strong_count(&token), 1);
    assert_eq!(rt.live_allocations(), 0);
}

#[test]
fn extend_clone_and_compare() {
    let rt = MockRuntime::new();
    let mut v = MockVec::<i32>::new_in(rt.alloc());
    v.try_extend_from_slice(&[5, 6, 7]).unwrap();
    v.try_extend_from_slice(&[8]).unwrap();
    let copy = v.try_clone().unwrap();
    assert_eq!(copy, v);
    assert_ne!(copy.as_ptr(), v.as_ptr());
    assert_eq!(copy, vec![5, 6, 7, 8]);
    assert_eq!(format!("{copy:?}"), "[5, 6, 7, 8]");
    assert_eq!(rt.live_allocations(), 2);
}

#[test]
fn reserve_exact_and_push_within_capacity() {
    let rt = MockRuntime::new();
    let mut v = MockVec::<u8>::new_in(rt.alloc());
    v.reserve_exact(3).unwrap();
    assert_eq!(v.capacity(), 3);
    for b in [1, 2, 3] {
        v.push_within_capacity(b).unwrap();
    }
    assert_eq!(v.push_within_capacity(4), Err(4));
    v.reserve(1).unwrap();
    assert!(v.capacity() >= 6);
}

#[test]
fn indexing_and_iteration_through_slices() {
    let rt = MockRuntime::new();
    let mut v = AllocVec::try_from_iter_in(0..10u32, rt.alloc()).unwrap();
    v[3] = 30;
    for x in &mut v {
        *x += 1;
    }
    let total: u32 = (&v).into_iter().sum();
    assert_eq!(v[3], 31);
    assert_eq!(total, (1..=10).sum::<u32>() - 4 + 31);
    v.clear();
    assert!(v.is_empty());
    assert!(v.capacity() >= 10);
}

#[test]
#[should_panic]
fn out_of_range_index_panics() {
    let rt = MockRuntime::new();
    let v = MockVec::<u8>::from_elem_in(2, 0, rt.alloc()).unwrap();
    let _ = v[2];
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn with_capacity_filled_has_requested_size(count in 0usize..2048) {
            let rt = MockRuntime::new();
            let mut v = MockVec::<i8>::with_capacity_in(count, rt.alloc()).unwrap();
            for i in 0..count {
                v.try_push(i as i8).unwrap();
            }
            prop_assert_eq!(v.len(), count);
            prop_assert!(v.capacity() >= count);
            prop_assert_eq!(rt.acquire_count(), usize::from(count > 0));
        }

        #[test]
        fn from_elem_fills_every_slot(count in 0usize..1024, value in any::<u32>()) {
            let rt = MockRuntime::new();
            let v = MockVec::from_elem_in(count, value, rt.alloc()).unwrap();
            prop_assert_eq!(v.len(), count);
            prop_assert!(v.iter().all(|&x| x == value));
        }

        #[test]
        fn pushes_keep_order_and_release_everything(values in proptest::collection::vec(any::<f64>(), 0..300)) {
            let rt = MockRuntime::new();
            let mut v = MockVec::new_in(rt.alloc());
            for &x in &values {
                v.try_push(x).unwrap();
            }
            prop_assert_eq!(v.len(), values.len());
            prop_assert!(v.iter().zip(&values).all(|(a, b)| a.to_bits() == b.to_bits()));
            prop_assert!(rt.live_allocations() <= 1);
            drop(v);
            prop_assert_eq!(rt.live_allocations(), 0);
            prop_assert_eq!(rt.acquire_count(), rt.release_count());
        }
    }
}
