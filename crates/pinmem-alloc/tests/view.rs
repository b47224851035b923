//! Zero-copy views over pinned containers.

use pinmem_alloc::{pinned_vec, Contiguous, ContiguousMut, ZeroCopyView, ZeroCopyViewMut};
use pinmem_test_utils::{MockRuntime, MockVec};

#[test]
fn view_aliases_container_storage() {
    let rt = MockRuntime::new();
    let v = pinned_vec![in rt.alloc(); 1i32, 2, 3, 4].unwrap();
    let view = v.view();
    assert_eq!(view.as_ptr(), v.as_ptr());
    assert_eq!(view.shape(), [4]);
    assert_eq!(view.strides(), [4]);
    assert_eq!(view.nbytes(), 16);
    assert_eq!(view.as_slice(), &[1, 2, 3, 4]);
    assert!(rt.is_live(view.as_ptr()));
}

#[test]
fn writes_through_container_are_visible_in_next_view() {
    let rt = MockRuntime::new();
    let mut v = MockVec::<f32>::from_elem_in(3, 0.0, rt.alloc()).unwrap();
    v[1] = 2.5;
    let view = v.view();
    assert_eq!(view.as_slice()[1], 2.5);
}

#[test]
fn writes_through_mutable_view_land_in_container() {
    let rt = MockRuntime::new();
    let mut v = MockVec::<i16>::from_elem_in(4, 0, rt.alloc()).unwrap();
    let addr = v.as_ptr();
    {
        let mut view = v.view_mut();
        assert_eq!(view.as_ptr(), addr);
        assert_eq!(view.shape(), [4]);
        view.as_mut_slice()[0] = -7;
        view.as_mut_slice()[3] = 300;
    }
    assert_eq!(v, [-7, 0, 0, 300]);
    assert_eq!(v.as_ptr(), addr);
    assert_eq!(rt.acquire_count(), 1);
}

#[test]
fn mutable_view_through_trait_matches_inherent_view() {
    let rt = MockRuntime::new();
    let mut v = pinned_vec![in rt.alloc(); 1u8, 2, 3].unwrap();
    let addr = v.as_ptr();
    let mut view = ZeroCopyViewMut::of(&mut v);
    assert_eq!(view.as_ptr(), addr);
    view.as_mut_slice().reverse();
    assert_eq!(ContiguousMut::view_mut(&mut v).as_slice(), &[3, 2, 1]);
    assert_eq!(v.view().as_ptr(), addr);
}

#[test]
fn growth_moves_storage_so_views_must_be_retaken() {
    // The borrow checker forbids holding a view across `try_push`; the
    // raw address shows why.
    let rt = MockRuntime::new();
    let mut v = MockVec::<u8>::from_slice_in(&[1, 2], rt.alloc()).unwrap();
    let before = v.view().as_ptr();
    v.try_push(3).unwrap();
    let after = v.view();
    assert_ne!(after.as_ptr(), before);
    assert!(!rt.is_live(before));
    assert_eq!(after.as_slice(), &[1, 2, 3]);
}

#[test]
fn contiguous_trait_covers_pinned_and_plain_containers() {
    fn total<C: Contiguous<u64> + ?Sized>(c: &C) -> u64 {
        c.as_contiguous().iter().sum()
    }
    let rt = MockRuntime::new();
    let pinned = pinned_vec![in rt.alloc(); 1u64, 2, 3].unwrap();
    let plain = vec![1u64, 2, 3];
    assert_eq!(total(&pinned), total(&plain));
    assert_eq!(ZeroCopyView::of(&pinned).len(), 3);
    assert_eq!(total(&[5u64, 6][..]), 11);
}

#[test]
fn empty_container_gives_empty_view() {
    let rt = MockRuntime::new();
    let v = MockVec::<f64>::new_in(rt.alloc());
    let view = v.view();
    assert!(view.is_empty());
    assert_eq!(view.shape(), [0]);
    assert_eq!(view.nbytes(), 0);
}
