//! ForwardList running on a fixed-capacity HumbleAllocator.

use std::mem;

use humble_arena::HumbleAllocator;
use humble_core::AllocError;
use humble_list::{ForwardList, Node};
use humble_test_utils::{CountingAllocator, Lifecycle, Tracked, Unclonable};

type Ten<T> = HumbleAllocator<T, 10>;

fn full_list() -> ForwardList<i32, Ten<i32>> {
    ForwardList::try_from_iter_in(0..10, Ten::new()).unwrap()
}

#[test]
fn ten_elements_fit_and_clone_equal() {
    let list = full_list();
    assert_eq!(list.len(), 10);
    assert_eq!(list.max_size(), 10);

    let copy = list.clone();
    assert_eq!(list, copy);
    assert_ne!(list.allocator(), copy.allocator());
    assert_eq!(copy.iter().copied().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
}

#[test]
fn eleventh_push_is_refused() {
    let mut list = full_list();
    let err = list.push_back(10).unwrap_err();
    assert!(err.is_out_of_memory());
    assert_eq!(list.len(), 10);
    assert_eq!(list.back(), Some(&9));
}

#[test]
fn popping_does_not_make_room() {
    let mut list = full_list();
    assert_eq!(list.pop_front(), Some(0));
    assert_eq!(list.pop_back(), Some(9));
    assert_eq!(
        list.push_back(42),
        Err(AllocError::OutOfMemory {
            requested: mem::size_of::<Node<i32>>(),
            available: 0,
        })
    );
    let stats = list.allocator().stats().unwrap();
    assert_eq!(stats.allocations, 10);
    assert_eq!(stats.deallocations, 2);
    assert_eq!(stats.forfeited_bytes(), 2 * mem::size_of::<Node<i32>>());
}

#[test]
fn block_is_sized_for_nodes() {
    let list = full_list();
    let block = list.allocator().block().unwrap();
    assert_eq!(block.capacity(), 10 * mem::size_of::<Node<i32>>());
    assert_eq!(block.size(), block.capacity());
}

#[test]
fn cleared_list_leaves_block_empty_but_exhausted() {
    let mut list = full_list();
    list.clear();
    let block = list.allocator().block().unwrap();
    assert!(block.is_empty());
    assert_eq!(block.remaining(), 0);
    assert!(list.push_back(1).is_err());
}

#[test]
fn take_moves_in_constant_time() {
    let life = Lifecycle::new();
    let alloc = CountingAllocator::new(Ten::<Tracked>::new());
    let counts = alloc.counts();
    let mut source = ForwardList::new_in(alloc);
    for i in 0..10 {
        source.push_back(Tracked::new(i, &life)).unwrap();
    }
    let block = source.allocator().inner().block_id();
    let calls = counts.total();

    let moved = mem::take(&mut source);

    assert!(source.is_empty());
    assert!(!source.allocator().inner().is_instantiated());
    assert_eq!(moved.len(), 10);
    assert_eq!(moved.allocator().inner().block_id(), block);
    assert_eq!(counts.total(), calls);
    assert_eq!(life.clones(), 0);
    assert_eq!(life.drops(), 0);

    drop(moved);
    assert_eq!(life.drops(), 10);
}

#[test]
fn swap_exchanges_chains() {
    let mut a = ForwardList::try_from_iter_in([1, 2], Ten::new()).unwrap();
    let mut b = ForwardList::try_from_iter_in([3], Ten::new()).unwrap();
    let (id_a, id_b) = (a.allocator().block_id(), b.allocator().block_id());
    mem::swap(&mut a, &mut b);
    assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![3]);
    assert_eq!(b.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(a.allocator().block_id(), id_b);
    assert_eq!(b.allocator().block_id(), id_a);
}

#[test]
fn emplace_builds_unclonable_values() {
    let mut list: ForwardList<Unclonable, Ten<Unclonable>> = ForwardList::new_in(Ten::new());
    list.emplace_back_with(|| Unclonable::new("first", 1)).unwrap();
    list.emplace_back_with(|| Unclonable::new("second", 2)).unwrap();
    let labels: Vec<_> = list.iter().map(|u| (u.label, u.num)).collect();
    assert_eq!(labels, vec![("first", 1), ("second", 2)]);
}

#[test]
fn refused_emplace_never_runs_constructor() {
    let mut list: ForwardList<Unclonable, HumbleAllocator<Unclonable, 1>> =
        ForwardList::new_in(HumbleAllocator::new());
    list.emplace_back_with(|| Unclonable::new("only", 0)).unwrap();
    let mut called = false;
    let result = list.emplace_back_with(|| {
        called = true;
        Unclonable::new("never", 1)
    });
    assert!(result.is_err());
    assert!(!called);
}

#[test]
fn sharing_lists_draw_from_one_block() {
    let mut first = ForwardList::try_from_iter_in(0..6, Ten::new()).unwrap();
    let mut second = first.new_sharing();
    assert_eq!(first.allocator(), second.allocator());
    assert_eq!(first.allocator().share_count(), 2);

    second.try_extend(0..4).unwrap();
    assert!(second.push_back(4).is_err());
    assert!(first.push_back(6).is_err());

    drop(first);
    assert_eq!(second.allocator().share_count(), 1);
    assert_eq!(second.len(), 4);
}

#[test]
fn clone_of_full_list_does_not_compete_for_capacity() {
    let list = full_list();
    let copy = list.try_clone().unwrap();
    assert_eq!(list.allocator().share_count(), 1);
    assert_eq!(copy.allocator().share_count(), 1);
}

#[test]
fn clone_into_too_small_allocator_fails() {
    let list = full_list();
    let err = ForwardList::<i32, HumbleAllocator<i32, 4>>::try_from_iter_in(
        list.iter().copied(),
        HumbleAllocator::new(),
    )
    .unwrap_err();
    assert!(err.is_out_of_memory());
}

#[test]
fn heap_and_humble_lists_compare_by_contents() {
    let humble = full_list();
    let heap: ForwardList<i32> = ForwardList::try_from_iter_in(0..10, Default::default()).unwrap();
    assert!(humble == heap);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn pushes_succeed_until_capacity(values in proptest::collection::vec(any::<i32>(), 0..20)) {
            let mut list: ForwardList<i32, Ten<i32>> = ForwardList::new_in(Ten::new());
            for (i, v) in values.iter().enumerate() {
                let result = list.push_back(*v);
                prop_assert_eq!(result.is_ok(), i < 10);
            }
            let kept: Vec<i32> = list.iter().copied().collect();
            prop_assert_eq!(&kept[..], &values[..values.len().min(10)]);
        }

        #[test]
        fn removals_never_restore_capacity(
            pushes in 1usize..=10,
            pops in 0usize..10,
        ) {
            let mut list: ForwardList<u8, Ten<u8>> = ForwardList::new_in(Ten::new());
            for i in 0..pushes {
                list.push_back(i as u8).unwrap();
            }
            for _ in 0..pops.min(pushes) {
                list.pop_front();
            }
            let extra = (0..10).filter(|_| list.push_back(0).is_ok()).count();
            prop_assert_eq!(extra, 10 - pushes);
        }
    }
}
