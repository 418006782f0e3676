//! Allocates far more cells than the heap's capacity without rooting any of
//! them, so every allocation past the first handful is immediately garbage.
//! A heap that failed to reclaim would call `std::process::exit(1)` from
//! `alloc_cell`, so simply finishing this test is the assertion that
//! collection keeps up with allocation pressure.

use rascheme::Heap;

#[test]
fn allocating_past_capacity_never_aborts() {
    let mut heap = Heap::new(64).expect("small heap still allocates");
    for i in 0..10_000i64 {
        let null = heap.null();
        let _unrooted = heap.cons(rascheme::value::Value::Fixnum(i), null);
    }
    assert!(heap.free_count() <= heap.capacity());
}

#[test]
fn a_rooted_chain_survives_collection() {
    let mut heap = Heap::new(256).expect("heap allocates");
    let mut list = heap.null();
    for i in 0..50i64 {
        heap.push_root(list);
        list = heap.cons(rascheme::value::Value::Fixnum(i), list);
        heap.pop_roots(1);
    }
    heap.push_root(list);
    for _ in 0..1000 {
        let null = heap.null();
        let _garbage = heap.cons(rascheme::value::Value::Fixnum(0), null);
    }
    assert_eq!(list.list_len(&heap), Some(50));
    heap.pop_roots(1);
}
