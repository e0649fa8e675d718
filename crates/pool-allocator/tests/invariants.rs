#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]
#![cfg(test)]

mod common;

use pool_allocator::{Address, Pool};
use proptest::prelude::*;

use self::common::{check_invariants, shape};

const CAPACITY: usize = 512;

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    Free(usize),
    Resize(usize, usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1usize..=96).prop_map(Op::Allocate),
        2 => any::<usize>().prop_map(Op::Free),
        2 => (any::<usize>(), 1usize..=128).prop_map(|(pick, size)| Op::Resize(pick, size)),
    ]
}

/// Replays `ops`, keeping track of the live allocations.
fn replay(pool: &Pool, ops: &[Op]) -> Vec<(Address, usize)> {
    let mut live = Vec::<(Address, usize)>::new();
    for op in ops {
        let before = shape(pool);
        match *op {
            Op::Allocate(size) => match pool.allocate(size) {
                Ok(address) => live.push((address, size)),
                Err(err) => {
                    assert!(err.is_allocation_exhausted());
                    assert_eq!(shape(pool), before);
                }
            },
            Op::Free(pick) if !live.is_empty() => {
                let (address, _) = live.swap_remove(pick % live.len());
                pool.free(address).unwrap();
            }
            Op::Resize(pick, size) if !live.is_empty() => {
                let index = pick % live.len();
                let (address, _) = live[index];
                match pool.resize(address, size) {
                    Ok(resized) => {
                        assert_eq!(resized, address);
                        live[index].1 = size;
                    }
                    Err(err) => {
                        assert!(err.is_allocation_exhausted());
                        assert_eq!(shape(pool), before);
                    }
                }
            }
            Op::Free(_) | Op::Resize(..) => {}
        }
        let used = check_invariants(pool);
        assert_eq!(used, live.iter().map(|(_, size)| size).sum::<usize>());
    }
    live
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_operations_keep_invariants(ops in prop::collection::vec(arb_op(), 1..80)) {
        let pool = Pool::new();
        pool.initialize(CAPACITY).unwrap();
        let live = replay(&pool, &ops);

        for (address, _) in live {
            pool.free(address).unwrap();
            check_invariants(&pool);
        }
        prop_assert_eq!(shape(&pool).len(), 1);
        prop_assert!(shape(&pool)[0].2.is_free());
    }

    #[test]
    fn allocate_then_free_restores_shape(
        ops in prop::collection::vec(arb_op(), 0..40),
        pick in any::<usize>(),
    ) {
        let pool = Pool::new();
        pool.initialize(CAPACITY).unwrap();
        let _live = replay(&pool, &ops);

        let largest = pool.stats().unwrap().largest_free;
        prop_assume!(largest > 0);
        let size = pick % largest + 1;

        let before = shape(&pool);
        let address = pool.allocate(size).unwrap();
        pool.free(address).unwrap();
        prop_assert_eq!(shape(&pool), before);
    }
}

#[test]
fn first_fit_takes_first_large_enough_region() {
    let pool = Pool::new();
    pool.initialize(40).unwrap();

    // lay out free regions of 10, 5 and 20 bytes separated by used ones
    let sizes = [10, 1, 5, 1, 20, 3];
    let addresses = sizes
        .iter()
        .map(|&size| pool.allocate(size).unwrap())
        .collect::<Vec<_>>();
    for index in [0, 2, 4] {
        pool.free(addresses[index]).unwrap();
    }

    let a = pool.allocate(5).unwrap();
    assert_eq!(a, addresses[0]);
    let blocks = shape(&pool);
    assert_eq!(blocks[0].1, 5);
    assert!(blocks[0].2.is_used());
    assert_eq!(blocks[1].1, 5);
    assert!(blocks[1].2.is_free());
    check_invariants(&pool);
}

#[test]
fn exhaustion_leaves_chain_unchanged() {
    let pool = Pool::new();
    pool.initialize(16).unwrap();
    let before = shape(&pool);
    assert!(pool.allocate(32).unwrap_err().is_allocation_exhausted());
    assert_eq!(shape(&pool), before);
}

#[test]
fn shrink_next_to_used_block_leaves_exact_tail() {
    let pool = Pool::new();
    pool.initialize(100).unwrap();
    let a = pool.allocate(50).unwrap();
    let _b = pool.allocate(50).unwrap();

    pool.resize(a, 20).unwrap();
    let blocks = shape(&pool);
    assert_eq!((blocks[1].0, blocks[1].1), (20, 30));
    assert!(blocks[1].2.is_free());

    pool.resize(a, 50).unwrap();
    let blocks = shape(&pool);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].1, 50);
    assert!(blocks[0].2.is_used());
}
