use pool_allocator::{BlockState, Pool};

/// `(offset, size, state)` for every block.
pub fn shape(pool: &Pool) -> Vec<(usize, usize, BlockState)> {
    pool.status()
        .iter()
        .map(|block| (block.address().offset(), block.size(), block.state()))
        .collect()
}

/// Checks coverage and the no-adjacent-free rule, returns the used bytes.
pub fn check_invariants(pool: &Pool) -> usize {
    let capacity = pool.capacity().expect("pool must be initialized");
    let mut expected_start = 0;
    let mut prev_free = false;
    let mut used = 0;
    for (start, size, state) in shape(pool) {
        assert_eq!(start, expected_start, "gap or overlap at {start:#x}");
        assert!(size > 0, "empty block at {start:#x}");
        assert!(
            !(prev_free && state.is_free()),
            "adjacent free blocks at {start:#x}"
        );
        if state.is_used() {
            used += size;
        }
        expected_start = start + size;
        prev_free = state.is_free();
    }
    assert_eq!(expected_start, capacity, "blocks do not cover the pool");
    used
}
