//! Read-only views of the descriptor chain.

use core::fmt;

use derive_more::IsVariant;
use spin::MutexGuard;

use crate::{Address, chain, pool::PoolState};

/// Whether a block is handed out or available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant)]
pub enum BlockState {
    Free,
    Used,
}

/// One entry of a [`Status`] listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockInfo {
    address: Address,
    size: usize,
    state: BlockState,
}

impl BlockInfo {
    pub(crate) const fn new(address: Address, size: usize, state: BlockState) -> Self {
        Self {
            address,
            size,
            state,
        }
    }

    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn state(&self) -> BlockState {
        self.state
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        self.state.is_free()
    }
}

/// Lazy listing of every block in address order.
///
/// The pool stays locked while a `Status` is alive, so the listing can be
/// walked lazily and any number of times with a consistent result. Drop it
/// before calling back into the pool from the same thread.
pub struct Status<'pool> {
    guard: MutexGuard<'pool, Option<PoolState>>,
}

impl<'pool> Status<'pool> {
    pub(crate) fn new(guard: MutexGuard<'pool, Option<PoolState>>) -> Self {
        Self { guard }
    }

    /// Iterates over the blocks in address order.
    ///
    /// Yields nothing when the pool is not initialized.
    #[must_use]
    pub fn iter(&self) -> Blocks<'_> {
        Blocks {
            inner: self.guard.as_ref().map(|state| state.chain.iter()),
        }
    }

    /// Returns `true` when the pool is not initialized; a live pool always
    /// has at least one block.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guard.is_none()
    }
}

impl fmt::Debug for Status<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a Status<'_> {
    type Item = BlockInfo;
    type IntoIter = Blocks<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`Status::iter`].
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    inner: Option<chain::Iter<'a>>,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next()
    }
}

/// Aggregate accounting of a live pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolStats {
    pub capacity: usize,
    pub used_bytes: usize,
    pub free_bytes: usize,
    pub blocks: usize,
    pub free_blocks: usize,
    pub largest_free: usize,
}

impl PoolStats {
    pub(crate) fn collect<I>(capacity: usize, blocks: I) -> Self
    where
        I: IntoIterator<Item = BlockInfo>,
    {
        let mut stats = Self {
            capacity,
            used_bytes: 0,
            free_bytes: 0,
            blocks: 0,
            free_blocks: 0,
            largest_free: 0,
        };
        for block in blocks {
            stats.blocks += 1;
            if block.is_free() {
                stats.free_blocks += 1;
                stats.free_bytes += block.size();
                stats.largest_free = stats.largest_free.max(block.size());
            } else {
                stats.used_bytes += block.size();
            }
        }
        stats
    }
}
