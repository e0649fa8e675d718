//! On-pool layout of a list node.
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ value: u16   │ next: u64 (u64::MAX = none)  │
//! └──────────────┴──────────────────────────────┘
//!   2 bytes        8 bytes, both little endian
//! ```
//!
//! Pool regions carry no alignment guarantee, so both fields are read and
//! written unaligned.

use dataview::DataView;
use pool_allocator::Address;
use snafu::ensure;

use crate::error::{CorruptNodeSnafu, ListError};

const VALUE_OFFSET: usize = 0;
const NEXT_OFFSET: usize = size_of::<u16>();
const NO_NEXT: u64 = u64::MAX;

/// Bytes occupied by one node inside the pool.
pub const NODE_SIZE: usize = NEXT_OFFSET + size_of::<u64>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) value: u16,
    pub(crate) next: Option<Address>,
}

impl Node {
    /// Reads the node stored in `bytes`, the region allocated at `address`.
    pub(crate) fn load(address: Address, bytes: &[u8]) -> Result<Self, ListError> {
        ensure!(
            bytes.len() == NODE_SIZE,
            CorruptNodeSnafu {
                address,
                size: bytes.len()
            }
        );
        let view = DataView::from(bytes);
        let value = u16::from_le(view.read(VALUE_OFFSET));
        let next = match u64::from_le(view.read(NEXT_OFFSET)) {
            NO_NEXT => None,
            offset => usize::try_from(offset).ok().map(Address::from_offset),
        };
        Ok(Self { value, next })
    }

    pub(crate) fn store(self, address: Address, bytes: &mut [u8]) -> Result<(), ListError> {
        ensure!(
            bytes.len() == NODE_SIZE,
            CorruptNodeSnafu {
                address,
                size: bytes.len()
            }
        );
        let next = self
            .next
            .and_then(|address| u64::try_from(address.offset()).ok())
            .unwrap_or(NO_NEXT);
        let view = DataView::from_mut(bytes);
        view.write(VALUE_OFFSET, &self.value.to_le());
        view.write(NEXT_OFFSET, &next.to_le());
        Ok(())
    }
}
