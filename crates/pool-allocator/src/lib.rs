//! A user-space memory pool allocator.
//!
//! A [`Pool`] reserves one contiguous buffer up front and serves
//! sub-allocations out of it without going back to the platform allocator.
//! Free and used regions are tracked by a chain of block descriptors kept
//! outside the buffer.
//!
//! # Algorithm
//!
//! - **Allocation**: first fit. The descriptor chain is walked in address
//!   order and the first free block large enough is taken, split into a used
//!   prefix and a free remainder when it is larger than requested.
//! - **Free**: the block is marked free and merged with free neighbours on
//!   both sides, so no two adjacent blocks are ever both free.
//! - **Resize**: blocks shrink in place, and grow in place into a free
//!   successor. Nothing is ever moved or copied.
//!
//! # Usage Example
//!
//! ```rust
//! use pool_allocator::{Pool, PoolConfig};
//!
//! static POOL: Pool = Pool::new();
//!
//! POOL.initialize_with(PoolConfig::new(1024)).unwrap();
//!
//! let a = POOL.allocate(64).unwrap();
//! POOL.with_region(a, |bytes| bytes.fill(0xab)).unwrap();
//!
//! let b = POOL.allocate(128).unwrap();
//! assert!(a < b);
//!
//! POOL.free(a).unwrap();
//! POOL.free(b).unwrap();
//! assert_eq!(POOL.status().iter().count(), 1);
//!
//! POOL.deinitialize();
//! ```
//!
//! # Performance Characteristics
//!
//! | Operation  | Cost                          |
//! |------------|-------------------------------|
//! | `allocate` | O(n) in the number of blocks  |
//! | `free`     | O(n) in the number of blocks  |
//! | `resize`   | O(n) in the number of blocks  |
//!
//! # Thread Safety
//!
//! [`Pool`] is `Send + Sync`. A single spin lock guards the buffer and the
//! descriptor chain together, and every operation holds it from start to end.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod address;
mod chain;
mod config;
mod error;
mod pool;
mod status;

pub use self::{
    address::Address,
    config::PoolConfig,
    error::PoolError,
    pool::Pool,
    status::{BlockInfo, BlockState, Blocks, PoolStats, Status},
};
