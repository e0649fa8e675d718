use derive_more::IsVariant;
use snafu::Snafu;
use snafu_utils::{Located, Location};

use crate::Address;

/// Failure of a pool operation.
///
/// A failed operation leaves the pool exactly as it was before the call.
#[derive(Debug, Snafu, IsVariant)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum PoolError {
    #[snafu(display("memory pool is not initialized"))]
    NotInitialized {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("memory pool is already initialized with {capacity} bytes"))]
    AlreadyInitialized {
        capacity: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("no free block can hold {requested} bytes"))]
    AllocationExhausted {
        requested: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("no allocated block starts at {address}"))]
    InvalidPointer {
        address: Address,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("size must be greater than zero"))]
    ZeroSize {
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for PoolError {
    fn location(&self) -> Location {
        match self {
            Self::NotInitialized { location }
            | Self::AlreadyInitialized { location, .. }
            | Self::AllocationExhausted { location, .. }
            | Self::InvalidPointer { location, .. }
            | Self::ZeroSize { location } => *location,
        }
    }
}
