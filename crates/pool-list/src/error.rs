use derive_more::IsVariant;
use pool_allocator::{Address, PoolError};
use snafu::Snafu;
use snafu_utils::{Located, Location};

#[derive(Debug, Snafu, IsVariant)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ListError {
    #[snafu(display("pool operation failed"))]
    Pool {
        #[snafu(source)]
        source: PoolError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("node at {address} is not part of the list"))]
    NodeNotFound {
        address: Address,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("region at {address} holds {size} bytes, not a list node"))]
    CorruptNode {
        address: Address,
        size: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for ListError {
    fn location(&self) -> Location {
        match self {
            Self::Pool { location, .. }
            | Self::NodeNotFound { location, .. }
            | Self::CorruptNode { location, .. } => *location,
        }
    }
}
