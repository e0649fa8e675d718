use alloc::vec::Vec;
use core::{fmt, ops::Range};

use log::{debug, trace, warn};
use snafu::{OptionExt as _, ensure};
use spin::Mutex;

use crate::{
    Address, PoolConfig,
    chain::{DescriptorChain, Release},
    error::{
        AllocationExhaustedSnafu, AlreadyInitializedSnafu, NotInitializedSnafu, PoolError,
        ZeroSizeSnafu,
    },
    status::{PoolStats, Status},
};

/// A memory pool serving sub-allocations out of one reserved buffer.
///
/// The pool starts uninitialized. [`initialize`](Self::initialize) reserves
/// the buffer, [`deinitialize`](Self::deinitialize) releases it again:
///
/// ```text
/// Uninitialized --initialize--> Live --deinitialize--> Uninitialized
/// ```
///
/// Every operation locks the whole pool for its duration, so a `Pool` can be
/// shared freely between threads, including through a `static`.
pub struct Pool {
    state: Mutex<Option<PoolState>>,
}

pub(crate) struct PoolState {
    buffer: Vec<u8>,
    pub(crate) chain: DescriptorChain,
    fill: Option<u8>,
}

impl PoolState {
    fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let capacity = config.capacity();
        ensure!(capacity > 0, ZeroSizeSnafu);

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .ok()
            .context(AllocationExhaustedSnafu {
                requested: capacity,
            })?;
        // dropping `buffer` on failure below gives the reservation back
        let chain = DescriptorChain::new(capacity)?;
        buffer.resize(capacity, config.fill().unwrap_or(0));

        Ok(Self {
            buffer,
            chain,
            fill: config.fill(),
        })
    }

    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn scrub(&mut self, region: Range<usize>) {
        if let Some(byte) = self.fill {
            self.buffer[region].fill(byte);
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Pool");
        match self.state.try_lock() {
            Some(state) => debug.field("capacity", &state.as_ref().map(PoolState::capacity)),
            None => debug.field("capacity", &format_args!("<locked>")),
        };
        debug.finish()
    }
}

impl Pool {
    /// Creates an uninitialized pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    /// Reserves a zeroed buffer of `capacity` bytes as one free block.
    ///
    /// # Examples
    ///
    /// ```
    /// use pool_allocator::Pool;
    ///
    /// let pool = Pool::new();
    /// pool.initialize(100).unwrap();
    /// assert!(pool.initialize(200).unwrap_err().is_already_initialized());
    /// assert_eq!(pool.capacity(), Some(100));
    /// ```
    #[track_caller]
    pub fn initialize(&self, capacity: usize) -> Result<(), PoolError> {
        self.initialize_with(PoolConfig::new(capacity))
    }

    /// Reserves the buffer described by `config` as one free block.
    ///
    /// Fails with [`PoolError::AlreadyInitialized`] if the pool is live, in
    /// which case the live pool is left untouched.
    #[track_caller]
    pub fn initialize_with(&self, config: PoolConfig) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        if let Some(live) = state.as_ref() {
            warn!(
                "rejecting initialization of {} bytes: pool already holds {} bytes",
                config.capacity(),
                live.capacity()
            );
            return AlreadyInitializedSnafu {
                capacity: live.capacity(),
            }
            .fail();
        }

        *state = Some(PoolState::new(config)?);
        debug!("memory pool initialized with {} bytes", config.capacity());
        Ok(())
    }

    /// Releases the buffer and every block descriptor.
    ///
    /// Addresses handed out before this call become meaningless. Calling this
    /// on an uninitialized pool does nothing.
    pub fn deinitialize(&self) {
        let mut state = self.state.lock();
        match state.take() {
            Some(live) => debug!("memory pool of {} bytes released", live.capacity()),
            None => trace!("deinitialize on an uninitialized pool ignored"),
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Returns the capacity of the live pool.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.state.lock().as_ref().map(PoolState::capacity)
    }

    /// Hands out the first free block, in address order, holding at least
    /// `size` bytes.
    ///
    /// Larger blocks are split and only `size` bytes are taken. A zero `size`
    /// does not allocate anything; it behaves like
    /// [`peek_free`](Self::peek_free).
    ///
    /// # Examples
    ///
    /// ```
    /// use pool_allocator::Pool;
    ///
    /// let pool = Pool::new();
    /// pool.initialize(16).unwrap();
    /// let a = pool.allocate(10).unwrap();
    /// assert_eq!(a.offset(), 0);
    /// assert!(pool.allocate(10).unwrap_err().is_allocation_exhausted());
    /// ```
    #[track_caller]
    pub fn allocate(&self, size: usize) -> Result<Address, PoolError> {
        self.with_live(|live| {
            let address = Address::from_offset(live.chain.allocate(size)?);
            if size > 0 {
                debug!("allocated {size} bytes at {address}");
            }
            Ok(address)
        })
    }

    /// Returns the address of the first free block without allocating it.
    ///
    /// The answer is only a hint: the block may be taken by another thread as
    /// soon as this call returns.
    #[track_caller]
    pub fn peek_free(&self) -> Result<Address, PoolError> {
        self.with_live(|live| live.chain.peek_free().map(Address::from_offset))
    }

    /// Gives the block starting at `address` back to the pool.
    ///
    /// Adjacent free blocks are merged immediately. Addresses that do not
    /// start an allocated block are ignored, so freeing twice or freeing a
    /// foreign address is harmless. The only error is
    /// [`PoolError::NotInitialized`].
    #[track_caller]
    pub fn free(&self, address: Address) -> Result<(), PoolError> {
        self.with_live(|live| {
            match live.chain.release(address.offset()) {
                Release::Released(region) => {
                    debug!("freed {} bytes at {address}", region.len());
                    live.scrub(region);
                }
                Release::AlreadyFree => trace!("block at {address} is already free"),
                Release::Unknown => warn!("ignoring free of unknown address {address}"),
            }
            Ok(())
        })
    }

    /// Changes the size of the allocated block at `address` without moving
    /// it.
    ///
    /// Shrinking always succeeds and gives the tail back to the pool. Growing
    /// only succeeds when the following block is free and large enough;
    /// otherwise [`PoolError::AllocationExhausted`] is returned and nothing
    /// changes. Data is never copied.
    ///
    /// # Examples
    ///
    /// ```
    /// use pool_allocator::Pool;
    ///
    /// let pool = Pool::new();
    /// pool.initialize(100).unwrap();
    /// let a = pool.allocate(50).unwrap();
    /// assert_eq!(pool.resize(a, 20).unwrap(), a);
    /// assert_eq!(pool.resize(a, 50).unwrap(), a);
    /// assert!(pool.resize(a, 200).unwrap_err().is_allocation_exhausted());
    /// ```
    #[track_caller]
    pub fn resize(&self, address: Address, new_size: usize) -> Result<Address, PoolError> {
        self.with_live(|live| {
            if let Some(released) = live.chain.resize(address.offset(), new_size)? {
                live.scrub(released);
            }
            debug!("resized block at {address} to {new_size} bytes");
            Ok(address)
        })
    }

    /// Runs `f` on the bytes of the allocated block starting at `address`.
    ///
    /// The pool is locked while `f` runs; `f` must not call back into this
    /// pool.
    #[track_caller]
    pub fn with_region<F, R>(&self, address: Address, f: F) -> Result<R, PoolError>
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        self.with_live(|live| {
            let region = live.chain.used_region(address.offset())?;
            Ok(f(&mut live.buffer[region]))
        })
    }

    /// Lists every block in address order.
    ///
    /// The listing is empty when the pool is not initialized. The pool stays
    /// locked until the returned [`Status`] is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use pool_allocator::Pool;
    ///
    /// let pool = Pool::new();
    /// assert_eq!(pool.status().iter().count(), 0);
    ///
    /// pool.initialize(64).unwrap();
    /// pool.allocate(16).unwrap();
    /// let sizes = pool
    ///     .status()
    ///     .iter()
    ///     .map(|block| (block.size(), block.is_free()))
    ///     .collect::<Vec<_>>();
    /// assert_eq!(sizes, [(16, false), (48, true)]);
    /// ```
    pub fn status(&self) -> Status<'_> {
        Status::new(self.state.lock())
    }

    #[track_caller]
    pub fn stats(&self) -> Result<PoolStats, PoolError> {
        self.with_live(|live| Ok(PoolStats::collect(live.capacity(), live.chain.iter())))
    }

    #[track_caller]
    fn with_live<F, T>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(&mut PoolState) -> Result<T, PoolError>,
    {
        let mut state = self.state.lock();
        let live = state.as_mut().context(NotInitializedSnafu)?;
        f(live)
    }
}
