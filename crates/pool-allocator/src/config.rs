/// Construction parameters for a [`Pool`](crate::Pool).
///
/// ```
/// use pool_allocator::PoolConfig;
///
/// let config = PoolConfig::new(4096).with_fill(0xa5);
/// assert_eq!(config.capacity(), 4096);
/// assert_eq!(config.fill(), Some(0xa5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolConfig {
    capacity: usize,
    fill: Option<u8>,
}

impl PoolConfig {
    /// A pool of `capacity` bytes whose buffer starts zeroed.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            fill: None,
        }
    }

    /// Writes `byte` over the whole buffer at initialization and over every
    /// region given back to the pool afterwards.
    #[must_use]
    pub const fn with_fill(self, byte: u8) -> Self {
        Self {
            fill: Some(byte),
            ..self
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn fill(&self) -> Option<u8> {
        self.fill
    }
}
