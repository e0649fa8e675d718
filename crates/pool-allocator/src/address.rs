use derive_more::Display;

/// Position of a region's first byte inside a [`Pool`](crate::Pool).
///
/// Addresses are offsets into the backing buffer, not machine pointers. They
/// are only meaningful for the pool that produced them and only until the
/// region is freed or the pool is deinitialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{_0:#x}")]
pub struct Address(usize);

impl Address {
    /// Wraps a raw offset.
    ///
    /// Any offset can be wrapped; the pool rejects the ones that do not
    /// start a block.
    #[must_use]
    pub const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_hex_offset() {
        assert_eq!(Address::from_offset(0).to_string(), "0x0");
        assert_eq!(Address::from_offset(48).to_string(), "0x30");
    }

    #[test]
    fn orders_by_offset() {
        assert!(Address::from_offset(4) < Address::from_offset(16));
        assert_eq!(Address::from_offset(7).offset(), 7);
    }
}
