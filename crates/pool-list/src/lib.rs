//! A singly linked list whose nodes live inside a [`Pool`].
//!
//! Every node is a small region allocated from the pool. The list itself only
//! keeps the address of the first node; links between nodes are stored in the
//! pool bytes. The list relies on nothing but the pool's ownership contract: an
//! address handed out by [`Pool::allocate`] stays valid and exclusively ours
//! until we [`Pool::free`] it.
//!
//! # Usage Example
//!
//! ```rust
//! use pool_allocator::Pool;
//! use pool_list::PoolList;
//!
//! let pool = Pool::new();
//! pool.initialize(256).unwrap();
//!
//! let mut list = PoolList::new(&pool);
//! let first = list.push_back(1).unwrap();
//! list.push_back(3).unwrap();
//! list.insert_after(first, 2).unwrap();
//! assert_eq!(list.to_vec().unwrap(), [1, 2, 3]);
//!
//! assert!(list.remove(2).unwrap());
//! assert_eq!(list.len(), 2);
//!
//! list.clear().unwrap();
//! assert_eq!(pool.status().iter().count(), 1);
//! ```

#![cfg_attr(not(test), no_std)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

use alloc::vec::Vec;

use log::trace;
use pool_allocator::{Address, Pool};
use snafu::{ResultExt as _, ensure};

pub use self::{error::ListError, node::NODE_SIZE};
use self::{
    error::{NodeNotFoundSnafu, PoolSnafu},
    node::Node,
};

mod error;
mod node;

/// Handle to one node of a [`PoolList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(Address);

impl NodeRef {
    #[must_use]
    pub const fn address(self) -> Address {
        self.0
    }
}

/// Singly linked list of `u16` values stored in a [`Pool`].
///
/// Nodes stay allocated until they are removed or the list is
/// [cleared](Self::clear). Dropping the list does not touch the pool.
#[derive(Debug)]
pub struct PoolList<'pool> {
    pool: &'pool Pool,
    head: Option<Address>,
    len: usize,
}

impl<'pool> PoolList<'pool> {
    /// Creates an empty list backed by `pool`.
    #[must_use]
    pub const fn new(pool: &'pool Pool) -> Self {
        Self {
            pool,
            head: None,
            len: 0,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value` at the end of the list.
    pub fn push_back(&mut self, value: u16) -> Result<NodeRef, ListError> {
        let tail = self.last()?;
        let address = self.allocate(Node { value, next: None })?;
        match tail {
            Some(tail) => self.link_after(tail, address)?,
            None => self.head = Some(address),
        }
        Ok(NodeRef(address))
    }

    /// Inserts `value` right after `node`.
    pub fn insert_after(&mut self, node: NodeRef, value: u16) -> Result<NodeRef, ListError> {
        ensure!(
            self.contains(node)?,
            NodeNotFoundSnafu {
                address: node.address()
            }
        );
        let next = self.load(node.address())?.next;
        let address = self.allocate(Node { value, next })?;
        self.link_after(node.address(), address)?;
        Ok(NodeRef(address))
    }

    /// Inserts `value` right before `node`.
    pub fn insert_before(&mut self, node: NodeRef, value: u16) -> Result<NodeRef, ListError> {
        let target = node.address();
        if self.head == Some(target) {
            let address = self.allocate(Node {
                value,
                next: Some(target),
            })?;
            self.head = Some(address);
            return Ok(NodeRef(address));
        }

        let mut cursor = self.head;
        while let Some(current) = cursor {
            let next = self.load(current)?.next;
            if next == Some(target) {
                let address = self.allocate(Node {
                    value,
                    next: Some(target),
                })?;
                self.link_after(current, address)?;
                return Ok(NodeRef(address));
            }
            cursor = next;
        }
        NodeNotFoundSnafu { address: target }.fail()
    }

    /// Unlinks and frees the first node holding `value`.
    ///
    /// Returns `false` when no node holds it.
    pub fn remove(&mut self, value: u16) -> Result<bool, ListError> {
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(current) = cursor {
            let node = self.load(current)?;
            if node.value == value {
                match prev {
                    Some(prev) => self.set_next(prev, node.next)?,
                    None => self.head = node.next,
                }
                self.pool.free(current).context(PoolSnafu)?;
                self.len -= 1;
                trace!("removed {value} from list node at {current}");
                return Ok(true);
            }
            prev = Some(current);
            cursor = node.next;
        }
        Ok(false)
    }

    /// Returns the first node holding `value`.
    pub fn find(&self, value: u16) -> Result<Option<NodeRef>, ListError> {
        for entry in self.nodes() {
            let (address, node) = entry?;
            if node.value == value {
                return Ok(Some(NodeRef(address)));
            }
        }
        Ok(None)
    }

    /// Returns the value held by `node`.
    ///
    /// Fails with [`ListError::NodeNotFound`] once `node` has been removed.
    pub fn value(&self, node: NodeRef) -> Result<u16, ListError> {
        ensure!(
            self.contains(node)?,
            NodeNotFoundSnafu {
                address: node.address()
            }
        );
        Ok(self.load(node.address())?.value)
    }

    /// Iterates over the values from front to back.
    pub fn iter(&self) -> Iter<'_, 'pool> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    pub fn to_vec(&self) -> Result<Vec<u16>, ListError> {
        self.iter().collect()
    }

    /// Frees every node and leaves the list empty.
    pub fn clear(&mut self) -> Result<(), ListError> {
        while let Some(head) = self.head {
            let next = self.load(head)?.next;
            self.pool.free(head).context(PoolSnafu)?;
            self.head = next;
            self.len -= 1;
        }
        Ok(())
    }

    fn contains(&self, node: NodeRef) -> Result<bool, ListError> {
        for entry in self.nodes() {
            if entry?.0 == node.address() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn last(&self) -> Result<Option<Address>, ListError> {
        let mut last = None;
        for entry in self.nodes() {
            last = Some(entry?.0);
        }
        Ok(last)
    }

    fn nodes(&self) -> Nodes<'_, 'pool> {
        Nodes {
            list: self,
            cursor: self.head,
        }
    }

    fn allocate(&mut self, node: Node) -> Result<Address, ListError> {
        let address = self.pool.allocate(NODE_SIZE).context(PoolSnafu)?;
        if let Err(err) = self.store(address, node) {
            self.pool.free(address).context(PoolSnafu)?;
            return Err(err);
        }
        self.len += 1;
        trace!("list node for {} allocated at {address}", node.value);
        Ok(address)
    }

    /// Links the freshly allocated `address` after `prev`, freeing it again
    /// if the link cannot be written.
    fn link_after(&mut self, prev: Address, address: Address) -> Result<(), ListError> {
        if let Err(err) = self.set_next(prev, Some(address)) {
            self.pool.free(address).context(PoolSnafu)?;
            self.len -= 1;
            return Err(err);
        }
        Ok(())
    }

    fn load(&self, address: Address) -> Result<Node, ListError> {
        self.pool
            .with_region(address, |bytes| Node::load(address, bytes))
            .context(PoolSnafu)?
    }

    fn store(&self, address: Address, node: Node) -> Result<(), ListError> {
        self.pool
            .with_region(address, |bytes| node.store(address, bytes))
            .context(PoolSnafu)?
    }

    fn set_next(&self, address: Address, next: Option<Address>) -> Result<(), ListError> {
        let node = self.load(address)?;
        self.store(address, Node { next, ..node })
    }
}

impl<'list, 'pool> IntoIterator for &'list PoolList<'pool> {
    type Item = Result<u16, ListError>;
    type IntoIter = Iter<'list, 'pool>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`PoolList::iter`].
///
/// Yields an error and stops if the pool can no longer be read.
#[derive(Debug)]
pub struct Iter<'list, 'pool> {
    list: &'list PoolList<'pool>,
    cursor: Option<Address>,
}

impl Iterator for Iter<'_, '_> {
    type Item = Result<u16, ListError>;

    fn next(&mut self) -> Option<Self::Item> {
        let address = self.cursor.take()?;
        let node = self.list.load(address);
        if let Ok(node) = &node {
            self.cursor = node.next;
        }
        Some(node.map(|node| node.value))
    }
}

struct Nodes<'list, 'pool> {
    list: &'list PoolList<'pool>,
    cursor: Option<Address>,
}

impl Iterator for Nodes<'_, '_> {
    type Item = Result<(Address, Node), ListError>;

    fn next(&mut self) -> Option<Self::Item> {
        let address = self.cursor.take()?;
        let node = self.list.load(address);
        if let Ok(node) = &node {
            self.cursor = node.next;
        }
        Some(node.map(|node| (address, node)))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    fn with_test_list<F>(capacity: usize, test_fn: F)
    where
        F: FnOnce(&Pool, &mut PoolList<'_>),
    {
        let pool = Pool::new();
        pool.initialize(capacity).unwrap();
        let mut list = PoolList::new(&pool);
        test_fn(&pool, &mut list);
        list.clear().unwrap();
        assert_eq!(pool.stats().unwrap().used_bytes, 0);
    }

    #[test]
    fn test_push_back_keeps_order() {
        with_test_list(256, |pool, list| {
            for value in [5, 1, 4] {
                list.push_back(value).unwrap();
            }
            assert_eq!(list.to_vec().unwrap(), [5, 1, 4]);
            assert_eq!(list.len(), 3);
            assert_eq!(pool.stats().unwrap().used_bytes, 3 * NODE_SIZE);
        });
    }

    #[test]
    fn test_insert_before_head_and_middle() {
        with_test_list(256, |_, list| {
            let one = list.push_back(1).unwrap();
            let three = list.push_back(3).unwrap();
            list.insert_before(three, 2).unwrap();
            list.insert_before(one, 0).unwrap();
            assert_eq!(list.to_vec().unwrap(), [0, 1, 2, 3]);
        });
    }

    #[test]
    fn test_insert_relative_to_foreign_node() {
        with_test_list(256, |pool, list| {
            list.push_back(1).unwrap();
            let stranger = NodeRef(pool.allocate(NODE_SIZE).unwrap());

            assert!(list.insert_after(stranger, 2).unwrap_err().is_node_not_found());
            assert!(list.insert_before(stranger, 2).unwrap_err().is_node_not_found());
            assert_eq!(list.len(), 1);

            pool.free(stranger.address()).unwrap();
        });
    }

    #[test]
    fn test_remove_and_find() {
        with_test_list(256, |_, list| {
            for value in [1, 2, 3, 2] {
                list.push_back(value).unwrap();
            }
            let second = list.find(2).unwrap().unwrap();
            assert_eq!(list.value(second).unwrap(), 2);

            assert!(list.remove(2).unwrap());
            assert_eq!(list.to_vec().unwrap(), [1, 3, 2]);
            assert!(list.remove(1).unwrap());
            assert!(!list.remove(9).unwrap());
            assert_eq!(list.to_vec().unwrap(), [3, 2]);
            assert_eq!(list.find(9).unwrap(), None);
        });
    }

    #[test]
    fn test_value_of_removed_node() {
        with_test_list(64, |pool, list| {
            let one = list.push_back(1).unwrap();
            assert_eq!(list.value(one).unwrap(), 1);
            assert!(list.remove(1).unwrap());

            // the freed bytes come back as a larger block at the same address
            let other = pool.allocate(2 * NODE_SIZE).unwrap();
            assert_eq!(other, one.address());
            assert!(list.value(one).unwrap_err().is_node_not_found());

            pool.free(other).unwrap();
        });
    }

    #[test]
    fn test_failed_link_frees_new_node() {
        with_test_list(64, |pool, list| {
            let address = list.allocate(Node { value: 1, next: None }).unwrap();
            assert_eq!(list.len(), 1);

            let err = list
                .link_after(Address::from_offset(NODE_SIZE), address)
                .unwrap_err();
            assert!(matches!(
                err,
                ListError::Pool { ref source, .. } if source.is_invalid_pointer()
            ));
            assert_eq!(list.len(), 0);
            assert_eq!(pool.stats().unwrap().used_bytes, 0);
        });
    }

    #[test]
    fn test_exhausted_pool_leaves_list_intact() {
        with_test_list(2 * NODE_SIZE, |_, list| {
            list.push_back(1).unwrap();
            list.push_back(2).unwrap();
            let err = list.push_back(3).unwrap_err();
            assert!(matches!(
                err,
                ListError::Pool { ref source, .. } if source.is_allocation_exhausted()
            ));
            assert_eq!(list.to_vec().unwrap(), [1, 2]);
        });
    }
}
