//! Block descriptor chain.
//!
//! The chain partitions the pool into contiguous regions, each described by a
//! [`Descriptor`]. Descriptors form a singly linked list ordered by start
//! offset. They live in a slot table owned by the chain, never inside the pool
//! bytes they describe, so descriptor bookkeeping never eats into the pool
//! capacity.
//!
//! # Algorithm
//!
//! - **Allocation**: first fit. The list is walked from the head and the first
//!   free descriptor large enough wins. A larger block is split into a used
//!   prefix and a free remainder linked right after it.
//! - **Release**: the block is marked free, then merged with a free successor
//!   and finally into a free predecessor.
//! - **Resize**: shrinking hands the tail to the following free block (or to a
//!   new one), growing takes bytes from the front of a free successor.
//!
//! # Invariants
//!
//! Between two operations:
//!
//! - descriptors are contiguous, start at offset 0 and their sizes add up to
//!   the pool capacity;
//! - every descriptor has a non-zero size;
//! - no two consecutive descriptors are both free.
//!
//! Every operation that needs a new descriptor reserves its slot before
//! touching the list, so a failed reservation leaves the chain unchanged.

use alloc::vec::Vec;
use core::{cmp::Ordering, iter, mem, ops::Range};

use log::trace;
use snafu::{OptionExt as _, ensure};

use crate::{
    Address,
    error::{AllocationExhaustedSnafu, InvalidPointerSnafu, PoolError, ZeroSizeSnafu},
    status::{BlockInfo, BlockState},
};

/// Index of a descriptor in the slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotId(usize);

#[derive(Debug)]
struct Descriptor {
    start: usize,
    size: usize,
    state: BlockState,
    next: Option<SlotId>,
}

impl Descriptor {
    fn end(&self) -> usize {
        self.start + self.size
    }

    fn is_free(&self) -> bool {
        self.state.is_free()
    }

    fn info(&self) -> BlockInfo {
        BlockInfo::new(Address::from_offset(self.start), self.size, self.state)
    }
}

#[derive(Debug)]
enum Slot {
    Occupied(Descriptor),
    Vacant { next: Option<SlotId> },
}

/// Outcome of [`DescriptorChain::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Release {
    /// No descriptor starts at the given offset.
    Unknown,
    AlreadyFree,
    /// The block was freed; carries the bytes it covered before coalescing.
    Released(Range<usize>),
}

#[derive(Debug)]
pub(crate) struct DescriptorChain {
    slots: Vec<Slot>,
    vacant: Option<SlotId>,
    head: Option<SlotId>,
}

impl DescriptorChain {
    /// Creates a chain with a single free descriptor spanning `capacity`
    /// bytes.
    pub(crate) fn new(capacity: usize) -> Result<Self, PoolError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(1)
            .ok()
            .context(AllocationExhaustedSnafu {
                requested: capacity,
            })?;
        slots.push(Slot::Occupied(Descriptor {
            start: 0,
            size: capacity,
            state: BlockState::Free,
            next: None,
        }));
        Ok(Self {
            slots,
            vacant: None,
            head: Some(SlotId(0)),
        })
    }

    pub(crate) fn iter(&self) -> Iter<'_> {
        Iter {
            chain: self,
            cursor: self.head,
        }
    }

    /// Returns the start of the first free block without modifying anything.
    pub(crate) fn peek_free(&self) -> Result<usize, PoolError> {
        self.descriptors()
            .find(|descriptor| descriptor.is_free())
            .map(|descriptor| descriptor.start)
            .context(AllocationExhaustedSnafu { requested: 0_usize })
    }

    /// Hands out the first free block that can hold `size` bytes.
    ///
    /// A zero `size` is a query: see [`Self::peek_free`].
    pub(crate) fn allocate(&mut self, size: usize) -> Result<usize, PoolError> {
        if size == 0 {
            return self.peek_free();
        }

        let id = self
            .ids()
            .find(|&id| {
                let descriptor = self.descriptor(id);
                descriptor.is_free() && descriptor.size >= size
            })
            .context(AllocationExhaustedSnafu { requested: size })?;

        let (start, block_size) = {
            let descriptor = self.descriptor(id);
            (descriptor.start, descriptor.size)
        };

        if block_size > size {
            self.reserve_slot(size)?;
            let descriptor = self.descriptor_mut(id);
            descriptor.size = size;
            descriptor.state = BlockState::Used;
            self.insert_after(id, start + size, block_size - size, BlockState::Free);
            trace!(
                "split block at {start:#x}: {size} used + {} free",
                block_size - size
            );
        } else {
            self.descriptor_mut(id).state = BlockState::Used;
        }

        Ok(start)
    }

    /// Marks the block starting at `start` free and coalesces it with its
    /// neighbours.
    pub(crate) fn release(&mut self, start: usize) -> Release {
        let Some((prev, id)) = self.find(start) else {
            return Release::Unknown;
        };

        let descriptor = self.descriptor_mut(id);
        if descriptor.is_free() {
            return Release::AlreadyFree;
        }
        descriptor.state = BlockState::Free;
        let region = descriptor.start..descriptor.end();

        self.absorb_free_successor(id);
        if let Some(prev) = prev {
            if self.descriptor(prev).is_free() {
                self.absorb_free_successor(prev);
            }
        }

        Release::Released(region)
    }

    /// Changes the size of the used block starting at `start` in place.
    ///
    /// Returns the bytes given back to the pool when shrinking.
    pub(crate) fn resize(
        &mut self,
        start: usize,
        new_size: usize,
    ) -> Result<Option<Range<usize>>, PoolError> {
        ensure!(new_size > 0, ZeroSizeSnafu);

        let id = self.find_used(start)?;
        let (size, next) = {
            let descriptor = self.descriptor(id);
            (descriptor.size, descriptor.next)
        };

        match new_size.cmp(&size) {
            Ordering::Equal => Ok(None),
            Ordering::Less => {
                let released = start + new_size..start + size;
                match next.filter(|&next| self.descriptor(next).is_free()) {
                    Some(next) => {
                        let successor = self.descriptor_mut(next);
                        successor.start = released.start;
                        successor.size += released.len();
                    }
                    None => {
                        self.reserve_slot(new_size)?;
                        self.insert_after(id, released.start, released.len(), BlockState::Free);
                    }
                }
                self.descriptor_mut(id).size = new_size;
                trace!("shrunk block at {start:#x} from {size} to {new_size} bytes");
                Ok(Some(released))
            }
            Ordering::Greater => {
                let extra = new_size - size;
                let next = next
                    .filter(|&next| {
                        let successor = self.descriptor(next);
                        successor.is_free() && successor.size >= extra
                    })
                    .context(AllocationExhaustedSnafu {
                        requested: new_size,
                    })?;

                self.descriptor_mut(id).size = new_size;
                let successor = self.descriptor_mut(next);
                successor.start += extra;
                successor.size -= extra;
                if successor.size == 0 {
                    self.unlink_next(id);
                }
                trace!("grew block at {start:#x} from {size} to {new_size} bytes");
                Ok(None)
            }
        }
    }

    /// Returns the byte range of the used block starting at `start`.
    pub(crate) fn used_region(&self, start: usize) -> Result<Range<usize>, PoolError> {
        let descriptor = self.descriptor(self.find_used(start)?);
        Ok(descriptor.start..descriptor.end())
    }

    fn find_used(&self, start: usize) -> Result<SlotId, PoolError> {
        self.find(start)
            .map(|(_prev, id)| id)
            .filter(|&id| self.descriptor(id).state.is_used())
            .context(InvalidPointerSnafu {
                address: Address::from_offset(start),
            })
    }

    /// Finds the descriptor starting at `start` along with its predecessor.
    fn find(&self, start: usize) -> Option<(Option<SlotId>, SlotId)> {
        let mut prev = None;
        for id in self.ids() {
            let descriptor = self.descriptor(id);
            match descriptor.start.cmp(&start) {
                Ordering::Equal => return Some((prev, id)),
                Ordering::Greater => return None,
                Ordering::Less => prev = Some(id),
            }
        }
        None
    }

    /// Merges the successor of `id` into it if the successor is free.
    fn absorb_free_successor(&mut self, id: SlotId) {
        let Some(next) = self.descriptor(id).next else {
            return;
        };
        if !self.descriptor(next).is_free() {
            return;
        }
        let removed = self.unlink_next(id);
        let descriptor = self.descriptor_mut(id);
        descriptor.size += removed.size;
        trace!(
            "coalesced block at {:#x} with block at {:#x}, now {} bytes",
            descriptor.start,
            removed.start,
            descriptor.size
        );
    }

    /// Makes sure the next [`Self::insert_after`] cannot fail.
    fn reserve_slot(&mut self, requested: usize) -> Result<(), PoolError> {
        if self.vacant.is_none() {
            self.slots
                .try_reserve(1)
                .ok()
                .context(AllocationExhaustedSnafu { requested })?;
        }
        Ok(())
    }

    fn insert_after(&mut self, prev: SlotId, start: usize, size: usize, state: BlockState) {
        let descriptor = Descriptor {
            start,
            size,
            state,
            next: self.descriptor(prev).next,
        };
        let id = match self.vacant {
            Some(id) => {
                let Slot::Vacant { next } = self.slots[id.0] else {
                    unreachable!("vacant list points at occupied slot {}", id.0);
                };
                self.vacant = next;
                self.slots[id.0] = Slot::Occupied(descriptor);
                id
            }
            None => {
                self.slots.push(Slot::Occupied(descriptor));
                SlotId(self.slots.len() - 1)
            }
        };
        self.descriptor_mut(prev).next = Some(id);
    }

    /// Removes the successor of `prev` from the list and recycles its slot.
    fn unlink_next(&mut self, prev: SlotId) -> Descriptor {
        let Some(id) = self.descriptor(prev).next else {
            unreachable!("descriptor in slot {} has no successor", prev.0);
        };
        let slot = mem::replace(&mut self.slots[id.0], Slot::Vacant { next: self.vacant });
        let Slot::Occupied(removed) = slot else {
            unreachable!("linked slot {} is vacant", id.0);
        };
        self.vacant = Some(id);
        self.descriptor_mut(prev).next = removed.next;
        removed
    }

    fn ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        iter::successors(self.head, |&id| self.descriptor(id).next)
    }

    fn descriptors(&self) -> impl Iterator<Item = &Descriptor> + '_ {
        self.ids().map(|id| self.descriptor(id))
    }

    fn descriptor(&self, id: SlotId) -> &Descriptor {
        match &self.slots[id.0] {
            Slot::Occupied(descriptor) => descriptor,
            Slot::Vacant { .. } => unreachable!("linked slot {} is vacant", id.0),
        }
    }

    fn descriptor_mut(&mut self, id: SlotId) -> &mut Descriptor {
        match &mut self.slots[id.0] {
            Slot::Occupied(descriptor) => descriptor,
            Slot::Vacant { .. } => unreachable!("linked slot {} is vacant", id.0),
        }
    }
}

/// Iterator over the chain in address order.
#[derive(Debug, Clone)]
pub(crate) struct Iter<'a> {
    chain: &'a DescriptorChain,
    cursor: Option<SlotId>,
}

impl Iterator for Iter<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let descriptor = self.chain.descriptor(self.cursor?);
        self.cursor = descriptor.next;
        Some(descriptor.info())
    }
}
