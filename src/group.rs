//! A single fixed-capacity block of slots with its own free list.

use core::{alloc::Layout, mem, ptr};

use allocator_api2::{alloc::Allocator, vec::Vec};

use crate::{
	position::{GroupKey, Links},
	ColonyError,
};

/// Storage for one element (or one free list link).
pub(crate) struct Slot<T> {
	/// Bumped each time the slot is reoccupied.
	generation: u32,
	node: Node<T>,
}

pub(crate) enum Node<T> {
	Live { value: T, links: Links },
	/// Erased slots are threaded into their group's free list.
	Erased { next: Option<u32> },
}

impl<T> Slot<T> {
	pub(crate) fn generation(&self) -> u32 {
		self.generation
	}

	pub(crate) fn is_live(&self) -> bool {
		matches!(self.node, Node::Live { .. })
	}

	pub(crate) fn value(&self) -> Option<&T> {
		match &self.node {
			Node::Live { value, .. } => Some(value),
			Node::Erased { .. } => None,
		}
	}

	pub(crate) fn value_mut(&mut self) -> Option<&mut T> {
		match &mut self.node {
			Node::Live { value, .. } => Some(value),
			Node::Erased { .. } => None,
		}
	}

	pub(crate) fn links(&self) -> Option<Links> {
		match &self.node {
			Node::Live { links, .. } => Some(*links),
			Node::Erased { .. } => None,
		}
	}

	pub(crate) fn links_mut(&mut self) -> Option<&mut Links> {
		match &mut self.node {
			Node::Live { links, .. } => Some(links),
			Node::Erased { .. } => None,
		}
	}
}

/// A fixed-capacity block of slots.
///
/// The backing [`Vec`] is allocated once with the group's full capacity and never grows past it,
/// so live values never move while the group exists.
/// Its length is the *filled region*: slots beyond it have never been occupied since the last reset.
pub(crate) struct Group<T, A: Allocator> {
	key: GroupKey,
	slots: Vec<Slot<T>, A>,
	capacity: u32,
	free_head: Option<u32>,
	live: u32,
	/// Index of this group in the group vector order.
	rank: u32,
}

impl<T, A: Allocator> Group<T, A> {
	pub(crate) fn try_new_in(capacity: u32, alloc: A) -> Result<Self, ColonyError> {
		let layout = Layout::array::<Slot<T>>(capacity as usize)
			.map_err(|_| ColonyError::CapacityOverflow)?;
		let mut slots = Vec::new_in(alloc);
		slots
			.try_reserve_exact(capacity as usize)
			.map_err(|_| ColonyError::AllocationFailed { layout })?;
		Ok(Self {
			key: GroupKey::mint(),
			slots,
			capacity,
			free_head: None,
			live: 0,
			rank: 0,
		})
	}

	pub(crate) fn key(&self) -> GroupKey {
		self.key
	}

	pub(crate) fn capacity(&self) -> u32 {
		self.capacity
	}

	#[allow(clippy::cast_possible_truncation)] // Bounded by `capacity`.
	pub(crate) fn filled(&self) -> u32 {
		self.slots.len() as u32
	}

	pub(crate) fn live(&self) -> u32 {
		self.live
	}

	/// Number of slots on the free list.
	pub(crate) fn erased(&self) -> u32 {
		self.filled() - self.live
	}

	pub(crate) fn is_full(&self) -> bool {
		self.filled() == self.capacity
	}

	pub(crate) fn has_free(&self) -> bool {
		self.free_head.is_some()
	}

	pub(crate) fn rank(&self) -> usize {
		self.rank as usize
	}

	#[allow(clippy::cast_possible_truncation)] // The group vector is indexed by `u32`.
	pub(crate) fn set_rank(&mut self, rank: usize) {
		self.rank = rank as u32;
	}

	pub(crate) fn slot(&self, index: u32) -> Option<&Slot<T>> {
		self.slots.get(index as usize)
	}

	pub(crate) fn slot_mut(&mut self, index: u32) -> Option<&mut Slot<T>> {
		self.slots.get_mut(index as usize)
	}

	/// A pointer to one slot that doesn't materialise a reference to the rest of the buffer.
	pub(crate) fn slot_ptr(&mut self, index: u32) -> *mut Slot<T> {
		debug_assert!(index < self.filled());
		self.slots.as_mut_ptr().wrapping_add(index as usize)
	}

	/// Places `value` into the first free-list slot, or else into the next unused slot.
	///
	/// # Panics
	///
	/// Iff the group has neither, as growing the buffer would move every value in it.
	pub(crate) fn occupy(&mut self, value: T, links: Links) -> u32 {
		if let Some(index) = self.free_head {
			let slot = &mut self.slots[index as usize];
			let Node::Erased { next } = slot.node else {
				unreachable!("free list entry {} is live", index)
			};
			self.free_head = next;
			slot.generation = slot.generation.wrapping_add(1);
			slot.node = Node::Live { value, links };
			self.live += 1;
			index
		} else {
			assert!(!self.is_full(), "occupied a full group");
			let index = self.filled();
			self.slots.push(Slot {
				generation: 0,
				node: Node::Live { value, links },
			});
			self.live += 1;
			index
		}
	}

	/// Drops the value at `index` in place and pushes the slot onto the free list.
	pub(crate) fn vacate(&mut self, index: u32) {
		debug_assert!(self.slots[index as usize].is_live());
		self.live -= 1;
		let next = self.free_head.replace(index);
		self.slots[index as usize].node = Node::Erased { next };
	}

	/// Moves the value at `index` out and pushes the slot onto the free list.
	pub(crate) fn take(&mut self, index: u32) -> T {
		self.live -= 1;
		let next = self.free_head.replace(index);
		match mem::replace(&mut self.slots[index as usize].node, Node::Erased { next }) {
			Node::Live { value, .. } => value,
			Node::Erased { .. } => unreachable!("took erased slot {}", index),
		}
	}

	/// Drops all live values and forgets the free list, keeping the allocation.
	///
	/// The group gets a fresh key, so positions into it can't resolve anymore.
	/// Bookkeeping is updated first: if a drop panics, the remaining values are still dropped
	/// and the group is left empty.
	pub(crate) fn reset(&mut self) {
		self.key = GroupKey::mint();
		self.free_head = None;
		self.live = 0;
		self.slots.clear();
	}

	/// Turns the unused tail into free list entries, returning how many there were.
	pub(crate) fn seal(&mut self) -> u32 {
		let unused = self.capacity - self.filled();
		for index in self.filled()..self.capacity {
			let next = self.free_head.replace(index);
			self.slots.push(Slot {
				generation: 0,
				node: Node::Erased { next },
			});
		}
		unused
	}

	/// Shifts all sequence links by `offset` group indices.
	///
	/// Used when a whole group store is appended to another one.
	pub(crate) fn rebase(&mut self, offset: u32) {
		for links in self.slots.iter_mut().filter_map(Slot::links_mut) {
			for link in [&mut links.prev, &mut links.next].into_iter().flatten() {
				link.group += offset;
			}
		}
	}

	/// Finds the live slot holding the value at `element`, iff this group stores it.
	pub(crate) fn slot_of(&self, element: *const T) -> Option<u32> {
		let stride = mem::size_of::<Slot<T>>();
		let start = self.slots.as_ptr() as usize;
		let offset = (element as usize).checked_sub(start)?;
		let index = u32::try_from(offset / stride).ok()?;
		self.slot(index)?
			.value()
			.filter(|value| ptr::eq(*value, element))
			.map(|_| index)
	}

	/// Approximate heap footprint of this group's slot buffer.
	pub(crate) fn memory_use(&self) -> usize {
		self.capacity as usize * mem::size_of::<Slot<T>>()
	}
}
