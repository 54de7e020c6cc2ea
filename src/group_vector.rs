//! The set of all groups owned by one colony.
//!
//! Groups live in a store indexed by a stable `u32` (so that sequence links survive reordering),
//! and a separate order vector arranges them into an *active* region followed by a *retained* region.
//! Retained groups are empty and are reactivated before any new group is allocated.

use core::{alloc::Layout, mem};

use allocator_api2::{alloc::Allocator, vec::Vec};
use tap::Pipe;

use crate::{
	group::{Group, Slot},
	position::{GroupKey, Links, NodeRef, Position},
	ColonyError,
};

pub(crate) struct GroupVector<T, A: Allocator + Clone> {
	store: Vec<Option<Group<T, A>>, A>,
	/// Store indices of released groups, available for reuse.
	vacant: Vec<u32, A>,
	/// Store indices: `[..active]` in allocation order, then retained groups.
	order: Vec<u32, A>,
	active: usize,
	/// Rank at which the last free-list search started.
	last_searched: usize,
	capacity: usize,
	alloc: A,
}

fn try_reserve<U, A: Allocator>(vec: &mut Vec<U, A>, additional: usize) -> Result<(), ColonyError> {
	let layout = vec
		.len()
		.checked_add(additional)
		.ok_or(ColonyError::CapacityOverflow)?
		.pipe(Layout::array::<U>)
		.map_err(|_| ColonyError::CapacityOverflow)?;
	vec.try_reserve(additional)
		.map_err(|_| ColonyError::AllocationFailed { layout })
}

impl<T, A: Allocator + Clone> GroupVector<T, A> {
	pub(crate) fn new_in(alloc: A) -> Self {
		Self {
			store: Vec::new_in(alloc.clone()),
			vacant: Vec::new_in(alloc.clone()),
			order: Vec::new_in(alloc.clone()),
			active: 0,
			last_searched: 0,
			capacity: 0,
			alloc,
		}
	}

	pub(crate) fn allocator(&self) -> &A {
		&self.alloc
	}

	/// Total slots across all groups, active and retained.
	pub(crate) fn capacity(&self) -> usize {
		self.capacity
	}

	pub(crate) fn active(&self) -> usize {
		self.active
	}

	#[cfg(test)]
	pub(crate) fn total(&self) -> usize {
		self.order.len()
	}

	/// # Panics
	///
	/// Iff `index` doesn't refer to an allocated group, which would be an internal bookkeeping error.
	pub(crate) fn group(&self, index: u32) -> &Group<T, A> {
		match self.store.get(index as usize) {
			Some(Some(group)) => group,
			_ => unreachable!("group {} is not allocated", index),
		}
	}

	/// # Panics
	///
	/// Iff `index` doesn't refer to an allocated group, which would be an internal bookkeeping error.
	pub(crate) fn group_mut(&mut self, index: u32) -> &mut Group<T, A> {
		match self.store.get_mut(index as usize) {
			Some(Some(group)) => group,
			_ => unreachable!("group {} is not allocated", index),
		}
	}

	pub(crate) fn links(&self, node: NodeRef) -> Links {
		match self.group(node.group).slot(node.slot).and_then(Slot::links) {
			Some(links) => links,
			None => unreachable!("link to erased slot {:?}", node),
		}
	}

	pub(crate) fn links_mut(&mut self, node: NodeRef) -> &mut Links {
		match self
			.group_mut(node.group)
			.slot_mut(node.slot)
			.and_then(Slot::links_mut)
		{
			Some(links) => links,
			None => unreachable!("link to erased slot {:?}", node),
		}
	}

	pub(crate) fn value(&self, node: NodeRef) -> &T {
		match self.group(node.group).slot(node.slot).and_then(Slot::value) {
			Some(value) => value,
			None => unreachable!("link to erased slot {:?}", node),
		}
	}

	pub(crate) fn value_mut(&mut self, node: NodeRef) -> &mut T {
		match self
			.group_mut(node.group)
			.slot_mut(node.slot)
			.and_then(Slot::value_mut)
		{
			Some(value) => value,
			None => unreachable!("link to erased slot {:?}", node),
		}
	}

	/// The public handle of a live slot.
	pub(crate) fn position(&self, node: NodeRef) -> Position {
		let group = self.group(node.group);
		Position {
			key: group.key(),
			group: node.group,
			slot: node.slot,
			generation: group.slot(node.slot).map_or(0, Slot::generation),
		}
	}

	/// Resolves a group by key, trying the `hint` index first.
	pub(crate) fn locate(&self, key: GroupKey, hint: u32) -> Option<u32> {
		match self.store.get(hint as usize) {
			Some(Some(group)) if group.key() == key => Some(hint),
			_ => self
				.store
				.iter()
				.position(|group| group.as_ref().map_or(false, |group| group.key() == key))
				.and_then(|index| u32::try_from(index).ok()),
		}
	}

	#[cfg(test)]
	pub(crate) fn index_at(&self, rank: usize) -> u32 {
		self.order[rank]
	}

	/// The last active group, into whose unused tail fresh elements go.
	pub(crate) fn back(&self) -> Option<u32> {
		self.active.checked_sub(1).map(|rank| self.order[rank])
	}

	pub(crate) fn active_groups(&self) -> impl '_ + Iterator<Item = (u32, &Group<T, A>)> {
		self.order[..self.active]
			.iter()
			.map(move |&index| (index, self.group(index)))
	}

	/// Pointer to a slot that doesn't create references to any other slot.
	///
	/// # Safety
	///
	/// `this` must be valid for writes and `node` must refer to a filled slot.
	pub(crate) unsafe fn slot_ptr(this: *mut Self, node: NodeRef) -> *mut Slot<T> {
		let store = &mut (*this).store;
		match (*store.as_mut_ptr().add(node.group as usize)).as_mut() {
			Some(group) => group.slot_ptr(node.slot),
			None => unreachable!("group {} is not allocated", node.group),
		}
	}

	/// Makes room in the bookkeeping vectors for `additional` more groups.
	fn try_prepare(&mut self, additional: usize) -> Result<(), ColonyError> {
		try_reserve(&mut self.store, additional)?;
		try_reserve(&mut self.order, additional)?;
		// Every store index may end up vacant at once.
		let vacant = (self.store.len() + additional).saturating_sub(self.vacant.len());
		try_reserve(&mut self.vacant, vacant)
	}

	/// Inserts an allocated group at the end of the retained region. Requires prior [`Self::try_prepare`].
	fn attach(&mut self, mut group: Group<T, A>) -> u32 {
		group.set_rank(self.order.len());
		self.capacity += group.capacity() as usize;
		#[allow(clippy::cast_possible_truncation)] // Checked in `try_prepare_append` and `try_allocate`.
		let index = match self.vacant.pop() {
			Some(index) => {
				self.store[index as usize] = Some(group);
				index
			}
			None => {
				self.store.push(Some(group));
				(self.store.len() - 1) as u32
			}
		};
		self.order.push(index);
		index
	}

	fn try_allocate(&mut self, capacity: u32) -> Result<u32, ColonyError> {
		if self.store.len() >= u32::MAX as usize && self.vacant.is_empty() {
			return Err(ColonyError::CapacityOverflow);
		}
		self.try_prepare(1)?;
		let group = Group::try_new_in(capacity, self.alloc.clone())?;
		let index = self.attach(group);
		tracing::trace!(capacity, groups = self.order.len(), "allocated group");
		Ok(index)
	}

	/// Allocates a new back group. Only valid while no group is retained.
	pub(crate) fn try_grow(&mut self, capacity: u32) -> Result<u32, ColonyError> {
		debug_assert_eq!(self.active, self.order.len());
		let index = self.try_allocate(capacity)?;
		self.active += 1;
		Ok(index)
	}

	/// Allocates retained groups with the given capacities, all or nothing.
	pub(crate) fn try_reserve_groups(&mut self, capacities: &[u32]) -> Result<(), ColonyError> {
		let first_new = self.order.len();
		for &capacity in capacities {
			if let Err(error) = self.try_allocate(capacity) {
				while self.order.len() > first_new {
					self.release(self.order.len() - 1);
				}
				return Err(error);
			}
		}
		Ok(())
	}

	/// Turns the first retained group into the new back group.
	pub(crate) fn activate_next(&mut self) -> Option<u32> {
		(self.active < self.order.len()).then(|| {
			self.active += 1;
			let index = self.order[self.active - 1];
			tracing::trace!(
				capacity = self.group(index).capacity(),
				"reactivated retained group"
			);
			index
		})
	}

	/// Retires the (already reset) back group into the retained region, where it stays first in line.
	pub(crate) fn retire_back(&mut self) {
		self.active -= 1;
		self.clamp_search();
	}

	/// Moves an emptied (already reset) active group to the very end of the retained region.
	pub(crate) fn move_to_back(&mut self, rank: usize) {
		debug_assert!(rank < self.active);
		self.order[rank..].rotate_left(1);
		self.rerank(rank);
		self.active -= 1;
		self.clamp_search();
		tracing::trace!(rank, "retained emptied group");
	}

	/// Frees the group at `rank`, which must be empty.
	pub(crate) fn release(&mut self, rank: usize) {
		let index = self.order.remove(rank);
		self.rerank(rank);
		if rank < self.active {
			self.active -= 1;
			self.clamp_search();
		}
		if let Some(group) = self.store[index as usize].take() {
			debug_assert_eq!(group.live(), 0);
			self.capacity -= group.capacity() as usize;
			tracing::trace!(capacity = group.capacity(), "released group");
		}
		self.vacant.push(index);
	}

	/// Frees all retained groups, returning how many slots were released.
	pub(crate) fn trim(&mut self) -> usize {
		let before = self.capacity;
		while self.order.len() > self.active {
			self.release(self.order.len() - 1);
		}
		if self.order.is_empty() {
			self.store.clear();
			self.vacant.clear();
		}
		before - self.capacity
	}

	/// Frees every group. Their values must have been dropped or moved out already.
	pub(crate) fn release_all(&mut self) {
		self.active = 0;
		self.trim();
		self.last_searched = 0;
	}

	/// Drops all values and retains every group.
	///
	/// A panicking value drop doesn't keep the remaining groups from being reset.
	/// With the `"std"` feature, the first panic is resumed once all groups are reset.
	/// Without it, the remaining groups are reset while unwinding.
	pub(crate) fn reset_all(&mut self) {
		#[cfg(feature = "std")]
		{
			use std::panic::{catch_unwind, AssertUnwindSafe};

			let mut panic = None;
			for rank in 0..self.active {
				let p = catch_unwind(AssertUnwindSafe(|| self.reset_at(rank))).err();
				panic = panic.or(p);
			}
			self.active = 0;
			self.last_searched = 0;

			if let Some(panic) = panic {
				std::panic::resume_unwind(panic)
			}
		}

		#[cfg(not(feature = "std"))]
		{
			let mut guard = scopeguard::guard((self, 0), |(this, reached): (&mut Self, usize)| {
				for rank in reached..this.active {
					this.reset_at(rank);
				}
				this.active = 0;
				this.last_searched = 0;
			});
			let (this, reached) = &mut *guard;
			while *reached < this.active {
				let rank = *reached;
				*reached += 1;
				this.reset_at(rank);
			}
		}
	}

	fn reset_at(&mut self, rank: usize) {
		if let Some(Some(group)) = self.store.get_mut(self.order[rank] as usize) {
			group.reset();
		}
	}

	/// Outward search for the active group with a free list entry closest to `anchor` (a rank).
	///
	/// Without an anchor, the search starts where the previous one did.
	/// At each distance the later group is checked before the earlier one.
	pub(crate) fn nearest_free(&mut self, anchor: Option<usize>) -> Option<u32> {
		let last = self.active.checked_sub(1)?;
		let start = anchor.unwrap_or(self.last_searched).min(last);
		self.last_searched = start;

		let has_free = |rank: usize| self.group(self.order[rank]).has_free();
		if has_free(start) {
			return Some(self.order[start]);
		}
		let (mut left, mut right) = (start.checked_sub(1), start + 1);
		while left.is_some() || right <= last {
			if right <= last {
				if has_free(right) {
					return Some(self.order[right]);
				}
				right += 1;
			}
			if let Some(rank) = left {
				if has_free(rank) {
					return Some(self.order[rank]);
				}
				left = rank.checked_sub(1);
			}
		}
		None
	}

	/// Turns the back group's unused tail into free list entries.
	pub(crate) fn seal_back(&mut self) -> u32 {
		match self.back() {
			Some(back) => self.group_mut(back).seal(),
			None => 0,
		}
	}

	/// Reserves what [`Self::append`] needs.
	pub(crate) fn try_prepare_append(&mut self, other: &Self) -> Result<(), ColonyError> {
		if self.store.len() + other.store.len() > u32::MAX as usize {
			return Err(ColonyError::CapacityOverflow);
		}
		try_reserve(&mut self.store, other.store.len())?;
		try_reserve(&mut self.order, other.order.len())?;
		let vacant = (self.store.len() + other.store.len()).saturating_sub(self.vacant.len());
		try_reserve(&mut self.vacant, vacant)
	}

	/// Takes over all groups of `other` after this vector's active groups, returning the store offset
	/// that was added to `other`'s group indices.
	///
	/// Both vectors must be trimmed and `self` must have been prepared with [`Self::try_prepare_append`].
	pub(crate) fn append(&mut self, other: &mut Self) -> u32 {
		debug_assert_eq!(self.active, self.order.len());
		debug_assert_eq!(other.active, other.order.len());

		#[allow(clippy::cast_possible_truncation)] // Checked in `try_prepare_append`.
		let offset = self.store.len() as u32;
		let base_rank = self.order.len();
		for mut entry in other.store.drain(..) {
			if let Some(group) = &mut entry {
				group.rebase(offset);
				group.set_rank(base_rank + group.rank());
			}
			self.store.push(entry);
		}
		self.order.extend(other.order.drain(..).map(|index| index + offset));
		self.vacant.extend(other.vacant.drain(..).map(|index| index + offset));
		self.active += mem::take(&mut other.active);
		self.capacity += mem::take(&mut other.capacity);
		other.last_searched = 0;
		tracing::debug!(groups = self.order.len(), "appended groups");
		offset
	}

	/// Approximate heap footprint of all groups and bookkeeping.
	pub(crate) fn memory_use(&self) -> usize {
		self.store.capacity() * mem::size_of::<Option<Group<T, A>>>()
			+ (self.order.capacity() + self.vacant.capacity()) * mem::size_of::<u32>()
			+ self
				.store
				.iter()
				.flatten()
				.map(Group::memory_use)
				.sum::<usize>()
	}

	fn rerank(&mut self, from: usize) {
		for rank in from..self.order.len() {
			let index = self.order[rank];
			self.group_mut(index).set_rank(rank);
		}
	}

	fn clamp_search(&mut self) {
		self.last_searched = self.last_searched.min(self.active.saturating_sub(1));
	}
}
