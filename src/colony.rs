use alloc::vec::Vec;
use core::{
	cmp::Ordering,
	fmt,
	hash::{Hash, Hasher},
	iter,
	mem::{self, ManuallyDrop},
	ops::{Index, IndexMut},
	pin::Pin,
	ptr,
};

use allocator_api2::alloc::{Allocator, Global};
use scopeguard::ScopeGuard;

use crate::{
	group_vector::GroupVector,
	iter::{IntoIter, Iter, IterMut, Positions},
	position::{Links, NodeRef},
	ColonyConfig, ColonyError, Position, Retention,
};

/// A segmented sequence container with stable element positions.
///
/// Elements are stored in fixed-capacity groups that are never reallocated,
/// so neither insertion nor erasure moves any other element in memory.
/// Erased slots are kept on per-group free lists and reused by later insertions.
///
/// The logical order of elements is threaded through the slots, which lets
/// [`splice`](`Colony::splice`), [`sort`](`Colony::sort`), [`reverse`](`Colony::reverse`) and [`reorder`](`Colony::reorder`)
/// rearrange elements without touching them.
pub struct Colony<T, A: Allocator + Clone = Global> {
	groups: GroupVector<T, A>,
	head: Option<NodeRef>,
	tail: Option<NodeRef>,
	len: usize,
	/// Free list entries across all active groups.
	erased: usize,
	config: ColonyConfig,
}

impl<T> Colony<T> {
	/// Creates a new empty [`Colony`] with the default configuration.
	///
	/// No memory is allocated until the first insertion.
	#[must_use]
	pub fn new() -> Self {
		Self::new_in(Global)
	}

	/// Creates a new empty [`Colony`] with a custom configuration.
	#[must_use]
	pub fn with_config(config: ColonyConfig) -> Self {
		Self::with_config_in(config, Global)
	}

	/// Creates a [`Colony`] holding `count` clones of `value`.
	#[must_use]
	pub fn filled(count: usize, value: T) -> Self
	where
		T: Clone,
	{
		let mut colony = Self::new();
		colony.insert_n(None, count, value);
		colony
	}
}

impl<T, A: Allocator + Clone + Default> Default for Colony<T, A> {
	fn default() -> Self {
		Self::new_in(A::default())
	}
}

impl<T, A: Allocator + Clone> Drop for Colony<T, A> {
	fn drop(&mut self) {
		// Retained groups hold no values, and `reset_all` takes care of the panic-handling.
		self.groups.reset_all();
	}
}

impl<T, A: Allocator + Clone> Colony<T, A> {
	/// Creates a new empty [`Colony`] that allocates its groups through `alloc`.
	#[must_use]
	pub fn new_in(alloc: A) -> Self {
		Self::with_config_in(ColonyConfig::new(), alloc)
	}

	/// Creates a new empty [`Colony`] with a custom configuration that allocates its groups through `alloc`.
	#[must_use]
	pub fn with_config_in(config: ColonyConfig, alloc: A) -> Self {
		Self {
			groups: GroupVector::new_in(alloc),
			head: None,
			tail: None,
			len: 0,
			erased: 0,
			config,
		}
	}

	/// Turns this [`Colony`] into a [`Pin`] of its values.
	///
	/// Use the [`PinningColony`](`crate::PinningColony`) trait to work with the result.
	///
	/// # Safety Notes
	///
	/// [`Colony`] never moves live values, except in methods that the pinning API doesn't expose
	/// ([`remove`](`Colony::remove`), the `pop_…` methods, [`shrink_to_fit`](`Colony::shrink_to_fit`) and consuming iteration).
	/// Values are always dropped in place before their memory is reused or freed.
	#[must_use]
	pub fn pin(self) -> Pin<Self> {
		let this = ManuallyDrop::new(self);
		//SAFETY: `Pin` is `#[repr(transparent)]` and the original is never dropped.
		unsafe { ptr::read((&*this as *const Self).cast::<Pin<Self>>()) }
	}

	/// The configuration this colony allocates groups with.
	#[must_use]
	pub fn config(&self) -> &ColonyConfig {
		&self.config
	}

	/// The allocator of this colony.
	#[must_use]
	pub fn allocator(&self) -> &A {
		self.groups.allocator()
	}

	/// Changes the group size limits for groups allocated from now on.
	///
	/// Existing groups are kept as they are, even those that fall outside the new limits,
	/// so all positions stay valid and no element is moved.
	/// Call [`shrink_to_fit`](`Colony::shrink_to_fit`) afterwards to consolidate the elements into groups
	/// that respect the new limits (which invalidates positions).
	///
	/// # Errors
	///
	/// Iff the limits are invalid, in which case the configuration is unchanged.
	pub fn set_group_sizes(&mut self, min: u32, max: u32) -> Result<(), ColonyError> {
		self.config = self.config.group_sizes(min, max)?;
		Ok(())
	}

	/// Changes the policy for emptied groups.
	pub fn set_retention(&mut self, retention: Retention) {
		self.config.retention = retention;
	}

	/// The number of live elements.
	#[must_use]
	pub fn len(&self) -> usize {
		self.len
	}

	/// Whether there are no live elements.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Total slots across all groups: live, erased, unused and retained.
	#[must_use]
	pub fn capacity(&self) -> usize {
		self.groups.capacity()
	}

	/// The number of groups currently holding elements.
	#[must_use]
	pub fn group_count(&self) -> usize {
		self.groups.active()
	}

	/// Approximate number of bytes used by this colony, including its own size.
	#[must_use]
	pub fn memory_use(&self) -> usize {
		mem::size_of::<Self>() + self.groups.memory_use()
	}

	fn resolve(&self, position: Position) -> Option<NodeRef> {
		let group = self.groups.locate(position.key, position.group)?;
		let slot = self.groups.group(group).slot(position.slot)?;
		(slot.is_live() && slot.generation() == position.generation).then_some(NodeRef {
			group,
			slot: position.slot,
		})
	}

	#[track_caller]
	fn expect_node(&self, position: Position) -> NodeRef {
		match self.resolve(position) {
			Some(node) => node,
			None => panic!("{}", ColonyError::InvalidPosition),
		}
	}

	fn resolve_at(&self, at: Option<Position>) -> Result<Option<NodeRef>, ColonyError> {
		at.map(|position| self.resolve(position).ok_or(ColonyError::InvalidPosition))
			.transpose()
	}

	fn position(&self, node: NodeRef) -> Position {
		self.groups.position(node)
	}

	fn nodes(&self) -> impl '_ + Iterator<Item = NodeRef> {
		iter::successors(self.head, move |&node| self.groups.links(node).next)
	}

	/// Picks a group with room for one more element, preferring reuse close to `anchor`.
	///
	/// This is the only place where insertions allocate.
	fn try_vacancy(&mut self, anchor: Option<NodeRef>) -> Result<u32, ColonyError> {
		if self.erased != 0 {
			let rank = anchor
				.or(self.tail)
				.map(|node| self.groups.group(node.group).rank());
			if let Some(index) = self.groups.nearest_free(rank) {
				return Ok(index);
			}
		}
		if let Some(back) = self.groups.back() {
			if !self.groups.group(back).is_full() {
				return Ok(back);
			}
		}
		if let Some(retained) = self.groups.activate_next() {
			return Ok(retained);
		}
		self.groups.try_grow(self.config.growth(self.len))
	}

	/// Stores `value` in `group` and links it right before `before` (or at the end).
	fn place(&mut self, group: u32, value: T, before: Option<NodeRef>) -> NodeRef {
		let prev = match before {
			Some(before) => self.groups.links(before).prev,
			None => self.tail,
		};
		let target = self.groups.group_mut(group);
		if target.has_free() {
			self.erased -= 1;
		}
		let slot = target.occupy(value, Links { prev, next: before });
		let node = NodeRef { group, slot };
		self.link_chain(prev, node, node, before);
		self.len += 1;
		node
	}

	/// Links the chain `first..=last` between `prev` and `next`.
	fn link_chain(
		&mut self,
		prev: Option<NodeRef>,
		first: NodeRef,
		last: NodeRef,
		next: Option<NodeRef>,
	) {
		self.groups.links_mut(first).prev = prev;
		self.groups.links_mut(last).next = next;
		match prev {
			Some(prev) => self.groups.links_mut(prev).next = Some(first),
			None => self.head = Some(first),
		}
		match next {
			Some(next) => self.groups.links_mut(next).prev = Some(last),
			None => self.tail = Some(last),
		}
	}

	/// Joins the neighbours of the chain `first..=last`, leaving the chain's outer links dangling.
	fn unlink_chain(&mut self, first: NodeRef, last: NodeRef) {
		let prev = self.groups.links(first).prev;
		let next = self.groups.links(last).next;
		match prev {
			Some(prev) => self.groups.links_mut(prev).next = next,
			None => self.head = next,
		}
		match next {
			Some(next) => self.groups.links_mut(next).prev = prev,
			None => self.tail = prev,
		}
	}

	/// Drops the element at `node` in place and returns the following node.
	fn erase_node(&mut self, node: NodeRef) -> Option<NodeRef> {
		let next = self.groups.links(node).next;
		self.unlink_chain(node, node);
		self.len -= 1;
		self.erased += 1;

		// The slot is on the free list even if the drop panics, so settle the group regardless.
		let mut this = scopeguard::guard(self, move |this| this.settle(node.group));
		this.groups.group_mut(node.group).vacate(node.slot);
		next
	}

	/// Moves the element at `node` out.
	fn remove_node(&mut self, node: NodeRef) -> T {
		self.unlink_chain(node, node);
		self.len -= 1;
		self.erased += 1;
		let value = self.groups.group_mut(node.group).take(node.slot);
		self.settle(node.group);
		value
	}

	/// Recycles or releases the group at `index` iff it became empty.
	fn settle(&mut self, index: u32) {
		let group = self.groups.group_mut(index);
		if group.live() != 0 {
			return;
		}
		self.erased -= group.erased() as usize;
		let rank = group.rank();
		let is_max_size = group.capacity() >= self.config.max_group_size();
		group.reset();

		let back = self.groups.active() - 1;
		if rank == back {
			self.groups.retire_back();
		} else if self.config.retention.retains(is_max_size, back - rank) {
			self.groups.move_to_back(rank);
		} else {
			self.groups.release(rank);
		}
	}

	/// Inserts `value` at the end of the sequence.
	///
	/// Returns the new element's position. No other position is invalidated.
	///
	/// # Panics
	///
	/// Iff a required group can't be allocated.
	pub fn insert(&mut self, value: T) -> Position {
		self.insert_before(None, value)
	}

	/// Inserts `value` at the end of the sequence.
	///
	/// # Errors
	///
	/// Iff a required group can't be allocated. The colony is left unchanged and `value` is dropped.
	pub fn try_insert(&mut self, value: T) -> Result<Position, ColonyError> {
		self.try_insert_before(None, value)
	}

	/// Alias of [`insert`](`Colony::insert`).
	pub fn push_back(&mut self, value: T) -> Position {
		self.insert_before(None, value)
	}

	/// Inserts `value` at the start of the sequence.
	pub fn push_front(&mut self, value: T) -> Position {
		self.insert_before(self.first(), value)
	}

	/// Inserts `value` right before `at` (or at the end for [`None`]).
	///
	/// The slot is taken from the free list of the group nearest to `at`'s, if there are any erased slots.
	///
	/// # Panics
	///
	/// Iff `at` is invalid or a required group can't be allocated.
	#[track_caller]
	pub fn insert_before(&mut self, at: Option<Position>, value: T) -> Position {
		self.try_insert_before(at, value)
			.unwrap_or_else(|error| error.raise())
	}

	/// Inserts `value` right before `at` (or at the end for [`None`]).
	///
	/// # Errors
	///
	/// Iff `at` is invalid or a required group can't be allocated.
	/// The colony is left unchanged and `value` is dropped.
	pub fn try_insert_before(
		&mut self,
		at: Option<Position>,
		value: T,
	) -> Result<Position, ColonyError> {
		let before = self.resolve_at(at)?;
		let group = self.try_vacancy(before)?;
		let node = self.place(group, value, before);
		Ok(self.position(node))
	}

	/// Inserts the value created by `factory` right before `at` (or at the end for [`None`]).
	///
	/// `factory` runs before the colony is touched, so if it panics, nothing changes.
	///
	/// # Panics
	///
	/// Iff `at` is invalid or a required group can't be allocated.
	#[track_caller]
	pub fn insert_with(&mut self, at: Option<Position>, factory: impl FnOnce() -> T) -> Position {
		self.try_insert_with(at, || Ok::<_, ColonyError>(factory()))
			.unwrap_or_else(|error| error.raise())
	}

	/// Inserts the value created by a **fallible** `factory` right before `at` (or at the end for [`None`]).
	///
	/// `factory` runs before the colony is touched, so if it fails or panics, nothing changes.
	///
	/// # Errors
	///
	/// Iff `at` is invalid, `factory` fails or a required group can't be allocated.
	pub fn try_insert_with<E: From<ColonyError>>(
		&mut self,
		at: Option<Position>,
		factory: impl FnOnce() -> Result<T, E>,
	) -> Result<Position, E> {
		let before = self.resolve_at(at)?;
		let value = factory()?;
		let group = self.try_vacancy(before)?;
		let node = self.place(group, value, before);
		Ok(self.position(node))
	}

	/// Inserts all `values` right before `at` (or at the end for [`None`]), in order.
	///
	/// Returns the position of the first inserted element, iff any.
	///
	/// Groups for the iterator's lower size bound are reserved up front.
	/// If the iterator panics, every element inserted by this call is erased again before the panic continues.
	///
	/// # Panics
	///
	/// Iff `at` is invalid or a required group can't be allocated.
	#[track_caller]
	pub fn extend_at(
		&mut self,
		at: Option<Position>,
		values: impl IntoIterator<Item = T>,
	) -> Option<Position> {
		self.try_extend_at(at, values)
			.unwrap_or_else(|error| error.raise())
	}

	/// Inserts all `values` right before `at` (or at the end for [`None`]), in order.
	///
	/// Returns the position of the first inserted element, iff any.
	///
	/// # Errors
	///
	/// Iff `at` is invalid or a required group can't be allocated.
	/// All elements inserted by this call are erased again, though reserved capacity may remain.
	pub fn try_extend_at(
		&mut self,
		at: Option<Position>,
		values: impl IntoIterator<Item = T>,
	) -> Result<Option<Position>, ColonyError> {
		let before = self.resolve_at(at)?;
		let values = values.into_iter();
		self.try_reserve(values.size_hint().0)?;

		let mut inserted = scopeguard::guard(
			(self, None::<NodeRef>, 0_usize),
			|(this, first, count)| {
				let mut current = first;
				for _ in 0..count {
					match current {
						Some(node) => current = this.erase_node(node),
						None => break,
					}
				}
			},
		);
		for value in values {
			let (this, first, count) = &mut *inserted;
			let group = this.try_vacancy(before)?;
			let node = this.place(group, value, before);
			first.get_or_insert(node);
			*count += 1;
		}

		let (this, first, _) = ScopeGuard::into_inner(inserted);
		Ok(first.map(|node| this.position(node)))
	}

	/// Inserts `count` clones of `value` right before `at` (or at the end for [`None`]).
	///
	/// Returns the position of the first inserted element, iff `count` isn't zero.
	///
	/// # Panics
	///
	/// Iff `at` is invalid or a required group can't be allocated.
	#[track_caller]
	pub fn insert_n(&mut self, at: Option<Position>, count: usize, value: T) -> Option<Position>
	where
		T: Clone,
	{
		self.extend_at(at, iter::repeat(value).take(count))
	}

	/// Replaces all elements with `values`.
	pub fn assign(&mut self, values: impl IntoIterator<Item = T>) {
		self.clear();
		self.extend_at(None, values);
	}

	/// Shortens or extends the sequence at its end to `len` elements.
	pub fn resize(&mut self, len: usize, value: T)
	where
		T: Clone,
	{
		if len <= self.len {
			self.truncate(len);
		} else {
			self.insert_n(None, len - self.len, value);
		}
	}

	/// Erases elements from the end until at most `len` remain.
	pub fn truncate(&mut self, len: usize) {
		while self.len > len {
			match self.tail {
				Some(tail) => {
					self.erase_node(tail);
				}
				None => break,
			}
		}
	}

	/// Drops the element at `position` in place and returns the position of the following element.
	///
	/// All other positions stay valid.
	///
	/// # Panics
	///
	/// Iff `position` is invalid.
	#[track_caller]
	pub fn erase(&mut self, position: Position) -> Option<Position> {
		let node = self.expect_node(position);
		self.erase_node(node).map(|next| self.position(next))
	}

	/// Drops the element at `position` in place and returns the position of the following element.
	///
	/// # Errors
	///
	/// Iff `position` is invalid.
	pub fn try_erase(&mut self, position: Position) -> Result<Option<Position>, ColonyError> {
		let node = self
			.resolve(position)
			.ok_or(ColonyError::InvalidPosition)?;
		Ok(self.erase_node(node).map(|next| self.position(next)))
	}

	/// Erases the elements from `first` up to but excluding `last` (or through the end for [`None`]).
	///
	/// Returns `last`.
	/// If `last` precedes `first`, everything from `first` on is erased.
	///
	/// # Panics
	///
	/// Iff `first` or `last` is invalid.
	#[track_caller]
	pub fn erase_range(&mut self, first: Position, last: Option<Position>) -> Option<Position> {
		let mut current = Some(self.expect_node(first));
		let last = last.map(|last| self.expect_node(last));
		while let Some(node) = current {
			if Some(node) == last {
				break;
			}
			current = self.erase_node(node);
		}
		current.map(|node| self.position(node))
	}

	/// Moves the element at `position` out, iff `position` is valid.
	pub fn remove(&mut self, position: Position) -> Option<T> {
		let node = self.resolve(position)?;
		Some(self.remove_node(node))
	}

	/// Moves the first element out, iff there is one.
	pub fn pop_front(&mut self) -> Option<T> {
		let head = self.head?;
		Some(self.remove_node(head))
	}

	/// Moves the last element out, iff there is one.
	pub fn pop_back(&mut self) -> Option<T> {
		let tail = self.tail?;
		Some(self.remove_node(tail))
	}

	/// Drops all elements. All groups are kept for reuse.
	///
	/// A panic from an element's [`Drop`] implementation doesn't keep the other groups from being cleared.
	/// With the `"std"` feature, it is resumed only after every group has been cleared.
	/// Without it, the other groups are cleared while unwinding, so a second panicking drop aborts.
	pub fn clear(&mut self) {
		self.head = None;
		self.tail = None;
		self.len = 0;
		self.erased = 0;
		self.groups.reset_all();
	}

	/// Ensures that at least `additional` more elements fit without allocating.
	///
	/// # Panics
	///
	/// Iff the groups can't be allocated.
	#[track_caller]
	pub fn reserve(&mut self, additional: usize) {
		if let Err(error) = self.try_reserve(additional) {
			error.raise()
		}
	}

	/// Ensures that at least `additional` more elements fit without allocating.
	///
	/// Missing capacity is added as maximum-size groups plus one smaller remainder group,
	/// which are held back until the existing groups are full.
	///
	/// # Errors
	///
	/// Iff the groups can't be allocated. No capacity is added in that case.
	pub fn try_reserve(&mut self, additional: usize) -> Result<(), ColonyError> {
		let available = self.capacity() - self.len;
		let Some(mut needed) = additional.checked_sub(available).filter(|&needed| needed > 0) else {
			return Ok(());
		};

		let (min, max) = (
			self.config.min_group_size() as usize,
			self.config.max_group_size() as usize,
		);
		let mut capacities = Vec::new();
		capacities
			.try_reserve_exact(needed.div_ceil(max))
			.map_err(|_| ColonyError::CapacityOverflow)?;
		while needed > 0 {
			let capacity = needed.clamp(min, max);
			capacities.push(u32::try_from(capacity).map_err(|_| ColonyError::CapacityOverflow)?);
			needed = needed.saturating_sub(capacity);
		}

		tracing::debug!(additional, groups = capacities.len(), "reserving groups");
		self.groups.try_reserve_groups(&capacities)
	}

	/// Frees all retained groups that currently hold no elements.
	pub fn trim(&mut self) {
		let released = self.groups.trim();
		tracing::debug!(released, "trimmed retained groups");
	}

	/// Rebuilds the colony into as few groups as possible and frees everything else.
	///
	/// **All positions are invalidated.**
	///
	/// # Panics
	///
	/// Iff the new groups can't be allocated.
	#[track_caller]
	pub fn shrink_to_fit(&mut self) {
		if let Err(error) = self.try_shrink_to_fit() {
			error.raise()
		}
	}

	/// Rebuilds the colony into as few groups as possible and frees everything else.
	///
	/// **All positions are invalidated** (unless the colony is already packed, in which case only retained groups are freed).
	///
	/// # Errors
	///
	/// Iff the new groups can't be allocated. The colony is left unchanged in that case.
	pub fn try_shrink_to_fit(&mut self) -> Result<(), ColonyError> {
		if self.is_empty() {
			self.groups.release_all();
			return Ok(());
		}
		let packed = self.erased == 0
			&& self
				.groups
				.back()
				.map_or(true, |back| self.groups.group(back).is_full());
		if packed {
			self.trim();
			return Ok(());
		}

		let mut rebuilt = Self::with_config_in(self.config, self.allocator().clone());
		rebuilt.try_reserve(self.len)?;
		while let Some(value) = self.pop_front() {
			rebuilt.insert(value);
		}
		tracing::debug!(
			from = self.capacity(),
			to = rebuilt.capacity(),
			"rebuilt groups"
		);
		*self = rebuilt;
		Ok(())
	}

	/// Iterates over references to the elements in sequence order.
	pub fn iter(&self) -> Iter<'_, T, A> {
		Iter::new(&self.groups, self.head, self.tail, self.len)
	}

	/// Iterates over mutable references to the elements in sequence order.
	pub fn iter_mut(&mut self) -> IterMut<'_, T, A> {
		let (head, tail, len) = (self.head, self.tail, self.len);
		IterMut::new(&mut self.groups, head, tail, len)
	}

	/// Iterates over the positions of all elements in sequence order.
	pub fn positions(&self) -> Positions<'_, T, A> {
		Positions::new(&self.groups, self.head, self.tail, self.len)
	}

	/// The position of the first element, iff any.
	#[must_use]
	pub fn first(&self) -> Option<Position> {
		self.head.map(|node| self.position(node))
	}

	/// The position of the last element, iff any.
	#[must_use]
	pub fn last(&self) -> Option<Position> {
		self.tail.map(|node| self.position(node))
	}

	/// The position following `position`, or [`None`] at the end.
	///
	/// # Panics
	///
	/// Iff `position` is invalid.
	#[must_use]
	#[track_caller]
	pub fn next_position(&self, position: Position) -> Option<Position> {
		let node = self.expect_node(position);
		self.groups
			.links(node)
			.next
			.map(|next| self.position(next))
	}

	/// The position preceding `position`, or [`None`] at the start.
	///
	/// # Panics
	///
	/// Iff `position` is invalid.
	#[must_use]
	#[track_caller]
	pub fn prev_position(&self, position: Position) -> Option<Position> {
		let node = self.expect_node(position);
		self.groups
			.links(node)
			.prev
			.map(|prev| self.position(prev))
	}

	/// The position of the element `index` steps from the start, iff there is one.
	///
	/// Walks from whichever end is closer.
	#[must_use]
	pub fn position_at(&self, index: usize) -> Option<Position> {
		if index >= self.len {
			None
		} else if index <= self.len / 2 {
			self.positions().nth(index)
		} else {
			self.positions().nth_back(self.len - 1 - index)
		}
	}

	/// How many elements precede `position`, iff it is valid.
	#[must_use]
	pub fn index_of(&self, position: Position) -> Option<usize> {
		let target = self.resolve(position)?;
		self.nodes().position(|node| node == target)
	}

	/// Finds the position of the element `element` refers to, iff it is stored in this colony.
	#[must_use]
	pub fn position_of(&self, element: &T) -> Option<Position> {
		self.groups.active_groups().find_map(|(group, storage)| {
			storage
				.slot_of(element)
				.map(|slot| self.position(NodeRef { group, slot }))
		})
	}

	/// Whether `position` refers to a live element of this colony.
	#[must_use]
	pub fn contains(&self, position: Position) -> bool {
		self.resolve(position).is_some()
	}

	/// Retrieves a reference to the element at `position`, iff it is valid.
	#[must_use]
	pub fn get(&self, position: Position) -> Option<&T> {
		self.resolve(position).map(|node| self.groups.value(node))
	}

	/// Retrieves a mutable reference to the element at `position`, iff it is valid.
	#[must_use]
	pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
		self.resolve(position)
			.map(|node| self.groups.value_mut(node))
	}

	/// The first element, iff any.
	#[must_use]
	pub fn front(&self) -> Option<&T> {
		self.head.map(|node| self.groups.value(node))
	}

	/// The last element, iff any.
	#[must_use]
	pub fn back(&self) -> Option<&T> {
		self.tail.map(|node| self.groups.value(node))
	}

	/// The first element, iff any.
	#[must_use]
	pub fn front_mut(&mut self) -> Option<&mut T> {
		self.head.map(|node| self.groups.value_mut(node))
	}

	/// The last element, iff any.
	#[must_use]
	pub fn back_mut(&mut self) -> Option<&mut T> {
		self.tail.map(|node| self.groups.value_mut(node))
	}

	/// Moves all elements of `other` right before `at` (or to the end for [`None`]), leaving `other` empty.
	///
	/// `other`'s groups are taken over as they are: no element is moved in memory,
	/// and positions into `other` now resolve in this colony.
	///
	/// # Panics
	///
	/// Iff `at` is invalid or the group bookkeeping can't be allocated.
	#[track_caller]
	pub fn splice(&mut self, at: Option<Position>, other: &mut Self) {
		if let Err(error) = self.try_splice(at, other) {
			error.raise()
		}
	}

	/// Moves all elements of `other` right before `at` (or to the end for [`None`]), leaving `other` empty.
	///
	/// Retained groups of both colonies are freed in the process.
	///
	/// # Errors
	///
	/// Iff `at` is invalid or the group bookkeeping can't be allocated. Both colonies are left unchanged.
	pub fn try_splice(&mut self, at: Option<Position>, other: &mut Self) -> Result<(), ColonyError> {
		let before = self.resolve_at(at)?;
		if other.is_empty() {
			return Ok(());
		}
		if self.is_empty() {
			mem::swap(&mut self.groups, &mut other.groups);
			mem::swap(&mut self.head, &mut other.head);
			mem::swap(&mut self.tail, &mut other.tail);
			mem::swap(&mut self.len, &mut other.len);
			mem::swap(&mut self.erased, &mut other.erased);
			return Ok(());
		}

		self.groups.try_prepare_append(&other.groups)?;
		self.groups.trim();
		other.groups.trim();
		// Only the back group may have an unused tail.
		self.erased += self.groups.seal_back() as usize;
		let offset = self.groups.append(&mut other.groups);

		let rebase = |node: NodeRef| NodeRef {
			group: node.group + offset,
			..node
		};
		let (Some(first), Some(last)) = (
			other.head.take().map(rebase),
			other.tail.take().map(rebase),
		) else {
			unreachable!("non-empty colony without head or tail")
		};
		let prev = match before {
			Some(before) => self.groups.links(before).prev,
			None => self.tail,
		};
		self.link_chain(prev, first, last, before);
		self.len += mem::take(&mut other.len);
		self.erased += mem::take(&mut other.erased);
		Ok(())
	}

	/// Sorts the elements, keeping equal elements in their current order.
	///
	/// Only the sequence links change: positions and element addresses stay valid.
	pub fn sort(&mut self)
	where
		T: Ord,
	{
		self.sort_by(T::cmp);
	}

	/// Sorts the elements with a comparator, keeping equal elements in their current order.
	///
	/// If `compare` panics, the order is unchanged.
	pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) {
		if self.len < 2 {
			return;
		}
		let mut nodes: Vec<NodeRef> = self.nodes().collect();
		let groups = &self.groups;
		nodes.sort_by(|a, b| compare(groups.value(*a), groups.value(*b)));
		self.relink(&nodes);
	}

	/// Sorts the elements by a key, keeping equal elements in their current order.
	pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(&T) -> K) {
		self.sort_by(|a, b| key(a).cmp(&key(b)));
	}

	fn relink(&mut self, nodes: &[NodeRef]) {
		self.head = nodes.first().copied();
		self.tail = nodes.last().copied();
		for (i, &node) in nodes.iter().enumerate() {
			*self.groups.links_mut(node) = Links {
				prev: i.checked_sub(1).map(|prev| nodes[prev]),
				next: nodes.get(i + 1).copied(),
			};
		}
	}

	/// Moves all elements of `other` into this colony, merging two sorted sequences into one.
	///
	/// # Panics
	///
	/// Iff the group bookkeeping can't be allocated.
	pub fn merge(&mut self, other: &mut Self)
	where
		T: Ord,
	{
		self.merge_by(other, T::cmp);
	}

	/// Moves all elements of `other` into this colony, merging two sequences sorted by `compare` into one.
	///
	/// Of equal elements, those from `self` come first.
	///
	/// # Panics
	///
	/// Iff the group bookkeeping can't be allocated.
	/// If `compare` panics, `other`'s elements have already been appended unmerged.
	#[track_caller]
	pub fn merge_by(&mut self, other: &mut Self, mut compare: impl FnMut(&T, &T) -> Ordering) {
		if other.is_empty() {
			return;
		}
		let ours = self.len;
		self.splice(None, other);

		let nodes: Vec<NodeRef> = self.nodes().collect();
		let (left, right) = nodes.split_at(ours);
		let mut merged = Vec::with_capacity(nodes.len());
		let (mut l, mut r) = (0, 0);
		while l < left.len() && r < right.len() {
			if compare(self.groups.value(right[r]), self.groups.value(left[l])) == Ordering::Less {
				merged.push(right[r]);
				r += 1;
			} else {
				merged.push(left[l]);
				l += 1;
			}
		}
		merged.extend_from_slice(&left[l..]);
		merged.extend_from_slice(&right[r..]);
		self.relink(&merged);
	}

	/// Erases each element that is equal to the element before it. Returns how many were erased.
	pub fn unique(&mut self) -> usize
	where
		T: PartialEq,
	{
		self.unique_by(|kept, candidate| kept == candidate)
	}

	/// Erases each element for which `same(kept, candidate)` holds, where `kept` is the closest preceding element that was kept.
	/// Returns how many were erased.
	pub fn unique_by(&mut self, mut same: impl FnMut(&T, &T) -> bool) -> usize {
		let before = self.len;
		let mut current = self.head;
		while let Some(node) = current {
			let Some(next) = self.groups.links(node).next else {
				break;
			};
			if same(self.groups.value(node), self.groups.value(next)) {
				self.erase_node(next);
			} else {
				current = Some(next);
			}
		}
		before - self.len
	}

	/// Erases all elements equal to `value`. Returns how many were erased.
	pub fn remove_matching(&mut self, value: &T) -> usize
	where
		T: PartialEq,
	{
		self.remove_if(|element| element == value)
	}

	/// Erases all elements for which `predicate` holds. Returns how many were erased.
	pub fn remove_if(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
		let before = self.len;
		let mut current = self.head;
		while let Some(node) = current {
			current = if predicate(self.groups.value(node)) {
				self.erase_node(node)
			} else {
				self.groups.links(node).next
			};
		}
		before - self.len
	}

	/// Keeps only the elements for which `predicate` holds.
	pub fn retain(&mut self, mut predicate: impl FnMut(&T) -> bool) {
		self.remove_if(|element| !predicate(element));
	}

	/// Reverses the order of the elements.
	pub fn reverse(&mut self) {
		let mut current = self.head;
		while let Some(node) = current {
			let links = self.groups.links_mut(node);
			mem::swap(&mut links.prev, &mut links.next);
			current = links.prev;
		}
		mem::swap(&mut self.head, &mut self.tail);
	}

	/// Moves the element at `position` right before `at` (or to the end for [`None`]).
	///
	/// # Panics
	///
	/// Iff either position is invalid.
	#[track_caller]
	pub fn reorder(&mut self, at: Option<Position>, position: Position) {
		let next = self.next_position(position);
		self.reorder_range(at, position, next);
	}

	/// Moves the elements from `first` up to but excluding `last` (or through the end for [`None`])
	/// right before `at` (or to the end for [`None`]).
	///
	/// # Panics
	///
	/// Iff any position is invalid, `last` precedes `first` or `at` lies within the moved range.
	#[track_caller]
	pub fn reorder_range(&mut self, at: Option<Position>, first: Position, last: Option<Position>) {
		let before = at.map(|at| self.expect_node(at));
		let first = self.expect_node(first);
		let end = last.map(|last| self.expect_node(last));
		if before == Some(first) || before == end || Some(first) == end {
			return;
		}

		let mut last = first;
		loop {
			assert!(Some(last) != before, "reorder target lies within the moved range");
			let next = self.groups.links(last).next;
			if next == end {
				break;
			}
			last = next.unwrap_or_else(|| panic!("reorder range end precedes its start"));
		}

		self.unlink_chain(first, last);
		let prev = match before {
			Some(before) => self.groups.links(before).prev,
			None => self.tail,
		};
		self.link_chain(prev, first, last, before);
	}
}

impl<T, A: Allocator + Clone> Index<Position> for Colony<T, A> {
	type Output = T;

	#[track_caller]
	fn index(&self, position: Position) -> &T {
		let node = self.expect_node(position);
		self.groups.value(node)
	}
}

impl<T, A: Allocator + Clone> IndexMut<Position> for Colony<T, A> {
	#[track_caller]
	fn index_mut(&mut self, position: Position) -> &mut T {
		let node = self.expect_node(position);
		self.groups.value_mut(node)
	}
}

impl<T: Clone, A: Allocator + Clone> Clone for Colony<T, A> {
	/// Creates a packed copy: the elements in sequence order, in as few groups as the configuration allows.
	fn clone(&self) -> Self {
		let mut clone = Self::with_config_in(self.config, self.allocator().clone());
		clone.extend_at(None, self.iter().cloned());
		clone
	}
}

impl<T: fmt::Debug, A: Allocator + Clone> fmt::Debug for Colony<T, A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

impl<T: PartialEq, A: Allocator + Clone, B: Allocator + Clone> PartialEq<Colony<T, B>>
	for Colony<T, A>
{
	fn eq(&self, other: &Colony<T, B>) -> bool {
		self.len == other.len && self.iter().eq(other.iter())
	}
}

impl<T: Eq, A: Allocator + Clone> Eq for Colony<T, A> {}

impl<T: PartialOrd, A: Allocator + Clone, B: Allocator + Clone> PartialOrd<Colony<T, B>>
	for Colony<T, A>
{
	fn partial_cmp(&self, other: &Colony<T, B>) -> Option<Ordering> {
		self.iter().partial_cmp(other.iter())
	}
}

impl<T: Ord, A: Allocator + Clone> Ord for Colony<T, A> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.iter().cmp(other.iter())
	}
}

impl<T: Hash, A: Allocator + Clone> Hash for Colony<T, A> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_usize(self.len);
		self.iter().for_each(|element| element.hash(state));
	}
}

impl<T, A: Allocator + Clone> Extend<T> for Colony<T, A> {
	fn extend<I: IntoIterator<Item = T>>(&mut self, values: I) {
		self.extend_at(None, values);
	}
}

impl<'a, T: 'a + Copy, A: Allocator + Clone> Extend<&'a T> for Colony<T, A> {
	fn extend<I: IntoIterator<Item = &'a T>>(&mut self, values: I) {
		self.extend_at(None, values.into_iter().copied());
	}
}

impl<T> FromIterator<T> for Colony<T> {
	fn from_iter<I: IntoIterator<Item = T>>(values: I) -> Self {
		let mut colony = Self::new();
		colony.extend_at(None, values);
		colony
	}
}

impl<T, const N: usize> From<[T; N]> for Colony<T> {
	fn from(values: [T; N]) -> Self {
		values.into_iter().collect()
	}
}

impl<T> From<Vec<T>> for Colony<T> {
	fn from(values: Vec<T>) -> Self {
		values.into_iter().collect()
	}
}

impl<T, A: Allocator + Clone> IntoIterator for Colony<T, A> {
	type Item = T;
	type IntoIter = IntoIter<T, A>;

	fn into_iter(self) -> Self::IntoIter {
		IntoIter::new(self)
	}
}

impl<'a, T, A: Allocator + Clone> IntoIterator for &'a Colony<T, A> {
	type Item = &'a T;
	type IntoIter = Iter<'a, T, A>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

impl<'a, T, A: Allocator + Clone> IntoIterator for &'a mut Colony<T, A> {
	type Item = &'a mut T;
	type IntoIter = IterMut<'a, T, A>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter_mut()
	}
}
