//! Iterators over a [`Colony`](`crate::Colony`).
//!
//! All of them walk the sequence links, so they visit elements in sequence order (not memory order)
//! and skip erased slots for free.

use core::{iter::FusedIterator, marker::PhantomData, ptr::NonNull};

use allocator_api2::alloc::{Allocator, Global};

use crate::{
	group_vector::GroupVector,
	position::{Links, NodeRef},
	Colony, Position,
};

/// Shared double-ended walk over a chain of nodes.
///
/// `remaining` keeps the two ends from crossing.
#[derive(Clone, Copy)]
struct Cursor {
	front: Option<NodeRef>,
	back: Option<NodeRef>,
	remaining: usize,
}

impl Cursor {
	fn next(&mut self, links: impl FnOnce(NodeRef) -> Links) -> Option<NodeRef> {
		if self.remaining == 0 {
			return None;
		}
		let node = self.front?;
		self.front = links(node).next;
		self.remaining -= 1;
		Some(node)
	}

	fn next_back(&mut self, links: impl FnOnce(NodeRef) -> Links) -> Option<NodeRef> {
		if self.remaining == 0 {
			return None;
		}
		let node = self.back?;
		self.back = links(node).prev;
		self.remaining -= 1;
		Some(node)
	}
}

/// Iterates over references to the elements of a [`Colony`] in sequence order.
pub struct Iter<'a, T, A: Allocator + Clone = Global> {
	groups: &'a GroupVector<T, A>,
	cursor: Cursor,
}

impl<'a, T, A: Allocator + Clone> Iter<'a, T, A> {
	pub(crate) fn new(
		groups: &'a GroupVector<T, A>,
		front: Option<NodeRef>,
		back: Option<NodeRef>,
		remaining: usize,
	) -> Self {
		Self {
			groups,
			cursor: Cursor {
				front,
				back,
				remaining,
			},
		}
	}
}

impl<T, A: Allocator + Clone> Clone for Iter<'_, T, A> {
	fn clone(&self) -> Self {
		Self {
			groups: self.groups,
			cursor: self.cursor,
		}
	}
}

impl<'a, T, A: Allocator + Clone> Iterator for Iter<'a, T, A> {
	type Item = &'a T;

	fn next(&mut self) -> Option<Self::Item> {
		let groups = self.groups;
		self.cursor
			.next(|node| groups.links(node))
			.map(|node| groups.value(node))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.cursor.remaining, Some(self.cursor.remaining))
	}
}

impl<T, A: Allocator + Clone> DoubleEndedIterator for Iter<'_, T, A> {
	fn next_back(&mut self) -> Option<Self::Item> {
		let groups = self.groups;
		self.cursor
			.next_back(|node| groups.links(node))
			.map(|node| groups.value(node))
	}
}

impl<T, A: Allocator + Clone> ExactSizeIterator for Iter<'_, T, A> {}
impl<T, A: Allocator + Clone> FusedIterator for Iter<'_, T, A> {}

/// Iterates over mutable references to the elements of a [`Colony`] in sequence order.
pub struct IterMut<'a, T, A: Allocator + Clone = Global> {
	groups: NonNull<GroupVector<T, A>>,
	cursor: Cursor,
	_phantom: PhantomData<&'a mut T>,
}

impl<'a, T, A: Allocator + Clone> IterMut<'a, T, A> {
	pub(crate) fn new(
		groups: &'a mut GroupVector<T, A>,
		front: Option<NodeRef>,
		back: Option<NodeRef>,
		remaining: usize,
	) -> Self {
		Self {
			groups: NonNull::from(groups),
			cursor: Cursor {
				front,
				back,
				remaining,
			},
			_phantom: PhantomData,
		}
	}

	/// Reads the links of `node` and hands out its value for the rest of `'a`.
	///
	/// # Safety
	///
	/// `node` must be a live node that hasn't been handed out yet.
	unsafe fn visit(groups: NonNull<GroupVector<T, A>>, node: NodeRef) -> (Links, &'a mut T) {
		//SAFETY: Only the one slot is borrowed, and each slot is visited at most once thanks to `remaining`.
		let slot = &mut *GroupVector::slot_ptr(groups.as_ptr(), node);
		match (slot.links(), slot.value_mut()) {
			(Some(links), Some(value)) => (links, value),
			_ => unreachable!("visited erased slot {:?}", node),
		}
	}
}

//SAFETY: Behaves like `&'a mut GroupVector<T, A>`.
unsafe impl<T: Send, A: Allocator + Clone + Send> Send for IterMut<'_, T, A> {}
//SAFETY: Behaves like `&'a mut GroupVector<T, A>`.
unsafe impl<T: Sync, A: Allocator + Clone + Sync> Sync for IterMut<'_, T, A> {}

impl<'a, T, A: Allocator + Clone> Iterator for IterMut<'a, T, A> {
	type Item = &'a mut T;

	fn next(&mut self) -> Option<Self::Item> {
		let groups = self.groups;
		let mut value = None;
		self.cursor.next(|node| {
			let (links, v) = unsafe { Self::visit(groups, node) };
			value = Some(v);
			links
		});
		value
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.cursor.remaining, Some(self.cursor.remaining))
	}
}

impl<T, A: Allocator + Clone> DoubleEndedIterator for IterMut<'_, T, A> {
	fn next_back(&mut self) -> Option<Self::Item> {
		let groups = self.groups;
		let mut value = None;
		self.cursor.next_back(|node| {
			let (links, v) = unsafe { Self::visit(groups, node) };
			value = Some(v);
			links
		});
		value
	}
}

impl<T, A: Allocator + Clone> ExactSizeIterator for IterMut<'_, T, A> {}
impl<T, A: Allocator + Clone> FusedIterator for IterMut<'_, T, A> {}

/// Moves the elements out of a [`Colony`] in sequence order.
pub struct IntoIter<T, A: Allocator + Clone = Global> {
	colony: Colony<T, A>,
}

impl<T, A: Allocator + Clone> IntoIter<T, A> {
	pub(crate) fn new(colony: Colony<T, A>) -> Self {
		Self { colony }
	}
}

impl<T, A: Allocator + Clone> Iterator for IntoIter<T, A> {
	type Item = T;

	fn next(&mut self) -> Option<Self::Item> {
		self.colony.pop_front()
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.colony.len(), Some(self.colony.len()))
	}
}

impl<T, A: Allocator + Clone> DoubleEndedIterator for IntoIter<T, A> {
	fn next_back(&mut self) -> Option<Self::Item> {
		self.colony.pop_back()
	}
}

impl<T, A: Allocator + Clone> ExactSizeIterator for IntoIter<T, A> {}
impl<T, A: Allocator + Clone> FusedIterator for IntoIter<T, A> {}

/// Iterates over the [`Position`]s of the elements of a [`Colony`] in sequence order.
pub struct Positions<'a, T, A: Allocator + Clone = Global> {
	groups: &'a GroupVector<T, A>,
	cursor: Cursor,
}

impl<'a, T, A: Allocator + Clone> Positions<'a, T, A> {
	pub(crate) fn new(
		groups: &'a GroupVector<T, A>,
		front: Option<NodeRef>,
		back: Option<NodeRef>,
		remaining: usize,
	) -> Self {
		Self {
			groups,
			cursor: Cursor {
				front,
				back,
				remaining,
			},
		}
	}
}

impl<T, A: Allocator + Clone> Clone for Positions<'_, T, A> {
	fn clone(&self) -> Self {
		Self {
			groups: self.groups,
			cursor: self.cursor,
		}
	}
}

impl<T, A: Allocator + Clone> Iterator for Positions<'_, T, A> {
	type Item = Position;

	fn next(&mut self) -> Option<Self::Item> {
		let groups = self.groups;
		self.cursor
			.next(|node| groups.links(node))
			.map(|node| groups.position(node))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.cursor.remaining, Some(self.cursor.remaining))
	}
}

impl<T, A: Allocator + Clone> DoubleEndedIterator for Positions<'_, T, A> {
	fn next_back(&mut self) -> Option<Self::Item> {
		let groups = self.groups;
		self.cursor
			.next_back(|node| groups.links(node))
			.map(|node| groups.position(node))
	}
}

impl<T, A: Allocator + Clone> ExactSizeIterator for Positions<'_, T, A> {}
impl<T, A: Allocator + Clone> FusedIterator for Positions<'_, T, A> {}
