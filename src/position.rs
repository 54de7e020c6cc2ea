//! Element handles.

use core::{
	hash::{Hash, Hasher},
	sync::atomic::{AtomicUsize, Ordering},
};

/// Identity of one group allocation (or reset) across all colonies in the process.
///
/// Never reused, so a [`Position`] can't accidentally resolve into a recycled group or a foreign colony.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct GroupKey(usize);

impl GroupKey {
	pub(crate) fn mint() -> Self {
		static NEXT: AtomicUsize = AtomicUsize::new(0);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

/// An internal link to a live slot: group store index and slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NodeRef {
	pub(crate) group: u32,
	pub(crate) slot: u32,
}

/// Sequence links of a live slot. `None` stands for the end of the sequence in either direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Links {
	pub(crate) prev: Option<NodeRef>,
	pub(crate) next: Option<NodeRef>,
}

/// A stable handle to an element of a [`Colony`](`crate::Colony`).
///
/// Positions stay valid across insertion and erasure of *other* elements, across [`sort`](`crate::Colony::sort`),
/// [`reverse`](`crate::Colony::reverse`) and [`reorder`](`crate::Colony::reorder`),
/// and across [`splice`](`crate::Colony::splice`) (after which they resolve in the receiving colony).
///
/// They are checked on every use: a position to an erased element, into a cleared or rebuilt colony,
/// or into a different colony is rejected rather than aliasing whatever now occupies that slot.
///
/// The end of a sequence is represented as [`None`] wherever an [`Option<Position>`] is taken or returned.
///
/// Two positions are equal iff they refer to the same element, so a position held across a
/// [`splice`](`crate::Colony::splice`) still equals the one the receiving colony hands out for that element.
#[derive(Clone, Copy, Debug)]
pub struct Position {
	pub(crate) key: GroupKey,
	/// Store index the group was last seen at. Only a lookup hint, so not part of the identity.
	pub(crate) group: u32,
	pub(crate) slot: u32,
	pub(crate) generation: u32,
}

impl PartialEq for Position {
	fn eq(&self, other: &Self) -> bool {
		(self.key, self.slot, self.generation) == (other.key, other.slot, other.generation)
	}
}

impl Eq for Position {}

impl Hash for Position {
	fn hash<H: Hasher>(&self, state: &mut H) {
		(self.key, self.slot, self.generation).hash(state);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keys_are_unique() {
		let a = GroupKey::mint();
		let b = GroupKey::mint();
		assert_ne!(a, b);
	}

	#[test]
	fn group_hint_is_not_part_of_identity() {
		let key = GroupKey::mint();
		let held = Position {
			key,
			group: 0,
			slot: 3,
			generation: 1,
		};
		let moved = Position { group: 5, ..held };
		assert_eq!(held, moved);
		assert_ne!(held, Position { generation: 2, ..held });
	}
}
