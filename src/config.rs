//! Group sizing and retention configuration.

use core::mem::size_of;

use allocator_api2::alloc::Global;

use crate::{
	group::{Group, Slot},
	ColonyError,
};

/// What to do with a group that became empty through erasure while it is not the back group.
///
/// The back group is always kept for reuse, so that alternating `push_back`/`pop_back` never reallocates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Retention {
	/// Keep groups of maximum size and the last few active groups, release all others.
	///
	/// This avoids allocation churn near the tail, where most growth happens,
	/// without holding on to many small early groups.
	#[default]
	NearTail,
	/// Keep every emptied group until [`Colony::trim`](`crate::Colony::trim`) or [`Colony::shrink_to_fit`](`crate::Colony::shrink_to_fit`).
	KeepAll,
	/// Release every emptied non-back group immediately.
	ReleaseAll,
}

impl Retention {
	/// Whether an emptied group is kept, given whether it has maximum size and
	/// how many active groups separate it from the back group.
	pub(crate) fn retains(self, is_max_size: bool, distance_from_back: usize) -> bool {
		match self {
			Self::NearTail => is_max_size || distance_from_back <= 2,
			Self::KeepAll => true,
			Self::ReleaseAll => false,
		}
	}
}

/// Runtime configuration of a [`Colony`](`crate::Colony`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColonyConfig {
	min_group_size: u32,
	max_group_size: u32,
	/// Empty-group retention policy.
	pub retention: Retention,
}

impl Default for ColonyConfig {
	fn default() -> Self {
		Self::new()
	}
}

impl ColonyConfig {
	/// Default capacity of the first group and floor of all later ones.
	pub const DEFAULT_MIN_GROUP_SIZE: u32 = 8;
	/// Default ceiling on the capacity of a single group.
	pub const DEFAULT_MAX_GROUP_SIZE: u32 = 2048;
	/// The smallest accepted minimum group size.
	pub const MIN_GROUP_SIZE_FLOOR: u32 = 3;

	/// Creates the default configuration.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			min_group_size: Self::DEFAULT_MIN_GROUP_SIZE,
			max_group_size: Self::DEFAULT_MAX_GROUP_SIZE,
			retention: Retention::NearTail,
		}
	}

	/// Creates a configuration with the default maximum group size and a minimum derived
	/// from the per-group bookkeeping overhead for `T`.
	///
	/// For small `T`, the minimum is raised so that a group's slots are at least twice as large as its header.
	#[must_use]
	pub fn for_type<T>() -> Self {
		let slot = size_of::<Slot<T>>().max(1);
		let overhead = (size_of::<Group<T, Global>>() + size_of::<u32>()) * 2;
		let min = if slot * Self::DEFAULT_MIN_GROUP_SIZE as usize > overhead {
			Self::DEFAULT_MIN_GROUP_SIZE
		} else {
			u32::try_from(overhead / slot + 1)
				.unwrap_or(Self::DEFAULT_MAX_GROUP_SIZE)
				.min(Self::DEFAULT_MAX_GROUP_SIZE)
		};
		Self {
			min_group_size: min,
			..Self::new()
		}
	}

	/// Creates a configuration with explicit group size limits.
	///
	/// # Errors
	///
	/// Iff `min` is below [`MIN_GROUP_SIZE_FLOOR`](`Self::MIN_GROUP_SIZE_FLOOR`) or above `max`.
	pub fn with_group_sizes(min: u32, max: u32) -> Result<Self, ColonyError> {
		Self::new().group_sizes(min, max)
	}

	/// Replaces the group size limits of this configuration.
	///
	/// # Errors
	///
	/// Iff `min` is below [`MIN_GROUP_SIZE_FLOOR`](`Self::MIN_GROUP_SIZE_FLOOR`) or above `max`.
	pub fn group_sizes(self, min: u32, max: u32) -> Result<Self, ColonyError> {
		if min < Self::MIN_GROUP_SIZE_FLOOR || min > max {
			return Err(ColonyError::InvalidGroupSizes { min, max });
		}
		Ok(Self {
			min_group_size: min,
			max_group_size: max,
			..self
		})
	}

	/// Replaces the retention policy of this configuration.
	#[must_use]
	pub const fn retention(self, retention: Retention) -> Self {
		Self { retention, ..self }
	}

	/// Capacity of the first group and floor of all later ones.
	#[must_use]
	pub const fn min_group_size(&self) -> u32 {
		self.min_group_size
	}

	/// Ceiling on the capacity of a single group.
	#[must_use]
	pub const fn max_group_size(&self) -> u32 {
		self.max_group_size
	}

	/// The capacity of a group allocated while the colony holds `len` elements.
	pub(crate) fn growth(&self, len: usize) -> u32 {
		u32::try_from(len)
			.unwrap_or(u32::MAX)
			.clamp(self.min_group_size, self.max_group_size)
	}
}
