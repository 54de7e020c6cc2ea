//! Error types.

use core::{alloc::Layout, fmt};

/// Errors reported by the fallible [`Colony`](`crate::Colony`) API.
///
/// All of them leave the colony exactly as it was before the failed call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColonyError {
	/// The requested capacity exceeds what a single group or the group vector can address.
	CapacityOverflow,
	/// The allocator refused to provide storage for a new group.
	AllocationFailed {
		/// The layout that was requested.
		layout: Layout,
	},
	/// A [`Position`](`crate::Position`) was stale or belongs to another colony.
	InvalidPosition,
	/// Group size limits were out of order or out of range.
	InvalidGroupSizes {
		/// The requested minimum group size.
		min: u32,
		/// The requested maximum group size.
		max: u32,
	},
}

impl ColonyError {
	/// Converts an allocation error into the matching standard out-of-memory signal.
	///
	/// Used by the infallible wrappers.
	#[track_caller]
	pub(crate) fn raise(self) -> ! {
		match self {
			Self::AllocationFailed { layout } => alloc::alloc::handle_alloc_error(layout),
			other => panic!("{}", other),
		}
	}
}

impl fmt::Display for ColonyError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::CapacityOverflow => write!(f, "capacity overflow"),
			Self::AllocationFailed { layout } => write!(
				f,
				"memory allocation of {} bytes (aligned to {}) failed",
				layout.size(),
				layout.align()
			),
			Self::InvalidPosition => write!(f, "stale or foreign position"),
			Self::InvalidGroupSizes { min, max } => write!(
				f,
				"invalid group sizes: minimum {} and maximum {} (need 3 <= minimum <= maximum)",
				min, max
			),
		}
	}
}

#[cfg(feature = "std")]
impl std::error::Error for ColonyError {}
