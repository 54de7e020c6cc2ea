use crate::{Colony, ColonyError, Position};
use alloc::boxed::Box;
use allocator_api2::alloc::Allocator;
use core::{cmp::Ordering, mem::ManuallyDrop, ops::Deref, pin::Pin, ptr};
use tap::Pipe;

mod sealed {
	use crate::Colony;
	use allocator_api2::alloc::Allocator;
	use core::pin::Pin;

	pub trait Sealed: Sized {}
	impl<T, A: Allocator + Clone> Sealed for Pin<Colony<T, A>> {}
}
use sealed::Sealed;

/// The value-pinning [`Colony`] API.
///
/// This can't be associated directly because `self: Pin<Self>` is currently not a valid method receiver.
///
/// Only methods that never move a live value are available here.
/// Every position-based operation keeps the exact semantics of its [`Colony`] counterpart.
///
/// # A note about performance
///
/// The iterators returned here are boxed, since their mapping closures can't be named in return position.
///
/// As a workaround, it is presently legal to reinterpret a [`Pin<Colony<T, A>>`] as [`Colony<T, A>`],
/// and to call methods that exist in both APIs in their [`Colony<T, A>`] that way as long as you treat their returned value references as pinning.
pub trait PinningColony: Sealed {
	/// The type of stored values.
	type T;
	/// The allocator type.
	type A: Allocator + Clone;

	/// Converts this instance back into a non-pinning [`Colony<T, A>`].
	fn unpin(self) -> Colony<Self::T, Self::A>
	where
		Self::T: Unpin;

	/// The number of live elements.
	fn len(&self) -> usize;

	/// Whether there are no live elements.
	fn is_empty(&self) -> bool;

	/// Total slots across all groups.
	fn capacity(&self) -> usize;

	/// Retrieves a pinning reference to the element at `position`, iff it is valid.
	fn get(&self, position: Position) -> Option<Pin<&Self::T>>;

	/// Retrieves a pinning mutable reference to the element at `position`, iff it is valid.
	fn get_mut(&mut self, position: Position) -> Option<Pin<&mut Self::T>>;

	/// Inserts `value` at the end of the sequence.
	///
	/// # Panics
	///
	/// Iff a required group can't be allocated.
	fn insert(&mut self, value: Self::T) -> Position;

	/// Inserts `value` right before `at` (or at the end for [`None`]).
	///
	/// # Panics
	///
	/// Iff `at` is invalid or a required group can't be allocated.
	fn insert_before(&mut self, at: Option<Position>, value: Self::T) -> Position;

	/// Inserts `value` right before `at` (or at the end for [`None`]).
	///
	/// # Errors
	///
	/// Iff `at` is invalid or a required group can't be allocated.
	fn try_insert_before(
		&mut self,
		at: Option<Position>,
		value: Self::T,
	) -> Result<Position, ColonyError>;

	/// Drops the element at `position` in place and returns the position of the following element.
	///
	/// # Panics
	///
	/// Iff `position` is invalid.
	fn erase(&mut self, position: Position) -> Option<Position>;

	/// Drops the elements from `first` up to but excluding `last` (or through the end for [`None`]) in place.
	///
	/// # Panics
	///
	/// Iff `first` or `last` is invalid.
	fn erase_range(&mut self, first: Position, last: Option<Position>) -> Option<Position>;

	/// Drops all elements in place.
	fn clear(&mut self);

	/// Ensures that at least `additional` more elements fit without allocating.
	///
	/// # Panics
	///
	/// Iff the groups can't be allocated.
	fn reserve(&mut self, additional: usize);

	/// Frees all retained groups that currently hold no elements.
	fn trim(&mut self);

	/// The position of the first element, iff any.
	fn first(&self) -> Option<Position>;

	/// The position of the last element, iff any.
	fn last(&self) -> Option<Position>;

	/// The position following `position`, or [`None`] at the end.
	///
	/// # Panics
	///
	/// Iff `position` is invalid.
	fn next_position(&self, position: Position) -> Option<Position>;

	/// The position preceding `position`, or [`None`] at the start.
	///
	/// # Panics
	///
	/// Iff `position` is invalid.
	fn prev_position(&self, position: Position) -> Option<Position>;

	/// Iterates over the positions of all elements in sequence order.
	fn positions(&self) -> Box<dyn '_ + DoubleEndedIterator<Item = Position>>;

	/// Iterates over pinning references to the elements in sequence order.
	fn iter(&self) -> Box<dyn '_ + DoubleEndedIterator<Item = Pin<&Self::T>>>;

	/// Iterates over pinning mutable references to the elements in sequence order.
	fn iter_mut(&mut self) -> Box<dyn '_ + DoubleEndedIterator<Item = Pin<&mut Self::T>>>;

	/// Sorts the elements by relinking them, keeping equal elements in their current order.
	fn sort_by(&mut self, compare: impl FnMut(&Self::T, &Self::T) -> Ordering);

	/// Reverses the order of the elements.
	fn reverse(&mut self);

	/// Moves the element at `position` right before `at` (or to the end for [`None`]).
	///
	/// # Panics
	///
	/// Iff either position is invalid.
	fn reorder(&mut self, at: Option<Position>, position: Position);

	/// Moves all elements of `other` right before `at` (or to the end for [`None`]), leaving `other` empty.
	///
	/// # Panics
	///
	/// Iff `at` is invalid or the group bookkeeping can't be allocated.
	fn splice(&mut self, at: Option<Position>, other: &mut Self);

	/// Drops all elements for which `predicate` holds in place. Returns how many were dropped.
	fn remove_if(&mut self, predicate: impl FnMut(&Self::T) -> bool) -> usize;
}

impl<T, A: Allocator + Clone> PinningColony for Pin<Colony<T, A>> {
	type T = T;
	type A = A;

	fn unpin(self) -> Colony<T, A>
	where
		T: Unpin,
	{
		let this = ManuallyDrop::new(self);
		//SAFETY: `Pin` is `#[repr(transparent)]` and the original is never dropped.
		unsafe { ptr::read((&*this as *const Self).cast::<Colony<T, A>>()) }
	}

	fn len(&self) -> usize {
		self.as_non_pin().len()
	}

	fn is_empty(&self) -> bool {
		self.as_non_pin().is_empty()
	}

	fn capacity(&self) -> usize {
		self.as_non_pin().capacity()
	}

	fn get(&self, position: Position) -> Option<Pin<&T>> {
		self.as_non_pin().get(position).map(wrap_in_pin)
	}

	fn get_mut(&mut self, position: Position) -> Option<Pin<&mut T>> {
		self.as_non_pin_mut().get_mut(position).map(wrap_in_pin)
	}

	#[track_caller]
	fn insert(&mut self, value: T) -> Position {
		self.as_non_pin_mut().insert(value)
	}

	#[track_caller]
	fn insert_before(&mut self, at: Option<Position>, value: T) -> Position {
		self.as_non_pin_mut().insert_before(at, value)
	}

	fn try_insert_before(&mut self, at: Option<Position>, value: T) -> Result<Position, ColonyError> {
		self.as_non_pin_mut().try_insert_before(at, value)
	}

	#[track_caller]
	fn erase(&mut self, position: Position) -> Option<Position> {
		self.as_non_pin_mut().erase(position)
	}

	#[track_caller]
	fn erase_range(&mut self, first: Position, last: Option<Position>) -> Option<Position> {
		self.as_non_pin_mut().erase_range(first, last)
	}

	fn clear(&mut self) {
		self.as_non_pin_mut().clear();
	}

	#[track_caller]
	fn reserve(&mut self, additional: usize) {
		self.as_non_pin_mut().reserve(additional);
	}

	fn trim(&mut self) {
		self.as_non_pin_mut().trim();
	}

	fn first(&self) -> Option<Position> {
		self.as_non_pin().first()
	}

	fn last(&self) -> Option<Position> {
		self.as_non_pin().last()
	}

	#[track_caller]
	fn next_position(&self, position: Position) -> Option<Position> {
		self.as_non_pin().next_position(position)
	}

	#[track_caller]
	fn prev_position(&self, position: Position) -> Option<Position> {
		self.as_non_pin().prev_position(position)
	}

	fn positions(&self) -> Box<dyn '_ + DoubleEndedIterator<Item = Position>> {
		self.as_non_pin().positions().pipe(Box::new)
	}

	fn iter(&self) -> Box<dyn '_ + DoubleEndedIterator<Item = Pin<&T>>> {
		self.as_non_pin().iter().map(wrap_in_pin).pipe(Box::new)
	}

	fn iter_mut(&mut self) -> Box<dyn '_ + DoubleEndedIterator<Item = Pin<&mut T>>> {
		self.as_non_pin_mut()
			.iter_mut()
			.map(wrap_in_pin)
			.pipe(Box::new)
	}

	fn sort_by(&mut self, compare: impl FnMut(&T, &T) -> Ordering) {
		self.as_non_pin_mut().sort_by(compare);
	}

	fn reverse(&mut self) {
		self.as_non_pin_mut().reverse();
	}

	#[track_caller]
	fn reorder(&mut self, at: Option<Position>, position: Position) {
		self.as_non_pin_mut().reorder(at, position);
	}

	#[track_caller]
	fn splice(&mut self, at: Option<Position>, other: &mut Self) {
		self.as_non_pin_mut().splice(at, other.as_non_pin_mut());
	}

	fn remove_if(&mut self, predicate: impl FnMut(&T) -> bool) -> usize {
		self.as_non_pin_mut().remove_if(predicate)
	}
}

/// # Safety
///
/// This trait is only safe to implement if not misused.
unsafe trait PinHelper {
	type T;

	fn as_non_pin(&self) -> &Self::T;
	fn as_non_pin_mut(&mut self) -> &mut Self::T;
}

/// # Safety Notes
///
/// All methods on [`Colony`] that are callable through the pinning API act as if the values were always pinned:
/// they drop values in place and never move them into another slot.
unsafe impl<T, A: Allocator + Clone> PinHelper for Pin<Colony<T, A>> {
	type T = Colony<T, A>;

	fn as_non_pin(&self) -> &Self::T {
		unsafe { &*(self as *const Pin<Colony<T, A>>).cast::<Colony<T, A>>() }
	}

	fn as_non_pin_mut(&mut self) -> &mut Self::T {
		unsafe { &mut *(self as *mut Pin<Colony<T, A>>).cast::<Colony<T, A>>() }
	}
}

/// # Safety Notes
///
/// This would be horribly unsafe if exposed. It acts as adapter in the pinning API here,
/// since the non-pinning API (privately!) already acts as if the values were pinned,
/// as far as it is callable through the public pinning API.
fn wrap_in_pin<V: Deref>(value: V) -> Pin<V> {
	unsafe { Pin::new_unchecked(value) }
}
