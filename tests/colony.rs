use colony::{Colony, ColonyConfig, ColonyError, Position, Retention};
use core::mem;
use rand::{rngs::StdRng, Rng, SeedableRng};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen_test::wasm_bindgen_test as test;

fn contents<T: Clone>(colony: &Colony<T>) -> Vec<T> {
	colony.iter().cloned().collect()
}

#[test]
fn basics() {
	let mut colony = Colony::new();
	assert!(colony.is_empty());
	assert_eq!(colony.capacity(), 0);
	assert_eq!(colony.first(), None);

	for i in 0..10 {
		colony.insert(i);
	}
	assert_eq!(colony.len(), 10);
	assert_eq!(colony.iter().count(), 10);
	assert_eq!(contents(&colony), (0..10).collect::<Vec<_>>());
	assert_eq!(colony.front(), Some(&0));
	assert_eq!(colony.back(), Some(&9));
	assert_eq!(colony.iter().rev().copied().collect::<Vec<_>>(), (0..10).rev().collect::<Vec<_>>());

	*colony.front_mut().unwrap() = 100;
	*colony.back_mut().unwrap() = 900;
	for value in &mut colony {
		*value += 1;
	}
	assert_eq!(colony.front(), Some(&101));
	assert_eq!(colony.back(), Some(&901));
}

#[test]
fn positions_survive_other_insertions_and_erasures() {
	let mut colony = Colony::new();
	let positions: Vec<Position> = (0..1000).map(|i| colony.insert(i)).collect();
	let addresses: Vec<*const i32> = positions.iter().map(|&p| &colony[p] as *const i32).collect();

	for &position in positions.iter().step_by(3) {
		colony.erase(position);
	}
	for i in 1000..2000 {
		colony.insert(i);
	}

	for (i, (&position, &address)) in positions.iter().zip(&addresses).enumerate() {
		if i % 3 == 0 {
			assert_eq!(colony.get(position), None);
		} else {
			assert_eq!(colony.get(position), Some(&(i as i32)));
			assert_eq!(&colony[position] as *const i32, address);
		}
	}
	assert_eq!(colony.len(), 1000 - 334 + 1000);
	assert_eq!(colony.iter().count(), colony.len());
}

#[test]
fn insertion_order_skips_erased() {
	let mut colony = Colony::new();
	let positions: Vec<_> = (0..50).map(|i| colony.push_back(i)).collect();
	colony.erase(positions[10]);
	colony.erase(positions[0]);
	colony.erase(positions[49]);
	colony.push_front(-1);
	colony.push_back(50);

	let mut expected = vec![-1];
	expected.extend((1..49).filter(|&i| i != 10));
	expected.push(50);
	assert_eq!(contents(&colony), expected);
}

#[test]
fn copy_is_independent() {
	let mut original: Colony<i32> = (0..100).collect();
	let positions: Vec<_> = original.positions().collect();
	for &position in positions.iter().step_by(2) {
		original.erase(position);
	}

	let mut copy = original.clone();
	assert_eq!(copy, original);
	assert_eq!(contents(&copy), contents(&original));
	// Packed into a single group.
	assert_eq!(copy.capacity(), 50);

	copy.iter_mut().for_each(|value| *value *= 10);
	copy.insert(7);
	assert_eq!(contents(&original), (0..100).filter(|i| i % 2 == 1).collect::<Vec<_>>());
	assert_ne!(copy, original);
}

#[test]
fn take_leaves_source_empty() {
	let mut source: Colony<_> = (0..20).collect();
	let position = source.position_at(7).unwrap();
	let target = mem::take(&mut source);

	assert!(source.is_empty());
	assert_eq!(source.iter().next(), None);
	assert_eq!(contents(&target), (0..20).collect::<Vec<_>>());
	// Moving the colony keeps positions valid.
	assert_eq!(target.get(position), Some(&7));

	source.insert(1);
	assert_eq!(contents(&source), [1]);
}

#[test]
fn free_list_reuse_does_not_grow() {
	let mut colony = Colony::new();
	let positions: Vec<_> = (0..100).map(|i| colony.insert(i)).collect();
	let capacity = colony.capacity();
	let groups = colony.group_count();

	for &position in positions.iter().step_by(2) {
		colony.erase(position);
	}
	assert_eq!(colony.len(), 50);
	assert_eq!(colony.capacity(), capacity);

	for i in 0..50 {
		colony.insert(1000 + i);
	}
	assert_eq!(colony.len(), 100);
	assert_eq!(colony.capacity(), capacity);
	assert_eq!(colony.group_count(), groups);
}

#[test]
fn splice_example() {
	let mut a: Colony<i32> = [1, 2, 3, 4, 5].into();
	let mut b: Colony<i32> = [6, 7, 8, 9, 10].into();
	a.splice(None, &mut b);
	assert_eq!(contents(&a), (1..=10).collect::<Vec<_>>());
	assert!(b.is_empty());
	assert_eq!(b.capacity(), 0);

	b.insert(11);
	assert_eq!(contents(&b), [11]);
}

#[test]
fn splice_into_the_middle_keeps_positions() {
	let mut a = Colony::new();
	let a_positions: Vec<_> = (0..1000).map(|i| a.insert(i)).collect();
	for (i, &position) in a_positions.iter().enumerate() {
		if i % 7 == 0 {
			a.erase(position);
		}
	}
	let mut b = Colony::new();
	let b_positions: Vec<_> = (1000..1500).map(|i| b.insert(i)).collect();
	for (i, &position) in b_positions.iter().enumerate() {
		if i % 5 == 0 {
			b.erase(position);
		}
	}

	let a_model = contents(&a);
	let b_model = contents(&b);
	let at = a.position_at(10);
	a.splice(at, &mut b);

	let mut expected = a_model[..10].to_vec();
	expected.extend_from_slice(&b_model);
	expected.extend_from_slice(&a_model[10..]);
	assert_eq!(contents(&a), expected);
	assert_eq!(a.len(), expected.len());
	assert_eq!(a.iter().map(|&v| i64::from(v)).sum::<i64>(), expected.iter().map(|&v| i64::from(v)).sum::<i64>());
	assert!(b.is_empty());

	for (i, &position) in b_positions.iter().enumerate() {
		if i % 5 == 0 {
			assert!(!a.contains(position));
		} else {
			assert_eq!(a.get(position), Some(&(1000 + i as i32)));
			assert_eq!(b.get(position), None);
		}
	}

	// The spliced colony keeps working, including its free lists.
	for i in 0..300 {
		a.insert(2000 + i);
	}
	assert_eq!(a.iter().count(), a.len());
	let erased = b_positions[1];
	a.erase(erased);
	assert_eq!(a.get(erased), None);
	assert_eq!(a.iter().count(), a.len());
}

#[test]
fn splice_into_empty_and_from_empty() {
	let mut empty = Colony::new();
	let mut full: Colony<_> = (0..10).collect();
	let position = full.position_at(3).unwrap();

	full.splice(None, &mut empty);
	assert_eq!(full.len(), 10);

	empty.splice(None, &mut full);
	assert_eq!(contents(&empty), (0..10).collect::<Vec<_>>());
	assert_eq!(empty.get(position), Some(&3));
	assert!(full.is_empty());
}

#[test]
fn held_positions_equal_fresh_ones_after_splice() {
	use std::collections::{hash_map::DefaultHasher, HashSet};
	use std::hash::{Hash, Hasher};

	let mut a: Colony<i32> = (0..5).collect();
	let mut b = Colony::new();
	let held = b.insert(7);
	a.splice(None, &mut b);

	let fresh = a.last().unwrap();
	assert_eq!(a[held], 7);
	assert_eq!(a[fresh], 7);
	assert_eq!(held, fresh);
	assert_eq!(a.position_of(&a[held]), Some(held));

	let hash = |position: Position| {
		let mut hasher = DefaultHasher::new();
		position.hash(&mut hasher);
		hasher.finish()
	};
	assert_eq!(hash(held), hash(fresh));

	let seen: HashSet<Position> = [held].into_iter().collect();
	assert!(a.positions().any(|position| seen.contains(&position)));
	assert_ne!(held, a.first().unwrap());
}

#[test]
fn unique_example() {
	let mut colony: Colony<i32> = [1, 1, 2, 3, 3, 4, 5, 5].into();
	assert_eq!(colony.unique(), 3);
	assert_eq!(contents(&colony), [1, 2, 3, 4, 5]);
}

#[test]
fn unique_by_compares_with_kept_element() {
	let mut colony: Colony<i32> = [1, 2, 3, 10, 11, 20].into();
	assert_eq!(colony.unique_by(|kept, candidate| candidate - kept < 5), 3);
	assert_eq!(contents(&colony), [1, 10, 20]);
}

#[test]
fn removal_by_value_and_predicate() {
	let mut colony: Colony<i32> = [1, 3, 1, 50, 16, 15, 2, 22].into();
	assert_eq!(colony.remove_matching(&1), 2);
	assert_eq!(contents(&colony), [3, 50, 16, 15, 2, 22]);

	assert_eq!(colony.remove_if(|&value| value > 15), 3);
	assert_eq!(contents(&colony), [3, 15, 2]);

	colony.retain(|&value| value != 15);
	assert_eq!(contents(&colony), [3, 2]);
	assert_eq!(colony.remove_if(|_| false), 0);
}

#[test]
fn reorder_single_and_range() {
	let mut colony: Colony<i32> = (0..255).collect();
	let mut model: Vec<i32> = (0..255).collect();
	let positions: Vec<_> = colony.positions().collect();

	colony.reorder(colony.first(), positions[152]);
	model.retain(|&v| v != 152);
	model.insert(0, 152);
	assert_eq!(colony.front(), Some(&152));

	colony.reorder(None, positions[5]);
	model.retain(|&v| v != 5);
	model.push(5);
	assert_eq!(colony.back(), Some(&5));
	assert_eq!(contents(&colony), model);

	let first = colony.position_at(50).unwrap();
	let end = colony.position_at(60);
	let at = colony.position_at(70);
	colony.reorder_range(at, first, end);
	let moved: Vec<_> = model.drain(50..60).collect();
	model.splice(60..60, moved.iter().copied());
	assert_eq!(contents(&colony), model);
	assert_eq!(&contents(&colony)[60..70], &moved[..]);

	// Moving a range to where it already is changes nothing.
	let first = colony.position_at(10).unwrap();
	let end = colony.position_at(20);
	colony.reorder_range(end, first, end);
	assert_eq!(contents(&colony), model);

	// All positions still point at their original values.
	for (value, &position) in positions.iter().enumerate() {
		assert_eq!(colony[position], value as i32);
	}
}

#[test]
#[should_panic = "reorder target lies within the moved range"]
fn reorder_into_own_range_panics() {
	let mut colony: Colony<i32> = (0..10).collect();
	let first = colony.position_at(2).unwrap();
	let at = colony.position_at(4);
	let end = colony.position_at(6);
	colony.reorder_range(at, first, end);
}

#[test]
fn range_erasure() {
	let mut colony: Colony<i32> = (0..1000).collect();
	let mut model: Vec<i32> = (0..1000).collect();

	let last = colony.erase_range(colony.position_at(0).unwrap(), colony.position_at(300));
	model.drain(0..300);
	assert_eq!(colony.len(), 700);
	assert_eq!(last.map(|p| colony[p]), Some(300));

	let last = colony.erase_range(colony.position_at(600).unwrap(), None);
	model.truncate(600);
	assert_eq!(colony.len(), 600);
	assert_eq!(last, None);

	colony.erase_range(colony.position_at(100).unwrap(), colony.position_at(105));
	model.drain(100..105);
	assert_eq!(colony.len(), 595);
	assert_eq!(colony.iter().count(), 595);
	assert_eq!(contents(&colony), model);

	// An empty range erases nothing.
	let at = colony.position_at(10).unwrap();
	assert_eq!(colony.erase_range(at, Some(at)), Some(at));
	assert_eq!(colony.len(), 595);
}

#[test]
fn group_sizes_grow_within_limits() {
	let mut colony = Colony::with_config(ColonyConfig::with_group_sizes(50, 100).unwrap());
	colony.insert(0);
	assert_eq!(colony.capacity(), 50);
	for i in 1..=100 {
		colony.insert(i);
	}
	assert_eq!(colony.capacity(), 200);
	assert_eq!(colony.group_count(), 3);

	assert_eq!(
		colony.set_group_sizes(200, 100),
		Err(ColonyError::InvalidGroupSizes { min: 200, max: 100 })
	);
	let first = colony.first().unwrap();
	let address = &colony[first] as *const i32;
	colony.set_group_sizes(400, 400).unwrap();
	assert_eq!(colony.group_count(), 3);
	assert_eq!(&colony[first] as *const i32, address);
	for i in 0..100 {
		colony.insert(i);
	}
	assert_eq!(colony.capacity(), 600);

	// Consolidating into groups within the new limits is a separate step.
	colony.shrink_to_fit();
	assert_eq!(colony.capacity(), 400);
	assert_eq!(colony.group_count(), 1);
	assert_eq!(colony.len(), 201);
}

#[test]
fn stale_positions_are_rejected() {
	let mut colony = Colony::new();
	let kept = colony.insert(1);
	let erased = colony.insert(2);
	colony.erase(erased);

	assert_eq!(colony.get(erased), None);
	assert!(!colony.contains(erased));
	assert_eq!(colony.try_erase(erased), Err(ColonyError::InvalidPosition));
	assert_eq!(colony.try_insert_before(Some(erased), 5), Err(ColonyError::InvalidPosition));
	assert_eq!(colony.remove(erased), None);
	assert_eq!(colony.index_of(erased), None);

	// Reoccupying the slot doesn't revive the old position.
	let reused = colony.insert(3);
	assert_ne!(reused, erased);
	assert_eq!(colony.get(erased), None);
	assert_eq!(colony.get(reused), Some(&3));

	let mut other = Colony::new();
	other.insert(1);
	other.insert(2);
	assert_eq!(other.get(kept), None);
	assert_eq!(other.get(reused), None);

	colony.clear();
	assert_eq!(colony.get(kept), None);
	let fresh = colony.insert(4);
	assert_eq!(colony.get(kept), None);
	assert_eq!(colony.get(fresh), Some(&4));
}

#[test]
#[should_panic = "stale or foreign position"]
fn erasing_stale_position_panics() {
	let mut colony = Colony::new();
	let position = colony.insert(1);
	colony.erase(position);
	colony.erase(position);
}

#[test]
fn pointer_lookup() {
	let mut colony: Colony<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
	let position = colony.position_at(1).unwrap();
	let element = colony.get(position).unwrap();
	assert_eq!(colony.position_of(element), Some(position));

	let outside = String::from("b");
	assert_eq!(colony.position_of(&outside), None);

	colony.erase(position);
	assert_eq!(colony.position_of(colony.front().unwrap()), colony.first());
}

#[test]
fn index_navigation() {
	let mut colony: Colony<i32> = (0..100).collect();
	let positions: Vec<_> = colony.positions().collect();
	for &position in positions.iter().skip(3).step_by(4) {
		colony.erase(position);
	}

	for index in 0..colony.len() {
		let position = colony.position_at(index).unwrap();
		assert_eq!(colony.index_of(position), Some(index));
	}
	assert_eq!(colony.position_at(colony.len()), None);

	let second = colony.next_position(colony.first().unwrap()).unwrap();
	assert_eq!(colony[second], 1);
	assert_eq!(colony.prev_position(second), colony.first());
	assert_eq!(colony.prev_position(colony.first().unwrap()), None);
	assert_eq!(colony.next_position(colony.last().unwrap()), None);
	assert_eq!(colony.positions().rev().next(), colony.last());
}

#[test]
fn sorting() {
	let mut rng = StdRng::seed_from_u64(500);
	let mut colony: Colony<i32> = (0..500).map(|_| rng.gen_range(-1000..1000)).collect();
	let sample = colony.position_at(123).unwrap();
	let sample_value = colony[sample];
	let sample_address = &colony[sample] as *const i32;

	colony.sort();
	assert!(contents(&colony).windows(2).all(|w| w[0] <= w[1]));
	assert_eq!(colony[sample], sample_value);
	assert_eq!(&colony[sample] as *const i32, sample_address);

	colony.sort_by(|a, b| b.cmp(a));
	assert!(contents(&colony).windows(2).all(|w| w[0] >= w[1]));

	colony.reverse();
	assert!(contents(&colony).windows(2).all(|w| w[0] <= w[1]));
	assert_eq!(colony.len(), 500);
	assert_eq!(colony.iter().rev().count(), 500);
}

#[test]
fn sort_is_stable() {
	let mut colony: Colony<(u8, usize)> = (0..100).map(|i| ((i * 7 % 5) as u8, i)).collect();
	colony.sort_by_key(|&(key, _)| key);
	let sorted = contents(&colony);
	assert!(sorted.windows(2).all(|w| w[0].0 < w[1].0 || (w[0].0 == w[1].0 && w[0].1 < w[1].1)));
}

#[test]
fn merge_is_stable() {
	let mut a: Colony<(i32, char)> = [(1, 'a'), (3, 'a'), (5, 'a')].into();
	let mut b: Colony<(i32, char)> = [(1, 'b'), (2, 'b'), (5, 'b'), (6, 'b')].into();
	a.merge_by(&mut b, |x, y| x.0.cmp(&y.0));
	assert_eq!(
		contents(&a),
		[(1, 'a'), (1, 'b'), (2, 'b'), (3, 'a'), (5, 'a'), (5, 'b'), (6, 'b')]
	);
	assert!(b.is_empty());

	let mut c: Colony<i32> = [2, 4, 6].into();
	let mut d: Colony<i32> = [1, 3, 5, 7].into();
	c.merge(&mut d);
	assert_eq!(contents(&c), (1..=7).collect::<Vec<_>>());
}

#[test]
fn reserve_and_shrink() {
	let mut colony = Colony::new();
	colony.reserve(5000);
	assert_eq!(colony.capacity(), 5000);
	assert_eq!(colony.group_count(), 0);
	for i in 0..5000 {
		colony.insert(i);
	}
	assert_eq!(colony.capacity(), 5000);
	assert_eq!(colony.group_count(), 3);

	colony.reserve(10);
	assert!(colony.capacity() >= 5010);

	let positions: Vec<_> = colony.positions().collect();
	for &position in &positions[100..] {
		colony.erase(position);
	}
	colony.shrink_to_fit();
	assert_eq!(colony.capacity(), 100);
	assert_eq!(colony.group_count(), 1);
	assert_eq!(contents(&colony), (0..100).collect::<Vec<_>>());
}

#[test]
fn clear_keeps_groups_and_trim_frees_them() {
	let mut colony = Colony::new();
	for i in 0..1000 {
		colony.insert(i);
	}
	let capacity = colony.capacity();
	colony.clear();
	assert!(colony.is_empty());
	assert_eq!(colony.capacity(), capacity);
	assert_eq!(colony.group_count(), 0);

	colony.extend(0..10);
	assert_eq!(colony.capacity(), capacity);
	assert_eq!(contents(&colony), (0..10).collect::<Vec<_>>());

	colony.trim();
	assert!(colony.capacity() < capacity);
	colony.clear();
	colony.trim();
	assert_eq!(colony.capacity(), 0);
	assert!(colony.memory_use() >= mem::size_of::<Colony<i32>>());
}

#[test]
fn emptied_groups_follow_retention_policy() {
	for retention in [Retention::NearTail, Retention::KeepAll, Retention::ReleaseAll] {
		let config = ColonyConfig::with_group_sizes(4, 64).unwrap().retention(retention);
		let mut colony = Colony::with_config(config);
		let positions: Vec<_> = (0..200).map(|i| colony.insert(i)).collect();
		let before = colony.capacity();
		for &position in &positions[..4] {
			colony.erase(position);
		}
		match retention {
			Retention::KeepAll => assert_eq!(colony.capacity(), before),
			_ => assert_eq!(colony.capacity(), before - 4),
		}
		assert_eq!(contents(&colony), (4..200).collect::<Vec<_>>());
		for i in 0..4 {
			colony.insert(i);
		}
		assert_eq!(colony.len(), 200);
		assert_eq!(colony.iter().count(), 200);
	}
}

#[test]
fn bulk_operations() {
	let mut colony = Colony::filled(3, 'x');
	assert_eq!(contents(&colony), ['x', 'x', 'x']);

	let first = colony.insert_n(colony.position_at(1), 2, 'y');
	assert_eq!(contents(&colony), ['x', 'y', 'y', 'x', 'x']);
	assert_eq!(first.map(|p| colony.index_of(p)), Some(Some(1)));
	assert_eq!(colony.insert_n(None, 0, 'z'), None);

	let first = colony.extend_at(colony.first(), "ab".chars());
	assert_eq!(colony.get(first.unwrap()), Some(&'a'));
	assert_eq!(contents(&colony), ['a', 'b', 'x', 'y', 'y', 'x', 'x']);

	colony.resize(9, 'r');
	assert_eq!(colony.len(), 9);
	assert_eq!(colony.back(), Some(&'r'));
	colony.resize(2, 'r');
	assert_eq!(contents(&colony), ['a', 'b']);

	colony.extend(&['c', 'd']);
	assert_eq!(contents(&colony), ['a', 'b', 'c', 'd']);

	colony.truncate(1);
	assert_eq!(contents(&colony), ['a']);

	colony.assign("hello".chars());
	assert_eq!(contents(&colony).into_iter().collect::<String>(), "hello");
}

#[test]
fn removal_moves_values_out() {
	let mut colony: Colony<String> = Vec::from(["a".to_string(), "b".to_string(), "c".to_string()]).into();
	let middle = colony.position_at(1).unwrap();
	assert_eq!(colony.remove(middle).as_deref(), Some("b"));
	assert_eq!(colony.pop_front().as_deref(), Some("a"));
	assert_eq!(colony.pop_back().as_deref(), Some("c"));
	assert_eq!(colony.pop_back(), None);
	assert!(colony.is_empty());

	let owned: Vec<_> = Colony::from([1, 2, 3]).into_iter().rev().collect();
	assert_eq!(owned, [3, 2, 1]);
}

#[derive(Debug, PartialEq)]
enum FactoryError {
	Colony(ColonyError),
	Refused,
}

impl From<ColonyError> for FactoryError {
	fn from(error: ColonyError) -> Self {
		Self::Colony(error)
	}
}

#[test]
fn factories_run_before_mutation() {
	let mut colony: Colony<i32> = (0..3).collect();
	let capacity = colony.capacity();

	assert_eq!(
		colony.try_insert_with(None, || Err(FactoryError::Refused)),
		Err(FactoryError::Refused)
	);
	assert_eq!(contents(&colony), [0, 1, 2]);
	assert_eq!(colony.capacity(), capacity);

	let stale = colony.insert(3);
	colony.erase(stale);
	let mut called = false;
	assert_eq!(
		colony.try_insert_with(Some(stale), || {
			called = true;
			Ok(4)
		}),
		Err(FactoryError::Colony(ColonyError::InvalidPosition))
	);
	assert!(!called);

	let position = colony.insert_with(colony.first(), || -1);
	assert_eq!(colony.index_of(position), Some(0));
}

#[test]
fn comparison_and_formatting() {
	let a: Colony<i32> = [1, 2, 3].into();
	let mut b: Colony<i32> = [1, 2, 4].into();
	assert!(a < b);
	assert_eq!(a.cmp(&b), core::cmp::Ordering::Less);
	assert_eq!(format!("{:?}", a), "[1, 2, 3]");

	let last = b.last().unwrap();
	b[last] = 3;
	assert_eq!(a, b);

	use std::{
		collections::hash_map::DefaultHasher,
		hash::{Hash, Hasher},
	};
	let hash = |colony: &Colony<i32>| {
		let mut hasher = DefaultHasher::new();
		colony.hash(&mut hasher);
		hasher.finish()
	};
	assert_eq!(hash(&a), hash(&b));
}
