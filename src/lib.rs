//! A segmented sequence container with stable positions that can pin its values.
//!
//! [![Zulip Chat](https://img.shields.io/endpoint?label=chat&url=https%3A%2F%2Fiteration-square-automation.schichler.dev%2F.netlify%2Ffunctions%2Fstream_subscribers_shield%3Fstream%3Dproject%252Fcolony)](https://iteration-square.schichler.dev/#narrow/stream/project.2Fcolony)
//!
//! A [`Colony`] stores its elements in a chain of fixed-capacity groups that are never reallocated.
//! Erased slots go onto per-group free lists and are reused by later insertions,
//! and emptied groups are recycled or released according to a [`Retention`] policy.
//!
//! Each element is addressed through a [`Position`], which stays valid until that element is erased,
//! and which is checked on every use.
//!
//! # Performance Focus
//!
//! This implementation is optimised for workloads that keep many handles into a container with frequent
//! insertion and erasure in the middle, like entity lists in simulations or pools of pinned futures.
//! Positional lookup by index is linear.
#![no_std]
#![doc(html_root_url = "https://docs.rs/colony/0.0.1")]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::semicolon_if_nothing_returned)]

#[cfg(doctest)]
#[doc = include_str!("../README.md")]
mod readme {}

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod colony;
mod config;
mod error;
mod group;
mod group_vector;
mod iter;
mod pinning_colony;
mod position;

pub use crate::{
	colony::Colony,
	config::{ColonyConfig, Retention},
	error::ColonyError,
	iter::{IntoIter, Iter, IterMut, Positions},
	pinning_colony::PinningColony,
	position::Position,
};
