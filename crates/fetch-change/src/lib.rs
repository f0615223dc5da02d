//! Change tracking for fetch.
//!
//! Entities record every mutation as it happens instead of being diffed
//! against a snapshot. A mutation is addressed by a [`ChangePath`] rooted at
//! the entity, so a change to a nested owned object or to a single element of
//! a tracked collection is a multi-segment path rather than a rewrite of the
//! whole member.
//!
//! # Key Types
//!
//! - [`ChangePath`] / [`ChangePathSegment`] -- Route from an entity root to a mutated leaf
//! - [`ChangeSet`] -- Ordered, last-write-wins mapping from path to new value
//! - [`Shape`] -- Static shape descriptor used to check that a path can be traversed
//! - [`ChangeTracker`] -- Mutation log owned by each tracked node
//! - [`Trackable`] / [`Entity`] -- Contracts for tracked nodes and aggregate roots
//! - [`ChangeTrackingCollection`] / [`ChangeTrackingMap`] -- Containers that log index/key mutations
//!
//! # Design Rules
//!
//! 1. Every setter appends to the log; there is no reflection-based capture.
//! 2. A loaded entity starts with an empty log (trackers are never serialized).
//! 3. Extraction never clears the log; the repository accepts changes only
//!    after persistence succeeds.

pub mod change_set;
pub mod collection;
pub mod entity;
pub mod error;
pub mod path;
pub mod shape;
pub mod tracker;

pub use change_set::{Change, ChangeSet};
pub use collection::{ChangeTrackingCollection, ChangeTrackingMap};
pub use entity::Entity;
pub use error::{ChangeError, ChangeResult};
pub use path::{ChangePath, ChangePathSegment};
pub use shape::Shape;
pub use tracker::{accept_changes, collect_changes, ChangeTracker, Trackable};

pub use fetch_types::{KeyPart, Keys};
