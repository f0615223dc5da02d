//! Foundation types for fetch.
//!
//! Every entity handled by a repository is identified by an ordered tuple of
//! key parts. This crate defines that tuple and its opaque string encoding,
//! used for continuation tokens and cursors.
//!
//! # Key Types
//!
//! - [`KeyPart`] -- A single scalar component of an entity identity
//! - [`Keys`] -- Ordered, order-significant key tuple

pub mod error;
pub mod keys;

pub use error::TypeError;
pub use keys::{KeyPart, Keys};
