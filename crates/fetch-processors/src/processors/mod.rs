//! Ready-made processors.

pub mod audit;
pub mod guard;
