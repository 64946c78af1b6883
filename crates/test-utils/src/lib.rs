//! Shared test utilities for blob range registry crates.
//!
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`strategies`] - Proptest generators for keys, ranges, and cutoffs

#![deny(unsafe_code)]

mod assertions;
pub use assertions::assert_eventually;

pub mod strategies;
