//! Shared foundational types used across the cosim workspace.
//!
//! This crate provides the clock [`Frequency`] value with unit parsing and the
//! [`BaudPeriod`] tick count that sizes one serial bit-time.

#![warn(missing_docs)]

pub mod baud;
pub mod frequency;

pub use baud::{BaudPeriod, InvalidBaudPeriod};
pub use frequency::{Frequency, ParseFrequencyError};
