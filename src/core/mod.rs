//! Core data types for gadget scanning.
//!
//! A section's raw bytes form a [`ByteStream`]; scanning it yields a
//! [`GadgetSet`] of [`GadgetCandidate`]s, which reports place at absolute
//! addresses as [`GadgetRecord`]s.

pub mod gadget;
pub mod section;

pub use gadget::{GadgetCandidate, GadgetRecord, GadgetSet};
pub use section::Section;

/// Immutable bytes of one section, produced once and dropped after scanning.
pub type ByteStream = bytes::Bytes;
