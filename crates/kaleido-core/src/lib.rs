//! # Kaleido Core
//!
//! The clone-pattern engine. Given one authored seed placement and a
//! symmetry descriptor, it derives the placement of every repeated element
//! and duplicates the seed's payload onto them.
//!
//! ## Architecture
//!
//! All pattern types implement the [`pattern::PatternGeometry`] trait: a
//! canonical pattern frame, frame quantization, and per-instance placement.
//! [`pattern::ClonePattern`] is the tagged union the rest of the crate works
//! with.
//!
//! ## Modules
//!
//! - [`pattern`]: Pattern contract, Mirror, Linear and Radial patterns.
//! - [`clone`]: Orchestration of seed → instances.
//! - [`persist`]: Attribute nodes and XML for pattern parameters.

pub mod clone;
pub mod pattern;
pub mod persist;

pub use clone::{clone_pattern, clone_pattern_into, ClonableElement, ClonedInstance};
pub use pattern::{ClonePattern, PatternError, PatternGeometry, PatternKind};
