//! # Kaleido Geometry
//!
//! Rigid-transform primitives for the Kaleido clone-pattern engine. This
//! crate provides:
//!
//! - **Frames** ([`transform`]): composition, inversion, relative
//!   transforms, axis alignment, plane projection and axis-angle helpers on
//!   nalgebra 4x4 matrices.
//! - **Placements** ([`placement`]): the position + Euler-degree value type
//!   assigned to every element and pattern instance.

pub mod placement;
pub mod transform;

pub use placement::RigidPlacement;
