//! Clone-pattern descriptors.
//!
//! A pattern derives the placements of repeated elements from one seed
//! placement. Every pattern type implements [`PatternGeometry`]; the
//! [`ClonePattern`] enum is the single dispatch point used by the
//! orchestrator and by persistence.
//!
//! All patterns share the same notion of a canonical frame: local +Z runs
//! along the pattern's axis (mirror normal, array direction, rotation axis)
//! and the frame origin sits at the pattern origin. Seed placements are
//! expressed relative to this frame, so instance math never depends on the
//! local origin of the part that owns the seed.

pub mod linear;
pub mod mirror;
pub mod radial;

use std::fmt;
use std::str::FromStr;

use kaleido_geometry::transform;
use kaleido_geometry::RigidPlacement;
use log::warn;
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::{ParameterNode, PersistError};

pub use linear::LinearPattern;
pub use mirror::MirrorPattern;
pub use radial::RadialPattern;

/// Element name of a persisted pattern node.
pub const NODE_NAME: &str = "ClonePattern";

/// Discriminator attribute holding the [`PatternKind`].
pub const TYPE_ATTRIBUTE: &str = "Type";

/// Largest number of instances one pattern may generate, seed included.
pub const MAX_INSTANCES: usize = 100_000;

/// Errors raised by pattern evaluation and cloning.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Unsupported pattern variant: {0}")]
    UnsupportedPatternVariant(String),

    #[error("Invalid instance count {count}: expected 1 to {max}", max = MAX_INSTANCES)]
    InvalidInstanceCount { count: usize },

    #[error("Element '{element}' cannot be duplicated")]
    PayloadNotClonable { element: String },

    #[error("Pattern persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// The algorithm a pattern uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Linear,
    Radial,
    Mirror,
}

impl PatternKind {
    pub const ALL: [PatternKind; 3] =
        [PatternKind::Linear, PatternKind::Radial, PatternKind::Mirror];

    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Linear => "Linear",
            PatternKind::Radial => "Radial",
            PatternKind::Mirror => "Mirror",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PatternKind {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PatternError::UnsupportedPatternVariant(s.to_owned()))
    }
}

/// Geometry contract shared by every pattern type.
pub trait PatternGeometry {
    fn kind(&self) -> PatternKind;

    /// Pattern origin in world coordinates.
    fn origin(&self) -> Vector3<f64>;

    /// Primary axis in world coordinates; never the zero vector.
    fn axis(&self) -> Vector3<f64>;

    /// Replace origin and axis. A degenerate axis is replaced by the
    /// pattern's default axis.
    fn set_frame(&mut self, origin: Vector3<f64>, axis: Vector3<f64>);

    /// Canonical world frame of the pattern.
    fn pattern_matrix(&self) -> Matrix4<f64> {
        axis_frame(&self.origin(), &self.axis())
    }

    /// Snap an arbitrary authored frame onto the degrees of freedom this
    /// pattern uses.
    fn quantize_transform(&self, transform: &Matrix4<f64>) -> Matrix4<f64> {
        quantize_axis_frame(transform)
    }

    /// Placement of the `instance`-th copy of `seed`, relative to
    /// `base_frame`. Instance 0 is always `seed` itself.
    fn instance_transform(
        &self,
        base_frame: &Matrix4<f64>,
        seed: &RigidPlacement,
        instance: usize,
    ) -> RigidPlacement;

    /// Instance count used when the caller does not specify one.
    fn default_instance_count(&self) -> usize;

    /// Write the pattern's own attributes (not the discriminator).
    fn write_parameters(&self, node: &mut ParameterNode);

    /// Read the pattern's own attributes, keeping current values for
    /// anything absent or malformed.
    fn read_parameters(&mut self, node: &ParameterNode);

    /// Adopt the quantized form of `authored` as this pattern's frame.
    fn snap_to(&mut self, authored: &Matrix4<f64>) {
        let frame = self.quantize_transform(authored);
        let origin = transform::extract_translation(&frame);
        let axis = transform::transform_vector(&frame, &Vector3::z());
        self.set_frame(origin, axis);
    }
}

/// `Translate(origin) * Align(+Z -> axis)`.
pub fn axis_frame(origin: &Vector3<f64>, axis: &Vector3<f64>) -> Matrix4<f64> {
    transform::translation(origin)
        * transform::align_axis_to_direction(&Vector3::z(), axis).to_homogeneous()
}

/// Keep only the Z axis and translation of `frame` and rebuild the rest.
///
/// Roll about the axis is discarded, so applying this to its own output
/// returns the same frame. A frame whose Z axis collapses falls back to +Z.
pub fn quantize_axis_frame(frame: &Matrix4<f64>) -> Matrix4<f64> {
    let axis = sanitize_axis(
        transform::transform_vector(frame, &Vector3::z()),
        Vector3::z(),
        "quantized axis",
    );
    let origin = transform::extract_translation(frame);
    axis_frame(&origin, &axis)
}

/// Replace a zero or non-finite axis with `default`.
pub(crate) fn sanitize_axis(
    axis: Vector3<f64>,
    default: Vector3<f64>,
    name: &str,
) -> Vector3<f64> {
    if axis.iter().all(|c| c.is_finite()) && axis.norm() > transform::DEGENERATE_EPSILON {
        axis
    } else {
        warn!("Degenerate {} {:?}, using {:?}", name, axis.as_slice(), default.as_slice());
        default
    }
}

/// Replace a non-finite origin with the world origin.
pub(crate) fn sanitize_origin(origin: Vector3<f64>) -> Vector3<f64> {
    if origin.iter().all(|c| c.is_finite()) {
        origin
    } else {
        warn!("Non-finite pattern origin {:?}, using world origin", origin.as_slice());
        Vector3::zeros()
    }
}

/// A pattern of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ClonePattern {
    Linear(LinearPattern),
    Radial(RadialPattern),
    Mirror(MirrorPattern),
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            ClonePattern::Linear($p) => $body,
            ClonePattern::Radial($p) => $body,
            ClonePattern::Mirror($p) => $body,
        }
    };
}

impl ClonePattern {
    /// A pattern of `kind` with default parameters.
    pub fn with_defaults(kind: PatternKind) -> Self {
        match kind {
            PatternKind::Linear => ClonePattern::Linear(LinearPattern::default()),
            PatternKind::Radial => ClonePattern::Radial(RadialPattern::default()),
            PatternKind::Mirror => ClonePattern::Mirror(MirrorPattern::default()),
        }
    }

    /// Serialise the pattern into its own node, discriminator first.
    pub fn serialize_parameters(&self) -> ParameterNode {
        let mut node = ParameterNode::new(NODE_NAME);
        node.set_attribute(TYPE_ATTRIBUTE, self.kind().name());
        self.write_parameters(&mut node);
        node
    }

    /// Build a pattern from a persisted node.
    ///
    /// The discriminator must name a known kind; every other attribute is
    /// optional and falls back to the kind's defaults.
    pub fn load_parameters(node: &ParameterNode) -> Result<Self, PatternError> {
        let kind = node
            .attribute(TYPE_ATTRIBUTE)
            .ok_or_else(|| {
                PatternError::UnsupportedPatternVariant(format!(
                    "<{} without {} attribute>",
                    node.name, TYPE_ATTRIBUTE
                ))
            })?
            .parse::<PatternKind>()?;
        let mut pattern = Self::with_defaults(kind);
        pattern.read_parameters(node);
        Ok(pattern)
    }

    pub fn to_xml(&self) -> Result<String, PatternError> {
        Ok(self.serialize_parameters().to_xml()?)
    }

    pub fn from_xml(xml: &str) -> Result<Self, PatternError> {
        Self::load_parameters(&ParameterNode::from_xml(xml)?)
    }
}

impl From<LinearPattern> for ClonePattern {
    fn from(p: LinearPattern) -> Self {
        ClonePattern::Linear(p)
    }
}

impl From<RadialPattern> for ClonePattern {
    fn from(p: RadialPattern) -> Self {
        ClonePattern::Radial(p)
    }
}

impl From<MirrorPattern> for ClonePattern {
    fn from(p: MirrorPattern) -> Self {
        ClonePattern::Mirror(p)
    }
}

impl PatternGeometry for ClonePattern {
    fn kind(&self) -> PatternKind {
        dispatch!(self, p => p.kind())
    }

    fn origin(&self) -> Vector3<f64> {
        dispatch!(self, p => p.origin())
    }

    fn axis(&self) -> Vector3<f64> {
        dispatch!(self, p => p.axis())
    }

    fn set_frame(&mut self, origin: Vector3<f64>, axis: Vector3<f64>) {
        dispatch!(self, p => p.set_frame(origin, axis))
    }

    fn pattern_matrix(&self) -> Matrix4<f64> {
        dispatch!(self, p => p.pattern_matrix())
    }

    fn quantize_transform(&self, transform: &Matrix4<f64>) -> Matrix4<f64> {
        dispatch!(self, p => p.quantize_transform(transform))
    }

    fn instance_transform(
        &self,
        base_frame: &Matrix4<f64>,
        seed: &RigidPlacement,
        instance: usize,
    ) -> RigidPlacement {
        dispatch!(self, p => p.instance_transform(base_frame, seed, instance))
    }

    fn default_instance_count(&self) -> usize {
        dispatch!(self, p => p.default_instance_count())
    }

    fn write_parameters(&self, node: &mut ParameterNode) {
        dispatch!(self, p => p.write_parameters(node))
    }

    fn read_parameters(&mut self, node: &ParameterNode) {
        dispatch!(self, p => p.read_parameters(node))
    }
}
