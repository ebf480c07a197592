//! Linear pattern: copies stepped along a direction.

use kaleido_geometry::transform;
use kaleido_geometry::RigidPlacement;
use log::warn;
use nalgebra::{Matrix4, Vector3};

use super::{sanitize_axis, sanitize_origin, PatternGeometry, PatternKind};
use crate::persist::ParameterNode;

pub const DEFAULT_SPACING: f64 = 1.0;

/// Instances spaced `spacing` apart along `direction`, keeping the seed's
/// orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPattern {
    origin: Vector3<f64>,
    direction: Vector3<f64>,
    spacing: f64,
}

impl Default for LinearPattern {
    fn default() -> Self {
        Self {
            origin: Vector3::zeros(),
            direction: Vector3::x(),
            spacing: DEFAULT_SPACING,
        }
    }
}

impl LinearPattern {
    /// A zero direction becomes +X; a non-finite spacing becomes
    /// [`DEFAULT_SPACING`].
    pub fn new(origin: Vector3<f64>, direction: Vector3<f64>, spacing: f64) -> Self {
        let mut pattern = Self::default();
        pattern.set_origin(origin);
        pattern.set_direction(direction);
        pattern.set_spacing(spacing);
        pattern
    }

    pub fn direction(&self) -> Vector3<f64> {
        self.direction
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn set_origin(&mut self, origin: Vector3<f64>) {
        self.origin = sanitize_origin(origin);
    }

    pub fn set_direction(&mut self, direction: Vector3<f64>) {
        self.direction = sanitize_axis(direction, Vector3::x(), "linear direction");
    }

    /// Negative spacing steps against the direction.
    pub fn set_spacing(&mut self, spacing: f64) {
        self.spacing = if spacing.is_finite() {
            spacing
        } else {
            warn!("Non-finite linear spacing {}, using {}", spacing, DEFAULT_SPACING);
            DEFAULT_SPACING
        };
    }
}

impl PatternGeometry for LinearPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Linear
    }

    fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    fn axis(&self) -> Vector3<f64> {
        self.direction
    }

    fn set_frame(&mut self, origin: Vector3<f64>, axis: Vector3<f64>) {
        self.set_origin(origin);
        self.set_direction(axis);
    }

    fn instance_transform(
        &self,
        base_frame: &Matrix4<f64>,
        seed: &RigidPlacement,
        instance: usize,
    ) -> RigidPlacement {
        if instance == 0 {
            return seed.clone();
        }
        let delta = transform::relative_transform(base_frame, &seed.to_matrix());
        let step = transform::translation(&Vector3::new(0.0, 0.0, self.spacing * instance as f64));
        RigidPlacement::from_matrix(&(base_frame * step * delta))
    }

    fn default_instance_count(&self) -> usize {
        2
    }

    fn write_parameters(&self, node: &mut ParameterNode) {
        node.write_attribute("Origin", &self.origin);
        node.write_attribute("Direction", &self.direction);
        node.write_attribute("Spacing", &self.spacing);
    }

    fn read_parameters(&mut self, node: &ParameterNode) {
        self.set_origin(node.read_vector_or("Origin", self.origin));
        self.set_direction(node.read_vector_or("Direction", self.direction));
        self.set_spacing(node.read_attribute_or("Spacing", self.spacing));
    }
}
