//! Radial pattern: copies rotated about an axis.

use kaleido_geometry::transform;
use kaleido_geometry::RigidPlacement;
use log::warn;
use nalgebra::{Matrix4, Rotation3, Vector3};

use super::{sanitize_axis, sanitize_origin, PatternGeometry, PatternKind, MAX_INSTANCES};
use crate::persist::ParameterNode;

/// Default angle between consecutive instances, in degrees.
pub const DEFAULT_ANGLE: f64 = 90.0;

/// Instances rotated `angle` degrees apart about the axis through `origin`.
/// Both position and orientation of the seed follow the rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialPattern {
    origin: Vector3<f64>,
    axis: Vector3<f64>,
    angle: f64,
}

impl Default for RadialPattern {
    fn default() -> Self {
        Self {
            origin: Vector3::zeros(),
            axis: Vector3::z(),
            angle: DEFAULT_ANGLE,
        }
    }
}

impl RadialPattern {
    pub fn new(origin: Vector3<f64>, axis: Vector3<f64>, angle: f64) -> Self {
        let mut pattern = Self::default();
        pattern.set_origin(origin);
        pattern.set_axis(axis);
        pattern.set_angle(angle);
        pattern
    }

    /// Angle between consecutive instances in degrees.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn set_origin(&mut self, origin: Vector3<f64>) {
        self.origin = sanitize_origin(origin);
    }

    pub fn set_axis(&mut self, axis: Vector3<f64>) {
        self.axis = sanitize_axis(axis, Vector3::z(), "radial axis");
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.angle = if angle.is_finite() {
            angle
        } else {
            warn!("Non-finite radial angle {}, using {}", angle, DEFAULT_ANGLE);
            DEFAULT_ANGLE
        };
    }
}

impl PatternGeometry for RadialPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Radial
    }

    fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    fn axis(&self) -> Vector3<f64> {
        self.axis
    }

    fn set_frame(&mut self, origin: Vector3<f64>, axis: Vector3<f64>) {
        self.set_origin(origin);
        self.set_axis(axis);
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
        let step = Rotation3::from_axis_angle(
            &Vector3::z_axis(),
            (self.angle * instance as f64).to_radians(),
        )
        .to_homogeneous();
        RigidPlacement::from_matrix(&(base_frame * step * delta))
    }

    /// Enough instances to close a full turn, at most [`MAX_INSTANCES`].
    fn default_instance_count(&self) -> usize {
        let step = self.angle.abs();
        if step < 1e-9 {
            return 1;
        }
        let count = (360.0 / step).round();
        if count > MAX_INSTANCES as f64 {
            warn!(
                "Radial angle {} needs {} instances per turn, capping at {}",
                self.angle, count, MAX_INSTANCES
            );
            return MAX_INSTANCES;
        }
        (count as usize).max(1)
    }

    fn write_parameters(&self, node: &mut ParameterNode) {
        node.write_attribute("Origin", &self.origin);
        node.write_attribute("Axis", &self.axis);
        node.write_attribute("Angle", &self.angle);
    }

    fn read_parameters(&mut self, node: &ParameterNode) {
        self.set_origin(node.read_vector_or("Origin", self.origin));
        self.set_axis(node.read_vector_or("Axis", self.axis));
        self.set_angle(node.read_attribute_or("Angle", self.angle));
    }
}
