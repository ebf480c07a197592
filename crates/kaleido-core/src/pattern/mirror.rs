//! Mirror pattern: one reflected copy across a plane.
//!
//! The reflected instance must stay a proper rigid body even though its
//! placement is mirrored. Positions are reflected through the plane; the
//! orientation is reflected as an axis-angle pair (axis reflected through
//! the plane, angle negated), which is the conjugation `S * R * S` of the
//! seed rotation by the plane reflection `S` and always has determinant +1.

use kaleido_geometry::transform::{self, DEGENERATE_EPSILON};
use kaleido_geometry::RigidPlacement;
use log::trace;
use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};

use super::{sanitize_axis, sanitize_origin, PatternGeometry, PatternKind};
use crate::persist::ParameterNode;

/// Reflection across a plane through `origin` with normal `normal`.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorPattern {
    origin: Vector3<f64>,
    normal: Vector3<f64>,
}

impl Default for MirrorPattern {
    fn default() -> Self {
        Self {
            origin: Vector3::zeros(),
            normal: Vector3::z(),
        }
    }
}

impl MirrorPattern {
    /// Create a mirror plane. A zero normal becomes +Z.
    pub fn new(origin: Vector3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            origin: sanitize_origin(origin),
            normal: sanitize_axis(normal, Vector3::z(), "mirror normal"),
        }
    }

    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    pub fn set_normal(&mut self, normal: Vector3<f64>) {
        self.normal = sanitize_axis(normal, Vector3::z(), "mirror normal");
    }

    pub fn set_origin(&mut self, origin: Vector3<f64>) {
        self.origin = sanitize_origin(origin);
    }
}

/// Reflection across the XY plane of the pattern's local frame.
pub fn local_reflection() -> Matrix3<f64> {
    Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0))
}

/// Reflect a point through the plane `(origin, normal)`.
///
/// Walks from the point to its projection and the same distance again.
/// A point on the plane is its own reflection.
pub fn reflect_position(
    position: &Vector3<f64>,
    origin: &Vector3<f64>,
    normal: &Vector3<f64>,
) -> Vector3<f64> {
    let projected = transform::project_on_plane(position, origin, normal);
    let offset = projected - position;
    let distance = offset.norm();
    match offset.try_normalize(DEGENERATE_EPSILON) {
        Some(direction) => projected + direction * distance,
        None => *position,
    }
}

/// Reflect an axis-angle rotation expressed in the pattern frame.
///
/// The axis is a pseudovector: its component along the local normal flips
/// and the sense of rotation inverts.
pub fn reflect_axis_angle(axis: &Vector3<f64>, angle: f64) -> (Vector3<f64>, f64) {
    (local_reflection() * axis, -angle)
}

impl PatternGeometry for MirrorPattern {
    fn kind(&self) -> PatternKind {
        PatternKind::Mirror
    }

    fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    fn axis(&self) -> Vector3<f64> {
        self.normal
    }

    fn set_frame(&mut self, origin: Vector3<f64>, axis: Vector3<f64>) {
        self.set_origin(origin);
        self.set_normal(axis);
    }

    /// Every index past 0 yields the same reflected placement.
    fn instance_transform(
        &self,
        base_frame: &Matrix4<f64>,
        seed: &RigidPlacement,
        instance: usize,
    ) -> RigidPlacement {
        if instance == 0 {
            return seed.clone();
        }

        let plane_origin = transform::transform_position(base_frame, &Vector3::zeros());
        let plane_normal = transform::transform_vector(base_frame, &Vector3::z());

        let seed_matrix = seed.to_matrix();
        let delta = transform::relative_transform(base_frame, &seed_matrix);

        let mirrored_position = reflect_position(&seed.position(), &plane_origin, &plane_normal);

        // Seed rotation seen from inside the pattern frame.
        let frame_delta = delta * base_frame;
        let local_rotation =
            UnitQuaternion::from_rotation_matrix(&transform::extract_rotation(&frame_delta));
        let base_rotation: Rotation3<f64> = transform::extract_rotation(base_frame);

        let final_rotation = match transform::to_axis_angle(&local_rotation) {
            Some((axis, angle)) => {
                let (reflected_axis, reflected_angle) = reflect_axis_angle(&axis, angle);
                transform::from_axis_angle(&(base_rotation * reflected_axis), reflected_angle)
            }
            None => UnitQuaternion::identity(),
        };

        let placement = RigidPlacement::from_quaternion(mirrored_position, &final_rotation);
        trace!("mirror instance {}: {:?} -> {:?}", instance, seed, placement);
        placement
    }

    fn default_instance_count(&self) -> usize {
        2
    }

    fn write_parameters(&self, node: &mut ParameterNode) {
        node.write_attribute("Origin", &self.origin);
        node.write_attribute("Normal", &self.normal);
    }

    fn read_parameters(&mut self, node: &ParameterNode) {
        self.set_origin(node.read_vector_or("Origin", self.origin));
        self.set_normal(node.read_vector_or("Normal", self.normal));
    }
}
