//! Rigid placements: a position plus an orientation in Euler degrees.
//!
//! This is the value type carried by every physical element and produced for
//! every pattern instance. Euler angles are stored as `[roll, pitch, yaw]`
//! in degrees, rotating about X, Y and Z respectively and applied in the
//! order `Rz * Ry * Rx`.

use nalgebra::{Matrix4, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::transform;

/// Below this `cos(pitch)` the frame is treated as gimbal-locked.
const GIMBAL_LOCK_EPSILON: f64 = 1e-8;

/// Euler degrees `[x, y, z]` of `rotation`, where `rotation = Rz * Ry * Rx`.
///
/// At pitch ±90° only the sum or difference of roll and yaw is defined; the
/// whole remaining rotation is then put into yaw and roll is zero.
fn euler_degrees(rotation: &Rotation3<f64>) -> Vector3<f64> {
    let m = rotation.matrix();
    let cos_pitch = m[(0, 0)].hypot(m[(1, 0)]);
    let pitch = (-m[(2, 0)]).atan2(cos_pitch);

    let (roll, yaw) = if cos_pitch < GIMBAL_LOCK_EPSILON {
        (0.0, (-m[(0, 1)]).atan2(m[(1, 1)]))
    } else {
        (m[(2, 1)].atan2(m[(2, 2)]), m[(1, 0)].atan2(m[(0, 0)]))
    };

    Vector3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
}

/// Position and orientation of a rigid element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidPlacement {
    /// Position in world units.
    pub position: [f64; 3],
    /// Euler angles `[x, y, z]` in degrees.
    #[serde(default)]
    pub rotation: [f64; 3],
}

impl RigidPlacement {
    pub fn new(position: Vector3<f64>, rotation_degrees: Vector3<f64>) -> Self {
        Self {
            position: position.into(),
            rotation: rotation_degrees.into(),
        }
    }

    /// The identity placement.
    pub fn identity() -> Self {
        Self::default()
    }

    /// A placement with no rotation.
    pub fn from_position(position: Vector3<f64>) -> Self {
        Self::new(position, Vector3::zeros())
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::from(self.position)
    }

    pub fn rotation_degrees(&self) -> Vector3<f64> {
        Vector3::from(self.rotation)
    }

    /// Orientation as a unit quaternion.
    pub fn to_quaternion(&self) -> UnitQuaternion<f64> {
        let [x, y, z] = self.rotation;
        UnitQuaternion::from_euler_angles(x.to_radians(), y.to_radians(), z.to_radians())
    }

    /// Build a placement from a position and a quaternion orientation.
    pub fn from_quaternion(position: Vector3<f64>, rotation: &UnitQuaternion<f64>) -> Self {
        Self::new(position, euler_degrees(&rotation.to_rotation_matrix()))
    }

    /// Homogeneous local-to-world matrix.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        transform::compose(&self.position(), &self.to_quaternion())
    }

    /// Decompose a frame into a placement. Scale and shear are discarded.
    pub fn from_matrix(frame: &Matrix4<f64>) -> Self {
        Self::new(
            transform::extract_translation(frame),
            euler_degrees(&transform::extract_rotation(frame)),
        )
    }

    /// Compare two placements by position and by the rotation they describe.
    ///
    /// Euler triples are not unique, so orientations are compared through
    /// their rotation matrices rather than component-wise.
    pub fn approx_eq(&self, other: &RigidPlacement, epsilon: f64) -> bool {
        let a = self.to_quaternion().to_rotation_matrix();
        let b = other.to_quaternion().to_rotation_matrix();
        (self.position() - other.position()).norm() <= epsilon
            && (a.matrix() - b.matrix()).amax() <= epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_matrix() {
        let m = RigidPlacement::identity().to_matrix();
        assert_relative_eq!(m, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_round_trip() {
        let p = RigidPlacement::new(Vector3::new(1.0, -2.0, 0.5), Vector3::new(10.0, 20.0, 30.0));
        let back = RigidPlacement::from_matrix(&p.to_matrix());
        assert_relative_eq!(back.position(), p.position(), epsilon = 1e-9);
        assert_relative_eq!(back.rotation_degrees(), p.rotation_degrees(), epsilon = 1e-9);
    }

    #[test]
    fn test_gimbal_lock_round_trip() {
        let seeds = [
            Vector3::new(0.0, 90.0, 0.0),
            Vector3::new(0.0, -90.0, 0.0),
            Vector3::new(10.0, 90.0, 20.0),
            Vector3::new(0.0, -90.0, 45.0),
            Vector3::new(-30.0, 89.9999999, 60.0),
        ];
        for rotation in seeds {
            let p = RigidPlacement::new(Vector3::new(1.0, 2.0, 3.0), rotation);
            let back = RigidPlacement::from_quaternion(p.position(), &p.to_quaternion());
            assert!(back.approx_eq(&p, 1e-8), "{:?} -> {:?}", p, back);
            assert!(RigidPlacement::from_matrix(&p.to_matrix()).approx_eq(&p, 1e-8));
        }
    }

    #[test]
    fn test_gimbal_lock_puts_rotation_in_yaw() {
        let p = RigidPlacement::new(Vector3::zeros(), Vector3::new(10.0, 90.0, 20.0));
        let back = RigidPlacement::from_quaternion(Vector3::zeros(), &p.to_quaternion());
        assert_eq!(back.rotation[0], 0.0);
        assert_relative_eq!(back.rotation[1], 90.0, epsilon = 1e-6);
        assert_relative_eq!(back.rotation[2], 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_yaw_rotates_x_onto_y() {
        let p = RigidPlacement::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 90.0));
        let x = p.to_quaternion() * Vector3::x();
        assert_relative_eq!(x, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_approx_eq_ignores_euler_aliasing() {
        // (180, 0, 180) and (0, 180, 0) describe the same orientation.
        let a = RigidPlacement::new(Vector3::zeros(), Vector3::new(180.0, 0.0, 180.0));
        let b = RigidPlacement::new(Vector3::zeros(), Vector3::new(0.0, 180.0, 0.0));
        assert_ne!(a, b);
        assert!(a.approx_eq(&b, 1e-9));
    }

    #[test]
    fn test_json_uses_plain_arrays() {
        let p = RigidPlacement::from_position(Vector3::new(5.0, 0.0, 2.0));
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"position":[5.0,0.0,2.0],"rotation":[0.0,0.0,0.0]}"#);
    }
}
