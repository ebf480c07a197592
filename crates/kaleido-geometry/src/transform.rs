//! Rigid-frame operations on homogeneous 4x4 matrices.
//!
//! Frames follow the column-vector convention used by nalgebra: a frame maps
//! local coordinates to world coordinates, and `a * b` applies `b` first.
//! These helpers are the building blocks for pattern frames: aligning a local
//! axis onto a direction, expressing one frame relative to another, and
//! projecting points onto planes.

use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Unit, UnitQuaternion, Vector3};

/// Tolerance below which a direction is treated as the zero vector.
pub const DEGENERATE_EPSILON: f64 = 1e-12;

/// Reference direction used to resolve the free roll about an aligned axis.
///
/// The local X axis of an aligned frame lies in the plane spanned by this
/// reference and the target direction.
pub fn reference_direction() -> Vector3<f64> {
    Vector3::x()
}

/// Fallback reference when the target direction is parallel to
/// [`reference_direction`].
pub fn fallback_reference_direction() -> Vector3<f64> {
    Vector3::y()
}

/// Apply `frame` to a point (rotation, scale and translation).
pub fn transform_position(frame: &Matrix4<f64>, point: &Vector3<f64>) -> Vector3<f64> {
    frame.transform_point(&Point3::from(*point)).coords
}

/// Apply `frame` to a direction (rotation and scale only).
pub fn transform_vector(frame: &Matrix4<f64>, vector: &Vector3<f64>) -> Vector3<f64> {
    frame.transform_vector(vector)
}

/// Translation column of a frame.
pub fn extract_translation(frame: &Matrix4<f64>) -> Vector3<f64> {
    Vector3::new(frame[(0, 3)], frame[(1, 3)], frame[(2, 3)])
}

/// Nearest proper rotation contained in the upper 3x3 block of a frame.
pub fn extract_rotation(frame: &Matrix4<f64>) -> Rotation3<f64> {
    let linear: Matrix3<f64> = frame.fixed_view::<3, 3>(0, 0).into_owned();
    Rotation3::from_matrix(&linear)
}

/// Pure translation frame.
pub fn translation(offset: &Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new_translation(offset)
}

/// Build a rigid frame from a position and an orientation.
pub fn compose(position: &Vector3<f64>, rotation: &UnitQuaternion<f64>) -> Matrix4<f64> {
    translation(position) * rotation.to_homogeneous()
}

/// Orthonormal basis whose Z column is `direction`.
///
/// Follows the axis/ref-direction construction of placement frames:
/// `y = z × ref`, `x = y × z`. Returns `None` for a zero direction.
fn basis_with_z(direction: &Vector3<f64>) -> Option<Rotation3<f64>> {
    let z = direction.try_normalize(DEGENERATE_EPSILON)?;
    let mut reference = reference_direction();
    if z.cross(&reference).norm() < 1e-6 {
        reference = fallback_reference_direction();
    }
    let y = z.cross(&reference).normalize();
    let x = y.cross(&z).normalize();
    Some(Rotation3::from_basis_unchecked(&[x, y, z]))
}

/// Rotation that carries the local `axis` onto `direction`.
///
/// The remaining rotation about `direction` is fixed by the reference
/// direction, so the result depends only on the two input directions.
/// A zero `direction` (or `axis`) yields the identity.
pub fn align_axis_to_direction(axis: &Vector3<f64>, direction: &Vector3<f64>) -> Rotation3<f64> {
    match (basis_with_z(axis), basis_with_z(direction)) {
        (Some(from), Some(to)) => to * from.inverse(),
        _ => Rotation3::identity(),
    }
}

/// Inverse of a frame.
///
/// Singular matrices fall back to the rigid inverse of their nearest
/// rotation and translation.
pub fn inverse(frame: &Matrix4<f64>) -> Matrix4<f64> {
    frame.try_inverse().unwrap_or_else(|| {
        let rotation = extract_rotation(frame).inverse();
        let offset = -(rotation * extract_translation(frame));
        translation(&offset) * rotation.to_homogeneous()
    })
}

/// `target` expressed in the local coordinates of `base`.
pub fn relative_transform(base: &Matrix4<f64>, target: &Matrix4<f64>) -> Matrix4<f64> {
    inverse(base) * target
}

/// Orthogonal projection of `point` onto the plane through `origin` with
/// normal `normal`. A zero normal leaves the point unchanged.
pub fn project_on_plane(
    point: &Vector3<f64>,
    origin: &Vector3<f64>,
    normal: &Vector3<f64>,
) -> Vector3<f64> {
    match normal.try_normalize(DEGENERATE_EPSILON) {
        Some(n) => point - n * (point - origin).dot(&n),
        None => *point,
    }
}

/// Axis-angle decomposition of a rotation; the identity decomposes to
/// `None`.
pub fn to_axis_angle(rotation: &UnitQuaternion<f64>) -> Option<(Unit<Vector3<f64>>, f64)> {
    rotation.axis_angle()
}

/// Rotation of `angle` radians about `axis`. A zero axis yields the identity.
pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> UnitQuaternion<f64> {
    match Unit::try_new(*axis, DEGENERATE_EPSILON) {
        Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle),
        None => UnitQuaternion::identity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_align_z_to_z_is_identity() {
        let r = align_axis_to_direction(&Vector3::z(), &Vector3::z());
        assert_relative_eq!(r.matrix(), Rotation3::identity().matrix(), epsilon = 1e-12);
    }

    #[test]
    fn test_align_carries_axis_onto_direction() {
        let direction = Vector3::new(1.0, 2.0, -0.5);
        let r = align_axis_to_direction(&Vector3::z(), &direction);
        assert_relative_eq!(r * Vector3::z(), direction.normalize(), epsilon = 1e-12);

        // Parallel to the reference direction takes the fallback path.
        let r = align_axis_to_direction(&Vector3::z(), &Vector3::x());
        assert_relative_eq!(r * Vector3::z(), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_align_ignores_direction_length() {
        let a = align_axis_to_direction(&Vector3::z(), &Vector3::new(0.0, 3.0, 4.0));
        let b = align_axis_to_direction(&Vector3::z(), &Vector3::new(0.0, 0.6, 0.8));
        assert_relative_eq!(a.matrix(), b.matrix(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_direction_is_identity() {
        let r = align_axis_to_direction(&Vector3::z(), &Vector3::zeros());
        assert_relative_eq!(r.matrix(), Rotation3::identity().matrix(), epsilon = 1e-12);
    }

    #[test]
    fn test_relative_transform_round_trip() {
        let base = compose(
            &Vector3::new(1.0, -2.0, 3.0),
            &UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1),
        );
        let target = compose(
            &Vector3::new(-4.0, 0.5, 2.0),
            &UnitQuaternion::from_euler_angles(-1.0, 0.4, 0.2),
        );
        let delta = relative_transform(&base, &target);
        assert_relative_eq!(base * delta, target, epsilon = 1e-9);
    }

    #[test]
    fn test_project_on_plane() {
        let p = project_on_plane(
            &Vector3::new(5.0, 0.0, 2.0),
            &Vector3::zeros(),
            &Vector3::new(0.0, 0.0, 3.0),
        );
        assert_relative_eq!(p, Vector3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_extract_translation_and_vector() {
        let frame = translation(&Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(extract_translation(&frame), Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(transform_vector(&frame, &Vector3::z()), Vector3::z());
        assert_relative_eq!(
            transform_position(&frame, &Vector3::zeros()),
            Vector3::new(1.0, 2.0, 3.0)
        );
    }
}
