//! Math utilities and types
//!
//! Double precision aliases over nalgebra plus the handful of helpers the
//! physics pipeline needs: tangent bases, quaternion integration and
//! interpolation, and a rigid transform.

pub use nalgebra::{Matrix3, Quaternion, Unit, UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f64>;

/// Unit quaternion type for orientations
pub type Quat = UnitQuaternion<f64>;

/// Rigid transform (position and orientation, no scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,

    /// Orientation in world space
    pub orientation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
        }
    }
}

impl Transform {
    /// Create a transform from position and orientation
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    /// Create a transform with only a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Transform a local point into world space
    pub fn point_to_world(&self, local: &Vec3) -> Vec3 {
        self.orientation * local + self.position
    }

    /// Transform a world point into local space
    pub fn point_to_local(&self, world: &Vec3) -> Vec3 {
        self.orientation.inverse_transform_vector(&(world - self.position))
    }

    /// Rotate a local direction into world space
    pub fn vector_to_world(&self, local: &Vec3) -> Vec3 {
        self.orientation * local
    }

    /// Rotate a world direction into local space
    pub fn vector_to_local(&self, world: &Vec3) -> Vec3 {
        self.orientation.inverse_transform_vector(world)
    }

    /// Compose a child transform expressed in this transform's frame
    pub fn combine(&self, child: &Self) -> Self {
        Self {
            position: self.point_to_world(&child.position),
            orientation: self.orientation * child.orientation,
        }
    }
}

/// Two unit vectors orthogonal to `n` and to each other.
///
/// For a degenerate input the world X and Y axes are returned.
pub fn tangents(n: &Vec3) -> (Vec3, Vec3) {
    let norm = n.norm();
    if norm <= 0.0 {
        return (Vec3::x(), Vec3::y());
    }
    let n = n / norm;
    let helper = if n.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    let t1 = n.cross(&helper).normalize();
    let t2 = n.cross(&t1);
    (t1, t2)
}

/// Advance an orientation by `angular_velocity` over `dt`.
///
/// Adds `dt * 0.5 * w * q` component-wise; the result is not normalized.
pub fn integrate_quat(
    q: &Quaternion<f64>,
    angular_velocity: &Vec3,
    angular_factor: &Vec3,
    dt: f64,
) -> Quaternion<f64> {
    let w = angular_velocity.component_mul(angular_factor);
    let spin = Quaternion::new(0.0, w.x, w.y, w.z) * *q;
    *q + spin * (0.5 * dt)
}

/// Approximate renormalization, accurate for quaternions already close to unit length.
pub fn normalize_fast(q: &Quaternion<f64>) -> Quat {
    let f = (3.0 - q.norm_squared()) * 0.5;
    Unit::new_unchecked(*q * f)
}

/// Exact renormalization that falls back to identity for a zero quaternion.
pub fn normalize_exact(q: &Quaternion<f64>) -> Quat {
    Unit::try_new(*q, 0.0).unwrap_or_else(Quat::identity)
}

/// Spherical interpolation along the shortest arc.
///
/// Falls back to normalized linear interpolation for nearly identical inputs,
/// so it never fails for antipodal or coincident orientations.
pub fn slerp(from: &Quat, to: &Quat, t: f64) -> Quat {
    let a = from.quaternion();
    let mut b = *to.quaternion();
    let mut cos_omega = a.dot(&b);

    if cos_omega < 0.0 {
        cos_omega = -cos_omega;
        b = -b;
    }

    let (scale0, scale1) = if 1.0 - cos_omega > 1e-6 {
        let omega = cos_omega.acos();
        let sin_omega = omega.sin();
        (
            ((1.0 - t) * omega).sin() / sin_omega,
            (t * omega).sin() / sin_omega,
        )
    } else {
        (1.0 - t, t)
    };

    normalize_exact(&(*a * scale0 + b * scale1))
}

/// Face normal of the triangle `(a, b, c)` following the right-hand rule.
///
/// Returns the zero vector for degenerate triangles.
pub fn triangle_normal(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    let n = (b - a).cross(&(c - a));
    let len = n.norm();
    if len > 0.0 {
        n / len
    } else {
        Vec3::zeros()
    }
}

/// Rotate a diagonal inertia tensor into world space: `R * diag(d) * R^T`.
pub fn rotate_diagonal(diagonal: &Vec3, orientation: &Quat) -> Mat3 {
    let r = orientation.to_rotation_matrix();
    let r = r.matrix();
    r * Mat3::from_diagonal(diagonal) * r.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_tangents_are_orthonormal() {
        for n in [Vec3::x(), Vec3::y(), Vec3::z(), Vec3::new(1.0, 2.0, -3.0).normalize()] {
            let (t1, t2) = tangents(&n);
            assert_relative_eq!(t1.norm(), 1.0, epsilon = EPSILON);
            assert_relative_eq!(t2.norm(), 1.0, epsilon = EPSILON);
            assert!(t1.dot(&n).abs() < EPSILON);
            assert!(t2.dot(&n).abs() < EPSILON);
            assert!(t1.dot(&t2).abs() < EPSILON);
        }
    }

    #[test]
    fn test_tangents_degenerate() {
        let (t1, t2) = tangents(&Vec3::zeros());
        assert_eq!(t1, Vec3::x());
        assert_eq!(t2, Vec3::y());
    }

    #[test]
    fn test_integrate_quat_about_z() {
        // Small steps about Z should approach the exact rotation
        let mut q = *Quat::identity().quaternion();
        let w = Vec3::new(0.0, 0.0, 1.0);
        let steps = 1000;
        let dt = 1.0 / f64::from(steps);
        for _ in 0..steps {
            q = *normalize_exact(&integrate_quat(&q, &w, &Vec3::repeat(1.0), dt)).quaternion();
        }
        let expected = Quat::from_axis_angle(&Vec3::z_axis(), 1.0);
        assert_relative_eq!(Unit::new_unchecked(q).angle_to(&expected), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_angular_factor_locks_axis() {
        let q = *Quat::identity().quaternion();
        let next = integrate_quat(&q, &Vec3::new(1.0, 0.0, 0.0), &Vec3::new(0.0, 1.0, 1.0), 0.1);
        assert_relative_eq!(next, q, epsilon = EPSILON);
    }

    #[test]
    fn test_normalize_fast_close_to_exact() {
        let q = Quaternion::new(1.01, 0.0, 0.0, 0.0);
        let fast = normalize_fast(&q);
        assert_relative_eq!(fast.quaternion().norm(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_slerp_endpoints_and_midpoint() {
        let a = Quat::identity();
        let b = Quat::from_axis_angle(&Vec3::z_axis(), std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(slerp(&a, &b, 0.0).angle_to(&a), 0.0, epsilon = 1e-6);
        assert_relative_eq!(slerp(&a, &b, 1.0).angle_to(&b), 0.0, epsilon = 1e-6);
        let mid = slerp(&a, &b, 0.5);
        assert_relative_eq!(mid.angle(), std::f64::consts::FRAC_PI_4, epsilon = 1e-6);
    }

    #[test]
    fn test_transform_round_trip() {
        let t = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(&Vec3::x_axis(), 0.7),
        );
        let p = Vec3::new(-0.5, 4.0, 2.0);
        assert_relative_eq!(t.point_to_local(&t.point_to_world(&p)), p, epsilon = EPSILON);
        assert_relative_eq!(t.vector_to_local(&t.vector_to_world(&p)), p, epsilon = EPSILON);
    }

    #[test]
    fn test_rotate_diagonal_isotropic_is_invariant() {
        let q = Quat::from_axis_angle(&Vec3::y_axis(), 1.2);
        let m = rotate_diagonal(&Vec3::repeat(2.0), &q);
        assert_relative_eq!(m, Mat3::from_diagonal_element(2.0), epsilon = EPSILON);
    }
}
