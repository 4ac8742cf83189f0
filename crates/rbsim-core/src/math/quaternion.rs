//! Unit quaternion for 3D rotations
//!
//! Wrapper around nalgebra's UnitQuaternion with a plain-field surface that
//! serializes cleanly and stays `Copy`.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A unit quaternion representing a 3D rotation
///
/// Uses Hamilton convention (w, x, y, z) where w is the scalar part.
/// Always normalized to unit length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    /// Scalar component (w)
    pub w: f64,
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Quaternion {
    /// Create a new quaternion from components (automatically normalized)
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        let norm_sq = w * w + x * x + y * y + z * z;
        if norm_sq > 1e-20 {
            let inv = 1.0 / norm_sq.sqrt();
            Self {
                w: w * inv,
                x: x * inv,
                y: y * inv,
                z: z * inv,
            }
        } else {
            Self::identity()
        }
    }

    /// Identity quaternion (no rotation)
    pub const fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Create from axis-angle representation (angle in radians)
    ///
    /// A degenerate axis yields the identity rotation.
    pub fn from_axis_angle(axis: [f64; 3], angle: f64) -> Self {
        let axis_vec = Vector3::from(axis);
        if let Some(unit_axis) = nalgebra::Unit::try_new(axis_vec, 1e-10) {
            Self::from_nalgebra(UnitQuaternion::from_axis_angle(&unit_axis, angle))
        } else {
            Self::identity()
        }
    }

    /// Create from Euler angles (roll, pitch, yaw) in radians, ZYX convention
    pub fn from_euler(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::from_nalgebra(UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }

    /// Rotate a vector by this quaternion
    pub fn rotate(&self, v: [f64; 3]) -> [f64; 3] {
        (self.to_nalgebra() * Vector3::from(v)).into()
    }

    /// Get the inverse (conjugate) rotation
    pub fn inverse(&self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Compose two rotations: `self` applied after `other`
    pub fn multiply(&self, other: &Quaternion) -> Self {
        Self::from_nalgebra(self.to_nalgebra() * other.to_nalgebra())
    }

    /// Rotation angle in radians, in [0, π]
    pub fn angle(&self) -> f64 {
        self.to_nalgebra().angle()
    }

    /// Convert to nalgebra's UnitQuaternion
    pub fn to_nalgebra(self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(
            self.w, self.x, self.y, self.z,
        ))
    }

    /// Convert from nalgebra's UnitQuaternion
    pub fn from_nalgebra(uq: UnitQuaternion<f64>) -> Self {
        Self {
            w: uq.w,
            x: uq.i,
            y: uq.j,
            z: uq.k,
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_identity_rotation() {
        let q = Quaternion::identity();
        let v = q.rotate([1.0, 2.0, 3.0]);
        assert_relative_eq!(v[0], 1.0);
        assert_relative_eq!(v[1], 2.0);
        assert_relative_eq!(v[2], 3.0);
    }

    #[test]
    fn test_new_normalizes() {
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        assert_relative_eq!(q.w, 1.0);
    }

    #[test]
    fn test_axis_angle_quarter_turn() {
        // 90 degrees about Z maps +X to +Y
        let q = Quaternion::from_axis_angle([0.0, 0.0, 1.0], PI / 2.0);
        let v = q.rotate([1.0, 0.0, 0.0]);
        assert_relative_eq!(v[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(v[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(v[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_axis_is_identity() {
        let q = Quaternion::from_axis_angle([0.0, 0.0, 0.0], 1.0);
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn test_inverse_round_trip() {
        let q = Quaternion::from_euler(0.3, -0.2, 1.1);
        let v = [0.5, -1.5, 2.0];
        let back = q.inverse().rotate(q.rotate(v));
        for i in 0..3 {
            assert_relative_eq!(back[i], v[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_multiply_composes() {
        let a = Quaternion::from_axis_angle([1.0, 0.0, 0.0], 0.4);
        let b = Quaternion::from_axis_angle([1.0, 0.0, 0.0], 0.6);
        let c = a.multiply(&b);
        assert_relative_eq!(c.angle(), 1.0, epsilon = 1e-12);
    }
}
