//! World-space pose of a rigid body (SE3)

use super::Quaternion;
use serde::{Deserialize, Serialize};

/// A rigid body pose: position and orientation in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position (translation) in 3D space
    pub position: [f64; 3],
    /// Orientation as a unit quaternion
    pub orientation: Quaternion,
}

impl Transform {
    /// Create a new transform from position and orientation
    #[inline]
    pub const fn new(position: [f64; 3], orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Identity pose (origin, no rotation)
    #[inline]
    pub const fn identity() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            orientation: Quaternion::identity(),
        }
    }

    /// Create from position only (identity rotation)
    #[inline]
    pub const fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: [x, y, z],
            orientation: Quaternion::identity(),
        }
    }

    /// Map a point from this pose's local frame into world space
    pub fn to_world(&self, local: [f64; 3]) -> [f64; 3] {
        let r = self.orientation.rotate(local);
        [
            self.position[0] + r[0],
            self.position[1] + r[1],
            self.position[2] + r[2],
        ]
    }

    /// Map a world-space point into this pose's local frame
    pub fn to_local(&self, world: [f64; 3]) -> [f64; 3] {
        let d = [
            world[0] - self.position[0],
            world[1] - self.position[1],
            world[2] - self.position[2],
        ];
        self.orientation.inverse().rotate(d)
    }

    /// Translate the pose by a world-space offset
    pub fn translated(&self, offset: [f64; 3]) -> Self {
        Self {
            position: [
                self.position[0] + offset[0],
                self.position[1] + offset[1],
                self.position[2] + offset[2],
            ],
            orientation: self.orientation,
        }
    }
}

impl Default for Transform {
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
    fn test_identity_maps_points_unchanged() {
        let t = Transform::identity();
        assert_eq!(t.to_world([1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]);
        assert_eq!(t.to_local([1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_local_world_round_trip() {
        let t = Transform::new(
            [5.0, -2.0, 0.5],
            Quaternion::from_axis_angle([0.0, 1.0, 0.0], PI / 3.0),
        );
        let p = [1.0, 2.0, 3.0];
        let back = t.to_local(t.to_world(p));
        for i in 0..3 {
            assert_relative_eq!(back[i], p[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_tilted_plane_normal() {
        // A pose tilted about X carries its local +Y into (0, cos, sin)
        let tilt = PI / 16.0;
        let t = Transform::new([0.0, 0.0, 0.0], Quaternion::from_axis_angle([1.0, 0.0, 0.0], tilt));
        let n = t.orientation.rotate([0.0, 1.0, 0.0]);
        assert_relative_eq!(n[1], tilt.cos(), epsilon = 1e-12);
        assert_relative_eq!(n[2], tilt.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_translated() {
        let t = Transform::from_position(1.0, 1.0, 1.0).translated([0.0, -0.5, 0.0]);
        assert_eq!(t.position, [1.0, 0.5, 1.0]);
    }
}
