//! Pose math for rigid bodies: transforms and quaternions
//!
//! Thin wrappers over nalgebra with the plain-array surface the host API
//! uses for positions and extents.

mod quaternion;
mod transform;

pub use quaternion::Quaternion;
pub use transform::Transform;

/// Type alias for 3D vectors
pub type Vector3 = nalgebra::Vector3<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector3_array_conversions() {
        let v = Vector3::from([1.0, 2.0, 3.0]);
        let a: [f64; 3] = v.into();
        assert_eq!(a, [1.0, 2.0, 3.0]);
    }
}
