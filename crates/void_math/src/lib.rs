//! # void_math - spatial transforms for vehicle dynamics
//!
//! Value types for poses and pose rates, plus the safe scalar/vector helpers
//! the vehicle solver relies on (zero-safe normalization, Gram-Schmidt
//! re-orthonormalization, axis-angle rotation construction).

pub mod vector;
pub mod matrix;
pub mod transform;

pub use vector::*;
pub use matrix::*;
pub use transform::*;

/// Common math constants
pub mod consts {
    pub const PI: f32 = core::f32::consts::PI;
    pub const DEG_TO_RAD: f32 = PI / 180.0;
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
    pub const EPSILON: f32 = 1e-6;
}

/// Convert degrees to radians
#[inline]
pub fn radians(degrees: f32) -> f32 {
    degrees * consts::DEG_TO_RAD
}

/// Convert radians to degrees
#[inline]
pub fn degrees(radians: f32) -> f32 {
    radians * consts::RAD_TO_DEG
}

/// `1 / x`, or `f32::MAX` when `|x|` is below [`consts::EPSILON`].
#[inline]
pub fn safe_inv_scalar(x: f32) -> f32 {
    if x.abs() < consts::EPSILON {
        f32::MAX
    } else {
        1.0 / x
    }
}

pub mod prelude {
    pub use crate::vector::Vec3;
    pub use crate::matrix::Mat3;
    pub use crate::transform::{Pose, PoseRate};
    pub use crate::{radians, degrees, safe_inv_scalar};
}
