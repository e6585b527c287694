//! 3x3 orientation matrix

use crate::vector::Vec3;
use core::ops::{Mul, MulAssign};

/// 3x3 matrix (column-major)
///
/// As an orientation the columns are the rotated basis axes: `cols[0]` is
/// where local +X points in world space, `cols[1]` local +Y, `cols[2]` local +Z.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mat3 {
    pub cols: [Vec3; 3],
}

impl Mat3 {
    pub const IDENTITY: Self = Self {
        cols: [Vec3::X, Vec3::Y, Vec3::Z],
    };

    pub const ZERO: Self = Self {
        cols: [Vec3::ZERO, Vec3::ZERO, Vec3::ZERO],
    };

    #[inline]
    pub const fn from_cols(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        Self { cols: [c0, c1, c2] }
    }

    /// Rotation of `angle` radians about `axis` (Rodrigues' rotation formula).
    ///
    /// A zero axis yields the identity.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let axis = axis.normalize_safe();
        if axis == Vec3::ZERO {
            return Self::IDENTITY;
        }

        let (sin, cos) = angle.sin_cos();
        let t = 1.0 - cos;
        let Vec3 { x, y, z } = axis;

        Self::from_cols(
            Vec3::new(t * x * x + cos, t * x * y + sin * z, t * x * z - sin * y),
            Vec3::new(t * x * y - sin * z, t * y * y + cos, t * y * z + sin * x),
            Vec3::new(t * x * z + sin * y, t * y * z - sin * x, t * z * z + cos),
        )
    }

    /// Rotation of `degrees` about `axis`; the angle is converted to radians.
    #[inline]
    pub fn from_axis_angle_degrees(degrees: f32, axis: Vec3) -> Self {
        Self::from_axis_angle(axis, crate::radians(degrees))
    }

    #[inline]
    pub fn from_rotation_y(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::from_cols(
            Vec3::new(cos, 0.0, -sin),
            Vec3::Y,
            Vec3::new(sin, 0.0, cos),
        )
    }

    #[inline]
    pub fn x_axis(&self) -> Vec3 {
        self.cols[0]
    }

    #[inline]
    pub fn row(&self, i: usize) -> Vec3 {
        match i {
            0 => Vec3::new(self.cols[0].x, self.cols[1].x, self.cols[2].x),
            1 => Vec3::new(self.cols[0].y, self.cols[1].y, self.cols[2].y),
            _ => Vec3::new(self.cols[0].z, self.cols[1].z, self.cols[2].z),
        }
    }

    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.row(0), self.row(1), self.row(2))
    }

    /// Determinant (+1 for a proper rotation)
    pub fn determinant(&self) -> f32 {
        let [a, b, c] = self.cols;
        a.dot(b.cross(c))
    }

    /// Gram-Schmidt re-orthonormalization of the basis axes, in order.
    ///
    /// Axis 0 is normalized, axis 1 made orthogonal to axis 0 then normalized,
    /// axis 2 made orthogonal to both then normalized. Used to undo drift
    /// accumulated by repeated incremental rotation.
    pub fn orthonormalize(&mut self) {
        let [c0, c1, c2] = self.cols;

        let c0 = c0.normalize_safe();
        let c1 = (c1 - c0 * c1.dot(c0)).normalize_safe();
        let c2 = (c2 - c0 * c2.dot(c0) - c1 * c2.dot(c1)).normalize_safe();

        self.cols = [c0, c1, c2];
    }

    /// By-value form of [`Mat3::orthonormalize`].
    #[inline]
    pub fn orthonormalized(mut self) -> Self {
        self.orthonormalize();
        self
    }

    /// Largest deviation of `selfᵀ·self` from the identity.
    pub fn orthonormal_error(&self) -> f32 {
        let mut worst = 0.0f32;
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                worst = worst.max((self.cols[i].dot(self.cols[j]) - expected).abs());
            }
        }
        worst
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: Vec3) -> Vec3 {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z
    }
}

impl Mul for Mat3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::from_cols(self * rhs.cols[0], self * rhs.cols[1], self * rhs.cols[2])
    }
}

impl MulAssign for Mat3 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}
