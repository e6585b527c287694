//! Pose and pose-rate types for advancing rigid frames

use crate::matrix::Mat3;
use crate::vector::Vec3;
use core::ops::{Add, AddAssign, Mul, MulAssign};

/// Position and orientation of a rigid frame
///
/// The orientation is kept orthonormal by periodic
/// [`Pose::orthonormalize`] calls rather than on every operation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Mat3,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Mat3::IDENTITY,
    };

    #[inline]
    pub const fn new(position: Vec3, orientation: Mat3) -> Self {
        Self { position, orientation }
    }

    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Mat3::IDENTITY,
        }
    }

    /// Transform a point from this frame into the parent frame
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    /// Transform a direction (ignores position)
    #[inline]
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.orientation * vector
    }

    /// Pose `other` expressed in this pose's frame.
    ///
    /// `other.position` is rotated by this orientation and offset by this
    /// position; orientations multiply so that the result maps a point `p`
    /// to `self.transform_point(other.transform_point(p))`.
    pub fn compose(&self, other: &Pose) -> Self {
        Self {
            position: self.position + self.orientation * other.position,
            orientation: self.orientation * other.orientation,
        }
    }

    /// In-place form of [`Pose::compose`]; `self` becomes `self ∘ other`.
    pub fn compose_in_place(&mut self, other: &Pose) {
        self.position += self.orientation * other.position;
        self.orientation *= other.orientation;
    }

    /// Advance this pose by `rate` over `dt` seconds.
    ///
    /// Translates along the linear velocity, then rotates about the angular
    /// velocity axis by `|angular| * dt` radians, applied on the left of the
    /// existing orientation. A zero angular velocity leaves the orientation
    /// untouched.
    pub fn apply_rate(&mut self, rate: &PoseRate, dt: f32) {
        self.position += rate.linear * dt;

        let speed = rate.angular.length();
        if speed > 0.0 {
            let axis = rate.angular / speed;
            self.orientation = Mat3::from_axis_angle(axis, speed * dt) * self.orientation;
        }
    }

    #[inline]
    pub fn orthonormalize(&mut self) {
        self.orientation.orthonormalize();
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Pose {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.compose(&rhs)
    }
}

impl MulAssign for Pose {
    fn mul_assign(&mut self, rhs: Self) {
        self.compose_in_place(&rhs);
    }
}

/// Linear and angular velocity of a rigid frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseRate {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl PoseRate {
    pub const ZERO: Self = Self {
        linear: Vec3::ZERO,
        angular: Vec3::ZERO,
    };

    #[inline]
    pub const fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }

    /// Velocity of a point rigidly attached to a frame moving at this rate,
    /// `offset` being the point's world-space offset from the frame origin.
    #[inline]
    pub fn point_velocity(&self, offset: Vec3) -> Vec3 {
        self.linear + self.angular.cross(offset)
    }
}

impl Add for PoseRate {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.linear + rhs.linear, self.angular + rhs.angular)
    }
}

impl AddAssign for PoseRate {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
