//! Segment queries against the collision substrate

use crate::body::BodyHandle;
use crate::skin::SkinId;
use void_math::Vec3;

/// Finite line segment from `origin` to `origin + delta`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Start point
    pub origin: Vec3,
    /// Unnormalized direction; its length is the segment length
    pub delta: Vec3,
}

impl Segment {
    /// Create a segment
    pub const fn new(origin: Vec3, delta: Vec3) -> Self {
        Self { origin, delta }
    }

    /// Far end of the segment
    #[inline]
    pub fn end(&self) -> Vec3 {
        self.origin + self.delta
    }

    /// Point at a fraction along the segment (0 = origin, 1 = end)
    #[inline]
    pub fn point_at(&self, fraction: f32) -> Vec3 {
        self.origin + self.delta * fraction
    }

    /// Same segment translated by `offset`
    #[inline]
    pub fn offset(&self, offset: Vec3) -> Self {
        Self::new(self.origin + offset, self.delta)
    }
}

/// Closest intersection of a segment with the collision substrate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    /// Hit fraction along the segment
    pub fraction: f32,
    /// Hit point in world space
    pub position: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
    /// Skin that was hit
    pub skin: SkinId,
    /// Body owning that skin, if any
    pub body: Option<BodyHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_points() {
        let seg = Segment::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -4.0, 0.0));
        assert_eq!(seg.end(), Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(seg.point_at(0.25), Vec3::new(0.0, 1.0, 0.0));

        let moved = seg.offset(Vec3::X);
        assert_eq!(moved.origin, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(moved.delta, seg.delta);
    }
}
