//! Boundary between the vehicle model and the rigid-body / collision engine
//!
//! The vehicle never integrates bodies or runs narrow-phase itself. Everything
//! it needs from the engine goes through [`PhysicsSubstrate`]:
//!
//! - reading a body's pose, velocity, mass and movability
//! - clearing and accumulating external forces
//! - segment intersection filtered by a [`GroundContactFilter`]
//! - replacing the primitives of a collision skin

use crate::body::{BodyHandle, BodyState};
use crate::error::Result;
use crate::filter::GroundContactFilter;
use crate::material::SkinMaterial;
use crate::query::{Segment, SegmentHit};
use crate::skin::{Primitive, SkinId};
use void_math::Vec3;

/// Rigid-body and collision services consumed by the vehicle
///
/// Calls happen from inside the two integrator hooks, single-threaded, so
/// force accumulation is a plain additive write.
pub trait PhysicsSubstrate {
    /// World gravity vector
    fn gravity(&self) -> Vec3;

    /// Current state of a body
    fn body_state(&self, body: BodyHandle) -> Result<BodyState>;

    /// Velocity of a world-space point attached to a body
    fn point_velocity(&self, body: BodyHandle, point: Vec3) -> Result<Vec3> {
        Ok(self.body_state(body)?.point_velocity(point))
    }

    /// Drop the forces accumulated on a body since the last step
    fn clear_forces(&mut self, body: BodyHandle) -> Result<()>;

    /// Accumulate a world-space force applied at a world-space point
    fn add_world_force(&mut self, body: BodyHandle, force: Vec3, point: Vec3) -> Result<()>;

    /// Closest hit along `segment` among the skins `filter` considers
    fn segment_intersect(&self, segment: &Segment, filter: &GroundContactFilter) -> Option<SegmentHit>;

    /// Swap every primitive of `skin` for `parts`
    ///
    /// `mass`, when given, is distributed over the new primitives by volume.
    /// Queries never observe the skin half-replaced.
    fn replace_primitives(
        &mut self,
        skin: SkinId,
        parts: &[(Primitive, SkinMaterial)],
        mass: Option<f32>,
    ) -> Result<()>;
}

/// Split `mass` over primitives proportionally to their volume
///
/// Falls back to an even split when the total volume is zero.
pub fn mass_by_volume(parts: &[(Primitive, SkinMaterial)], mass: f32) -> Vec<f32> {
    let total: f32 = parts.iter().map(|(p, _)| p.volume()).sum();
    if total > 0.0 {
        parts.iter().map(|(p, _)| mass * p.volume() / total).collect()
    } else if parts.is_empty() {
        Vec::new()
    } else {
        vec![mass / parts.len() as f32; parts.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mass_split_by_volume() {
        let parts = [
            (Primitive::aabb(Vec3::ZERO, Vec3::new(3.0, 1.0, 1.0)), SkinMaterial::default()),
            (Primitive::aabb(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0)), SkinMaterial::default()),
        ];
        let masses = mass_by_volume(&parts, 100.0);
        assert_relative_eq!(masses[0], 75.0);
        assert_relative_eq!(masses[1], 25.0);
    }

    #[test]
    fn test_mass_split_without_volume() {
        let hf = Primitive::HeightField {
            heights: vec![0.0; 4],
            rows: 2,
            cols: 2,
            scale: Vec3::ONE,
        };
        let parts = [(hf.clone(), SkinMaterial::default()), (hf, SkinMaterial::default())];
        assert_eq!(mass_by_volume(&parts, 10.0), vec![5.0, 5.0]);
    }
}
