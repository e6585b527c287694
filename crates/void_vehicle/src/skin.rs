//! Collision-skin identities and primitive shapes

use crate::error::{Result, VehicleError};
use crate::material::SkinMaterial;
use rapier3d::prelude as rapier;
use serde::{Deserialize, Serialize};
use void_math::Vec3;

/// Identity of a collision skin (the set of primitives owned by one body or
/// by the static world). Ground filters compare skins by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkinId(pub u64);

impl SkinId {
    /// Pack into collider user data
    pub(crate) fn to_user_data(self) -> u128 {
        u128::from(self.0)
    }

    /// Unpack from collider user data
    pub(crate) fn from_user_data(data: u128) -> Self {
        Self(data as u64)
    }
}

/// Primitive shape of a collision skin, in the skin owner's local frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// Axis-aligned box from its minimum corner and full side lengths
    Box { min: Vec3, extents: Vec3 },
    /// Sphere
    Sphere { center: Vec3, radius: f32 },
    /// Heightfield terrain (row-major heights)
    HeightField {
        heights: Vec<f32>,
        rows: usize,
        cols: usize,
        scale: Vec3,
    },
}

impl Primitive {
    /// Box spanning `min..max`
    pub fn aabb(min: Vec3, max: Vec3) -> Self {
        Self::Box {
            min,
            extents: max - min,
        }
    }

    /// Volume used to split a body's mass over its primitives
    pub fn volume(&self) -> f32 {
        match self {
            Self::Box { extents, .. } => extents.x * extents.y * extents.z,
            Self::Sphere { radius, .. } => 4.0 / 3.0 * core::f32::consts::PI * radius.powi(3),
            Self::HeightField { .. } => 0.0,
        }
    }

    /// Build a Rapier shape and its offset in the owner's frame
    pub(crate) fn to_rapier(&self) -> Result<(rapier::SharedShape, Vec3)> {
        match self {
            Self::Box { min, extents } => {
                if !(extents.x > 0.0 && extents.y > 0.0 && extents.z > 0.0) {
                    return Err(VehicleError::ShapeCreationFailed(format!(
                        "box extents must be positive, got {extents:?}"
                    )));
                }
                let half = *extents * 0.5;
                Ok((
                    rapier::SharedShape::cuboid(half.x, half.y, half.z),
                    *min + half,
                ))
            }
            Self::Sphere { center, radius } => {
                if !(*radius > 0.0) {
                    return Err(VehicleError::ShapeCreationFailed(format!(
                        "sphere radius must be positive, got {radius}"
                    )));
                }
                Ok((rapier::SharedShape::ball(*radius), *center))
            }
            Self::HeightField {
                heights,
                rows,
                cols,
                scale,
            } => {
                if *rows < 2 || *cols < 2 || heights.len() != rows * cols {
                    return Err(VehicleError::ShapeCreationFailed(format!(
                        "heightfield needs at least 2x2 samples matching {rows}x{cols}, got {}",
                        heights.len()
                    )));
                }
                let matrix = rapier3d::na::DMatrix::from_row_slice(*rows, *cols, heights);
                Ok((
                    rapier::SharedShape::heightfield(
                        matrix,
                        rapier::Vector::new(scale.x, scale.y, scale.z),
                    ),
                    Vec3::ZERO,
                ))
            }
        }
    }

    /// Build a Rapier collider builder for this primitive
    pub(crate) fn to_rapier_builder(
        &self,
        material: &SkinMaterial,
        skin: SkinId,
        mass: Option<f32>,
    ) -> Result<rapier::ColliderBuilder> {
        let (shape, offset) = self.to_rapier()?;
        let mut builder = rapier::ColliderBuilder::new(shape)
            .translation(rapier::Vector::new(offset.x, offset.y, offset.z))
            .friction(material.solver_friction())
            .restitution(material.elasticity)
            .user_data(skin.to_user_data());

        if let Some(mass) = mass {
            builder = builder.mass(mass);
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data_round_trip() {
        let id = SkinId(0xdead_beef);
        assert_eq!(SkinId::from_user_data(id.to_user_data()), id);
    }

    #[test]
    fn test_box_offset_is_centre() {
        let prim = Primitive::aabb(Vec3::new(-2.0, 0.0, -1.0), Vec3::new(2.0, 1.0, 1.0));
        let (_, offset) = prim.to_rapier().unwrap();
        assert_eq!(offset, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(prim.volume(), 8.0);
    }

    #[test]
    fn test_degenerate_shapes_rejected() {
        let flat = Primitive::aabb(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(flat.to_rapier(), Err(VehicleError::ShapeCreationFailed(_))));

        let hf = Primitive::HeightField {
            heights: vec![0.0; 3],
            rows: 2,
            cols: 2,
            scale: Vec3::ONE,
        };
        assert!(hf.to_rapier().is_err());
    }
}
