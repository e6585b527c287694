//! Per-primitive surface properties of a collision skin

use serde::{Deserialize, Serialize};

/// Surface material attached to each primitive of a collision skin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkinMaterial {
    /// Bounciness (0 = no bounce, 1 = perfect bounce)
    pub elasticity: f32,
    /// Friction coefficient when at rest relative to the other surface
    pub static_roughness: f32,
    /// Friction coefficient when sliding
    pub dynamic_roughness: f32,
}

impl Default for SkinMaterial {
    fn default() -> Self {
        Self {
            elasticity: 0.0,
            static_roughness: 0.5,
            dynamic_roughness: 0.5,
        }
    }
}

impl SkinMaterial {
    /// Material used for both chassis boxes
    pub const CHASSIS: Self = Self {
        elasticity: 0.3,
        static_roughness: 0.5,
        dynamic_roughness: 0.3,
    };

    /// Create a new material
    pub fn new(elasticity: f32, static_roughness: f32, dynamic_roughness: f32) -> Self {
        Self {
            elasticity,
            static_roughness,
            dynamic_roughness,
        }
    }

    /// Set elasticity
    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity.clamp(0.0, 1.0);
        self
    }

    /// Set both roughness coefficients
    pub fn with_roughness(mut self, static_roughness: f32, dynamic_roughness: f32) -> Self {
        self.static_roughness = static_roughness.max(0.0);
        self.dynamic_roughness = dynamic_roughness.max(0.0);
        self
    }

    /// Friction coefficient handed to the contact solver
    pub(crate) fn solver_friction(&self) -> f32 {
        0.5 * (self.static_roughness + self.dynamic_roughness)
    }
}
