//! Error types for the vehicle system

use crate::body::BodyHandle;
use crate::skin::SkinId;
use crate::world::CarId;
use thiserror::Error;

/// Vehicle system errors
#[derive(Debug, Error)]
pub enum VehicleError {
    /// Rigid body not found in the substrate
    #[error("Rigid body not found: {0:?}")]
    BodyNotFound(BodyHandle),

    /// Collision skin not found in the substrate
    #[error("Collision skin not found: {0:?}")]
    SkinNotFound(SkinId),

    /// Car not found in the world
    #[error("Car not found: {0:?}")]
    CarNotFound(CarId),

    /// Invalid configuration (non-positive travel, radius, inertia, ...)
    #[error("Invalid vehicle configuration: {0}")]
    InvalidConfig(String),

    /// Shape creation failed
    #[error("Failed to create collision shape: {0}")]
    ShapeCreationFailed(String),
}

/// Result type for vehicle operations
pub type Result<T> = std::result::Result<T, VehicleError>;
