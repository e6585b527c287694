//! Void Vehicle - Ray-cast Car Dynamics
//!
//! This crate simulates four-wheeled cars on top of a rigid-body substrate.
//!
//! # Features
//!
//! - Multi-ray wheel probes with curvature offsets
//! - Spring-damper suspension sized from the chassis mass
//! - Slip-velocity tire friction, lateral and longitudinal
//! - Wheel spin with grip clamping, drive torque and handbrake lock
//! - Ackermann-style front steering with rate-limited driver input
//! - Rapier 3D backed world, or any engine implementing [`PhysicsSubstrate`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  VehicleWorld                     │
//! │  ┌────────────────┐        ┌───────────────────┐ │
//! │  │ RapierSubstrate│◄───────│   Car (x N)       │ │
//! │  │ bodies, skins, │ hooks  │  Chassis          │ │
//! │  │ segment query  │        │  Wheel x 4        │ │
//! │  └────────────────┘        └───────────────────┘ │
//! └──────────────────────────────────────────────────┘
//!
//!  per step:  ChassisBody::add_external_forces ─► Wheel::add_forces_to_car
//!             integrate
//!             ChassisBody::post_physics        ─► Wheel::update, steering
//! ```
//!
//! # Example
//!
//! ```ignore
//! use void_vehicle::prelude::*;
//!
//! let mut world = VehicleWorld::new(WorldConfig::default());
//! world.add_ground_box(
//!     Vec3::new(-100.0, -1.0, -100.0),
//!     Vec3::new(100.0, 0.0, 100.0),
//!     SkinMaterial::default(),
//! )?;
//!
//! let car = world.add_car(CarConfig::default(), Pose::IDENTITY)?;
//! if let Some(car) = world.car_mut(car) {
//!     car.set_accelerate(1.0);
//!     car.set_steer(0.5);
//! }
//!
//! world.step(1.0 / 60.0)?;
//! ```

pub mod body;
pub mod car;
pub mod chassis;
pub mod config;
pub mod error;
pub mod filter;
pub mod material;
pub mod query;
pub mod skin;
pub mod substrate;
pub mod wheel;
pub mod world;

#[cfg(test)]
mod testing;

pub mod prelude {
    //! Common imports for vehicle simulation
    pub use crate::body::{BodyDesc, BodyHandle, BodyKind, BodyState};
    pub use crate::car::Car;
    pub use crate::chassis::{chassis_boxes, Chassis, ChassisBody, VehicleHooks};
    pub use crate::config::{CarConfig, WorldConfig};
    pub use crate::error::{Result, VehicleError};
    pub use crate::filter::GroundContactFilter;
    pub use crate::material::SkinMaterial;
    pub use crate::query::{Segment, SegmentHit};
    pub use crate::skin::{Primitive, SkinId};
    pub use crate::substrate::PhysicsSubstrate;
    pub use crate::wheel::{friction_coefficient, Wheel, WheelId, WheelSetup, MAX_NUM_RAYS};
    pub use crate::world::{CarId, RapierSubstrate, VehicleWorld};
    pub use void_math::{Mat3, Pose, PoseRate, Vec3};
}

pub use prelude::*;
