//! Vehicle and world configuration

use crate::error::{Result, VehicleError};
use crate::wheel::MAX_NUM_RAYS;
use serde::{Deserialize, Serialize};
use void_math::Vec3;

/// Car tuning: drivetrain, steering, wheel and chassis parameters
///
/// Lengths are in the chassis-local frame: +X forward, +Y up, +Z right.
/// Angles are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarConfig {
    /// Front axle receives drive torque
    pub front_drive: bool,
    /// Rear axle receives drive torque
    pub rear_drive: bool,
    /// Steer angle of the inner front wheel at full lock (degrees)
    pub max_steer_angle: f32,
    /// How fast the smoothed steer value follows the request (units per second)
    pub steer_rate: f32,
    /// Lateral tire friction coefficient
    pub wheel_side_friction: f32,
    /// Longitudinal tire friction coefficient
    pub wheel_fwd_friction: f32,
    /// Suspension travel
    pub wheel_travel: f32,
    /// Wheel radius
    pub wheel_radius: f32,
    /// Vertical offset of the wheel mounts from the chassis floor
    pub wheel_z_offset: f32,
    /// Fraction of travel compressed when the car rests under gravity
    pub wheel_resting_frac: f32,
    /// Fraction of critical damping
    pub wheel_damping_frac: f32,
    /// Probe rays per wheel
    pub wheel_num_rays: usize,
    /// Maximum drive torque, split between axles when both are driven
    pub drive_torque: f32,
    /// Gravity magnitude used to size the springs
    pub gravity: f32,
    /// Chassis mass (kg)
    pub chassis_mass: f32,
    /// Chassis extents, minimum corner
    pub chassis_min: Vec3,
    /// Chassis extents, maximum corner
    pub chassis_max: Vec3,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            front_drive: true,
            rear_drive: true,
            max_steer_angle: 30.0,
            steer_rate: 5.0,
            wheel_side_friction: 4.7,
            wheel_fwd_friction: 5.0,
            wheel_travel: 0.2,
            wheel_radius: 0.4,
            wheel_z_offset: 0.05,
            wheel_resting_frac: 0.45,
            wheel_damping_frac: 0.3,
            wheel_num_rays: 1,
            drive_torque: 520.0,
            gravity: 9.81,
            chassis_mass: 100.0,
            chassis_min: Vec3::new(-2.0, 0.3, -1.0),
            chassis_max: Vec3::new(2.0, 1.4, 1.0),
        }
    }
}

impl CarConfig {
    /// Set the driven axles
    pub fn with_drive(mut self, front: bool, rear: bool) -> Self {
        self.front_drive = front;
        self.rear_drive = rear;
        self
    }

    /// Set steering limits
    pub fn with_steering(mut self, max_steer_angle: f32, steer_rate: f32) -> Self {
        self.max_steer_angle = max_steer_angle;
        self.steer_rate = steer_rate;
        self
    }

    /// Set tire friction coefficients
    pub fn with_friction(mut self, side: f32, fwd: f32) -> Self {
        self.wheel_side_friction = side;
        self.wheel_fwd_friction = fwd;
        self
    }

    /// Set wheel radius and suspension travel
    pub fn with_wheel(mut self, radius: f32, travel: f32) -> Self {
        self.wheel_radius = radius;
        self.wheel_travel = travel;
        self
    }

    /// Set number of probe rays per wheel
    pub fn with_num_rays(mut self, num_rays: usize) -> Self {
        self.wheel_num_rays = num_rays;
        self
    }

    /// Set chassis mass
    pub fn with_chassis_mass(mut self, mass: f32) -> Self {
        self.chassis_mass = mass;
        self
    }

    /// Set chassis extents
    pub fn with_chassis_dims(mut self, min: Vec3, max: Vec3) -> Self {
        self.chassis_min = min;
        self.chassis_max = max;
        self
    }

    /// Reject configurations that would produce NaNs at simulation time
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("wheel_travel", self.wheel_travel),
            ("wheel_radius", self.wheel_radius),
            ("wheel_resting_frac", self.wheel_resting_frac),
            ("chassis_mass", self.chassis_mass),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(VehicleError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let finite = [
            ("max_steer_angle", self.max_steer_angle),
            ("steer_rate", self.steer_rate),
            ("wheel_side_friction", self.wheel_side_friction),
            ("wheel_fwd_friction", self.wheel_fwd_friction),
            ("wheel_z_offset", self.wheel_z_offset),
            ("wheel_damping_frac", self.wheel_damping_frac),
            ("drive_torque", self.drive_torque),
            ("gravity", self.gravity),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(VehicleError::InvalidConfig(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }

        if self.wheel_num_rays == 0 || self.wheel_num_rays > MAX_NUM_RAYS {
            return Err(VehicleError::InvalidConfig(format!(
                "wheel_num_rays must be in 1..={MAX_NUM_RAYS}, got {}",
                self.wheel_num_rays
            )));
        }

        validate_dims(self.chassis_min, self.chassis_max)?;

        if self.drive_torque != 0.0 && !self.front_drive && !self.rear_drive {
            log::warn!("Drive torque {} configured but no axle is driven", self.drive_torque);
        }

        Ok(())
    }
}

/// Chassis extents must be finite with `min < max` on every axis
pub(crate) fn validate_dims(min: Vec3, max: Vec3) -> Result<()> {
    if !(min.is_finite() && max.is_finite()) {
        return Err(VehicleError::InvalidConfig(format!(
            "chassis dimensions must be finite, got {min:?}..{max:?}"
        )));
    }
    if min.x >= max.x || min.y >= max.y || min.z >= max.z {
        return Err(VehicleError::InvalidConfig(format!(
            "chassis min must be below max on every axis, got {min:?}..{max:?}"
        )));
    }
    Ok(())
}

/// Rapier-backed world configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravity vector (default: -9.81 in Y)
    pub gravity: [f32; 3],

    /// Fixed timestep for physics simulation
    pub timestep: f32,

    /// Maximum number of substeps per frame
    pub max_substeps: u32,

    /// Solver iterations for velocity
    pub velocity_iterations: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            timestep: 1.0 / 60.0,
            max_substeps: 4,
            velocity_iterations: 4,
        }
    }
}

impl WorldConfig {
    /// Set gravity
    pub fn with_gravity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.gravity = [x, y, z];
        self
    }

    /// Set timestep
    pub fn with_timestep(mut self, timestep: f32) -> Self {
        self.timestep = timestep;
        self
    }
}
