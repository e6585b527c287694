//! Per-wheel suspension and tire solver
//!
//! Each step a wheel probes the ground with up to [`MAX_NUM_RAYS`] parallel
//! segments spread across its diameter, turns the closest contact into a
//! spring-damper force along the suspension axis, and adds lateral and
//! longitudinal tire friction from a slip-velocity model. The reaction torque
//! of the longitudinal force spins the wheel in [`Wheel::update`].

use crate::chassis::ChassisBody;
use crate::error::{Result, VehicleError};
use crate::filter::GroundContactFilter;
use crate::query::{Segment, SegmentHit};
use crate::substrate::PhysicsSubstrate;
use serde::{Deserialize, Serialize};
use void_math::consts::EPSILON;
use void_math::{degrees, radians, Mat3, Vec3};

/// Upper bound on probe rays per wheel (size of the scratch buffers)
pub const MAX_NUM_RAYS: usize = 32;

/// Above this contact speed the tire is sliding
const SLIP_VELOCITY: f32 = 0.4;
/// Below this contact speed the tire has full grip
const NO_SLIP_VELOCITY: f32 = 0.2;
/// Friction scale while sliding
const SLIP_FACTOR: f32 = 0.7;
/// Friction tapers linearly to zero below this speed
const SMALL_VELOCITY: f32 = 3.0;
/// Wheel spin limit (rad/s)
const MAX_ANG_VEL: f32 = 200.0;
/// Cap on the acceleration a wheel may impart on the body it stands on
const MAX_OTHER_BODY_ACC: f32 = 500.0;

/// Wheel slot on a four-wheeled car, in processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelId {
    BackRight = 0,
    FrontRight = 1,
    BackLeft = 2,
    FrontLeft = 3,
}

impl WheelId {
    /// All slots in processing order
    pub const ALL: [WheelId; 4] = [
        WheelId::BackRight,
        WheelId::FrontRight,
        WheelId::BackLeft,
        WheelId::FrontLeft,
    ];

    /// Index into the car's wheel array
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Steered and (optionally) front-driven
    pub const fn is_front(self) -> bool {
        matches!(self, WheelId::FrontRight | WheelId::FrontLeft)
    }

    /// On the handbrake axle
    pub const fn is_rear(self) -> bool {
        !self.is_front()
    }

    /// On the left side of the car
    pub const fn is_left(self) -> bool {
        matches!(self, WheelId::BackLeft | WheelId::FrontLeft)
    }
}

/// Tuning and mounting for [`Wheel::setup`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSetup {
    /// Mount position in the chassis frame
    pub pos: Vec3,
    /// Suspension axis in the chassis frame
    pub axis_up: Vec3,
    /// Spring rate (N/m)
    pub spring: f32,
    /// Suspension travel
    pub travel: f32,
    /// Moment of inertia about the axle
    pub inertia: f32,
    pub radius: f32,
    pub side_friction: f32,
    pub fwd_friction: f32,
    /// Damping rate (N per m/s of compression speed)
    pub damping: f32,
    /// Probe rays, `1..=MAX_NUM_RAYS`
    pub num_rays: usize,
}

impl WheelSetup {
    fn validate(&self) -> Result<()> {
        let positive = [
            ("travel", self.travel),
            ("inertia", self.inertia),
            ("radius", self.radius),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(VehicleError::InvalidConfig(format!(
                    "wheel {name} must be positive, got {value}"
                )));
            }
        }

        let finite = [
            ("spring", self.spring),
            ("damping", self.damping),
            ("side_friction", self.side_friction),
            ("fwd_friction", self.fwd_friction),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(VehicleError::InvalidConfig(format!(
                    "wheel {name} must be finite, got {value}"
                )));
            }
        }

        if self.num_rays == 0 || self.num_rays > MAX_NUM_RAYS {
            return Err(VehicleError::InvalidConfig(format!(
                "wheel num_rays must be in 1..={MAX_NUM_RAYS}, got {}",
                self.num_rays
            )));
        }

        if !self.pos.is_finite() || self.axis_up.normalize_safe() == Vec3::ZERO {
            return Err(VehicleError::InvalidConfig(format!(
                "wheel mount needs a finite position and non-zero axis, got {:?} / {:?}",
                self.pos, self.axis_up
            )));
        }

        Ok(())
    }
}

/// One wheel's suspension and tire state
#[derive(Debug, Clone)]
pub struct Wheel {
    owner: Option<(ChassisBody, GroundContactFilter)>,

    pos: Vec3,
    axis_up: Vec3,
    spring: f32,
    travel: f32,
    inertia: f32,
    radius: f32,
    side_friction: f32,
    fwd_friction: f32,
    damping: f32,
    num_rays: usize,

    ang_vel: f32,
    steer_angle: f32,
    torque: f32,
    drive_torque: f32,
    axis_angle: f32,
    displacement: f32,
    last_displacement: f32,
    up_speed: f32,
    locked: bool,
    last_on_floor: bool,
    ang_vel_for_grip: f32,
}

impl Default for Wheel {
    fn default() -> Self {
        Self {
            owner: None,
            pos: Vec3::ZERO,
            axis_up: Vec3::Y,
            spring: 0.0,
            travel: 0.0,
            inertia: 0.0,
            radius: 0.0,
            side_friction: 0.0,
            fwd_friction: 0.0,
            damping: 0.0,
            num_rays: 1,
            ang_vel: 0.0,
            steer_angle: 0.0,
            torque: 0.0,
            drive_torque: 0.0,
            axis_angle: 0.0,
            displacement: 0.0,
            last_displacement: 0.0,
            up_speed: 0.0,
            locked: false,
            last_on_floor: false,
            ang_vel_for_grip: 0.0,
        }
    }
}

impl Wheel {
    /// Attach to a chassis with the given tuning, then reset
    ///
    /// Probe rays ignore the chassis' own collision skin.
    pub fn setup(&mut self, chassis: ChassisBody, setup: WheelSetup) -> Result<()> {
        setup.validate()?;

        self.owner = Some((chassis, GroundContactFilter::excluding(chassis.skin())));
        self.pos = setup.pos;
        self.axis_up = setup.axis_up.normalize_safe();
        self.spring = setup.spring;
        self.travel = setup.travel;
        self.inertia = setup.inertia;
        self.radius = setup.radius;
        self.side_friction = setup.side_friction;
        self.fwd_friction = setup.fwd_friction;
        self.damping = setup.damping;
        self.num_rays = setup.num_rays;

        self.reset();
        Ok(())
    }

    /// Back to rest: no spin, no steer, uncompressed, unlocked
    pub fn reset(&mut self) {
        self.ang_vel = 0.0;
        self.steer_angle = 0.0;
        self.torque = 0.0;
        self.drive_torque = 0.0;
        self.axis_angle = 0.0;
        self.displacement = 0.0;
        self.last_displacement = 0.0;
        self.up_speed = 0.0;
        self.locked = false;
        self.last_on_floor = false;
        self.ang_vel_for_grip = 0.0;
    }

    /// Probe the ground and push suspension and tire forces into the chassis
    /// (and, reacted, into whatever movable body the wheel stands on)
    ///
    /// Returns whether any probe ray touched the ground. A wheel that was
    /// never set up is always airborne.
    pub fn add_forces_to_car<S>(&mut self, substrate: &mut S, _dt: f32) -> Result<bool>
    where
        S: PhysicsSubstrate + ?Sized,
    {
        let Some((chassis, filter)) = self.owner else {
            return Ok(false);
        };

        let state = substrate.body_state(chassis.handle())?;
        let orientation = state.pose.orientation;
        let world_pos = state.pose.transform_point(self.pos);
        let world_axis = orientation * self.axis_up;

        let wheel_fwd = Mat3::from_axis_angle_degrees(self.steer_angle, world_axis) * orientation.x_axis();
        let wheel_left = world_axis.cross(wheel_fwd).normalize_safe();
        let wheel_up = wheel_fwd.cross(wheel_left);

        let ray_len = 2.0 * self.radius + self.travel;
        let ray_end = world_pos - world_axis * self.radius;
        let wheel_ray = Segment::new(ray_end + world_axis * ray_len, world_axis * -ray_len);

        self.last_displacement = self.displacement;
        self.displacement = 0.0;
        self.last_on_floor = false;

        let num_rays = self.num_rays.clamp(1, MAX_NUM_RAYS);
        let delta_fwd = 2.0 * self.radius / (num_rays as f32 + 1.0);

        let mut segments = [wheel_ray; MAX_NUM_RAYS];
        let mut hits: [Option<SegmentHit>; MAX_NUM_RAYS] = [None; MAX_NUM_RAYS];
        let mut best: Option<SegmentHit> = None;

        for (i, (segment, hit)) in segments.iter_mut().zip(hits.iter_mut()).take(num_rays).enumerate() {
            let dist_fwd = delta_fwd * (i as f32 + 1.0) - self.radius;
            let z_offset = self.radius * (1.0 - radians(90.0 * dist_fwd / self.radius).cos());
            *segment = wheel_ray.offset(wheel_fwd * dist_fwd + wheel_up * z_offset);
            *hit = substrate.segment_intersect(segment, &filter);

            if let Some(h) = *hit {
                if best.map_or(true, |b| h.fraction < b.fraction) {
                    best = Some(h);
                }
            }
        }

        let Some(best) = best else {
            return Ok(false);
        };
        self.last_on_floor = true;

        let ground_normal = if num_rays > 1 {
            let mut sum = Vec3::ZERO;
            for (segment, hit) in segments.iter().zip(hits.iter()).take(num_rays) {
                if let Some(h) = hit {
                    if h.fraction <= 1.0 {
                        sum += (world_pos - segment.end()) * (1.0 - h.fraction);
                    }
                }
            }
            // Zero when every hit sits at the far end of its segment
            sum.normalize_safe()
        } else {
            best.normal
        };

        self.displacement = (ray_len * (1.0 - best.fraction)).clamp(0.0, self.travel);

        let spring_force = self.displacement * self.spring * ground_normal.dot(world_axis);
        let damping_force = self.up_speed * self.damping;
        let total_force = (spring_force + damping_force).max(0.0);
        let mut extra_force = world_axis * total_force;

        let ground_up = ground_normal;
        let ground_left = ground_up.cross(wheel_fwd).normalize_safe();
        let ground_fwd = ground_left.cross(ground_up);

        let centre_vel = state.point_velocity(world_pos);
        let rim_vel = wheel_left.cross(best.position - world_pos) * self.ang_vel;
        let mut point_vel = centre_vel + rim_vel;

        let other = match best.body {
            Some(body) if body != chassis.handle() => Some((body, substrate.body_state(body)?)),
            _ => None,
        };
        if let Some((_, other_state)) = &other {
            if !other_state.immovable {
                point_vel -= other_state.point_velocity(best.position);
            }
        }

        let side_vel = point_vel.dot(ground_left);
        let side_force = -friction_coefficient(self.side_friction, side_vel) * total_force;
        extra_force += ground_left * side_force;

        let fwd_vel = point_vel.dot(ground_fwd);
        let fwd_force = -friction_coefficient(self.fwd_friction, fwd_vel) * total_force;
        extra_force += ground_fwd * fwd_force;

        self.ang_vel_for_grip = centre_vel.dot(ground_fwd) / self.radius;
        self.torque += -fwd_force * self.radius;

        substrate.add_world_force(chassis.handle(), extra_force, best.position)?;

        if let Some((body, other_state)) = other {
            if !other_state.immovable {
                let max_force = MAX_OTHER_BODY_ACC * other_state.mass;
                let len_sq = extra_force.length_squared();
                if len_sq > max_force * max_force {
                    extra_force *= max_force / len_sq.sqrt();
                }
                substrate.add_world_force(body, -extra_force, best.position)?;
            }
        }

        Ok(true)
    }

    /// Advance spin after the integrator has moved the chassis
    ///
    /// Non-positive (or NaN) `dt` leaves the wheel untouched, as does a
    /// wheel that was never set up.
    pub fn update(&mut self, dt: f32) {
        if !(dt > 0.0) || self.owner.is_none() {
            return;
        }

        let orig_ang_vel = self.ang_vel;
        self.up_speed = (self.displacement - self.last_displacement) / dt.max(EPSILON);

        if self.locked {
            self.ang_vel = 0.0;
            self.torque = 0.0;
            self.drive_torque = 0.0;
            return;
        }

        self.ang_vel += self.torque * dt / self.inertia;
        self.torque = 0.0;

        // Ground reaction alone never spins the wheel past rolling without slip
        let grip = self.ang_vel_for_grip;
        if (orig_ang_vel > grip && self.ang_vel < grip) || (orig_ang_vel < grip && self.ang_vel > grip) {
            self.ang_vel = grip;
        }

        self.ang_vel += self.drive_torque * dt / self.inertia;
        self.drive_torque = 0.0;

        self.ang_vel = self.ang_vel.clamp(-MAX_ANG_VEL, MAX_ANG_VEL);
        self.axis_angle += degrees(dt * self.ang_vel);
    }

    /// Accumulate drive (or brake) torque for the next update
    pub fn add_drive_torque(&mut self, torque: f32) {
        self.drive_torque += torque;
    }

    /// Engage or release the handbrake lock
    pub fn set_lock(&mut self, lock: bool) {
        self.locked = lock;
    }

    /// Steer angle in degrees, positive turns toward the car's left
    pub fn set_steer_angle(&mut self, steer_angle: f32) {
        self.steer_angle = steer_angle;
    }

    pub fn steer_angle(&self) -> f32 {
        self.steer_angle
    }

    pub fn lock(&self) -> bool {
        self.locked
    }

    /// Whether the last probe touched the ground
    pub fn on_floor(&self) -> bool {
        self.last_on_floor
    }

    /// Current suspension compression, always in `[0, travel]`
    pub fn displacement(&self) -> f32 {
        self.displacement
    }

    /// Compression speed computed by the last update
    pub fn up_speed(&self) -> f32 {
        self.up_speed
    }

    pub fn angular_velocity(&self) -> f32 {
        self.ang_vel
    }

    /// Spin that would roll without longitudinal slip
    pub fn angular_velocity_for_grip(&self) -> f32 {
        self.ang_vel_for_grip
    }

    /// Rolled angle (degrees)
    pub fn axis_angle(&self) -> f32 {
        self.axis_angle
    }

    /// Mount position in the chassis frame
    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    pub fn axis_up(&self) -> Vec3 {
        self.axis_up
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn travel(&self) -> f32 {
        self.travel
    }

    pub fn spring(&self) -> f32 {
        self.spring
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    pub fn num_rays(&self) -> usize {
        self.num_rays
    }

    /// Chassis this wheel is mounted on
    pub fn chassis(&self) -> Option<ChassisBody> {
        self.owner.map(|(chassis, _)| chassis)
    }
}

/// Signed tire friction coefficient for a contact speed along one axis
///
/// Full `base` grip up to 0.2 m/s, blending down to 70% at 0.4 m/s and
/// beyond, signed like `velocity` and tapered to zero below 3 m/s. The force
/// along that axis is `-coefficient * load`, which always opposes `velocity`.
pub fn friction_coefficient(base: f32, velocity: f32) -> f32 {
    let speed = velocity.abs();
    let mut friction = base;

    if speed > SLIP_VELOCITY {
        friction *= SLIP_FACTOR;
    } else if speed > NO_SLIP_VELOCITY {
        friction *= 1.0 - (1.0 - SLIP_FACTOR) * (speed - NO_SLIP_VELOCITY) / (SLIP_VELOCITY - NO_SLIP_VELOCITY);
    }

    if velocity < 0.0 {
        friction = -friction;
    }

    if speed < SMALL_VELOCITY {
        friction *= speed / SMALL_VELOCITY;
    }

    friction
}
