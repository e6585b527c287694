//! Four-wheeled car: wheel layout, drivetrain and steering

use crate::chassis::{Chassis, ChassisBody, VehicleHooks};
use crate::config::CarConfig;
use crate::error::Result;
use crate::substrate::PhysicsSubstrate;
use crate::wheel::{Wheel, WheelId, WheelSetup};
use void_math::{degrees, radians, Vec3};

/// Maximum change of the smoothed accelerate value per second
const ACCELERATE_RATE: f32 = 4.0;
/// Share of the chassis mass carried by each wheel
const WHEEL_LOAD_SHARE: f32 = 0.25;
/// Wheel mass as a fraction of the chassis mass
const WHEEL_MASS_FRAC: f32 = 0.03;

/// A car: chassis plus four wheels in [`WheelId`] order
///
/// Driver inputs are plain setters sampled in [`VehicleHooks::post_physics`];
/// the smoothed accelerate and steer values follow them under a rate limit.
#[derive(Debug, Clone)]
pub struct Car {
    config: CarConfig,
    chassis: Chassis,
    wheels: [Wheel; 4],

    dest_accelerate: f32,
    dest_steering: f32,
    hbrake: f32,

    accelerate: f32,
    steering: f32,
}

impl Car {
    /// Build a car on an existing chassis body
    ///
    /// Replaces the body's skin with the chassis boxes and lays out the
    /// default wheels for the configured extents.
    pub fn new<S>(config: CarConfig, body: ChassisBody, substrate: &mut S) -> Result<Self>
    where
        S: PhysicsSubstrate + ?Sized,
    {
        config.validate()?;

        let mut car = Self {
            chassis: Chassis::new(body, config.chassis_mass),
            wheels: Default::default(),
            dest_accelerate: 0.0,
            dest_steering: 0.0,
            hbrake: 0.0,
            accelerate: 0.0,
            steering: 0.0,
            config,
        };
        car.set_chassis_dims(substrate, car.config.chassis_min, car.config.chassis_max)?;
        Ok(car)
    }

    /// Resize the chassis, then lay the wheels out again for the new extents
    pub fn set_chassis_dims<S>(&mut self, substrate: &mut S, min: Vec3, max: Vec3) -> Result<()>
    where
        S: PhysicsSubstrate + ?Sized,
    {
        self.chassis.set_dims(substrate, min, max)?;
        self.setup_default_wheels(substrate)
    }

    /// Derive suspension tuning from the chassis mass and mount the wheels at
    /// the inset corners of the chassis footprint
    ///
    /// The springs hold a quarter of the weight at `wheel_resting_frac` of
    /// travel. Calling this again re-mounts and resets every wheel.
    pub fn setup_default_wheels<S>(&mut self, substrate: &S) -> Result<()>
    where
        S: PhysicsSubstrate + ?Sized,
    {
        let cfg = &self.config;
        let body = self.chassis.body();
        let mass = substrate.body_state(body.handle())?.mass;

        let spring = WHEEL_LOAD_SHARE * mass * cfg.gravity / (cfg.wheel_resting_frac * cfg.wheel_travel);
        let wheel_mass = WHEEL_MASS_FRAC * mass;
        let inertia = 0.5 * cfg.wheel_radius * cfg.wheel_radius * wheel_mass;
        let damping = 2.0 * (spring * mass).sqrt() * 0.25 * cfg.wheel_damping_frac;

        let r = cfg.wheel_radius;
        let (mut min, mut max) = self.chassis.dims();
        max.x -= 3.0 * r;
        min.x += 3.1 * r;
        min.z += 0.35 * r;
        max.z -= 0.35 * r;
        min.y += cfg.wheel_z_offset;

        for id in WheelId::ALL {
            let pos = Vec3::new(
                if id.is_front() { max.x } else { min.x },
                min.y,
                if id.is_left() { min.z } else { max.z },
            );
            self.wheels[id.index()].setup(
                body,
                WheelSetup {
                    pos,
                    axis_up: Vec3::Y,
                    spring,
                    travel: cfg.wheel_travel,
                    inertia,
                    radius: r,
                    side_friction: cfg.wheel_side_friction,
                    fwd_friction: cfg.wheel_fwd_friction,
                    damping,
                    num_rays: cfg.wheel_num_rays,
                },
            )?;
        }

        log::debug!(
            "Default wheels for {:?}: spring {:.1}, damping {:.1}, inertia {:.3}",
            body.handle(),
            spring,
            damping,
            inertia
        );
        Ok(())
    }

    /// Update the steer angles of the front wheels from the smoothed steer value
    ///
    /// The inner wheel gets the full angle. The outer one uses an Ackermann
    /// approximation that mixes radians into the length terms, which keeps it
    /// small but with the same sign.
    fn apply_steering(&mut self) {
        let (inner, outer) = if self.steering > 0.0 {
            (WheelId::FrontLeft, WheelId::FrontRight)
        } else {
            (WheelId::FrontRight, WheelId::FrontLeft)
        };

        let alpha = (self.config.max_steer_angle * self.steering).abs();
        let sign = if self.steering > 0.0 { 1.0 } else { -1.0 };
        self.wheels[inner.index()].set_steer_angle(sign * alpha);

        let beta = if alpha == 0.0 {
            0.0
        } else {
            let dx = self.wheel(WheelId::FrontRight).pos().x - self.wheel(WheelId::BackRight).pos().x;
            let dz = self.wheel(WheelId::FrontRight).pos().z - self.wheel(WheelId::FrontLeft).pos().z;
            degrees(radians(dz).atan2(radians(dx) + dz / radians(alpha).tan()))
        };
        self.wheels[outer.index()].set_steer_angle(sign * beta);
    }

    /// Requested throttle in `[-1, 1]` (negative reverses)
    pub fn set_accelerate(&mut self, accelerate: f32) {
        self.dest_accelerate = accelerate;
    }

    /// Requested steer in `[-1, 1]` (positive turns left)
    pub fn set_steer(&mut self, steer: f32) {
        self.dest_steering = steer;
    }

    /// Handbrake in `[0, 1]`; locks the rear wheels above one half
    pub fn set_hbrake(&mut self, hbrake: f32) {
        self.hbrake = hbrake;
    }

    pub fn accelerate(&self) -> f32 {
        self.dest_accelerate
    }

    pub fn steer(&self) -> f32 {
        self.dest_steering
    }

    pub fn hbrake(&self) -> f32 {
        self.hbrake
    }

    /// Rate-limited throttle actually applied
    pub fn smoothed_accelerate(&self) -> f32 {
        self.accelerate
    }

    /// Rate-limited steer actually applied
    pub fn smoothed_steer(&self) -> f32 {
        self.steering
    }

    pub fn num_wheels_on_floor(&self) -> usize {
        self.wheels.iter().filter(|w| w.on_floor()).count()
    }

    pub fn wheels(&self) -> &[Wheel; 4] {
        &self.wheels
    }

    pub fn wheel(&self, id: WheelId) -> &Wheel {
        &self.wheels[id.index()]
    }

    pub fn chassis(&self) -> &Chassis {
        &self.chassis
    }

    pub fn config(&self) -> &CarConfig {
        &self.config
    }

    /// Reset every wheel and zero all driver input
    pub fn reset(&mut self) {
        for wheel in &mut self.wheels {
            wheel.reset();
        }
        self.dest_accelerate = 0.0;
        self.dest_steering = 0.0;
        self.hbrake = 0.0;
        self.accelerate = 0.0;
        self.steering = 0.0;
    }
}

impl VehicleHooks for Car {
    fn add_external_forces(&mut self, substrate: &mut dyn PhysicsSubstrate, dt: f32) -> Result<()> {
        for wheel in &mut self.wheels {
            wheel.add_forces_to_car(substrate, dt)?;
        }
        Ok(())
    }

    fn post_physics(&mut self, _substrate: &mut dyn PhysicsSubstrate, dt: f32) -> Result<()> {
        for wheel in &mut self.wheels {
            wheel.update(dt);
        }

        self.accelerate = approach(self.accelerate, self.dest_accelerate, dt * ACCELERATE_RATE);
        self.steering = approach(self.steering, self.dest_steering, dt * self.config.steer_rate);

        let mut max_torque = self.config.drive_torque;
        if self.config.front_drive && self.config.rear_drive {
            max_torque *= 0.5;
        }
        let torque = max_torque * self.accelerate;

        for id in WheelId::ALL {
            let driven = if id.is_front() {
                self.config.front_drive
            } else {
                self.config.rear_drive
            };
            let wheel = &mut self.wheels[id.index()];
            if driven {
                wheel.add_drive_torque(torque);
            }
            if id.is_rear() {
                wheel.set_lock(self.hbrake > 0.5);
            }
        }

        self.apply_steering();
        Ok(())
    }
}

/// Move `current` toward `target` by at most `max_delta` (never past it)
fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    let max_delta = max_delta.max(0.0);
    current + (target - current).clamp(-max_delta, max_delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VehicleError;
    use crate::testing::FlatGround;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const DT: f32 = 1.0 / 60.0;

    /// Car on flat ground at 0 with default tuning. The wheel mounts sit at
    /// `0.35` in the chassis frame, so at `y = -0.04` the springs are at their
    /// resting compression.
    fn car_on_ground(config: CarConfig, y: f32) -> (FlatGround, Car) {
        let mut ground = FlatGround::new(0.0);
        let (handle, skin) = ground.add_body(Vec3::new(0.0, y, 0.0), 1.0);
        let car = Car::new(config, ChassisBody::new(handle, skin), &mut ground).unwrap();
        (ground, car)
    }

    fn step(ground: &mut FlatGround, car: &mut Car) {
        let body = car.chassis().body();
        body.add_external_forces(ground, Some(&mut *car), DT).unwrap();
        body.post_physics(ground, Some(&mut *car), DT).unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut ground = FlatGround::new(0.0);
        let (handle, skin) = ground.add_body(Vec3::ZERO, 1.0);
        let config = CarConfig::default().with_wheel(0.0, 0.2);
        let result = Car::new(config, ChassisBody::new(handle, skin), &mut ground);
        assert!(matches!(result, Err(VehicleError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_wheel_layout() {
        let (ground, car) = car_on_ground(CarConfig::default(), 0.0);
        let skin = car.chassis().body().skin();
        assert_eq!(ground.skin_parts(skin).map(<[_]>::len), Some(2));

        let r = 0.4;
        let br = car.wheel(WheelId::BackRight).pos();
        let fr = car.wheel(WheelId::FrontRight).pos();
        let bl = car.wheel(WheelId::BackLeft).pos();
        let fl = car.wheel(WheelId::FrontLeft).pos();

        assert_relative_eq!(fr.x, 2.0 - 3.0 * r);
        assert_relative_eq!(br.x, -2.0 + 3.1 * r);
        assert_relative_eq!(fr.z, 1.0 - 0.35 * r);
        assert_relative_eq!(fl.z, -1.0 + 0.35 * r);
        assert_eq!((bl.x, bl.z), (br.x, fl.z));
        for pos in [br, fr, bl, fl] {
            assert_relative_eq!(pos.y, 0.35);
        }
    }

    #[test]
    fn test_default_wheel_tuning() {
        let (_, car) = car_on_ground(CarConfig::default(), 0.0);
        let wheel = car.wheel(WheelId::FrontLeft);

        let spring = 0.25 * 100.0 * 9.81 / (0.45 * 0.2);
        assert_relative_eq!(wheel.spring(), spring, max_relative = 1e-5);
        assert_relative_eq!(wheel.inertia(), 0.5 * 0.16 * 3.0, max_relative = 1e-5);
        assert_relative_eq!(
            wheel.damping(),
            2.0 * (spring * 100.0).sqrt() * 0.25 * 0.3,
            max_relative = 1e-5
        );
    }

    #[test]
    fn test_resize_keeps_wheels_in_sync() {
        let (mut ground, mut car) = car_on_ground(CarConfig::default(), 0.0);
        let (min, max) = (Vec3::new(-3.0, 0.3, -1.5), Vec3::new(3.0, 1.6, 1.5));
        car.set_chassis_dims(&mut ground, min, max).unwrap();

        assert_eq!(car.chassis().dims(), (min, max));
        assert_relative_eq!(car.wheel(WheelId::FrontRight).pos().x, 3.0 - 1.2);
        assert_relative_eq!(car.wheel(WheelId::BackLeft).pos().z, -1.5 + 0.14);

        // Idempotent
        let before = car.wheel(WheelId::FrontLeft).pos();
        car.setup_default_wheels(&ground).unwrap();
        assert_eq!(car.wheel(WheelId::FrontLeft).pos(), before);
    }

    #[test]
    fn test_resting_car_holds_its_weight() {
        let (mut ground, mut car) = car_on_ground(CarConfig::default(), -0.04);
        ground.gravity = Vec3::new(0.0, -9.81, 0.0);
        step(&mut ground, &mut car);

        assert_eq!(car.num_wheels_on_floor(), 4);
        for wheel in car.wheels() {
            assert_abs_diff_eq!(wheel.displacement(), 0.09, epsilon = 1e-4);
        }
        let net = ground.net_force(car.chassis().body().handle());
        assert_abs_diff_eq!(net.y, 0.0, epsilon = 0.5);
    }

    #[test]
    fn test_airborne_car_only_feels_gravity() {
        let (mut ground, mut car) = car_on_ground(CarConfig::default(), 10.0);
        step(&mut ground, &mut car);

        assert_eq!(car.num_wheels_on_floor(), 0);
        let handle = car.chassis().body().handle();
        assert_eq!(ground.body(handle).forces.len(), 1);
        assert_relative_eq!(ground.net_force(handle).y, -1000.0);
    }

    #[test]
    fn test_accelerate_rate_limited() {
        let (mut ground, mut car) = car_on_ground(CarConfig::default(), 0.0);
        car.set_accelerate(1.0);
        step(&mut ground, &mut car);
        assert_relative_eq!(car.smoothed_accelerate(), 4.0 * DT);

        for _ in 0..60 {
            step(&mut ground, &mut car);
            assert!(car.smoothed_accelerate() <= 1.0);
        }
        assert_eq!(car.smoothed_accelerate(), 1.0);

        car.set_accelerate(0.9);
        step(&mut ground, &mut car);
        assert_relative_eq!(car.smoothed_accelerate(), 1.0 - 4.0 * DT);
        step(&mut ground, &mut car);
        assert_relative_eq!(car.smoothed_accelerate(), 0.9);
    }

    #[test]
    fn test_zero_steer_centres_both_wheels() {
        let (mut ground, mut car) = car_on_ground(CarConfig::default(), 0.0);
        step(&mut ground, &mut car);
        assert_eq!(car.wheel(WheelId::FrontLeft).steer_angle(), 0.0);
        assert_eq!(car.wheel(WheelId::FrontRight).steer_angle(), 0.0);
    }

    #[test]
    fn test_steer_geometry() {
        for s in [1.0f32, 0.5, -0.5, -1.0] {
            let (mut ground, mut car) = car_on_ground(CarConfig::default(), 0.0);
            car.set_steer(s);
            for _ in 0..30 {
                step(&mut ground, &mut car);
            }
            assert_eq!(car.smoothed_steer(), s);

            let (inner, outer) = if s > 0.0 {
                (WheelId::FrontLeft, WheelId::FrontRight)
            } else {
                (WheelId::FrontRight, WheelId::FrontLeft)
            };
            let inner = car.wheel(inner).steer_angle();
            let outer = car.wheel(outer).steer_angle();

            assert_relative_eq!(inner, 30.0 * s);
            assert!(inner * outer > 0.0, "same sign: {inner} vs {outer}");
            assert!(outer.abs() < inner.abs());
        }
    }

    #[test]
    fn test_outer_steer_angle_mixes_units() {
        // Wheelbase 1.56 and track 1.72 enter the atan2 partly as radians,
        // which yields about half a degree instead of a true Ackermann angle
        let (mut ground, mut car) = car_on_ground(CarConfig::default(), 0.0);
        car.set_steer(1.0);
        for _ in 0..30 {
            step(&mut ground, &mut car);
        }

        let dx = car.wheel(WheelId::FrontRight).pos().x - car.wheel(WheelId::BackRight).pos().x;
        let dz = car.wheel(WheelId::FrontRight).pos().z - car.wheel(WheelId::FrontLeft).pos().z;
        assert_relative_eq!(dx, 1.56, epsilon = 1e-5);
        assert_relative_eq!(dz, 1.72, epsilon = 1e-5);

        assert_abs_diff_eq!(car.wheel(WheelId::FrontLeft).steer_angle(), 30.0, epsilon = 1e-4);
        assert_abs_diff_eq!(car.wheel(WheelId::FrontRight).steer_angle(), 0.5721, epsilon = 1e-3);
    }

    #[test]
    fn test_drive_split_between_axles() {
        let (mut ground, mut car) = car_on_ground(CarConfig::default().with_drive(true, false), 10.0);
        car.set_accelerate(1.0);
        step(&mut ground, &mut car);
        step(&mut ground, &mut car);

        assert!(car.wheel(WheelId::FrontLeft).angular_velocity() > 0.0);
        assert!(car.wheel(WheelId::FrontRight).angular_velocity() > 0.0);
        assert_eq!(car.wheel(WheelId::BackLeft).angular_velocity(), 0.0);
        assert_eq!(car.wheel(WheelId::BackRight).angular_velocity(), 0.0);
    }

    #[test]
    fn test_handbrake_locks_rear() {
        let (mut ground, mut car) = car_on_ground(CarConfig::default(), 10.0);
        car.set_accelerate(1.0);
        for _ in 0..5 {
            step(&mut ground, &mut car);
        }
        assert!(car.wheel(WheelId::BackLeft).angular_velocity() > 0.0);

        car.set_hbrake(1.0);
        step(&mut ground, &mut car);
        assert!(car.wheel(WheelId::BackLeft).lock());
        assert!(car.wheel(WheelId::BackRight).lock());
        assert!(!car.wheel(WheelId::FrontLeft).lock());

        step(&mut ground, &mut car);
        assert_eq!(car.wheel(WheelId::BackLeft).angular_velocity(), 0.0);
        assert_eq!(car.wheel(WheelId::BackRight).angular_velocity(), 0.0);
        assert!(car.wheel(WheelId::FrontLeft).angular_velocity() > 0.0);
    }

    #[test]
    fn test_reset_clears_inputs() {
        let (mut ground, mut car) = car_on_ground(CarConfig::default(), 0.0);
        car.set_accelerate(1.0);
        car.set_steer(-1.0);
        car.set_hbrake(1.0);
        step(&mut ground, &mut car);

        car.reset();
        assert_eq!(car.smoothed_accelerate(), 0.0);
        assert_eq!(car.steer(), 0.0);
        assert_eq!(car.hbrake(), 0.0);
        assert!(car.wheels().iter().all(|w| !w.lock() && w.angular_velocity() == 0.0));
    }

    #[test]
    fn test_approach_never_overshoots() {
        assert_eq!(approach(0.0, 1.0, 0.25), 0.25);
        assert_eq!(approach(0.9, 1.0, 0.25), 1.0);
        assert_eq!(approach(0.0, -1.0, 0.25), -0.25);
        assert_eq!(approach(0.3, 1.0, -1.0), 0.3);
    }
}
