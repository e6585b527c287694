//! Vehicle world - Rapier 3D as the rigid-body and collision substrate

use crate::body::{isometry_to_pose, pose_to_isometry, BodyDesc, BodyHandle, BodyState};
use crate::car::Car;
use crate::chassis::ChassisBody;
use crate::config::{CarConfig, WorldConfig};
use crate::error::{Result, VehicleError};
use crate::filter::GroundContactFilter;
use crate::material::SkinMaterial;
use crate::query::{Segment, SegmentHit};
use crate::skin::{Primitive, SkinId};
use crate::substrate::{mass_by_volume, PhysicsSubstrate};
use rapier3d::prelude as rapier;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use void_math::{Pose, PoseRate, Vec3};

/// Handle to a car owned by a [`VehicleWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CarId(usize);

/// Colliders making up one collision skin
#[derive(Debug)]
struct SkinEntry {
    body: Option<rapier::RigidBodyHandle>,
    colliders: Vec<rapier::ColliderHandle>,
}

#[inline]
fn to_vector(v: Vec3) -> rapier::Vector<f32> {
    rapier::Vector::new(v.x, v.y, v.z)
}

#[inline]
fn to_point(v: Vec3) -> rapier::Point<f32> {
    rapier::Point::new(v.x, v.y, v.z)
}

#[inline]
fn from_vector(v: &rapier::Vector<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Rapier pipeline and sets, seen by the vehicle through [`PhysicsSubstrate`]
pub struct RapierSubstrate {
    /// Gravity
    gravity: rapier::Vector<f32>,

    /// Integration parameters
    integration_params: rapier::IntegrationParameters,

    /// Rapier physics pipeline
    pipeline: rapier::PhysicsPipeline,

    /// Island manager
    islands: rapier::IslandManager,

    /// Broad phase
    broad_phase: rapier::DefaultBroadPhase,

    /// Narrow phase
    narrow_phase: rapier::NarrowPhase,

    /// Impulse joint set
    impulse_joints: rapier::ImpulseJointSet,

    /// Multibody joint set
    multibody_joints: rapier::MultibodyJointSet,

    /// CCD solver
    ccd_solver: rapier::CCDSolver,

    /// Query pipeline
    query_pipeline: rapier::QueryPipeline,

    /// Rigid body set
    bodies: rapier::RigidBodySet,

    /// Collider set
    colliders: rapier::ColliderSet,

    /// Collision skins by id
    skins: HashMap<SkinId, SkinEntry>,

    /// Next skin id to hand out
    next_skin: u64,
}

impl RapierSubstrate {
    fn new(config: &WorldConfig) -> Self {
        let mut integration_params = rapier::IntegrationParameters::default();
        integration_params.dt = config.timestep;
        integration_params.num_solver_iterations =
            NonZeroUsize::new(config.velocity_iterations).unwrap_or(NonZeroUsize::MIN);

        Self {
            gravity: rapier::Vector::new(config.gravity[0], config.gravity[1], config.gravity[2]),
            integration_params,
            pipeline: rapier::PhysicsPipeline::new(),
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            query_pipeline: rapier::QueryPipeline::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            skins: HashMap::new(),
            next_skin: 1,
        }
    }

    fn create_skin(&mut self, body: Option<rapier::RigidBodyHandle>) -> SkinId {
        let id = SkinId(self.next_skin);
        self.next_skin += 1;
        self.skins.insert(
            id,
            SkinEntry {
                body,
                colliders: Vec::new(),
            },
        );
        id
    }

    fn remove_skin(&mut self, skin: SkinId) {
        if let Some(entry) = self.skins.remove(&skin) {
            for handle in entry.colliders {
                self.colliders.remove(handle, &mut self.islands, &mut self.bodies, true);
            }
            if let Some(body) = entry.body {
                self.bodies.remove(
                    body,
                    &mut self.islands,
                    &mut self.colliders,
                    &mut self.impulse_joints,
                    &mut self.multibody_joints,
                    true, // Remove attached colliders
                );
            }
        }
    }

    fn body(&self, handle: BodyHandle) -> Result<&rapier::RigidBody> {
        self.bodies
            .get(handle.to_rapier())
            .ok_or(VehicleError::BodyNotFound(handle))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut rapier::RigidBody> {
        self.bodies
            .get_mut(handle.to_rapier())
            .ok_or(VehicleError::BodyNotFound(handle))
    }

    /// Drop user forces on every body
    fn reset_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }
    }

    /// One Rapier integration step, then refresh the query pipeline
    fn integrate(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        self.query_pipeline.update(&self.colliders);
    }
}

impl PhysicsSubstrate for RapierSubstrate {
    fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    fn body_state(&self, handle: BodyHandle) -> Result<BodyState> {
        let body = self.body(handle)?;
        let com = body.center_of_mass();
        Ok(BodyState {
            pose: isometry_to_pose(body.position()),
            rate: PoseRate::new(from_vector(body.linvel()), from_vector(body.angvel())),
            center_of_mass: Vec3::new(com.x, com.y, com.z),
            mass: body.mass(),
            immovable: !body.is_dynamic(),
        })
    }

    fn clear_forces(&mut self, handle: BodyHandle) -> Result<()> {
        let body = self.body_mut(handle)?;
        body.reset_forces(false);
        body.reset_torques(false);
        Ok(())
    }

    fn add_world_force(&mut self, handle: BodyHandle, force: Vec3, point: Vec3) -> Result<()> {
        self.body_mut(handle)?
            .add_force_at_point(to_vector(force), to_point(point), true);
        Ok(())
    }

    fn segment_intersect(&self, segment: &Segment, filter: &GroundContactFilter) -> Option<SegmentHit> {
        let ray = rapier::Ray::new(to_point(segment.origin), to_vector(segment.delta));

        let predicate = |_: rapier::ColliderHandle, collider: &rapier::Collider| {
            let immovable = collider
                .parent()
                .and_then(|parent| self.bodies.get(parent))
                .map_or(true, |body| !body.is_dynamic());
            filter.consider(SkinId::from_user_data(collider.user_data), immovable)
        };
        let query_filter = rapier::QueryFilter::default()
            .exclude_sensors()
            .predicate(&predicate);

        let (handle, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            1.0,
            true,
            query_filter,
        )?;
        let collider = self.colliders.get(handle)?;

        // Segments starting inside a solid report no normal
        let mut normal = from_vector(&hit.normal);
        if normal == Vec3::ZERO {
            normal = (-segment.delta).normalize_safe();
        }

        Some(SegmentHit {
            fraction: hit.time_of_impact,
            position: segment.point_at(hit.time_of_impact),
            normal,
            skin: SkinId::from_user_data(collider.user_data),
            body: collider.parent().map(BodyHandle::from_rapier),
        })
    }

    fn replace_primitives(
        &mut self,
        skin: SkinId,
        parts: &[(Primitive, SkinMaterial)],
        mass: Option<f32>,
    ) -> Result<()> {
        let entry = self.skins.get_mut(&skin).ok_or(VehicleError::SkinNotFound(skin))?;

        // Build everything first so a bad primitive leaves the old skin intact
        let masses = mass.map(|m| mass_by_volume(parts, m));
        let builders = parts
            .iter()
            .enumerate()
            .map(|(i, (prim, material))| {
                prim.to_rapier_builder(material, skin, masses.as_ref().map(|m| m[i]))
            })
            .collect::<Result<Vec<_>>>()?;

        for handle in entry.colliders.drain(..) {
            self.colliders.remove(handle, &mut self.islands, &mut self.bodies, false);
        }

        for builder in builders {
            let handle = match entry.body {
                Some(body) => self.colliders.insert_with_parent(builder, body, &mut self.bodies),
                None => self.colliders.insert(builder),
            };
            entry.colliders.push(handle);
        }

        if let Some(body) = entry.body.and_then(|b| self.bodies.get_mut(b)) {
            body.recompute_mass_properties_from_colliders(&self.colliders);
        }

        self.query_pipeline.update(&self.colliders);
        Ok(())
    }
}

/// Rapier world driving any number of cars at a fixed timestep
pub struct VehicleWorld {
    /// Configuration
    config: WorldConfig,

    /// Bodies, colliders and pipeline
    substrate: RapierSubstrate,

    /// Cars by [`CarId`], `None` once removed
    cars: Vec<Option<Car>>,

    /// Accumulated time for fixed timestep
    accumulated_time: f32,
}

impl VehicleWorld {
    /// Create a new vehicle world
    pub fn new(config: WorldConfig) -> Self {
        log::info!(
            "Vehicle world created: gravity {:?}, timestep {}",
            config.gravity,
            config.timestep
        );

        Self {
            substrate: RapierSubstrate::new(&config),
            config,
            cars: Vec::new(),
            accumulated_time: 0.0,
        }
    }

    /// Get the world configuration
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Get gravity
    pub fn gravity(&self) -> Vec3 {
        self.substrate.gravity()
    }

    /// Set gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.substrate.gravity = to_vector(gravity);
        self.config.gravity = gravity.to_array();
    }

    // ==================== Skins and Bodies ====================

    /// Add an immovable skin with no body
    pub fn add_static_skin(&mut self, parts: &[(Primitive, SkinMaterial)]) -> Result<SkinId> {
        let skin = self.substrate.create_skin(None);
        if let Err(err) = self.substrate.replace_primitives(skin, parts, None) {
            self.substrate.remove_skin(skin);
            return Err(err);
        }
        Ok(skin)
    }

    /// Add a static ground box spanning `min..max`
    pub fn add_ground_box(&mut self, min: Vec3, max: Vec3, material: SkinMaterial) -> Result<SkinId> {
        self.add_static_skin(&[(Primitive::aabb(min, max), material)])
    }

    /// Add a rigid body with its own skin
    ///
    /// `mass`, when given, is split over the primitives by volume; otherwise
    /// Rapier's default density applies.
    pub fn add_body(
        &mut self,
        desc: BodyDesc,
        parts: &[(Primitive, SkinMaterial)],
        mass: Option<f32>,
    ) -> Result<(BodyHandle, SkinId)> {
        let handle = self.substrate.bodies.insert(desc.to_rapier_builder());
        let skin = self.substrate.create_skin(Some(handle));
        if let Err(err) = self.substrate.replace_primitives(skin, parts, mass) {
            self.substrate.remove_skin(skin);
            return Err(err);
        }
        Ok((BodyHandle::from_rapier(handle), skin))
    }

    /// Remove a body (or static skin) and all its colliders
    pub fn remove_skin(&mut self, skin: SkinId) {
        self.substrate.remove_skin(skin);
    }

    /// Current state of a body
    pub fn body_state(&self, handle: BodyHandle) -> Result<BodyState> {
        self.substrate.body_state(handle)
    }

    /// Teleport a body
    pub fn set_body_pose(&mut self, handle: BodyHandle, pose: Pose) -> Result<()> {
        self.substrate
            .body_mut(handle)?
            .set_position(pose_to_isometry(&pose), true);
        Ok(())
    }

    /// Set a body's linear and angular velocity
    pub fn set_body_rate(&mut self, handle: BodyHandle, rate: PoseRate) -> Result<()> {
        let body = self.substrate.body_mut(handle)?;
        body.set_linvel(to_vector(rate.linear), true);
        body.set_angvel(to_vector(rate.angular), true);
        Ok(())
    }

    // ==================== Cars ====================

    /// Create a chassis body at `pose` and build a car on it
    ///
    /// The chassis is excluded from Rapier's gravity; the chassis hook adds
    /// gravity itself each step.
    pub fn add_car(&mut self, config: CarConfig, pose: Pose) -> Result<CarId> {
        let desc = BodyDesc::dynamic()
            .with_pose(pose)
            .with_gravity_scale(0.0)
            .with_can_sleep(false);
        let handle = self.substrate.bodies.insert(desc.to_rapier_builder());
        let skin = self.substrate.create_skin(Some(handle));
        let body = ChassisBody::new(BodyHandle::from_rapier(handle), skin);

        let car = match Car::new(config, body, &mut self.substrate) {
            Ok(car) => car,
            Err(err) => {
                self.substrate.remove_skin(skin);
                return Err(err);
            }
        };

        let id = CarId(self.cars.len());
        self.cars.push(Some(car));
        log::debug!("Car {:?} added on body {:?}", id, body.handle());
        Ok(id)
    }

    /// Remove a car and its chassis body
    pub fn remove_car(&mut self, id: CarId) -> Option<Car> {
        let car = self.cars.get_mut(id.0)?.take()?;
        self.substrate.remove_skin(car.chassis().body().skin());
        log::debug!("Car {:?} removed", id);
        Some(car)
    }

    pub fn car(&self, id: CarId) -> Option<&Car> {
        self.cars.get(id.0)?.as_ref()
    }

    /// Mutable access for driver input
    pub fn car_mut(&mut self, id: CarId) -> Option<&mut Car> {
        self.cars.get_mut(id.0)?.as_mut()
    }

    /// Resize a car's chassis and re-lay its wheels
    pub fn set_chassis_dims(&mut self, id: CarId, min: Vec3, max: Vec3) -> Result<()> {
        let car = self
            .cars
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(VehicleError::CarNotFound(id))?;
        car.set_chassis_dims(&mut self.substrate, min, max)
    }

    /// Iterate over live cars
    pub fn cars(&self) -> impl Iterator<Item = (CarId, &Car)> {
        self.cars
            .iter()
            .enumerate()
            .filter_map(|(i, car)| car.as_ref().map(|car| (CarId(i), car)))
    }

    // ==================== Queries ====================

    /// Closest hit along `segment` among the skins `filter` considers
    pub fn segment_intersect(&self, segment: &Segment, filter: &GroundContactFilter) -> Option<SegmentHit> {
        self.substrate.segment_intersect(segment, filter)
    }

    // ==================== Simulation ====================

    /// Step the simulation with fixed timestep
    pub fn step(&mut self, delta_time: f32) -> Result<()> {
        if !(delta_time > 0.0) {
            return Ok(());
        }
        self.accumulated_time += delta_time;

        let mut steps = 0;
        while self.accumulated_time >= self.config.timestep && steps < self.config.max_substeps {
            self.step_fixed()?;
            self.accumulated_time -= self.config.timestep;
            steps += 1;
        }

        // Drop time we could not catch up on
        if steps == self.config.max_substeps {
            self.accumulated_time = self.accumulated_time.min(self.config.timestep);
        }

        Ok(())
    }

    /// Run exactly one fixed step: force hooks, integration, post hooks
    pub fn step_fixed(&mut self) -> Result<()> {
        let dt = self.config.timestep;
        self.substrate.reset_forces();

        for car in self.cars.iter_mut().flatten() {
            let body = car.chassis().body();
            body.add_external_forces(&mut self.substrate, Some(car), dt)?;
        }

        self.substrate.integrate();

        for car in self.cars.iter_mut().flatten() {
            let body = car.chassis().body();
            body.post_physics(&mut self.substrate, Some(car), dt)?;
        }

        Ok(())
    }

    // ==================== Debug ====================

    /// Get number of rigid bodies
    pub fn body_count(&self) -> usize {
        self.substrate.bodies.len()
    }

    /// Get number of colliders
    pub fn collider_count(&self) -> usize {
        self.substrate.colliders.len()
    }

    /// Get number of live cars
    pub fn car_count(&self) -> usize {
        self.cars.iter().flatten().count()
    }
}

impl Default for VehicleWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}
