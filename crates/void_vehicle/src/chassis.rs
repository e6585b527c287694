//! Chassis collision shape and the rigid-body bridge

use crate::body::BodyHandle;
use crate::config::validate_dims;
use crate::error::Result;
use crate::material::SkinMaterial;
use crate::skin::{Primitive, SkinId};
use crate::substrate::PhysicsSubstrate;
use void_math::Vec3;

/// Callbacks the integrator drives through a [`ChassisBody`] every step
pub trait VehicleHooks {
    /// Before integration: push wheel forces into the substrate
    fn add_external_forces(&mut self, substrate: &mut dyn PhysicsSubstrate, dt: f32) -> Result<()>;

    /// After integration: advance wheel spin and driver input
    fn post_physics(&mut self, substrate: &mut dyn PhysicsSubstrate, dt: f32) -> Result<()>;
}

/// Rigid-body identity of a car: its body and its collision skin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChassisBody {
    handle: BodyHandle,
    skin: SkinId,
}

impl ChassisBody {
    pub const fn new(handle: BodyHandle, skin: SkinId) -> Self {
        Self { handle, skin }
    }

    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    pub fn skin(&self) -> SkinId {
        self.skin
    }

    /// Reset accumulated forces, apply gravity at the centre of mass, then
    /// let the car (if any) add its wheel forces
    pub fn add_external_forces(
        &self,
        substrate: &mut dyn PhysicsSubstrate,
        car: Option<&mut dyn VehicleHooks>,
        dt: f32,
    ) -> Result<()> {
        substrate.clear_forces(self.handle)?;

        let state = substrate.body_state(self.handle)?;
        if !state.immovable {
            let weight = substrate.gravity() * state.mass;
            substrate.add_world_force(self.handle, weight, state.center_of_mass)?;
        }

        match car {
            Some(car) => car.add_external_forces(substrate, dt),
            None => Ok(()),
        }
    }

    /// Forward the post-integration hook to the car, if any
    pub fn post_physics(
        &self,
        substrate: &mut dyn PhysicsSubstrate,
        car: Option<&mut dyn VehicleHooks>,
        dt: f32,
    ) -> Result<()> {
        match car {
            Some(car) => car.post_physics(substrate, dt),
            None => Ok(()),
        }
    }
}

/// Owns the chassis skin layout: a floor box and a narrower cabin box
#[derive(Debug, Clone)]
pub struct Chassis {
    body: ChassisBody,
    mass: f32,
    dims_min: Vec3,
    dims_max: Vec3,
}

impl Chassis {
    pub(crate) fn new(body: ChassisBody, mass: f32) -> Self {
        Self {
            body,
            mass,
            dims_min: Vec3::ZERO,
            dims_max: Vec3::ZERO,
        }
    }

    /// Replace both chassis boxes in one substrate call
    ///
    /// Only the shapes change here; the owning car lays out its wheels
    /// again afterwards (see `Car::set_chassis_dims`).
    pub(crate) fn set_dims<S>(&mut self, substrate: &mut S, min: Vec3, max: Vec3) -> Result<()>
    where
        S: PhysicsSubstrate + ?Sized,
    {
        validate_dims(min, max)?;

        let parts = chassis_boxes(min, max).map(|prim| (prim, SkinMaterial::CHASSIS));
        substrate.replace_primitives(self.body.skin, &parts, Some(self.mass))?;

        self.dims_min = min;
        self.dims_max = max;
        log::debug!("Chassis {:?} resized to {:?}..{:?}", self.body.skin, min, max);
        Ok(())
    }

    /// Last-set extents
    pub fn dims(&self) -> (Vec3, Vec3) {
        (self.dims_min, self.dims_max)
    }

    pub fn body(&self) -> ChassisBody {
        self.body
    }

    /// Mass distributed over the two boxes
    pub fn mass(&self) -> f32 {
        self.mass
    }
}

/// Floor and cabin boxes for the extents `min..max`
///
/// The floor covers the whole footprint up to 60% of the height. The cabin
/// starts at 40% of the height and reaches the top, so the two overlap. Its
/// length loses 5% at the back and 30% at the front, and its width is 90% of
/// the chassis about the centre line.
pub fn chassis_boxes(min: Vec3, max: Vec3) -> [Primitive; 2] {
    let length = max.x - min.x;
    let height = max.y - min.y;
    let centre_z = 0.5 * (min.z + max.z);
    let half_width = 0.5 * (max.z - min.z);

    let floor = Primitive::aabb(min, Vec3::new(max.x, max.y - 0.4 * height, max.z));
    let cabin = Primitive::aabb(
        Vec3::new(min.x + 0.05 * length, min.y + 0.4 * height, centre_z - 0.9 * half_width),
        Vec3::new(max.x - 0.3 * length, max.y, centre_z + 0.9 * half_width),
    );

    [floor, cabin]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VehicleError;
    use crate::testing::FlatGround;
    use approx::assert_relative_eq;

    struct CountingHooks {
        forces: usize,
        posts: usize,
    }

    impl VehicleHooks for CountingHooks {
        fn add_external_forces(&mut self, _: &mut dyn PhysicsSubstrate, _: f32) -> Result<()> {
            self.forces += 1;
            Ok(())
        }

        fn post_physics(&mut self, _: &mut dyn PhysicsSubstrate, _: f32) -> Result<()> {
            self.posts += 1;
            Ok(())
        }
    }

    #[test]
    fn test_boxes_overlap_and_inset() {
        let [floor, cabin] = chassis_boxes(Vec3::new(-2.0, 0.0, -1.0), Vec3::new(2.0, 1.0, 1.0));

        let Primitive::Box { min, extents } = floor else { panic!("floor is a box") };
        assert_eq!(min, Vec3::new(-2.0, 0.0, -1.0));
        assert_relative_eq!(extents.x, 4.0);
        assert_relative_eq!(extents.y, 0.6);
        assert_relative_eq!(extents.z, 2.0);

        let Primitive::Box { min, extents } = cabin else { panic!("cabin is a box") };
        assert_relative_eq!(min.x, -1.8);
        assert_relative_eq!(min.y, 0.4);
        assert_relative_eq!(min.z, -0.9);
        assert_relative_eq!(min.x + extents.x, 0.8);
        assert_relative_eq!(min.y + extents.y, 1.0);
        assert_relative_eq!(extents.z, 1.8);
    }

    #[test]
    fn test_set_dims_replaces_skin() {
        let mut ground = FlatGround::new(0.0);
        let (handle, skin) = ground.add_body(Vec3::ZERO, 1.0);
        let mut chassis = Chassis::new(ChassisBody::new(handle, skin), 80.0);

        let (min, max) = (Vec3::new(-1.0, 0.2, -0.5), Vec3::new(1.0, 1.0, 0.5));
        chassis.set_dims(&mut ground, min, max).unwrap();

        assert_eq!(chassis.dims(), (min, max));
        assert_eq!(ground.skin_parts(skin).map(<[_]>::len), Some(2));
        assert_eq!(ground.body(handle).state.mass, 80.0);
    }

    #[test]
    fn test_inverted_dims_leave_chassis_untouched() {
        let mut ground = FlatGround::new(0.0);
        let (handle, skin) = ground.add_body(Vec3::ZERO, 1.0);
        let mut chassis = Chassis::new(ChassisBody::new(handle, skin), 80.0);

        let err = chassis.set_dims(&mut ground, Vec3::ONE, Vec3::ZERO);
        assert!(matches!(err, Err(VehicleError::InvalidConfig(_))));
        assert!(ground.skin_parts(skin).is_none());
        assert_eq!(chassis.dims(), (Vec3::ZERO, Vec3::ZERO));
    }

    #[test]
    fn test_hooks_clear_and_apply_gravity() {
        let mut ground = FlatGround::new(0.0);
        let (handle, skin) = ground.add_body(Vec3::new(0.0, 2.0, 0.0), 50.0);
        let body = ChassisBody::new(handle, skin);
        ground.add_world_force(handle, Vec3::X, Vec3::ZERO).unwrap();

        let mut hooks = CountingHooks { forces: 0, posts: 0 };
        body.add_external_forces(&mut ground, Some(&mut hooks), 0.01).unwrap();
        body.post_physics(&mut ground, Some(&mut hooks), 0.01).unwrap();

        let forces = &ground.body(handle).forces;
        assert_eq!(forces.len(), 1);
        assert_eq!(forces[0], (Vec3::new(0.0, -500.0, 0.0), Vec3::new(0.0, 2.0, 0.0)));
        assert_eq!((hooks.forces, hooks.posts), (1, 1));
    }

    #[test]
    fn test_hooks_without_car_are_noops() {
        let mut ground = FlatGround::new(0.0);
        let (handle, skin) = ground.add_body(Vec3::ZERO, 10.0);
        let body = ChassisBody::new(handle, skin);

        body.add_external_forces(&mut ground, None, 0.01).unwrap();
        body.post_physics(&mut ground, None, 0.01).unwrap();
        assert_eq!(ground.body(handle).clears, 1);

        let missing = ChassisBody::new(BodyHandle::from_raw_parts(9, 0), skin);
        assert!(matches!(
            missing.add_external_forces(&mut ground, None, 0.01),
            Err(VehicleError::BodyNotFound(_))
        ));
    }
}
