//! Analytic substrate for deterministic unit tests

use crate::body::{BodyHandle, BodyState};
use crate::error::{Result, VehicleError};
use crate::filter::GroundContactFilter;
use crate::material::SkinMaterial;
use crate::query::{Segment, SegmentHit};
use crate::skin::{Primitive, SkinId};
use crate::substrate::PhysicsSubstrate;
use std::collections::HashMap;
use void_math::{Pose, PoseRate, Vec3};

pub(crate) const GROUND_SKIN: SkinId = SkinId(0);

pub(crate) struct TestBody {
    pub state: BodyState,
    pub skin: SkinId,
    pub forces: Vec<(Vec3, Vec3)>,
    pub clears: usize,
}

/// Infinite solid half-space below `height`, plus free-floating bodies
///
/// Bodies have no collision shapes of their own; only the ground answers
/// segment queries. The ground can be attached to a body (`platform`) to
/// exercise reactions on movable contacts.
pub(crate) struct FlatGround {
    pub height: f32,
    pub gravity: Vec3,
    pub platform: Option<BodyHandle>,
    /// When set, every query hits at this fraction regardless of geometry
    pub fixed_fraction: Option<f32>,
    bodies: Vec<TestBody>,
    skins: HashMap<SkinId, Vec<(Primitive, SkinMaterial)>>,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self {
            height,
            gravity: Vec3::new(0.0, -10.0, 0.0),
            platform: None,
            fixed_fraction: None,
            bodies: Vec::new(),
            skins: HashMap::new(),
        }
    }

    /// Add a body at rest with its frame at `position`
    pub fn add_body(&mut self, position: Vec3, mass: f32) -> (BodyHandle, SkinId) {
        let index = self.bodies.len() as u32;
        let skin = SkinId(u64::from(index) + 1);
        self.bodies.push(TestBody {
            state: BodyState::new(Pose::from_position(position), PoseRate::ZERO, mass, false),
            skin,
            forces: Vec::new(),
            clears: 0,
        });
        (BodyHandle::from_raw_parts(index, 0), skin)
    }

    /// Make the ground belong to a body with the given mass and movability
    pub fn attach_platform(&mut self, mass: f32, immovable: bool) -> BodyHandle {
        let (handle, _) = self.add_body(Vec3::new(0.0, self.height, 0.0), mass);
        self.body_mut(handle).state.immovable = immovable;
        self.platform = Some(handle);
        handle
    }

    pub fn body(&self, handle: BodyHandle) -> &TestBody {
        &self.bodies[handle.into_raw_parts().0 as usize]
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> &mut TestBody {
        &mut self.bodies[handle.into_raw_parts().0 as usize]
    }

    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3) {
        let state = &mut self.body_mut(handle).state;
        state.pose.position = position;
        state.center_of_mass = position;
    }

    pub fn set_rate(&mut self, handle: BodyHandle, rate: PoseRate) {
        self.body_mut(handle).state.rate = rate;
    }

    pub fn net_force(&self, handle: BodyHandle) -> Vec3 {
        self.body(handle)
            .forces
            .iter()
            .fold(Vec3::ZERO, |acc, (force, _)| acc + *force)
    }

    pub fn take_forces(&mut self, handle: BodyHandle) -> Vec<(Vec3, Vec3)> {
        std::mem::take(&mut self.body_mut(handle).forces)
    }

    pub fn skin_parts(&self, skin: SkinId) -> Option<&[(Primitive, SkinMaterial)]> {
        self.skins.get(&skin).map(Vec::as_slice)
    }

    fn lookup(&self, handle: BodyHandle) -> Result<&TestBody> {
        let (index, generation) = handle.into_raw_parts();
        match self.bodies.get(index as usize) {
            Some(body) if generation == 0 => Ok(body),
            _ => Err(VehicleError::BodyNotFound(handle)),
        }
    }
}

impl PhysicsSubstrate for FlatGround {
    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn body_state(&self, body: BodyHandle) -> Result<BodyState> {
        Ok(self.lookup(body)?.state)
    }

    fn clear_forces(&mut self, body: BodyHandle) -> Result<()> {
        self.lookup(body)?;
        let body = self.body_mut(body);
        body.forces.clear();
        body.clears += 1;
        Ok(())
    }

    fn add_world_force(&mut self, body: BodyHandle, force: Vec3, point: Vec3) -> Result<()> {
        self.lookup(body)?;
        self.body_mut(body).forces.push((force, point));
        Ok(())
    }

    fn segment_intersect(&self, segment: &Segment, filter: &GroundContactFilter) -> Option<SegmentHit> {
        let (skin, immovable) = match self.platform {
            Some(handle) => (self.body(handle).skin, self.body(handle).state.immovable),
            None => (GROUND_SKIN, true),
        };
        if !filter.consider(skin, immovable) {
            return None;
        }

        let fraction = if let Some(fraction) = self.fixed_fraction {
            fraction
        } else if segment.origin.y <= self.height {
            0.0
        } else if segment.delta.y < 0.0 {
            (self.height - segment.origin.y) / segment.delta.y
        } else {
            return None;
        };
        if fraction > 1.0 && self.fixed_fraction.is_none() {
            return None;
        }

        Some(SegmentHit {
            fraction,
            position: segment.point_at(fraction),
            normal: Vec3::Y,
            skin,
            body: self.platform,
        })
    }

    fn replace_primitives(
        &mut self,
        skin: SkinId,
        parts: &[(Primitive, SkinMaterial)],
        mass: Option<f32>,
    ) -> Result<()> {
        let owner = self
            .bodies
            .iter_mut()
            .find(|b| b.skin == skin)
            .ok_or(VehicleError::SkinNotFound(skin))?;
        if let Some(mass) = mass {
            owner.state.mass = mass;
        }
        self.skins.insert(skin, parts.to_vec());
        Ok(())
    }
}
