//! Rigid body handles, descriptions and state snapshots

use rapier3d::prelude as rapier;
use serde::{Deserialize, Serialize};
use void_math::{Pose, PoseRate, Vec3};

/// Handle to a rigid body in the substrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    /// Create from raw index and generation
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Split into raw index and generation
    pub const fn into_raw_parts(self) -> (u32, u32) {
        (self.index, self.generation)
    }

    pub(crate) fn from_rapier(handle: rapier::RigidBodyHandle) -> Self {
        let (index, generation) = handle.into_raw_parts();
        Self { index, generation }
    }

    pub(crate) fn to_rapier(self) -> rapier::RigidBodyHandle {
        rapier::RigidBodyHandle::from_raw_parts(self.index, self.generation)
    }
}

/// Type of rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves, infinite mass
    Static,
    /// Fully simulated
    #[default]
    Dynamic,
    /// Moved by its velocity, unaffected by forces
    Kinematic,
}

impl From<BodyKind> for rapier::RigidBodyType {
    fn from(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Static => rapier::RigidBodyType::Fixed,
            BodyKind::Dynamic => rapier::RigidBodyType::Dynamic,
            BodyKind::Kinematic => rapier::RigidBodyType::KinematicVelocityBased,
        }
    }
}

/// Description for creating a rigid body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyDesc {
    /// Type of rigid body
    pub kind: BodyKind,
    /// Initial pose
    pub pose: Pose,
    /// Initial velocity
    pub rate: PoseRate,
    /// Gravity scale applied by the integrator (0 = caller adds gravity)
    pub gravity_scale: f32,
    /// Can this body sleep when inactive
    pub can_sleep: bool,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            pose: Pose::IDENTITY,
            rate: PoseRate::ZERO,
            gravity_scale: 1.0,
            can_sleep: true,
        }
    }
}

impl BodyDesc {
    /// Create a static body description
    pub fn fixed() -> Self {
        Self {
            kind: BodyKind::Static,
            ..Default::default()
        }
    }

    /// Create a dynamic body description
    pub fn dynamic() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            ..Default::default()
        }
    }

    /// Set pose
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Set position, keeping orientation
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.pose.position = Vec3::new(x, y, z);
        self
    }

    /// Set velocity
    pub fn with_rate(mut self, rate: PoseRate) -> Self {
        self.rate = rate;
        self
    }

    /// Set gravity scale
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Set whether the body may sleep
    pub fn with_can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    /// Build a Rapier rigid body builder
    pub(crate) fn to_rapier_builder(&self) -> rapier::RigidBodyBuilder {
        let lin = self.rate.linear;
        let ang = self.rate.angular;
        rapier::RigidBodyBuilder::new(self.kind.into())
            .position(pose_to_isometry(&self.pose))
            .linvel(rapier::Vector::new(lin.x, lin.y, lin.z))
            .angvel(rapier::Vector::new(ang.x, ang.y, ang.z))
            .gravity_scale(self.gravity_scale)
            .can_sleep(self.can_sleep)
    }
}

/// Snapshot of a body as seen by the vehicle solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// Body frame
    pub pose: Pose,
    /// Linear velocity of the centre of mass, angular velocity about it
    pub rate: PoseRate,
    /// World-space centre of mass
    pub center_of_mass: Vec3,
    /// Mass (kg)
    pub mass: f32,
    /// Never displaced by applied forces
    pub immovable: bool,
}

impl BodyState {
    /// State of a body whose centre of mass is its frame origin
    pub fn new(pose: Pose, rate: PoseRate, mass: f32, immovable: bool) -> Self {
        Self {
            pose,
            rate,
            center_of_mass: pose.position,
            mass,
            immovable,
        }
    }

    /// Velocity of a world-space point rigidly attached to this body
    #[inline]
    pub fn point_velocity(&self, point: Vec3) -> Vec3 {
        self.rate.point_velocity(point - self.center_of_mass)
    }
}

pub(crate) fn pose_to_isometry(pose: &Pose) -> rapier::Isometry<f32> {
    use rapier3d::na::{Matrix3, Rotation3, Translation3, UnitQuaternion};

    let m = pose.orientation.orthonormalized();
    let [c0, c1, c2] = m.cols;
    let rotation = Rotation3::from_matrix_unchecked(Matrix3::new(
        c0.x, c1.x, c2.x,
        c0.y, c1.y, c2.y,
        c0.z, c1.z, c2.z,
    ));
    let p = pose.position;
    rapier::Isometry::from_parts(
        Translation3::new(p.x, p.y, p.z),
        UnitQuaternion::from_rotation_matrix(&rotation),
    )
}

pub(crate) fn isometry_to_pose(iso: &rapier::Isometry<f32>) -> Pose {
    use void_math::Mat3;

    let t = iso.translation.vector;
    let rotation = iso.rotation.to_rotation_matrix();
    let m = rotation.matrix();
    let col = |c: usize| Vec3::new(m[(0, c)], m[(1, c)], m[(2, c)]);
    Pose::new(Vec3::new(t.x, t.y, t.z), Mat3::from_cols(col(0), col(1), col(2)))
}
