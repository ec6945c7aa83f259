use crate::math as m;

//

pub mod arcade;
pub use arcade::{ArcadeBody, ArcadeKey, ArcadeWorld};

pub mod body;
pub use body::{Mass, RigidBody};

pub mod collision;
pub use collision::{Collider, Material, Shape};

pub mod contact;
pub use contact::{Contact, FeatureId};

pub mod forcefield;
pub use forcefield::ForceField;

mod pairs;
pub use pairs::PairKey;

pub mod params;
pub use params::{SleepParams, SolverConvergence, SolverParams};

pub mod solver;
pub use solver::ContactSolver;

pub mod trace;
pub use trace::SolverTrace;

mod world;
pub use world::{BodyKey, StepReport, World};

//

/// Velocity of an object.
///
// Equivalent to a Vec3 but with names for the translational and rotational part.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Velocity {
    /// Linear velocity in metres per second.
    pub linear: m::Vec2,
    /// Angular velocity in radians per second.
    pub angular: f64,
}

impl Velocity {
    pub fn new(linear: impl Into<[f64; 2]>, angular: f64) -> Self {
        let [x, y] = linear.into();
        Velocity {
            linear: m::Vec2::new(x, y),
            angular,
        }
    }

    /// Get the linear velocity of a point offset from the center of mass.
    pub fn point_velocity(&self, offset: m::Vec2) -> m::Vec2 {
        let tangent = m::left_normal(offset) * self.angular;
        self.linear + tangent
    }
}

/// Event produced by the physics world when two bodies were in contact during a step.
#[derive(Clone, Copy, Debug)]
pub struct ContactEvent {
    /// The two bodies, in the order the contact normal uses.
    pub bodies: [BodyKey; 2],
    /// First contact point of the manifold in world space.
    pub point: m::Vec2,
    /// Normal of the first contact, facing from `bodies[0]` towards `bodies[1]`.
    pub normal: m::Unit<m::Vec2>,
    /// Sum of the normal impulses over all contact points of the pair.
    pub impulse: f64,
}

/// Errors from fallible operations on the physics world.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum PhysicsError {
    #[error("Body does not exist in the world")]
    UnknownBody,
    #[error("Tried to pair a body with itself")]
    SelfPair,
    #[error("Invalid solver parameters: {0}")]
    InvalidParams(&'static str),
    #[error("Time step must be positive and finite, got {0}")]
    InvalidTimestep(f64),
    #[error("Arcade separation needs at least one circle")]
    UnsupportedShapes,
    #[error("Body state became non-finite during the step")]
    NonFinite { body: BodyKey },
}
