/// Open a profiler span that lasts until the returned value is dropped.
/// Does nothing unless the `tracy` feature is enabled and a profiler is connected.
macro_rules! tracy_span {
    ($name:expr, $fn_name:expr) => {
        tracy_client::Client::running()
            .map(|client| client.span_alloc(Some($name), $fn_name, file!(), line!(), 0))
    };
}

pub mod event;
pub use event::EventSink;

pub mod math;
pub use math::{uv, Angle, Unit, Vec2};

pub mod physics;
pub use physics::{
    arcade::{self, ArcadeBody, ArcadeEvent, ArcadeEventKind, ArcadeKey, ArcadeWorld, Separation},
    collision::{self, Collider, Material, Shape},
    forcefield::{self, ForceField},
    trace::{IterationLog, NoTrace, SolverTrace},
    BodyKey, Contact, ContactEvent, ContactSolver, FeatureId, Mass, PairKey, PhysicsError,
    RigidBody, SleepParams, SolverConvergence, SolverParams, StepReport, Velocity, World,
};
