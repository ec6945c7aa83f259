use super::{Collider, Velocity};
use crate::math::{self as m, Angle};

/// A rigid body: something that moves and can be pushed around by contacts.
/// Attach a [`Collider`][super::Collider] to it when inserting into a
/// [`World`][super::World] to make it collide with other things.
#[derive(Clone, Copy, Debug)]
pub struct RigidBody {
    /// Position of the center of mass in world space.
    pub position: m::Vec2,
    /// Orientation in radians, counterclockwise.
    pub angle: f64,
    pub velocity: Velocity,
    pub mass: Mass,
    pub moment_of_inertia: Mass,
    /// Accumulated force, cleared at the end of every step.
    pub force: m::Vec2,
    /// Accumulated torque, cleared at the end of every step.
    pub torque: f64,
    pub linear_damping: f64,
    pub angular_damping: f64,
    pub(crate) sleep_time: f64,
    pub(crate) awake: bool,
}

impl RigidBody {
    fn with_masses(mass: Mass, moment_of_inertia: Mass) -> Self {
        Self {
            position: m::Vec2::zero(),
            angle: 0.0,
            velocity: Velocity::default(),
            mass,
            moment_of_inertia,
            force: m::Vec2::zero(),
            torque: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            sleep_time: 0.0,
            awake: true,
        }
    }

    /// A particle responds to external forces but does not rotate.
    pub fn new_particle(mass: f64) -> Self {
        Self::with_masses(Mass::from(mass), Mass::Infinite)
    }

    /// Dynamic bodies respond to external forces and are allowed to rotate.
    /// This constructor calculates mass and moment of inertia from the given density and
    /// collider shape.
    pub fn new_dynamic(collider: &Collider, density: f64) -> Self {
        let mass = collider.shape.area() * density;
        Self::with_masses(
            Mass::from(mass),
            Mass::from(collider.shape.second_moment_of_area() * density),
        )
    }

    /// Create a dynamic body with the given mass instead of using density.
    /// The collider is still required in order to compute moment of inertia.
    pub fn new_dynamic_const_mass(collider: &Collider, mass: f64) -> Self {
        let density = mass / collider.shape.area();
        Self::with_masses(
            Mass::from(mass),
            Mass::from(collider.shape.second_moment_of_area() * density),
        )
    }

    /// Static bodies are not affected by contacts or forces.
    pub fn new_static() -> Self {
        Self::with_masses(Mass::Infinite, Mass::Infinite)
    }

    /// Set the position of the body in a builder-like chain.
    pub fn with_position(mut self, position: impl Into<[f64; 2]>) -> Self {
        let [x, y] = position.into();
        self.position = m::Vec2::new(x, y);
        self
    }

    /// Set the orientation of the body in a builder-like chain.
    pub fn with_angle(mut self, angle: Angle) -> Self {
        self.angle = angle.rad();
        self
    }

    /// Set the velocity of the body in a builder-like chain.
    pub fn with_velocity(mut self, vel: Velocity) -> Self {
        self.velocity = vel;
        self
    }

    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Inverse of the mass, zero for immovable bodies.
    #[inline]
    pub fn inv_mass(&self) -> f64 {
        self.mass.inv()
    }

    /// Inverse of the moment of inertia, zero for bodies that can't rotate.
    #[inline]
    pub fn inv_inertia(&self) -> f64 {
        self.moment_of_inertia.inv()
    }

    /// Check whether the body has finite mass or moment of inertia, allowing forces to have an
    /// effect on it.
    #[inline]
    pub fn sees_forces(&self) -> bool {
        !matches!(
            (self.mass, self.moment_of_inertia),
            (Mass::Infinite, Mass::Infinite)
        )
    }

    /// Whether the body is currently being simulated.
    /// Static bodies are never awake.
    #[inline]
    pub fn is_awake(&self) -> bool {
        self.awake && self.sees_forces()
    }

    /// Wake the body up (or put it to sleep), resetting its sleep timer.
    pub fn set_awake(&mut self, awake: bool) {
        self.awake = awake;
        self.sleep_time = 0.0;
        if !awake {
            self.velocity = Velocity::default();
        }
    }

    /// Add a force acting through the center of mass for the next step.
    pub fn apply_force(&mut self, force: m::Vec2) {
        self.force += force;
    }

    /// Add a force acting at a world space point for the next step.
    pub fn apply_force_at(&mut self, force: m::Vec2, point: m::Vec2) {
        self.force += force;
        self.torque += m::cross(point - self.position, force);
    }

    /// Immediately change velocity by an impulse applied at a world space point.
    pub fn apply_impulse_at(&mut self, impulse: m::Vec2, point: m::Vec2) {
        self.velocity.linear += impulse * self.inv_mass();
        self.velocity.angular += m::cross(point - self.position, impulse) * self.inv_inertia();
    }

    /// Transform a point from body-local space to world space.
    #[inline]
    pub fn world_point(&self, local: m::Vec2) -> m::Vec2 {
        self.position + m::rotate(local, self.angle)
    }

    /// Transform a point from world space to body-local space.
    #[inline]
    pub fn local_point(&self, world: m::Vec2) -> m::Vec2 {
        m::unrotate(world - self.position, self.angle)
    }

    pub fn kinetic_energy(&self) -> f64 {
        let lin = match self.mass {
            Mass::Finite { mass, .. } => mass * self.velocity.linear.mag_sq(),
            Mass::Infinite => 0.0,
        };
        let ang = match self.moment_of_inertia {
            Mass::Finite { mass, .. } => mass * self.velocity.angular.powi(2),
            Mass::Infinite => 0.0,
        };
        0.5 * (lin + ang)
    }

    /// True if nothing about the body's state has become NaN or infinite.
    pub fn is_finite(&self) -> bool {
        m::is_finite(self.position)
            && self.angle.is_finite()
            && m::is_finite(self.velocity.linear)
            && self.velocity.angular.is_finite()
    }

    /// Apply external acceleration, accumulated forces and damping over a time step.
    pub(crate) fn integrate_velocity(&mut self, ext_accel: m::Vec2, dt: f64, global_damping: f64) {
        self.velocity.linear += (ext_accel + self.force * self.inv_mass()) * dt;
        self.velocity.angular += self.torque * self.inv_inertia() * dt;

        self.velocity.linear *= m::clamp(1.0 - dt * (global_damping + self.linear_damping), 0.0, 1.0);
        self.velocity.angular *=
            m::clamp(1.0 - dt * (global_damping + self.angular_damping), 0.0, 1.0);
    }

    pub(crate) fn integrate_position(&mut self, dt: f64) {
        self.position += self.velocity.linear * dt;
        self.angle += self.velocity.angular * dt;
    }
}

/// Mass or moment of inertia of a body, which can be infinite.
///
/// This stores both a mass value and its inverse, because calculating inverse mass
/// is expensive and needed a lot in physics calculations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mass {
    Finite { mass: f64, inverse: f64 },
    Infinite,
}

impl From<f64> for Mass {
    /// Non-positive and non-finite values are treated as infinite mass.
    #[inline]
    fn from(mass: f64) -> Self {
        if mass > 0.0 && mass.is_finite() {
            Mass::Finite {
                mass,
                inverse: 1.0 / mass,
            }
        } else {
            Mass::Infinite
        }
    }
}

impl Mass {
    /// Get the inverse of the mass, which is zero if the mass is infinite.
    #[inline]
    pub fn inv(&self) -> f64 {
        match self {
            Mass::Finite { inverse, .. } => *inverse,
            Mass::Infinite => 0.0,
        }
    }
}
