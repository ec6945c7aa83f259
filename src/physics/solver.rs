//! Sequential impulse solver for the contacts between one pair of bodies.
//!
//! Non-penetration constraint:
//! C = dot(p2 - p1, n)
//! Cdot = dot(v2 - v1, n)
//! J = [ -n, -cross(r1, n), n, cross(r2, n) ]
//!
//! Friction constraint: the same with the tangent `t = left_normal(n)` in place of `n`.
//!
//! Lambdas are impulses in constraint space. The accumulated normal lambda
//! is clamped to be non-negative and the tangential one to the Coulomb cone.

use super::{
    contact::{world_impulse, Contact},
    BodyKey, RigidBody, SolverParams,
};
use crate::math as m;

/// Contact constraint solver for one pair of colliding bodies.
///
/// The solver only remembers which bodies it belongs to; every method that
/// needs their state takes them as arguments, in the same order as
/// [`bodies`][Self::bodies] (the order the contact normals are defined in).
#[derive(Clone, Debug)]
pub struct ContactSolver {
    bodies: [BodyKey; 2],
    contacts: Vec<Contact>,
    elasticity: f64,
    friction: f64,
}

impl ContactSolver {
    /// Create a solver with no contacts.
    /// Elasticity is clamped to `[0, 1]` and friction to non-negative values.
    pub fn new(bodies: [BodyKey; 2], elasticity: f64, friction: f64) -> Self {
        ContactSolver {
            bodies,
            contacts: Vec::new(),
            elasticity: m::clamp(elasticity, 0.0, 1.0),
            friction: friction.max(0.0),
        }
    }

    /// Set the initial manifold without matching against previous contacts.
    pub fn with_contacts(mut self, contacts: Vec<Contact>) -> Self {
        self.contacts = contacts;
        self
    }

    #[inline]
    pub fn bodies(&self) -> [BodyKey; 2] {
        self.bodies
    }

    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    #[inline]
    pub fn elasticity(&self) -> f64 {
        self.elasticity
    }

    #[inline]
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Sum of the accumulated normal impulses over all contacts.
    pub fn total_normal_impulse(&self) -> f64 {
        self.contacts.iter().map(|c| c.lambda_normal).sum()
    }

    /// Replace the contact list with a new manifold.
    ///
    /// New contacts with the same feature hash as a previous contact
    /// inherit its accumulated impulses, others start from zero.
    pub fn update(&mut self, mut new_contacts: Vec<Contact>) {
        for new in &mut new_contacts {
            if let Some(old) = self.contacts.iter().find(|old| old.hash == new.hash) {
                new.lambda_normal = old.lambda_normal;
                new.lambda_tangential = old.lambda_tangential;
            }
        }
        self.contacts = new_contacts;
    }

    /// Forget all accumulated impulses.
    pub fn reset_impulses(&mut self) {
        for con in &mut self.contacts {
            con.lambda_normal = 0.0;
            con.lambda_tangential = 0.0;
        }
    }

    /// Precompute lever arms, effective masses and restitution targets.
    /// Must be called once per step before warm starting and velocity iterations.
    pub fn init_solver(&mut self, body1: &RigidBody, body2: &RigidBody) {
        let sum_m_inv = body1.inv_mass() + body2.inv_mass();
        let inv_inertias = [body1.inv_inertia(), body2.inv_inertia()];

        for con in &mut self.contacts {
            con.r1 = con.point - body1.position;
            con.r2 = con.point - body2.position;
            con.r1_local = m::unrotate(con.r1, body1.angle);
            con.r2_local = m::unrotate(con.r2, body2.angle);

            let n = *con.normal;
            let t = con.tangent();
            con.emn = effective_mass(sum_m_inv, inv_inertias, [con.r1, con.r2], n);
            con.emt = effective_mass(sum_m_inv, inv_inertias, [con.r1, con.r2], t);

            let rv = relative_velocity(body1, body2, con);
            con.bounce = rv.dot(n) * self.elasticity;
        }
    }

    /// Apply the impulses carried over from the previous step.
    pub fn warm_start(&mut self, body1: &mut RigidBody, body2: &mut RigidBody) {
        self.warm_start_scaled(body1, body2, 1.0);
    }

    /// Scale the carried-over impulses by `amount` and apply them.
    pub fn warm_start_scaled(
        &mut self,
        body1: &mut RigidBody,
        body2: &mut RigidBody,
        amount: f64,
    ) {
        for con in &mut self.contacts {
            con.lambda_normal *= amount;
            con.lambda_tangential *= amount;
            let impulse = con.impulse();
            apply_impulse(body1, body2, con.r1, con.r2, impulse);
        }
    }

    /// Run one sequential impulse pass over all contacts, in manifold order.
    ///
    /// Returns the largest magnitude of impulse change applied,
    /// which approaches zero as the solution converges.
    pub fn solve_velocity_constraints(
        &mut self,
        body1: &mut RigidBody,
        body2: &mut RigidBody,
    ) -> f64 {
        let mut max_delta: f64 = 0.0;

        for con in &mut self.contacts {
            let n = *con.normal;
            let t = con.tangent();
            let rv = relative_velocity(body1, body2, con);

            // normal impulse with bounce as a velocity bias
            let lambda_n = -con.emn * (n.dot(rv) + con.bounce);
            let lambda_n_old = con.lambda_normal;
            con.lambda_normal = (lambda_n_old + lambda_n).max(0.0);
            let lambda_n = con.lambda_normal - lambda_n_old;

            // friction, bounded by Coulomb's law
            let lambda_t = -con.emt * t.dot(rv);
            let lambda_t_max = con.lambda_normal * self.friction;
            let lambda_t_old = con.lambda_tangential;
            con.lambda_tangential =
                m::clamp(lambda_t_old + lambda_t, -lambda_t_max, lambda_t_max);
            let lambda_t = con.lambda_tangential - lambda_t_old;

            let impulse = world_impulse(con.normal, lambda_n, lambda_t);
            apply_impulse(body1, body2, con.r1, con.r2, impulse);

            max_delta = max_delta.max(lambda_n.abs()).max(lambda_t.abs());
        }

        max_delta
    }

    /// Move the bodies directly to resolve remaining penetration.
    ///
    /// Returns true if the deepest penetration found was within
    /// [`SolverParams::penetration_tolerance`].
    pub fn solve_position_constraints(
        &self,
        body1: &mut RigidBody,
        body2: &mut RigidBody,
        params: &SolverParams,
    ) -> bool {
        let (m1_inv, m2_inv) = (body1.inv_mass(), body2.inv_mass());
        let (i1_inv, i2_inv) = (body1.inv_inertia(), body2.inv_inertia());
        let sum_m_inv = m1_inv + m2_inv;

        let mut max_penetration: f64 = 0.0;

        for con in &self.contacts {
            let n = *con.normal;
            // bodies may have moved since init, so recompute lever arms from local ones
            let r1 = m::rotate(con.r1_local, body1.angle);
            let r2 = m::rotate(con.r2_local, body2.angle);

            let p1 = body1.position + r1;
            let p2 = body2.position + r2;
            // negative when penetrating
            let c = (p2 - p1).dot(n) - con.depth;

            let correction = m::clamp(
                params.baumgarte * (c + params.slop),
                -params.max_linear_correction,
                0.0,
            );
            if correction == 0.0 {
                continue;
            }

            max_penetration = max_penetration.max(-c);

            let sn1 = m::cross(r1, n);
            let sn2 = m::cross(r2, n);
            let em_inv = sum_m_inv + i1_inv * sn1 * sn1 + i2_inv * sn2 * sn2;
            let lambda_dt = if em_inv == 0.0 {
                0.0
            } else {
                -correction / em_inv
            };

            let impulse_dt = n * lambda_dt;
            body1.position -= impulse_dt * m1_inv;
            body1.angle -= sn1 * lambda_dt * i1_inv;
            body2.position += impulse_dt * m2_inv;
            body2.angle += sn2 * lambda_dt * i2_inv;
        }

        max_penetration <= params.penetration_tolerance()
    }
}

/// `1 / (J M^-1 J^T)` along `dir`, or zero if nothing can move along it.
#[inline]
fn effective_mass(sum_m_inv: f64, inv_inertias: [f64; 2], offsets: [m::Vec2; 2], dir: m::Vec2) -> f64 {
    let s1 = m::cross(offsets[0], dir);
    let s2 = m::cross(offsets[1], dir);
    let em_inv = sum_m_inv + inv_inertias[0] * s1 * s1 + inv_inertias[1] * s2 * s2;
    if em_inv == 0.0 {
        0.0
    } else {
        1.0 / em_inv
    }
}

/// Velocity of body 2 relative to body 1 at the contact point.
#[inline]
fn relative_velocity(body1: &RigidBody, body2: &RigidBody, con: &Contact) -> m::Vec2 {
    body2.velocity.point_velocity(con.r2) - body1.velocity.point_velocity(con.r1)
}

#[inline]
fn apply_impulse(
    body1: &mut RigidBody,
    body2: &mut RigidBody,
    r1: m::Vec2,
    r2: m::Vec2,
    impulse: m::Vec2,
) {
    body1.velocity.linear -= impulse * body1.inv_mass();
    body1.velocity.angular -= m::cross(r1, impulse) * body1.inv_inertia();
    body2.velocity.linear += impulse * body2.inv_mass();
    body2.velocity.angular += m::cross(r2, impulse) * body2.inv_inertia();
}
