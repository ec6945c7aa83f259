use super::{
    collision::narrowphase,
    pairs::{PairCache, PairKey},
    trace::{NoTrace, SolverTrace},
    Collider, Contact, ContactEvent, ContactSolver, ForceField, PhysicsError, RigidBody,
    SolverConvergence, SolverParams,
};
use crate::math as m;

use itertools::Itertools;
use std::collections::HashMap;
use thunderdome as td;

/// Key type to look up a body stored in the physics world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyKey(pub(super) td::Index);

impl BodyKey {
    /// Get the underlying arena index.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

#[derive(Clone, Copy, Debug)]
struct BodyEntry {
    body: RigidBody,
    collider: Collider,
}

/// Summary of what happened during a step.
#[derive(Clone, Debug, Default)]
pub struct StepReport {
    /// One event per pair of bodies in contact, in solve order.
    pub events: Vec<ContactEvent>,
    /// Number of velocity passes that were run.
    pub velocity_iterations: u32,
    /// Number of position passes that were run.
    pub position_iterations: u32,
    /// Whether position correction converged before running out of passes.
    pub position_solved: bool,
    /// Pairs that started touching this step.
    pub new_pairs: usize,
    /// Pairs that stopped touching this step.
    pub removed_pairs: usize,
    /// Whether the world put its bodies to sleep at the end of this step.
    pub fell_asleep: bool,
}

/// A collection of rigid bodies that collide with each other.
///
/// Contact solvers are kept per pair of touching bodies between steps,
/// which lets impulses from the previous step warm start the next one.
#[derive(Clone, Debug)]
pub struct World {
    params: SolverParams,
    bodies: td::Arena<BodyEntry>,
    pairs: PairCache,
    pending_manifolds: HashMap<PairKey, Vec<Contact>>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            params: SolverParams::default(),
            bodies: td::Arena::new(),
            pairs: PairCache::new(),
            pending_manifolds: HashMap::new(),
        }
    }
}

impl World {
    pub fn new(params: SolverParams) -> Result<Self, PhysicsError> {
        params.validate()?;
        Ok(Self {
            params,
            ..Self::default()
        })
    }

    #[inline]
    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SolverParams) -> Result<(), PhysicsError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Add a body to the world.
    /// Returns a key that can be used to access or remove it later.
    pub fn insert(&mut self, body: RigidBody, collider: Collider) -> BodyKey {
        BodyKey(self.bodies.insert(BodyEntry { body, collider }))
    }

    /// Remove a body from the world, returning it if it still existed.
    /// Every contact pair involving the body is forgotten.
    pub fn remove(&mut self, key: BodyKey) -> Option<(RigidBody, Collider)> {
        let entry = self.bodies.remove(key.0)?;
        self.pairs.remove_body(key);
        self.pending_manifolds.retain(|pair, _| !pair.contains(key));
        Some((entry.body, entry.collider))
    }

    /// Remove all bodies and pairs.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.pairs = PairCache::new();
        self.pending_manifolds.clear();
    }

    #[inline]
    pub fn get_body(&self, key: BodyKey) -> Option<&RigidBody> {
        self.bodies.get(key.0).map(|e| &e.body)
    }

    #[inline]
    pub fn get_body_mut(&mut self, key: BodyKey) -> Option<&mut RigidBody> {
        self.bodies.get_mut(key.0).map(|e| &mut e.body)
    }

    #[inline]
    pub fn get_collider(&self, key: BodyKey) -> Option<&Collider> {
        self.bodies.get(key.0).map(|e| &e.collider)
    }

    #[inline]
    pub fn get_collider_mut(&mut self, key: BodyKey) -> Option<&mut Collider> {
        self.bodies.get_mut(key.0).map(|e| &mut e.collider)
    }

    /// Iterate over every body in the world.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyKey, &RigidBody)> {
        self.bodies.iter().map(|(idx, e)| (BodyKey(idx), &e.body))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Get the contact solver of two touching bodies, if they are touching.
    pub fn solver(&self, a: BodyKey, b: BodyKey) -> Option<&ContactSolver> {
        self.pairs.get(PairKey::new(a, b).ok()?)
    }

    /// Iterate over the pairs that were in contact during the last step, in solve order.
    pub fn solvers(&self) -> impl Iterator<Item = (PairKey, &ContactSolver)> {
        self.pairs.iter_active()
    }

    /// Provide the contacts between two bodies for the next step
    /// instead of computing them from their colliders.
    ///
    /// Normals must face from `a` towards `b`. Collision layers and sleep state
    /// are ignored for the pair; both bodies are woken up if they touch.
    pub fn set_manifold(
        &mut self,
        a: BodyKey,
        b: BodyKey,
        mut contacts: Vec<Contact>,
    ) -> Result<(), PhysicsError> {
        let key = PairKey::new(a, b)?;
        if !self.bodies.contains(a.0) || !self.bodies.contains(b.0) {
            return Err(PhysicsError::UnknownBody);
        }
        if key.bodies()[0] != a {
            for c in &mut contacts {
                c.normal = -c.normal;
            }
        }
        self.pending_manifolds.insert(key, contacts);
        Ok(())
    }

    /// Detect contacts, solve them and move every awake body forward by `dt` seconds.
    pub fn step(
        &mut self,
        dt: f64,
        forcefield: &impl ForceField,
    ) -> Result<StepReport, PhysicsError> {
        self.step_traced(dt, forcefield, &mut NoTrace)
    }

    /// Like [`step`][Self::step], calling back to `trace` during the solve.
    pub fn step_traced(
        &mut self,
        dt: f64,
        forcefield: &impl ForceField,
        trace: &mut impl SolverTrace,
    ) -> Result<StepReport, PhysicsError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        let _span = tracy_span!("physics step", "step_traced");

        let params = self.params;
        let mut report = StepReport::default();

        self.detect_contacts(&mut report);

        //
        // Solver setup
        //

        let warm_start = params.warm_start.filter(|amount| *amount > 0.0);
        let bodies = &mut self.bodies;
        self.pairs.for_each_active_mut(|key, solver| {
            if let Some((b1, b2)) = pair_bodies(bodies, key) {
                solver.init_solver(b1, b2);
                match warm_start {
                    Some(amount) => solver.warm_start_scaled(b1, b2, amount),
                    None => solver.reset_impulses(),
                }
            }
        });
        trace.solvers_initialized(&mut self.pairs.iter_active());

        for entry in self.bodies.iter_mut().map(|(_, e)| e) {
            let body = &mut entry.body;
            if body.is_awake() {
                let ext_accel = forcefield.value_at(body.position);
                body.integrate_velocity(ext_accel, dt, params.damping);
            }
        }

        //
        // Velocity iterations
        //

        {
            let _span = tracy_span!("contact velocity iterations", "step_traced");
            for iteration in 0..params.velocity_iterations {
                let mut max_delta: f64 = 0.0;
                let bodies = &mut self.bodies;
                self.pairs.for_each_active_mut(|key, solver| {
                    if let Some((b1, b2)) = pair_bodies(bodies, key) {
                        max_delta = max_delta.max(solver.solve_velocity_constraints(b1, b2));
                    }
                });
                report.velocity_iterations = iteration + 1;
                trace.velocity_iteration(iteration, max_delta, &mut self.pairs.iter_active());

                if let SolverConvergence::MaxDelta(limit) = params.convergence {
                    if max_delta <= limit {
                        break;
                    }
                }
            }
        }

        for entry in self.bodies.iter_mut().map(|(_, e)| e) {
            if entry.body.is_awake() {
                entry.body.integrate_position(dt);
            }
        }

        //
        // Position iterations
        //

        {
            let _span = tracy_span!("contact position iterations", "step_traced");
            for iteration in 0..params.position_iterations {
                let mut solved = true;
                let bodies = &mut self.bodies;
                self.pairs.for_each_active_mut(|key, solver| {
                    if let Some((b1, b2)) = pair_bodies(bodies, key) {
                        solved &= solver.solve_position_constraints(b1, b2, &params);
                    }
                });
                report.position_iterations = iteration + 1;
                trace.position_iteration(iteration, solved);

                if solved {
                    report.position_solved = true;
                    break;
                }
            }
        }

        if let Some((idx, _)) = self.bodies.iter().find(|(_, e)| !e.body.is_finite()) {
            log::warn!("Body {:?} became non-finite during a physics step", idx);
            return Err(PhysicsError::NonFinite { body: BodyKey(idx) });
        }

        //
        // Bookkeeping
        //

        report.events = self
            .pairs
            .iter_active()
            .filter_map(|(key, solver)| {
                let first = solver.contacts().first()?;
                Some(ContactEvent {
                    bodies: key.bodies(),
                    point: first.point,
                    normal: first.normal,
                    impulse: solver.total_normal_impulse(),
                })
            })
            .collect();
        trace.step_finished(&mut self.pairs.iter_active());

        for (_, entry) in self.bodies.iter_mut() {
            entry.body.force = m::Vec2::zero();
            entry.body.torque = 0.0;
        }

        report.fell_asleep = self.update_sleep(dt, report.position_solved);

        log::trace!(
            "Physics step: {} pairs, {} velocity and {} position iterations",
            report.events.len(),
            report.velocity_iterations,
            report.position_iterations,
        );

        Ok(report)
    }

    /// Find the contacts of every candidate pair and hand them to the pair's solver.
    fn detect_contacts(&mut self, report: &mut StepReport) {
        let _span = tracy_span!("contact detection", "detect_contacts");

        self.pairs.begin_step();

        let keys: Vec<BodyKey> = self.bodies.iter().map(|(idx, _)| BodyKey(idx)).collect();
        for (&a, &b) in keys.iter().tuple_combinations() {
            let key = match PairKey::new(a, b) {
                Ok(key) => key,
                Err(_) => continue,
            };
            let [k1, k2] = key.bodies();
            let (e1, e2) = match (self.bodies.get(k1.0), self.bodies.get(k2.0)) {
                (Some(e1), Some(e2)) => (e1, e2),
                _ => continue,
            };

            let contacts = match self.pending_manifolds.remove(&key) {
                Some(contacts) => contacts,
                None => {
                    if !(e1.body.is_awake() || e2.body.is_awake())
                        || !e1.collider.can_collide_with(&e2.collider)
                    {
                        continue;
                    }
                    // cheap bounding circle test before the real thing
                    let reach = e1.collider.shape.circumradius() + e2.collider.shape.circumradius();
                    if (e2.body.position - e1.body.position).mag_sq() > reach * reach {
                        continue;
                    }
                    narrowphase::manifold(
                        &e1.body,
                        &e1.collider.shape,
                        &e2.body,
                        &e2.collider.shape,
                    )
                }
            };
            if contacts.is_empty() {
                continue;
            }

            let (mat1, mat2) = (e1.collider.material, e2.collider.material);
            let created = self.pairs.touch(key, contacts, || {
                ContactSolver::new(
                    key.bodies(),
                    mat1.elasticity_with(&mat2),
                    mat1.friction_with(&mat2),
                )
            });
            if created {
                log::debug!("Bodies {:?} started touching", key.bodies());
                report.new_pairs += 1;
            }

            // touching something awake wakes sleeping bodies up
            for k in [k1, k2] {
                if let Some(entry) = self.bodies.get_mut(k.0) {
                    if !entry.body.awake && entry.body.sees_forces() {
                        log::debug!("Body {:?} woke up", k);
                        entry.body.set_awake(true);
                    }
                }
            }
        }

        // manifolds given for pairs that no longer exist
        self.pending_manifolds.clear();

        report.removed_pairs = self.pairs.end_step();
        if report.removed_pairs > 0 {
            log::debug!("{} pairs stopped touching", report.removed_pairs);
        }
    }

    /// Track how long bodies have been resting and put everything to sleep
    /// once all awake bodies have rested long enough and nothing is penetrating.
    ///
    /// Returns true if bodies were put to sleep.
    fn update_sleep(&mut self, dt: f64, position_solved: bool) -> bool {
        let sleep = match self.params.sleep {
            Some(sleep) => sleep,
            None => return false,
        };
        let lin_tol_sq = sleep.linear_tolerance * sleep.linear_tolerance;
        let ang_tol_sq = sleep.angular_tolerance * sleep.angular_tolerance;

        let mut min_sleep_time = f64::INFINITY;
        for (_, entry) in self.bodies.iter_mut() {
            let body = &mut entry.body;
            if !body.is_awake() {
                continue;
            }
            if body.velocity.linear.mag_sq() > lin_tol_sq
                || body.velocity.angular * body.velocity.angular > ang_tol_sq
            {
                body.sleep_time = 0.0;
            } else {
                body.sleep_time += dt;
            }
            min_sleep_time = min_sleep_time.min(body.sleep_time);
        }

        if !(position_solved
            && min_sleep_time.is_finite()
            && min_sleep_time >= sleep.time_to_sleep)
        {
            return false;
        }

        log::debug!("Everything is resting, putting bodies to sleep");
        for (_, entry) in self.bodies.iter_mut() {
            if entry.body.is_awake() {
                entry.body.set_awake(false);
            }
        }
        true
    }
}

/// Borrow the two bodies of a pair mutably at the same time.
fn pair_bodies(
    bodies: &mut td::Arena<BodyEntry>,
    key: PairKey,
) -> Option<(&mut RigidBody, &mut RigidBody)> {
    let [k1, k2] = key.bodies();
    match bodies.get2_mut(k1.0, k2.0) {
        (Some(e1), Some(e2)) => Some((&mut e1.body, &mut e2.body)),
        _ => None,
    }
}
