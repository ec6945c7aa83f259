//! Instrumentation hooks for observing the solver from outside.
//!
//! The solver itself never logs from inside its math.
//! Pass something implementing [`SolverTrace`] to
//! [`World::step_traced`][super::World::step_traced] to get called back at each stage.

use super::{ContactSolver, PairKey};

/// Lazily yields every active pair in solve order.
pub type SolverIter<'a, 'b> = &'a mut dyn Iterator<Item = (PairKey, &'b ContactSolver)>;

/// Callbacks invoked by the world during a step. All methods default to doing nothing.
///
/// The solver iterators are lazy, so ignoring them costs nothing.
pub trait SolverTrace {
    /// Called after warm starting, before the first velocity pass.
    fn solvers_initialized(&mut self, _solvers: SolverIter) {}

    /// Called after each velocity pass with the largest impulse delta of that pass
    /// over all pairs.
    fn velocity_iteration(&mut self, _iteration: u32, _max_delta: f64, _solvers: SolverIter) {}

    /// Called after each position pass with whether every pair reported convergence.
    fn position_iteration(&mut self, _iteration: u32, _solved: bool) {}

    /// Called once the step is complete with the final state of every active pair.
    fn step_finished(&mut self, _solvers: SolverIter) {}
}

/// A trace that ignores everything.
pub struct NoTrace;
impl SolverTrace for NoTrace {}

/// A trace that records per-iteration data, useful in tests and debug overlays.
#[derive(Clone, Debug)]
pub struct IterationLog {
    /// Largest impulse delta of every velocity pass, in order.
    pub velocity_deltas: Vec<f64>,
    /// Result of every position pass, in order.
    pub position_results: Vec<bool>,
    /// Smallest accumulated normal impulse seen after any velocity pass.
    pub min_lambda_normal: f64,
    /// Largest `|lambda_tangential| - friction * lambda_normal` seen after any velocity pass.
    pub max_friction_excess: f64,
    watch_invariants: bool,
}

impl Default for IterationLog {
    fn default() -> Self {
        Self {
            velocity_deltas: Vec::new(),
            position_results: Vec::new(),
            min_lambda_normal: f64::INFINITY,
            max_friction_excess: f64::NEG_INFINITY,
            watch_invariants: false,
        }
    }
}

impl IterationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also track the contact impulse invariants after every velocity pass.
    pub fn watching_invariants() -> Self {
        Self {
            watch_invariants: true,
            ..Self::default()
        }
    }

    /// Number of velocity passes until the largest delta fell to or below `threshold`,
    /// or the total number of passes if it never did.
    pub fn iterations_to(&self, threshold: f64) -> usize {
        self.velocity_deltas
            .iter()
            .position(|d| *d <= threshold)
            .map(|i| i + 1)
            .unwrap_or(self.velocity_deltas.len())
    }

    /// Forget recorded iterations but keep the invariant extremes.
    pub fn clear_iterations(&mut self) {
        self.velocity_deltas.clear();
        self.position_results.clear();
    }
}

impl SolverTrace for IterationLog {
    fn velocity_iteration(&mut self, _iteration: u32, max_delta: f64, solvers: SolverIter) {
        self.velocity_deltas.push(max_delta);
        if !self.watch_invariants {
            return;
        }
        for (_, solver) in solvers {
            for c in solver.contacts() {
                self.min_lambda_normal = self.min_lambda_normal.min(c.lambda_normal);
                self.max_friction_excess = self
                    .max_friction_excess
                    .max(c.lambda_tangential.abs() - solver.friction() * c.lambda_normal);
            }
        }
    }

    fn position_iteration(&mut self, _iteration: u32, solved: bool) {
        self.position_results.push(solved);
    }
}
