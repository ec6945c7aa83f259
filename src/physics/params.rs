use super::PhysicsError;

/// Parameters to control aspects of the contact solver and the world step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct SolverParams {
    /// Maximum number of velocity iterations per step.
    ///
    /// Higher values improve stacking stability at a linear performance cost.
    pub velocity_iterations: u32,
    /// Condition to stop velocity iterations early.
    pub convergence: SolverConvergence,
    /// Maximum number of position correction passes per step.
    /// Passes stop early once every pair reports its penetration within tolerance.
    pub position_iterations: u32,
    /// Whether and how much to apply a warm start impulse.
    ///
    /// If a value is provided, the solver will apply the previous frame's impulses at the start,
    /// multiplied by the given value (which should be between 0 and 1).
    pub warm_start: Option<f64>,
    /// Fraction of the remaining penetration corrected per position pass.
    pub baumgarte: f64,
    /// Penetration allowed to remain uncorrected, to avoid jitter.
    pub slop: f64,
    /// Largest position correction a single contact may apply in one pass.
    pub max_linear_correction: f64,
    /// Velocity damping applied to every dynamic body, per second.
    pub damping: f64,
    /// Put bodies to sleep when everything comes to rest. `None` disables sleeping.
    pub sleep: Option<SleepParams>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            velocity_iterations: 8,
            convergence: SolverConvergence::FixedCount,
            position_iterations: 4,
            warm_start: Some(1.0),
            baumgarte: 0.28,
            slop: 0.0008,
            max_linear_correction: 1.0,
            damping: 0.0,
            sleep: None,
        }
    }
}

impl SolverParams {
    pub fn with_iterations(mut self, velocity: u32, position: u32) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    pub fn with_convergence(mut self, convergence: SolverConvergence) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn with_warm_start(mut self, warm_start: Option<f64>) -> Self {
        self.warm_start = warm_start;
        self
    }

    pub fn with_sleep(mut self, sleep: Option<SleepParams>) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Position error tolerance below which a pair counts as solved.
    #[inline]
    pub fn penetration_tolerance(&self) -> f64 {
        self.slop * 3.0
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        if self.velocity_iterations == 0 {
            return Err(PhysicsError::InvalidParams(
                "velocity_iterations must be at least 1",
            ));
        }
        if self.position_iterations == 0 {
            return Err(PhysicsError::InvalidParams(
                "position_iterations must be at least 1",
            ));
        }
        if !(self.baumgarte > 0.0 && self.baumgarte <= 1.0) {
            return Err(PhysicsError::InvalidParams("baumgarte must be in (0, 1]"));
        }
        if !(self.slop >= 0.0 && self.slop.is_finite()) {
            return Err(PhysicsError::InvalidParams("slop must be non-negative"));
        }
        if !(self.max_linear_correction > 0.0 && self.max_linear_correction.is_finite()) {
            return Err(PhysicsError::InvalidParams(
                "max_linear_correction must be positive",
            ));
        }
        if !(self.damping >= 0.0 && self.damping.is_finite()) {
            return Err(PhysicsError::InvalidParams("damping must be non-negative"));
        }
        if let Some(amount) = self.warm_start {
            if !(0.0..=1.0).contains(&amount) {
                return Err(PhysicsError::InvalidParams(
                    "warm_start factor must be in [0, 1]",
                ));
            }
        }
        if let Some(sleep) = self.sleep {
            if !(sleep.time_to_sleep >= 0.0
                && sleep.linear_tolerance >= 0.0
                && sleep.angular_tolerance >= 0.0)
            {
                return Err(PhysicsError::InvalidParams(
                    "sleep tolerances must be non-negative",
                ));
            }
        }
        Ok(())
    }
}

/// Condition to stop velocity iterations before the maximum count.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub enum SolverConvergence {
    /// Always run `velocity_iterations` passes.
    FixedCount,
    /// Stop once no impulse delta in a pass exceeds the given magnitude.
    MaxDelta(f64),
}

/// Tolerances for putting resting bodies to sleep.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct SleepParams {
    /// Linear speed under which a body counts as resting.
    pub linear_tolerance: f64,
    /// Angular speed (radians per second) under which a body counts as resting.
    pub angular_tolerance: f64,
    /// How long every body must rest before the world sleeps.
    pub time_to_sleep: f64,
}

impl Default for SleepParams {
    fn default() -> Self {
        Self {
            linear_tolerance: 0.5,
            angular_tolerance: 2.0_f64.to_radians(),
            time_to_sleep: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SolverParams::default().validate(), Ok(()));
        let with_sleep = SolverParams::default().with_sleep(Some(SleepParams::default()));
        assert_eq!(with_sleep.validate(), Ok(()));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = [
            SolverParams::default().with_iterations(0, 4),
            SolverParams::default().with_iterations(8, 0),
            SolverParams::default().with_warm_start(Some(1.5)),
            SolverParams::default().with_damping(-1.0),
            SolverParams {
                baumgarte: 0.0,
                ..Default::default()
            },
            SolverParams {
                slop: f64::NAN,
                ..Default::default()
            },
            SolverParams {
                max_linear_correction: 0.0,
                ..Default::default()
            },
        ];
        for params in bad {
            assert!(
                matches!(params.validate(), Err(PhysicsError::InvalidParams(_))),
                "{:?} should be invalid",
                params
            );
        }
    }

    #[cfg(feature = "serde-types")]
    #[test]
    fn deserialize_with_defaults() {
        let params: SolverParams = ron::from_str(
            "(velocity_iterations: 12, convergence: MaxDelta(0.001), sleep: Some((time_to_sleep: 1.0)))",
        )
        .unwrap();
        assert_eq!(params.velocity_iterations, 12);
        assert_eq!(params.convergence, SolverConvergence::MaxDelta(0.001));
        assert_eq!(params.position_iterations, 4);
        assert_eq!(params.baumgarte, 0.28);
        let sleep = params.sleep.unwrap();
        assert_eq!(sleep.time_to_sleep, 1.0);
        assert_eq!(sleep.linear_tolerance, 0.5);
    }
}
