//! External accelerations applied to awake bodies at the start of every step.

use crate::math as m;

/// Acceleration as a function of position.
///
/// Any `Fn(Vec2) -> Vec2` closure is a force field too.
pub trait ForceField {
    fn value_at(&self, position: m::Vec2) -> m::Vec2;

    /// Combine with another field by adding their values.
    fn plus<F: ForceField>(self, other: F) -> Sum<Self, F>
    where
        Self: Sized,
    {
        Sum(self, other)
    }
}

impl<F> ForceField for F
where
    F: Fn(m::Vec2) -> m::Vec2,
{
    fn value_at(&self, position: m::Vec2) -> m::Vec2 {
        self(position)
    }
}

/// No acceleration anywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoneField;
impl ForceField for NoneField {
    fn value_at(&self, _: m::Vec2) -> m::Vec2 {
        m::Vec2::zero()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Sum<F1, F2>(pub F1, pub F2);
impl<F1: ForceField, F2: ForceField> ForceField for Sum<F1, F2> {
    fn value_at(&self, pos: m::Vec2) -> m::Vec2 {
        self.0.value_at(pos) + self.1.value_at(pos)
    }
}

/// The same acceleration everywhere.
#[derive(Clone, Copy, Debug)]
pub struct Gravity(pub m::Vec2);
impl ForceField for Gravity {
    fn value_at(&self, _: m::Vec2) -> m::Vec2 {
        self.0
    }
}

/// Attraction towards a point, weakening with squared distance.
/// Negative `strength` repels instead.
#[derive(Clone, Copy, Debug)]
pub struct PointGravity {
    pub source: m::Vec2,
    /// Acceleration magnitude right next to the source.
    pub strength: f64,
    /// Scales how fast the pull decays with distance.
    pub falloff: f64,
}
impl ForceField for PointGravity {
    fn value_at(&self, pos: m::Vec2) -> m::Vec2 {
        let to_source = self.source - pos;
        let dist_sq = to_source.mag_sq();
        if dist_sq == 0.0 {
            return m::Vec2::zero();
        }
        // divisor is 1 at the source so the strength stays bounded
        let magnitude = self.strength / (1.0 + dist_sq * self.falloff);
        to_source * (magnitude / dist_sq.sqrt())
    }
}
