use crate::math::{self as m, Unit};

/// Identifies which features of two shapes produced a contact,
/// so that the same contact can be recognized in the next frame's manifold.
///
/// Contacts involving circles use `FeatureId(0)`.
/// Polygon vertex contacts pack the owning shape (0 or 1) in the high 16 bits
/// and the vertex index in the low 16 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub u32);

impl FeatureId {
    #[inline]
    pub const fn vertex(owner: u16, index: u16) -> Self {
        FeatureId(((owner as u32) << 16) | index as u32)
    }
}

/// A single point of contact between two bodies.
///
/// Created by the narrow phase (or any other source of manifolds) with
/// `point`, `normal`, `depth` and `hash` set. Everything else is working state
/// written by the [`ContactSolver`][super::ContactSolver].
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    /// Contact position in world space.
    pub point: m::Vec2,
    /// The normal, facing away from body 1 towards body 2.
    pub normal: Unit<m::Vec2>,
    /// Penetration depth, positive when the shapes overlap.
    pub depth: f64,
    pub hash: FeatureId,

    /// Offset from body 1's center to the contact point in world space.
    pub r1: m::Vec2,
    /// Offset from body 2's center to the contact point in world space.
    pub r2: m::Vec2,
    /// `r1` in body 1's unrotated frame.
    pub r1_local: m::Vec2,
    /// `r2` in body 2's unrotated frame.
    pub r2_local: m::Vec2,
    /// Effective mass along the normal.
    pub emn: f64,
    /// Effective mass along the tangent.
    pub emt: f64,
    /// Target velocity bias from restitution.
    pub bounce: f64,
    /// Accumulated normal impulse. Never negative.
    pub lambda_normal: f64,
    /// Accumulated friction impulse.
    pub lambda_tangential: f64,
}

impl Contact {
    pub fn new(point: m::Vec2, normal: Unit<m::Vec2>, depth: f64, hash: FeatureId) -> Self {
        Contact {
            point,
            normal,
            depth,
            hash,
            r1: m::Vec2::zero(),
            r2: m::Vec2::zero(),
            r1_local: m::Vec2::zero(),
            r2_local: m::Vec2::zero(),
            emn: 0.0,
            emt: 0.0,
            bounce: 0.0,
            lambda_normal: 0.0,
            lambda_tangential: 0.0,
        }
    }

    /// Tangent direction used for friction.
    #[inline]
    pub fn tangent(&self) -> m::Vec2 {
        m::left_normal(*self.normal)
    }

    /// The accumulated impulse in world space.
    #[inline]
    pub fn impulse(&self) -> m::Vec2 {
        world_impulse(self.normal, self.lambda_normal, self.lambda_tangential)
    }
}

/// Rotate a (normal, tangential) impulse pair into world space.
#[inline]
pub(crate) fn world_impulse(n: Unit<m::Vec2>, lambda_n: f64, lambda_t: f64) -> m::Vec2 {
    m::Vec2::new(
        lambda_n * n.x - lambda_t * n.y,
        lambda_t * n.x + lambda_n * n.y,
    )
}
