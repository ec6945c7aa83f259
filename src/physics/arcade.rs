//! Arcade-style separation for circles.
//!
//! Instead of iterating impulses, two overlapping bodies exchange velocities
//! along the collision normal in closed form and are pushed apart in one go.
//! Bodies here don't rotate and boxes are axis-aligned.

use super::{PhysicsError, Shape};
use crate::{
    event::EventSink,
    math::{self as m, Unit},
};

use thunderdome as td;

/// A lightweight body for arcade separation.
#[derive(Clone, Copy, Debug)]
pub struct ArcadeBody {
    pub center: m::Vec2,
    /// Circle or axis-aligned box.
    pub shape: Shape,
    pub velocity: m::Vec2,
    pub mass: f64,
    /// Velocity multiplier applied per axis after a collision.
    pub bounce: m::Vec2,
    /// Immovable bodies are never moved or sped up by separation.
    pub immovable: bool,
    /// Whether collisions involving this body fire collide events.
    pub on_collide: bool,
    /// Whether overlaps involving this body fire overlap events.
    pub on_overlap: bool,
}

impl ArcadeBody {
    fn from_shape(shape: Shape) -> Self {
        ArcadeBody {
            center: m::Vec2::zero(),
            shape,
            velocity: m::Vec2::zero(),
            mass: 1.0,
            bounce: m::Vec2::one(),
            immovable: false,
            on_collide: false,
            on_overlap: false,
        }
    }

    pub fn new_circle(radius: f64) -> Self {
        Self::from_shape(Shape::Circle { r: radius })
    }

    pub fn new_box(width: f64, height: f64) -> Self {
        Self::from_shape(Shape::Rect {
            hw: width / 2.0,
            hh: height / 2.0,
        })
    }

    pub fn with_position(mut self, center: impl Into<[f64; 2]>) -> Self {
        let [x, y] = center.into();
        self.center = m::Vec2::new(x, y);
        self
    }

    pub fn with_velocity(mut self, velocity: impl Into<[f64; 2]>) -> Self {
        let [x, y] = velocity.into();
        self.velocity = m::Vec2::new(x, y);
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_bounce(mut self, x: f64, y: f64) -> Self {
        self.bounce = m::Vec2::new(x, y);
        self
    }

    pub fn immovable(mut self) -> Self {
        self.immovable = true;
        self
    }

    /// Opt into collide and overlap events.
    pub fn with_events(mut self, on_collide: bool, on_overlap: bool) -> Self {
        self.on_collide = on_collide;
        self.on_overlap = on_overlap;
        self
    }

    #[inline]
    fn inv_mass(&self) -> f64 {
        if self.immovable || !(self.mass > 0.0) {
            0.0
        } else {
            1.0 / self.mass
        }
    }
}

/// Outcome of [`separate_circle`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Separation {
    /// The bodies don't overlap.
    Apart,
    /// The bodies overlap by the given depth but were left alone,
    /// either because only an overlap test was asked for
    /// or because neither body can move.
    Overlapping { overlap: f64 },
    /// The bodies overlapped and were pushed apart along `normal`
    /// (facing from body 1 towards body 2).
    Separated { overlap: f64, normal: Unit<m::Vec2> },
}

impl Separation {
    #[inline]
    pub fn touched(&self) -> bool {
        !matches!(self, Separation::Apart)
    }
}

/// Separate two bodies where at least one is a circle.
///
/// Returns None for two boxes, which this doesn't handle.
pub fn separate_circle(
    body1: &mut ArcadeBody,
    body2: &mut ArcadeBody,
    overlap_only: bool,
) -> Option<Separation> {
    let (overlap, normal) = penetration(body1, body2)?;
    if overlap <= 0.0 {
        return Some(Separation::Apart);
    }
    if overlap_only || (body1.immovable && body2.immovable) {
        return Some(Separation::Overlapping { overlap });
    }

    exchange_velocities(body1, body2, normal);

    let (share1, share2) = match (body1.immovable, body2.immovable) {
        (false, false) => (0.5, 0.5),
        (false, true) => (1.0, 0.0),
        (true, false) => (0.0, 1.0),
        (true, true) => (0.0, 0.0),
    };
    body1.center -= *normal * (overlap * share1);
    body2.center += *normal * (overlap * share2);

    Some(Separation::Separated { overlap, normal })
}

/// Overlap depth (negative when apart) and normal from body 1 to body 2.
fn penetration(body1: &ArcadeBody, body2: &ArcadeBody) -> Option<(f64, Unit<m::Vec2>)> {
    use Shape::*;
    match (body1.shape, body2.shape) {
        (Circle { r: r1 }, Circle { r: r2 }) => {
            let d = body2.center - body1.center;
            let dist = d.mag();
            let normal = if dist < 1e-9 {
                Unit::unit_x()
            } else {
                Unit::new_unchecked(d / dist)
            };
            Some((r1 + r2 - dist, normal))
        }
        (Circle { r }, Rect { hw, hh }) => {
            let (overlap, n) = circle_box(body1.center, r, body2.center, hw, hh);
            Some((overlap, -n))
        }
        (Rect { hw, hh }, Circle { r }) => Some(circle_box(body2.center, r, body1.center, hw, hh)),
        (Rect { .. }, Rect { .. }) => None,
    }
}

/// Overlap and normal from the box towards the circle,
/// using the point on the box nearest to the circle's center.
fn circle_box(
    circle: m::Vec2,
    r: f64,
    box_center: m::Vec2,
    hw: f64,
    hh: f64,
) -> (f64, Unit<m::Vec2>) {
    let d = circle - box_center;
    let nearest = m::Vec2::new(m::clamp(d.x, -hw, hw), m::clamp(d.y, -hh, hh));
    let diff = d - nearest;
    if diff.mag_sq() > 0.0 {
        let dist = diff.mag();
        return (r - dist, Unit::new_unchecked(diff / dist));
    }

    // center inside the box, push out through the nearest face
    let to_x_face = hw - d.x.abs();
    let to_y_face = hh - d.y.abs();
    let sign = |v: f64| if v < 0.0 { -1.0 } else { 1.0 };
    if to_x_face < to_y_face {
        (to_x_face + r, Unit::new_unchecked(m::Vec2::new(sign(d.x), 0.0)))
    } else {
        (to_y_face + r, Unit::new_unchecked(m::Vec2::new(0.0, sign(d.y))))
    }
}

fn exchange_velocities(body1: &mut ArcadeBody, body2: &mut ArcadeBody, normal: Unit<m::Vec2>) {
    let n = *normal;
    let (w1, w2) = (body1.inv_mass(), body2.inv_mass());
    let v1n = body1.velocity.dot(n);
    let v2n = body2.velocity.dot(n);
    let closing = v1n - v2n;
    if closing <= 0.0 || w1 + w2 == 0.0 {
        return;
    }

    // elastic collision along the normal, tangential parts unchanged
    let v1t = body1.velocity - n * v1n;
    let v2t = body2.velocity - n * v2n;
    if !body1.immovable {
        let v1n_new = v1n - 2.0 * closing * w1 / (w1 + w2);
        body1.velocity = (v1t + n * v1n_new) * body1.bounce;
    }
    if !body2.immovable {
        let v2n_new = v2n + 2.0 * closing * w2 / (w1 + w2);
        body2.velocity = (v2t + n * v2n_new) * body2.bounce;
    }

    // per-axis bounce can leave the bodies still closing in on one axis.
    // flip the first movable velocity component that heads into the other body
    for axis in 0..2 {
        let s = component(n, axis);
        if s == 0.0 {
            continue;
        }
        let v1 = component(body1.velocity, axis);
        let v2 = component(body2.velocity, axis);
        if (v1 - v2) * s <= 0.0 {
            continue;
        }
        if !body1.immovable && v1 * s > 0.0 {
            *component_mut(&mut body1.velocity, axis) = -v1;
            break;
        }
        if !body2.immovable && v2 * s < 0.0 {
            *component_mut(&mut body2.velocity, axis) = -v2;
            break;
        }
    }
}

#[inline]
fn component(v: m::Vec2, axis: usize) -> f64 {
    if axis == 0 {
        v.x
    } else {
        v.y
    }
}

#[inline]
fn component_mut(v: &mut m::Vec2, axis: usize) -> &mut f64 {
    if axis == 0 {
        &mut v.x
    } else {
        &mut v.y
    }
}

//
// World
//

/// Key type to look up a body stored in an arcade world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArcadeKey(td::Index);

impl ArcadeKey {
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArcadeEventKind {
    Collide,
    Overlap,
}

/// Notification that two arcade bodies collided or overlapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArcadeEvent {
    pub kind: ArcadeEventKind,
    pub bodies: [ArcadeKey; 2],
}

/// Storage for arcade bodies plus the listeners interested in their collisions.
#[derive(Debug, Default)]
pub struct ArcadeWorld {
    bodies: td::Arena<ArcadeBody>,
    events: EventSink<ArcadeEvent>,
}

impl ArcadeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: ArcadeBody) -> ArcadeKey {
        ArcadeKey(self.bodies.insert(body))
    }

    pub fn remove(&mut self, key: ArcadeKey) -> Option<ArcadeBody> {
        self.bodies.remove(key.0)
    }

    #[inline]
    pub fn get(&self, key: ArcadeKey) -> Option<&ArcadeBody> {
        self.bodies.get(key.0)
    }

    #[inline]
    pub fn get_mut(&mut self, key: ArcadeKey) -> Option<&mut ArcadeBody> {
        self.bodies.get_mut(key.0)
    }

    /// Register a listener for collide events.
    pub fn on_collide(&mut self, mut listener: impl FnMut(&ArcadeEvent) + 'static) {
        self.events.subscribe(move |evt| {
            if evt.kind == ArcadeEventKind::Collide {
                listener(evt);
            }
        });
    }

    /// Register a listener for overlap events.
    pub fn on_overlap(&mut self, mut listener: impl FnMut(&ArcadeEvent) + 'static) {
        self.events.subscribe(move |evt| {
            if evt.kind == ArcadeEventKind::Overlap {
                listener(evt);
            }
        });
    }

    /// Separate two bodies if they overlap.
    /// Returns whether they were touching.
    ///
    /// Collide listeners are notified before this returns if either body has
    /// `on_collide` set. If neither body can move, this counts as an overlap instead.
    pub fn collide(&mut self, a: ArcadeKey, b: ArcadeKey) -> Result<bool, PhysicsError> {
        self.separate(a, b, false)
    }

    /// Check whether two bodies overlap without moving them.
    /// Overlap listeners are notified if either body has `on_overlap` set.
    pub fn overlap(&mut self, a: ArcadeKey, b: ArcadeKey) -> Result<bool, PhysicsError> {
        self.separate(a, b, true)
    }

    fn separate(
        &mut self,
        a: ArcadeKey,
        b: ArcadeKey,
        overlap_only: bool,
    ) -> Result<bool, PhysicsError> {
        if a == b {
            return Err(PhysicsError::SelfPair);
        }
        let (body1, body2) = match self.bodies.get2_mut(a.0, b.0) {
            (Some(b1), Some(b2)) => (b1, b2),
            _ => return Err(PhysicsError::UnknownBody),
        };

        let sep = separate_circle(body1, body2, overlap_only)
            .ok_or(PhysicsError::UnsupportedShapes)?;
        let kind = match sep {
            Separation::Apart => None,
            Separation::Overlapping { .. } if body1.on_overlap || body2.on_overlap => {
                Some(ArcadeEventKind::Overlap)
            }
            Separation::Separated { .. } if body1.on_collide || body2.on_collide => {
                Some(ArcadeEventKind::Collide)
            }
            _ => None,
        };
        if let Some(kind) = kind {
            self.events.push(ArcadeEvent {
                kind,
                bodies: [a, b],
            });
            self.events.flush();
        }

        Ok(sep.touched())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    fn approx_eq(a: m::Vec2, b: m::Vec2) -> bool {
        (a - b).mag() < 1e-9
    }

    #[test]
    fn equal_mass_head_on_swap() {
        let mut a = ArcadeBody::new_circle(1.0).with_velocity([5.0, 0.0]);
        let mut b = ArcadeBody::new_circle(1.0).with_position([1.0, 0.0]);

        let sep = separate_circle(&mut a, &mut b, false).unwrap();
        assert!(matches!(sep, Separation::Separated { overlap, .. } if (overlap - 1.0).abs() < 1e-12));
        assert!(approx_eq(a.velocity, m::Vec2::zero()));
        assert!(approx_eq(b.velocity, m::Vec2::new(5.0, 0.0)));
        // overlap split evenly
        assert!(approx_eq(a.center, m::Vec2::new(-0.5, 0.0)));
        assert!(approx_eq(b.center, m::Vec2::new(1.5, 0.0)));
    }

    #[test]
    fn bounce_off_immovable() {
        let mut a = ArcadeBody::new_circle(1.0).with_velocity([5.0, 0.0]);
        let wall = ArcadeBody::new_circle(1.0).with_position([1.0, 0.0]).immovable();
        let mut b = wall;

        separate_circle(&mut a, &mut b, false).unwrap();
        assert!(approx_eq(a.velocity, m::Vec2::new(-5.0, 0.0)));
        assert!(approx_eq(a.center, m::Vec2::new(-1.0, 0.0)));
        assert_eq!(b.center, wall.center);
        assert_eq!(b.velocity, wall.velocity);
    }

    #[test]
    fn immovable_pair_and_overlap_only_leave_bodies_alone() {
        let a0 = ArcadeBody::new_circle(1.0).with_velocity([1.0, 0.0]);
        let b0 = ArcadeBody::new_circle(1.0).with_position([1.5, 0.0]);

        let (mut a, mut b) = (a0.immovable(), b0.immovable());
        let sep = separate_circle(&mut a, &mut b, false).unwrap();
        assert_eq!(sep, Separation::Overlapping { overlap: 0.5 });
        assert_eq!((a.center, a.velocity), (a0.center, a0.velocity));

        let (mut a, mut b) = (a0, b0);
        let sep = separate_circle(&mut a, &mut b, true).unwrap();
        assert!(sep.touched());
        assert_eq!((a.center, a.velocity), (a0.center, a0.velocity));
        assert_eq!((b.center, b.velocity), (b0.center, b0.velocity));

        let mut far = b0.with_position([3.0, 0.0]);
        let sep = separate_circle(&mut a, &mut far, false).unwrap();
        assert_eq!(sep, Separation::Apart);
        assert!(!sep.touched());
    }

    #[test]
    fn circle_lands_on_box() {
        let mut ball = ArcadeBody::new_circle(0.5)
            .with_position([0.0, 1.3])
            .with_velocity([1.0, -3.0])
            .with_bounce(1.0, 0.5);
        let mut ground = ArcadeBody::new_box(4.0, 2.0).immovable();

        let sep = separate_circle(&mut ball, &mut ground, false).unwrap();
        match sep {
            Separation::Separated { overlap, normal } => {
                assert!((overlap - 0.2).abs() < 1e-12);
                assert!(approx_eq(*normal, m::Vec2::new(0.0, -1.0)));
            }
            other => panic!("expected separation, got {:?}", other),
        }
        assert!(approx_eq(ball.velocity, m::Vec2::new(1.0, 1.5)));
        assert!(approx_eq(ball.center, m::Vec2::new(0.0, 1.5)));
    }

    #[test]
    fn circle_inside_box_exits_nearest_face() {
        let mut ground = ArcadeBody::new_box(4.0, 2.0).immovable();
        let mut ball = ArcadeBody::new_circle(0.5)
            .with_position([1.5, 0.8])
            .with_velocity([0.0, 2.0]);

        // box first this time
        let sep = separate_circle(&mut ground, &mut ball, false).unwrap();
        assert!(matches!(sep, Separation::Separated { overlap, .. } if (overlap - 0.7).abs() < 1e-12));
        assert!(approx_eq(ball.center, m::Vec2::new(1.5, 1.5)));
        // already moving away, velocity untouched
        assert_eq!(ball.velocity, m::Vec2::new(0.0, 2.0));
    }

    #[test]
    fn still_closing_axis_gets_flipped() {
        // a heavy body moving left hits a light one that loses most of its x bounce
        let mut light = ArcadeBody::new_circle(1.0).with_bounce(0.25, 1.0);
        let mut heavy = ArcadeBody::new_circle(1.0)
            .with_position([1.5, 0.0])
            .with_velocity([-3.0, 0.0])
            .with_mass(1e6);

        separate_circle(&mut light, &mut heavy, false).unwrap();
        assert!(light.velocity.x < 0.0);
        // without the fix the heavy body would keep running into the light one
        assert!(heavy.velocity.x > 0.0);
        assert!(light.velocity.x - heavy.velocity.x <= 0.0);
    }

    #[test]
    fn boxes_are_not_handled() {
        let mut a = ArcadeBody::new_box(1.0, 1.0);
        let mut b = ArcadeBody::new_box(1.0, 1.0);
        assert_eq!(separate_circle(&mut a, &mut b, false), None);
    }

    #[test]
    fn world_notifies_listeners() {
        let mut world = ArcadeWorld::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            world.on_collide(move |evt| seen.borrow_mut().push(*evt));
        }
        {
            let seen = seen.clone();
            world.on_overlap(move |evt| seen.borrow_mut().push(*evt));
        }

        let a = world.insert(
            ArcadeBody::new_circle(1.0)
                .with_velocity([5.0, 0.0])
                .with_events(true, false),
        );
        let b = world.insert(ArcadeBody::new_circle(1.0).with_position([1.0, 0.0]));

        assert_eq!(world.overlap(a, b), Ok(true));
        assert!(seen.borrow().is_empty());

        assert_eq!(world.collide(a, b), Ok(true));
        assert_eq!(
            *seen.borrow(),
            vec![ArcadeEvent {
                kind: ArcadeEventKind::Collide,
                bodies: [a, b]
            }]
        );
        assert!(approx_eq(world.get(b).unwrap().velocity, m::Vec2::new(5.0, 0.0)));
        // separated now
        assert_eq!(world.collide(a, b), Ok(false));
        assert_eq!(seen.borrow().len(), 1);

        // two immovable bodies only overlap
        seen.borrow_mut().clear();
        let c = world.insert(ArcadeBody::new_circle(1.0).immovable().with_events(false, true));
        let d = world.insert(
            ArcadeBody::new_circle(1.0)
                .with_position([0.5, 0.0])
                .immovable(),
        );
        assert_eq!(world.collide(c, d), Ok(true));
        assert_eq!(
            *seen.borrow(),
            vec![ArcadeEvent {
                kind: ArcadeEventKind::Overlap,
                bodies: [c, d]
            }]
        );
    }

    #[test]
    fn world_errors() {
        let mut world = ArcadeWorld::new();
        let a = world.insert(ArcadeBody::new_circle(1.0));
        let b = world.insert(ArcadeBody::new_box(1.0, 1.0));
        let c = world.insert(ArcadeBody::new_box(1.0, 1.0));
        assert_eq!(world.collide(a, a), Err(PhysicsError::SelfPair));
        assert_eq!(world.collide(b, c), Err(PhysicsError::UnsupportedShapes));
        assert!(world.remove(c).is_some());
        assert_eq!(world.overlap(a, c), Err(PhysicsError::UnknownBody));
        assert!(world.get_mut(a).is_some());
    }
}
