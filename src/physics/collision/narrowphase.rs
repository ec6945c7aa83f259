//! Contact manifold generation between pairs of shapes.
//!
//! All functions here produce contacts with normals facing from the first
//! shape towards the second and positive penetration depths.

use super::Shape;
use crate::math::{self as m, Unit};
use crate::physics::{Contact, FeatureId, RigidBody};

use itertools::izip;

/// Compute the contact manifold between two shapes attached to bodies.
///
/// Returns an empty list if the shapes don't touch.
pub fn manifold(
    body1: &RigidBody,
    shape1: &Shape,
    body2: &RigidBody,
    shape2: &Shape,
) -> Vec<Contact> {
    use Shape::*;
    match (*shape1, *shape2) {
        (Circle { r: r1 }, Circle { r: r2 }) => {
            circle_circle(body1.position, r1, body2.position, r2)
                .into_iter()
                .collect()
        }
        (Rect { hw, hh }, Circle { r }) => rect_circle(body1, hw, hh, body2.position, r)
            .into_iter()
            .collect(),
        (Circle { r }, Rect { hw, hh }) => rect_circle(body2, hw, hh, body1.position, r)
            .map(flip_contact)
            .into_iter()
            .collect(),
        (Rect { hw: hw1, hh: hh1 }, Rect { hw: hw2, hh: hh2 }) => {
            rect_rect(&Poly::rect(body1, hw1, hh1), &Poly::rect(body2, hw2, hh2))
        }
    }
}

fn flip_contact(c: Contact) -> Contact {
    Contact::new(c.point, -c.normal, c.depth, c.hash)
}

//
// CIRCLE <-> CIRCLE
//

fn circle_circle(c1: m::Vec2, r1: f64, c2: m::Vec2, r2: f64) -> Option<Contact> {
    let t = c2 - c1;
    let dist_sq = t.mag_sq();
    let r_sum = r1 + r2;
    if dist_sq > r_sum * r_sum {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist < 1e-9 {
        // same position, consider penetration to be on x axis
        Unit::unit_x()
    } else {
        Unit::new_unchecked(t / dist)
    };
    // halfway between the two surface points
    let point = c1 + *normal * (0.5 * (dist + r1 - r2));

    Some(Contact::new(point, normal, r_sum - dist, FeatureId(0)))
}

//
// RECT <-> CIRCLE
//

fn rect_circle(
    rect: &RigidBody,
    hw: f64,
    hh: f64,
    circle_pos: m::Vec2,
    r: f64,
) -> Option<Contact> {
    // work in the rect's frame where it's axis-aligned at the origin
    let d = rect.local_point(circle_pos);
    let closest = m::Vec2::new(m::clamp(d.x, -hw, hw), m::clamp(d.y, -hh, hh));
    let diff = d - closest;

    let (normal_local, rect_surface, depth) = if diff.mag_sq() > 0.0 {
        // center is outside the rect
        let dist = diff.mag();
        if dist > r {
            return None;
        }
        (diff / dist, closest, r - dist)
    } else {
        // center is inside, push out through the nearest face
        let to_x_face = hw - d.x.abs();
        let to_y_face = hh - d.y.abs();
        let sign = |v: f64| if v < 0.0 { -1.0 } else { 1.0 };
        if to_x_face < to_y_face {
            (
                m::Vec2::new(sign(d.x), 0.0),
                m::Vec2::new(sign(d.x) * hw, d.y),
                to_x_face + r,
            )
        } else {
            (
                m::Vec2::new(0.0, sign(d.y)),
                m::Vec2::new(d.x, sign(d.y) * hh),
                to_y_face + r,
            )
        }
    };

    // circle's deepest point is one radius back from its center along the normal
    let circle_surface = d - normal_local * r;
    let point_local = (rect_surface + circle_surface) * 0.5;

    Some(Contact::new(
        rect.world_point(point_local),
        Unit::new_unchecked(m::rotate(normal_local, rect.angle)),
        depth,
        FeatureId(0),
    ))
}

//
// RECT <-> RECT
//

/// A separating line: points `p` with `dot(n, p) == d` lie on it,
/// and the polygon is on the side where `dot(n, p) < d`.
#[derive(Clone, Copy, Debug)]
struct Plane {
    n: m::Vec2,
    d: f64,
}

/// A rectangle as a convex polygon in world space, counterclockwise.
#[derive(Clone, Copy, Debug)]
struct Poly {
    verts: [m::Vec2; 4],
    planes: [Plane; 4],
}

impl Poly {
    fn rect(body: &RigidBody, hw: f64, hh: f64) -> Self {
        let verts = [
            m::Vec2::new(-hw, -hh),
            m::Vec2::new(hw, -hh),
            m::Vec2::new(hw, hh),
            m::Vec2::new(-hw, hh),
        ]
        .map(|v| body.world_point(v));

        let mut planes = [Plane {
            n: m::Vec2::zero(),
            d: 0.0,
        }; 4];
        // edge i goes from vertex i to the next one, outward normal on the right
        for (plane, a, b) in izip!(&mut planes, &verts, verts.iter().cycle().skip(1)) {
            let n = m::right_normal((*b - *a).normalized());
            *plane = Plane { n, d: n.dot(*a) };
        }

        Poly { verts, planes }
    }

    /// Signed distance of the vertex deepest behind the plane.
    fn distance_on_plane(&self, plane: &Plane) -> f64 {
        self.verts
            .iter()
            .map(|v| v.dot(plane.n) - plane.d)
            .fold(f64::INFINITY, f64::min)
    }

    fn contains_point(&self, p: m::Vec2) -> bool {
        self.planes.iter().all(|pl| pl.n.dot(p) - pl.d <= 0.0)
    }

    /// Containment test that ignores the planes facing away from `dir`.
    fn contains_point_partial(&self, p: m::Vec2, dir: m::Vec2) -> bool {
        self.planes
            .iter()
            .filter(|pl| pl.n.dot(dir) >= 0.0)
            .all(|pl| pl.n.dot(p) - pl.d <= 0.0)
    }
}

/// Find the axis of minimum separation among `planes` for `other`.
/// Returns the (non-positive) distance and index of the plane,
/// or None if some plane separates the two.
fn find_msa(other: &Poly, planes: &[Plane; 4]) -> Option<(f64, usize)> {
    let mut best = (f64::NEG_INFINITY, 0);
    for (i, plane) in planes.iter().enumerate() {
        let dist = other.distance_on_plane(plane);
        if dist > 0.0 {
            return None;
        }
        if dist > best.0 {
            best = (dist, i);
        }
    }
    Some(best)
}

fn rect_rect(poly1: &Poly, poly2: &Poly) -> Vec<Contact> {
    let (msa1, msa2) = match (find_msa(poly2, &poly1.planes), find_msa(poly1, &poly2.planes)) {
        (Some(msa1), Some(msa2)) => (msa1, msa2),
        _ => return Vec::new(),
    };

    // normal faces from poly1 to poly2
    let (n, dist) = if msa1.0 > msa2.0 {
        (poly1.planes[msa1.1].n, msa1.0)
    } else {
        (-poly2.planes[msa2.1].n, msa2.0)
    };
    let normal = Unit::new_unchecked(n);
    let depth = -dist;

    let mut contacts = Vec::new();
    for (i, v) in poly1.verts.iter().enumerate() {
        if poly2.contains_point(*v) {
            contacts.push(Contact::new(*v, normal, depth, FeatureId::vertex(0, i as u16)));
        }
    }
    for (i, v) in poly2.verts.iter().enumerate() {
        if poly1.contains_point(*v) {
            contacts.push(Contact::new(*v, normal, depth, FeatureId::vertex(1, i as u16)));
        }
    }
    if !contacts.is_empty() {
        return contacts;
    }

    // edges cross without any vertex being strictly inside,
    // relax the test to the planes facing the other polygon
    for (i, v) in poly1.verts.iter().enumerate() {
        if poly2.contains_point_partial(*v, -n) {
            contacts.push(Contact::new(*v, normal, depth, FeatureId::vertex(0, i as u16)));
        }
    }
    for (i, v) in poly2.verts.iter().enumerate() {
        if poly1.contains_point_partial(*v, n) {
            contacts.push(Contact::new(*v, normal, depth, FeatureId::vertex(1, i as u16)));
        }
    }
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Angle;

    fn body_at(x: f64, y: f64) -> RigidBody {
        RigidBody::new_static().with_position([x, y])
    }

    fn approx_eq(a: m::Vec2, b: m::Vec2) -> bool {
        (a - b).mag() < 1e-9
    }

    #[test]
    fn circle_circle_contact() {
        let c = Shape::Circle { r: 1.0 };
        let cs = manifold(&body_at(0.0, 0.0), &c, &body_at(1.0, 0.0), &c);
        assert_eq!(cs.len(), 1);
        assert!(approx_eq(cs[0].point, m::Vec2::new(0.5, 0.0)));
        assert!(approx_eq(*cs[0].normal, m::Vec2::unit_x()));
        assert!((cs[0].depth - 1.0).abs() < 1e-12);
        assert_eq!(cs[0].hash, FeatureId(0));

        assert!(manifold(&body_at(0.0, 0.0), &c, &body_at(2.5, 0.0), &c).is_empty());
    }

    #[test]
    fn circle_circle_different_radii() {
        let cs = manifold(
            &body_at(0.0, 0.0),
            &Shape::Circle { r: 2.0 },
            &body_at(0.0, 2.5),
            &Shape::Circle { r: 1.0 },
        );
        // surfaces at y = 2 and y = 1.5
        assert!(approx_eq(cs[0].point, m::Vec2::new(0.0, 1.75)));
        assert!(approx_eq(*cs[0].normal, m::Vec2::unit_y()));
        assert!((cs[0].depth - 0.5).abs() < 1e-12);
    }

    #[test]
    fn coincident_circles_use_x_axis() {
        let c = Shape::Circle { r: 0.5 };
        let cs = manifold(&body_at(3.0, 3.0), &c, &body_at(3.0, 3.0), &c);
        assert_eq!(cs.len(), 1);
        assert_eq!(*cs[0].normal, m::Vec2::unit_x());
        assert!((cs[0].depth - 1.0).abs() < 1e-12);
        assert!(m::is_finite(cs[0].point));
    }

    #[test]
    fn rect_circle_outside_and_flipped() {
        let rect = Shape::Rect { hw: 1.0, hh: 1.0 };
        let circ = Shape::Circle { r: 0.5 };
        let cs = manifold(&body_at(0.0, 0.0), &rect, &body_at(0.0, 1.25), &circ);
        assert_eq!(cs.len(), 1);
        assert!(approx_eq(*cs[0].normal, m::Vec2::unit_y()));
        assert!((cs[0].depth - 0.25).abs() < 1e-12);
        assert!(approx_eq(cs[0].point, m::Vec2::new(0.0, 0.875)));

        let flipped = manifold(&body_at(0.0, 1.25), &circ, &body_at(0.0, 0.0), &rect);
        assert_eq!(flipped.len(), 1);
        assert!(approx_eq(*flipped[0].normal, -m::Vec2::unit_y()));
        assert_eq!(flipped[0].depth, cs[0].depth);
        assert_eq!(flipped[0].point, cs[0].point);

        // near the corner but not touching it
        assert!(manifold(&body_at(0.0, 0.0), &rect, &body_at(1.4, 1.4), &circ).is_empty());
    }

    #[test]
    fn rect_circle_center_inside() {
        let rect = Shape::Rect { hw: 2.0, hh: 1.0 };
        let circ = Shape::Circle { r: 0.5 };
        let cs = manifold(&body_at(0.0, 0.0), &rect, &body_at(0.5, -0.75), &circ);
        assert_eq!(cs.len(), 1);
        assert!(approx_eq(*cs[0].normal, -m::Vec2::unit_y()));
        assert!((cs[0].depth - 0.75).abs() < 1e-12);
    }

    #[test]
    fn rotated_rect_circle() {
        let rect = Shape::Rect { hw: 1.0, hh: 1.0 };
        let circ = Shape::Circle { r: 0.5 };
        let rect_body = body_at(0.0, 0.0).with_angle(Angle::Deg(90.0));
        let cs = manifold(&rect_body, &rect, &body_at(1.4, 0.0), &circ);
        assert_eq!(cs.len(), 1);
        assert!(approx_eq(*cs[0].normal, m::Vec2::unit_x()));
        assert!((cs[0].depth - 0.1).abs() < 1e-9);
    }

    #[test]
    fn box_resting_on_ground() {
        let ground = Shape::Rect { hw: 5.0, hh: 0.5 };
        let bx = Shape::Rect { hw: 0.5, hh: 0.5 };
        let cs = manifold(&body_at(0.0, -0.5), &ground, &body_at(1.0, 0.49), &bx);
        assert_eq!(cs.len(), 2);
        for c in &cs {
            assert!(approx_eq(*c.normal, m::Vec2::unit_y()));
            assert!((c.depth - 0.01).abs() < 1e-9);
            // bottom vertices of the box
            assert!((c.point.y + 0.01).abs() < 1e-9);
            assert_eq!(c.hash.0 >> 16, 1);
        }
        assert_ne!(cs[0].hash, cs[1].hash);

        // same feature ids when the box moves a bit
        let cs2 = manifold(&body_at(0.0, -0.5), &ground, &body_at(1.1, 0.495), &bx);
        let ids = |cs: &[Contact]| cs.iter().map(|c| c.hash).collect::<Vec<_>>();
        assert_eq!(ids(&cs), ids(&cs2));
    }

    #[test]
    fn separated_rects() {
        let bx = Shape::Rect { hw: 0.5, hh: 0.5 };
        assert!(manifold(&body_at(0.0, 0.0), &bx, &body_at(1.01, 0.0), &bx).is_empty());
        let rotated = body_at(1.3, 0.0).with_angle(Angle::Deg(45.0));
        assert!(manifold(&body_at(0.0, 0.0), &bx, &rotated, &bx).is_empty());
    }

    #[test]
    fn rotated_corner_into_face() {
        let bx = Shape::Rect { hw: 0.5, hh: 0.5 };
        // corner of the diamond pokes 0.1 into the left box's right face
        let half_diag = 0.5 * 2.0_f64.sqrt();
        let diamond = body_at(0.5 + half_diag - 0.1, 0.0).with_angle(Angle::Deg(45.0));
        let cs = manifold(&body_at(0.0, 0.0), &bx, &diamond, &bx);
        assert_eq!(cs.len(), 1);
        assert!(approx_eq(*cs[0].normal, m::Vec2::unit_x()));
        assert!((cs[0].depth - 0.1).abs() < 1e-9);
        assert!(approx_eq(cs[0].point, m::Vec2::new(0.4, 0.0)));
        assert_eq!(cs[0].hash.0 >> 16, 1);
    }
}
