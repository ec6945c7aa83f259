/// The physical shape of a collider.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub enum Shape {
    Circle {
        r: f64,
    },
    /// The rect collider stores its side lengths halved because this makes
    /// intersection tests easier.
    Rect {
        hw: f64,
        hh: f64,
    },
}

impl Shape {
    pub fn area(&self) -> f64 {
        match *self {
            Shape::Circle { r } => std::f64::consts::PI * r * r,
            Shape::Rect { hw, hh } => 4.0 * hw * hh,
        }
    }

    /// Moment of inertia per unit of density.
    pub fn second_moment_of_area(&self) -> f64 {
        // from https://en.wikipedia.org/wiki/List_of_second_moments_of_area
        match *self {
            Shape::Circle { r } => std::f64::consts::PI * r.powi(4) / 2.0,
            Shape::Rect { hw, hh } => (4.0 * hw * hh) * (hw * hw + hh * hh) / 3.0,
        }
    }

    /// Radius of the smallest circle around the origin containing the whole shape.
    pub fn circumradius(&self) -> f64 {
        match *self {
            Shape::Circle { r } => r,
            Shape::Rect { hw, hh } => (hw * hw + hh * hh).sqrt(),
        }
    }
}

/// Surface properties that determine how contacts between two colliders respond.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct Material {
    /// Coefficient of restitution between 0 and 1.
    pub elasticity: f64,
    /// Coulomb friction coefficient.
    pub friction: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            elasticity: 0.0,
            friction: 1.0,
        }
    }
}

impl Material {
    /// Elasticity used for a contact between two materials.
    /// The bouncier of the two wins.
    #[inline]
    pub fn elasticity_with(&self, other: &Material) -> f64 {
        self.elasticity.max(other.elasticity)
    }

    /// Friction used for a contact between two materials (geometric mean).
    #[inline]
    pub fn friction_with(&self, other: &Material) -> f64 {
        (self.friction.max(0.0) * other.friction.max(0.0)).sqrt()
    }
}

/// The collision geometry and surface of a body.
#[derive(Clone, Copy, Debug)]
pub struct Collider {
    pub shape: Shape,
    pub material: Material,
    /// Bitmask of the collision categories this collider belongs to.
    pub category: u32,
    /// Bitmask of the categories this collider collides with.
    pub mask: u32,
}

impl Collider {
    /// Create a circle collider from a radius.
    pub fn new_circle(radius: f64) -> Self {
        Self::from_shape(Shape::Circle { r: radius })
    }

    /// Create a rect collider with both sides set to the same length.
    pub fn new_square(side_length: f64) -> Self {
        Collider::new_rect(side_length, side_length)
    }

    /// Create a rect collider with two different side lengths.
    pub fn new_rect(width: f64, height: f64) -> Self {
        Self::from_shape(Shape::Rect {
            hw: width / 2.0,
            hh: height / 2.0,
        })
    }

    pub fn from_shape(shape: Shape) -> Self {
        Collider {
            shape,
            material: Material::default(),
            category: 1,
            mask: u32::MAX,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_layers(mut self, category: u32, mask: u32) -> Self {
        self.category = category;
        self.mask = mask;
        self
    }

    /// Check whether the collision masks of two colliders allow them to touch.
    #[inline]
    pub fn can_collide_with(&self, other: &Collider) -> bool {
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_mixing() {
        let bouncy = Material {
            elasticity: 0.9,
            friction: 0.25,
        };
        let sticky = Material {
            elasticity: 0.1,
            friction: 1.0,
        };
        assert_eq!(bouncy.elasticity_with(&sticky), 0.9);
        assert_eq!(sticky.elasticity_with(&bouncy), 0.9);
        assert!((bouncy.friction_with(&sticky) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn layer_masks() {
        let a = Collider::new_circle(1.0).with_layers(0b01, 0b10);
        let b = Collider::new_circle(1.0).with_layers(0b10, 0b01);
        let c = Collider::new_circle(1.0).with_layers(0b10, 0b10);
        assert!(a.can_collide_with(&b));
        assert!(!a.can_collide_with(&c));
        assert!(Collider::new_square(1.0).can_collide_with(&Collider::new_circle(1.0)));
    }

    #[test]
    fn unit_square_properties() {
        let s = Collider::new_square(1.0).shape;
        assert_eq!(s.area(), 1.0);
        assert!((s.second_moment_of_area() - 1.0 / 6.0).abs() < 1e-12);
    }
}
