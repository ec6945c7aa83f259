mod shape;
pub use shape::{Collider, Material, Shape};

pub mod narrowphase;
pub use narrowphase::manifold;
