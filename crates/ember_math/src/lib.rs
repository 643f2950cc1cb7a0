// Re-export glam for convenience
pub use glam::*;

// ember math types
mod extent;
mod ray;
mod slab;

pub use extent::{Extent, PlaneSet, PLANE_COUNT, PLANE_NORMALS};
pub use ray::Ray;
pub use slab::Slab;
