//! Geometric primitives.
//!
//! The set of shapes is closed, so a primitive is a plain struct holding a
//! [`Shape`] variant rather than a trait object.

use crate::{hit::HIT_EPSILON, Result, SceneError};
use ember_math::{Extent, PlaneSet, Ray, Slab, Vec3};

/// Shape parameters, relative to the primitive's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
}

/// A shape placed in the world with a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    /// World position (the sphere centre)
    pub position: Vec3,
    /// Index into the scene's material list
    pub material: usize,
    pub shape: Shape,
}

impl Primitive {
    /// Create a sphere primitive.
    pub fn sphere(position: Vec3, radius: f32, material: usize) -> Self {
        Self {
            position,
            material,
            shape: Shape::Sphere { radius },
        }
    }

    /// Check that the shape parameters describe a real surface.
    pub fn validate(&self) -> Result<()> {
        if !self.position.is_finite() {
            return Err(SceneError::InvalidShape(format!(
                "non-finite position {}",
                self.position
            )));
        }
        match self.shape {
            Shape::Sphere { radius } if !(radius.is_finite() && radius > 0.0) => Err(
                SceneError::InvalidShape(format!("sphere radius must be positive, got {radius}")),
            ),
            Shape::Sphere { .. } => Ok(()),
        }
    }

    /// Distance along `ray` to the nearest surface crossing at or beyond
    /// [`HIT_EPSILON`], or a negative value on a miss.
    ///
    /// Rays starting inside a sphere report the exit point.
    pub fn intersect(&self, ray: &Ray) -> f32 {
        match self.shape {
            Shape::Sphere { radius } => intersect_sphere(self.position, radius, ray),
        }
    }

    /// Bound the primitive along the slabs in `planes`.
    pub fn extent(&self, planes: PlaneSet) -> Extent {
        match self.shape {
            Shape::Sphere { radius } => Extent::from_fn(planes, |normal| {
                let d = normal.dot(self.position);
                Slab::new(d - radius, d + radius)
            }),
        }
    }

    /// Unit outward normal at a point on the surface.
    pub fn normal(&self, point: Vec3) -> Vec3 {
        match self.shape {
            Shape::Sphere { .. } => (point - self.position).try_normalize().unwrap_or(Vec3::Y),
        }
    }
}

fn intersect_sphere(center: Vec3, radius: f32, ray: &Ray) -> f32 {
    let oc = ray.origin - center;
    let a = ray.direction.length_squared();
    let b = 2.0 * ray.direction.dot(oc);
    let c = oc.length_squared() - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return -1.0;
    }

    // Citardauq form: avoids cancellation when b is large
    let q = if b > 0.0 {
        -0.5 * (b + discriminant.sqrt())
    } else {
        -0.5 * (b - discriminant.sqrt())
    };
    if q == 0.0 {
        return -1.0;
    }

    let (t0, t1) = {
        let (r0, r1) = (q / a, c / q);
        if r0 <= r1 {
            (r0, r1)
        } else {
            (r1, r0)
        }
    };

    if t0 >= HIT_EPSILON {
        t0
    } else if t1 >= HIT_EPSILON {
        t1
    } else {
        -1.0
    }
}
