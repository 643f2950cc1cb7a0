/// The region between two parallel planes `n·p = near` and `n·p = far`.
///
/// A slab only stores the two plane offsets; the shared normal lives in the
/// owning [`Extent`](crate::Extent)'s fixed plane table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slab {
    pub near: f32,
    pub far: f32,
}

impl Slab {
    /// Create a new slab given near and far plane offsets.
    pub fn new(near: f32, far: f32) -> Self {
        Self { near, far }
    }

    /// Returns the width of the slab (far - near).
    pub fn size(&self) -> f32 {
        self.far - self.near
    }

    /// Returns the offset halfway between the two planes.
    pub fn midpoint(&self) -> f32 {
        (self.near + self.far) * 0.5
    }

    /// Returns true if d is within the slab [near, far] (inclusive).
    pub fn contains(&self, d: f32) -> bool {
        self.near <= d && d <= self.far
    }

    /// Returns true if `other` lies entirely inside this slab, allowing
    /// `tolerance` of slack on both sides.
    pub fn encloses(&self, other: &Slab, tolerance: f32) -> bool {
        self.near <= other.near + tolerance && other.far <= self.far + tolerance
    }

    /// Creates a slab that surrounds two other slabs.
    pub fn surrounding(a: &Slab, b: &Slab) -> Slab {
        Slab::new(a.near.min(b.near), a.far.max(b.far))
    }

    /// A slab that contains nothing (near > far).
    pub const EMPTY: Slab = Slab {
        near: f32::INFINITY,
        far: f32::NEG_INFINITY,
    };
}
