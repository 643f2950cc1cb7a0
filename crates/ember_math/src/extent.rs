use crate::{Ray, Slab, Vec3};

/// Number of slab directions an [`Extent`] can bound.
pub const PLANE_COUNT: usize = 7;

const INV_SQRT_3: f32 = 0.577_350_26;

/// Fixed unit normals of the seven slabs: the three axes followed by four
/// cube diagonals.
pub const PLANE_NORMALS: [Vec3; PLANE_COUNT] = [
    Vec3::X,
    Vec3::Y,
    Vec3::Z,
    Vec3::new(INV_SQRT_3, INV_SQRT_3, INV_SQRT_3),
    Vec3::new(-INV_SQRT_3, INV_SQRT_3, INV_SQRT_3),
    Vec3::new(-INV_SQRT_3, -INV_SQRT_3, INV_SQRT_3),
    Vec3::new(INV_SQRT_3, -INV_SQRT_3, INV_SQRT_3),
];

/// Bitset over the seven slab directions.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PlaneSet(u8);

impl PlaneSet {
    pub const NONE: PlaneSet = PlaneSet(0);
    /// The three axis-aligned slabs, enough for a plain bounding box.
    pub const AXES: PlaneSet = PlaneSet(0b000_0111);
    /// The four diagonal slabs.
    pub const DIAGONALS: PlaneSet = PlaneSet(0b111_1000);
    pub const ALL: PlaneSet = PlaneSet(0b111_1111);

    #[inline]
    pub fn contains(self, plane: usize) -> bool {
        plane < PLANE_COUNT && self.0 & (1 << plane) != 0
    }

    #[inline]
    pub fn insert(&mut self, plane: usize) {
        debug_assert!(plane < PLANE_COUNT, "plane index {plane} out of range");
        self.0 |= 1 << plane;
    }

    #[inline]
    pub fn union(self, other: PlaneSet) -> PlaneSet {
        PlaneSet(self.0 | other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the plane indices in this set, in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..PLANE_COUNT).filter(move |&i| self.contains(i))
    }
}

/// A bounding volume made of up to seven slabs (a 7-DOP).
///
/// Only the slabs flagged in `active` carry bounds. A primitive that just
/// needs a box uses [`PlaneSet::AXES`]; a tight leaf bound uses all seven.
/// For every active slab `near <= far`.
#[derive(Debug, Copy, Clone)]
pub struct Extent {
    slabs: [Slab; PLANE_COUNT],
    active: PlaneSet,
}

impl Extent {
    /// Returned by [`Extent::hit`] when the ray misses.
    pub const MISS: f32 = -1.0;

    /// An extent with no active slabs.
    pub const EMPTY: Extent = Extent {
        slabs: [Slab::EMPTY; PLANE_COUNT],
        active: PlaneSet::NONE,
    };

    /// Build an extent over `planes`, asking `f` for the slab along each
    /// plane normal.
    pub fn from_fn(planes: PlaneSet, mut f: impl FnMut(Vec3) -> Slab) -> Self {
        let mut extent = Self::EMPTY;
        for i in planes.iter() {
            extent.set_slab(i, f(PLANE_NORMALS[i]));
        }
        extent
    }

    /// Which slabs carry real bounds.
    #[inline]
    pub fn active(&self) -> PlaneSet {
        self.active
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// The slab along plane `i`, if it is active.
    #[inline]
    pub fn slab(&self, i: usize) -> Option<Slab> {
        self.active.contains(i).then(|| self.slabs[i])
    }

    /// Set the slab along plane `i` and mark it active.
    pub fn set_slab(&mut self, i: usize, slab: Slab) {
        debug_assert!(slab.near <= slab.far, "inverted slab {slab:?}");
        self.slabs[i] = slab;
        self.active.insert(i);
    }

    /// Grow this extent to also cover `other`.
    ///
    /// Slabs inactive in `other` are left alone, slabs inactive in `self`
    /// are copied over, and slabs active in both are widened.
    pub fn expand(&mut self, other: &Extent) {
        for i in other.active.iter() {
            if self.active.contains(i) {
                self.slabs[i] = Slab::surrounding(&self.slabs[i], &other.slabs[i]);
            } else {
                self.slabs[i] = other.slabs[i];
            }
        }
        self.active = self.active.union(other.active);
    }

    /// Consuming form of [`Extent::expand`], handy for folds.
    pub fn union(mut self, other: &Extent) -> Extent {
        self.expand(other);
        self
    }

    /// Centre of the axis-aligned part of the extent.
    ///
    /// Axes without an active slab contribute `0.0`.
    pub fn centroid(&self) -> Vec3 {
        let mid = |i: usize| self.slab(i).map_or(0.0, |s| s.midpoint());
        Vec3::new(mid(0), mid(1), mid(2))
    }

    /// True if every slab active in `self` is also active in `other` and
    /// encloses it to within `tolerance`.
    pub fn encloses(&self, other: &Extent, tolerance: f32) -> bool {
        self.active.iter().all(|i| {
            other.active.contains(i) && self.slabs[i].encloses(&other.slabs[i], tolerance)
        })
    }

    /// True if both extents have the same active set and every active slab
    /// agrees to within `tolerance`.
    pub fn abs_diff_eq(&self, other: &Extent, tolerance: f32) -> bool {
        self.active == other.active
            && self.active.iter().all(|i| {
                (self.slabs[i].near - other.slabs[i].near).abs() <= tolerance
                    && (self.slabs[i].far - other.slabs[i].far).abs() <= tolerance
            })
    }

    /// Intersect a ray with every active slab.
    ///
    /// Returns the entry distance along the ray (`0.0` when the origin is
    /// inside), or [`Extent::MISS`] when the slab intervals do not overlap.
    pub fn hit(&self, ray: &Ray) -> f32 {
        let mut t_near = 0.0_f32;
        let mut t_far = f32::MAX;

        for i in self.active.iter() {
            let normal = PLANE_NORMALS[i];
            let projected_origin = normal.dot(ray.origin);
            let denominator = normal.dot(ray.direction);

            // Parallel rays get a huge (but finite) inverse so the products
            // below stay well defined.
            let inverse = if denominator.abs() < f32::EPSILON {
                f32::MAX.sqrt()
            } else {
                1.0 / denominator
            };

            let mut candidate_near = (self.slabs[i].near - projected_origin) * inverse;
            let mut candidate_far = (self.slabs[i].far - projected_origin) * inverse;
            if inverse < 0.0 {
                std::mem::swap(&mut candidate_near, &mut candidate_far);
            }

            t_near = t_near.max(candidate_near);
            t_far = t_far.min(candidate_far);

            if t_near > t_far {
                return Self::MISS;
            }
        }

        t_near
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl PartialEq for Extent {
    /// Extents compare equal when they bound the same slabs with the same
    /// values; the contents of inactive slabs are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.abs_diff_eq(other, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere_extent(center: Vec3, radius: f32, planes: PlaneSet) -> Extent {
        Extent::from_fn(planes, |normal| {
            let d = normal.dot(center);
            Slab::new(d - radius, d + radius)
        })
    }

    fn sample_extents() -> Vec<Extent> {
        vec![
            Extent::EMPTY,
            sphere_extent(Vec3::ZERO, 1.0, PlaneSet::AXES),
            sphere_extent(Vec3::new(3.0, -2.0, 1.0), 0.5, PlaneSet::ALL),
            sphere_extent(Vec3::new(-4.0, 6.0, -1.5), 2.0, PlaneSet::DIAGONALS),
            sphere_extent(Vec3::new(0.25, 0.5, 10.0), 0.1, PlaneSet::ALL),
        ]
    }

    #[test]
    fn test_plane_set() {
        assert!(PlaneSet::AXES.contains(0));
        assert!(!PlaneSet::AXES.contains(3));
        assert_eq!(PlaneSet::AXES.union(PlaneSet::DIAGONALS), PlaneSet::ALL);
        assert_eq!(PlaneSet::DIAGONALS.iter().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
        assert!(PlaneSet::NONE.is_empty());
    }

    #[test]
    fn test_expand_idempotent() {
        for e in sample_extents() {
            let mut expanded = e;
            expanded.expand(&e);
            assert_eq!(expanded, e);
        }
    }

    #[test]
    fn test_expand_commutative() {
        let extents = sample_extents();
        for a in &extents {
            for b in &extents {
                assert!(a.union(b).abs_diff_eq(&b.union(a), 1e-6));
            }
        }
    }

    #[test]
    fn test_expand_associative() {
        let extents = sample_extents();
        for a in &extents {
            for b in &extents {
                for c in &extents {
                    let left = a.union(b).union(c);
                    let right = a.union(&b.union(c));
                    assert!(left.abs_diff_eq(&right, 1e-6));
                }
            }
        }
    }

    #[test]
    fn test_expand_copies_inactive_slabs() {
        let mut e = sphere_extent(Vec3::ZERO, 1.0, PlaneSet::AXES);
        let other = sphere_extent(Vec3::ZERO, 1.0, PlaneSet::DIAGONALS);
        e.expand(&other);

        assert_eq!(e.active(), PlaneSet::ALL);
        assert_eq!(e.slab(4), other.slab(4));
    }

    #[test]
    fn test_hit_entry_distance() {
        let e = sphere_extent(Vec3::new(0.0, 0.0, -5.0), 1.0, PlaneSet::AXES);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!((e.hit(&ray) - 4.0).abs() < 1e-5);

        // Pointing away
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(e.hit(&ray) < 0.0);

        // Off to the side
        let ray = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z);
        assert!(e.hit(&ray) < 0.0);
    }

    #[test]
    fn test_hit_from_inside_is_zero() {
        let e = sphere_extent(Vec3::ZERO, 2.0, PlaneSet::ALL);
        let ray = Ray::new(Vec3::new(0.1, 0.2, 0.3), Vec3::X);
        assert_eq!(e.hit(&ray), 0.0);
    }

    #[test]
    fn test_hit_parallel_ray() {
        let e = sphere_extent(Vec3::ZERO, 1.0, PlaneSet::AXES);

        // Parallel to the x slab and inside it: still a hit
        let ray = Ray::new(Vec3::new(0.5, 0.0, -5.0), Vec3::Z);
        assert!(e.hit(&ray) > 0.0);

        // Parallel to the x slab but outside it: miss
        let ray = Ray::new(Vec3::new(1.5, 0.0, -5.0), Vec3::Z);
        assert!(e.hit(&ray) < 0.0);
    }

    #[test]
    fn test_diagonal_slabs_cut_corners() {
        let boxed = sphere_extent(Vec3::ZERO, 1.0, PlaneSet::AXES);
        let tight = sphere_extent(Vec3::ZERO, 1.0, PlaneSet::ALL);

        // Skims the corner of the box but misses the sphere's 7-DOP
        let ray = Ray::new(Vec3::new(0.95, 0.95, -5.0), Vec3::Z);
        assert!(boxed.hit(&ray) > 0.0);
        assert!(tight.hit(&ray) < 0.0);
    }

    #[test]
    fn test_encloses() {
        let outer = sphere_extent(Vec3::ZERO, 2.0, PlaneSet::AXES);
        let inner = sphere_extent(Vec3::new(0.5, 0.0, 0.0), 1.0, PlaneSet::ALL);
        assert!(outer.encloses(&inner, 0.0));
        assert!(!inner.encloses(&outer, 0.0));

        // Inactive slabs in the container impose nothing
        assert!(Extent::EMPTY.encloses(&inner, 0.0));
    }

    #[test]
    fn test_centroid() {
        let e = sphere_extent(Vec3::new(1.0, 2.0, 3.0), 0.5, PlaneSet::ALL);
        assert!((e.centroid() - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }
}
