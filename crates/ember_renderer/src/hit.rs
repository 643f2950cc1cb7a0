//! HitInfo records what a ray struck.

use crate::Vec3;

/// Smallest accepted hit distance. Hits closer than this are treated as the
/// ray re-intersecting the surface it just left.
pub const HIT_EPSILON: f32 = 0.001;

/// Record of the nearest ray-scene intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    /// Distance along the ray; negative means "no hit"
    pub distance: f32,
    /// Point of intersection
    pub position: Vec3,
    /// Unit outward surface normal at the intersection
    pub normal: Vec3,
    /// Index of the primitive that was hit
    pub primitive: usize,
    /// Index of the primitive's material
    pub material: usize,
}

impl HitInfo {
    /// The "no hit" sentinel.
    pub const MISS: HitInfo = HitInfo {
        distance: -1.0,
        position: Vec3::ZERO,
        normal: Vec3::ZERO,
        primitive: 0,
        material: 0,
    };

    #[inline]
    pub fn did_hit(&self) -> bool {
        self.distance > 0.0
    }
}

impl Default for HitInfo {
    fn default() -> Self {
        Self::MISS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_miss() {
        assert!(!HitInfo::default().did_hit());
    }

    #[test]
    fn test_did_hit() {
        let hit = HitInfo {
            distance: 2.0,
            ..HitInfo::MISS
        };
        assert!(hit.did_hit());
    }
}
