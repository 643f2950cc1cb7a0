//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! An 8-ary tree over primitive indices, bounded by 7-slab [`Extent`]s and
//! stored as a flat arena. Internal nodes are split at the midpoint of their
//! own axis slabs into octants; leaves get a tight bound over all seven
//! slabs. Queries walk the tree best-first with a priority queue keyed by
//! slab entry distance.

use crate::{hit::HIT_EPSILON, Primitive};
use ember_math::{Extent, PlaneSet, Ray, PLANE_NORMALS};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::Range;

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 2;

/// Deepest level a node may be split at. Stacked or heavily overlapping
/// primitives would otherwise recurse without making progress.
const MAX_DEPTH: usize = 16;

const CHILD_COUNT: usize = 8;

/// A node in the flat BVH arena.
#[derive(Debug, Clone)]
pub struct BvhNode {
    /// Bound of every primitive in this subtree
    pub bounds: Extent,
    /// Range into the tree's primitive index list (empty for internal nodes)
    primitives: Range<u32>,
    /// First of eight contiguous children, `None` for leaves
    first_child: Option<u32>,
}

impl BvhNode {
    fn leaf(bounds: Extent, primitives: Range<u32>) -> Self {
        Self {
            bounds,
            primitives,
            first_child: None,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }

    /// Arena indices of this node's children (empty for leaves).
    #[inline]
    pub fn children(&self) -> Range<usize> {
        match self.first_child {
            Some(first) => first as usize..first as usize + CHILD_COUNT,
            None => 0..0,
        }
    }

    #[inline]
    fn is_empty_leaf(&self) -> bool {
        self.is_leaf() && self.primitives.is_empty()
    }
}

/// Summary of a built tree, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    pub max_leaf_size: usize,
    /// Leaves forced by the depth cap or the no-progress guard
    pub forced_leaves: usize,
}

/// Bounding volume hierarchy over a primitive slice.
///
/// The tree stores indices only; queries take the same primitive slice the
/// tree was built from.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    indices: Vec<usize>,
    stats: BvhStats,
}

impl Bvh {
    /// Build a tree over every primitive in `primitives`.
    pub fn build(primitives: &[Primitive]) -> Self {
        let mut bvh = Bvh::default();
        if primitives.is_empty() {
            return bvh;
        }

        // Loose root bound over the axis slabs only
        let root_bounds = primitives
            .iter()
            .fold(Extent::EMPTY, |acc, p| acc.union(&p.extent(PlaneSet::AXES)));

        bvh.nodes.push(BvhNode::leaf(root_bounds, 0..0));
        let all: Vec<usize> = (0..primitives.len()).collect();
        bvh.build_node(0, primitives, all, 0);
        bvh.stats.nodes = bvh.nodes.len();

        log::debug!("BVH built over {} primitives: {:?}", primitives.len(), bvh.stats);
        if bvh.stats.forced_leaves > 0 {
            log::warn!(
                "BVH forced {} oversized leaves (overlapping or stacked primitives)",
                bvh.stats.forced_leaves
            );
        }

        bvh
    }

    fn build_node(
        &mut self,
        node: usize,
        primitives: &[Primitive],
        indices: Vec<usize>,
        depth: usize,
    ) {
        self.stats.max_depth = self.stats.max_depth.max(depth);

        if indices.len() <= LEAF_MAX_SIZE {
            self.finish_leaf(node, primitives, indices);
            return;
        }
        if depth >= MAX_DEPTH {
            self.stats.forced_leaves += 1;
            self.finish_leaf(node, primitives, indices);
            return;
        }

        let bounds = self.nodes[node].bounds;
        let mut child_indices: [Vec<usize>; CHILD_COUNT] = Default::default();
        for index in indices.iter().copied() {
            child_indices[octant_of(&bounds, &primitives[index])].push(index);
        }

        let child_bounds: Vec<Extent> = (0..CHILD_COUNT)
            .map(|octant| {
                child_indices[octant]
                    .iter()
                    .fold(octant_bounds(&bounds, octant), |acc, &i| {
                        acc.union(&primitives[i].extent(PlaneSet::AXES))
                    })
            })
            .collect();

        // Everything landed in one octant and that octant did not shrink:
        // splitting again would repeat this step forever.
        let stuck = (0..CHILD_COUNT).any(|octant| {
            child_indices[octant].len() == indices.len()
                && child_bounds[octant].abs_diff_eq(&bounds, 0.0)
        });
        if stuck {
            self.stats.forced_leaves += 1;
            self.finish_leaf(node, primitives, indices);
            return;
        }

        let first_child = self.nodes.len();
        self.nodes.extend(
            child_bounds
                .into_iter()
                .map(|bounds| BvhNode::leaf(bounds, 0..0)),
        );
        self.nodes[node].first_child = Some(first_child as u32);

        for (octant, indices) in child_indices.into_iter().enumerate() {
            self.build_node(first_child + octant, primitives, indices, depth + 1);
        }
    }

    fn finish_leaf(&mut self, node: usize, primitives: &[Primitive], indices: Vec<usize>) {
        self.stats.leaves += 1;
        self.stats.max_leaf_size = self.stats.max_leaf_size.max(indices.len());

        // Tight final bound using every slab; empty leaves keep their
        // octant bound and are skipped during traversal.
        if !indices.is_empty() {
            self.nodes[node].bounds = indices
                .iter()
                .fold(Extent::EMPTY, |acc, &i| acc.union(&primitives[i].extent(PlaneSet::ALL)));
        }

        let start = self.indices.len() as u32;
        self.indices.extend(indices);
        self.nodes[node].primitives = start..self.indices.len() as u32;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root node, if any primitives were given.
    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Primitive indices stored in a leaf.
    pub fn leaf_primitives(&self, node: &BvhNode) -> &[usize] {
        &self.indices[node.primitives.start as usize..node.primitives.end as usize]
    }

    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    /// Find the nearest primitive hit along `ray` closer than `t_max`.
    ///
    /// Returns `(primitive index, distance)`. Nodes are visited in order of
    /// their slab entry distance, and the search ends as soon as the next
    /// candidate node starts beyond the best hit found so far.
    pub fn nearest_hit(
        &self,
        primitives: &[Primitive],
        ray: &Ray,
        t_max: f32,
    ) -> Option<(usize, f32)> {
        let root = self.root()?;
        let root_t = root.bounds.hit(ray);
        if root_t < 0.0 || root_t >= t_max {
            return None;
        }

        let mut closest = t_max;
        let mut closest_index = None;

        let mut candidates = BinaryHeap::with_capacity(32);
        candidates.push(Candidate {
            distance: root_t,
            node: 0,
        });

        while let Some(Candidate { distance, node }) = candidates.pop() {
            if distance >= closest {
                break;
            }

            let node = &self.nodes[node as usize];
            if node.is_leaf() {
                for &index in self.leaf_primitives(node) {
                    let t = primitives[index].intersect(ray);
                    if t >= HIT_EPSILON && t < closest {
                        closest = t;
                        closest_index = Some(index);
                    }
                }
            } else {
                for child in node.children() {
                    if self.nodes[child].is_empty_leaf() {
                        continue;
                    }
                    let t = self.nodes[child].bounds.hit(ray);
                    if t >= 0.0 && t < closest {
                        candidates.push(Candidate {
                            distance: t,
                            node: child as u32,
                        });
                    }
                }
            }
        }

        closest_index.map(|index| (index, closest))
    }

    /// True if anything blocks `ray` before `max_distance`.
    ///
    /// Order does not matter for occlusion, so this is a plain depth-first
    /// walk that stops at the first hit.
    pub fn any_hit(&self, primitives: &[Primitive], ray: &Ray, max_distance: f32) -> bool {
        if self.is_empty() {
            return false;
        }

        let mut stack = Vec::with_capacity(32);
        stack.push(0usize);

        while let Some(node) = stack.pop() {
            let node = &self.nodes[node];
            let t = node.bounds.hit(ray);
            if t < 0.0 || t >= max_distance {
                continue;
            }

            if node.is_leaf() {
                let blocked = self.leaf_primitives(node).iter().any(|&index| {
                    let t = primitives[index].intersect(ray);
                    t >= HIT_EPSILON && t < max_distance
                });
                if blocked {
                    return true;
                }
            } else {
                stack.extend(node.children().filter(|&c| !self.nodes[c].is_empty_leaf()));
            }
        }

        false
    }
}

/// Octant of `bounds` containing the primitive's centre: bit `i` is set when
/// the centre lies at or beyond the midpoint of axis slab `i`.
fn octant_of(bounds: &Extent, primitive: &Primitive) -> usize {
    (0..3).fold(0, |octant, axis| {
        let midpoint = bounds.slab(axis).map_or(0.0, |s| s.midpoint());
        if PLANE_NORMALS[axis].dot(primitive.position) >= midpoint {
            octant | (1 << axis)
        } else {
            octant
        }
    })
}

/// The sub-box of `bounds` covering `octant`.
fn octant_bounds(bounds: &Extent, octant: usize) -> Extent {
    let mut child = *bounds;
    for axis in 0..3 {
        if let Some(mut slab) = bounds.slab(axis) {
            let midpoint = slab.midpoint();
            if octant & (1 << axis) != 0 {
                slab.near = midpoint;
            } else {
                slab.far = midpoint;
            }
            child.set_slab(axis, slab);
        }
    }
    child
}

/// Priority queue entry. Ordered so that `BinaryHeap` pops the nearest node.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    node: u32,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SampleRng;
    use ember_math::Vec3;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, UnitSphere};

    fn random_spheres(count: usize, rng: &mut SampleRng) -> Vec<Primitive> {
        (0..count)
            .map(|_| {
                let center = Vec3::new(
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                    rng.gen_range(-20.0..20.0),
                );
                Primitive::sphere(center, rng.gen_range(0.1..1.5), 0)
            })
            .collect()
    }

    fn brute_force(primitives: &[Primitive], ray: &Ray) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (index, primitive) in primitives.iter().enumerate() {
            let t = primitive.intersect(ray);
            if t >= HIT_EPSILON && best.map_or(true, |(_, b)| t < b) {
                best = Some((index, t));
            }
        }
        best
    }

    fn subtree_primitives(bvh: &Bvh, node: usize, out: &mut Vec<usize>) {
        let n = &bvh.nodes()[node];
        out.extend_from_slice(bvh.leaf_primitives(n));
        for child in n.children() {
            subtree_primitives(bvh, child, out);
        }
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::build(&[]);
        assert!(bvh.is_empty());
        assert!(bvh.root().is_none());

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!(bvh.nearest_hit(&[], &ray, f32::INFINITY), None);
        assert!(!bvh.any_hit(&[], &ray, f32::INFINITY));
    }

    #[test]
    fn test_bvh_single_sphere() {
        let spheres = vec![Primitive::sphere(Vec3::new(0.0, 0.0, -1.0), 0.5, 0)];
        let bvh = Bvh::build(&spheres);

        // Should create a single leaf with a tight bound
        let root = bvh.root().unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.bounds.active(), PlaneSet::ALL);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let (index, t) = bvh.nearest_hit(&spheres, &ray, f32::INFINITY).unwrap();
        assert_eq!(index, 0);
        assert!((t - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_bvh_multiple_spheres() {
        let spheres: Vec<Primitive> = (0..10)
            .map(|i| Primitive::sphere(Vec3::new(i as f32, 0.0, -5.0), 0.5, 0))
            .collect();
        let bvh = Bvh::build(&spheres);
        assert!(!bvh.root().unwrap().is_leaf());

        // Ray that hits sphere at x=5
        let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        let (index, t) = bvh.nearest_hit(&spheres, &ray, f32::INFINITY).unwrap();
        assert_eq!(index, 5);

        // Hit point should be near z = -4.5 (sphere at z=-5, radius 0.5)
        assert!((ray.at(t).z - (-4.5)).abs() < 0.01);
    }

    #[test]
    fn test_bvh_leaf_sizes() {
        let mut rng = SampleRng::seed_from_u64(7);
        let spheres = random_spheres(300, &mut rng);
        let bvh = Bvh::build(&spheres);
        let stats = bvh.stats();

        assert!(stats.max_depth <= MAX_DEPTH);
        let oversized = bvh
            .nodes()
            .iter()
            .filter(|n| n.is_leaf() && bvh.leaf_primitives(n).len() > LEAF_MAX_SIZE)
            .count();
        assert!(oversized <= stats.forced_leaves);
        assert!(stats.leaves > spheres.len() / LEAF_MAX_SIZE);

        // Every primitive lands in exactly one leaf
        let mut all = Vec::new();
        subtree_primitives(&bvh, 0, &mut all);
        all.sort_unstable();
        assert_eq!(all, (0..spheres.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_bvh_containment() {
        let mut rng = SampleRng::seed_from_u64(42);
        let spheres = random_spheres(200, &mut rng);
        let bvh = Bvh::build(&spheres);

        for (node_index, node) in bvh.nodes().iter().enumerate() {
            let mut contained = Vec::new();
            subtree_primitives(&bvh, node_index, &mut contained);
            for index in contained {
                let tight = spheres[index].extent(PlaneSet::ALL);
                assert!(
                    node.bounds.encloses(&tight, 1e-4),
                    "node {node_index} does not enclose primitive {index}"
                );
            }
        }
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let mut rng = SampleRng::seed_from_u64(1234);
        let spheres = random_spheres(150, &mut rng);
        let bvh = Bvh::build(&spheres);

        let mut misses = 0;
        for _ in 0..1000 {
            let origin = Vec3::new(
                rng.gen_range(-30.0..30.0),
                rng.gen_range(-30.0..30.0),
                rng.gen_range(-30.0..30.0),
            );
            let direction = Vec3::from_array(UnitSphere.sample(&mut rng));
            let ray = Ray::new(origin, direction);

            let expected = brute_force(&spheres, &ray);
            let actual = bvh.nearest_hit(&spheres, &ray, f32::INFINITY);
            match (expected, actual) {
                (None, None) => misses += 1,
                (Some((ei, et)), Some((ai, at))) => {
                    assert!((et - at).abs() < 1e-4, "distance {et} vs {at}");
                    // Equal distances can only come from touching spheres
                    assert!(ei == ai || (et - at).abs() < 1e-6);
                }
                _ => panic!("bvh {actual:?} disagrees with brute force {expected:?}"),
            }
        }

        // The sample covers both outcomes
        assert!(misses > 0 && misses < 1000);
    }

    #[test]
    fn test_bvh_stacked_primitives_terminate() {
        let spheres: Vec<Primitive> = (0..40)
            .map(|_| Primitive::sphere(Vec3::new(1.0, 2.0, 3.0), 1.0, 0))
            .collect();
        let bvh = Bvh::build(&spheres);
        let stats = bvh.stats();

        assert!(stats.max_depth <= MAX_DEPTH);
        assert!(stats.forced_leaves >= 1);

        let ray = Ray::new(Vec3::new(1.0, 2.0, -10.0), Vec3::Z);
        let (_, t) = bvh.nearest_hit(&spheres, &ray, f32::INFINITY).unwrap();
        assert!((t - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_bvh_any_hit_respects_distance() {
        let spheres = vec![
            Primitive::sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, 0),
            Primitive::sphere(Vec3::new(3.0, 0.0, -5.0), 1.0, 0),
            Primitive::sphere(Vec3::new(-3.0, 0.0, -5.0), 1.0, 0),
        ];
        let bvh = Bvh::build(&spheres);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        assert!(bvh.any_hit(&spheres, &ray, f32::INFINITY));
        assert!(bvh.any_hit(&spheres, &ray, 4.5));
        assert!(!bvh.any_hit(&spheres, &ray, 3.5));
    }

    #[test]
    fn test_nearest_hit_respects_t_max() {
        let spheres = vec![Primitive::sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, 0)];
        let bvh = Bvh::build(&spheres);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        assert!(bvh.nearest_hit(&spheres, &ray, 3.0).is_none());
        assert!(bvh.nearest_hit(&spheres, &ray, 5.0).is_some());
    }

    #[test]
    fn test_candidate_order_is_min_first() {
        let mut heap = BinaryHeap::new();
        for (i, d) in [3.0, 1.0, 2.0].into_iter().enumerate() {
            heap.push(Candidate {
                distance: d,
                node: i as u32,
            });
        }
        assert_eq!(heap.pop().unwrap().distance, 1.0);
        assert_eq!(heap.pop().unwrap().distance, 2.0);
    }
}
