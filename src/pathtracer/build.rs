//! Binned SAH BVH builder.
//!
//! Produces a flat node array (index 0 = root) plus a triangle order that
//! leaves index into. Children of an interior node are stored adjacently.

use bytemuck::Zeroable;
use glam::Vec3;

use super::bvh::{Aabb, BvhNode, Triangle};

const NUM_BINS: usize = 12;
const TRAVERSAL_COST: f32 = 1.0;
const INTERSECT_COST: f32 = 1.0;
const MAX_LEAF_SIZE: usize = 4;

/// Built BVH.
pub struct Bvh {
    pub nodes: Vec<BvhNode>,
    /// Triangle indices in leaf order.
    pub tri_indices: Vec<usize>,
}

#[derive(Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

struct Split {
    axis: usize,
    position: f32,
    cost: f32,
}

/// Build a BVH over `triangles`. The input slice is not reordered.
#[tracing::instrument(skip_all, fields(tri_count = triangles.len()))]
pub fn build_bvh(triangles: &[Triangle]) -> Bvh {
    let n = triangles.len();
    if n == 0 {
        return Bvh {
            nodes: vec![BvhNode::leaf(&Aabb { min: Vec3::ZERO, max: Vec3::ZERO }, 0, 0)],
            tri_indices: Vec::new(),
        };
    }

    let centroids: Vec<Vec3> = triangles.iter().map(Triangle::centroid).collect();
    let boxes: Vec<Aabb> = triangles.iter().map(Triangle::aabb).collect();
    let mut order: Vec<usize> = (0..n).collect();

    let mut nodes: Vec<BvhNode> = Vec::with_capacity(2 * n);
    nodes.push(BvhNode::zeroed());

    // (node index, start, end) ranges still to be processed.
    let mut stack = vec![(0usize, 0usize, n)];

    while let Some((node_idx, start, end)) = stack.pop() {
        let count = end - start;

        let mut bounds = Aabb::EMPTY;
        let mut centroid_bounds = Aabb::EMPTY;
        for &i in &order[start..end] {
            bounds.grow(&boxes[i]);
            centroid_bounds.grow_point(centroids[i]);
        }

        let leaf = BvhNode::leaf(&bounds, start as u32, count as u32);
        if count <= MAX_LEAF_SIZE {
            nodes[node_idx] = leaf;
            continue;
        }

        let leaf_cost = count as f32 * INTERSECT_COST * bounds.area();
        let split = match best_split(&order[start..end], &boxes, &centroids, &centroid_bounds) {
            Some(split) if split.cost < leaf_cost => split,
            _ => {
                nodes[node_idx] = leaf;
                continue;
            }
        };

        let left_count = partition(&mut order[start..end], |&i| {
            centroids[i][split.axis] < split.position
        });
        let mid = match start + left_count {
            m if m == start || m == end => (start + end) / 2,
            m => m,
        };

        let left = nodes.len();
        nodes.push(BvhNode::zeroed());
        nodes.push(BvhNode::zeroed());
        nodes[node_idx] = BvhNode::interior(&bounds, left as u32);

        // Right first so the left subtree is laid out first.
        stack.push((left + 1, mid, end));
        stack.push((left, start, mid));
    }

    Bvh { nodes, tri_indices: order }
}

/// Binned SAH search over all three axes. `None` if every axis is degenerate.
fn best_split(order: &[usize], boxes: &[Aabb], centroids: &[Vec3], centroid_bounds: &Aabb) -> Option<Split> {
    let mut best: Option<Split> = None;

    for axis in 0..3 {
        let lo = centroid_bounds.min[axis];
        let extent = centroid_bounds.max[axis] - lo;
        if extent < 1e-8 {
            continue;
        }

        let mut bins = [Bin { bounds: Aabb::EMPTY, count: 0 }; NUM_BINS];
        let scale = NUM_BINS as f32 / extent;
        for &i in order {
            let b = (((centroids[i][axis] - lo) * scale) as usize).min(NUM_BINS - 1);
            bins[b].bounds.grow(&boxes[i]);
            bins[b].count += 1;
        }

        // Prefix sweep from the left.
        let mut left_area = [0.0f32; NUM_BINS - 1];
        let mut left_count = [0usize; NUM_BINS - 1];
        let mut acc = Aabb::EMPTY;
        let mut acc_count = 0;
        for i in 0..NUM_BINS - 1 {
            acc.grow(&bins[i].bounds);
            acc_count += bins[i].count;
            left_area[i] = acc.area();
            left_count[i] = acc_count;
        }

        // Suffix sweep from the right, evaluating each plane.
        acc = Aabb::EMPTY;
        acc_count = 0;
        for i in (1..NUM_BINS).rev() {
            acc.grow(&bins[i].bounds);
            acc_count += bins[i].count;
            let cost = TRAVERSAL_COST
                + INTERSECT_COST
                    * (left_count[i - 1] as f32 * left_area[i - 1] + acc_count as f32 * acc.area());

            if best.as_ref().is_none_or(|b| cost < b.cost) {
                best = Some(Split {
                    axis,
                    position: lo + (i as f32 / NUM_BINS as f32) * extent,
                    cost,
                });
            }
        }
    }

    best
}

/// In-place partition; returns how many elements satisfy `pred`.
fn partition<T>(slice: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut left = 0;
    let mut right = slice.len();
    while left < right {
        if pred(&slice[left]) {
            left += 1;
        } else {
            right -= 1;
            slice.swap(left, right);
        }
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri_at(x: f32) -> Triangle {
        Triangle {
            v: [
                Vec3::new(x - 0.5, -0.5, 0.0),
                Vec3::new(x + 0.5, -0.5, 0.0),
                Vec3::new(x, 0.5, 0.0),
            ],
            n: [Vec3::Z; 3],
            material_id: 0,
        }
    }

    #[test]
    fn test_empty_bvh() {
        let bvh = build_bvh(&[]);
        assert_eq!(bvh.nodes.len(), 1);
        assert!(bvh.tri_indices.is_empty());
    }

    #[test]
    fn test_small_input_is_single_leaf() {
        let tris: Vec<_> = (0..3).map(|i| tri_at(i as f32)).collect();
        let bvh = build_bvh(&tris);
        assert_eq!(bvh.nodes.len(), 1);
        assert!(bvh.nodes[0].is_leaf());
        assert_eq!(bvh.nodes[0].count, 3);
    }

    #[test]
    fn test_spread_triangles_build_tree() {
        let tris: Vec<_> = (0..64).map(|i| tri_at(i as f32 * 3.0)).collect();
        let bvh = build_bvh(&tris);
        assert!(bvh.nodes.len() > 1);
        assert!(!bvh.nodes[0].is_leaf());

        let mut sorted = bvh.tri_indices.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..64).collect::<Vec<_>>());

        // Leaves cover every triangle exactly once.
        let covered: u32 = bvh.nodes.iter().filter(|n| n.is_leaf()).map(|n| n.count).sum();
        assert_eq!(covered, 64);

        let root = &bvh.nodes[0];
        assert!(root.aabb_min[0] <= -0.5);
        assert!(root.aabb_max[0] >= 189.5);
    }

    #[test]
    fn test_partition() {
        let mut v = [5, 1, 4, 2, 3];
        let n = partition(&mut v, |&x| x < 3);
        assert_eq!(n, 2);
        assert!(v[..n].iter().all(|&x| x < 3));
        assert!(v[n..].iter().all(|&x| x >= 3));
    }

    #[test]
    fn test_zeroed_node_is_not_leaf() {
        assert!(!BvhNode::zeroed().is_leaf());
    }
}
