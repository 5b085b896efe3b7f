//! BVH node and primitive records shared with the sample kernel.
//!
//! Every `#[repr(C)]` struct here mirrors a struct in `sample.wgsl`; fields
//! are packed into vec4-sized groups so WGSL alignment rules match.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Axis-aligned bounding box used while building the BVH.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[inline]
    pub fn grow_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    #[inline]
    pub fn grow(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Surface area (for SAH cost). Zero for an empty box.
    #[inline]
    pub fn area(&self) -> f32 {
        let d = (self.max - self.min).max(Vec3::ZERO);
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }
}

/// Flat BVH node (32 bytes).
///
/// Internal node: `left_or_first` = left child index (right = left + 1), `count` = 0.
/// Leaf node: `left_or_first` = first triangle index, `count` > 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BvhNode {
    pub aabb_min: [f32; 3],
    pub left_or_first: u32,
    pub aabb_max: [f32; 3],
    pub count: u32,
}

impl BvhNode {
    pub fn leaf(bounds: &Aabb, first: u32, count: u32) -> Self {
        Self {
            aabb_min: bounds.min.to_array(),
            left_or_first: first,
            aabb_max: bounds.max.to_array(),
            count,
        }
    }

    pub fn interior(bounds: &Aabb, left: u32) -> Self {
        Self::leaf(bounds, left, 0)
    }

    pub fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// Triangle as stored on the GPU (96 bytes): positions, shading normals
/// and the material slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuTriangle {
    pub v0: [f32; 3],
    pub material_id: u32,
    pub v1: [f32; 3],
    pub _pad0: u32,
    pub v2: [f32; 3],
    pub _pad1: u32,
    pub n0: [f32; 3],
    pub _pad2: u32,
    pub n1: [f32; 3],
    pub _pad3: u32,
    pub n2: [f32; 3],
    pub _pad4: u32,
}

/// Material record as stored on the GPU (48 bytes).
///
/// - `diffuse_dissolve`: rgb = Kd, a = d
/// - `emissive_ior`: rgb = Ke, a = Ni
/// - `specular_exponent`: rgb = Ks, a = Ns
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub diffuse_dissolve: [f32; 4],
    pub emissive_ior: [f32; 4],
    pub specular_exponent: [f32; 4],
}

/// World-space triangle used during the BVH build.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub v: [Vec3; 3],
    pub n: [Vec3; 3],
    pub material_id: u32,
}

impl Triangle {
    pub fn aabb(&self) -> Aabb {
        let mut b = Aabb::EMPTY;
        for p in self.v {
            b.grow_point(p);
        }
        b
    }

    pub fn centroid(&self) -> Vec3 {
        (self.v[0] + self.v[1] + self.v[2]) / 3.0
    }

    pub fn to_gpu(&self) -> GpuTriangle {
        GpuTriangle {
            v0: self.v[0].to_array(),
            material_id: self.material_id,
            v1: self.v[1].to_array(),
            _pad0: 0,
            v2: self.v[2].to_array(),
            _pad1: 0,
            n0: self.n[0].to_array(),
            _pad2: 0,
            n1: self.n[1].to_array(),
            _pad3: 0,
            n2: self.n[2].to_array(),
            _pad4: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_layout_sizes() {
        assert_eq!(std::mem::size_of::<BvhNode>(), 32);
        assert_eq!(std::mem::size_of::<GpuTriangle>(), 96);
        assert_eq!(std::mem::size_of::<GpuMaterial>(), 48);
    }

    #[test]
    fn test_aabb_area() {
        assert_eq!(Aabb::EMPTY.area(), 0.0);
        let mut b = Aabb::EMPTY;
        b.grow_point(Vec3::ZERO);
        b.grow_point(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.area(), 2.0 * (2.0 + 6.0 + 3.0));
    }
}
