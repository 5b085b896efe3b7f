//! Packed scene data ready for GPU storage buffers.

use super::build::{build_bvh, Bvh};
use super::bvh::{BvhNode, GpuMaterial, GpuTriangle, Triangle};

/// Everything the sample kernel reads about the scene.
#[derive(Clone, Debug, Default)]
pub struct GpuSceneData {
    pub nodes: Vec<BvhNode>,
    /// Triangles in BVH leaf order.
    pub triangles: Vec<GpuTriangle>,
    pub materials: Vec<GpuMaterial>,
}

impl GpuSceneData {
    /// Build the BVH and reorder triangles to match its leaves.
    pub fn build(triangles: &[Triangle], materials: Vec<GpuMaterial>) -> Self {
        let Bvh { nodes, tri_indices } = build_bvh(triangles);
        let triangles = tri_indices.iter().map(|&i| triangles[i].to_gpu()).collect();
        Self { nodes, triangles, materials }
    }

    pub fn tri_count(&self) -> u32 {
        self.triangles.len() as u32
    }

    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    pub fn triangles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    pub fn materials_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.materials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_build_reorders_into_leaf_order() {
        let tris: Vec<Triangle> = (0..10)
            .map(|i| {
                let x = (9 - i) as f32 * 4.0;
                Triangle {
                    v: [Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0), Vec3::new(x, 1.0, 0.0)],
                    n: [Vec3::Z; 3],
                    material_id: i,
                }
            })
            .collect();
        let data = GpuSceneData::build(&tris, Vec::new());
        assert_eq!(data.tri_count(), 10);
        assert_eq!(data.triangles_bytes().len(), 10 * 96);
        assert_eq!(data.nodes_bytes().len(), data.nodes.len() * 32);

        let mut ids: Vec<u32> = data.triangles.iter().map(|t| t.material_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }
}
