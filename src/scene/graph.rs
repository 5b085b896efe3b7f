//! Scene graph built from a loaded model.
//!
//! ```text
//! target (orbit pivot, at model centre)
//!   └── camera (looks down +Y at the target)
//! mesh (model geometry, root)
//! ```
//!
//! Yaw is applied to `target` about its own Z axis; pitch is applied to
//! `camera` about the target's X axis. Reversing that order changes how the
//! orbit behaves.

use std::collections::HashMap;

use glam::{Mat4, Vec3};

use super::mtl::MaterialRecord;
use super::node::{NodeArena, NodeId};
use super::obj::ObjModel;
use crate::pathtracer::scene_convert::{extract_triangles, material_from_record};
use crate::pathtracer::GpuSceneData;
use crate::util::Bounds;

/// Camera distance in bounding-sphere radii after a load.
const FRAMING_DISTANCE: f32 = 2.5;

/// Ordered materials plus a name lookup.
///
/// Slot 0 is always the default material; parsed records follow in file
/// order. A name defined twice resolves to its last definition.
#[derive(Clone, Debug)]
pub struct MaterialTable {
    records: Vec<MaterialRecord>,
    by_name: HashMap<String, u32>,
}

impl MaterialTable {
    pub const DEFAULT_SLOT: u32 = 0;

    pub fn new(parsed: Vec<MaterialRecord>) -> Self {
        let mut records = Vec::with_capacity(parsed.len() + 1);
        records.push(MaterialRecord::new("default"));
        records.extend(parsed);

        let by_name = records
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, m)| (m.name.clone(), i as u32))
            .collect();
        Self { records, by_name }
    }

    /// Slot for a material name (last definition wins).
    pub fn slot(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, slot: u32) -> Option<&MaterialRecord> {
        self.records.get(slot as usize)
    }

    /// Parsed records only, without the default slot.
    pub fn parsed(&self) -> &[MaterialRecord] {
        &self.records[1..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The scene a render session draws: transform hierarchy, geometry,
/// materials and the packed data the sample stage consumes.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: NodeArena,
    target: NodeId,
    camera: NodeId,
    mesh: NodeId,
    model: ObjModel,
    materials: MaterialTable,
    bounds: Bounds,
    gpu: GpuSceneData,
}

impl SceneGraph {
    #[tracing::instrument(skip_all, fields(triangles = model.triangles.len(), materials = materials.len()))]
    pub fn new(model: ObjModel, materials: Vec<MaterialRecord>) -> Self {
        let bounds = model.bounds();
        let (center, radius) = if bounds.is_empty() {
            (Vec3::ZERO, 1.0)
        } else {
            (bounds.center(), bounds.radius().max(1e-3))
        };

        let mut nodes = NodeArena::new();
        let mesh = nodes.add("mesh", None, Vec3::ZERO);
        let target = nodes.add("target", None, center);
        let camera = nodes.add("camera", Some(target), Vec3::new(0.0, -radius * FRAMING_DISTANCE, 0.0));

        let materials = MaterialTable::new(materials);
        let gpu = Self::pack(&model, &materials, &nodes.world_matrix(mesh));

        Self { nodes, target, camera, mesh, model, materials, bounds, gpu }
    }

    fn pack(model: &ObjModel, materials: &MaterialTable, transform: &Mat4) -> GpuSceneData {
        let slots: Vec<u32> = model
            .material_names
            .iter()
            .map(|name| {
                materials.slot(name).unwrap_or_else(|| {
                    tracing::debug!(material = %name, "usemtl names an undefined material, using default");
                    MaterialTable::DEFAULT_SLOT
                })
            })
            .collect();
        let triangles = extract_triangles(model, &slots, MaterialTable::DEFAULT_SLOT, transform);
        let gpu_materials = materials.records.iter().map(material_from_record).collect();
        GpuSceneData::build(&triangles, gpu_materials)
    }

    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeArena {
        &mut self.nodes
    }

    /// Orbit pivot; panning moves this node.
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn camera(&self) -> NodeId {
        self.camera
    }

    pub fn mesh(&self) -> NodeId {
        self.mesh
    }

    pub fn camera_world(&self) -> Mat4 {
        self.nodes.world_matrix(self.camera)
    }

    pub fn model(&self) -> &ObjModel {
        &self.model
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn gpu_data(&self) -> &GpuSceneData {
        &self.gpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{parse_mtl, parse_obj};

    const TRI: &str = "v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\nusemtl shiny\nf 1 2 3\nusemtl ghost\nf 1 3 4\n";

    #[test]
    fn test_camera_framed_on_model() {
        let scene = SceneGraph::new(parse_obj(TRI).unwrap(), Vec::new());
        let target = scene.nodes().world_position(scene.target());
        assert_eq!(target, Vec3::ZERO);

        let cam = scene.nodes().world_position(scene.camera());
        let expected = scene.bounds().radius() * FRAMING_DISTANCE;
        assert!((cam.y + expected).abs() < 1e-5);
        assert_eq!(scene.nodes().get(scene.camera()).parent(), Some(scene.target()));
    }

    #[test]
    fn test_material_slots_resolve_last_definition() {
        let mats = parse_mtl("newmtl shiny\nKs 1 1 1\nnewmtl shiny\nKs 0.5 0.5 0.5\n");
        let scene = SceneGraph::new(parse_obj(TRI).unwrap(), mats);

        let table = scene.materials();
        assert_eq!(table.len(), 3);
        assert_eq!(table.parsed().len(), 2);
        assert_eq!(table.slot("shiny"), Some(2));
        assert_eq!(table.slot("ghost"), None);
        assert_eq!(table.get(MaterialTable::DEFAULT_SLOT).map(|m| m.name.as_str()), Some("default"));

        let mut ids: Vec<u32> = scene.gpu_data().triangles.iter().map(|t| t.material_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(scene.gpu_data().materials.len(), 3);
    }

    #[test]
    fn test_without_materials_uses_defaults() {
        let scene = SceneGraph::new(parse_obj(TRI).unwrap(), Vec::new());
        assert_eq!(scene.materials().len(), 1);
        assert!(scene.gpu_data().triangles.iter().all(|t| t.material_id == 0));
        assert_eq!(scene.gpu_data().materials[0].diffuse_dissolve, [0.8, 0.8, 0.8, 1.0]);
    }
}
