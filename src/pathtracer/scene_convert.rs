//! Convert a parsed model and its materials into path tracer records.

use glam::{Mat4, Vec3};
use rayon::prelude::*;

use super::bvh::{GpuMaterial, Triangle};
use crate::scene::{MaterialRecord, ObjModel};

/// World-space triangles for every face of `model`.
///
/// `slots[i]` is the GPU material slot for `model.material_names[i]`;
/// faces without a material use `default_slot`. Missing vertex normals fall
/// back to the face normal.
pub fn extract_triangles(model: &ObjModel, slots: &[u32], default_slot: u32, transform: &Mat4) -> Vec<Triangle> {
    let normal_mat = transform.inverse().transpose();

    model
        .triangles
        .par_iter()
        .map(|tri| {
            let v = tri.positions.map(|i| transform.transform_point3(model.positions[i as usize]));
            let face = (v[1] - v[0]).cross(v[2] - v[0]).normalize_or_zero();
            let n = match tri.normals {
                Some(ns) => ns.map(|i| {
                    let n = normal_mat.transform_vector3(model.normals[i as usize]).normalize_or_zero();
                    if n == Vec3::ZERO { face } else { n }
                }),
                None => [face; 3],
            };
            let material_id = tri
                .material
                .and_then(|m| slots.get(m as usize).copied())
                .unwrap_or(default_slot);
            Triangle { v, n, material_id }
        })
        .collect()
}

/// GPU record for a parsed material.
pub fn material_from_record(m: &MaterialRecord) -> GpuMaterial {
    GpuMaterial {
        diffuse_dissolve: m.diffuse.extend(m.dissolve.clamp(0.0, 1.0)).to_array(),
        emissive_ior: m.emissive.extend(m.ior).to_array(),
        specular_exponent: m.specular.extend(m.specular_exponent.max(0.0)).to_array(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::parse_obj;

    #[test]
    fn test_extract_with_transform_and_slots() {
        let model = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl b\nf 1 2 3\n").unwrap();
        let t = Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0));
        let tris = extract_triangles(&model, &[7], 0, &t);
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0].v[1], Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(tris[0].n[0], Vec3::Z);
        assert_eq!(tris[0].material_id, 7);
    }

    #[test]
    fn test_unknown_material_uses_default_slot() {
        let model = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let tris = extract_triangles(&model, &[], 3, &Mat4::IDENTITY);
        assert_eq!(tris[0].material_id, 3);
    }

    #[test]
    fn test_material_packing() {
        let mut m = MaterialRecord::new("lamp");
        m.emissive = Vec3::splat(4.0);
        m.dissolve = 1.5;
        let g = material_from_record(&m);
        assert_eq!(g.diffuse_dissolve, [0.8, 0.8, 0.8, 1.0]);
        assert_eq!(g.emissive_ior, [4.0, 4.0, 4.0, 1.0]);
        assert_eq!(g.specular_exponent, [0.0, 0.0, 0.0, 10.0]);
    }
}
