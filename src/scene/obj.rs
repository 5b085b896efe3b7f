//! Wavefront OBJ geometry parser.
//!
//! Same line-oriented shape as the MTL parser, but stricter: a face that
//! cannot form a triangle, or that references an undeclared vertex, rejects
//! the whole file. Supported statements: `v`, `vn`, `vt`, `f`, `usemtl`,
//! `mtllib`. Polygons are fan-triangulated.

use std::path::Path;

use smallvec::SmallVec;

use crate::util::{Bounds, Error, Result, Vec3};

/// A triangle referencing the model's position/normal arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjTriangle {
    pub positions: [u32; 3],
    /// Present only when all three corners carry a normal reference.
    pub normals: Option<[u32; 3]>,
    /// Index into [`ObjModel::material_names`].
    pub material: Option<u32>,
}

/// Parsed geometry.
#[derive(Clone, Debug, Default)]
pub struct ObjModel {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coord_count: usize,
    pub triangles: Vec<ObjTriangle>,
    /// `usemtl` names in order of first use.
    pub material_names: Vec<String>,
    /// `mtllib` file names, verbatim.
    pub material_libs: Vec<String>,
    /// Polygon count before triangulation.
    pub face_count: usize,
}

impl ObjModel {
    pub fn bounds(&self) -> Bounds {
        let mut b = Bounds::EMPTY;
        for p in &self.positions {
            b.expand_by_point(*p);
        }
        b
    }

    /// Geometric normal of a triangle (zero for degenerate triangles).
    pub fn face_normal(&self, tri: &ObjTriangle) -> Vec3 {
        let [a, b, c] = tri.positions.map(|i| self.positions[i as usize]);
        (b - a).cross(c - a).normalize_or_zero()
    }
}

#[derive(Clone, Copy, Debug)]
struct Corner {
    position: u32,
    normal: Option<u32>,
}

#[derive(Debug, Default)]
struct ObjParser {
    model: ObjModel,
    material: Option<u32>,
}

impl ObjParser {
    fn line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let mut tokens = line.split_whitespace();
        let Some(head) = tokens.next() else { return Ok(()) };

        match head {
            "v" => self.model.positions.push(parse_vec3(line_no, tokens)?),
            "vn" => self.model.normals.push(parse_vec3(line_no, tokens)?),
            "vt" => self.model.tex_coord_count += 1,
            "f" => self.face(line_no, tokens)?,
            "usemtl" => {
                let name = line[head.len()..].trim();
                self.material = Some(self.material_index(name));
            }
            "mtllib" => {
                let lib = line[head.len()..].trim();
                if !lib.is_empty() {
                    self.model.material_libs.push(lib.to_string());
                }
            }
            "o" | "g" | "s" => {}
            _ => tracing::debug!(line = line_no, statement = head, "ignoring unknown OBJ statement"),
        }
        Ok(())
    }

    fn material_index(&mut self, name: &str) -> u32 {
        let names = &mut self.model.material_names;
        match names.iter().position(|n| n == name) {
            Some(i) => i as u32,
            None => {
                names.push(name.to_string());
                (names.len() - 1) as u32
            }
        }
    }

    fn face<'a>(&mut self, line_no: usize, tokens: impl Iterator<Item = &'a str>) -> Result<()> {
        let refs: SmallVec<[&str; 4]> = tokens.collect();
        if refs.len() < 3 {
            return Err(Error::InvalidFace { line: line_no, count: refs.len() });
        }

        let mut corners: SmallVec<[Corner; 4]> = SmallVec::with_capacity(refs.len());
        for r in refs {
            corners.push(self.corner(line_no, r)?);
        }

        // Fan triangulation around the first corner.
        for i in 1..corners.len() - 1 {
            let tri = [corners[0], corners[i], corners[i + 1]];
            let normals = match (tri[0].normal, tri[1].normal, tri[2].normal) {
                (Some(a), Some(b), Some(c)) => Some([a, b, c]),
                _ => None,
            };
            self.model.triangles.push(ObjTriangle {
                positions: tri.map(|c| c.position),
                normals,
                material: self.material,
            });
        }
        self.model.face_count += 1;
        Ok(())
    }

    /// `v`, `v/vt`, `v//vn` or `v/vt/vn`.
    fn corner(&self, line_no: usize, token: &str) -> Result<Corner> {
        let mut parts = token.split('/');
        let position = parts.next().unwrap_or_default();
        let _tex = parts.next();
        let normal = parts.next().filter(|s| !s.is_empty());

        let position = resolve_index(line_no, position, self.model.positions.len())?;
        let normal = normal
            .map(|n| resolve_index(line_no, n, self.model.normals.len()))
            .transpose()?;
        Ok(Corner { position, normal })
    }
}

/// 1-based, or negative relative to the current end of the list.
fn resolve_index(line_no: usize, token: &str, len: usize) -> Result<u32> {
    let raw: i64 = token
        .parse()
        .map_err(|_| Error::InvalidReference { line: line_no, token: token.to_string() })?;
    let resolved = if raw > 0 { raw - 1 } else { len as i64 + raw };
    if raw == 0 || resolved < 0 || resolved >= len as i64 {
        return Err(Error::IndexOutOfRange { line: line_no, index: raw });
    }
    Ok(resolved as u32)
}

/// Three leading coordinates; trailing values (`w`, vertex colors) are ignored.
fn parse_vec3<'a>(line_no: usize, mut tokens: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut next = || {
        tokens
            .next()
            .and_then(|t| t.parse::<f32>().ok())
            .ok_or(Error::InvalidVertex { line: line_no })
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

/// Parse and validate OBJ text.
#[tracing::instrument(skip_all, fields(bytes = source.len()))]
pub fn parse_obj(source: &str) -> Result<ObjModel> {
    let mut parser = ObjParser::default();
    for (i, line) in source.lines().enumerate() {
        parser.line(i + 1, line)?;
    }
    if parser.model.triangles.is_empty() {
        return Err(Error::EmptyModel);
    }
    tracing::debug!(
        vertices = parser.model.positions.len(),
        triangles = parser.model.triangles.len(),
        "parsed OBJ"
    );
    Ok(parser.model)
}

/// Read and parse an OBJ file.
pub fn read_obj(path: impl AsRef<Path>) -> Result<ObjModel> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path)?;
    parse_obj(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
mtllib quad.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
usemtl red
f 1//1 2//1 3//1 4//1
";

    #[test]
    fn test_face_with_two_vertices_rejected() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap_err();
        assert!(matches!(err, Error::InvalidFace { line: 3, count: 2 }));
        assert!(err.is_validation());
    }

    #[test]
    fn test_face_with_three_vertices_accepted() {
        let model = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(model.triangles.len(), 1);
        assert_eq!(model.triangles[0].positions, [0, 1, 2]);
        assert_eq!(model.triangles[0].normals, None);
        assert_eq!(model.triangles[0].material, None);
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let model = parse_obj(QUAD).unwrap();
        assert_eq!(model.face_count, 1);
        assert_eq!(model.triangles.len(), 2);
        assert_eq!(model.triangles[1].positions, [0, 2, 3]);
        assert_eq!(model.triangles[1].normals, Some([0, 0, 0]));
        assert_eq!(model.material_names, vec!["red".to_string()]);
        assert_eq!(model.triangles[0].material, Some(0));
        assert_eq!(model.material_libs, vec!["quad.mtl".to_string()]);
    }

    #[test]
    fn test_negative_and_textured_references() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf -3/1 -2/2 -1/3\n";
        let model = parse_obj(src).unwrap();
        assert_eq!(model.tex_coord_count, 3);
        assert_eq!(model.triangles[0].positions, [0, 1, 2]);
    }

    #[test]
    fn test_out_of_range_reference_rejected() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n").unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { line: 4, index: 4 }));

        let err = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n").unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 0, .. }));
    }

    #[test]
    fn test_malformed_vertex_rejected() {
        let err = parse_obj("v 1 abc 2\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap_err();
        assert!(matches!(err, Error::InvalidVertex { line: 1 }));
        assert!(err.is_validation());

        let err = parse_obj("v 0 0 0\nv\nv 1 0 0\nv 0 1 0\nf 1 3 4\n").unwrap_err();
        assert!(matches!(err, Error::InvalidVertex { line: 2 }));

        let err = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0\nf 1 2 3\n").unwrap_err();
        assert!(matches!(err, Error::InvalidVertex { line: 4 }));
    }

    #[test]
    fn test_extra_vertex_components_ignored() {
        let model = parse_obj("v 0 0 0 1\nv 1 0 0 1 0.5 0.5\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(model.positions[1], Vec3::X);
    }

    #[test]
    fn test_non_numeric_reference_reported() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1x 2 3\n").unwrap_err();
        assert!(err.is_validation());
        match err {
            Error::InvalidReference { line, token } => {
                assert_eq!(line, 4);
                assert_eq!(token, "1x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_model_without_faces_rejected() {
        assert!(matches!(parse_obj("# nothing\nv 0 0 0\n"), Err(Error::EmptyModel)));
    }

    #[test]
    fn test_material_indices_reused() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl a\nf 1 2 3\nusemtl b\nf 1 2 3\nusemtl a\nf 1 2 3\n";
        let model = parse_obj(src).unwrap();
        let mats: Vec<_> = model.triangles.iter().map(|t| t.material).collect();
        assert_eq!(mats, vec![Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn test_bounds_and_face_normal() {
        let model = parse_obj(QUAD).unwrap();
        let b = model.bounds();
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(model.face_normal(&model.triangles[0]), Vec3::Z);
    }
}
