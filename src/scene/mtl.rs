//! Wavefront MTL material parser.
//!
//! Single pass, line oriented. Statements that cannot be applied (unknown
//! commands, properties before the first `newmtl`, unparsable numbers) are
//! dropped with a debug event; they never fail the parse.

use std::collections::BTreeMap;
use std::path::Path;

use crate::util::{Error, Result, Vec3};

/// Kind of texture map attached to a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureMapKind {
    Diffuse,
    Specular,
    Bump,
    Opacity,
    Reflection,
}

impl TextureMapKind {
    /// Map a lower-cased MTL command to a texture map kind.
    pub fn from_command(command: &str) -> Option<Self> {
        match command {
            "map_kd" => Some(Self::Diffuse),
            "map_ks" => Some(Self::Specular),
            "map_bump" | "bump" => Some(Self::Bump),
            "map_d" => Some(Self::Opacity),
            "refl" => Some(Self::Reflection),
            _ => None,
        }
    }
}

/// One `newmtl` block.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialRecord {
    pub name: String,
    /// `Kd`
    pub diffuse: Vec3,
    /// `Ke`
    pub emissive: Vec3,
    /// `Ks`
    pub specular: Vec3,
    /// `Ns`
    pub specular_exponent: f32,
    /// `d`, 1.0 = opaque
    pub dissolve: f32,
    /// `Ni`
    pub ior: f32,
    /// `illum`
    pub illumination_model: i32,
    /// Texture paths, stored verbatim.
    pub texture_maps: BTreeMap<TextureMapKind, String>,
}

impl MaterialRecord {
    pub const DEFAULT_DIFFUSE: Vec3 = Vec3::splat(0.8);
    pub const DEFAULT_SPECULAR_EXPONENT: f32 = 10.0;
    pub const DEFAULT_ILLUMINATION_MODEL: i32 = 2;

    /// A material with every property at its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: Self::DEFAULT_DIFFUSE,
            emissive: Vec3::ZERO,
            specular: Vec3::ZERO,
            specular_exponent: Self::DEFAULT_SPECULAR_EXPONENT,
            dissolve: 1.0,
            ior: 1.0,
            illumination_model: Self::DEFAULT_ILLUMINATION_MODEL,
            texture_maps: BTreeMap::new(),
        }
    }

    pub fn texture_map(&self, kind: TextureMapKind) -> Option<&str> {
        self.texture_maps.get(&kind).map(String::as_str)
    }

    /// Whether the material emits light.
    pub fn is_emissive(&self) -> bool {
        self.emissive.max_element() > 0.0
    }
}

/// Parser state: finished materials plus the one being assembled.
#[derive(Debug, Default)]
struct MtlParser {
    materials: Vec<MaterialRecord>,
    current: Option<MaterialRecord>,
}

impl MtlParser {
    fn line(&mut self, line_no: usize, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }

        let mut tokens = line.split_whitespace();
        let Some(head) = tokens.next() else { return };
        let command = head.to_ascii_lowercase();

        if command == "newmtl" {
            self.flush();
            match tokens.next() {
                Some(name) => self.current = Some(MaterialRecord::new(name)),
                None => tracing::debug!(line = line_no, "newmtl without a name, ignoring block"),
            }
            return;
        }

        let Some(current) = self.current.as_mut() else {
            tracing::debug!(line = line_no, command = %command, "MTL statement before newmtl, ignoring");
            return;
        };

        let applied = match command.as_str() {
            "kd" => parse_rgb(tokens).map(|c| current.diffuse = c),
            "ke" => parse_rgb(tokens).map(|c| current.emissive = c),
            "ks" => parse_rgb(tokens).map(|c| current.specular = c),
            "ns" => parse_scalar(tokens).map(|v| current.specular_exponent = v),
            "d" => parse_scalar(tokens).map(|v| current.dissolve = v),
            "ni" => parse_scalar(tokens).map(|v| current.ior = v),
            "illum" => tokens
                .next()
                .and_then(|t| t.parse::<i32>().ok())
                .map(|v| current.illumination_model = v),
            _ => match TextureMapKind::from_command(&command) {
                Some(kind) => {
                    let path = line[head.len()..].trim_start();
                    current.texture_maps.insert(kind, path.to_string());
                    Some(())
                }
                None => {
                    tracing::debug!(line = line_no, command = %command, "ignoring unknown MTL statement");
                    return;
                }
            },
        };

        if applied.is_none() {
            tracing::debug!(line = line_no, command = %command, "malformed MTL statement, ignoring");
        }
    }

    fn flush(&mut self) {
        if let Some(done) = self.current.take() {
            self.materials.push(done);
        }
    }

    fn finish(mut self) -> Vec<MaterialRecord> {
        self.flush();
        self.materials
    }
}

/// `r [g b]`; a single value is a grey level.
fn parse_rgb<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<Vec3> {
    let r: f32 = tokens.next()?.parse().ok()?;
    match tokens.next() {
        None => Some(Vec3::splat(r)),
        Some(g) => {
            let g: f32 = g.parse().ok()?;
            let b: f32 = tokens.next()?.parse().ok()?;
            Some(Vec3::new(r, g, b))
        }
    }
}

fn parse_scalar<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<f32> {
    tokens.next()?.parse().ok()
}

/// Parse MTL text into materials, in file order.
///
/// Names are not deduplicated: a repeated `newmtl` yields a second record.
#[tracing::instrument(skip_all, fields(bytes = source.len()))]
pub fn parse_mtl(source: &str) -> Vec<MaterialRecord> {
    let mut parser = MtlParser::default();
    for (i, line) in source.lines().enumerate() {
        parser.line(i + 1, line);
    }
    parser.finish()
}

/// Read and parse an MTL file.
pub fn read_mtl(path: impl AsRef<Path>) -> Result<Vec<MaterialRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path)?;
    Ok(parse_mtl(&source))
}
