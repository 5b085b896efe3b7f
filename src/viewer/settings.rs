//! Persistent viewer settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::progressive::RenderConfig;
use crate::scene::LoadRequest;

/// Settings that persist between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Window
    pub window_width: f32,
    pub window_height: f32,
    pub window_x: Option<f32>,
    pub window_y: Option<f32>,

    // Rendering
    pub render: RenderConfig,

    // Last loaded model
    pub last_model: Option<PathBuf>,
    pub last_materials: Option<PathBuf>,

    // Recent models with their material files (most recent first, max 10)
    pub recent_models: Vec<LoadRequest>,

    // UI layout
    pub side_panel_width: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_width: 1280.0,
            window_height: 800.0,
            window_x: None,
            window_y: None,
            render: RenderConfig::default(),
            last_model: None,
            last_materials: None,
            recent_models: Vec::new(),
            side_panel_width: 220.0,
        }
    }
}

const MAX_RECENT_MODELS: usize = 10;

impl Settings {
    /// Settings file path
    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("pathview");
            p.push("settings.json");
            p
        })
    }

    /// Load settings; missing or corrupt files give defaults
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        let mut settings: Self = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        settings.render = settings.render.clamped();
        settings
    }

    pub fn save(&self) {
        if let Some(path) = Self::path() {
            if let Err(e) = self.save_to(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to save settings");
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Record a loaded model (moves to top if already present)
    pub fn add_recent(&mut self, request: LoadRequest) {
        self.recent_models.retain(|r| r.geometry != request.geometry);
        self.recent_models.insert(0, request.clone());
        self.recent_models.truncate(MAX_RECENT_MODELS);

        self.last_model = Some(request.geometry);
        self.last_materials = request.materials;
    }

    /// Recent models that still exist; material files that vanished are dropped
    pub fn recent_models(&self) -> Vec<LoadRequest> {
        self.recent_models
            .iter()
            .filter(|r| r.geometry.exists())
            .map(|r| LoadRequest {
                geometry: r.geometry.clone(),
                materials: r.materials.clone().filter(|p| p.exists()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progressive::ShadingMethod;

    #[test]
    fn test_roundtrip_and_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.render.shading = ShadingMethod::Flat;
        settings.add_recent(LoadRequest::new("a.obj").with_materials("a.mtl"));
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_out_of_range_render_config_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"render": {"samples": 0, "bounces": 99}}"#).unwrap();
        let settings = Settings::load_from(&path);
        assert_eq!(settings.render.samples, 1);
        assert_eq!(settings.render.bounces, 16);
    }

    #[test]
    fn test_recent_moves_to_front() {
        let mut s = Settings::default();
        s.add_recent(LoadRequest::new("a.obj"));
        s.add_recent(LoadRequest::new("b.obj").with_materials("b.mtl"));
        s.add_recent(LoadRequest::new("a.obj"));
        assert_eq!(
            s.recent_models,
            vec![LoadRequest::new("a.obj"), LoadRequest::new("b.obj").with_materials("b.mtl")]
        );
        assert_eq!(s.last_materials, None);
    }

    #[test]
    fn test_recent_keeps_material_file() {
        let dir = tempfile::tempdir().unwrap();
        let obj = dir.path().join("box.obj");
        let mtl = dir.path().join("look.mtl");
        let gone = dir.path().join("gone.mtl");
        std::fs::write(&obj, "").unwrap();
        std::fs::write(&mtl, "").unwrap();

        let mut s = Settings::default();
        s.add_recent(LoadRequest::new(&obj).with_materials(&mtl));
        assert_eq!(s.recent_models(), vec![LoadRequest::new(&obj).with_materials(&mtl)]);

        let path = dir.path().join("settings.json");
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).recent_models(), s.recent_models());

        s.add_recent(LoadRequest::new(&obj).with_materials(&gone));
        assert_eq!(s.recent_models(), vec![LoadRequest::new(&obj)]);
    }
}
