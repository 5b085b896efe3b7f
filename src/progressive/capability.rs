//! GPU capability gate, checked once before a session starts.
//!
//! Falling short is a hard failure; there is no degraded mode.

use crate::util::{Error, Result};

/// What the GPU context reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuCapabilities {
    pub max_texture_array_layers: u32,
    /// Sampled textures per shader stage.
    pub max_texture_units: u32,
    pub max_renderbuffer_size: u32,
    pub max_texture_size: u32,
    /// Float color targets usable as storage (accumulation buffers).
    pub float_color_storage: bool,
}

/// Minimum capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityThresholds {
    pub texture_array_layers: u32,
    pub texture_units: u32,
    pub renderbuffer_size: u32,
    pub texture_size: u32,
}

impl Default for CapabilityThresholds {
    fn default() -> Self {
        Self {
            texture_array_layers: 2048,
            texture_units: 16,
            renderbuffer_size: 16384,
            texture_size: 16384,
        }
    }
}

/// Check `caps` against the default thresholds.
pub fn check_capabilities(caps: &GpuCapabilities) -> Result<()> {
    check_capabilities_with(caps, &CapabilityThresholds::default())
}

/// Check `caps` against `min`. The error lists every shortfall.
pub fn check_capabilities_with(caps: &GpuCapabilities, min: &CapabilityThresholds) -> Result<()> {
    tracing::info!(?caps, "GPU capabilities");

    let mut missing = Vec::new();
    if !caps.float_color_storage {
        missing.push("float color buffers not supported".to_owned());
    }
    let limits = [
        ("texture array layers", caps.max_texture_array_layers, min.texture_array_layers),
        ("texture units", caps.max_texture_units, min.texture_units),
        ("renderbuffer size", caps.max_renderbuffer_size, min.renderbuffer_size),
        ("texture size", caps.max_texture_size, min.texture_size),
    ];
    for (name, have, need) in limits {
        if have < need {
            missing.push(format!("{name} {have} < {need}"));
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::capability(missing.join(", ")))
    }
}
