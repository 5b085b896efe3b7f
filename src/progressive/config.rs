//! Render configuration supplied by the UI.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Normal source used by the sample stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadingMethod {
    /// Geometric face normals.
    Flat,
    /// Interpolated vertex normals.
    #[default]
    Phong,
}

impl ShadingMethod {
    pub const ALL: [ShadingMethod; 2] = [ShadingMethod::Flat, ShadingMethod::Phong];

    pub fn label(self) -> &'static str {
        match self {
            ShadingMethod::Flat => "Flat",
            ShadingMethod::Phong => "Phong",
        }
    }

    /// Value passed to the sample kernel.
    pub fn gpu_index(self) -> u32 {
        match self {
            ShadingMethod::Flat => 0,
            ShadingMethod::Phong => 1,
        }
    }
}

/// Parameters that invalidate accumulation whenever they change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub fov_degrees: u32,
    /// Pass target; accumulation stops here.
    pub samples: u32,
    pub bounces: u32,
    pub shading: ShadingMethod,
}

impl RenderConfig {
    pub const FOV_RANGE: RangeInclusive<u32> = 10..=120;
    pub const SAMPLES_RANGE: RangeInclusive<u32> = 1..=10_000;
    pub const BOUNCES_RANGE: RangeInclusive<u32> = 1..=16;

    /// Error if any field is out of range.
    pub fn validate(&self) -> Result<()> {
        check("fov", self.fov_degrees, &Self::FOV_RANGE)?;
        check("samples", self.samples, &Self::SAMPLES_RANGE)?;
        check("bounces", self.bounces, &Self::BOUNCES_RANGE)?;
        Ok(())
    }

    /// Copy with every field coerced into range.
    pub fn clamped(self) -> Self {
        let clamp = |v: u32, r: &RangeInclusive<u32>| v.clamp(*r.start(), *r.end());
        Self {
            fov_degrees: clamp(self.fov_degrees, &Self::FOV_RANGE),
            samples: clamp(self.samples, &Self::SAMPLES_RANGE),
            bounces: clamp(self.bounces, &Self::BOUNCES_RANGE),
            shading: self.shading,
        }
    }

    pub fn fov_radians(&self) -> f32 {
        crate::util::degrees_to_radians(self.fov_degrees as f32)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45,
            samples: 1000,
            bounces: 4,
            shading: ShadingMethod::Phong,
        }
    }
}

fn check(name: &'static str, value: u32, range: &RangeInclusive<u32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig { name, value, min: *range.start(), max: *range.end() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = RenderConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.shading, ShadingMethod::Phong);
    }

    #[test]
    fn test_out_of_range_rejected_and_clamped() {
        let cfg = RenderConfig { fov_degrees: 5, samples: 0, bounces: 40, shading: ShadingMethod::Flat };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig { name: "fov", .. })));

        let fixed = cfg.clamped();
        assert_eq!(fixed.fov_degrees, 10);
        assert_eq!(fixed.samples, 1);
        assert_eq!(fixed.bounces, 16);
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn test_serde_partial_uses_defaults() {
        let cfg: RenderConfig = serde_json::from_str(r#"{"samples": 64, "shading": "flat"}"#).unwrap();
        assert_eq!(cfg.samples, 64);
        assert_eq!(cfg.fov_degrees, 45);
        assert_eq!(cfg.shading, ShadingMethod::Flat);
    }
}
