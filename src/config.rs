//! Pipeline configuration and its RON settings file.
//!
//! [`PixelationConfig`] is what the pipeline is built from: resolved
//! materials, a layer mask and the low-res size. [`PixelationSettings`] is the
//! serialisable form that names the materials instead.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::material::Material;
use crate::visibility::LayerMask;

/// Default pixelation resolution.
pub const DEFAULT_RESOLUTION: UVec2 = UVec2::new(480, 270);

/// Resolved, construction-time configuration of a
/// [`PixelationPipeline`](crate::PixelationPipeline).
///
/// A `None` material leaves the stage that needs it idle; the pipeline logs
/// that once instead of failing frames.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelationConfig {
    /// Layers drawn by the depth, normals and colour passes.
    pub layers: LayerMask,
    /// Size of the pixelated colour target.
    pub resolution: UVec2,
    /// Composites the depth pass's depth buffer into the depth target.
    pub depth_material: Option<Material>,
    /// Override used to draw view-space normals.
    pub normals_material: Option<Material>,
    /// Composites the low-res scene with depth and normals.
    pub blend_material: Option<Material>,
    /// Final copy to the display. `None` is a straight copy.
    pub blit_material: Option<Material>,
}

impl Default for PixelationConfig {
    fn default() -> Self {
        PixelationSettings::default().resolve()
    }
}

impl PixelationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = UVec2::new(width, height);
        self
    }

    pub fn depth_material(mut self, material: Option<Material>) -> Self {
        self.depth_material = material;
        self
    }

    pub fn normals_material(mut self, material: Option<Material>) -> Self {
        self.normals_material = material;
        self
    }

    pub fn blend_material(mut self, material: Option<Material>) -> Self {
        self.blend_material = material;
        self
    }

    pub fn blit_material(mut self, material: Option<Material>) -> Self {
        self.blit_material = material;
        self
    }

    /// Validates `settings` and resolves its material names.
    pub fn from_settings(settings: &PixelationSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(settings.resolve())
    }
}

/// On-disk form of the pipeline configuration.
///
/// ```ron
/// (
///     layers: 0x00000100,
///     width: 320,
///     height: 180,
///     depth_material: Some("pixelation/depth"),
///     normals_material: Some("pixelation/normals"),
///     blend_material: Some("pixelation/scene_blend"),
///     blit_material: None,
/// )
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelationSettings {
    pub layers: u32,
    pub width: u32,
    pub height: u32,
    pub depth_material: Option<String>,
    pub normals_material: Option<String>,
    pub blend_material: Option<String>,
    pub blit_material: Option<String>,
}

impl Default for PixelationSettings {
    fn default() -> Self {
        Self {
            layers: LayerMask::ALL.0,
            width: DEFAULT_RESOLUTION.x,
            height: DEFAULT_RESOLUTION.y,
            depth_material: Some("pixelation/depth".to_string()),
            normals_material: Some("pixelation/normals".to_string()),
            blend_material: Some("pixelation/scene_blend".to_string()),
            blit_material: Some("pixelation/blit".to_string()),
        }
    }
}

impl PixelationSettings {
    /// Loads settings from a `.ron` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some("ron") {
            return Err(ConfigError::Extension(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = ron::de::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidResolution {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn resolve(&self) -> PixelationConfig {
        let material = |name: &Option<String>| name.as_deref().map(Material::new);
        PixelationConfig {
            layers: LayerMask(self.layers),
            resolution: UVec2::new(self.width, self.height),
            depth_material: material(&self.depth_material),
            normals_material: material(&self.normals_material),
            blend_material: material(&self.blend_material),
            blit_material: material(&self.blit_material),
        }
    }
}

/// Errors raised while loading or validating settings.
#[derive(Debug)]
pub enum ConfigError {
    File(io::Error),
    Parser(ron::error::SpannedError),
    Serializer(ron::Error),
    /// Settings files must have the `ron` extension.
    Extension(PathBuf),
    InvalidResolution { width: u32, height: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::File(err) => write!(f, "{}", err),
            ConfigError::Parser(err) => write!(f, "{}", err),
            ConfigError::Serializer(err) => write!(f, "{}", err),
            ConfigError::Extension(path) => write!(
                f,
                "{}: invalid path extension, expected \"ron\"",
                path.display()
            ),
            ConfigError::InvalidResolution { width, height } => {
                write!(f, "invalid pixelation resolution {}x{}", width, height)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::File(err) => Some(err),
            ConfigError::Parser(err) => Some(err),
            ConfigError::Serializer(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::File(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::Parser(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::Serializer(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_pipeline() {
        let config = PixelationConfig::default();
        assert_eq!(config.resolution, UVec2::new(480, 270));
        assert_eq!(config.layers, LayerMask::ALL);
        assert_eq!(
            config.blend_material.as_ref().map(Material::name),
            Some("pixelation/scene_blend")
        );
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let settings =
            PixelationSettings::from_ron_str("(width: 320, height: 180, blit_material: None)")
                .unwrap();
        assert_eq!(settings.width, 320);
        assert_eq!(settings.blit_material, None);
        assert_eq!(settings.normals_material.as_deref(), Some("pixelation/normals"));

        let config = PixelationConfig::from_settings(&settings).unwrap();
        assert_eq!(config.resolution, UVec2::new(320, 180));
        assert!(config.blit_material.is_none());
    }

    #[test]
    fn settings_survive_a_ron_round_trip() {
        let settings = PixelationSettings {
            layers: 1 << 8,
            ..Default::default()
        };
        let text = settings.to_ron_string().unwrap();
        assert_eq!(PixelationSettings::from_ron_str(&text).unwrap(), settings);
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let err = PixelationSettings::from_ron_str("(width: 0)").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidResolution {
                width: 0,
                height: 270
            }
        ));
    }

    #[test]
    fn load_requires_ron_extension() {
        let err = PixelationSettings::load("pixelation.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Extension(_)));
    }

    #[test]
    fn malformed_files_report_parser_errors() {
        let err = PixelationSettings::from_ron_str("(width: \"wide\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parser(_)));
    }
}
