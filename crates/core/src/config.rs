//! Engine configuration loaded from `ember.toml`.
//!
//! Every field has a default, so a missing file, a missing section or a
//! missing key all resolve to the built-in values. The window defaults are
//! the fixed 800x600 size and title the demo was written against.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::Result;

/// Default window width in pixels.
pub const WINDOW_WIDTH: u32 = 800;
/// Default window height in pixels.
pub const WINDOW_HEIGHT: u32 = 600;
/// Default window title.
pub const WINDOW_TITLE: &str = "Ember Engine";

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "ember.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub assets: AssetConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            title: WINDOW_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Enable the Khronos validation layer.
    pub validation: bool,
    /// Prefer MAILBOX presentation over FIFO when the surface offers it.
    pub prefer_mailbox: bool,
    /// Swap chain render pass clear color (RGBA).
    pub clear_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            prefer_mailbox: true,
            clear_color: [0.01, 0.01, 0.01, 1.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub shader_dir: PathBuf,
    pub model_dir: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("shaders"),
            model_dir: PathBuf::from("models"),
        }
    }
}

impl AssetConfig {
    /// Path of a compiled shader inside the shader directory.
    pub fn shader(&self, name: &str) -> PathBuf {
        self.shader_dir.join(name)
    }

    /// Path of a mesh file inside the model directory.
    pub fn model(&self, name: &str) -> PathBuf {
        self.model_dir.join(name)
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `path`, falling back to defaults.
    ///
    /// A missing file is silent; a file that fails to parse is reported and
    /// then ignored.
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match Self::from_toml_str(&text) {
                Ok(config) => {
                    debug!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Load [`CONFIG_FILE`] from the working directory.
    pub fn load() -> Self {
        Self::load_or_default(Path::new(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_window() {
        let config = EngineConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.window.title, WINDOW_TITLE);
        assert_eq!(config.render.clear_color, [0.01, 0.01, 0.01, 1.0]);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [window]
            width = 1280

            [render]
            prefer_mailbox = false
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, WINDOW_HEIGHT);
        assert!(!config.render.prefer_mailbox);
        assert_eq!(config.assets.shader_dir, PathBuf::from("shaders"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("[window\nwidth = ").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = EngineConfig::load_or_default(Path::new("definitely/not/here.toml"));
        assert_eq!(config.window.width, WINDOW_WIDTH);
    }

    #[test]
    fn test_asset_paths_join_directories() {
        let assets = AssetConfig::default();
        assert_eq!(
            assets.shader("vert.spv"),
            PathBuf::from("shaders").join("vert.spv")
        );
        assert_eq!(
            assets.model("quad.obj"),
            PathBuf::from("models").join("quad.obj")
        );
    }
}
