// SPDX-License-Identifier: CEPL-1.0
//! `ember.toml` loading and the defaults < file < CLI merge.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ember_render::RenderSize;
use ember_render_vk::{EngineConfig, ShaderPaths};
use serde::Deserialize;
use tracing::{debug, warn};

/// Where the build script put the compiled triangle shaders.
pub const BUILT_SHADER_DIR: &str = env!("OUT_DIR");

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WindowCfg {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            title: "ember".to_string(),
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RenderCfg {
    pub validation: bool,
    pub shader_dir: Option<PathBuf>,
}

impl Default for RenderCfg {
    fn default() -> Self {
        RenderCfg {
            validation: cfg!(debug_assertions),
            shader_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppCfg {
    pub window: WindowCfg,
    pub render: RenderCfg,
}

/// Command-line values that override the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub shader_dir: Option<PathBuf>,
    pub no_validation: bool,
}

/// A missing file means defaults; an unreadable or unparsable one is reported
/// and ignored.
pub fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => parse_cfg(&s).unwrap_or_else(|e| {
            warn!("ignoring {}: {e}", path.display());
            AppCfg::default()
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no config at {}, using defaults", path.display());
            AppCfg::default()
        }
        Err(e) => {
            warn!("cannot read {}: {e}; using defaults", path.display());
            AppCfg::default()
        }
    }
}

pub fn parse_cfg(s: &str) -> Result<AppCfg, toml::de::Error> {
    toml::from_str::<AppCfg>(s)
}

/// The window title and the one immutable value the renderer is built from.
pub fn resolve(cfg: &AppCfg, overrides: &Overrides) -> (String, EngineConfig) {
    let shader_dir = overrides
        .shader_dir
        .clone()
        .or_else(|| cfg.render.shader_dir.clone())
        .unwrap_or_else(|| PathBuf::from(BUILT_SHADER_DIR));

    let engine = EngineConfig {
        app_name: cfg.window.title.clone(),
        validation: cfg.render.validation && !overrides.no_validation,
        shaders: ShaderPaths::in_dir(shader_dir),
        size: RenderSize::new(cfg.window.width.max(1), cfg.window.height.max(1)),
    };
    (cfg.window.title.clone(), engine)
}
