//! Conversion options

use crate::compression::{CompressionLevel, CompressionMethod};
use crate::error::{Result, SvxError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scale of the output transform, in world units per voxel
pub const DEFAULT_VOXEL_SIZE: f64 = 0.5;

/// Name given to the output grid
pub const DEFAULT_GRID_NAME: &str = "LevelSetSVX";

/// Background value of the output grid
pub const DEFAULT_BACKGROUND: f32 = 2.0;

/// Options controlling a conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub voxel_size: f64,
    pub grid_name: String,
    pub background: f32,
    pub compression: CompressionMethod,
    pub compression_level: u8,
    /// Write an empty grid file when the manifest declares no slices
    pub write_empty_grid: bool,
    pub show_progress: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            voxel_size: DEFAULT_VOXEL_SIZE,
            grid_name: DEFAULT_GRID_NAME.to_string(),
            background: DEFAULT_BACKGROUND,
            compression: CompressionMethod::default(),
            compression_level: CompressionLevel::default().value(),
            write_empty_grid: false,
            show_progress: true,
        }
    }
}

impl ConvertOptions {
    /// Load options from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            SvxError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let options: Self = serde_json::from_slice(&data).map_err(|e| {
            SvxError::Configuration(format!("invalid options in {}: {}", path.display(), e))
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_voxel_size(mut self, voxel_size: f64) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    pub fn with_grid_name(mut self, name: impl Into<String>) -> Self {
        self.grid_name = name.into();
        self
    }

    pub fn with_background(mut self, background: f32) -> Self {
        self.background = background;
        self
    }

    pub fn with_compression(mut self, method: CompressionMethod) -> Self {
        self.compression = method;
        self
    }

    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = CompressionLevel::new(level).value();
        self
    }

    pub fn with_write_empty_grid(mut self, write_empty_grid: bool) -> Self {
        self.write_empty_grid = write_empty_grid;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn level(&self) -> CompressionLevel {
        CompressionLevel::new(self.compression_level)
    }

    /// Reject options that cannot produce a usable grid
    pub fn validate(&self) -> Result<()> {
        if !self.voxel_size.is_finite() || self.voxel_size <= 0.0 {
            return Err(SvxError::Configuration(format!(
                "voxel size must be positive, got {}",
                self.voxel_size
            )));
        }
        if self.grid_name.trim().is_empty() {
            return Err(SvxError::Configuration(
                "grid name must not be empty".to_string(),
            ));
        }
        if !self.background.is_finite() {
            return Err(SvxError::Configuration(
                "background must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
