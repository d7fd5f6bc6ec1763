//! Generation parameters: defaults, YAML loading, validation.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters for a full generation run.
///
/// Every field has a default, so a YAML file only needs to name the values
/// it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapParams {
    pub height: u32,
    pub width: u32,
    /// Fixed seed; a random one is drawn when omitted.
    pub seed: Option<u32>,
    /// Tiles from each edge forced to water.
    pub waterborder: u32,
    /// Rarity denominator for the forced random landmass outcomes.
    pub control: u32,
    /// Same-value neighbor count at or below which a tile is flipped.
    pub lone_tile_threshold: u32,
    /// Scale factor between heatmap cells and landmass pixels.
    pub resolution: u32,
    /// Output pixels per map tile.
    pub pixel_size: u32,
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            height: 500,
            width: 500,
            seed: None,
            waterborder: 4,
            control: 10_000,
            lone_tile_threshold: 0,
            resolution: 4,
            pixel_size: 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("params parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("params validation error: {0}")]
    Validation(String),
}

impl MapParams {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let text = fs::read_to_string(path)?;
        let params: Self = serde_yaml::from_str(&text)?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.height == 0 || self.width == 0 {
            return Err(ParamsError::Validation(
                "map dimensions must be positive".into(),
            ));
        }
        if self.control < 2 {
            return Err(ParamsError::Validation(
                "control must be at least 2 so both forced outcomes stay reachable".into(),
            ));
        }
        if self.resolution == 0 {
            return Err(ParamsError::Validation(
                "heatmap resolution must be at least 1".into(),
            ));
        }
        if self.pixel_size == 0 {
            return Err(ParamsError::Validation(
                "pixel size must be at least 1".into(),
            ));
        }
        if self.width <= 2 * self.waterborder || self.height <= 2 * self.waterborder {
            return Err(ParamsError::Validation(format!(
                "water border {} leaves no interior in a {}x{} map",
                self.waterborder, self.width, self.height
            )));
        }
        let interior = (self.width - 2 * self.waterborder) as u64
            * (self.height - 2 * self.waterborder) as u64;
        if interior < 12 {
            return Err(ParamsError::Validation(format!(
                "interior of {interior} tiles cannot hold the landmass seed points"
            )));
        }
        Ok(())
    }
}
