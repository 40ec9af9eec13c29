//! Rendering parameters that key cached preview variants.

use crate::error::{PoolViewError, Result};
use serde::{Deserialize, Serialize};

/// Horizontal crop alignment. `None` scales the whole frame to fit instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// Vertical placement of a letterboxed image. Only used with `CropMode::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionMode {
    Top,
    #[default]
    Center,
    Bottom,
}

/// One rendering-parameter combination for a button preview.
///
/// Equality is structural; each distinct key owns its own rendered variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TransformKey {
    output_width: u32,
    output_height: u32,
    crop: CropMode,
    position: PositionMode,
}

impl TransformKey {
    /// Build a key, rejecting zero output dimensions.
    pub fn new(
        output_width: u32,
        output_height: u32,
        crop: CropMode,
        position: PositionMode,
    ) -> Result<Self> {
        if output_width == 0 || output_height == 0 {
            return Err(PoolViewError::InvalidTransform(format!(
                "output size must be positive, got {output_width}x{output_height}"
            )));
        }
        Ok(Self {
            output_width,
            output_height,
            crop,
            position,
        })
    }

    /// Scale-to-fit key with centered placement.
    pub fn fit(output_width: u32, output_height: u32) -> Result<Self> {
        Self::new(output_width, output_height, CropMode::None, PositionMode::Center)
    }

    #[inline]
    pub fn output_width(&self) -> u32 {
        self.output_width
    }

    #[inline]
    pub fn output_height(&self) -> u32 {
        self.output_height
    }

    #[inline]
    pub fn crop(&self) -> CropMode {
        self.crop
    }

    #[inline]
    pub fn position(&self) -> PositionMode {
        self.position
    }

    /// Output box size in pixels.
    #[inline]
    pub fn output_size(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }
}
