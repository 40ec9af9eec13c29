//! Integer pixel geometry for cropping.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width x height` image.
    #[inline]
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle lies entirely inside a `width x height` image.
    pub fn fits_within(self, width: u32, height: u32) -> bool {
        self.right() <= u64::from(width) && self.bottom() <= u64::from(height)
    }

    /// Clamp the rectangle into a `width x height` image.
    ///
    /// The result is never empty for a non-empty image: a rectangle that
    /// falls completely outside collapses to a 1px strip at the far edge.
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        let w = self.width.clamp(1, width.max(1));
        let h = self.height.clamp(1, height.max(1));
        let x = self.x.min(width.saturating_sub(w));
        let y = self.y.min(height.saturating_sub(h));
        Self::new(x, y, w, h)
    }
}
