//! Decoded media-pool frames in CPU memory.
//!
//! The device layer hands over frames as tightly packed 8-bit RGBA, which is
//! also the channel order the scaling library works in.

use crate::error::{PoolViewError, Result};
use std::sync::Arc;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A decoded still (or frame 0 of a clip), tightly packed RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RawFrame {
    /// Wrap an RGBA8 pixel buffer. The buffer length must be `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PoolViewError::InvalidFrame(format!(
                "zero-sized frame {width}x{height}"
            )));
        }

        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(PoolViewError::InvalidFrame(format!(
                "{width}x{height} RGBA frame needs {expected} bytes, got {}",
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame filled with a single RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let count = width as usize * height as usize;
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(count * BYTES_PER_PIXEL)
            .collect();
        Self::new(width, height, pixels)
    }

    /// Create a test pattern frame (color bars).
    pub fn test_pattern(width: u32, height: u32) -> Result<Self> {
        const BARS: [[u8; 4]; 8] = [
            [255, 255, 255, 255], // White
            [255, 255, 0, 255],   // Yellow
            [0, 255, 255, 255],   // Cyan
            [0, 255, 0, 255],     // Green
            [255, 0, 255, 255],   // Magenta
            [255, 0, 0, 255],     // Red
            [0, 0, 255, 255],     // Blue
            [0, 0, 0, 255],       // Black
        ];

        let mut pixels = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
        for _ in 0..height {
            for x in 0..width {
                let bar = (u64::from(x) * 8 / u64::from(width.max(1))) as usize;
                pixels.extend_from_slice(&BARS[bar.min(7)]);
            }
        }
        Self::new(width, height, pixels)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Packed RGBA8 pixel data, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Pixel data of row `y`, or `None` outside the frame.
    #[inline]
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride();
        self.pixels.get(start..start + self.stride())
    }

    /// RGBA value at (x, y), or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        let px: &[u8; 4] = bytemuck::from_bytes(&self.pixels[i..i + BYTES_PER_PIXEL]);
        Some(*px)
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }

    /// Consume the frame and return its pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Arc-wrapped frame, shared read-only between the cache and in-flight renders.
pub type SharedFrame = Arc<RawFrame>;
