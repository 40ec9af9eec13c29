//! The preview transform pipeline: crop → scale → channel reorder → placement.

use crate::channels::reorder_rgba;
use crate::layout::{crop_rect, draw_offset_y, fit_size};
use crate::settings::{ChannelOrder, RenderSettings};
use image::{imageops, ImageBuffer, Rgba};
use poolview_core::{PoolViewError, RawFrame, Result, TransformKey};
use tracing::trace;

/// A frame rendered for one TransformKey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedVariant {
    /// Packed pixels in `channel_order`.
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Row inside the output box where the image's top edge is drawn.
    pub draw_offset_y: u32,
    pub channel_order: ChannelOrder,
}

impl RenderedVariant {
    /// Total memory usage in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }
}

/// Run the pipeline for one frame and key.
pub fn render(
    frame: &RawFrame,
    key: &TransformKey,
    settings: &RenderSettings,
) -> Result<RenderedVariant> {
    let (frame_w, frame_h) = frame.dimensions();
    let view: ImageBuffer<Rgba<u8>, &[u8]> = ImageBuffer::from_raw(frame_w, frame_h, frame.pixels())
        .ok_or_else(|| {
            PoolViewError::Render(format!("pixel buffer does not cover {frame_w}x{frame_h}"))
        })?;

    let rect = crop_rect(frame_w, frame_h, key);
    let cropped = imageops::crop_imm(&view, rect.x, rect.y, rect.width, rect.height);

    let (out_w, out_h) = key.output_size();
    let (width, height) = fit_size(rect.width, rect.height, out_w, out_h);
    let scaled = imageops::resize(&*cropped, width, height, settings.filter.into());

    let mut pixels = scaled.into_raw();
    reorder_rgba(&mut pixels, settings.channel_order);

    let draw_offset_y = draw_offset_y(key, height);
    trace!(?rect, width, height, draw_offset_y, "Rendered preview variant");

    Ok(RenderedVariant {
        pixels,
        width,
        height,
        draw_offset_y,
        channel_order: settings.channel_order,
    })
}

/// Produces rendered variants from raw frames.
///
/// Implementations must be pure with respect to cache state.
pub trait Render: Send + Sync + 'static {
    fn render(&self, frame: &RawFrame, key: &TransformKey) -> Result<RenderedVariant>;
}

/// The default renderer, backed by the `image` crate's scaler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewRenderer {
    settings: RenderSettings,
}

impl PreviewRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }
}

impl Render for PreviewRenderer {
    fn render(&self, frame: &RawFrame, key: &TransformKey) -> Result<RenderedVariant> {
        render(frame, key, &self.settings)
    }
}
