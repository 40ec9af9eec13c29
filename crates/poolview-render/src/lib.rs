//! PoolView Render - Transform pipeline for button previews
//!
//! Turns a decoded media-pool frame into a button-sized bitmap:
//! 1. Crop to the button aspect ratio (optional, left/center/right aligned)
//! 2. Scale to fit the output box without stretching
//! 3. Reorder channels from RGBA into the consumer's channel order
//! 4. Compute the vertical draw offset for letterboxed images
//!
//! The pipeline is pure: it never touches cache state, so results can be
//! memoized on (frame, TransformKey).

pub mod channels;
pub mod layout;
pub mod pipeline;
pub mod settings;

pub use channels::reorder_rgba;
pub use layout::{crop_rect, draw_offset_y, fit_size};
pub use pipeline::{render, PreviewRenderer, Render, RenderedVariant};
pub use settings::{ChannelOrder, RenderSettings, ResizeFilter};
