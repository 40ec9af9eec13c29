//! Per-pixel channel reordering.

use crate::settings::ChannelOrder;
use poolview_core::BYTES_PER_PIXEL;

/// Reorder a packed RGBA8 buffer in place into `order`.
///
/// Trailing bytes that do not form a whole pixel are left untouched.
pub fn reorder_rgba(pixels: &mut [u8], order: ChannelOrder) {
    let whole = pixels.len() - pixels.len() % BYTES_PER_PIXEL;
    let px: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut pixels[..whole]);

    match order {
        ChannelOrder::Rgba => {}
        ChannelOrder::Argb => px.iter_mut().for_each(|p| p.rotate_right(1)),
        ChannelOrder::Bgra => px.iter_mut().for_each(|p| p.swap(0, 2)),
    }
}
