//! Crop, fit and placement arithmetic.

use poolview_core::{CropMode, CropRect, PositionMode, TransformKey};

/// Source rectangle to take from a `frame_width x frame_height` frame.
///
/// With a crop mode the rectangle keeps the output box's aspect ratio at full
/// frame height, aligned left, center or right. Degenerate inputs (a frame
/// narrower than the box aspect) are clamped to the frame bounds.
pub fn crop_rect(frame_width: u32, frame_height: u32, key: &TransformKey) -> CropRect {
    let full = CropRect::full(frame_width, frame_height);
    if key.crop() == CropMode::None || frame_width == 0 || frame_height == 0 {
        return full;
    }

    let crop_width = u64::from(frame_height) * u64::from(key.output_width())
        / u64::from(key.output_height());
    let crop_width = crop_width.clamp(1, u64::from(frame_width)) as u32;
    let spare = frame_width - crop_width;

    let x = match key.crop() {
        CropMode::Left | CropMode::None => 0,
        CropMode::Center => spare / 2,
        CropMode::Right => spare,
    };

    CropRect::new(x, 0, crop_width, frame_height).clamp_to(frame_width, frame_height)
}

/// Largest size with the source aspect ratio that fits in the output box.
///
/// Never returns a zero dimension.
pub fn fit_size(src_width: u32, src_height: u32, box_width: u32, box_height: u32) -> (u32, u32) {
    let src_w = f64::from(src_width.max(1));
    let src_h = f64::from(src_height.max(1));
    let ratio = (f64::from(box_width) / src_w).min(f64::from(box_height) / src_h);

    let w = (src_w * ratio).round().clamp(1.0, f64::from(box_width.max(1))) as u32;
    let h = (src_h * ratio).round().clamp(1.0, f64::from(box_height.max(1))) as u32;
    (w, h)
}

/// Vertical offset of an `image_height` image inside the output box.
pub fn draw_offset_y(key: &TransformKey, image_height: u32) -> u32 {
    if key.crop() != CropMode::None {
        return 0;
    }

    let spare = key.output_height().saturating_sub(image_height);
    match key.position() {
        PositionMode::Top => 0,
        PositionMode::Center => spare / 2,
        PositionMode::Bottom => spare,
    }
}
