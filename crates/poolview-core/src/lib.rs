//! PoolView Core - Foundation types for media-pool previews
//!
//! This crate provides the value types shared by the preview pipeline:
//! - Slot identity and per-slot device metadata (SlotId, DeviceSnapshot)
//! - Rendering parameters (TransformKey, CropMode, PositionMode)
//! - Decoded frame buffers (RawFrame)
//! - Integer crop geometry

pub mod error;
pub mod frame;
pub mod geometry;
pub mod slot;
pub mod transform;

pub use error::{PoolViewError, Result};
pub use frame::{RawFrame, SharedFrame, BYTES_PER_PIXEL};
pub use geometry::CropRect;
pub use slot::{ContentFingerprint, DeviceSnapshot, SlotId, SlotKind, SlotMetadata};
pub use transform::{CropMode, PositionMode, TransformKey};

/// Identifier of a feedback instance on the control surface.
pub type FeedbackId = String;
