//! The device-side frame fetch contract.

use poolview_core::{RawFrame, Result, SlotId};
use std::future::Future;
use std::sync::Arc;

/// Fetches and decodes frame 0 of a media-pool slot.
///
/// Must be safe to call concurrently for different slots, and tolerate a
/// repeat call for a slot whose previous fetch is still outstanding; the
/// cache discards whichever result has been superseded.
pub trait FrameSource: Send + Sync + 'static {
    fn fetch_frame(&self, slot: SlotId) -> impl Future<Output = Result<RawFrame>> + Send;
}

impl<T: FrameSource> FrameSource for Arc<T> {
    fn fetch_frame(&self, slot: SlotId) -> impl Future<Output = Result<RawFrame>> + Send {
        (**self).fetch_frame(slot)
    }
}
