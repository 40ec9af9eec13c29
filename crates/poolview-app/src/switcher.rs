//! In-process stand-in for a switcher's media pool.

use parking_lot::Mutex;
use poolview_cache::FrameSource;
use poolview_core::{
    ContentFingerprint, DeviceSnapshot, PoolViewError, RawFrame, Result, SlotId, SlotMetadata,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
struct PoolItem {
    fingerprint: ContentFingerprint,
    color: Option<[u8; 4]>,
}

/// Media pool with simulated transfer latency.
pub struct SimulatedSwitcher {
    pool: Mutex<HashMap<SlotId, PoolItem>>,
    frame_size: (u32, u32),
    latency: Duration,
    revision: AtomicU64,
}

impl SimulatedSwitcher {
    pub fn new(frame_size: (u32, u32), latency: Duration) -> Self {
        Self {
            pool: Mutex::new(HashMap::new()),
            frame_size,
            latency,
            revision: AtomicU64::new(0),
        }
    }

    /// Upload color bars into a slot under `filename`.
    pub fn upload_bars(&self, slot: SlotId, filename: &str) {
        self.upload(slot, filename, None);
    }

    /// Upload a solid color into a slot under `filename`.
    pub fn upload_solid(&self, slot: SlotId, filename: &str, rgba: [u8; 4]) {
        self.upload(slot, filename, Some(rgba));
    }

    /// Empty a slot.
    pub fn clear(&self, slot: SlotId) {
        self.pool.lock().remove(&slot);
        debug!(%slot, "Cleared media pool slot");
    }

    /// Metadata for every slot, as the device would report it.
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.pool
            .lock()
            .iter()
            .map(|(slot, item)| (*slot, SlotMetadata::occupied(item.fingerprint.clone())))
            .collect()
    }

    fn upload(&self, slot: SlotId, filename: &str, color: Option<[u8; 4]>) {
        let revision = self.revision.fetch_add(1, Ordering::Relaxed) + 1;
        let fingerprint = ContentFingerprint::new(format!("{revision:08x}"), filename);
        debug!(%slot, filename, hash = %fingerprint.hash, "Uploaded to media pool");
        self.pool.lock().insert(slot, PoolItem { fingerprint, color });
    }
}

impl FrameSource for SimulatedSwitcher {
    async fn fetch_frame(&self, slot: SlotId) -> Result<RawFrame> {
        tokio::time::sleep(self.latency).await;

        let item = self
            .pool
            .lock()
            .get(&slot)
            .cloned()
            .ok_or_else(|| PoolViewError::Fetch(format!("{slot} is empty")))?;

        let (width, height) = self.frame_size;
        match item.color {
            Some(rgba) => RawFrame::solid(width, height, rgba),
            None => RawFrame::test_pattern(width, height),
        }
    }
}
