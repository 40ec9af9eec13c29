//! Tokio driver for the preview cache.
//!
//! Spawns every load the cache asks for and forwards the resulting
//! "redraw these feedbacks" lists over an unbounded channel, which is the
//! host's `notifyFeedbacksChanged` hook.

use crate::cache::{CacheEffects, PreviewCache, PreviewState};
use crate::source::FrameSource;
use poolview_core::{DeviceSnapshot, FeedbackId, PoolViewError, Result, SlotId, TransformKey};
use poolview_render::{PreviewRenderer, Render, RenderedVariant};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

/// Receiving end for feedback redraw requests.
pub type NotifyReceiver = mpsc::UnboundedReceiver<Vec<FeedbackId>>;

/// Runs a [`PreviewCache`] on a tokio runtime.
pub struct PreviewService<S, R = PreviewRenderer> {
    cache: PreviewCache<S, R>,
    notify_tx: mpsc::UnboundedSender<Vec<FeedbackId>>,
    runtime: Handle,
}

impl<S: FrameSource, R: Render> PreviewService<S, R> {
    /// Wrap `cache`, spawning loads on the current tokio runtime.
    ///
    /// Fails when called outside a runtime.
    pub fn new(cache: PreviewCache<S, R>) -> Result<(Self, NotifyReceiver)> {
        let runtime = Handle::try_current()
            .map_err(|e| PoolViewError::Internal(format!("no tokio runtime: {e}")))?;
        Ok(Self::with_runtime(cache, runtime))
    }

    /// Wrap `cache`, spawning loads on `runtime`.
    pub fn with_runtime(cache: PreviewCache<S, R>, runtime: Handle) -> (Self, NotifyReceiver) {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        (
            Self {
                cache,
                notify_tx,
                runtime,
            },
            notify_rx,
        )
    }

    pub fn cache(&self) -> &PreviewCache<S, R> {
        &self.cache
    }

    pub fn subscribe(&self, slot: SlotId, feedback_id: impl Into<FeedbackId>) {
        self.dispatch(self.cache.subscribe(slot, feedback_id));
    }

    pub fn unsubscribe(&self, slot: SlotId, feedback_id: &str) -> bool {
        self.cache.unsubscribe(slot, feedback_id)
    }

    pub fn ensure_loaded(&self, slot: SlotId) {
        self.dispatch(self.cache.ensure_loaded(slot));
    }

    pub fn on_device_state_snapshot(&self, snapshot: DeviceSnapshot) {
        self.dispatch(self.cache.on_device_state_snapshot(snapshot));
    }

    pub fn is_slot_occupied(&self, slot: SlotId) -> bool {
        self.cache.is_slot_occupied(slot)
    }

    pub async fn get_rendered_variant(
        &self,
        slot: SlotId,
        key: TransformKey,
    ) -> Option<Arc<RenderedVariant>> {
        self.cache.get_rendered_variant(slot, key).await
    }

    pub async fn preview_state(&self, slot: SlotId, key: TransformKey) -> PreviewState {
        self.cache.preview_state(slot, key).await
    }

    fn dispatch(&self, effects: CacheEffects<S, R>) {
        send_notification(&self.notify_tx, effects.notify);

        for task in effects.loads {
            let tx = self.notify_tx.clone();
            debug!(slot = %task.slot(), generation = task.generation(), "Spawning frame load");
            self.runtime.spawn(async move {
                let ids = task.run().await;
                send_notification(&tx, ids);
            });
        }
    }
}

fn send_notification(tx: &mpsc::UnboundedSender<Vec<FeedbackId>>, ids: Vec<FeedbackId>) {
    if ids.is_empty() {
        return;
    }
    if tx.send(ids).is_err() {
        debug!("Notification receiver dropped");
    }
}
