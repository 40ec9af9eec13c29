//! The preview cache orchestrator.
//!
//! All entry mutation happens under one store lock which is never held across
//! an `.await`, so operations on the store apply one at a time while loads and
//! renders for different slots run concurrently.

use crate::config::PreviewConfig;
use crate::entry::{CacheEntry, Completion, LoadStatus, VariantCell};
use crate::registry::SubscriptionRegistry;
use crate::source::FrameSource;
use crate::stats::CacheStats;
use parking_lot::Mutex;
use poolview_core::{
    DeviceSnapshot, FeedbackId, PoolViewError, RawFrame, Result, SharedFrame, SlotId,
    SlotMetadata, TransformKey,
};
use poolview_render::{PreviewRenderer, Render, RenderedVariant};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// What a caller should draw for a slot.
#[derive(Debug, Clone)]
pub enum PreviewState {
    /// The slot has no content.
    Empty,
    /// Content exists but no preview is ready yet.
    Pending,
    /// Content exists but the last load failed.
    Unavailable,
    Ready(Arc<RenderedVariant>),
}

/// Follow-up work produced by a cache operation.
///
/// `loads` must be run (see [`LoadTask::run`]) for the cache to make
/// progress; `notify` lists feedback instances to redraw right away.
#[must_use = "load tasks do nothing unless run"]
pub struct CacheEffects<S, R = PreviewRenderer> {
    pub loads: Vec<LoadTask<S, R>>,
    pub notify: Vec<FeedbackId>,
}

impl<S, R> CacheEffects<S, R> {
    pub fn none() -> Self {
        Self {
            loads: Vec::new(),
            notify: Vec::new(),
        }
    }

    fn load(task: LoadTask<S, R>) -> Self {
        Self {
            loads: vec![task],
            notify: Vec::new(),
        }
    }

    fn notify(ids: Vec<FeedbackId>) -> Self {
        Self {
            loads: Vec::new(),
            notify: ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty() && self.notify.is_empty()
    }

    pub fn merge(&mut self, other: Self) {
        self.loads.extend(other.loads);
        self.notify.extend(other.notify);
    }
}

impl<S, R> fmt::Debug for CacheEffects<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEffects")
            .field("loads", &self.loads)
            .field("notify", &self.notify)
            .finish()
    }
}

/// One started frame load, bound to the generation it was started for.
#[must_use = "a load task does nothing unless run"]
pub struct LoadTask<S, R = PreviewRenderer> {
    cache: PreviewCache<S, R>,
    slot: SlotId,
    generation: u64,
}

impl<S, R> LoadTask<S, R> {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<S: FrameSource, R: Render> LoadTask<S, R> {
    /// Fetch the frame and apply it. Returns the feedback ids to redraw,
    /// which is empty when the load was superseded.
    pub async fn run(self) -> Vec<FeedbackId> {
        let result = self.cache.inner.source.fetch_frame(self.slot).await;
        self.cache.complete_load(self.slot, self.generation, result)
    }
}

impl<S, R> fmt::Debug for LoadTask<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadTask")
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<SlotId, CacheEntry>,
    registry: SubscriptionRegistry,
    snapshot: DeviceSnapshot,
    stats: CacheStats,
    /// Last generation handed out, across all slots. Never reset, including
    /// when entries are deleted.
    last_generation: u64,
}

impl CacheState {
    fn next_generation(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }

    /// Delete entries that nobody subscribes to and whose content is stale.
    fn evict_stale(&mut self) -> usize {
        let Self {
            entries,
            registry,
            snapshot,
            stats,
            ..
        } = self;

        let before = entries.len();
        entries.retain(|slot, entry| {
            let keep = registry.is_subscribed(*slot)
                || !entry.is_stale(snapshot.occupied_fingerprint(*slot));
            if !keep {
                debug!(%slot, "Evicting stale entry");
            }
            keep
        });

        let evicted = before - entries.len();
        stats.evictions += evicted as u64;
        evicted
    }
}

enum VariantLookup {
    NotLoaded,
    Ready(Arc<RenderedVariant>),
    Render {
        cell: VariantCell,
        frame: SharedFrame,
        generation: u64,
    },
}

struct Inner<S, R> {
    source: S,
    renderer: R,
    config: PreviewConfig,
    state: Mutex<CacheState>,
}

/// Media-pool preview cache. Cloning yields another handle to the same cache.
pub struct PreviewCache<S, R = PreviewRenderer> {
    inner: Arc<Inner<S, R>>,
}

impl<S, R> Clone for PreviewCache<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: FrameSource> PreviewCache<S, PreviewRenderer> {
    /// Create a cache using the default renderer built from `config.render`.
    pub fn new(source: S, config: PreviewConfig) -> Self {
        Self::with_renderer(source, PreviewRenderer::new(config.render), config)
    }
}

impl<S: FrameSource, R: Render> PreviewCache<S, R> {
    /// Create a cache with a custom renderer.
    pub fn with_renderer(source: S, renderer: R, config: PreviewConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                renderer,
                config,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.inner.config
    }

    /// Add `feedback_id` as a subscriber of `slot` and make sure a load is
    /// under way. Idempotent.
    pub fn subscribe(
        &self,
        slot: SlotId,
        feedback_id: impl Into<FeedbackId>,
    ) -> CacheEffects<S, R> {
        let mut state = self.inner.state.lock();
        let feedback_id = feedback_id.into();
        if state.registry.add(slot, feedback_id.clone()) {
            debug!(%slot, feedback = %feedback_id, "Subscribed");
        }
        state.entries.entry(slot).or_default();
        self.ensure_loaded_locked(&mut state, slot)
    }

    /// Remove a subscriber. The entry itself is only deleted by an eviction sweep.
    pub fn unsubscribe(&self, slot: SlotId, feedback_id: &str) -> bool {
        let removed = self.inner.state.lock().registry.remove(slot, feedback_id);
        if removed {
            debug!(%slot, feedback = %feedback_id, "Unsubscribed");
        }
        removed
    }

    /// Remove a feedback instance from every slot. Returns the affected slots.
    pub fn unsubscribe_all(&self, feedback_id: &str) -> Vec<SlotId> {
        self.inner.state.lock().registry.remove_feedback(feedback_id)
    }

    /// Start a load if the slot is occupied and its entry is absent, unloaded,
    /// failed or stale. A stale entry nobody subscribes to is deleted instead.
    pub fn ensure_loaded(&self, slot: SlotId) -> CacheEffects<S, R> {
        let mut state = self.inner.state.lock();
        self.ensure_loaded_locked(&mut state, slot)
    }

    /// Whether the latest device snapshot reports content in `slot`.
    pub fn is_slot_occupied(&self, slot: SlotId) -> bool {
        self.inner.state.lock().snapshot.is_occupied(slot)
    }

    /// Latest device-reported metadata for `slot`.
    pub fn current_slot_metadata(&self, slot: SlotId) -> Option<SlotMetadata> {
        self.inner.state.lock().snapshot.metadata(slot).cloned()
    }

    /// Rendered preview of `slot` for `key`, or `None` when no frame is loaded.
    ///
    /// Never starts a load. Renders and memoizes the variant on first request;
    /// concurrent requests for the same key share one render.
    pub async fn get_rendered_variant(
        &self,
        slot: SlotId,
        key: TransformKey,
    ) -> Option<Arc<RenderedVariant>> {
        let (cell, frame, generation) = match self.lookup_variant(slot, key) {
            VariantLookup::NotLoaded => return None,
            VariantLookup::Ready(variant) => return Some(variant),
            VariantLookup::Render {
                cell,
                frame,
                generation,
            } => (cell, frame, generation),
        };

        let variant = match cell
            .get_or_try_init(|| self.render_variant(frame, key))
            .await
        {
            Ok(variant) => Arc::clone(variant),
            Err(err) => {
                warn!(%slot, ?key, error = %err, "Failed to render preview");
                return None;
            }
        };

        // A reload that started mid-render made this variant unreachable.
        if self.generation(slot) != Some(generation) {
            trace!(%slot, generation, "Dropping variant rendered from a replaced frame");
            return None;
        }
        Some(variant)
    }

    /// Apply a new device snapshot: reload stale subscribed entries, drop
    /// frames of emptied slots, then evict stale unsubscribed entries.
    pub fn on_device_state_snapshot(&self, snapshot: DeviceSnapshot) -> CacheEffects<S, R> {
        let mut state = self.inner.state.lock();
        state.snapshot = snapshot;

        let tracked: BTreeSet<SlotId> = state
            .entries
            .keys()
            .copied()
            .chain(state.registry.slots())
            .collect();

        let mut effects = CacheEffects::none();
        for slot in tracked {
            if !state.registry.is_subscribed(slot) {
                continue;
            }
            let current = state.snapshot.occupied_fingerprint(slot);
            let stale = state
                .entries
                .get(&slot)
                .map_or(true, |entry| entry.is_stale(current));
            if stale {
                effects.merge(self.ensure_loaded_locked(&mut state, slot));
            }
        }

        let evicted = state.evict_stale();
        if evicted > 0 {
            info!(evicted, "Evicted stale preview entries");
        }
        effects
    }

    /// Run the eviction sweep without a new snapshot.
    pub fn sweep(&self) -> usize {
        self.inner.state.lock().evict_stale()
    }

    /// Convenience combining occupancy, load state and the rendered variant.
    pub async fn preview_state(&self, slot: SlotId, key: TransformKey) -> PreviewState {
        if !self.is_slot_occupied(slot) {
            return PreviewState::Empty;
        }
        if let Some(variant) = self.get_rendered_variant(slot, key).await {
            return PreviewState::Ready(variant);
        }
        match self.load_state(slot) {
            Some(LoadStatus::Failed) => PreviewState::Unavailable,
            _ => PreviewState::Pending,
        }
    }

    pub fn load_state(&self, slot: SlotId) -> Option<LoadStatus> {
        self.inner.state.lock().entries.get(&slot).map(CacheEntry::status)
    }

    pub fn generation(&self, slot: SlotId) -> Option<u64> {
        self.inner
            .state
            .lock()
            .entries
            .get(&slot)
            .map(CacheEntry::generation)
    }

    pub fn subscribers(&self, slot: SlotId) -> Vec<FeedbackId> {
        self.inner.state.lock().registry.subscribers(slot)
    }

    /// Slots that currently have a cache entry.
    pub fn tracked_slots(&self) -> Vec<SlotId> {
        let mut slots: Vec<SlotId> = self.inner.state.lock().entries.keys().copied().collect();
        slots.sort_unstable();
        slots
    }

    pub fn variant_count(&self, slot: SlotId) -> usize {
        self.inner
            .state
            .lock()
            .entries
            .get(&slot)
            .map_or(0, CacheEntry::variant_count)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.state.lock().stats
    }

    fn ensure_loaded_locked(&self, state: &mut CacheState, slot: SlotId) -> CacheEffects<S, R> {
        let current = state.snapshot.occupied_fingerprint(slot).cloned();
        let subscribed = state.registry.is_subscribed(slot);

        if let Some(entry) = state.entries.get(&slot) {
            let stale = entry.is_stale(current.as_ref());
            if stale && !subscribed && entry.status() != LoadStatus::Unloaded {
                state.entries.remove(&slot);
                state.stats.evictions += 1;
                debug!(%slot, "Dropped stale entry with no subscribers");
                return CacheEffects::none();
            }
            if !stale && matches!(entry.status(), LoadStatus::Loading | LoadStatus::Loaded) {
                return CacheEffects::none();
            }
        }

        let Some(target) = current else {
            return Self::purge_locked(state, slot);
        };

        let generation = state.next_generation();
        state.entries.entry(slot).or_default().begin_load(generation, target);
        state.stats.loads_started += 1;
        debug!(%slot, generation, "Starting frame load");

        CacheEffects::load(LoadTask {
            cache: self.clone(),
            slot,
            generation,
        })
    }

    /// Drop the frame of a slot that became empty and notify its subscribers.
    fn purge_locked(state: &mut CacheState, slot: SlotId) -> CacheEffects<S, R> {
        let loaded = state
            .entries
            .get(&slot)
            .is_some_and(|entry| entry.status() != LoadStatus::Unloaded);
        if !loaded {
            return CacheEffects::none();
        }

        let generation = state.next_generation();
        if let Some(entry) = state.entries.get_mut(&slot) {
            entry.reset(generation);
        }
        state.stats.purges += 1;
        info!(%slot, generation, "Slot emptied, dropped cached frame");
        CacheEffects::notify(state.registry.subscribers(slot))
    }

    fn complete_load(
        &self,
        slot: SlotId,
        generation: u64,
        result: Result<RawFrame>,
    ) -> Vec<FeedbackId> {
        let mut state = self.inner.state.lock();
        let CacheState {
            entries,
            registry,
            stats,
            ..
        } = &mut *state;

        let completion = match entries.get_mut(&slot) {
            Some(entry) => entry.complete(generation, result),
            None => Completion::Superseded,
        };

        match completion {
            Completion::Superseded => {
                stats.stale_completions += 1;
                trace!(%slot, generation, "Discarding superseded load");
                Vec::new()
            }
            Completion::Loaded => {
                stats.loads_completed += 1;
                info!(%slot, generation, "Frame loaded");
                registry.subscribers(slot)
            }
            Completion::Failed(err) => {
                stats.loads_failed += 1;
                warn!(%slot, generation, error = %err, "Frame load failed");
                registry.subscribers(slot)
            }
        }
    }

    fn lookup_variant(&self, slot: SlotId, key: TransformKey) -> VariantLookup {
        let mut state = self.inner.state.lock();
        let CacheState { entries, stats, .. } = &mut *state;

        let entry = entries.entry(slot).or_default();
        let Some(frame) = entry.frame().cloned() else {
            return VariantLookup::NotLoaded;
        };
        if let Some(variant) = entry.cached_variant(&key) {
            stats.variant_hits += 1;
            return VariantLookup::Ready(variant);
        }
        match entry.variant_cell(key) {
            Some(cell) => VariantLookup::Render {
                cell,
                frame,
                generation: entry.generation(),
            },
            None => VariantLookup::NotLoaded,
        }
    }

    async fn render_variant(
        &self,
        frame: SharedFrame,
        key: TransformKey,
    ) -> Result<Arc<RenderedVariant>> {
        self.inner.state.lock().stats.renders += 1;

        let variant = if self.inner.config.render_on_blocking_pool {
            let inner = Arc::clone(&self.inner);
            tokio::task::spawn_blocking(move || inner.renderer.render(&frame, &key))
                .await
                .map_err(|e| PoolViewError::Internal(format!("render task failed: {e}")))??
        } else {
            self.inner.renderer.render(&frame, &key)?
        };

        Ok(Arc::new(variant))
    }
}
