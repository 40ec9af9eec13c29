//! Per-slot cache entries and their load state machine.
//!
//! Transitions: Unloaded → Loading → {Loaded, Failed}, and any state back to
//! Loading (reload) or Unloaded (slot emptied). Every transition into Loading
//! or Unloaded takes a fresh generation and drops all rendered variants.
//!
//! Generations are issued by the owning cache from a counter that outlives
//! entries, so a slot's generation keeps increasing across eviction.

use poolview_core::{ContentFingerprint, PoolViewError, RawFrame, Result, SharedFrame, TransformKey};
use poolview_render::RenderedVariant;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Public view of an entry's load state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Rendered variant slot, shared by every caller waiting on the same key.
pub(crate) type VariantCell = Arc<OnceCell<Arc<RenderedVariant>>>;

#[derive(Debug)]
enum LoadState {
    Unloaded,
    /// `target` is the fingerprint the device reported when the load started.
    Loading { target: ContentFingerprint },
    Loaded {
        fingerprint: ContentFingerprint,
        frame: SharedFrame,
    },
    Failed { fingerprint: ContentFingerprint },
}

/// Outcome of applying a loader result to an entry.
#[derive(Debug)]
pub(crate) enum Completion {
    /// A newer load (or a purge) replaced the one that finished.
    Superseded,
    Loaded,
    Failed(PoolViewError),
}

/// Cache record for one slot.
#[derive(Debug)]
pub(crate) struct CacheEntry {
    state: LoadState,
    generation: u64,
    variants: HashMap<TransformKey, VariantCell>,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            state: LoadState::Unloaded,
            generation: 0,
            variants: HashMap::new(),
        }
    }
}

impl CacheEntry {
    pub fn status(&self) -> LoadStatus {
        match self.state {
            LoadState::Unloaded => LoadStatus::Unloaded,
            LoadState::Loading { .. } => LoadStatus::Loading,
            LoadState::Loaded { .. } => LoadStatus::Loaded,
            LoadState::Failed { .. } => LoadStatus::Failed,
        }
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fingerprint this entry's content was (or is being) fetched for.
    pub fn fingerprint(&self) -> Option<&ContentFingerprint> {
        match &self.state {
            LoadState::Unloaded => None,
            LoadState::Loading { target } => Some(target),
            LoadState::Loaded { fingerprint, .. } | LoadState::Failed { fingerprint } => {
                Some(fingerprint)
            }
        }
    }

    pub fn frame(&self) -> Option<&SharedFrame> {
        match &self.state {
            LoadState::Loaded { frame, .. } => Some(frame),
            _ => None,
        }
    }

    /// True unless the entry holds content matching the device's current
    /// fingerprint. `current` is `None` when the slot is empty.
    pub fn is_stale(&self, current: Option<&ContentFingerprint>) -> bool {
        match (self.fingerprint(), current) {
            (Some(ours), Some(theirs)) => ours != theirs,
            _ => true,
        }
    }

    /// Enter Loading for `target` under `generation`, which must be newer
    /// than any generation this slot has held.
    pub fn begin_load(&mut self, generation: u64, target: ContentFingerprint) {
        debug_assert!(generation > self.generation);
        self.generation = generation;
        self.variants.clear();
        self.state = LoadState::Loading { target };
    }

    /// Drop content and invalidate any in-flight load.
    pub fn reset(&mut self, generation: u64) {
        debug_assert!(generation > self.generation);
        self.generation = generation;
        self.variants.clear();
        self.state = LoadState::Unloaded;
    }

    /// Apply a loader result if `generation` is still current.
    pub fn complete(&mut self, generation: u64, result: Result<RawFrame>) -> Completion {
        if generation != self.generation {
            return Completion::Superseded;
        }

        let target = match std::mem::replace(&mut self.state, LoadState::Unloaded) {
            LoadState::Loading { target } => target,
            other => {
                self.state = other;
                return Completion::Superseded;
            }
        };

        match result {
            Ok(frame) => {
                self.state = LoadState::Loaded {
                    fingerprint: target,
                    frame: Arc::new(frame),
                };
                Completion::Loaded
            }
            Err(err) => {
                self.state = LoadState::Failed {
                    fingerprint: target,
                };
                Completion::Failed(err)
            }
        }
    }

    /// Completed variant for `key`, if one has been rendered.
    pub fn cached_variant(&self, key: &TransformKey) -> Option<Arc<RenderedVariant>> {
        self.variants.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Cell for `key`, created on first request. `None` unless Loaded.
    pub fn variant_cell(&mut self, key: TransformKey) -> Option<VariantCell> {
        if self.frame().is_none() {
            return None;
        }
        Some(self.variants.entry(key).or_default().clone())
    }

    /// Number of completed variants.
    pub fn variant_count(&self) -> usize {
        self.variants.values().filter(|cell| cell.initialized()).count()
    }
}
