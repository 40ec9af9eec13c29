//! Cache activity counters.

/// Statistics about cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Loads handed to the frame source.
    pub loads_started: u64,

    /// Loads that stored a frame.
    pub loads_completed: u64,

    /// Loads that ended in `Failed`.
    pub loads_failed: u64,

    /// Completions discarded because a newer load or a purge replaced them.
    pub stale_completions: u64,

    /// Transform pipeline runs.
    pub renders: u64,

    /// Render requests answered from a memoized variant.
    pub variant_hits: u64,

    /// Entries deleted because nobody subscribed and their content was stale.
    pub evictions: u64,

    /// Frames dropped because their slot became empty.
    pub purges: u64,
}

impl CacheStats {
    /// Fraction of variant requests served without rendering (0.0 - 100.0).
    #[allow(clippy::cast_precision_loss)]
    pub fn variant_hit_rate(&self) -> f64 {
        let total = self.variant_hits + self.renders;
        if total == 0 {
            0.0
        } else {
            (self.variant_hits as f64 / total as f64) * 100.0
        }
    }
}
