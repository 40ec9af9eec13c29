//! PoolView Cache - Media-pool preview cache
//!
//! Turns device-resident stills and clips into per-button preview bitmaps:
//! - Tracks which feedback instances want which slot (SubscriptionRegistry)
//! - Starts at most one live load per slot and discards superseded completions
//!   by comparing a per-entry generation token
//! - Memoizes rendered variants per TransformKey, coalescing concurrent requests
//! - Reacts to device snapshots by reloading stale subscribed entries and
//!   evicting stale unsubscribed ones
//!
//! Completion handlers return the feedback ids to redraw rather than calling
//! back into the host; `PreviewService` is a ready-made tokio driver that
//! spawns loads and forwards those ids over a channel.

pub mod cache;
pub mod config;
pub mod entry;
pub mod registry;
pub mod service;
pub mod source;
pub mod stats;

pub use cache::{CacheEffects, LoadTask, PreviewCache, PreviewState};
pub use config::PreviewConfig;
pub use entry::LoadStatus;
pub use registry::SubscriptionRegistry;
pub use service::PreviewService;
pub use source::FrameSource;
pub use stats::CacheStats;
