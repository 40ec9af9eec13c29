//! PoolView - media-pool preview cache demo
//!
//! Drives the preview cache against a simulated switcher: buttons subscribe
//! to stills, content is replaced while loads are in flight, a slot is
//! emptied, and every redraw request is rendered and logged.
//!
//! Usage: `poolview [config.json]`

mod switcher;

use anyhow::{Context, Result};
use poolview_cache::{PreviewCache, PreviewConfig, PreviewService, PreviewState};
use poolview_core::{CropMode, FeedbackId, PositionMode, SlotId, TransformKey};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use switcher::SimulatedSwitcher;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// A button on the control surface showing one slot.
struct Button {
    slot: SlotId,
    key: TransformKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("PoolView starting...");

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => PreviewConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PreviewConfig::default(),
    };
    info!(?config, "Preview configuration");

    let switcher = Arc::new(SimulatedSwitcher::new(
        (1920, 1080),
        Duration::from_millis(40),
    ));
    let cache = PreviewCache::new(Arc::clone(&switcher), config);
    let (service, mut notifications) = PreviewService::new(cache)?;
    let service = Arc::new(service);

    let buttons: Arc<HashMap<FeedbackId, Button>> = Arc::new(HashMap::from([
        (
            "btn-still-0".to_string(),
            Button {
                slot: SlotId::still(0),
                key: TransformKey::new(72, 72, CropMode::Center, PositionMode::Center)?,
            },
        ),
        (
            "btn-still-0-wide".to_string(),
            Button {
                slot: SlotId::still(0),
                key: TransformKey::new(72, 58, CropMode::None, PositionMode::Bottom)?,
            },
        ),
        (
            "btn-still-1".to_string(),
            Button {
                slot: SlotId::still(1),
                key: TransformKey::new(72, 72, CropMode::Left, PositionMode::Center)?,
            },
        ),
        (
            "btn-clip-0".to_string(),
            Button {
                slot: SlotId::clip(0),
                key: TransformKey::fit(72, 72)?,
            },
        ),
    ]));

    // Redraw loop: the host re-requests a render for every notified feedback.
    let redraw = {
        let service = Arc::clone(&service);
        let buttons = Arc::clone(&buttons);
        tokio::spawn(async move {
            while let Some(ids) = notifications.recv().await {
                for id in ids {
                    let Some(button) = buttons.get(&id) else {
                        warn!(feedback = %id, "Notification for unknown feedback");
                        continue;
                    };
                    match service.preview_state(button.slot, button.key).await {
                        PreviewState::Ready(variant) => info!(
                            feedback = %id,
                            width = variant.width,
                            height = variant.height,
                            offset_y = variant.draw_offset_y,
                            order = ?variant.channel_order,
                            "Redraw with preview"
                        ),
                        state => info!(feedback = %id, ?state, "Redraw with placeholder"),
                    }
                }
            }
        })
    };

    switcher.upload_bars(SlotId::still(0), "bars.png");
    switcher.upload_solid(SlotId::still(1), "red.png", [200, 30, 30, 255]);
    switcher.upload_bars(SlotId::clip(0), "opener.mov");
    service.on_device_state_snapshot(switcher.snapshot());

    for (id, button) in buttons.iter() {
        service.subscribe(button.slot, id.clone());
    }
    tokio::time::sleep(Duration::from_millis(150)).await;

    info!("Replacing still 1 twice while the first reload is in flight");
    switcher.upload_solid(SlotId::still(1), "green.png", [30, 200, 30, 255]);
    service.on_device_state_snapshot(switcher.snapshot());
    tokio::time::sleep(Duration::from_millis(10)).await;
    switcher.upload_solid(SlotId::still(1), "blue.png", [30, 30, 200, 255]);
    service.on_device_state_snapshot(switcher.snapshot());
    tokio::time::sleep(Duration::from_millis(150)).await;

    info!("Emptying clip 0");
    switcher.clear(SlotId::clip(0));
    service.on_device_state_snapshot(switcher.snapshot());
    tokio::time::sleep(Duration::from_millis(50)).await;

    info!("Removing the still 1 button and replacing its content");
    service.unsubscribe(SlotId::still(1), "btn-still-1");
    switcher.upload_solid(SlotId::still(1), "white.png", [255, 255, 255, 255]);
    service.on_device_state_snapshot(switcher.snapshot());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = service.cache().stats();
    info!(
        loads_started = stats.loads_started,
        loads_completed = stats.loads_completed,
        loads_failed = stats.loads_failed,
        stale_completions = stats.stale_completions,
        renders = stats.renders,
        variant_hit_rate = stats.variant_hit_rate(),
        evictions = stats.evictions,
        purges = stats.purges,
        tracked = ?service.cache().tracked_slots(),
        "PoolView finished"
    );

    redraw.abort();
    Ok(())
}
