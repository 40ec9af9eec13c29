//! Integration tests for the preview cache.
//!
//! Exercises load sequencing, staleness, eviction and memoization across
//! poolview-core, poolview-render and poolview-cache.

use crate::harness::{fingerprint, snapshot, solid, test_cache, GatedRenderer, ScriptedSource};
use poolview_cache::{LoadStatus, PreviewCache, PreviewConfig, PreviewService, PreviewState};
use poolview_core::{DeviceSnapshot, PoolViewError, SlotId, TransformKey};
use std::sync::Arc;
use std::time::Duration;

const BLUE: [u8; 4] = [0, 0, 255, 255];
const RED: [u8; 4] = [255, 0, 0, 255];

fn key() -> TransformKey {
    TransformKey::fit(64, 36).unwrap()
}

// ── Load sequencing ────────────────────────────────────────────

#[tokio::test]
async fn identical_fingerprint_does_not_reload() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::still(0);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let task = effects.loads.pop().unwrap();
    let load = tokio::spawn(task.run());
    source.wait_for_calls(1).await;
    source.release(0, solid(RED));
    assert_eq!(load.await.unwrap(), vec!["fb1".to_string()]);

    let first = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let second = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    assert!(first.is_empty());
    assert!(second.is_empty());
    assert_eq!(source.call_count(), 1);
    assert_eq!(cache.load_state(slot), Some(LoadStatus::Loaded));
}

#[tokio::test]
async fn newer_load_wins_over_slower_older_load() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::still(1);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let g1 = effects.loads.pop().unwrap();
    let g1_generation = g1.generation();
    let older = tokio::spawn(g1.run());
    source.wait_for_calls(1).await;

    // Content changes while the first fetch is still outstanding.
    let mut effects = cache.on_device_state_snapshot(snapshot(&[(slot, "b")]));
    assert_eq!(effects.loads.len(), 1);
    let g2 = effects.loads.pop().unwrap();
    let g2_generation = g2.generation();
    assert!(g2_generation > g1_generation);
    let newer = tokio::spawn(g2.run());
    source.wait_for_calls(2).await;

    source.release(1, solid(BLUE));
    assert_eq!(newer.await.unwrap(), vec!["fb1".to_string()]);

    source.release(0, solid(RED));
    assert!(older.await.unwrap().is_empty());

    assert_eq!(cache.generation(slot), Some(g2_generation));
    assert_eq!(cache.load_state(slot), Some(LoadStatus::Loaded));
    assert_eq!(cache.stats().stale_completions, 1);

    let variant = cache.get_rendered_variant(slot, key()).await.unwrap();
    // Default output is ARGB.
    assert_eq!(&variant.pixels[..4], &[255, 0, 0, 255]);
}

#[tokio::test]
async fn in_flight_load_discarded_when_slot_empties() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::clip(0);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;

    let effects = cache.on_device_state_snapshot(DeviceSnapshot::new());
    assert!(effects.loads.is_empty());
    assert_eq!(effects.notify, vec!["fb1".to_string()]);

    source.release(0, solid(RED));
    assert!(load.await.unwrap().is_empty());
    assert_eq!(cache.load_state(slot), Some(LoadStatus::Unloaded));
    assert!(cache.get_rendered_variant(slot, key()).await.is_none());
}

// ── Eviction ───────────────────────────────────────────────────

#[tokio::test]
async fn unsubscribed_fresh_entry_is_kept() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::still(2);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;
    source.release(0, solid(RED));
    load.await.unwrap();

    assert!(cache.unsubscribe(slot, "fb1"));
    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));

    assert_eq!(cache.tracked_slots(), vec![slot]);
    assert_eq!(cache.stats().evictions, 0);
}

#[tokio::test]
async fn subscribed_stale_entry_is_reloaded_not_evicted() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::still(3);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;
    source.release(0, solid(RED));
    load.await.unwrap();

    let effects = cache.on_device_state_snapshot(snapshot(&[(slot, "b")]));
    assert_eq!(effects.loads.len(), 1);
    assert_eq!(cache.tracked_slots(), vec![slot]);
    assert_eq!(cache.load_state(slot), Some(LoadStatus::Loading));
    assert_eq!(cache.stats().evictions, 0);
}

#[tokio::test]
async fn unsubscribed_stale_entry_is_evicted() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::still(4);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;
    source.release(0, solid(RED));
    load.await.unwrap();

    cache.unsubscribe(slot, "fb1");
    let effects = cache.on_device_state_snapshot(snapshot(&[(slot, "b")]));

    assert!(effects.is_empty());
    assert!(cache.tracked_slots().is_empty());
    assert_eq!(cache.stats().evictions, 1);
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn load_for_evicted_entry_completes_into_nothing() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::still(5);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let old_task = effects.loads.pop().unwrap();
    let old_generation = old_task.generation();
    let old = tokio::spawn(old_task.run());
    source.wait_for_calls(1).await;

    cache.unsubscribe(slot, "fb1");
    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "b")]));
    assert!(cache.tracked_slots().is_empty());

    // The slot is wanted again before the orphaned fetch returns.
    let mut effects = cache.subscribe(slot, "fb1");
    let new_task = effects.loads.pop().unwrap();
    assert!(new_task.generation() > old_generation);
    let new = tokio::spawn(new_task.run());
    source.wait_for_calls(2).await;

    source.release(0, solid(RED));
    assert!(old.await.unwrap().is_empty());
    assert_eq!(cache.load_state(slot), Some(LoadStatus::Loading));

    source.release(1, solid(BLUE));
    assert_eq!(new.await.unwrap(), vec!["fb1".to_string()]);
    assert_eq!(cache.load_state(slot), Some(LoadStatus::Loaded));
    assert_eq!(cache.stats().stale_completions, 1);

    let variant = cache.get_rendered_variant(slot, key()).await.unwrap();
    assert_eq!(&variant.pixels[..4], &[255, 0, 0, 255]);
}

#[tokio::test]
async fn generations_never_repeat_across_eviction_and_ensure_loaded() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::still(20);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.ensure_loaded(slot);
    let old_task = effects.loads.pop().unwrap();
    let old_generation = old_task.generation();
    let old = tokio::spawn(old_task.run());
    source.wait_for_calls(1).await;

    // Nobody subscribes, so new content evicts the loading entry.
    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "b")]));
    assert!(cache.tracked_slots().is_empty());

    let mut effects = cache.subscribe(slot, "fb1");
    let new_task = effects.loads.pop().unwrap();
    assert_ne!(new_task.generation(), old_generation);
    let new = tokio::spawn(new_task.run());
    source.wait_for_calls(2).await;

    source.release(0, solid(RED));
    source.release(1, solid(BLUE));
    assert!(old.await.unwrap().is_empty());
    assert_eq!(new.await.unwrap(), vec!["fb1".to_string()]);

    let variant = cache.get_rendered_variant(slot, key()).await.unwrap();
    assert_eq!(&variant.pixels[..4], &[255, 0, 0, 255]);
}

#[tokio::test]
async fn ensure_loaded_without_subscribers_still_loads() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::still(11);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.ensure_loaded(slot);
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;
    source.release(0, solid(RED));

    assert!(load.await.unwrap().is_empty());
    assert_eq!(cache.load_state(slot), Some(LoadStatus::Loaded));
    assert!(cache.ensure_loaded(slot).is_empty());
}

// ── Rendering ──────────────────────────────────────────────────

#[tokio::test]
async fn same_key_renders_once() {
    let (cache, source, renderer) = test_cache();
    let slot = SlotId::still(6);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;
    source.release(0, solid(RED));
    load.await.unwrap();

    let first = cache.get_rendered_variant(slot, key()).await.unwrap();
    let second = cache.get_rendered_variant(slot, key()).await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(renderer.renders(), 1);
    assert_eq!(cache.variant_count(slot), 1);

    let other = TransformKey::fit(32, 32).unwrap();
    cache.get_rendered_variant(slot, other).await.unwrap();
    assert_eq!(renderer.renders(), 2);
    assert_eq!(cache.variant_count(slot), 2);
}

#[tokio::test]
async fn concurrent_requests_share_one_render() {
    let (cache, source, renderer) = test_cache();
    let slot = SlotId::still(7);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;
    source.release(0, solid(RED));
    load.await.unwrap();

    let (a, b, c) = tokio::join!(
        cache.get_rendered_variant(slot, key()),
        cache.get_rendered_variant(slot, key()),
        cache.get_rendered_variant(slot, key()),
    );
    assert!(a.is_some() && b.is_some() && c.is_some());
    assert_eq!(renderer.renders(), 1);
}

#[tokio::test]
async fn reload_invalidates_variants() {
    let (cache, source, renderer) = test_cache();
    let slot = SlotId::still(8);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;
    source.release(0, solid(RED));
    load.await.unwrap();
    cache.get_rendered_variant(slot, key()).await.unwrap();

    let mut effects = cache.on_device_state_snapshot(snapshot(&[(slot, "b")]));
    assert_eq!(cache.variant_count(slot), 0);
    assert!(cache.get_rendered_variant(slot, key()).await.is_none());

    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(2).await;
    source.release(1, solid(BLUE));
    load.await.unwrap();

    let variant = cache.get_rendered_variant(slot, key()).await.unwrap();
    assert_eq!(&variant.pixels[..4], &[255, 0, 0, 255]);
    assert_eq!(renderer.renders(), 2);
}

#[tokio::test]
async fn render_overtaken_by_reload_is_discarded() {
    let source = Arc::new(ScriptedSource::default());
    let renderer = GatedRenderer::new();
    let cache = PreviewCache::with_renderer(
        Arc::clone(&source),
        renderer.clone(),
        PreviewConfig::default(),
    );
    let slot = SlotId::still(13);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;
    source.release(0, solid(RED));
    load.await.unwrap();

    let rendering = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_rendered_variant(slot, key()).await })
    };
    renderer.wait_for_renders(1).await;

    // Content is replaced while the render is still running.
    let effects = cache.on_device_state_snapshot(snapshot(&[(slot, "b")]));
    assert_eq!(effects.loads.len(), 1);

    renderer.open();
    assert!(rendering.await.unwrap().is_none());
    assert_eq!(cache.variant_count(slot), 0);
    assert_eq!(cache.load_state(slot), Some(LoadStatus::Loading));
}

// ── Empty vs failed ────────────────────────────────────────────

#[tokio::test]
async fn empty_slot_is_not_an_error() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::clip(1);

    let effects = cache.subscribe(slot, "fb1");
    assert!(effects.is_empty());
    assert!(!cache.is_slot_occupied(slot));
    assert!(cache.get_rendered_variant(slot, key()).await.is_none());
    assert!(matches!(
        cache.preview_state(slot, key()).await,
        PreviewState::Empty
    ));
    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn failed_load_is_occupied_without_preview() {
    let (cache, source, _) = test_cache();
    let slot = SlotId::still(9);

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let mut effects = cache.subscribe(slot, "fb1");
    let load = tokio::spawn(effects.loads.pop().unwrap().run());
    source.wait_for_calls(1).await;
    source.release(0, Err(PoolViewError::Decode("corrupt still".into())));

    // Subscribers hear about the failure exactly once.
    assert_eq!(load.await.unwrap(), vec!["fb1".to_string()]);
    assert!(cache.is_slot_occupied(slot));
    assert!(cache.get_rendered_variant(slot, key()).await.is_none());
    assert_eq!(cache.load_state(slot), Some(LoadStatus::Failed));
    assert!(matches!(
        cache.preview_state(slot, key()).await,
        PreviewState::Unavailable
    ));

    // No automatic retry; a fresh subscribe tries again.
    assert!(cache.on_device_state_snapshot(snapshot(&[(slot, "a")])).is_empty());
    let effects = cache.subscribe(slot, "fb2");
    assert_eq!(effects.loads.len(), 1);
}

#[tokio::test]
async fn slot_metadata_follows_latest_snapshot() {
    let (cache, _, _) = test_cache();
    let slot = SlotId::still(12);

    assert!(cache.current_slot_metadata(slot).is_none());

    let _ = cache.on_device_state_snapshot(snapshot(&[(slot, "a")]));
    let metadata = cache.current_slot_metadata(slot).unwrap();
    assert!(metadata.occupied);
    assert_eq!(metadata.fingerprint, fingerprint("a"));

    let _ = cache.on_device_state_snapshot(DeviceSnapshot::new());
    assert!(cache.current_slot_metadata(slot).is_none());
    assert!(!cache.is_slot_occupied(slot));
}

// ── Subscriptions ──────────────────────────────────────────────

#[tokio::test]
async fn subscription_set_mutation() {
    let (cache, _, _) = test_cache();
    let slot = SlotId::still(10);

    let _ = cache.subscribe(slot, "fb1");
    let _ = cache.subscribe(slot, "fb2");
    cache.unsubscribe(slot, "fb1");

    assert_eq!(cache.subscribers(slot), vec!["fb2".to_string()]);
}

#[tokio::test]
async fn unsubscribe_all_removes_feedback_everywhere() {
    let (cache, _, _) = test_cache();

    let _ = cache.subscribe(SlotId::still(0), "fb1");
    let _ = cache.subscribe(SlotId::clip(0), "fb1");
    let _ = cache.subscribe(SlotId::clip(0), "fb2");

    let slots = cache.unsubscribe_all("fb1");
    assert_eq!(slots, vec![SlotId::still(0), SlotId::clip(0)]);
    assert!(cache.subscribers(SlotId::still(0)).is_empty());
    assert_eq!(cache.subscribers(SlotId::clip(0)), vec!["fb2".to_string()]);
}

// ── Service driver ─────────────────────────────────────────────

#[tokio::test]
async fn service_delivers_notifications_for_each_completed_load() {
    let (cache, source, _) = test_cache();
    let (service, mut notifications) = PreviewService::new(cache).unwrap();
    let still = SlotId::still(0);
    let clip = SlotId::clip(0);

    service.on_device_state_snapshot(snapshot(&[(still, "a"), (clip, "b")]));
    service.subscribe(still, "fb-still");
    service.subscribe(clip, "fb-clip");
    source.wait_for_calls(2).await;

    source.release(1, solid(BLUE));
    source.release(0, solid(RED));

    let mut received = Vec::new();
    for _ in 0..2 {
        let ids = tokio::time::timeout(Duration::from_secs(5), notifications.recv())
            .await
            .unwrap()
            .unwrap();
        received.extend(ids);
    }
    received.sort();
    assert_eq!(received, vec!["fb-clip".to_string(), "fb-still".to_string()]);
}
