//! Slot → feedback-instance subscriptions.

use poolview_core::{FeedbackId, SlotId};
use std::collections::{HashMap, HashSet};

/// Which feedback instances depend on which slot.
///
/// A slot with no subscribers is not tracked at all.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscribers: HashMap<SlotId, HashSet<FeedbackId>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns `false` if it was already present.
    pub fn add(&mut self, slot: SlotId, feedback_id: FeedbackId) -> bool {
        self.subscribers.entry(slot).or_default().insert(feedback_id)
    }

    /// Remove a subscriber. Returns `false` if it was not present.
    pub fn remove(&mut self, slot: SlotId, feedback_id: &str) -> bool {
        let Some(set) = self.subscribers.get_mut(&slot) else {
            return false;
        };
        let removed = set.remove(feedback_id);
        if set.is_empty() {
            self.subscribers.remove(&slot);
        }
        removed
    }

    /// Remove a feedback instance from every slot it subscribes to.
    /// Returns the slots it was removed from.
    pub fn remove_feedback(&mut self, feedback_id: &str) -> Vec<SlotId> {
        let mut slots = Vec::new();
        self.subscribers.retain(|slot, set| {
            if set.remove(feedback_id) {
                slots.push(*slot);
            }
            !set.is_empty()
        });
        slots.sort_unstable();
        slots
    }

    pub fn is_subscribed(&self, slot: SlotId) -> bool {
        self.subscribers.contains_key(&slot)
    }

    pub fn subscriber_count(&self, slot: SlotId) -> usize {
        self.subscribers.get(&slot).map_or(0, HashSet::len)
    }

    /// Subscribers of `slot`, sorted for stable notification order.
    pub fn subscribers(&self, slot: SlotId) -> Vec<FeedbackId> {
        let mut ids: Vec<FeedbackId> = self
            .subscribers
            .get(&slot)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Every slot with at least one subscriber.
    pub fn slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.subscribers.keys().copied()
    }
}
