//! Media-pool slot identity and the device-reported slot metadata.

use crate::error::{PoolViewError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Kind of media-pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Still,
    Clip,
}

impl SlotKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Still => "still",
            Self::Clip => "clip",
        }
    }
}

/// Identifies a still or clip slot in the media pool.
///
/// Clip slots always refer to frame 0 of the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId {
    pub kind: SlotKind,
    pub index: u32,
}

impl SlotId {
    #[inline]
    pub const fn new(kind: SlotKind, index: u32) -> Self {
        Self { kind, index }
    }

    #[inline]
    pub const fn still(index: u32) -> Self {
        Self::new(SlotKind::Still, index)
    }

    #[inline]
    pub const fn clip(index: u32) -> Self {
        Self::new(SlotKind::Clip, index)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.index)
    }
}

impl FromStr for SlotId {
    type Err = PoolViewError;

    /// Parse the `still:3` / `clip:1` form used in host option strings.
    fn from_str(s: &str) -> Result<Self> {
        let (kind, index) = s
            .split_once(':')
            .ok_or_else(|| PoolViewError::InvalidSlot(format!("missing ':' in {s:?}")))?;

        let kind = match kind.trim().to_ascii_lowercase().as_str() {
            "still" => SlotKind::Still,
            "clip" => SlotKind::Clip,
            other => {
                return Err(PoolViewError::InvalidSlot(format!(
                    "unknown slot kind {other:?}"
                )))
            }
        };
        let index = index
            .trim()
            .parse::<u32>()
            .map_err(|e| PoolViewError::InvalidSlot(format!("bad slot index in {s:?}: {e}")))?;

        Ok(Self { kind, index })
    }
}

/// Device-produced description of a slot's content.
///
/// Two fingerprints that match on both fields mean the same content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContentFingerprint {
    pub hash: String,
    pub filename: String,
}

impl ContentFingerprint {
    pub fn new(hash: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            filename: filename.into(),
        }
    }
}

/// Latest known metadata for a single slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMetadata {
    pub occupied: bool,
    pub fingerprint: ContentFingerprint,
}

impl SlotMetadata {
    /// Metadata for a slot holding content.
    pub fn occupied(fingerprint: ContentFingerprint) -> Self {
        Self {
            occupied: true,
            fingerprint,
        }
    }

    /// Metadata for an empty slot.
    pub fn empty() -> Self {
        Self {
            occupied: false,
            fingerprint: ContentFingerprint::default(),
        }
    }
}

/// Snapshot of all media-pool slot metadata reported by the device.
///
/// Slots missing from the snapshot are treated as unoccupied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSnapshot {
    slots: HashMap<SlotId, SlotMetadata>,
}

impl DeviceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_slot(mut self, slot: SlotId, metadata: SlotMetadata) -> Self {
        self.slots.insert(slot, metadata);
        self
    }

    /// Metadata for a slot, if the device reported it.
    pub fn metadata(&self, slot: SlotId) -> Option<&SlotMetadata> {
        self.slots.get(&slot)
    }

    /// Whether the slot currently has content.
    pub fn is_occupied(&self, slot: SlotId) -> bool {
        self.metadata(slot).is_some_and(|m| m.occupied)
    }

    /// Fingerprint of an occupied slot.
    pub fn occupied_fingerprint(&self, slot: SlotId) -> Option<&ContentFingerprint> {
        self.metadata(slot)
            .filter(|m| m.occupied)
            .map(|m| &m.fingerprint)
    }
}

impl FromIterator<(SlotId, SlotMetadata)> for DeviceSnapshot {
    fn from_iter<T: IntoIterator<Item = (SlotId, SlotMetadata)>>(iter: T) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}
