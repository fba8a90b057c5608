//! Minute-by-minute events emitted by the bout engine.
//!
//! Tags are the mechanical contract consumed by the importance classifier and
//! the style meta; `text` is presentation only.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::outcome::Side;

/// Mechanical descriptor attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTag {
    /// One side's attack this minute.
    Exchange,
    /// The attack got through the guard.
    Hit,
    /// The attack was turned aside.
    Parry,
    /// Crowd-pleasing blow worth highlighting downstream.
    Flashy,
    /// First minute a side's stamina visibly fails.
    Fatigued,
    /// Attacker pressed a lethal finish on a badly hurt opponent.
    Finishing,
    Kill,
    Knockout,
    Stoppage,
    Draw,
}

/// Maximum tag capacity stored inline without additional allocations.
pub type EventTagSet = SmallVec<[EventTag; 4]>;

/// Immutable ledger entry for something that happened during a minute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteEvent {
    minute: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor: Option<Side>,
    text: String,
    #[serde(default)]
    tags: EventTagSet,
}

impl MinuteEvent {
    pub(crate) fn new(minute: u32, actor: Option<Side>, text: String) -> Self {
        debug_assert!(minute >= 1, "minutes are one-based");
        Self {
            minute,
            actor,
            text,
            tags: EventTagSet::new(),
        }
    }

    /// Adds a tag if it is not already present.
    pub(crate) fn tagged(mut self, tag: EventTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// One-based minute index.
    #[must_use]
    pub const fn minute(&self) -> u32 {
        self.minute
    }

    #[must_use]
    pub const fn actor(&self) -> Option<Side> {
        self.actor
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn tags(&self) -> &[EventTag] {
        &self.tags
    }

    #[must_use]
    pub fn has_tag(&self, tag: EventTag) -> bool {
        self.tags.contains(&tag)
    }
}
