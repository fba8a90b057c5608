//! Terminal record of a resolved bout.
use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::{EventTag, MinuteEvent};

/// Which corner a combatant fought from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl Side {
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "side A"),
            Self::B => write!(f, "side B"),
        }
    }
}

/// How the bout ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Kill,
    #[serde(rename = "ko")]
    Knockout,
    Stoppage,
    Draw,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kill => write!(f, "kill"),
            Self::Knockout => write!(f, "ko"),
            Self::Stoppage => write!(f, "stoppage"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Immutable result of one bout, including its full event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FightOutcome {
    fighters: [String; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    winner: Option<Side>,
    method: ResolutionMethod,
    minutes: u32,
    events: Vec<MinuteEvent>,
}

impl FightOutcome {
    pub(crate) fn new(
        fighters: [String; 2],
        winner: Option<Side>,
        method: ResolutionMethod,
        minutes: u32,
        events: Vec<MinuteEvent>,
    ) -> Self {
        debug_assert_eq!(winner.is_none(), method == ResolutionMethod::Draw);
        Self {
            fighters,
            winner,
            method,
            minutes,
            events,
        }
    }

    /// Combatant ids in corner order.
    #[must_use]
    pub const fn fighters(&self) -> &[String; 2] {
        &self.fighters
    }

    #[must_use]
    pub const fn winner(&self) -> Option<Side> {
        self.winner
    }

    #[must_use]
    pub fn winner_id(&self) -> Option<&str> {
        self.winner.map(|side| self.fighters[side.index()].as_str())
    }

    #[must_use]
    pub fn loser(&self) -> Option<Side> {
        self.winner.map(Side::opponent)
    }

    #[must_use]
    pub const fn method(&self) -> ResolutionMethod {
        self.method
    }

    #[must_use]
    pub fn is_draw(&self) -> bool {
        self.method == ResolutionMethod::Draw
    }

    /// Minutes elapsed, always at least one.
    #[must_use]
    pub const fn minutes(&self) -> u32 {
        self.minutes
    }

    #[must_use]
    pub fn events(&self) -> &[MinuteEvent] {
        &self.events
    }

    /// Number of events carrying `tag`, optionally restricted to one actor.
    #[must_use]
    pub fn count_tagged(&self, tag: EventTag, actor: Option<Side>) -> usize {
        self.events
            .iter()
            .filter(|event| event.has_tag(tag))
            .filter(|event| actor.is_none() || event.actor() == actor)
            .count()
    }
}
