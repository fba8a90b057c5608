//! Per-style win/loss/kill aggregation over recent bouts and whole tournaments.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::bout::{FightOutcome, ResolutionMethod, Side};
use crate::constants::DEFAULT_ROLLING_WINDOW;
use crate::style::FightingStyle;

/// Raw counters for one style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleCounters {
    pub fights: u32,
    pub wins: u32,
    pub losses: u32,
    pub kills: u32,
}

impl StyleCounters {
    /// Win share in whole percent, rounded half up. Zero before any fight.
    #[must_use]
    pub fn win_pct(&self) -> u32 {
        if self.fights == 0 {
            return 0;
        }
        let fights = u64::from(self.fights);
        let pct = (u64::from(self.wins) * 200 + fights) / (fights * 2);
        u32::try_from(pct).unwrap_or(100)
    }

    fn add(&mut self, other: Self) {
        self.fights += other.fights;
        self.wins += other.wins;
        self.losses += other.losses;
        self.kills += other.kills;
    }
}

/// One line of a style table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRow {
    pub style: FightingStyle,
    pub fights: u32,
    pub wins: u32,
    pub losses: u32,
    pub kills: u32,
    pub win_pct: u32,
}

/// Compact record of a bout kept in the rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct MetaBout {
    styles: [FightingStyle; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    winner: Option<Side>,
    method: ResolutionMethod,
}

impl MetaBout {
    fn counters(&self) -> [(FightingStyle, StyleCounters); 2] {
        [Side::A, Side::B].map(|side| {
            let mut counters = StyleCounters {
                fights: 1,
                ..StyleCounters::default()
            };
            match self.winner {
                Some(winner) if winner == side => {
                    counters.wins = 1;
                    counters.kills = u32::from(self.method == ResolutionMethod::Kill);
                }
                Some(_) => counters.losses = 1,
                None => {}
            }
            (self.styles[side.index()], counters)
        })
    }
}

/// Shared accumulator fed after every resolved bout.
///
/// Deserialization goes through [`StoredStyleMeta`], so a loaded window is
/// never zero and never holds more bouts than it allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredStyleMeta")]
pub struct StyleMeta {
    window: usize,
    recent: VecDeque<MetaBout>,
    tournaments: BTreeMap<String, BTreeMap<FightingStyle, StyleCounters>>,
}

#[derive(Deserialize)]
struct StoredStyleMeta {
    #[serde(default = "StoredStyleMeta::default_window")]
    window: usize,
    #[serde(default)]
    recent: VecDeque<MetaBout>,
    #[serde(default)]
    tournaments: BTreeMap<String, BTreeMap<FightingStyle, StyleCounters>>,
}

impl StoredStyleMeta {
    const fn default_window() -> usize {
        DEFAULT_ROLLING_WINDOW
    }
}

impl From<StoredStyleMeta> for StyleMeta {
    fn from(stored: StoredStyleMeta) -> Self {
        let mut meta = Self {
            window: stored.window,
            recent: stored.recent,
            tournaments: stored.tournaments,
        };
        meta.enforce_window();
        meta
    }
}

impl StyleMeta {
    /// Empty aggregator remembering the last `window` bouts (at least one).
    #[must_use]
    pub fn with_window(window: usize) -> Self {
        Self {
            window: window.max(1),
            recent: VecDeque::new(),
            tournaments: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Bouts currently held in the rolling window.
    #[must_use]
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    pub fn record_bout(
        &mut self,
        outcome: &FightOutcome,
        style_a: FightingStyle,
        style_b: FightingStyle,
        tournament_id: Option<&str>,
    ) {
        let bout = MetaBout {
            styles: [style_a, style_b],
            winner: outcome.winner(),
            method: outcome.method(),
        };

        if let Some(id) = tournament_id {
            let table = self.tournaments.entry(id.to_string()).or_default();
            for (style, counters) in bout.counters() {
                table.entry(style).or_default().add(counters);
            }
        }

        while self.recent.len() >= self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(bout);
    }

    /// Style table over the rolling window.
    #[must_use]
    pub fn rolling_table(&self) -> Vec<StyleRow> {
        let mut totals: BTreeMap<FightingStyle, StyleCounters> = BTreeMap::new();
        for bout in &self.recent {
            for (style, counters) in bout.counters() {
                totals.entry(style).or_default().add(counters);
            }
        }
        sorted_rows(&totals)
    }

    /// Style table for one tournament; empty for an unknown id.
    #[must_use]
    pub fn tournament_table(&self, tournament_id: &str) -> Vec<StyleRow> {
        self.tournaments
            .get(tournament_id)
            .map(sorted_rows)
            .unwrap_or_default()
    }

    pub fn tournament_ids(&self) -> impl Iterator<Item = &str> {
        self.tournaments.keys().map(String::as_str)
    }

    fn enforce_window(&mut self) {
        self.window = self.window.max(1);
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
    }
}

impl Default for StyleMeta {
    fn default() -> Self {
        Self::with_window(DEFAULT_ROLLING_WINDOW)
    }
}

fn sorted_rows(totals: &BTreeMap<FightingStyle, StyleCounters>) -> Vec<StyleRow> {
    let mut rows: Vec<StyleRow> = totals
        .iter()
        .filter(|(_, counters)| counters.fights > 0)
        .map(|(style, counters)| StyleRow {
            style: *style,
            fights: counters.fights,
            wins: counters.wins,
            losses: counters.losses,
            kills: counters.kills,
            win_pct: counters.win_pct(),
        })
        .collect();
    rows.sort_by(|a, b| b.win_pct.cmp(&a.win_pct).then(a.style.cmp(&b.style)));
    rows
}
