//! Bout importance classification.
//!
//! Rank strings arrive in many renderings ("Ōzeki", "OZEKI", " ozeki ",
//! "Oozeki"); they are canonicalized before any lookup so every rendering of
//! the same rank weighs the same. Ordering of classified bouts never depends
//! on input or container iteration order.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::bout::{EventTag, FightOutcome, ResolutionMethod, Side};
use crate::constants::{
    IMPORTANCE_FLASHY_BONUS, IMPORTANCE_FLASHY_CAP, IMPORTANCE_KILL_BONUS, IMPORTANCE_KO_BONUS,
    IMPORTANCE_UPSET_BONUS,
};

const DEFAULT_IMPORTANCE_DATA: &str = include_str!("../assets/importance.json");
const MAEGASHIRA_SLOTS: u8 = 17;

/// Canonicalize a rank string: strip diacritics, uppercase, trim, and collapse
/// inner whitespace. Applying it twice yields the same string.
#[must_use]
pub fn normalize_rank(raw: &str) -> String {
    let upper: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_uppercase)
        .collect();

    let mut out = String::with_capacity(upper.len());
    let mut pending_space = false;
    for c in upper.nfd() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if is_combining_mark(c) {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        match fold_letter(c) {
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }
    out
}

/// Latin letters whose stroke or ligature survives canonical decomposition.
const fn fold_letter(c: char) -> Option<&'static str> {
    let folded = match c {
        'Æ' => "AE",
        'Đ' | 'Ð' => "D",
        'Ħ' => "H",
        'Ŀ' | 'Ł' => "L",
        'Ø' => "O",
        'Œ' => "OE",
        'Ŧ' => "T",
        'Þ' => "TH",
        _ => return None,
    };
    Some(folded)
}

/// Banzuke rank after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Yokozuna,
    Ozeki,
    Sekiwake,
    Komusubi,
    /// Maegashira with its position (1 is highest).
    Maegashira(u8),
    Juryo,
    Makushita,
    Sandanme,
    Jonidan,
    Jonokuchi,
    Unranked,
}

impl Rank {
    /// Parse any rendering of a rank. Unknown text is [`Rank::Unranked`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize_rank(raw);
        let mut parts = normalized.split(' ');
        match parts.next().unwrap_or_default() {
            "YOKOZUNA" => Self::Yokozuna,
            "OZEKI" | "OOZEKI" => Self::Ozeki,
            "SEKIWAKE" => Self::Sekiwake,
            "KOMUSUBI" => Self::Komusubi,
            "MAEGASHIRA" => {
                let position = parts
                    .next()
                    .and_then(|p| p.trim_start_matches('#').parse::<u8>().ok())
                    .unwrap_or(1)
                    .clamp(1, MAEGASHIRA_SLOTS);
                Self::Maegashira(position)
            }
            "JURYO" | "JUURYOU" | "JURYOU" => Self::Juryo,
            "MAKUSHITA" => Self::Makushita,
            "SANDANME" => Self::Sandanme,
            "JONIDAN" => Self::Jonidan,
            "JONOKUCHI" => Self::Jonokuchi,
            _ => Self::Unranked,
        }
    }

    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::Yokozuna => 100,
            Self::Ozeki => 80,
            Self::Sekiwake => 60,
            Self::Komusubi => 50,
            Self::Maegashira(position) => {
                let clamped = if position == 0 { 1 } else { position };
                40_u32.saturating_sub(clamped as u32 - 1)
            }
            Self::Juryo => 20,
            Self::Makushita => 10,
            Self::Sandanme => 6,
            Self::Jonidan => 3,
            Self::Jonokuchi => 1,
            Self::Unranked => 0,
        }
    }
}

/// Ordinal importance bucket consumed by the allocation pass.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceTier {
    #[default]
    Low,
    Notable,
    Major,
    Headline,
}

impl ImportanceTier {
    #[must_use]
    pub const fn ordinal(self) -> u32 {
        match self {
            Self::Low => 0,
            Self::Notable => 1,
            Self::Major => 2,
            Self::Headline => 3,
        }
    }
}

/// Importance signal for one bout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Importance {
    pub score: u32,
    pub tier: ImportanceTier,
    /// Combined rank weight of both participants; first tie-breaker.
    pub rank_sum: u32,
}

/// Where a bout is fought.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BoutContext {
    Tournament { tournament_id: String, day: u8 },
    Exhibition,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub rank: String,
}

/// A bout as scheduled; east fights from side A, west from side B.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduledBout {
    pub bout_id: String,
    pub east: Participant,
    pub west: Participant,
    pub context: BoutContext,
}

impl ScheduledBout {
    fn participant(&self, side: Side) -> &Participant {
        match side {
            Side::A => &self.east,
            Side::B => &self.west,
        }
    }

    fn ordered_ids(&self) -> (&str, &str) {
        let (east, west) = (self.east.id.as_str(), self.west.id.as_str());
        if east <= west {
            (east, west)
        } else {
            (west, east)
        }
    }
}

/// Errors raised when importance configuration invariants are violated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportanceConfigError {
    #[error("tier thresholds must ascend (notable {notable}, major {major}, headline {headline})")]
    ThresholdOrder {
        notable: u32,
        major: u32,
        headline: u32,
    },
    #[error("{field} must be positive")]
    ZeroMultiplier { field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub notable: u32,
    pub major: u32,
    pub headline: u32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            notable: 60,
            major: 120,
            headline: 200,
        }
    }
}

/// Scoring knobs for the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportanceConfig {
    #[serde(default = "ImportanceConfig::default_tournament_multiplier_pct")]
    pub tournament_multiplier_pct: u32,
    #[serde(default = "ImportanceConfig::default_exhibition_multiplier_pct")]
    pub exhibition_multiplier_pct: u32,
    /// Tournament days from this one onward count as the final stretch.
    #[serde(default = "ImportanceConfig::default_final_days_from")]
    pub final_days_from: u8,
    #[serde(default = "ImportanceConfig::default_final_days_bonus_pct")]
    pub final_days_bonus_pct: u32,
    #[serde(default)]
    pub tier_thresholds: TierThresholds,
}

impl ImportanceConfig {
    const fn default_tournament_multiplier_pct() -> u32 {
        150
    }

    const fn default_exhibition_multiplier_pct() -> u32 {
        100
    }

    const fn default_final_days_from() -> u8 {
        13
    }

    const fn default_final_days_bonus_pct() -> u32 {
        20
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_IMPORTANCE_DATA).unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ImportanceConfigError> {
        let TierThresholds {
            notable,
            major,
            headline,
        } = self.tier_thresholds;
        if !(notable < major && major < headline) {
            return Err(ImportanceConfigError::ThresholdOrder {
                notable,
                major,
                headline,
            });
        }
        if self.tournament_multiplier_pct == 0 {
            return Err(ImportanceConfigError::ZeroMultiplier {
                field: "tournament_multiplier_pct",
            });
        }
        if self.exhibition_multiplier_pct == 0 {
            return Err(ImportanceConfigError::ZeroMultiplier {
                field: "exhibition_multiplier_pct",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn tier_for(&self, score: u32) -> ImportanceTier {
        let t = &self.tier_thresholds;
        if score >= t.headline {
            ImportanceTier::Headline
        } else if score >= t.major {
            ImportanceTier::Major
        } else if score >= t.notable {
            ImportanceTier::Notable
        } else {
            ImportanceTier::Low
        }
    }

    fn context_multiplier_pct(&self, context: &BoutContext) -> u32 {
        match context {
            BoutContext::Tournament { day, .. } => {
                let mut pct = self.tournament_multiplier_pct;
                if *day >= self.final_days_from {
                    pct = pct.saturating_add(self.final_days_bonus_pct);
                }
                pct
            }
            BoutContext::Exhibition => self.exhibition_multiplier_pct,
        }
    }
}

impl Default for ImportanceConfig {
    fn default() -> Self {
        Self {
            tournament_multiplier_pct: Self::default_tournament_multiplier_pct(),
            exhibition_multiplier_pct: Self::default_exhibition_multiplier_pct(),
            final_days_from: Self::default_final_days_from(),
            final_days_bonus_pct: Self::default_final_days_bonus_pct(),
            tier_thresholds: TierThresholds::default(),
        }
    }
}

/// Importance of a scheduled bout from ranks and context alone.
#[must_use]
pub fn classify(bout: &ScheduledBout, cfg: &ImportanceConfig) -> Importance {
    let rank_sum = Rank::parse(&bout.east.rank).weight() + Rank::parse(&bout.west.rank).weight();
    let score = rank_sum.saturating_mul(cfg.context_multiplier_pct(&bout.context)) / 100;
    Importance {
        score,
        tier: cfg.tier_for(score),
        rank_sum,
    }
}

/// Post-hoc importance of a completed bout: the scheduled score plus bonuses
/// for the finish, flashy exchanges, and upsets.
#[must_use]
pub fn classify_completed(
    bout: &ScheduledBout,
    outcome: &FightOutcome,
    cfg: &ImportanceConfig,
) -> Importance {
    let base = classify(bout, cfg);
    let mut bonus = match outcome.method() {
        ResolutionMethod::Kill => IMPORTANCE_KILL_BONUS,
        ResolutionMethod::Knockout => IMPORTANCE_KO_BONUS,
        ResolutionMethod::Stoppage | ResolutionMethod::Draw => 0,
    };
    let flashy = u32::try_from(outcome.count_tagged(EventTag::Flashy, None)).unwrap_or(u32::MAX);
    bonus = bonus.saturating_add(
        flashy
            .saturating_mul(IMPORTANCE_FLASHY_BONUS)
            .min(IMPORTANCE_FLASHY_CAP),
    );
    if let Some(winner) = outcome.winner() {
        let winner_weight = Rank::parse(&bout.participant(winner).rank).weight();
        let loser_weight = Rank::parse(&bout.participant(winner.opponent()).rank).weight();
        if winner_weight < loser_weight {
            bonus = bonus.saturating_add(IMPORTANCE_UPSET_BONUS);
        }
    }
    let score = base.score.saturating_add(bonus);
    Importance {
        score,
        tier: cfg.tier_for(score),
        rank_sum: base.rank_sum,
    }
}

/// A scheduled bout paired with its importance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedBout {
    pub bout_id: String,
    pub importance: Importance,
}

/// Classify and order bouts: score descending, then combined rank sum
/// descending, then participant ids ascending, then bout id.
#[must_use]
pub fn rank_bouts(bouts: &[ScheduledBout], cfg: &ImportanceConfig) -> Vec<RankedBout> {
    let mut scored: Vec<(&ScheduledBout, Importance)> =
        bouts.iter().map(|bout| (bout, classify(bout, cfg))).collect();
    scored.sort_by(|(left, li), (right, ri)| compare_ranked(left, li, right, ri));
    scored
        .into_iter()
        .map(|(bout, importance)| RankedBout {
            bout_id: bout.bout_id.clone(),
            importance,
        })
        .collect()
}

fn compare_ranked(
    left: &ScheduledBout,
    left_importance: &Importance,
    right: &ScheduledBout,
    right_importance: &Importance,
) -> Ordering {
    right_importance
        .score
        .cmp(&left_importance.score)
        .then_with(|| right_importance.rank_sum.cmp(&left_importance.rank_sum))
        .then_with(|| left.ordered_ids().cmp(&right.ordered_ids()))
        .then_with(|| left.bout_id.cmp(&right.bout_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bout(
        id: &str,
        east: (&str, &str),
        west: (&str, &str),
        context: BoutContext,
    ) -> ScheduledBout {
        ScheduledBout {
            bout_id: id.to_string(),
            east: Participant {
                id: east.0.to_string(),
                rank: east.1.to_string(),
            },
            west: Participant {
                id: west.0.to_string(),
                rank: west.1.to_string(),
            },
            context,
        }
    }

    fn basho(day: u8) -> BoutContext {
        BoutContext::Tournament {
            tournament_id: String::from("haru"),
            day,
        }
    }

    #[test]
    fn accented_renderings_normalize_equal() {
        assert_eq!(normalize_rank("Ōzeki"), "OZEKI");
        assert_eq!(normalize_rank("  ozeki "), "OZEKI");
        // Decomposed form: O + combining macron.
        assert_eq!(normalize_rank("O\u{0304}zeki"), "OZEKI");
        assert_eq!(normalize_rank("Jūryō"), normalize_rank("JURYO"));
        assert_eq!(normalize_rank("maegashira   #3"), "MAEGASHIRA #3");
    }

    #[test]
    fn precomposed_letters_outside_latin_1_lose_their_marks() {
        // U+1EC6, E with circumflex and dot below.
        assert_eq!(normalize_rank("S\u{1EC6}KIWAKE"), "SEKIWAKE");
        assert_eq!(normalize_rank("ṃakushita"), "MAKUSHITA");
        assert_eq!(normalize_rank("Ǿzeki"), "OZEKI");
        assert_eq!(normalize_rank("Łódź"), "LODZ");
        assert_eq!(Rank::parse("Sệkiwake"), Rank::Sekiwake);
    }

    #[test]
    fn normalization_is_idempotent() {
        let renderings = [
            "Ōzeki",
            "Yokozuna ",
            "Maegashira  12",
            "Jūryō",
            "straße",
            "Œuvre",
            "Ệ ǰ",
        ];
        for raw in renderings {
            let once = normalize_rank(raw);
            assert_eq!(normalize_rank(&once), once, "{raw}");
        }
    }

    #[test]
    fn rank_lookup_ignores_rendering() {
        assert_eq!(Rank::parse("Ōzeki"), Rank::Ozeki);
        assert_eq!(Rank::parse("OOZEKI"), Rank::Ozeki);
        assert_eq!(Rank::parse("maegashira 5"), Rank::Maegashira(5));
        assert_eq!(Rank::parse("Maegashira"), Rank::Maegashira(1));
        assert_eq!(Rank::parse("Maegashira #40"), Rank::Maegashira(17));
        assert_eq!(Rank::parse("Grand Champion"), Rank::Unranked);
        assert!(Rank::Maegashira(1).weight() > Rank::Maegashira(10).weight());
        assert!(Rank::Komusubi.weight() > Rank::Maegashira(1).weight());
    }

    #[test]
    fn tournament_context_outweighs_exhibition() {
        let cfg = ImportanceConfig::default();
        let exhibition = bout("x", ("a", "Ozeki"), ("b", "Sekiwake"), BoutContext::Exhibition);
        let early = bout("t", ("a", "Ozeki"), ("b", "Sekiwake"), basho(2));
        let late = bout("f", ("a", "Ozeki"), ("b", "Sekiwake"), basho(15));
        let ex = classify(&exhibition, &cfg);
        let ea = classify(&early, &cfg);
        let la = classify(&late, &cfg);
        assert_eq!(ex.score, 140);
        assert_eq!(ea.score, 210);
        assert_eq!(la.score, 238);
        assert_eq!(ex.tier, ImportanceTier::Major);
        assert_eq!(la.tier, ImportanceTier::Headline);
    }

    #[test]
    fn ranking_breaks_ties_by_rank_sum_then_ids() {
        let cfg = ImportanceConfig::default();
        let bouts = vec![
            bout("b3", ("zeta", "Komusubi"), ("eta", "Komusubi"), BoutContext::Exhibition),
            bout("b1", ("beta", "Yokozuna"), ("alpha", "Jonokuchi"), BoutContext::Exhibition),
            bout("b2", ("gamma", "Ōzeki"), ("delta", "Jūryō"), BoutContext::Exhibition),
            bout("b4", ("aaron", "OZEKI"), ("abel", "JURYO"), BoutContext::Exhibition),
        ];
        let ranked = rank_bouts(&bouts, &cfg);
        let order: Vec<&str> = ranked.iter().map(|r| r.bout_id.as_str()).collect();
        // b1 scores 101; the rest tie on score and rank sum, so participant ids decide.
        assert_eq!(order, vec!["b1", "b4", "b2", "b3"]);

        let mut reversed = bouts.clone();
        reversed.reverse();
        assert_eq!(rank_bouts(&reversed, &cfg), ranked);
    }

    #[test]
    fn completed_bout_rewards_upsets_and_kills() {
        let cfg = ImportanceConfig::default();
        let scheduled = bout("u", ("low", "Juryo"), ("high", "Yokozuna"), BoutContext::Exhibition);
        let outcome = FightOutcome::new(
            [String::from("low"), String::from("high")],
            Some(Side::A),
            ResolutionMethod::Kill,
            4,
            Vec::new(),
        );
        let importance = classify_completed(&scheduled, &outcome, &cfg);
        assert_eq!(
            importance.score,
            120 + IMPORTANCE_KILL_BONUS + IMPORTANCE_UPSET_BONUS
        );
        assert_eq!(importance.rank_sum, 120);
    }

    #[test]
    fn bundled_config_is_valid() {
        let cfg = ImportanceConfig::load_from_static();
        cfg.validate().unwrap();
        assert_eq!(cfg, ImportanceConfig::default());
        let broken = ImportanceConfig {
            tier_thresholds: TierThresholds {
                notable: 10,
                major: 5,
                headline: 20,
            },
            ..ImportanceConfig::default()
        };
        assert!(matches!(
            broken.validate(),
            Err(ImportanceConfigError::ThresholdOrder { .. })
        ));
    }
}
