//! Fighting style archetypes and their behavioral bias.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of fighting styles a warrior can bring to a bout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FightingStyle {
    BashingAttack,
    LungingAttack,
    TotalParry,
    AimedBlow,
    WallOfSteel,
    ParryRiposte,
    ParryLunge,
    ParryStrike,
    SlashingAttack,
    StrikingAttack,
}

/// Multipliers applied to effort dials; 1.0 is neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleBias {
    /// Scales effective offense.
    pub aggression: f64,
    /// Scales how much activity level converts into footwork (and its stamina cost).
    pub mobility: f64,
    /// Scales effective defense.
    pub patience: f64,
}

impl FightingStyle {
    pub const ALL: [Self; 10] = [
        Self::BashingAttack,
        Self::LungingAttack,
        Self::TotalParry,
        Self::AimedBlow,
        Self::WallOfSteel,
        Self::ParryRiposte,
        Self::ParryLunge,
        Self::ParryStrike,
        Self::SlashingAttack,
        Self::StrikingAttack,
    ];

    #[must_use]
    pub const fn bias(self) -> StyleBias {
        let (aggression, mobility, patience) = match self {
            Self::BashingAttack => (1.25, 0.85, 0.85),
            Self::LungingAttack => (1.15, 1.20, 0.80),
            Self::TotalParry => (0.70, 0.95, 1.35),
            Self::AimedBlow => (0.95, 0.90, 1.15),
            Self::WallOfSteel => (1.10, 0.95, 1.10),
            Self::ParryRiposte => (0.90, 1.00, 1.25),
            Self::ParryLunge => (1.00, 1.10, 1.15),
            Self::ParryStrike => (1.00, 0.95, 1.20),
            Self::SlashingAttack => (1.20, 1.05, 0.90),
            Self::StrikingAttack => (1.15, 1.00, 0.95),
        };
        StyleBias {
            aggression,
            mobility,
            patience,
        }
    }

    /// Two-letter abbreviation used in standings tables.
    #[must_use]
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::BashingAttack => "BA",
            Self::LungingAttack => "LU",
            Self::TotalParry => "TP",
            Self::AimedBlow => "AB",
            Self::WallOfSteel => "WS",
            Self::ParryRiposte => "PR",
            Self::ParryLunge => "PL",
            Self::ParryStrike => "PS",
            Self::SlashingAttack => "SL",
            Self::StrikingAttack => "ST",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::BashingAttack => "Bashing Attack",
            Self::LungingAttack => "Lunging Attack",
            Self::TotalParry => "Total Parry",
            Self::AimedBlow => "Aimed Blow",
            Self::WallOfSteel => "Wall of Steel",
            Self::ParryRiposte => "Parry-Riposte",
            Self::ParryLunge => "Parry-Lunge",
            Self::ParryStrike => "Parry-Strike",
            Self::SlashingAttack => "Slashing Attack",
            Self::StrikingAttack => "Striking Attack",
        }
    }

    /// Verb used in exchange flavor text.
    pub(crate) const fn verb(self) -> &'static str {
        match self {
            Self::BashingAttack => "bashes",
            Self::LungingAttack => "lunges",
            Self::TotalParry => "turns the blade and counters",
            Self::AimedBlow => "places an aimed blow",
            Self::WallOfSteel => "whirls a wall of steel",
            Self::ParryRiposte => "ripostes",
            Self::ParryLunge => "parries and lunges",
            Self::ParryStrike => "parries and strikes",
            Self::SlashingAttack => "slashes",
            Self::StrikingAttack => "strikes",
        }
    }
}

impl fmt::Display for FightingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Raised when a style name does not match any archetype.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown fighting style '{0}'")]
pub struct StyleParseError(pub String);

impl FromStr for FightingStyle {
    type Err = StyleParseError;

    /// Accepts display names, snake_case ids, and abbreviations, ignoring case,
    /// spaces, hyphens and underscores.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key: String = value
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|style| {
                let name: String = style
                    .display_name()
                    .chars()
                    .filter(char::is_ascii_alphabetic)
                    .map(|c| c.to_ascii_uppercase())
                    .collect();
                key == name || key == style.abbreviation()
            })
            .ok_or_else(|| StyleParseError(value.to_string()))
    }
}
