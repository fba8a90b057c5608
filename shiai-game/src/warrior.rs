//! Per-bout warrior inputs: attribute snapshots and effort plans.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    ATTRIBUTE_MAX, ATTRIBUTE_MIN, DEFAULT_KILL_DESIRE, EFFORT_MAX, EFFORT_MIN, KILL_DESIRE_MAX,
};
use crate::style::FightingStyle;

/// Malformed caller input rejected before a bout starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("attribute {field} must be between {min} and {max} (got {value})")]
    AttributeOutOfRange {
        field: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },
    #[error("{field} must be between {min} and {max} (got {value})")]
    DialOutOfRange {
        field: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },
    #[error("combatant id must not be empty")]
    EmptyId,
}

/// Immutable attribute snapshot for one bout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WarriorAttributes {
    /// Strength.
    pub st: u8,
    /// Constitution.
    pub cn: u8,
    /// Size.
    pub sz: u8,
    /// Weight.
    pub wt: u8,
    /// Willpower.
    pub wl: u8,
    /// Speed.
    pub sp: u8,
    /// Defense.
    pub df: u8,
}

impl WarriorAttributes {
    /// Uniform attributes; handy for mirror matches.
    #[must_use]
    pub const fn uniform(value: u8) -> Self {
        Self {
            st: value,
            cn: value,
            sz: value,
            wt: value,
            wl: value,
            sp: value,
            df: value,
        }
    }

    #[must_use]
    pub const fn fields(&self) -> [(&'static str, u8); 7] {
        [
            ("ST", self.st),
            ("CN", self.cn),
            ("SZ", self.sz),
            ("WT", self.wt),
            ("WL", self.wl),
            ("SP", self.sp),
            ("DF", self.df),
        ]
    }

    /// # Errors
    ///
    /// Returns [`InputError::AttributeOutOfRange`] for the first attribute
    /// that is zero or above [`ATTRIBUTE_MAX`].
    pub fn validate(&self) -> Result<(), InputError> {
        for (field, value) in self.fields() {
            if !(ATTRIBUTE_MIN..=ATTRIBUTE_MAX).contains(&value) {
                return Err(InputError::AttributeOutOfRange {
                    field,
                    value,
                    min: ATTRIBUTE_MIN,
                    max: ATTRIBUTE_MAX,
                });
            }
        }
        Ok(())
    }
}

/// Effort dials chosen by the caller for one bout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoutPlan {
    pub style: FightingStyle,
    /// Offensive effort, 1–10.
    pub offensive_effort: u8,
    /// Activity level, 1–10.
    pub activity_level: u8,
    /// Willingness to press a lethal finish, 0–10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_desire: Option<u8>,
}

impl BoutPlan {
    #[must_use]
    pub const fn new(style: FightingStyle, offensive_effort: u8, activity_level: u8) -> Self {
        Self {
            style,
            offensive_effort,
            activity_level,
            kill_desire: None,
        }
    }

    #[must_use]
    pub const fn with_kill_desire(mut self, kill_desire: u8) -> Self {
        self.kill_desire = Some(kill_desire);
        self
    }

    #[must_use]
    pub fn effective_kill_desire(&self) -> u8 {
        self.kill_desire.unwrap_or(DEFAULT_KILL_DESIRE)
    }

    /// # Errors
    ///
    /// Returns [`InputError::DialOutOfRange`] when a dial leaves its range.
    pub fn validate(&self) -> Result<(), InputError> {
        for (field, value) in [
            ("offensive_effort", self.offensive_effort),
            ("activity_level", self.activity_level),
        ] {
            if !(EFFORT_MIN..=EFFORT_MAX).contains(&value) {
                return Err(InputError::DialOutOfRange {
                    field,
                    value,
                    min: EFFORT_MIN,
                    max: EFFORT_MAX,
                });
            }
        }
        if let Some(value) = self.kill_desire
            && value > KILL_DESIRE_MAX
        {
            return Err(InputError::DialOutOfRange {
                field: "kill_desire",
                value,
                min: 0,
                max: KILL_DESIRE_MAX,
            });
        }
        Ok(())
    }
}

/// A warrior entering a bout: identity, attributes and plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub name: String,
    pub attributes: WarriorAttributes,
    pub plan: BoutPlan,
}

impl Combatant {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        attributes: WarriorAttributes,
        plan: BoutPlan,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes,
            plan,
        }
    }

    /// # Errors
    ///
    /// Returns the first attribute, dial or id problem found.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.id.trim().is_empty() {
            return Err(InputError::EmptyId);
        }
        self.attributes.validate()?;
        self.plan.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attribute_is_rejected() {
        let attrs = WarriorAttributes {
            cn: 0,
            ..WarriorAttributes::uniform(10)
        };
        assert_eq!(
            attrs.validate(),
            Err(InputError::AttributeOutOfRange {
                field: "CN",
                value: 0,
                min: ATTRIBUTE_MIN,
                max: ATTRIBUTE_MAX,
            })
        );
    }

    #[test]
    fn dials_are_independent_of_style() {
        for style in FightingStyle::ALL {
            for oe in EFFORT_MIN..=EFFORT_MAX {
                for al in EFFORT_MIN..=EFFORT_MAX {
                    assert!(BoutPlan::new(style, oe, al).validate().is_ok());
                }
            }
        }
    }

    #[test]
    fn out_of_range_dials_fail() {
        let plan = BoutPlan::new(FightingStyle::AimedBlow, 11, 5);
        assert!(matches!(
            plan.validate(),
            Err(InputError::DialOutOfRange { field: "offensive_effort", .. })
        ));
        let plan = BoutPlan::new(FightingStyle::AimedBlow, 5, 5).with_kill_desire(11);
        assert!(matches!(
            plan.validate(),
            Err(InputError::DialOutOfRange { field: "kill_desire", .. })
        ));
    }

    #[test]
    fn kill_desire_defaults_when_absent() {
        let plan = BoutPlan::new(FightingStyle::SlashingAttack, 5, 5);
        assert_eq!(plan.effective_kill_desire(), DEFAULT_KILL_DESIRE);
        assert_eq!(plan.with_kill_desire(9).effective_kill_desire(), 9);
    }

    #[test]
    fn blank_id_is_rejected() {
        let combatant = Combatant::new(
            "  ",
            "Nameless",
            WarriorAttributes::uniform(10),
            BoutPlan::new(FightingStyle::WallOfSteel, 5, 5),
        );
        assert_eq!(combatant.validate(), Err(InputError::EmptyId));
    }
}
