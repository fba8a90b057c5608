//! Deterministic bout resolution.
//!
//! A bout is simulated in whole minutes. Each minute both sides attack at
//! once from their pre-minute state, damage is applied simultaneously, effort
//! is charged as fatigue, and terminal conditions are checked in fixed order:
//! kill, knockout, stoppage, then the draw at the minute cap. The engine is a
//! pure function of the two combatants, the configuration, and the RNG stream
//! it is handed; it draws exactly four values per minute.
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::RngStream;
use crate::warrior::{Combatant, InputError};

pub mod event;
mod fighter;
pub mod outcome;

pub use event::{EventTag, EventTagSet, MinuteEvent};
pub use outcome::{FightOutcome, ResolutionMethod, Side};

use crate::constants::ROLL_FLOOR;
use fighter::FighterState;

const DEFAULT_BOUT_DATA: &str = include_str!("../../assets/bout.json");

/// Errors raised when bout configuration invariants are violated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoutConfigError {
    #[error("max_minutes must be at least 1 (got {0})")]
    NoMinutes(u32),
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

/// Errors surfaced by [`resolve_bout`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoutError {
    #[error("invalid input for {side}: {source}")]
    InvalidInput { side: Side, source: InputError },
    #[error("invalid bout configuration: {0}")]
    InvalidConfig(#[from] BoutConfigError),
}

/// Tunable thresholds for bout resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoutConfig {
    /// Minute cap; reaching it without a finish is a draw.
    #[serde(default = "BoutConfig::default_max_minutes")]
    pub max_minutes: u32,
    /// Condition below `-lethal_fraction * max` kills.
    #[serde(default = "BoutConfig::default_lethal_fraction")]
    pub lethal_fraction: f64,
    /// Below this share of condition the attacker's kill desire adds damage.
    #[serde(default = "BoutConfig::default_finishing_fraction")]
    pub finishing_fraction: f64,
    /// Restrained lead (`lead * (10 - kill_desire) / 10`) that stops a bout.
    #[serde(default = "BoutConfig::default_stoppage_threshold")]
    pub stoppage_threshold: f64,
    /// The trailing side must be at or below this share of condition to be stopped.
    #[serde(default = "BoutConfig::default_stoppage_condition_fraction")]
    pub stoppage_condition_fraction: f64,
    /// Share of the attack rating a minute's pressure must exceed to be flashy.
    #[serde(default = "BoutConfig::default_flashy_fraction")]
    pub flashy_fraction: f64,
}

impl BoutConfig {
    const fn default_max_minutes() -> u32 {
        15
    }

    const fn default_lethal_fraction() -> f64 {
        0.2
    }

    const fn default_finishing_fraction() -> f64 {
        0.3
    }

    const fn default_stoppage_threshold() -> f64 {
        20.0
    }

    const fn default_stoppage_condition_fraction() -> f64 {
        0.5
    }

    const fn default_flashy_fraction() -> f64 {
        0.6
    }

    /// Load the bundled tuning, falling back to compiled defaults.
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_BOUT_DATA).unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), BoutConfigError> {
        if self.max_minutes == 0 {
            return Err(BoutConfigError::NoMinutes(self.max_minutes));
        }
        for (field, value, min, max) in [
            ("lethal_fraction", self.lethal_fraction, 0.0, 1.0),
            ("finishing_fraction", self.finishing_fraction, 0.0, 1.0),
            ("stoppage_threshold", self.stoppage_threshold, 0.0, 10_000.0),
            (
                "stoppage_condition_fraction",
                self.stoppage_condition_fraction,
                0.0,
                1.0,
            ),
            ("flashy_fraction", self.flashy_fraction, 0.0, 2.0),
        ] {
            if !(min..=max).contains(&value) {
                return Err(BoutConfigError::RangeViolation {
                    field,
                    min,
                    max,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for BoutConfig {
    fn default() -> Self {
        Self {
            max_minutes: Self::default_max_minutes(),
            lethal_fraction: Self::default_lethal_fraction(),
            finishing_fraction: Self::default_finishing_fraction(),
            stoppage_threshold: Self::default_stoppage_threshold(),
            stoppage_condition_fraction: Self::default_stoppage_condition_fraction(),
            flashy_fraction: Self::default_flashy_fraction(),
        }
    }
}

/// What happened during one minute of exchanges.
#[derive(Debug, Clone, Copy, Default)]
struct Exchange {
    pressure: [f64; 2],
    flashy: [bool; 2],
    finishing: [bool; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Verdict {
    winner: Option<Side>,
    method: ResolutionMethod,
}

/// Simulate a bout between two combatants.
///
/// # Errors
///
/// Returns [`BoutError::InvalidInput`] for malformed attributes or dials and
/// [`BoutError::InvalidConfig`] for an invalid configuration. No draws are
/// taken from `rng` when validation fails.
pub fn resolve_bout(
    a: &Combatant,
    b: &Combatant,
    cfg: &BoutConfig,
    rng: &mut RngStream,
) -> Result<FightOutcome, BoutError> {
    cfg.validate()?;
    a.validate()
        .map_err(|source| BoutError::InvalidInput { side: Side::A, source })?;
    b.validate()
        .map_err(|source| BoutError::InvalidInput { side: Side::B, source })?;

    let mut sides = [FighterState::new(a), FighterState::new(b)];
    let mut events = Vec::new();

    for minute in 1..=cfg.max_minutes {
        let exchange = run_exchange(&mut sides, cfg, rng);
        narrate_exchange(minute, &sides, &exchange, &mut events);

        for side in [Side::A, Side::B] {
            let state = &mut sides[side.index()];
            if state.spend_effort() {
                events.push(
                    MinuteEvent::new(minute, Some(side), format!("{} is flagging", state.name()))
                        .tagged(EventTag::Fatigued),
                );
            }
        }

        trace!(
            "bout {} vs {} | minute {minute} pressure {:.2}/{:.2} condition {:.1}/{:.1}",
            a.id,
            b.id,
            exchange.pressure[0],
            exchange.pressure[1],
            sides[0].condition,
            sides[1].condition
        );

        if let Some(verdict) = check_terminal(&sides, cfg) {
            events.push(terminal_event(minute, &sides, verdict));
            debug!(
                "bout {} vs {} ended in minute {minute}: {} ({:?})",
                a.id, b.id, verdict.method, verdict.winner
            );
            return Ok(FightOutcome::new(
                [a.id.clone(), b.id.clone()],
                verdict.winner,
                verdict.method,
                minute,
                events,
            ));
        }
    }

    let minutes = cfg.max_minutes;
    let verdict = Verdict {
        winner: None,
        method: ResolutionMethod::Draw,
    };
    events.push(terminal_event(minutes, &sides, verdict));
    debug!("bout {} vs {} went the distance ({minutes} minutes)", a.id, b.id);
    Ok(FightOutcome::new(
        [a.id.clone(), b.id.clone()],
        None,
        ResolutionMethod::Draw,
        minutes,
        events,
    ))
}

fn run_exchange(
    sides: &mut [FighterState<'_>; 2],
    cfg: &BoutConfig,
    rng: &mut RngStream,
) -> Exchange {
    let attack = [sides[0].attack_rating(), sides[1].attack_rating()];
    let guard = [sides[0].guard_rating(), sides[1].guard_rating()];

    // Draw order is part of the replay contract: attack A, guard B, attack B, guard A.
    let attack_roll_a = rng.next_f64();
    let guard_roll_b = rng.next_f64();
    let attack_roll_b = rng.next_f64();
    let guard_roll_a = rng.next_f64();

    let pressure = [
        (attack[0] * (ROLL_FLOOR + attack_roll_a) - guard[1] * (ROLL_FLOOR + guard_roll_b))
            .max(0.0),
        (attack[1] * (ROLL_FLOOR + attack_roll_b) - guard[0] * (ROLL_FLOOR + guard_roll_a))
            .max(0.0),
    ];

    let mut exchange = Exchange {
        pressure,
        ..Exchange::default()
    };
    let mut damage = [0.0_f64; 2];
    for side in [Side::A, Side::B] {
        let i = side.index();
        let j = side.opponent().index();
        if pressure[i] <= 0.0 {
            continue;
        }
        exchange.flashy[i] = pressure[i] > attack[i] * cfg.flashy_fraction;
        let mut dealt = pressure[i] * sides[i].power() / sides[j].toughness();
        if sides[j].condition_fraction() < cfg.finishing_fraction {
            let kill_desire = f64::from(sides[i].kill_desire());
            if kill_desire > 0.0 {
                dealt *= 1.0 + kill_desire / 10.0;
                exchange.finishing[i] = true;
            }
        }
        damage[j] = dealt;
    }

    for side in [Side::A, Side::B] {
        let i = side.index();
        sides[i].condition -= damage[i];
        sides[i].advantage += pressure[i];
    }
    exchange
}

fn narrate_exchange(
    minute: u32,
    sides: &[FighterState<'_>; 2],
    exchange: &Exchange,
    events: &mut Vec<MinuteEvent>,
) {
    for side in [Side::A, Side::B] {
        let attacker = &sides[side.index()];
        let defender = &sides[side.opponent().index()];
        let verb = attacker.combatant.plan.style.verb();
        let event = if exchange.pressure[side.index()] > 0.0 {
            let text = if exchange.flashy[side.index()] {
                format!(
                    "{} {verb}; a flashy blow rocks {}",
                    attacker.name(),
                    defender.name()
                )
            } else {
                format!("{} {verb} and lands on {}", attacker.name(), defender.name())
            };
            let mut event = MinuteEvent::new(minute, Some(side), text)
                .tagged(EventTag::Exchange)
                .tagged(EventTag::Hit);
            if exchange.flashy[side.index()] {
                event = event.tagged(EventTag::Flashy);
            }
            if exchange.finishing[side.index()] {
                event = event.tagged(EventTag::Finishing);
            }
            event
        } else {
            MinuteEvent::new(
                minute,
                Some(side),
                format!("{} turns aside {}'s attack", defender.name(), attacker.name()),
            )
            .tagged(EventTag::Exchange)
            .tagged(EventTag::Parry)
        };
        events.push(event);
    }
}

fn check_terminal(sides: &[FighterState<'_>; 2], cfg: &BoutConfig) -> Option<Verdict> {
    let finish_on = |loser: Side| Verdict {
        winner: Some(loser.opponent()),
        method: if sides[loser.index()].is_lethal(cfg.lethal_fraction) {
            ResolutionMethod::Kill
        } else {
            ResolutionMethod::Knockout
        },
    };

    match (sides[0].is_down(), sides[1].is_down()) {
        // Both down: the larger running advantage takes it, an exact tie is a draw.
        (true, true) => {
            let (advantage_a, advantage_b) = (sides[0].advantage, sides[1].advantage);
            if advantage_a > advantage_b {
                Some(finish_on(Side::B))
            } else if advantage_b > advantage_a {
                Some(finish_on(Side::A))
            } else {
                Some(Verdict {
                    winner: None,
                    method: ResolutionMethod::Draw,
                })
            }
        }
        (false, true) => Some(finish_on(Side::B)),
        (true, false) => Some(finish_on(Side::A)),
        (false, false) => check_stoppage(sides, cfg),
    }
}

fn check_stoppage(sides: &[FighterState<'_>; 2], cfg: &BoutConfig) -> Option<Verdict> {
    let lead = sides[0].advantage - sides[1].advantage;
    let leader = if lead > 0.0 {
        Side::A
    } else if lead < 0.0 {
        Side::B
    } else {
        return None;
    };
    let trailing = &sides[leader.opponent().index()];
    let restraint = f64::from(10_u8.saturating_sub(sides[leader.index()].kill_desire())) / 10.0;
    let beaten = trailing.condition_fraction() <= cfg.stoppage_condition_fraction;
    (beaten && lead.abs() * restraint >= cfg.stoppage_threshold).then_some(Verdict {
        winner: Some(leader),
        method: ResolutionMethod::Stoppage,
    })
}

fn terminal_event(minute: u32, sides: &[FighterState<'_>; 2], verdict: Verdict) -> MinuteEvent {
    let Some(winner) = verdict.winner else {
        let both_down = sides.iter().all(FighterState::is_down);
        let text = if both_down {
            String::from("Both warriors fall together; the bout is declared a draw")
        } else {
            String::from("Time is called with both warriors standing")
        };
        return MinuteEvent::new(minute, None, text).tagged(EventTag::Draw);
    };
    let winner_name = sides[winner.index()].name();
    let loser_name = sides[winner.opponent().index()].name();
    match verdict.method {
        ResolutionMethod::Kill => MinuteEvent::new(
            minute,
            Some(winner),
            format!("{winner_name} slays {loser_name}"),
        )
        .tagged(EventTag::Kill),
        ResolutionMethod::Knockout => MinuteEvent::new(
            minute,
            Some(winner),
            format!("{loser_name} collapses; {winner_name} wins by knockout"),
        )
        .tagged(EventTag::Knockout),
        ResolutionMethod::Stoppage => MinuteEvent::new(
            minute,
            Some(winner),
            format!("{winner_name} stands down over a beaten {loser_name}; the bout is stopped"),
        )
        .tagged(EventTag::Stoppage),
        ResolutionMethod::Draw => {
            MinuteEvent::new(minute, None, String::from("Draw")).tagged(EventTag::Draw)
        }
    }
}
