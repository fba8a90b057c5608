//! Mutable per-side state carried through a bout.
use crate::constants::{
    ACCURACY_BASE, ACCURACY_PER_OE, EFFORT_BASE, EFFORT_STEP, FATIGUE_BASE_COST, FATIGUE_FLOOR,
    FATIGUE_PENALTY, FATIGUE_PER_AL, FATIGUE_PER_OE, FATIGUE_WARNING, POWER_BASE, POWER_DIVISOR,
    POWER_PER_OE, TOUGHNESS_BASE, TOUGHNESS_DIVISOR,
};
use crate::style::StyleBias;
use crate::warrior::Combatant;

#[derive(Debug, Clone)]
pub(crate) struct FighterState<'a> {
    pub combatant: &'a Combatant,
    bias: StyleBias,
    pub max_condition: f64,
    pub condition: f64,
    endurance: f64,
    fatigue: f64,
    /// Sum of pressure applied so far.
    pub advantage: f64,
    fatigue_warned: bool,
}

impl<'a> FighterState<'a> {
    pub fn new(combatant: &'a Combatant) -> Self {
        let attrs = &combatant.attributes;
        let max_condition =
            4.0 * f64::from(attrs.cn) + 2.0 * f64::from(attrs.sz) + f64::from(attrs.wl);
        let endurance = 3.0 * f64::from(attrs.cn) + 2.0 * f64::from(attrs.wl);
        Self {
            combatant,
            bias: combatant.plan.style.bias(),
            max_condition,
            condition: max_condition,
            endurance,
            fatigue: 0.0,
            advantage: 0.0,
            fatigue_warned: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.combatant.name
    }

    fn oe(&self) -> f64 {
        f64::from(self.combatant.plan.offensive_effort)
    }

    fn al(&self) -> f64 {
        f64::from(self.combatant.plan.activity_level)
    }

    pub fn kill_desire(&self) -> u8 {
        self.combatant.plan.effective_kill_desire()
    }

    /// Multiplier in `[FATIGUE_FLOOR, 1]`, shrinking as effort accumulates.
    pub fn fatigue_factor(&self) -> f64 {
        (1.0 - FATIGUE_PENALTY * self.fatigue / self.endurance).max(FATIGUE_FLOOR)
    }

    /// Effective offense before the minute's roll.
    pub fn attack_rating(&self) -> f64 {
        let attrs = &self.combatant.attributes;
        let base = f64::from(attrs.st) + 0.5 * f64::from(attrs.sp);
        let volume = EFFORT_BASE + EFFORT_STEP * self.oe();
        let accuracy = ACCURACY_BASE - ACCURACY_PER_OE * self.oe();
        base * volume * accuracy * self.bias.aggression * self.fatigue_factor()
    }

    /// Effective defense before the minute's roll.
    pub fn guard_rating(&self) -> f64 {
        let attrs = &self.combatant.attributes;
        let base = f64::from(attrs.df) + 0.5 * f64::from(attrs.wl);
        let footwork = EFFORT_BASE + EFFORT_STEP * self.al() * self.bias.mobility;
        base * footwork * self.bias.patience * self.fatigue_factor()
    }

    /// Damage multiplier for landed pressure.
    pub fn power(&self) -> f64 {
        let attrs = &self.combatant.attributes;
        let mass = f64::from(attrs.st) + 0.5 * f64::from(attrs.wt);
        mass / POWER_DIVISOR * (POWER_BASE + POWER_PER_OE * self.oe())
    }

    /// Damage divisor for incoming pressure.
    pub fn toughness(&self) -> f64 {
        TOUGHNESS_BASE + f64::from(self.combatant.attributes.cn) / TOUGHNESS_DIVISOR
    }

    pub fn condition_fraction(&self) -> f64 {
        self.condition / self.max_condition
    }

    /// Accrue this minute's stamina cost. Fatigue never decays within a bout.
    ///
    /// Returns true the first time the side drops below the warning level.
    pub fn spend_effort(&mut self) -> bool {
        let cost = FATIGUE_BASE_COST
            + FATIGUE_PER_OE * self.oe()
            + FATIGUE_PER_AL * self.al() * self.bias.mobility;
        self.fatigue += cost;
        if !self.fatigue_warned && self.fatigue_factor() < FATIGUE_WARNING {
            self.fatigue_warned = true;
            return true;
        }
        false
    }

    pub fn is_down(&self) -> bool {
        self.condition <= 0.0
    }

    pub fn is_lethal(&self, lethal_fraction: f64) -> bool {
        self.condition <= -lethal_fraction * self.max_condition
    }
}
