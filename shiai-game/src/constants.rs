//! Centralized balance and tuning constants for Shiai game logic.
//!
//! These values define the deterministic math for the bout engine and the
//! allocation pass. Tunables that designers adjust per season live in the
//! JSON assets instead; everything here changes only through code review.

// Attribute and dial ranges --------------------------------------------------
pub const ATTRIBUTE_MIN: u8 = 1;
pub const ATTRIBUTE_MAX: u8 = 25;
pub const EFFORT_MIN: u8 = 1;
pub const EFFORT_MAX: u8 = 10;
pub const KILL_DESIRE_MAX: u8 = 10;
pub const DEFAULT_KILL_DESIRE: u8 = 5;

// Bout math ------------------------------------------------------------------
pub(crate) const EFFORT_BASE: f64 = 0.55;
pub(crate) const EFFORT_STEP: f64 = 0.09;
pub(crate) const ACCURACY_BASE: f64 = 1.15;
pub(crate) const ACCURACY_PER_OE: f64 = 0.035;
pub(crate) const ROLL_FLOOR: f64 = 0.5;
pub(crate) const POWER_DIVISOR: f64 = 15.0;
pub(crate) const POWER_BASE: f64 = 0.7;
pub(crate) const POWER_PER_OE: f64 = 0.06;
pub(crate) const TOUGHNESS_BASE: f64 = 0.6;
pub(crate) const TOUGHNESS_DIVISOR: f64 = 25.0;
pub(crate) const FATIGUE_BASE_COST: f64 = 0.5;
pub(crate) const FATIGUE_PER_OE: f64 = 0.35;
pub(crate) const FATIGUE_PER_AL: f64 = 0.30;
pub(crate) const FATIGUE_PENALTY: f64 = 0.45;
pub(crate) const FATIGUE_FLOOR: f64 = 0.30;
pub(crate) const FATIGUE_WARNING: f64 = 0.70;

// Importance -----------------------------------------------------------------
pub(crate) const IMPORTANCE_KILL_BONUS: u32 = 25;
pub(crate) const IMPORTANCE_KO_BONUS: u32 = 10;
pub(crate) const IMPORTANCE_FLASHY_BONUS: u32 = 2;
pub(crate) const IMPORTANCE_FLASHY_CAP: u32 = 10;
pub(crate) const IMPORTANCE_UPSET_BONUS: u32 = 15;

// Allocation -----------------------------------------------------------------
pub(crate) const BANNER_ID_PREFIX: &str = "kb";

// Style meta -----------------------------------------------------------------
pub const DEFAULT_ROLLING_WINDOW: usize = 200;

// Persistence ----------------------------------------------------------------
pub const SAVE_VERSION: u32 = 1;
