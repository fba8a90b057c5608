//! Shiai Game Engine
//!
//! Deterministic core for the Shiai arena game: minute-by-minute bout
//! resolution, bout importance, kenshō banner allocation with kōenkai
//! formation, and the style meta tables built from finished bouts.
//! Given the same inputs and seed, every operation here reproduces exactly.
#![deny(clippy::disallowed_methods)]

pub mod bout;
pub mod constants;
pub mod demo;
pub mod importance;
pub mod meta;
pub mod persist;
pub mod rng;
pub mod sponsorship;
pub mod style;
pub mod warrior;

// Re-export commonly used types
pub use bout::{
    BoutConfig, BoutConfigError, BoutError, EventTag, EventTagSet, FightOutcome, MinuteEvent,
    ResolutionMethod, Side, resolve_bout,
};
pub use importance::{
    BoutContext, Importance, ImportanceConfig, ImportanceConfigError, ImportanceTier, Participant,
    Rank, RankedBout, ScheduledBout, classify, classify_completed, normalize_rank, rank_bouts,
};
pub use meta::{StyleCounters, StyleMeta, StyleRow};
pub use persist::{
    MemoryStorage, SaveError, SaveState, SaveStorage, StoreSession, load_state, migrate,
    store_state,
};
pub use rng::{RngBundle, RngError, RngStream};
pub use sponsorship::{
    AllocationConfig, AllocationConfigError, AllocationRequest, AllocationResult, BannerSlot,
    KoenkaiBook, KoenkaiRelationship, SkipReason, SkippedCandidate, SponsorCandidate,
    SponsorLedger, SponsorTier, allocate,
};
pub use style::{FightingStyle, StyleBias, StyleParseError};
pub use warrior::{BoutPlan, Combatant, InputError, WarriorAttributes};
