//! Kenshō sponsorship: banner allocation and kōenkai formation.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::importance::{Importance, ImportanceTier};

mod allocate;
mod ledger;

pub use allocate::{AllocationResult, allocate, banner_id};
pub use ledger::{KoenkaiBook, SponsorLedger};

const DEFAULT_ALLOCATION_DATA: &str = include_str!("../../assets/allocation.json");

/// Sponsor prestige tier, ordered minor to major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorTier {
    Minor,
    Regional,
    Major,
}

impl SponsorTier {
    pub const ALL: [Self; 3] = [Self::Minor, Self::Regional, Self::Major];

    #[must_use]
    pub const fn rank(self) -> u32 {
        match self {
            Self::Minor => 0,
            Self::Regional => 1,
            Self::Major => 2,
        }
    }
}

/// A patron's offer to hang a banner for a warrior or stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SponsorCandidate {
    pub id: String,
    pub patron_id: String,
    /// Warrior or stable the banner is for.
    pub target_id: String,
    pub tier: SponsorTier,
    /// Prestige; doubles as the sampling weight.
    pub weight: u32,
}

/// A placed banner. Indices are dense: they count placements only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BannerSlot {
    pub index: u32,
    pub banner_id: String,
    pub candidate_id: String,
    pub patron_id: String,
    pub target_id: String,
    pub tier: SponsorTier,
    pub weight: u32,
}

/// Why a candidate did not receive a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ZeroWeight,
    DuplicateCandidateId,
    BelowImportance,
    /// The same patron already hangs a banner for the same target this cycle.
    DuplicatePair,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub candidate_id: String,
    pub reason: SkipReason,
}

/// Supporter-club link between a patron and a warrior or stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KoenkaiRelationship {
    pub patron_id: String,
    pub target_id: String,
    pub formed_cycle: u32,
    /// Banner whose placement formed the relationship.
    pub banner_id: String,
}

/// Inputs for one allocation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub cycle: u32,
    /// Banners wanted; zero or negative places nothing.
    pub requested: i32,
    pub importance: Importance,
}

/// Errors raised when allocation configuration invariants are violated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationConfigError {
    #[error("max_id_attempts must be at least 1")]
    NoIdAttempts,
    #[error("importance_boost_pct must be at most {max} (got {value})")]
    BoostTooLarge { max: u32, value: u32 },
}

/// Capacity and weighting rules for banner allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Default banner count requested per cycle.
    #[serde(default = "AllocationConfig::default_banner_target")]
    pub banner_target: i32,
    /// Maximum banners per tier; a missing tier has no capacity.
    #[serde(default = "AllocationConfig::default_tier_caps")]
    pub tier_caps: BTreeMap<SponsorTier, u32>,
    /// Minimum bout importance a tier's sponsors will attach to.
    #[serde(default)]
    pub tier_min_importance: BTreeMap<SponsorTier, ImportanceTier>,
    /// Weight boost per (importance ordinal × tier rank), in percent.
    #[serde(default = "AllocationConfig::default_importance_boost_pct")]
    pub importance_boost_pct: u32,
    /// Lowest tier whose banners can found a kōenkai.
    #[serde(default = "AllocationConfig::default_koenkai_min_tier")]
    pub koenkai_min_tier: SponsorTier,
    /// Hash salts tried before falling back to a composite banner id.
    #[serde(default = "AllocationConfig::default_max_id_attempts")]
    pub max_id_attempts: u8,
}

impl AllocationConfig {
    const MAX_BOOST_PCT: u32 = 1_000;

    const fn default_banner_target() -> i32 {
        6
    }

    fn default_tier_caps() -> BTreeMap<SponsorTier, u32> {
        BTreeMap::from([
            (SponsorTier::Minor, 2),
            (SponsorTier::Regional, 2),
            (SponsorTier::Major, 2),
        ])
    }

    const fn default_importance_boost_pct() -> u32 {
        25
    }

    const fn default_koenkai_min_tier() -> SponsorTier {
        SponsorTier::Regional
    }

    const fn default_max_id_attempts() -> u8 {
        8
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_ALLOCATION_DATA).unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), AllocationConfigError> {
        if self.max_id_attempts == 0 {
            return Err(AllocationConfigError::NoIdAttempts);
        }
        if self.importance_boost_pct > Self::MAX_BOOST_PCT {
            return Err(AllocationConfigError::BoostTooLarge {
                max: Self::MAX_BOOST_PCT,
                value: self.importance_boost_pct,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn cap(&self, tier: SponsorTier) -> u32 {
        self.tier_caps.get(&tier).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn min_importance(&self, tier: SponsorTier) -> ImportanceTier {
        self.tier_min_importance
            .get(&tier)
            .copied()
            .unwrap_or_default()
    }

    /// Sampling weight after the importance boost; positive weights stay positive.
    #[must_use]
    pub fn effective_weight(
        &self,
        candidate: &SponsorCandidate,
        importance: ImportanceTier,
    ) -> u64 {
        let base = u64::from(candidate.weight);
        let boost = u64::from(importance.ordinal())
            * u64::from(candidate.tier.rank())
            * u64::from(self.importance_boost_pct);
        (base * (100 + boost) / 100).max(base.min(1))
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            banner_target: Self::default_banner_target(),
            tier_caps: Self::default_tier_caps(),
            tier_min_importance: BTreeMap::new(),
            importance_boost_pct: Self::default_importance_boost_pct(),
            koenkai_min_tier: Self::default_koenkai_min_tier(),
            max_id_attempts: Self::default_max_id_attempts(),
        }
    }
}
