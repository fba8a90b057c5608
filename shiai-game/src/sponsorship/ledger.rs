//! Sponsorship state carried between allocation cycles.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    AllocationConfig, AllocationConfigError, AllocationRequest, AllocationResult, BannerSlot,
    KoenkaiRelationship, SponsorCandidate, allocate,
};
use crate::importance::Importance;
use crate::rng::RngStream;

/// Standing kōenkai, keyed by (patron, target). At most one per pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<KoenkaiRelationship>", into = "Vec<KoenkaiRelationship>")]
pub struct KoenkaiBook {
    relationships: BTreeMap<(String, String), KoenkaiRelationship>,
}

impl KoenkaiBook {
    #[must_use]
    pub fn contains(&self, patron_id: &str, target_id: &str) -> bool {
        self.relationships
            .contains_key(&(patron_id.to_string(), target_id.to_string()))
    }

    /// Record a relationship. Returns false if the pair already has one.
    pub fn insert(&mut self, relationship: KoenkaiRelationship) -> bool {
        let key = (
            relationship.patron_id.clone(),
            relationship.target_id.clone(),
        );
        if self.relationships.contains_key(&key) {
            return false;
        }
        self.relationships.insert(key, relationship);
        true
    }

    pub fn dissolve(&mut self, patron_id: &str, target_id: &str) -> Option<KoenkaiRelationship> {
        self.relationships
            .remove(&(patron_id.to_string(), target_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &KoenkaiRelationship> {
        self.relationships.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

impl From<Vec<KoenkaiRelationship>> for KoenkaiBook {
    fn from(relationships: Vec<KoenkaiRelationship>) -> Self {
        let mut book = Self::default();
        for relationship in relationships {
            book.insert(relationship);
        }
        book
    }
}

impl From<KoenkaiBook> for Vec<KoenkaiRelationship> {
    fn from(book: KoenkaiBook) -> Self {
        book.relationships.into_values().collect()
    }
}

/// Banner slots, kōenkai and issued ids across a season of cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorLedger {
    #[serde(default)]
    cycle: u32,
    #[serde(default)]
    current: Vec<BannerSlot>,
    #[serde(default)]
    book: KoenkaiBook,
    #[serde(default)]
    issued_ids: BTreeSet<String>,
}

impl SponsorLedger {
    /// Allocate the next cycle's banners and fold the result into the ledger.
    ///
    /// The previous cycle's banners are replaced; ids issued in any earlier
    /// cycle are never handed out again. On error the ledger is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if `cfg` fails validation.
    pub fn run_cycle(
        &mut self,
        pool: &[SponsorCandidate],
        importance: Importance,
        cfg: &AllocationConfig,
        rng: &mut RngStream,
    ) -> Result<AllocationResult, AllocationConfigError> {
        let request = AllocationRequest {
            cycle: self.cycle + 1,
            requested: cfg.banner_target,
            importance,
        };
        let result = allocate(pool, &request, cfg, &self.book, &self.issued_ids, rng)?;

        self.cycle = request.cycle;
        self.current.clone_from(&result.banners);
        self.issued_ids
            .extend(result.banners.iter().map(|slot| slot.banner_id.clone()));
        for relationship in &result.relationships {
            self.book.insert(relationship.clone());
        }
        Ok(result)
    }

    /// Cycles completed so far.
    #[must_use]
    pub const fn cycle(&self) -> u32 {
        self.cycle
    }

    #[must_use]
    pub fn current_banners(&self) -> &[BannerSlot] {
        &self.current
    }

    #[must_use]
    pub const fn koenkai(&self) -> &KoenkaiBook {
        &self.book
    }

    pub fn koenkai_mut(&mut self) -> &mut KoenkaiBook {
        &mut self.book
    }

    #[must_use]
    pub fn was_issued(&self, banner_id: &str) -> bool {
        self.issued_ids.contains(banner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sponsorship::SponsorTier;

    fn pool() -> Vec<SponsorCandidate> {
        [
            ("c1", "house", "stable-1", SponsorTier::Major, 50),
            ("c2", "guild", "stable-1", SponsorTier::Regional, 30),
            ("c3", "merchant", "stable-2", SponsorTier::Minor, 10),
            ("c4", "palace", "stable-2", SponsorTier::Major, 70),
        ]
        .into_iter()
        .map(|(id, patron, target, tier, weight)| SponsorCandidate {
            id: id.to_string(),
            patron_id: patron.to_string(),
            target_id: target.to_string(),
            tier,
            weight,
        })
        .collect()
    }

    #[test]
    fn cycles_accumulate_ids_and_koenkai() {
        let cfg = AllocationConfig::default();
        let mut ledger = SponsorLedger::default();
        let mut rng = RngStream::from_user_seed(77);

        let first = ledger
            .run_cycle(&pool(), Importance::default(), &cfg, &mut rng)
            .unwrap();
        assert_eq!(ledger.cycle(), 1);
        assert_eq!(ledger.current_banners(), first.banners.as_slice());
        // c1, c2 and c4 qualify for kōenkai.
        assert_eq!(ledger.koenkai().len(), 3);

        let second = ledger
            .run_cycle(&pool(), Importance::default(), &cfg, &mut rng)
            .unwrap();
        assert_eq!(ledger.cycle(), 2);
        assert!(second.relationships.is_empty());
        assert_eq!(ledger.koenkai().len(), 3);
        for slot in &second.banners {
            assert!(first.banners.iter().all(|old| old.banner_id != slot.banner_id));
            assert!(ledger.was_issued(&slot.banner_id));
        }
    }

    #[test]
    fn failed_cycle_leaves_ledger_untouched() {
        let cfg = AllocationConfig {
            max_id_attempts: 0,
            ..AllocationConfig::default()
        };
        let mut ledger = SponsorLedger::default();
        let mut rng = RngStream::from_user_seed(1);
        assert!(
            ledger
                .run_cycle(&pool(), Importance::default(), &cfg, &mut rng)
                .is_err()
        );
        assert_eq!(ledger, SponsorLedger::default());
    }

    #[test]
    fn book_rejects_duplicate_pairs_and_serializes_as_list() {
        let relationship = KoenkaiRelationship {
            patron_id: String::from("house"),
            target_id: String::from("stable-1"),
            formed_cycle: 3,
            banner_id: String::from("kb-3-0"),
        };
        let mut book = KoenkaiBook::default();
        assert!(book.insert(relationship.clone()));
        assert!(!book.insert(KoenkaiRelationship {
            formed_cycle: 4,
            ..relationship.clone()
        }));

        let json = serde_json::to_value(&book).unwrap();
        assert!(json.is_array());
        let restored: KoenkaiBook = serde_json::from_value(json).unwrap();
        assert_eq!(restored, book);

        assert_eq!(book.dissolve("house", "stable-1"), Some(relationship));
        assert!(book.is_empty());
    }
}
