//! Two-phase weighted banner allocation.
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hasher;
use twox_hash::XxHash64;

use super::ledger::KoenkaiBook;
use super::{
    AllocationConfig, AllocationConfigError, AllocationRequest, BannerSlot, KoenkaiRelationship,
    SkipReason, SkippedCandidate, SponsorCandidate, SponsorTier,
};
use crate::constants::BANNER_ID_PREFIX;
use crate::importance::ImportanceTier;
use crate::rng::RngStream;

/// Everything one allocation cycle produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Placed banners in slot order.
    pub banners: Vec<BannerSlot>,
    /// Kōenkai formed this cycle, in candidate-id order.
    pub relationships: Vec<KoenkaiRelationship>,
    pub skipped: Vec<SkippedCandidate>,
}

impl AllocationResult {
    #[must_use]
    pub fn placed_in(&self, tier: SponsorTier) -> usize {
        self.banners.iter().filter(|slot| slot.tier == tier).count()
    }
}

#[derive(Debug, Clone, Copy)]
struct Weighted<'a> {
    candidate: &'a SponsorCandidate,
    weight: u64,
}

type Buckets<'a> = BTreeMap<SponsorTier, Vec<Weighted<'a>>>;

/// Hash-derived banner id for one placement attempt.
#[must_use]
pub fn banner_id(cycle: u32, index: u32, candidate_id: &str, attempt: u8) -> String {
    let mut hasher = XxHash64::with_seed(u64::from(cycle));
    hasher.write(&index.to_le_bytes());
    hasher.write(candidate_id.as_bytes());
    hasher.write(&[attempt]);
    format!("{BANNER_ID_PREFIX}-{:016x}", hasher.finish())
}

/// Place up to `request.requested` banners from `pool`.
///
/// Candidates are visited in id order so the result never depends on input
/// order. Tier quotas are dealt round-robin from the major tier down, each
/// tier is drawn by weight up to its quota, and any shortfall is backfilled
/// from tiers that still have headroom. Placed banners at or above
/// `koenkai_min_tier` found kōenkai for pairs not already in `book`.
///
/// # Errors
///
/// Returns an error if `cfg` fails validation. A zero or negative request
/// and an empty pool both yield an empty result without drawing.
pub fn allocate(
    pool: &[SponsorCandidate],
    request: &AllocationRequest,
    cfg: &AllocationConfig,
    book: &KoenkaiBook,
    taken_ids: &BTreeSet<String>,
    rng: &mut RngStream,
) -> Result<AllocationResult, AllocationConfigError> {
    cfg.validate()?;
    let requested = usize::try_from(request.requested).unwrap_or(0);
    if requested == 0 || pool.is_empty() {
        debug!(
            "cycle {}: nothing to allocate (requested {}, pool {})",
            request.cycle,
            request.requested,
            pool.len()
        );
        return Ok(AllocationResult::default());
    }

    let mut skipped = Vec::new();
    let mut buckets = eligible_buckets(pool, request.importance.tier, cfg, &mut skipped);
    let capacity: usize = SponsorTier::ALL
        .into_iter()
        .map(|tier| cap_of(cfg, tier).min(buckets.get(&tier).map_or(0, Vec::len)))
        .sum();
    let target = requested.min(capacity);
    let quotas = tier_quotas(target, cfg);

    let mut placement = Placement::new(request.cycle, cfg.max_id_attempts, taken_ids);
    for tier in SponsorTier::ALL.into_iter().rev() {
        let quota = quotas.get(&tier).copied().unwrap_or(0);
        while placement.placed_in(tier) < quota {
            let Some(pick) = draw(&mut buckets, &[tier], rng) else {
                break;
            };
            placement.place(pick.candidate, &mut skipped);
        }
    }

    while placement.banners.len() < target {
        let open: Vec<SponsorTier> = SponsorTier::ALL
            .into_iter()
            .rev()
            .filter(|tier| placement.placed_in(*tier) < cap_of(cfg, *tier))
            .collect();
        let Some(pick) = draw(&mut buckets, &open, rng) else {
            break;
        };
        placement.place(pick.candidate, &mut skipped);
    }

    let banners = placement.banners;
    let relationships = form_koenkai(&banners, request.cycle, cfg, book);
    debug!(
        "cycle {}: placed {}/{} banners, {} kōenkai formed, {} skipped",
        request.cycle,
        banners.len(),
        requested,
        relationships.len(),
        skipped.len()
    );
    Ok(AllocationResult {
        banners,
        relationships,
        skipped,
    })
}

fn cap_of(cfg: &AllocationConfig, tier: SponsorTier) -> usize {
    usize::try_from(cfg.cap(tier)).unwrap_or(usize::MAX)
}

fn eligible_buckets<'a>(
    pool: &'a [SponsorCandidate],
    importance: ImportanceTier,
    cfg: &AllocationConfig,
    skipped: &mut Vec<SkippedCandidate>,
) -> Buckets<'a> {
    let mut ordered: Vec<&SponsorCandidate> = pool.iter().collect();
    ordered.sort_by(|a, b| {
        (&a.id, &a.patron_id, &a.target_id, a.tier, a.weight).cmp(&(
            &b.id,
            &b.patron_id,
            &b.target_id,
            b.tier,
            b.weight,
        ))
    });

    let mut seen = BTreeSet::new();
    let mut buckets = Buckets::new();
    for candidate in ordered {
        let reason = if !seen.insert(candidate.id.as_str()) {
            Some(SkipReason::DuplicateCandidateId)
        } else if candidate.weight == 0 {
            Some(SkipReason::ZeroWeight)
        } else if importance < cfg.min_importance(candidate.tier) {
            Some(SkipReason::BelowImportance)
        } else {
            None
        };
        if let Some(reason) = reason {
            skipped.push(SkippedCandidate {
                candidate_id: candidate.id.clone(),
                reason,
            });
            continue;
        }
        buckets.entry(candidate.tier).or_default().push(Weighted {
            candidate,
            weight: cfg.effective_weight(candidate, importance),
        });
    }
    buckets
}

/// Deal `target` slots one at a time from the major tier down, respecting caps.
fn tier_quotas(target: usize, cfg: &AllocationConfig) -> BTreeMap<SponsorTier, usize> {
    let mut quotas: BTreeMap<SponsorTier, usize> =
        SponsorTier::ALL.into_iter().map(|tier| (tier, 0)).collect();
    let mut remaining = target;
    while remaining > 0 {
        let mut progressed = false;
        for tier in SponsorTier::ALL.into_iter().rev() {
            if remaining == 0 {
                break;
            }
            let quota = quotas.entry(tier).or_default();
            if *quota < cap_of(cfg, tier) {
                *quota += 1;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    quotas
}

/// Weighted draw without replacement across `tiers`, walked in the given order.
fn draw<'a>(
    buckets: &mut Buckets<'a>,
    tiers: &[SponsorTier],
    rng: &mut RngStream,
) -> Option<Weighted<'a>> {
    let total: u64 = tiers
        .iter()
        .filter_map(|tier| buckets.get(tier))
        .flatten()
        .map(|entry| entry.weight)
        .sum();
    if total == 0 {
        return None;
    }

    let roll = rng.gen_range(0..total);
    let mut current = 0;
    for tier in tiers {
        let Some(bucket) = buckets.get_mut(tier) else {
            continue;
        };
        let position = bucket.iter().position(|entry| {
            current += entry.weight;
            roll < current
        });
        if let Some(idx) = position {
            return Some(bucket.remove(idx));
        }
    }
    None
}

struct Placement<'a> {
    cycle: u32,
    max_id_attempts: u8,
    taken_ids: &'a BTreeSet<String>,
    issued: BTreeSet<String>,
    pairs: BTreeSet<(String, String)>,
    next_index: u32,
    banners: Vec<BannerSlot>,
}

impl<'a> Placement<'a> {
    fn new(cycle: u32, max_id_attempts: u8, taken_ids: &'a BTreeSet<String>) -> Self {
        Self {
            cycle,
            max_id_attempts,
            taken_ids,
            issued: BTreeSet::new(),
            pairs: BTreeSet::new(),
            next_index: 0,
            banners: Vec::new(),
        }
    }

    fn placed_in(&self, tier: SponsorTier) -> usize {
        self.banners.iter().filter(|slot| slot.tier == tier).count()
    }

    fn place(&mut self, candidate: &SponsorCandidate, skipped: &mut Vec<SkippedCandidate>) {
        let pair = (candidate.patron_id.clone(), candidate.target_id.clone());
        if !self.pairs.insert(pair) {
            skipped.push(SkippedCandidate {
                candidate_id: candidate.id.clone(),
                reason: SkipReason::DuplicatePair,
            });
            return;
        }

        let index = self.next_index;
        self.next_index += 1;
        let banner_id = self.unique_banner_id(index, &candidate.id);
        self.issued.insert(banner_id.clone());
        self.banners.push(BannerSlot {
            index,
            banner_id,
            candidate_id: candidate.id.clone(),
            patron_id: candidate.patron_id.clone(),
            target_id: candidate.target_id.clone(),
            tier: candidate.tier,
            weight: candidate.weight,
        });
    }

    fn unique_banner_id(&self, index: u32, candidate_id: &str) -> String {
        for attempt in 0..self.max_id_attempts {
            let id = banner_id(self.cycle, index, candidate_id, attempt);
            if !self.taken_ids.contains(&id) && !self.issued.contains(&id) {
                return id;
            }
        }
        // Cycle and slot never repeat together, and hashed ids carry a single dash.
        format!("{BANNER_ID_PREFIX}-{}-{index}", self.cycle)
    }
}

fn form_koenkai(
    banners: &[BannerSlot],
    cycle: u32,
    cfg: &AllocationConfig,
    book: &KoenkaiBook,
) -> Vec<KoenkaiRelationship> {
    let mut qualifying: Vec<&BannerSlot> = banners
        .iter()
        .filter(|slot| slot.tier >= cfg.koenkai_min_tier)
        .collect();
    qualifying.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));

    let mut formed = BTreeSet::new();
    let mut relationships = Vec::new();
    for slot in qualifying {
        if book.contains(&slot.patron_id, &slot.target_id)
            || !formed.insert((slot.patron_id.as_str(), slot.target_id.as_str()))
        {
            continue;
        }
        relationships.push(KoenkaiRelationship {
            patron_id: slot.patron_id.clone(),
            target_id: slot.target_id.clone(),
            formed_cycle: cycle,
            banner_id: slot.banner_id.clone(),
        });
    }
    relationships
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importance::Importance;

    fn candidate(
        id: &str,
        patron: &str,
        target: &str,
        tier: SponsorTier,
        weight: u32,
    ) -> SponsorCandidate {
        SponsorCandidate {
            id: id.to_string(),
            patron_id: patron.to_string(),
            target_id: target.to_string(),
            tier,
            weight,
        }
    }

    fn request(requested: i32) -> AllocationRequest {
        AllocationRequest {
            cycle: 1,
            requested,
            importance: Importance::default(),
        }
    }

    fn run(
        pool: &[SponsorCandidate],
        request: &AllocationRequest,
        cfg: &AllocationConfig,
        seed: u64,
    ) -> AllocationResult {
        let mut rng = RngStream::from_user_seed(seed);
        allocate(
            pool,
            request,
            cfg,
            &KoenkaiBook::default(),
            &BTreeSet::new(),
            &mut rng,
        )
        .unwrap()
    }

    fn skewed_pool() -> Vec<SponsorCandidate> {
        let mut pool = Vec::new();
        for i in 0..6 {
            pool.push(candidate(
                &format!("minor-{i}"),
                &format!("merchant-{i}"),
                "stable-east",
                SponsorTier::Minor,
                10 + i,
            ));
        }
        for i in 0..2 {
            pool.push(candidate(
                &format!("regional-{i}"),
                &format!("guild-{i}"),
                "stable-west",
                SponsorTier::Regional,
                30,
            ));
            pool.push(candidate(
                &format!("major-{i}"),
                &format!("house-{i}"),
                "stable-west",
                SponsorTier::Major,
                60,
            ));
        }
        pool
    }

    fn random_pool(rng: &mut RngStream) -> Vec<SponsorCandidate> {
        let size = rng.gen_range(0..16);
        (0..size)
            .map(|i| {
                let tier = SponsorTier::ALL[rng.gen_range(0..3)];
                candidate(
                    &format!("c{}", rng.gen_range(0..20)),
                    &format!("p{}", rng.gen_range(0..4)),
                    &format!("t{}", rng.gen_range(0..3)),
                    tier,
                    rng.gen_range(0..50) + u32::from(i % 2 == 0),
                )
            })
            .collect()
    }

    #[test]
    fn skewed_pool_fills_every_tier_to_its_cap() {
        let cfg = AllocationConfig::default();
        let result = run(&skewed_pool(), &request(6), &cfg, 42);

        assert_eq!(result.banners.len(), 6);
        for tier in SponsorTier::ALL {
            assert_eq!(result.placed_in(tier), 2, "{tier:?}");
        }
        let indices: Vec<u32> = result.banners.iter().map(|slot| slot.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        let ids: BTreeSet<&str> = result
            .banners
            .iter()
            .map(|slot| slot.banner_id.as_str())
            .collect();
        assert_eq!(ids.len(), 6);
        assert!(ids.iter().all(|id| id.starts_with("kb-")));
    }

    #[test]
    fn empty_pool_or_non_positive_request_places_nothing() {
        let cfg = AllocationConfig::default();
        for (pool, requested) in [(Vec::new(), 6), (skewed_pool(), 0), (skewed_pool(), -3)] {
            let mut rng = RngStream::from_user_seed(9);
            let result = allocate(
                &pool,
                &request(requested),
                &cfg,
                &KoenkaiBook::default(),
                &BTreeSet::new(),
                &mut rng,
            )
            .unwrap();
            assert_eq!(result, AllocationResult::default());
            assert_eq!(rng.draws(), 0);
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = AllocationConfig {
            max_id_attempts: 0,
            ..AllocationConfig::default()
        };
        let mut rng = RngStream::from_user_seed(1);
        let err = allocate(
            &skewed_pool(),
            &request(6),
            &cfg,
            &KoenkaiBook::default(),
            &BTreeSet::new(),
            &mut rng,
        )
        .unwrap_err();
        assert_eq!(err, AllocationConfigError::NoIdAttempts);
    }

    #[test]
    fn result_ignores_input_order() {
        let cfg = AllocationConfig::default();
        let pool = skewed_pool();
        let mut reversed = pool.clone();
        reversed.reverse();
        for seed in 0..20 {
            assert_eq!(
                run(&pool, &request(4), &cfg, seed),
                run(&reversed, &request(4), &cfg, seed)
            );
        }
    }

    #[test]
    fn random_pools_respect_caps_and_uniqueness() {
        let cfg = AllocationConfig::default();
        let mut pools = RngStream::from_user_seed(2024);
        for seed in 0..200 {
            let pool = random_pool(&mut pools);
            let requested = pools.gen_range(-2..9);
            let result = run(&pool, &request(requested), &cfg, seed);

            assert!(result.banners.len() <= usize::try_from(requested).unwrap_or(0));
            for tier in SponsorTier::ALL {
                assert!(result.placed_in(tier) <= 2);
            }
            for (expected, slot) in (0u32..).zip(&result.banners) {
                assert_eq!(slot.index, expected);
            }
            let ids: BTreeSet<&str> = result
                .banners
                .iter()
                .map(|slot| slot.banner_id.as_str())
                .collect();
            assert_eq!(ids.len(), result.banners.len());
            let pairs: BTreeSet<(&str, &str)> = result
                .banners
                .iter()
                .map(|slot| (slot.patron_id.as_str(), slot.target_id.as_str()))
                .collect();
            assert_eq!(pairs.len(), result.banners.len());
            let candidates: BTreeSet<&str> = result
                .banners
                .iter()
                .map(|slot| slot.candidate_id.as_str())
                .collect();
            assert_eq!(candidates.len(), result.banners.len());
        }
    }

    #[test]
    fn duplicate_pair_is_skipped_without_consuming_a_slot() {
        let cfg = AllocationConfig::default();
        let pool = vec![
            candidate("c1", "p1", "t1", SponsorTier::Major, 50),
            candidate("c2", "p1", "t1", SponsorTier::Major, 50),
            candidate("c3", "p2", "t2", SponsorTier::Minor, 5),
        ];
        let result = run(&pool, &request(3), &cfg, 5);

        assert_eq!(result.banners.len(), 2);
        assert_eq!(result.banners[0].index, 0);
        assert_eq!(result.banners[1].index, 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].reason, SkipReason::DuplicatePair);
    }

    #[test]
    fn ineligible_candidates_are_reported() {
        let mut cfg = AllocationConfig::default();
        cfg.tier_min_importance
            .insert(SponsorTier::Major, ImportanceTier::Headline);
        let pool = vec![
            candidate("dup", "p1", "t1", SponsorTier::Minor, 5),
            candidate("dup", "p2", "t2", SponsorTier::Minor, 5),
            candidate("empty", "p3", "t3", SponsorTier::Minor, 0),
            candidate("grand", "p4", "t4", SponsorTier::Major, 90),
        ];
        let result = run(&pool, &request(6), &cfg, 3);

        assert_eq!(result.banners.len(), 1);
        assert_eq!(result.banners[0].candidate_id, "dup");
        assert_eq!(result.banners[0].patron_id, "p1");
        let reasons: Vec<(&str, SkipReason)> = result
            .skipped
            .iter()
            .map(|skip| (skip.candidate_id.as_str(), skip.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("dup", SkipReason::DuplicateCandidateId),
                ("empty", SkipReason::ZeroWeight),
                ("grand", SkipReason::BelowImportance),
            ]
        );
    }

    #[test]
    fn draws_follow_weight_rather_than_rank() {
        let cfg = AllocationConfig {
            tier_caps: BTreeMap::from([(SponsorTier::Minor, 1)]),
            ..AllocationConfig::default()
        };
        let pool = vec![
            candidate("heavy", "p1", "t1", SponsorTier::Minor, 90),
            candidate("light", "p2", "t2", SponsorTier::Minor, 10),
        ];
        let mut light = 0;
        for seed in 0..200 {
            let result = run(&pool, &request(1), &cfg, seed);
            assert_eq!(result.banners.len(), 1);
            if result.banners[0].candidate_id == "light" {
                light += 1;
            }
        }
        assert!(light > 0, "light candidate never drawn");
        assert!(light < 100, "light candidate drawn {light} times");
    }

    #[test]
    fn taken_ids_are_never_reissued() {
        let cfg = AllocationConfig {
            tier_caps: BTreeMap::from([(SponsorTier::Minor, 1)]),
            ..AllocationConfig::default()
        };
        let pool = vec![candidate("only", "p1", "t1", SponsorTier::Minor, 1)];
        let taken = BTreeSet::from([banner_id(1, 0, "only", 0)]);
        let mut rng = RngStream::from_user_seed(0);
        let result = allocate(
            &pool,
            &request(1),
            &cfg,
            &KoenkaiBook::default(),
            &taken,
            &mut rng,
        )
        .unwrap();
        assert_eq!(result.banners[0].banner_id, banner_id(1, 0, "only", 1));

        let single = AllocationConfig {
            max_id_attempts: 1,
            ..cfg
        };
        let mut rng = RngStream::from_user_seed(0);
        let result = allocate(
            &pool,
            &request(1),
            &single,
            &KoenkaiBook::default(),
            &taken,
            &mut rng,
        )
        .unwrap();
        assert_eq!(result.banners[0].banner_id, "kb-1-0");
    }

    #[test]
    fn koenkai_form_once_per_pair_in_candidate_order() {
        let cfg = AllocationConfig::default();
        let pool = vec![
            candidate("b-major", "house", "stable-1", SponsorTier::Major, 40),
            candidate("a-major", "palace", "stable-2", SponsorTier::Major, 40),
            candidate("regional", "guild", "stable-3", SponsorTier::Regional, 40),
            candidate("minor", "merchant", "stable-4", SponsorTier::Minor, 40),
        ];
        let mut book = KoenkaiBook::default();
        book.insert(KoenkaiRelationship {
            patron_id: String::from("guild"),
            target_id: String::from("stable-3"),
            formed_cycle: 0,
            banner_id: String::from("kb-0-0"),
        });
        let mut rng = RngStream::from_user_seed(11);
        let result = allocate(
            &pool,
            &request(6),
            &cfg,
            &book,
            &BTreeSet::new(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(result.banners.len(), 4);
        let formed: Vec<&str> = result
            .relationships
            .iter()
            .map(|rel| rel.patron_id.as_str())
            .collect();
        assert_eq!(formed, vec!["palace", "house"]);
        assert!(result.relationships.iter().all(|rel| rel.formed_cycle == 1));
    }
}
