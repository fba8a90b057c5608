//! Seeded invariant checks run by the tester.
use anyhow::{Result, ensure};
use rand::Rng;
use std::collections::BTreeSet;

use shiai_game::constants::{ATTRIBUTE_MIN, EFFORT_MAX, EFFORT_MIN, KILL_DESIRE_MAX};
use shiai_game::{
    AllocationConfig, AllocationRequest, AllocationResult, BoutConfig, BoutContext, BoutPlan,
    Combatant, EventTag, FightOutcome, FightingStyle, Importance, ImportanceConfig, KoenkaiBook,
    MemoryStorage, Participant, RngBundle, RngStream, SaveState, ScheduledBout, SponsorCandidate,
    SponsorLedger, SponsorTier, StoreSession, StyleMeta, WarriorAttributes, allocate, load_state,
    normalize_rank, rank_bouts, resolve_bout,
};

const TERMINAL_TAGS: [EventTag; 4] = [
    EventTag::Kill,
    EventTag::Knockout,
    EventTag::Stoppage,
    EventTag::Draw,
];

const META_BOUTS: u32 = 24;

/// A named invariant check parameterised by seed.
pub struct Scenario {
    pub key: &'static str,
    pub description: &'static str,
    check: fn(u64) -> Result<()>,
}

impl Scenario {
    /// # Errors
    ///
    /// Returns the first violated expectation for `seed`.
    pub fn run(&self, seed: u64) -> Result<()> {
        (self.check)(seed)
    }
}

static SCENARIOS: &[Scenario] = &[
    Scenario {
        key: "determinism",
        description: "Same seed and inputs replay identical bouts and allocations",
        check: check_determinism,
    },
    Scenario {
        key: "duration",
        description: "Bouts end within the minute cap with exactly one terminal event",
        check: check_duration,
    },
    Scenario {
        key: "allocation",
        description: "Banner allocation honours caps, slot order and id uniqueness",
        check: check_allocation,
    },
    Scenario {
        key: "importance",
        description: "Rank normalization is idempotent and bout ranking ignores input order",
        check: check_importance,
    },
    Scenario {
        key: "meta",
        description: "Style tables stay consistent with the bouts recorded",
        check: check_meta,
    },
    Scenario {
        key: "persistence",
        description: "Save state survives a store session unchanged",
        check: check_persistence,
    },
];

pub fn list_scenarios() -> impl Iterator<Item = (&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<&'static Scenario> {
    SCENARIOS
        .iter()
        .find(|scenario| scenario.key.eq_ignore_ascii_case(key))
}

/// Split a comma list of scenario keys, expanding `all`.
#[must_use]
pub fn expand_scenarios(raw: &str) -> Vec<String> {
    let mut expanded = Vec::new();
    for key in raw.split(',').map(str::trim).filter(|key| !key.is_empty()) {
        if key.eq_ignore_ascii_case("all") {
            expanded.extend(SCENARIOS.iter().map(|scenario| scenario.key.to_string()));
        } else {
            expanded.push(key.to_string());
        }
    }
    let mut seen = BTreeSet::new();
    expanded.retain(|key| seen.insert(key.clone()));
    expanded
}

fn roll(rng: &mut RngStream, min: u8, max: u8) -> u8 {
    rng.gen_range(min..=max)
}

fn random_combatant(id: &str, rng: &mut RngStream) -> Combatant {
    let attributes = WarriorAttributes {
        st: roll(rng, ATTRIBUTE_MIN, 20),
        cn: roll(rng, ATTRIBUTE_MIN, 20),
        sz: roll(rng, ATTRIBUTE_MIN, 20),
        wt: roll(rng, ATTRIBUTE_MIN, 20),
        wl: roll(rng, ATTRIBUTE_MIN, 20),
        sp: roll(rng, ATTRIBUTE_MIN, 20),
        df: roll(rng, ATTRIBUTE_MIN, 20),
    };
    let style = FightingStyle::ALL[rng.gen_range(0..FightingStyle::ALL.len())];
    let mut plan = BoutPlan::new(
        style,
        roll(rng, EFFORT_MIN, EFFORT_MAX),
        roll(rng, EFFORT_MIN, EFFORT_MAX),
    );
    if rng.gen_bool(0.5) {
        plan = plan.with_kill_desire(roll(rng, 0, KILL_DESIRE_MAX));
    }
    Combatant::new(id, id.to_uppercase(), attributes, plan)
}

fn random_pool(rng: &mut RngStream) -> Vec<SponsorCandidate> {
    let size = rng.gen_range(0..=14);
    (0..size)
        .map(|_| SponsorCandidate {
            id: format!("c{}", rng.gen_range(0..18)),
            patron_id: format!("patron-{}", rng.gen_range(0..5)),
            target_id: format!("warrior-{}", rng.gen_range(0..4)),
            tier: SponsorTier::ALL[rng.gen_range(0..SponsorTier::ALL.len())],
            weight: rng.gen_range(0..=60),
        })
        .collect()
}

fn check_terminal(outcome: &FightOutcome, cfg: &BoutConfig) -> Result<()> {
    ensure!(
        (1..=cfg.max_minutes).contains(&outcome.minutes()),
        "bout lasted {} minutes (cap {})",
        outcome.minutes(),
        cfg.max_minutes
    );
    let terminal: usize = TERMINAL_TAGS
        .iter()
        .map(|tag| outcome.count_tagged(*tag, None))
        .sum();
    ensure!(terminal == 1, "expected one terminal event, found {terminal}");
    ensure!(
        outcome.winner().is_none() == outcome.is_draw(),
        "winner {:?} inconsistent with method {}",
        outcome.winner(),
        outcome.method()
    );
    Ok(())
}

fn check_allocation_result(
    result: &AllocationResult,
    request: &AllocationRequest,
    cfg: &AllocationConfig,
) -> Result<()> {
    let ceiling = usize::try_from(request.requested).unwrap_or(0);
    ensure!(
        result.banners.len() <= ceiling,
        "placed {} banners for a request of {}",
        result.banners.len(),
        request.requested
    );
    for tier in SponsorTier::ALL {
        let cap = usize::try_from(cfg.cap(tier)).unwrap_or(usize::MAX);
        ensure!(
            result.placed_in(tier) <= cap,
            "{tier:?} placed {} over cap {cap}",
            result.placed_in(tier)
        );
    }
    for (expected, slot) in (0_u32..).zip(&result.banners) {
        ensure!(
            slot.index == expected,
            "slot index {} where {expected} expected",
            slot.index
        );
    }
    let ids: BTreeSet<&str> = result
        .banners
        .iter()
        .map(|slot| slot.banner_id.as_str())
        .collect();
    ensure!(ids.len() == result.banners.len(), "duplicate banner ids");
    let pairs: BTreeSet<(&str, &str)> = result
        .relationships
        .iter()
        .map(|rel| (rel.patron_id.as_str(), rel.target_id.as_str()))
        .collect();
    ensure!(
        pairs.len() == result.relationships.len(),
        "duplicate kōenkai pairs"
    );
    Ok(())
}

fn check_determinism(seed: u64) -> Result<()> {
    let cfg = BoutConfig::load_from_static();
    let basher = |id: &str| {
        Combatant::new(
            id,
            id.to_uppercase(),
            WarriorAttributes::uniform(12),
            BoutPlan::new(FightingStyle::BashingAttack, 7, 6),
        )
    };
    let (east, west) = (basher("east"), basher("west"));
    let first = resolve_bout(&east, &west, &cfg, &mut RngStream::from_user_seed(seed))?;
    let second = resolve_bout(&east, &west, &cfg, &mut RngStream::from_user_seed(seed))?;
    ensure!(first == second, "mirrored bout diverged on replay");

    let alloc_cfg = AllocationConfig::load_from_static();
    let pool = random_pool(&mut RngStream::from_user_seed(seed));
    let request = AllocationRequest {
        cycle: 1,
        requested: alloc_cfg.banner_target,
        importance: Importance::default(),
    };
    let run = || {
        let mut bundle = RngBundle::from_user_seed(seed);
        allocate(
            &pool,
            &request,
            &alloc_cfg,
            &KoenkaiBook::default(),
            &BTreeSet::new(),
            bundle.allocation(),
        )
    };
    ensure!(run()? == run()?, "allocation diverged on replay");
    Ok(())
}

fn check_duration(seed: u64) -> Result<()> {
    let cfg = BoutConfig::load_from_static();
    let mut root = RngStream::from_user_seed(seed);
    let east = random_combatant("east", &mut root);
    let west = random_combatant("west", &mut root);
    let outcome = resolve_bout(&east, &west, &cfg, &mut root.fork("bout"))?;
    check_terminal(&outcome, &cfg)
}

fn check_allocation(seed: u64) -> Result<()> {
    let cfg = AllocationConfig::load_from_static();
    let mut root = RngStream::from_user_seed(seed);
    let pool = random_pool(&mut root);
    let request = AllocationRequest {
        cycle: root.gen_range(1..100),
        requested: root.gen_range(-2..=8),
        importance: Importance::default(),
    };
    let mut stream = root.fork("allocation");
    let result = allocate(
        &pool,
        &request,
        &cfg,
        &KoenkaiBook::default(),
        &BTreeSet::new(),
        &mut stream,
    )?;
    check_allocation_result(&result, &request, &cfg)?;

    let empty = allocate(
        &[],
        &request,
        &cfg,
        &KoenkaiBook::default(),
        &BTreeSet::new(),
        &mut stream,
    )?;
    ensure!(
        empty == AllocationResult::default(),
        "empty pool produced banners"
    );
    Ok(())
}

fn check_importance(seed: u64) -> Result<()> {
    const RANKS: [&str; 8] = [
        "Yokozuna",
        "  ōzeki ",
        "SEKIWAKE",
        "komusubi",
        "Maegashira\t7",
        "jūryō",
        "Makushita  ",
        "amateur",
    ];
    let mut rng = RngStream::from_user_seed(seed);
    for raw in RANKS {
        let once = normalize_rank(raw);
        ensure!(
            normalize_rank(&once) == once,
            "normalization not idempotent for {raw:?}"
        );
    }

    let bouts: Vec<ScheduledBout> = (0..8)
        .map(|n| {
            let mut participant = |side: &str| Participant {
                id: format!("{side}-{}", rng.gen_range(0..6)),
                rank: RANKS[rng.gen_range(0..RANKS.len())].to_string(),
            };
            let east = participant("east");
            let west = participant("west");
            ScheduledBout {
                bout_id: format!("bout-{n}"),
                east,
                west,
                context: if n % 2 == 0 {
                    BoutContext::Exhibition
                } else {
                    BoutContext::Tournament {
                        tournament_id: String::from("sweep"),
                        day: u8::try_from(n + 8).unwrap_or(15),
                    }
                },
            }
        })
        .collect();
    let cfg = ImportanceConfig::load_from_static();
    let forward = rank_bouts(&bouts, &cfg);
    let reversed: Vec<ScheduledBout> = bouts.iter().rev().cloned().collect();
    ensure!(
        forward == rank_bouts(&reversed, &cfg),
        "ranking depends on input order"
    );
    Ok(())
}

fn record_season(seed: u64) -> Result<(StyleMeta, SponsorLedger)> {
    let bout_cfg = BoutConfig::load_from_static();
    let alloc_cfg = AllocationConfig::load_from_static();
    let mut bundle = RngBundle::from_user_seed(seed);
    let mut roster_rng = RngStream::from_user_seed(seed).fork("roster");
    let mut meta = StyleMeta::default();
    let mut ledger = SponsorLedger::default();

    for n in 0..META_BOUTS {
        let east = random_combatant("east", &mut roster_rng);
        let west = random_combatant("west", &mut roster_rng);
        let mut bout_rng = bundle.bout().fork(&format!("bout-{n}"));
        let outcome = resolve_bout(&east, &west, &bout_cfg, &mut bout_rng)?;
        meta.record_bout(&outcome, east.plan.style, west.plan.style, Some("sweep"));

        let pool = random_pool(&mut roster_rng);
        let mut alloc_rng = bundle.allocation().fork(&format!("cycle-{n}"));
        ledger.run_cycle(&pool, Importance::default(), &alloc_cfg, &mut alloc_rng)?;
    }
    Ok((meta, ledger))
}

fn check_meta(seed: u64) -> Result<()> {
    let (meta, _) = record_season(seed)?;
    let table = meta.rolling_table();

    let fights: u32 = table.iter().map(|row| row.fights).sum();
    let wins: u32 = table.iter().map(|row| row.wins).sum();
    let losses: u32 = table.iter().map(|row| row.losses).sum();
    ensure!(
        fights == META_BOUTS * 2,
        "{fights} fights for {META_BOUTS} bouts"
    );
    ensure!(wins == losses, "{wins} wins against {losses} losses");
    for row in &table {
        ensure!(
            row.kills <= row.wins,
            "{} has more kills than wins",
            row.style
        );
        ensure!(
            row.wins + row.losses <= row.fights,
            "{} has more results than fights",
            row.style
        );
    }
    ensure!(
        table.windows(2).all(|pair| pair[0].win_pct >= pair[1].win_pct),
        "style table not sorted by win pct"
    );
    ensure!(
        meta.tournament_table("sweep") == table,
        "tournament table disagrees with rolling window"
    );
    Ok(())
}

fn check_persistence(seed: u64) -> Result<()> {
    let (style_meta, sponsor_ledger) = record_season(seed)?;
    let expected = SaveState {
        style_meta,
        sponsor_ledger,
        ..SaveState::default()
    };

    let storage = MemoryStorage::default();
    let mut session = StoreSession::open(&storage, "sweep")?;
    *session.state_mut() = expected.clone();
    session.close()?;

    let loaded = load_state(&storage, "sweep")?;
    ensure!(
        loaded.as_ref() == Some(&expected),
        "save state changed across a store round trip"
    );
    Ok(())
}
