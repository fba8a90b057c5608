//! Throwaway warriors for demos and seed data.
//!
//! Draws from the thread-local generator, so nothing here is reproducible.
//! Never feed these rolls into a bout or allocation; only the finished roster
//! crosses into seeded code.
use rand::Rng;
use rand::seq::SliceRandom;

use crate::style::FightingStyle;
use crate::warrior::{BoutPlan, Combatant, WarriorAttributes};

const GIVEN: &[&str] = &[
    "Akira", "Hana", "Isamu", "Kaede", "Kenji", "Mio", "Noboru", "Rin", "Sora", "Takeshi", "Yuki",
];
const SCHOOL: &[&str] = &[
    "of the Iron Gate",
    "of Red Pines",
    "of the East Hall",
    "the Patient",
    "the Unbowed",
    "of Willow Court",
];

/// Roster of `count` valid combatants with random names, attributes and plans.
#[allow(clippy::disallowed_methods)]
#[must_use]
pub fn random_roster(count: usize) -> Vec<Combatant> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|idx| {
            let given = GIVEN.choose(&mut rng).copied().unwrap_or("Nameless");
            let school = SCHOOL.choose(&mut rng).copied().unwrap_or("");
            let attributes = WarriorAttributes {
                st: rng.gen_range(3..=18),
                cn: rng.gen_range(3..=18),
                sz: rng.gen_range(3..=18),
                wt: rng.gen_range(3..=18),
                wl: rng.gen_range(3..=18),
                sp: rng.gen_range(3..=18),
                df: rng.gen_range(3..=18),
            };
            let style = FightingStyle::ALL
                .choose(&mut rng)
                .copied()
                .unwrap_or(FightingStyle::StrikingAttack);
            let plan = BoutPlan::new(style, rng.gen_range(1..=10), rng.gen_range(1..=10))
                .with_kill_desire(rng.gen_range(0..=10));
            Combatant::new(
                format!("demo-{idx:03}"),
                format!("{given} {school}").trim_end().to_string(),
                attributes,
                plan,
            )
        })
        .collect()
}
