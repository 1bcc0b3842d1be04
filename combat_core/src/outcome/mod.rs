//! Outcome rolling for melee swings
//!
//! Chances are computed in basis points (0-10000) and walked in a fixed
//! ladder against one roll in `[0, 9999]`. The first step whose cumulative
//! threshold exceeds the roll wins; nothing is ever re-rolled.

mod melee;

pub use melee::{
    melee_outcome_chances, melee_outcome_for_roll, roll_melee_outcome, roll_melee_outcome_with_rng,
};

use serde::{Deserialize, Serialize};

/// Result category of one swing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitOutcome {
    Miss,
    Dodge,
    Parry,
    Evade,
    Block,
    Glancing,
    Crushing,
    Normal,
    Crit,
}

impl HitOutcome {
    /// The swing connected and may deal damage
    pub fn is_hit(self) -> bool {
        matches!(
            self,
            HitOutcome::Normal
                | HitOutcome::Crit
                | HitOutcome::Block
                | HitOutcome::Glancing
                | HitOutcome::Crushing
        )
    }
}

/// Per-step chances in basis points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeChances {
    pub miss: i32,
    pub dodge: i32,
    pub parry: i32,
    pub glancing: i32,
    pub block: i32,
    pub crit: i32,
    pub crushing: i32,
}

/// Walk the hit ladder for one roll in `[0, 9999]`
///
/// Order: miss, dodge, parry, glancing, block, crit, crushing, then normal.
/// Steps with a non-positive chance are skipped.
pub fn roll_outcome_from_chances(chances: &OutcomeChances, roll: i32) -> HitOutcome {
    let ladder = [
        (HitOutcome::Miss, chances.miss),
        (HitOutcome::Dodge, chances.dodge),
        (HitOutcome::Parry, chances.parry),
        (HitOutcome::Glancing, chances.glancing),
        (HitOutcome::Block, chances.block),
        (HitOutcome::Crit, chances.crit),
        (HitOutcome::Crushing, chances.crushing),
    ];

    let mut sum = 0;
    for (outcome, chance) in ladder {
        if chance <= 0 {
            continue;
        }
        sum += chance;
        if roll < sum {
            return outcome;
        }
    }
    HitOutcome::Normal
}
