//! Defense system - Armor, Resistance, Absorption

mod absorb;
mod armour;
mod resistance;

pub use absorb::calc_absorb_resist;
pub use armour::{apply_armor_mitigation, armor_mitigation_ratio, calc_armor_reduced_damage};
pub use resistance::{
    calc_resisted_damage, resist_bucket, resist_chance, resist_distribution, RESIST_BUCKETS,
};
