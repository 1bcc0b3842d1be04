//! Damage system - ledger, melee and spell damage calculation

mod bonus;
mod ledger;
mod melee;
mod spell;

pub use bonus::{damage_bonus_done, damage_bonus_taken};
pub use ledger::{CleanDamage, DamageLedger, HitInfo};
pub use melee::{calculate_melee_damage, MeleeDamageInfo};
pub use spell::deal_spell_damage;
