//! Combat tuning constants

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Tunable combat constants
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatConstants {
    #[serde(default)]
    pub armor: ArmorConstants,
    #[serde(default)]
    pub resist: ResistConstants,
    #[serde(default)]
    pub outcome: OutcomeConstants,
    #[serde(default)]
    pub rage: RageConstants,
    #[serde(default)]
    pub combat: CombatTimerConstants,
    #[serde(default)]
    pub durability: DurabilityConstants,
    #[serde(default)]
    pub diminishing: DiminishingConstants,
    #[serde(default)]
    pub pushback: PushbackConstants,
}

impl CombatConstants {
    /// Reject values the formulas cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.armor.max_mitigation) {
            return Err(ConfigError::ValidationError(format!(
                "armor.max_mitigation must be in [0, 1), got {}",
                self.armor.max_mitigation
            )));
        }
        if self.armor.base_constant <= 0.0 {
            return Err(ConfigError::ValidationError(
                "armor.base_constant must be positive".to_string(),
            ));
        }
        if self.resist.per_level <= 0.0 || self.resist.boss_constant <= 0.0 {
            return Err(ConfigError::ValidationError(
                "resist constants must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.outcome.max_miss) {
            return Err(ConfigError::ValidationError(format!(
                "outcome.max_miss must be a percentage, got {}",
                self.outcome.max_miss
            )));
        }
        if self.outcome.crit_multiplier < 1.0 || self.outcome.spell_crit_multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "crit multipliers must be at least 1.0".to_string(),
            ));
        }
        if self.rage.max_rage == 0 {
            return Err(ConfigError::ValidationError(
                "rage.max_rage must be positive".to_string(),
            ));
        }
        if self.pushback.channel_reduction_pct > 100 {
            return Err(ConfigError::ValidationError(
                "pushback.channel_reduction_pct must be at most 100".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmorConstants {
    /// Upper bound on the armor mitigation ratio
    #[serde(default = "default_max_mitigation")]
    pub max_mitigation: f32,
    /// K = base_constant + per_level * level
    #[serde(default = "default_armor_base")]
    pub base_constant: f32,
    #[serde(default = "default_armor_per_level")]
    pub per_level: f32,
    /// Above this level K grows by high_level_factor * per_level per extra level
    #[serde(default = "default_high_level_threshold")]
    pub high_level_threshold: u8,
    #[serde(default = "default_high_level_factor")]
    pub high_level_factor: f32,
}

impl Default for ArmorConstants {
    fn default() -> Self {
        ArmorConstants {
            max_mitigation: default_max_mitigation(),
            base_constant: default_armor_base(),
            per_level: default_armor_per_level(),
            high_level_threshold: default_high_level_threshold(),
            high_level_factor: default_high_level_factor(),
        }
    }
}

fn default_max_mitigation() -> f32 {
    0.85
}
fn default_armor_base() -> f32 {
    400.0
}
fn default_armor_per_level() -> f32 {
    85.0
}
fn default_high_level_threshold() -> u8 {
    59
}
fn default_high_level_factor() -> f32 {
    4.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResistConstants {
    /// Attacker level that uses the fixed boss constant
    #[serde(default = "default_boss_level")]
    pub boss_level: u8,
    #[serde(default = "default_boss_constant")]
    pub boss_constant: f32,
    /// Resistance constant per attacker level otherwise
    #[serde(default = "default_resist_per_level")]
    pub per_level: f32,
    /// Bonus resistance per level the victim has over the attacker
    #[serde(default = "default_level_diff_bonus")]
    pub level_diff_bonus: f32,
}

impl Default for ResistConstants {
    fn default() -> Self {
        ResistConstants {
            boss_level: default_boss_level(),
            boss_constant: default_boss_constant(),
            per_level: default_resist_per_level(),
            level_diff_bonus: default_level_diff_bonus(),
        }
    }
}

fn default_boss_level() -> u8 {
    83
}
fn default_boss_constant() -> f32 {
    510.0
}
fn default_resist_per_level() -> f32 {
    5.0
}
fn default_level_diff_bonus() -> f32 {
    5.0
}

/// Hit table tuning. Chances are percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeConstants {
    #[serde(default = "default_base_miss")]
    pub base_miss: f32,
    /// Extra white-swing miss chance when dual wielding
    #[serde(default = "default_dual_wield_penalty")]
    pub dual_wield_penalty: f32,
    #[serde(default = "default_max_miss")]
    pub max_miss: f32,
    /// Weapon and defense skill granted per level
    #[serde(default = "default_skill_per_level")]
    pub skill_per_level: u32,
    /// Victim must be this many levels above the attacker to glance
    #[serde(default = "default_glancing_min_level_gap")]
    pub glancing_min_level_gap: u8,
    /// Cap on the glancing chance, basis points
    #[serde(default = "default_glancing_cap")]
    pub glancing_cap: i32,
    /// Largest level gap counted by glancing damage reduction
    #[serde(default = "default_glancing_max_gap")]
    pub glancing_max_gap: u8,
    #[serde(default = "default_glancing_reduction_per_level")]
    pub glancing_reduction_per_level: f32,
    #[serde(default = "default_crushing_min_level_gap")]
    pub crushing_min_level_gap: u8,
    /// Weapon skill over defense required before crushing blows appear
    #[serde(default = "default_crushing_min_skill_gap")]
    pub crushing_min_skill_gap: i32,
    #[serde(default = "default_crushing_multiplier")]
    pub crushing_multiplier: f32,
    #[serde(default = "default_crit_multiplier")]
    pub crit_multiplier: f32,
    #[serde(default = "default_spell_crit_multiplier")]
    pub spell_crit_multiplier: f32,
}

impl Default for OutcomeConstants {
    fn default() -> Self {
        OutcomeConstants {
            base_miss: default_base_miss(),
            dual_wield_penalty: default_dual_wield_penalty(),
            max_miss: default_max_miss(),
            skill_per_level: default_skill_per_level(),
            glancing_min_level_gap: default_glancing_min_level_gap(),
            glancing_cap: default_glancing_cap(),
            glancing_max_gap: default_glancing_max_gap(),
            glancing_reduction_per_level: default_glancing_reduction_per_level(),
            crushing_min_level_gap: default_crushing_min_level_gap(),
            crushing_min_skill_gap: default_crushing_min_skill_gap(),
            crushing_multiplier: default_crushing_multiplier(),
            crit_multiplier: default_crit_multiplier(),
            spell_crit_multiplier: default_spell_crit_multiplier(),
        }
    }
}

fn default_base_miss() -> f32 {
    5.0
}
fn default_dual_wield_penalty() -> f32 {
    19.0
}
fn default_max_miss() -> f32 {
    60.0
}
fn default_skill_per_level() -> u32 {
    5
}
fn default_glancing_min_level_gap() -> u8 {
    3
}
fn default_glancing_cap() -> i32 {
    4000
}
fn default_glancing_max_gap() -> u8 {
    3
}
fn default_glancing_reduction_per_level() -> f32 {
    0.1
}
fn default_crushing_min_level_gap() -> u8 {
    4
}
fn default_crushing_min_skill_gap() -> i32 {
    15
}
fn default_crushing_multiplier() -> f32 {
    1.5
}
fn default_crit_multiplier() -> f32 {
    2.0
}
fn default_spell_crit_multiplier() -> f32 {
    1.5
}

/// Rage generation. Rage is stored in tenths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RageConstants {
    /// Stored rage cap (100 rage = 1000)
    #[serde(default = "default_max_rage")]
    pub max_rage: u32,
    /// Multiplier on the attacker reward
    #[serde(default = "default_rage_rate")]
    pub income_rate: f32,
    /// Swing speed factor per second of weapon attack time
    #[serde(default = "default_hit_factor")]
    pub hit_factor: f32,
}

impl Default for RageConstants {
    fn default() -> Self {
        RageConstants {
            max_rage: default_max_rage(),
            income_rate: default_rage_rate(),
            hit_factor: default_hit_factor(),
        }
    }
}

fn default_max_rage() -> u32 {
    1000
}
fn default_rage_rate() -> f32 {
    1.0
}
fn default_hit_factor() -> f32 {
    3.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatTimerConstants {
    /// Combat decay window after PvP contact
    #[serde(default = "default_pvp_timer")]
    pub pvp_timer_ms: u64,
    /// Time a creature spends walking home after evading
    #[serde(default = "default_evade_duration")]
    pub evade_duration_ms: u64,
    /// Melee reach used by the world tick
    #[serde(default = "default_melee_range")]
    pub melee_range: f32,
    /// Attack timer increase on a parry, percent of the weapon speed
    #[serde(default = "default_parry_haste_pct")]
    pub parry_haste_pct: u32,
    /// Parry haste only applies above this fraction of the swing remaining
    #[serde(default = "default_parry_haste_floor_pct")]
    pub parry_haste_floor_pct: u32,
}

impl Default for CombatTimerConstants {
    fn default() -> Self {
        CombatTimerConstants {
            pvp_timer_ms: default_pvp_timer(),
            evade_duration_ms: default_evade_duration(),
            melee_range: default_melee_range(),
            parry_haste_pct: default_parry_haste_pct(),
            parry_haste_floor_pct: default_parry_haste_floor_pct(),
        }
    }
}

fn default_pvp_timer() -> u64 {
    5500
}
fn default_evade_duration() -> u64 {
    3000
}
fn default_melee_range() -> f32 {
    5.0
}
fn default_parry_haste_pct() -> u32 {
    40
}
fn default_parry_haste_floor_pct() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurabilityConstants {
    /// Chance a damage event wears an item of the victim
    #[serde(default = "default_damage_loss_chance")]
    pub damage_loss_chance: f32,
    /// Chance a landed swing wears the attacker's weapon
    #[serde(default = "default_weapon_loss_chance")]
    pub weapon_loss_chance: f32,
    /// Percent of durability lost on death
    #[serde(default = "default_death_loss_pct")]
    pub death_loss_pct: f32,
}

impl Default for DurabilityConstants {
    fn default() -> Self {
        DurabilityConstants {
            damage_loss_chance: default_damage_loss_chance(),
            weapon_loss_chance: default_weapon_loss_chance(),
            death_loss_pct: default_death_loss_pct(),
        }
    }
}

fn default_damage_loss_chance() -> f32 {
    0.5
}
fn default_weapon_loss_chance() -> f32 {
    0.5
}
fn default_death_loss_pct() -> f32 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiminishingConstants {
    /// Inactive groups fall back to level one after this window
    #[serde(default = "default_reset_window")]
    pub reset_window_ms: u64,
    /// Longest duration a limited group may have against players
    #[serde(default = "default_pvp_duration_limit")]
    pub pvp_duration_limit_ms: u64,
}

impl Default for DiminishingConstants {
    fn default() -> Self {
        DiminishingConstants {
            reset_window_ms: default_reset_window(),
            pvp_duration_limit_ms: default_pvp_duration_limit(),
        }
    }
}

fn default_reset_window() -> u64 {
    15_000
}
fn default_pvp_duration_limit() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushbackConstants {
    /// Cast time added per damaging hit
    #[serde(default = "default_pushback_delay")]
    pub delay_ms: u32,
    /// Hits that may still delay a single cast
    #[serde(default = "default_max_delays")]
    pub max_delays: u8,
    /// Channel duration lost per hit, percent of the full channel
    #[serde(default = "default_channel_reduction")]
    pub channel_reduction_pct: u32,
}

impl Default for PushbackConstants {
    fn default() -> Self {
        PushbackConstants {
            delay_ms: default_pushback_delay(),
            max_delays: default_max_delays(),
            channel_reduction_pct: default_channel_reduction(),
        }
    }
}

fn default_pushback_delay() -> u32 {
    500
}
fn default_max_delays() -> u8 {
    2
}
fn default_channel_reduction() -> u32 {
    25
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(CombatConstants::default().validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let c = CombatConstants::default();
        assert!((c.armor.max_mitigation - 0.85).abs() < f32::EPSILON);
        assert_eq!(c.outcome.glancing_cap, 4000);
        assert_eq!(c.diminishing.reset_window_ms, 15_000);
        assert_eq!(c.rage.max_rage, 1000);
    }

    #[test]
    fn test_zero_rage_cap_rejected() {
        let mut c = CombatConstants::default();
        c.rage.max_rage = 0;
        assert!(c.validate().is_err());
    }
}
