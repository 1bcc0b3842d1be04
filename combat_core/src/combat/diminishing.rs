//! Diminishing returns on repeated crowd control
//!
//! Each group tracks how many of its effects are active (`stack`), when the
//! last one ended (`hit_time`) and the current level. A group with nothing
//! active falls back to level one once the reset window has passed.

use super::context::CombatContext;
use super::world::World;
use crate::config::DiminishingConstants;
use crate::types::ParticipantId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiminishingGroup {
    Stun,
    Root,
    Fear,
    Incapacitate,
    Silence,
    Disarm,
    Taunt,
}

/// Which participants a group diminishes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiminishingType {
    /// Players and player-controlled units only
    Player,
    All,
}

impl DiminishingGroup {
    pub fn group_type(self) -> DiminishingType {
        match self {
            DiminishingGroup::Stun | DiminishingGroup::Taunt => DiminishingType::All,
            _ => DiminishingType::Player,
        }
    }

    /// Highest level, at which the target is immune
    pub fn max_level(self) -> u8 {
        match self {
            DiminishingGroup::Taunt => 5,
            _ => 4,
        }
    }

    /// Groups whose duration is capped against players
    pub fn is_pvp_limited(self) -> bool {
        matches!(
            self,
            DiminishingGroup::Stun
                | DiminishingGroup::Fear
                | DiminishingGroup::Incapacitate
                | DiminishingGroup::Root
        )
    }

    /// Duration factor at `level`
    pub fn duration_factor(self, level: u8) -> f64 {
        match (self, level) {
            (_, 0 | 1) => 1.0,
            (DiminishingGroup::Taunt, 2) => 0.65,
            (DiminishingGroup::Taunt, 3) => 0.4225,
            (DiminishingGroup::Taunt, 4) => 0.274625,
            (DiminishingGroup::Taunt, _) => 0.0,
            (_, 2) => 0.5,
            (_, 3) => 0.25,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiminishingReturn {
    pub group: DiminishingGroup,
    /// Active effects of this group
    pub stack: u32,
    /// Time the last effect of this group ended
    pub hit_time: u64,
    pub level: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiminishingTable {
    entries: Vec<DiminishingReturn>,
}

impl DiminishingTable {
    /// Current level for `group`, resetting it if the window has passed
    pub fn level(&mut self, group: DiminishingGroup, now: u64, constants: &DiminishingConstants) -> u8 {
        let Some(entry) = self.entries.iter_mut().find(|e| e.group == group) else {
            return 1;
        };
        if entry.level == 0 || entry.hit_time == 0 {
            return 1;
        }
        if entry.stack == 0 && now.saturating_sub(entry.hit_time) > constants.reset_window_ms {
            entry.level = 1;
        }
        entry.level
    }

    /// Step `group` one level toward immunity
    pub fn increment(&mut self, group: DiminishingGroup, now: u64) {
        match self.entries.iter_mut().find(|e| e.group == group) {
            Some(entry) => {
                if entry.level < group.max_level() {
                    entry.level += 1;
                }
            }
            None => self.entries.push(DiminishingReturn {
                group,
                stack: 0,
                hit_time: now,
                level: 2,
            }),
        }
    }

    /// An effect of `group` was applied or removed
    pub fn apply_aura(&mut self, group: DiminishingGroup, apply: bool, now: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.group == group) {
            if apply {
                entry.stack += 1;
            } else if entry.stack > 0 {
                entry.stack -= 1;
                if entry.stack == 0 {
                    entry.hit_time = now;
                }
            }
        }
    }

    pub fn get(&self, group: DiminishingGroup) -> Option<&DiminishingReturn> {
        self.entries.iter().find(|e| e.group == group)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Scale `duration_ms` for an effect of `group` landing at `level`
///
/// `target_player_controlled` and `caster_player_controlled` select the PvP
/// duration cap and whether player-only groups diminish at all.
pub fn apply_diminishing_to_duration(
    group: DiminishingGroup,
    duration_ms: u64,
    level: u8,
    target_player_controlled: bool,
    caster_player_controlled: bool,
    constants: &DiminishingConstants,
) -> u64 {
    let mut duration = duration_ms;
    if group.is_pvp_limited()
        && target_player_controlled
        && caster_player_controlled
        && duration > constants.pvp_duration_limit_ms
    {
        duration = constants.pvp_duration_limit_ms;
    }

    let applies = match group {
        DiminishingGroup::Taunt => !target_player_controlled,
        _ => match group.group_type() {
            DiminishingType::All => true,
            DiminishingType::Player => target_player_controlled,
        },
    };
    if !applies {
        return duration;
    }

    (duration as f64 * group.duration_factor(level)).round() as u64
}

/// Land a `group` effect from `caster` on `target`
///
/// Reads the current level, steps the group when it diminishes on this
/// target and returns the scaled duration. Zero means the target is immune.
pub fn apply_diminishing(
    world: &mut World,
    ctx: &CombatContext,
    caster: ParticipantId,
    target: ParticipantId,
    group: DiminishingGroup,
    duration_ms: u64,
) -> u64 {
    let caster_pc = world
        .get(caster)
        .is_some_and(|c| c.is_player_controlled());
    let Some(t) = world.get_mut(target) else {
        return 0;
    };
    let target_pc = t.is_player_controlled();
    let constants = &ctx.constants.diminishing;

    let level = t.diminishing.level(group, ctx.now, constants);
    let tracked = match group.group_type() {
        DiminishingType::All => true,
        DiminishingType::Player => target_pc,
    };
    if tracked {
        t.diminishing.increment(group, ctx.now);
    }

    let duration = apply_diminishing_to_duration(group, duration_ms, level, target_pc, caster_pc, constants);
    tracing::debug!(target = %target, ?group, level, duration, "diminishing applied");
    duration
}
