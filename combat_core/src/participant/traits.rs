//! Capability table resolved from the unit kind

use crate::types::UnitKind;
use serde::{Deserialize, Serialize};

/// What a participant can do in combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTraits {
    pub player_controlled: bool,
    pub can_dodge: bool,
    pub can_parry: bool,
    pub can_block: bool,
    /// Lands crushing blows on lower level targets
    pub can_crush: bool,
    /// Suffers glancing blows against higher level targets
    pub can_glance: bool,
    /// Keeps its own threat table
    pub tracks_threat: bool,
    /// Gains and loses equipment durability
    pub has_durability: bool,
    /// Walks home when it runs out of targets
    pub evades: bool,
    pub is_vehicle: bool,
    pub is_pet: bool,
}

impl CombatTraits {
    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Player => CombatTraits {
                player_controlled: true,
                can_dodge: true,
                can_parry: true,
                can_block: true,
                can_crush: false,
                can_glance: true,
                tracks_threat: false,
                has_durability: true,
                evades: false,
                is_vehicle: false,
                is_pet: false,
            },
            UnitKind::Creature => CombatTraits {
                player_controlled: false,
                can_dodge: true,
                can_parry: true,
                can_block: true,
                can_crush: true,
                can_glance: false,
                tracks_threat: true,
                has_durability: false,
                evades: true,
                is_vehicle: false,
                is_pet: false,
            },
            UnitKind::Pet => CombatTraits {
                player_controlled: true,
                can_dodge: true,
                can_parry: false,
                can_block: false,
                can_crush: false,
                can_glance: true,
                tracks_threat: true,
                has_durability: false,
                evades: false,
                is_vehicle: false,
                is_pet: true,
            },
            UnitKind::Vehicle => CombatTraits {
                player_controlled: false,
                can_dodge: false,
                can_parry: false,
                can_block: false,
                can_crush: false,
                can_glance: false,
                tracks_threat: true,
                has_durability: false,
                evades: false,
                is_vehicle: true,
                is_pet: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_traits() {
        let t = CombatTraits::for_kind(UnitKind::Player);
        assert!(t.player_controlled);
        assert!(!t.tracks_threat);
        assert!(!t.can_crush);
    }

    #[test]
    fn test_creature_traits() {
        let t = CombatTraits::for_kind(UnitKind::Creature);
        assert!(t.tracks_threat);
        assert!(t.can_crush);
        assert!(t.evades);
    }
}
