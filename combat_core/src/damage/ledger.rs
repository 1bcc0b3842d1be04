//! DamageLedger - the mutable record of one damage event
//!
//! Every mitigation step moves damage out of `remaining` into one of the
//! subtotals, so `original == remaining + absorbed + resisted + blocked`
//! holds after every call. The subtotals are private to keep it that way.

use crate::outcome::HitOutcome;
use crate::types::{DamageEffectType, ParticipantId, SchoolMask, SpellInfo, WeaponAttackType};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Qualifiers reported with a damage event
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HitInfo: u32 {
        const NORMAL_SWING   = 1 << 0;
        const OFFHAND        = 1 << 1;
        const MISS           = 1 << 2;
        const CRITICAL_HIT   = 1 << 3;
        const GLANCING       = 1 << 4;
        const CRUSHING       = 1 << 5;
        const PARTIAL_ABSORB = 1 << 6;
        const FULL_ABSORB    = 1 << 7;
        const PARTIAL_RESIST = 1 << 8;
        const FULL_RESIST    = 1 << 9;
        const BLOCK          = 1 << 10;
        const FULL_BLOCK     = 1 << 11;
        const DODGE          = 1 << 12;
        const PARRY          = 1 << 13;
        const EVADE          = 1 << 14;
        const IMMUNE         = 1 << 15;
        const SPLIT          = 1 << 16;
    }
}

/// Mitigated and absorbed amounts of a weapon hit, used for rage and parry haste
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanDamage {
    pub mitigated: u32,
    pub absorbed: u32,
    pub attack_type: WeaponAttackType,
    pub outcome: HitOutcome,
}

impl CleanDamage {
    pub fn new(mitigated: u32, absorbed: u32, attack_type: WeaponAttackType, outcome: HitOutcome) -> Self {
        CleanDamage {
            mitigated,
            absorbed,
            attack_type,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Transfer {
    Absorb,
    Resist,
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageLedger {
    pub attacker: Option<ParticipantId>,
    pub victim: ParticipantId,
    original: u32,
    remaining: u32,
    absorbed: u32,
    resisted: u32,
    blocked: u32,
    pub hit_info: HitInfo,
    pub school_mask: SchoolMask,
    pub spell: Option<SpellInfo>,
    pub effect_type: DamageEffectType,
    pub attack_type: WeaponAttackType,
    /// Split-damage effects may redirect part of this event
    pub allow_split: bool,
}

impl DamageLedger {
    pub fn new(
        attacker: Option<ParticipantId>,
        victim: ParticipantId,
        amount: u32,
        school_mask: SchoolMask,
        effect_type: DamageEffectType,
    ) -> Self {
        DamageLedger {
            attacker,
            victim,
            original: amount,
            remaining: amount,
            absorbed: 0,
            resisted: 0,
            blocked: 0,
            hit_info: HitInfo::empty(),
            school_mask,
            spell: None,
            effect_type,
            attack_type: WeaponAttackType::BaseAttack,
            allow_split: true,
        }
    }

    pub fn with_spell(mut self, spell: SpellInfo) -> Self {
        self.spell = Some(spell);
        self
    }

    pub fn with_attack_type(mut self, attack_type: WeaponAttackType) -> Self {
        self.attack_type = attack_type;
        self
    }

    pub fn with_hit_info(mut self, hit_info: HitInfo) -> Self {
        self.hit_info |= hit_info;
        self
    }

    pub fn original(&self) -> u32 {
        self.original
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn absorbed(&self) -> u32 {
        self.absorbed
    }

    pub fn resisted(&self) -> u32 {
        self.resisted
    }

    pub fn blocked(&self) -> u32 {
        self.blocked
    }

    pub fn spell_id(&self) -> Option<u32> {
        self.spell.map(|s| s.id)
    }

    /// Move up to `amount` from remaining to absorbed; returns what moved
    pub fn absorb(&mut self, amount: u32) -> u32 {
        self.transfer(amount, Transfer::Absorb)
    }

    /// Move up to `amount` from remaining to resisted; returns what moved
    pub fn resist(&mut self, amount: u32) -> u32 {
        self.transfer(amount, Transfer::Resist)
    }

    /// Move up to `amount` from remaining to blocked; returns what moved
    pub fn block(&mut self, amount: u32) -> u32 {
        self.transfer(amount, Transfer::Block)
    }

    fn transfer(&mut self, amount: u32, kind: Transfer) -> u32 {
        let moved = amount.min(self.remaining);
        if moved == 0 {
            return 0;
        }
        self.remaining -= moved;

        let (total, partial, full) = match kind {
            Transfer::Absorb => (&mut self.absorbed, HitInfo::PARTIAL_ABSORB, HitInfo::FULL_ABSORB),
            Transfer::Resist => (&mut self.resisted, HitInfo::PARTIAL_RESIST, HitInfo::FULL_RESIST),
            Transfer::Block => (&mut self.blocked, HitInfo::BLOCK, HitInfo::FULL_BLOCK),
        };
        *total += moved;

        if self.remaining == 0 {
            self.hit_info.insert(full);
            self.hit_info.remove(HitInfo::NORMAL_SWING | HitInfo::CRITICAL_HIT);
        } else {
            self.hit_info.insert(partial);
        }
        moved
    }

    /// `original == remaining + absorbed + resisted + blocked`
    pub fn is_balanced(&self) -> bool {
        u64::from(self.original)
            == u64::from(self.remaining)
                + u64::from(self.absorbed)
                + u64::from(self.resisted)
                + u64::from(self.blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ledger(amount: u32) -> DamageLedger {
        DamageLedger::new(
            Some(ParticipantId(1)),
            ParticipantId(2),
            amount,
            SchoolMask::NORMAL,
            DamageEffectType::Direct,
        )
        .with_hit_info(HitInfo::NORMAL_SWING)
    }

    #[test]
    fn test_partial_absorb() {
        let mut l = ledger(50);
        assert_eq!(l.absorb(30), 30);
        assert_eq!(l.remaining(), 20);
        assert_eq!(l.absorbed(), 30);
        assert!(l.hit_info.contains(HitInfo::PARTIAL_ABSORB));
        assert!(l.hit_info.contains(HitInfo::NORMAL_SWING));
        assert!(l.is_balanced());
    }

    #[test]
    fn test_full_resist_clears_normal_and_crit() {
        let mut l = ledger(40).with_hit_info(HitInfo::CRITICAL_HIT);
        assert_eq!(l.resist(100), 40);
        assert_eq!(l.remaining(), 0);
        assert!(l.hit_info.contains(HitInfo::FULL_RESIST));
        assert!(!l.hit_info.contains(HitInfo::NORMAL_SWING));
        assert!(!l.hit_info.contains(HitInfo::CRITICAL_HIT));
    }

    #[test]
    fn test_full_block() {
        let mut l = ledger(25);
        l.block(25);
        assert!(l.hit_info.contains(HitInfo::FULL_BLOCK));
        assert_eq!(l.blocked(), 25);
    }

    #[test]
    fn test_transfer_on_empty_ledger_is_noop() {
        let mut l = ledger(0);
        assert_eq!(l.absorb(10), 0);
        assert_eq!(l.hit_info, HitInfo::NORMAL_SWING);
    }

    proptest! {
        #[test]
        fn prop_ledger_stays_balanced(
            amount in 0u32..100_000,
            steps in proptest::collection::vec((0u8..3, 0u32..50_000), 0..12)
        ) {
            let mut l = ledger(amount);
            for (kind, value) in steps {
                match kind {
                    0 => { l.absorb(value); }
                    1 => { l.resist(value); }
                    _ => { l.block(value); }
                }
                prop_assert!(l.is_balanced());
                prop_assert!(l.remaining() <= l.original());
            }
        }
    }
}
