use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    card::types::PlayerKind,
    config::RulesConfig,
    effect::EffectKey,
    enums::{ZoneType, FIELD_ZONE_SIZE},
    zone::Zone,
};

/// 플레이어 한 명이 가진 영역들.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerZones {
    pub hand: Zone,
    pub deck: Zone,
    pub extra_deck: Zone,
    pub graveyard: Zone,
    pub banished: Zone,
    pub monster: Zone,
    pub spell_trap: Zone,
    pub field: Zone,
    pub overlay: Zone,
}

impl PlayerZones {
    pub fn new(rules: &RulesConfig) -> Self {
        Self {
            hand: Zone::new(ZoneType::Hand),
            deck: Zone::new(ZoneType::Deck),
            extra_deck: Zone::new(ZoneType::ExtraDeck),
            graveyard: Zone::new(ZoneType::Graveyard),
            banished: Zone::new(ZoneType::Banished),
            monster: Zone::bounded(ZoneType::MonsterZone, rules.monster_zones),
            spell_trap: Zone::bounded(ZoneType::SpellTrapZone, rules.spell_trap_zones),
            field: Zone::bounded(ZoneType::FieldZone, FIELD_ZONE_SIZE),
            overlay: Zone::new(ZoneType::Overlay),
        }
    }

    pub fn get(&self, zone: ZoneType) -> &Zone {
        match zone {
            ZoneType::Hand => &self.hand,
            ZoneType::Deck => &self.deck,
            ZoneType::ExtraDeck => &self.extra_deck,
            ZoneType::Graveyard => &self.graveyard,
            ZoneType::Banished => &self.banished,
            ZoneType::MonsterZone => &self.monster,
            ZoneType::SpellTrapZone => &self.spell_trap,
            ZoneType::FieldZone => &self.field,
            ZoneType::Overlay => &self.overlay,
        }
    }

    pub fn get_mut(&mut self, zone: ZoneType) -> &mut Zone {
        match zone {
            ZoneType::Hand => &mut self.hand,
            ZoneType::Deck => &mut self.deck,
            ZoneType::ExtraDeck => &mut self.extra_deck,
            ZoneType::Graveyard => &mut self.graveyard,
            ZoneType::Banished => &mut self.banished,
            ZoneType::MonsterZone => &mut self.monster,
            ZoneType::SpellTrapZone => &mut self.spell_trap,
            ZoneType::FieldZone => &mut self.field,
            ZoneType::Overlay => &mut self.overlay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub kind: PlayerKind,
    life_points: u32,
    pub zones: PlayerZones,
    pub once_per_turn: BTreeSet<EffectKey>,
    pub once_per_duel: BTreeSet<EffectKey>,
    pub normal_summons_used: u32,
    pub normal_summon_allowance: u32,
    pub pendulum_summoned: bool,
}

impl PlayerState {
    pub fn new(kind: PlayerKind, rules: &RulesConfig) -> Self {
        Self {
            kind,
            life_points: rules.starting_life_points,
            zones: PlayerZones::new(rules),
            once_per_turn: BTreeSet::new(),
            once_per_duel: BTreeSet::new(),
            normal_summons_used: 0,
            normal_summon_allowance: rules.normal_summon_allowance,
            pendulum_summoned: false,
        }
    }

    pub fn life_points(&self) -> u32 {
        self.life_points
    }

    pub fn is_defeated(&self) -> bool {
        self.life_points == 0
    }

    /// 0 에서 멈춥니다. 패배 여부를 돌려줍니다.
    pub fn adjust_life(&mut self, delta: i64) -> bool {
        let next = (self.life_points as i64 + delta).clamp(0, u32::MAX as i64);
        self.life_points = next as u32;
        self.is_defeated()
    }

    pub fn can_normal_summon(&self) -> bool {
        self.normal_summons_used < self.normal_summon_allowance
    }

    /// 턴이 바뀔 때 턴 단위 플래그를 초기화합니다.
    pub fn reset_turn_flags(&mut self, rules: &RulesConfig) {
        self.once_per_turn.clear();
        self.normal_summons_used = 0;
        self.normal_summon_allowance = rules.normal_summon_allowance;
        self.pendulum_summoned = false;
    }
}
