pub mod catalog;
pub mod types;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    resource::{Resource, ResourceExtension, StatResource},
    zone::ZoneRef,
};
use catalog::{CardDefinition, CatalogId};
use types::{CardType, Face, PlayerKind, Position, StatType};

/// 세션 안에서 카드 인스턴스를 가리키는 핸들. 아레나(`FieldState`)의 키입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 듀얼에 실제로 존재하는 한 장의 카드.
///
/// 정적인 정보는 카탈로그(`CardDefinition`)에 있고, 여기에는 위치, 표시 형식,
/// 변경된 스탯처럼 듀얼 중에 바뀌는 값만 둡니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInstance {
    pub id: InstanceId,
    pub catalog_id: CatalogId,
    pub owner: PlayerKind,
    pub card_type: CardType,
    pub location: ZoneRef,
    pub face: Face,
    pub position: Position,
    pub level: u8,
    pub counters: u32,
    attack: StatResource,
    defense: StatResource,
    /// 현재 영역에 들어온 턴
    pub entered_turn: u32,
    /// 엑시즈 소재일 때 붙어 있는 몬스터
    pub attached_to: Option<InstanceId>,
    pub last_attack_turn: Option<u32>,
    pub last_position_change_turn: Option<u32>,
}

impl CardInstance {
    pub fn new(id: InstanceId, def: &CardDefinition, owner: PlayerKind, location: ZoneRef) -> Self {
        Self {
            id,
            catalog_id: def.id,
            owner,
            card_type: def.card_type,
            location,
            face: Face::Down,
            position: Position::Attack,
            level: def.level,
            counters: 0,
            attack: StatResource::new(def.attack),
            defense: StatResource::new(def.defense),
            entered_turn: 0,
            attached_to: None,
            last_attack_turn: None,
            last_position_change_turn: None,
        }
    }

    pub fn attack(&self) -> i32 {
        self.attack.value()
    }

    pub fn defense(&self) -> i32 {
        self.defense.value()
    }

    pub fn base_attack(&self) -> i32 {
        self.attack.base()
    }

    pub fn base_defense(&self) -> i32 {
        self.defense.base()
    }

    pub fn modify_stat(&mut self, stat: StatType, amount: i32) {
        match stat {
            StatType::Attack => self.attack.apply(amount),
            StatType::Defense => self.defense.apply(amount),
        }
    }

    /// 필드를 떠날 때 변경된 값은 모두 사라집니다.
    pub fn reset_to_base(&mut self) {
        self.attack.clear();
        self.defense.clear();
        self.counters = 0;
        self.last_attack_turn = None;
        self.last_position_change_turn = None;
    }

    pub fn is_face_up(&self) -> bool {
        self.face == Face::Up
    }

    pub fn is_monster(&self) -> bool {
        self.card_type.is_monster()
    }
}
