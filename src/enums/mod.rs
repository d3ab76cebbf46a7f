use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub const CARD_JSON_PATH: &str = "resource/cards.json";
pub const CONFIG_FILE_PATH: &str = "resource/duel.toml";
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_NAME: &str = "duel.log";

/// 진단용 로그 target. 세션을 중단시키는 내부 오류는 이 target 으로 남깁니다.
pub const DIAGNOSTICS_TARGET: &str = "duel::diagnostics";

pub const MONSTER_ZONE_SIZE: usize = 5;
pub const SPELL_TRAP_ZONE_SIZE: usize = 5;
pub const FIELD_ZONE_SIZE: usize = 1;

pub const STARTING_LIFE_POINTS: u32 = 8000;
pub const OPENING_HAND_SIZE: usize = 5;
pub const NORMAL_SUMMON_ALLOWANCE: u32 = 1;

pub const MIN_MAIN_DECK_SIZE: usize = 40;
pub const MAX_MAIN_DECK_SIZE: usize = 60;
pub const MAX_EXTRA_DECK_SIZE: usize = 15;
pub const MAX_COPIES_PER_CARD: usize = 3;

pub const RESPONSE_TIMEOUT_MS: u64 = 30_000;
pub const DISCONNECT_GRACE_MS: u64 = 60_000;

/// 카드가 놓일 수 있는 모든 영역.
/// `Overlay` 는 엑시즈 소재가 붙어 있는 영역으로, 카드 인스턴스의 `attached_to` 로 주인을 가리킵니다.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZoneType {
    Hand,
    Deck,
    ExtraDeck,
    Graveyard,
    Banished,
    MonsterZone,
    SpellTrapZone,
    FieldZone,
    Overlay,
}

impl ZoneType {
    pub const ALL: [ZoneType; 9] = [
        ZoneType::Hand,
        ZoneType::Deck,
        ZoneType::ExtraDeck,
        ZoneType::Graveyard,
        ZoneType::Banished,
        ZoneType::MonsterZone,
        ZoneType::SpellTrapZone,
        ZoneType::FieldZone,
        ZoneType::Overlay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Hand => "Hand",
            ZoneType::Deck => "Deck",
            ZoneType::ExtraDeck => "ExtraDeck",
            ZoneType::Graveyard => "Graveyard",
            ZoneType::Banished => "Banished",
            ZoneType::MonsterZone => "MonsterZone",
            ZoneType::SpellTrapZone => "SpellTrapZone",
            ZoneType::FieldZone => "FieldZone",
            ZoneType::Overlay => "Overlay",
        }
    }

    /// 필드 위 영역인지. 필드에 들어오는 순간 턴 스탬프가 찍힙니다.
    pub fn is_on_field(&self) -> bool {
        matches!(
            self,
            ZoneType::MonsterZone | ZoneType::SpellTrapZone | ZoneType::FieldZone
        )
    }

    /// 주인 외에는 내용을 볼 수 없는 영역.
    pub fn is_hidden(&self) -> bool {
        matches!(self, ZoneType::Hand | ZoneType::Deck | ZoneType::ExtraDeck)
    }
}

impl Display for ZoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
