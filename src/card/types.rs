use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
/// `PlayerKind`는 듀얼의 좌석을 나타내는 열거형입니다.
///
/// Player1 이 선공입니다.
pub enum PlayerKind {
    Player1,
    Player2,
}

impl Display for PlayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PlayerKind {
    pub const BOTH: [PlayerKind; 2] = [PlayerKind::Player1, PlayerKind::Player2];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerKind::Player1 => "Player1",
            PlayerKind::Player2 => "Player2",
        }
    }

    pub fn reverse(&self) -> Self {
        match self {
            PlayerKind::Player1 => PlayerKind::Player2,
            PlayerKind::Player2 => PlayerKind::Player1,
        }
    }

    /// 좌석별 배열(`[T; 2]`) 인덱스.
    pub fn index(&self) -> usize {
        match self {
            PlayerKind::Player1 => 0,
            PlayerKind::Player2 => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// `PlayerIdentity`는 외부 식별자(`id`)와 좌석(`kind`)을 묶은 구조체입니다.
pub struct PlayerIdentity {
    pub id: Uuid,
    pub kind: PlayerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonsterFrame {
    Normal,
    Effect,
    Ritual,
    Fusion,
    Synchro,
    Xyz,
    Pendulum,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellKind {
    Normal,
    QuickPlay,
    Continuous,
    Equip,
    Field,
    Ritual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapKind {
    Normal,
    Continuous,
    Counter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "frame")]
/// `CardType`은 카드의 종류를 나타내는 열거형입니다.
pub enum CardType {
    Monster(MonsterFrame),
    Spell(SpellKind),
    Trap(TrapKind),
}

impl CardType {
    pub fn is_monster(&self) -> bool {
        matches!(self, CardType::Monster(_))
    }

    pub fn is_spell(&self) -> bool {
        matches!(self, CardType::Spell(_))
    }

    pub fn is_trap(&self) -> bool {
        matches!(self, CardType::Trap(_))
    }

    pub fn is_field_spell(&self) -> bool {
        matches!(self, CardType::Spell(SpellKind::Field))
    }

    /// 엑스트라 덱에서 시작하는 몬스터.
    pub fn is_extra_deck(&self) -> bool {
        matches!(
            self,
            CardType::Monster(
                MonsterFrame::Fusion | MonsterFrame::Synchro | MonsterFrame::Xyz | MonsterFrame::Link
            )
        )
    }

    pub fn is_pendulum(&self) -> bool {
        matches!(self, CardType::Monster(MonsterFrame::Pendulum))
    }

    /// 발동 후 묘지로 가는 마법/함정인지.
    /// 지속/장착/필드 마법과 지속 함정은 필드에 남습니다.
    pub fn leaves_after_resolution(&self) -> bool {
        matches!(
            self,
            CardType::Spell(SpellKind::Normal | SpellKind::QuickPlay | SpellKind::Ritual)
                | CardType::Trap(TrapKind::Normal | TrapKind::Counter)
        )
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardType::Monster(frame) => write!(f, "Monster({:?})", frame),
            CardType::Spell(kind) => write!(f, "Spell({:?})", kind),
            CardType::Trap(kind) => write!(f, "Trap({:?})", kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Dark,
    Light,
    Earth,
    Water,
    Fire,
    Wind,
    Divine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Attack,
    Defense,
}

impl Position {
    pub fn toggle(&self) -> Self {
        match self {
            Position::Attack => Position::Defense,
            Position::Defense => Position::Attack,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Face {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// `StatType`은 스탯의 종류를 나타내는 열거형입니다.
pub enum StatType {
    Attack,
    Defense,
}
