use serde::{Deserialize, Serialize};

use crate::{card::types::StatType, card::catalog::CardPredicate, enums::ZoneType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// 효과의 스피드. Normal < Quick < Counter 의 전순서입니다.
pub enum EffectSpeed {
    Normal = 1,  // 스피드 1
    Quick = 2,   // 스피드 2
    Counter = 3, // 스피드 3
}

impl EffectSpeed {
    pub fn is_faster_than(&self, other: EffectSpeed) -> bool {
        self > &other
    }

    pub fn is_slower_than(&self, other: EffectSpeed) -> bool {
        self < &other
    }

    /// `other` 가 체인 맨 위에 있을 때 이 스피드로 체인할 수 있는지.
    /// 스피드 1 은 어떤 체인에도 올라갈 수 없습니다.
    pub fn can_it_chain(&self, other: EffectSpeed) -> bool {
        *self != EffectSpeed::Normal && !self.is_slower_than(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerEvent {
    Summoned,
    Destroyed,
    SentToGraveyard,
    StandbyPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EffectKind {
    /// 자신 메인 페이즈, 체인이 비어 있을 때만.
    Ignition,
    Quick,
    Trigger { event: TriggerEvent },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Frequency {
    #[default]
    Unlimited,
    OncePerTurn,
    OncePerDuel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Cost {
    PayLife { amount: u32 },
    Discard { count: usize },
    DetachMaterial { count: usize },
    TributeSelf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetSide {
    Own,
    Opponent,
    #[default]
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSpec {
    pub count: usize,
    pub zone: ZoneType,
    #[serde(default)]
    pub side: TargetSide,
    #[serde(default)]
    pub face_up_only: bool,
}

/// 효과 처리 시 실행되는 동작. 고정된 핸들러 집합이 해석합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EffectAction {
    Destroy,
    Banish,
    Draw { count: usize },
    SearchDeck { filter: CardPredicate },
    ModifyStat { stat: StatType, amount: i32 },
    /// 바로 아래 체인 링크를 무효로 합니다.
    Negate {
        #[serde(default)]
        destroy_source: bool,
    },
    Damage { amount: u32 },
    Recover { amount: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_ordering() {
        assert!(EffectSpeed::Counter.is_faster_than(EffectSpeed::Quick));
        assert!(EffectSpeed::Normal.is_slower_than(EffectSpeed::Quick));

        assert!(EffectSpeed::Quick.can_it_chain(EffectSpeed::Normal));
        assert!(EffectSpeed::Quick.can_it_chain(EffectSpeed::Quick));
        assert!(EffectSpeed::Counter.can_it_chain(EffectSpeed::Quick));
        assert!(!EffectSpeed::Quick.can_it_chain(EffectSpeed::Counter));
        assert!(!EffectSpeed::Normal.can_it_chain(EffectSpeed::Normal));
    }
}
