use serde::{Deserialize, Serialize};

use crate::{
    card::{types::PlayerKind, types::CardType, InstanceId},
    enums::ZoneType,
};

/// 어느 플레이어의 어느 영역인지.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneRef {
    pub owner: PlayerKind,
    pub zone: ZoneType,
}

impl ZoneRef {
    pub fn new(owner: PlayerKind, zone: ZoneType) -> Self {
        Self { owner, zone }
    }
}

impl std::fmt::Display for ZoneRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.owner, self.zone)
    }
}

/// 카드 인스턴스 id 를 담는 영역. 덱은 마지막 원소가 맨 위입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    kind: ZoneType,
    capacity: Option<usize>,
    cards: Vec<InstanceId>,
}

impl Zone {
    pub fn new(kind: ZoneType) -> Self {
        Self {
            kind,
            capacity: None,
            cards: vec![],
        }
    }

    pub fn bounded(kind: ZoneType, capacity: usize) -> Self {
        Self {
            kind,
            capacity: Some(capacity),
            cards: vec![],
        }
    }

    pub fn kind(&self) -> ZoneType {
        self.kind
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity.map_or(false, |cap| self.cards.len() >= cap)
    }

    /// 남은 칸 수. 제한이 없으면 `usize::MAX`.
    pub fn free_slots(&self) -> usize {
        self.capacity
            .map_or(usize::MAX, |cap| cap.saturating_sub(self.cards.len()))
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.cards.contains(&id)
    }

    pub fn cards(&self) -> &[InstanceId] {
        &self.cards
    }

    pub fn top(&self) -> Option<InstanceId> {
        self.cards.last().copied()
    }

    /// 용량 검사는 호출하는 쪽(`FieldState::move_card`)에서 합니다.
    pub(crate) fn push(&mut self, id: InstanceId) {
        self.cards.push(id);
    }

    pub(crate) fn remove(&mut self, id: InstanceId) -> bool {
        match self.cards.iter().position(|c| *c == id) {
            Some(idx) => {
                self.cards.remove(idx);
                true
            }
            None => false,
        }
    }

    pub(crate) fn cards_mut(&mut self) -> &mut Vec<InstanceId> {
        &mut self.cards
    }

    /// 영역 규칙: 이 영역에 해당 종류의 카드가 놓일 수 있는지.
    pub fn accepts(&self, card_type: CardType) -> bool {
        match self.kind {
            ZoneType::MonsterZone => card_type.is_monster(),
            ZoneType::SpellTrapZone => {
                (card_type.is_spell() && !card_type.is_field_spell())
                    || card_type.is_trap()
                    || card_type.is_pendulum()
            }
            ZoneType::FieldZone => card_type.is_field_spell(),
            ZoneType::ExtraDeck => card_type.is_extra_deck() || card_type.is_pendulum(),
            ZoneType::Hand | ZoneType::Deck => !card_type.is_extra_deck(),
            ZoneType::Graveyard | ZoneType::Banished | ZoneType::Overlay => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::types::{MonsterFrame, SpellKind, TrapKind};

    #[test]
    fn bounded_zone_reports_full() {
        let mut zone = Zone::bounded(ZoneType::MonsterZone, 2);
        zone.push(InstanceId(1));
        assert_eq!(zone.free_slots(), 1);
        zone.push(InstanceId(2));
        assert!(zone.is_full());
        assert!(zone.remove(InstanceId(1)));
        assert!(!zone.remove(InstanceId(1)));
        assert!(!zone.is_full());
    }

    #[test]
    fn zone_rules() {
        let monster = Zone::bounded(ZoneType::MonsterZone, 5);
        let spell_trap = Zone::bounded(ZoneType::SpellTrapZone, 5);
        let field = Zone::bounded(ZoneType::FieldZone, 1);
        let hand = Zone::new(ZoneType::Hand);

        assert!(monster.accepts(CardType::Monster(MonsterFrame::Effect)));
        assert!(!monster.accepts(CardType::Spell(SpellKind::Normal)));
        assert!(spell_trap.accepts(CardType::Trap(TrapKind::Counter)));
        assert!(spell_trap.accepts(CardType::Monster(MonsterFrame::Pendulum)));
        assert!(!spell_trap.accepts(CardType::Spell(SpellKind::Field)));
        assert!(field.accepts(CardType::Spell(SpellKind::Field)));
        assert!(!hand.accepts(CardType::Monster(MonsterFrame::Xyz)));
    }
}
