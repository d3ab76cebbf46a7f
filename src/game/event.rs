use serde::{Deserialize, Serialize};

use crate::{
    card::{types::PlayerKind, InstanceId},
    effect::types::TriggerEvent,
};

use super::phase::Phase;

/// 상태 변화 중에 발생하는 사건. 유발 효과는 이 사건들을 보고 깨어납니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Summoned { card: InstanceId },
    Destroyed { card: InstanceId, by_battle: bool },
    SentToGraveyard { card: InstanceId },
    Banished { card: InstanceId },
    Drew { player: PlayerKind, card: InstanceId },
    DeckOut { player: PlayerKind },
    LifeChanged { player: PlayerKind, life_points: u32 },
    PhaseEntered { phase: Phase, active: PlayerKind },
}

impl GameEvent {
    /// 이 사건이 깨우는 유발 조건과, 특정 카드에 한정되면 그 카드.
    pub fn trigger(&self) -> Option<(TriggerEvent, Option<InstanceId>)> {
        match *self {
            GameEvent::Summoned { card } => Some((TriggerEvent::Summoned, Some(card))),
            GameEvent::Destroyed { card, .. } => Some((TriggerEvent::Destroyed, Some(card))),
            GameEvent::SentToGraveyard { card } => Some((TriggerEvent::SentToGraveyard, Some(card))),
            GameEvent::PhaseEntered {
                phase: Phase::Standby,
                ..
            } => Some((TriggerEvent::StandbyPhase, None)),
            _ => None,
        }
    }

    pub fn deck_out(&self) -> Option<PlayerKind> {
        match *self {
            GameEvent::DeckOut { player } => Some(player),
            _ => None,
        }
    }
}
