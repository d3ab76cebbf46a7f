//! snapshot.rs
//!
//! 전송 계층에 내보내는 읽기 전용 상태 투영. 보는 사람에 따라 비공개 정보를 가립니다.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    card::{
        catalog::CatalogId,
        types::{Face, PlayerKind, Position},
        CardInstance, InstanceId,
    },
    enums::ZoneType,
    zone::ZoneRef,
};

use super::{
    chain::{ChainEngine, ChainState, TriggerOffer},
    field::FieldState,
    outcome::DuelResult,
    phase::Phase,
    session::SessionStatus,
    turn::TurnManager,
};

/// 스냅샷을 요청한 쪽.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Viewer {
    Player(PlayerKind),
    Spectator,
}

impl Viewer {
    fn is(&self, player: PlayerKind) -> bool {
        *self == Viewer::Player(player)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub id: InstanceId,
    /// 보는 사람이 알 수 없는 카드면 `None`
    pub catalog_id: Option<CatalogId>,
    pub face: Face,
    pub position: Position,
    pub attack: Option<i32>,
    pub defense: Option<i32>,
    pub counters: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneView {
    Visible(Vec<CardView>),
    Hidden { count: usize },
}

impl ZoneView {
    pub fn len(&self) -> usize {
        match self {
            ZoneView::Visible(cards) => cards.len(),
            ZoneView::Hidden { count } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub player: PlayerKind,
    pub life_points: u32,
    pub hand: ZoneView,
    pub deck: ZoneView,
    pub extra_deck: ZoneView,
    pub graveyard: ZoneView,
    pub banished: ZoneView,
    pub monster_zone: ZoneView,
    pub spell_trap_zone: ZoneView,
    pub field_zone: ZoneView,
    pub overlay: ZoneView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkView {
    pub position: usize,
    pub source: InstanceId,
    pub catalog_id: CatalogId,
    pub effect_index: usize,
    pub controller: PlayerKind,
    pub targets: Vec<InstanceId>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub session_id: Uuid,
    pub viewer: Viewer,
    pub status: SessionStatus,
    pub turn_count: u32,
    pub phase: Phase,
    pub active_player: PlayerKind,
    pub chain_state: ChainState,
    pub priority: Option<PlayerKind>,
    pub chain: Vec<LinkView>,
    /// 보는 사람 자신의 임의 유발 제안만
    pub offers: Vec<TriggerOffer>,
    pub players: [PlayerView; 2],
    pub result: Option<DuelResult>,
}

/// 비공개 영역을 볼 수 있는지. 패와 엑스트라 덱은 주인만, 덱은 아무도 볼 수 없습니다.
fn zone_visible(zone: ZoneType, owner: PlayerKind, viewer: Viewer) -> bool {
    match zone {
        ZoneType::Deck => false,
        ZoneType::Hand | ZoneType::ExtraDeck => viewer.is(owner),
        _ => true,
    }
}

fn card_view(card: &CardInstance, viewer: Viewer) -> CardView {
    let known = card.is_face_up() || viewer.is(card.owner);
    let stats = card.is_monster() && card.location.zone == ZoneType::MonsterZone && known;
    CardView {
        id: card.id,
        catalog_id: known.then_some(card.catalog_id),
        face: card.face,
        position: card.position,
        attack: stats.then(|| card.attack()),
        defense: stats.then(|| card.defense()),
        counters: card.counters,
    }
}

fn zone_view(field: &FieldState, zone: ZoneRef, viewer: Viewer) -> ZoneView {
    let cards = field.zone(zone).cards();
    if !zone_visible(zone.zone, zone.owner, viewer) {
        return ZoneView::Hidden { count: cards.len() };
    }
    ZoneView::Visible(
        cards
            .iter()
            .filter_map(|id| field.get(*id))
            .map(|card| card_view(card, viewer))
            .collect(),
    )
}

fn player_view(field: &FieldState, player: PlayerKind, viewer: Viewer) -> PlayerView {
    let view = |zone| zone_view(field, ZoneRef::new(player, zone), viewer);
    PlayerView {
        player,
        life_points: field.player(player).life_points(),
        hand: view(ZoneType::Hand),
        deck: view(ZoneType::Deck),
        extra_deck: view(ZoneType::ExtraDeck),
        graveyard: view(ZoneType::Graveyard),
        banished: view(ZoneType::Banished),
        monster_zone: view(ZoneType::MonsterZone),
        spell_trap_zone: view(ZoneType::SpellTrapZone),
        field_zone: view(ZoneType::FieldZone),
        overlay: view(ZoneType::Overlay),
    }
}

/// 상태를 바꾸지 않고 `viewer` 시점의 스냅샷을 만듭니다.
/// 같은 상태에서 두 번 부르면 같은 값이 나옵니다.
pub fn project(
    session_id: Uuid,
    status: SessionStatus,
    result: Option<DuelResult>,
    field: &FieldState,
    turn: &TurnManager,
    chain: &ChainEngine,
    viewer: Viewer,
) -> StateSnapshot {
    StateSnapshot {
        session_id,
        viewer,
        status,
        turn_count: turn.turn_count(),
        phase: turn.phase(),
        active_player: turn.current_turn(),
        chain_state: chain.state(),
        priority: chain.priority(),
        chain: chain
            .links()
            .iter()
            .map(|link| LinkView {
                position: link.position,
                source: link.source,
                catalog_id: link.catalog_id,
                effect_index: link.effect_index,
                controller: link.controller,
                targets: link.targets.iter().map(|t| t.card).collect(),
                negated: link.negated,
            })
            .collect(),
        offers: chain
            .offers()
            .iter()
            .filter(|offer| viewer.is(offer.controller))
            .copied()
            .collect(),
        players: PlayerKind::BOTH.map(|player| player_view(field, player, viewer)),
        result,
    }
}
