use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    card::{
        catalog::CardDefinition,
        types::{Face, PlayerKind, Position},
        CardInstance, InstanceId,
    },
    config::RulesConfig,
    enums::ZoneType,
    exception::{GameplayError, InternalError},
    player::PlayerState,
    zone::{Zone, ZoneRef},
};

use super::event::GameEvent;

/// 카드가 새 영역에 놓일 때의 표시 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub face: Face,
    pub position: Position,
}

impl Placement {
    pub fn face_up(position: Position) -> Self {
        Self {
            face: Face::Up,
            position,
        }
    }

    pub fn set() -> Self {
        Self {
            face: Face::Down,
            position: Position::Defense,
        }
    }

    fn default_for(zone: ZoneType) -> Self {
        let face = if zone.is_hidden() { Face::Down } else { Face::Up };
        Self {
            face,
            position: Position::Attack,
        }
    }
}

/// 영역별 카드 수 요약.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player: PlayerKind,
    pub life_points: u32,
    pub hand: usize,
    pub deck: usize,
    pub extra_deck: usize,
    pub graveyard: usize,
    pub banished: usize,
    pub monsters: usize,
    pub spell_traps: usize,
    pub field_spell: bool,
}

/// 듀얼의 모든 카드 인스턴스(아레나)와 두 플레이어의 영역.
///
/// 카드는 반드시 한 영역에만 존재합니다. 이동은 `move_card` 하나로만 이루어지고,
/// 규칙 위반이면 아무것도 바꾸지 않고 `IllegalZoneTransition` 을 돌려줍니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    cards: Vec<CardInstance>,
    players: [PlayerState; 2],
}

impl FieldState {
    pub fn new(rules: &RulesConfig) -> Self {
        Self {
            cards: vec![],
            players: [
                PlayerState::new(PlayerKind::Player1, rules),
                PlayerState::new(PlayerKind::Player2, rules),
            ],
        }
    }

    /// 듀얼 준비 단계에서 덱/엑스트라 덱에 카드를 만들어 넣습니다.
    pub fn create_card(
        &mut self,
        def: &CardDefinition,
        owner: PlayerKind,
        zone: ZoneType,
    ) -> Result<InstanceId, GameplayError> {
        let location = ZoneRef::new(owner, zone);
        if !self.zone(location).accepts(def.card_type) {
            return Err(GameplayError::IllegalZoneTransition {
                reason: format!("{} cannot start in {}", def.name, zone),
            });
        }
        let id = InstanceId(self.cards.len() as u32);
        self.cards
            .push(CardInstance::new(id, def, owner, location));
        self.player_mut(owner).zones.get_mut(zone).push(id);
        Ok(id)
    }

    pub fn get(&self, id: InstanceId) -> Option<&CardInstance> {
        self.cards.get(id.0 as usize)
    }

    pub fn card(&self, id: InstanceId) -> Result<&CardInstance, GameplayError> {
        self.get(id).ok_or(GameplayError::UnknownCard(id))
    }

    pub(crate) fn card_mut(&mut self, id: InstanceId) -> Result<&mut CardInstance, GameplayError> {
        self.cards
            .get_mut(id.0 as usize)
            .ok_or(GameplayError::UnknownCard(id))
    }

    pub fn cards(&self) -> impl Iterator<Item = &CardInstance> {
        self.cards.iter()
    }

    pub fn player(&self, kind: PlayerKind) -> &PlayerState {
        &self.players[kind.index()]
    }

    pub fn player_mut(&mut self, kind: PlayerKind) -> &mut PlayerState {
        &mut self.players[kind.index()]
    }

    pub fn zone(&self, zone: ZoneRef) -> &Zone {
        self.player(zone.owner).zones.get(zone.zone)
    }

    pub fn location(&self, id: InstanceId) -> Option<ZoneRef> {
        self.get(id).map(|card| card.location)
    }

    pub fn is_in(&self, id: InstanceId, zone: ZoneRef) -> bool {
        self.location(id) == Some(zone) && self.zone(zone).contains(id)
    }

    /// 엑시즈 몬스터에 붙어 있는 소재들.
    pub fn overlay_of(&self, id: InstanceId) -> Vec<InstanceId> {
        self.cards
            .iter()
            .filter(|card| card.attached_to == Some(id))
            .map(|card| card.id)
            .collect()
    }

    pub fn move_card(
        &mut self,
        id: InstanceId,
        from: ZoneRef,
        to: ZoneRef,
        placement: Option<Placement>,
        turn: u32,
    ) -> Result<(), GameplayError> {
        let card = self.card(id)?;
        if !self.is_in(id, from) {
            return Err(GameplayError::IllegalZoneTransition {
                reason: format!("{} is not in {}", id, from),
            });
        }
        if from == to {
            return Err(GameplayError::IllegalZoneTransition {
                reason: format!("{} is already in {}", id, to),
            });
        }
        if to.owner != card.owner {
            return Err(GameplayError::IllegalZoneTransition {
                reason: format!("{} belongs to {}, not {}", id, card.owner, to.owner),
            });
        }
        let dest = self.zone(to);
        if !dest.accepts(card.card_type) {
            return Err(GameplayError::IllegalZoneTransition {
                reason: format!("{} cannot be placed in {}", card.card_type, to.zone),
            });
        }
        if dest.is_full() {
            return Err(GameplayError::IllegalZoneTransition {
                reason: format!("{} is full", to),
            });
        }

        self.player_mut(from.owner).zones.get_mut(from.zone).remove(id);
        self.player_mut(to.owner).zones.get_mut(to.zone).push(id);

        let placement = placement.unwrap_or_else(|| Placement::default_for(to.zone));
        let leaves_field = from.zone.is_on_field() && !to.zone.is_on_field();
        let card = self.card_mut(id)?;
        card.location = to;
        card.face = placement.face;
        card.position = placement.position;
        card.entered_turn = turn;
        if to.zone != ZoneType::Overlay {
            card.attached_to = None;
        }
        if leaves_field {
            card.reset_to_base();
        }
        debug!("{} moved {} -> {}", id, from, to);

        // 필드를 떠난 엑시즈 몬스터의 소재는 묘지로 갑니다.
        if leaves_field && from.zone == ZoneType::MonsterZone {
            for material in self.overlay_of(id) {
                let owner = self.card(material)?.owner;
                self.move_card(
                    material,
                    ZoneRef::new(owner, ZoneType::Overlay),
                    ZoneRef::new(owner, ZoneType::Graveyard),
                    None,
                    turn,
                )?;
            }
        }
        Ok(())
    }

    /// 현재 위치에서 주인의 묘지로 보냅니다.
    pub fn send_to_graveyard(&mut self, id: InstanceId, turn: u32) -> Result<Vec<GameEvent>, GameplayError> {
        let card = self.card(id)?;
        let (from, owner) = (card.location, card.owner);
        let materials = self.materials_leaving_with(id, from);
        self.move_card(id, from, ZoneRef::new(owner, ZoneType::Graveyard), None, turn)?;
        let mut events = vec![GameEvent::SentToGraveyard { card: id }];
        events.extend(materials);
        Ok(events)
    }

    /// 몬스터 존을 떠나는 엑시즈 몬스터와 함께 묘지로 가는 소재들의 사건.
    fn materials_leaving_with(&self, id: InstanceId, from: ZoneRef) -> Vec<GameEvent> {
        if from.zone != ZoneType::MonsterZone {
            return vec![];
        }
        self.overlay_of(id)
            .into_iter()
            .map(|card| GameEvent::SentToGraveyard { card })
            .collect()
    }

    pub fn destroy(&mut self, id: InstanceId, by_battle: bool, turn: u32) -> Result<Vec<GameEvent>, GameplayError> {
        let mut events = vec![GameEvent::Destroyed { card: id, by_battle }];
        events.extend(self.send_to_graveyard(id, turn)?);
        info!("{} destroyed (battle: {})", id, by_battle);
        Ok(events)
    }

    pub fn banish(&mut self, id: InstanceId, turn: u32) -> Result<Vec<GameEvent>, GameplayError> {
        let card = self.card(id)?;
        let (from, owner) = (card.location, card.owner);
        let materials = self.materials_leaving_with(id, from);
        self.move_card(id, from, ZoneRef::new(owner, ZoneType::Banished), None, turn)?;
        let mut events = vec![GameEvent::Banished { card: id }];
        events.extend(materials);
        Ok(events)
    }

    /// 라이프 포인트를 조정합니다. 0 에서 멈추고, 패배 여부를 돌려줍니다.
    pub fn adjust_life(&mut self, player: PlayerKind, delta: i64) -> bool {
        let defeated = self.player_mut(player).adjust_life(delta);
        info!(
            "{} life points {:+} -> {}",
            player,
            delta,
            self.player(player).life_points()
        );
        defeated
    }

    /// 덱 맨 위 카드를 패로 가져옵니다. 덱이 비어 있으면 `None`.
    pub fn draw(&mut self, player: PlayerKind, turn: u32) -> Result<Option<InstanceId>, GameplayError> {
        let Some(top) = self.player(player).zones.deck.top() else {
            return Ok(None);
        };
        self.move_card(
            top,
            ZoneRef::new(player, ZoneType::Deck),
            ZoneRef::new(player, ZoneType::Hand),
            None,
            turn,
        )?;
        Ok(Some(top))
    }

    pub fn shuffle_deck(&mut self, player: PlayerKind, rng: &mut impl Rng) {
        self.player_mut(player)
            .zones
            .deck
            .cards_mut()
            .shuffle(rng);
    }

    /// 모든 인스턴스가 정확히 한 영역에 있는지 검사합니다.
    pub fn verify_integrity(&self) -> Result<(), InternalError> {
        let mut seen = vec![0usize; self.cards.len()];
        for player in &self.players {
            for zone in ZoneType::ALL {
                for id in player.zones.get(zone).cards() {
                    let slot = seen
                        .get_mut(id.0 as usize)
                        .ok_or(InternalError::DanglingInstance(*id))?;
                    *slot += 1;
                    if *slot > 1 {
                        return Err(InternalError::DuplicateInstance(*id));
                    }
                }
            }
        }
        for card in &self.cards {
            if seen[card.id.0 as usize] != 1 || !self.zone(card.location).contains(card.id) {
                return Err(InternalError::DanglingInstance(card.id));
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> [PlayerSummary; 2] {
        PlayerKind::BOTH.map(|kind| {
            let player = self.player(kind);
            let zones = &player.zones;
            PlayerSummary {
                player: kind,
                life_points: player.life_points(),
                hand: zones.hand.len(),
                deck: zones.deck.len(),
                extra_deck: zones.extra_deck.len(),
                graveyard: zones.graveyard.len(),
                banished: zones.banished.len(),
                monsters: zones.monster.len(),
                spell_traps: zones.spell_trap.len(),
                field_spell: !zones.field.is_empty(),
            }
        })
    }
}
