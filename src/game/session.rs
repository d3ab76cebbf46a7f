//! session.rs
//!
//! 듀얼 한 판의 수명과 행동 처리. 모든 행동은 `submit_action` 한 곳으로 들어옵니다.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    card::{
        catalog::{CardCatalog, CatalogId},
        types::{CardType, Face, MonsterFrame, PlayerIdentity, PlayerKind, Position, SpellKind},
        InstanceId,
    },
    config::{DeckRules, EngineConfig, RulesConfig, TimingConfig},
    enums::{ZoneType, DIAGNOSTICS_TARGET},
    exception::{GameError, GameplayError, SummonError},
    zone::ZoneRef,
    LogExt,
};

use super::{
    action::{Action, ActionKind, ActionRequest},
    battle::declare_attack,
    chain::{ActivationRequest, ChainContext, ChainEngine, PassOutcome},
    event::GameEvent,
    field::{FieldState, Placement},
    outcome::{DuelResult, EndReason, OutcomeEvent, OutcomeSink},
    phase::Phase,
    snapshot::{project, StateSnapshot, Viewer},
    summon::{commit_summon, validate_summon, SummonMethod, SummonRequest},
    turn::TurnManager,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }
}

/// 카탈로그 id 목록. 메인 덱은 첫 항목이 덱 맨 위입니다.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeckList {
    pub main: Vec<CatalogId>,
    #[serde(default)]
    pub extra: Vec<CatalogId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub identity: PlayerIdentity,
    pub deck: DeckList,
}

/// 한 번의 행동으로 함께 바뀌는 상태 묶음. 행동은 이 값의 사본에서 처리한 뒤 통째로 반영합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelState {
    pub field: FieldState,
    pub turn: TurnManager,
    pub chain: ChainEngine,
    /// 자동 드로우가 꺼져 있을 때, 이번 드로우 페이즈의 드로우가 남아 있는지
    pub pending_draw: bool,
}

/// 저장/복원용 기록.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub status: SessionStatus,
    pub seats: [Option<Seat>; 2],
    pub state: DuelState,
    pub outcome: Option<OutcomeEvent>,
}

#[derive(Debug, Default)]
struct Step {
    events: Vec<GameEvent>,
    conceded: Option<PlayerKind>,
}

pub struct DuelSession {
    id: Uuid,
    config: EngineConfig,
    catalog: Arc<dyn CardCatalog>,
    seats: [Option<Seat>; 2],
    state: DuelState,
    status: SessionStatus,
    outcome: Option<OutcomeEvent>,
    sink: Option<Arc<dyn OutcomeSink>>,
    cancel: Arc<AtomicBool>,
}

impl DuelSession {
    pub fn new(id: Uuid, config: &EngineConfig, catalog: Arc<dyn CardCatalog>) -> Self {
        Self {
            id,
            config: config.clone(),
            catalog,
            seats: [None, None],
            state: DuelState::new(&config.rules),
            status: SessionStatus::Pending,
            outcome: None,
            sink: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_outcome_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn outcome(&self) -> Option<&OutcomeEvent> {
        self.outcome.as_ref()
    }

    pub fn state(&self) -> &DuelState {
        &self.state
    }

    pub fn field(&self) -> &FieldState {
        &self.state.field
    }

    pub fn turn(&self) -> &TurnManager {
        &self.state.turn
    }

    pub fn chain(&self) -> &ChainEngine {
        &self.state.chain
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.config.timing
    }

    /// 중단 요청 플래그. 처리 중이던 행동은 반영 직전에 이 값을 보고 버려집니다.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn seat_of(&self, player_id: Uuid) -> Result<PlayerKind, GameError> {
        self.seats
            .iter()
            .flatten()
            .find(|seat| seat.identity.id == player_id)
            .map(|seat| seat.identity.kind)
            .ok_or_else(|| GameplayError::UnknownPlayer.into())
    }

    pub fn player_id(&self, kind: PlayerKind) -> Result<Uuid, GameError> {
        self.seats[kind.index()]
            .as_ref()
            .map(|seat| seat.identity.id)
            .ok_or_else(|| GameplayError::UnknownPlayer.into())
    }

    /// 좌석에 플레이어와 덱을 등록합니다. 덱은 여기서 검증합니다.
    pub fn bind_player(&mut self, seat: PlayerKind, player_id: Uuid, deck: DeckList) -> Result<(), GameError> {
        if self.status != SessionStatus::Pending {
            return Err(GameplayError::SessionNotActive(self.status).into());
        }
        if self.seats[seat.index()].is_some() || self.seat_of(player_id).is_ok() {
            return Err(GameplayError::SeatTaken.into());
        }
        validate_deck(self.catalog.as_ref(), &self.config.deck, &deck)
            .log_err(|e| warn!("deck of {} rejected: {}", player_id, e))?;
        self.seats[seat.index()] = Some(Seat {
            identity: PlayerIdentity {
                id: player_id,
                kind: seat,
            },
            deck,
        });
        info!("{} seated as {} in session {}", player_id, seat, self.id);
        Ok(())
    }

    /// 덱을 만들고 섞은 뒤 첫 패를 나눠 주고 첫 턴을 시작합니다.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn start(&mut self) -> Result<(), GameError> {
        if self.status != SessionStatus::Pending {
            return Err(GameplayError::SessionNotActive(self.status).into());
        }
        let seats: Vec<Seat> = self.seats.iter().flatten().cloned().collect();
        if seats.len() != 2 {
            return Err(GameplayError::SeatsOpen.into());
        }

        let catalog = self.catalog.as_ref();
        let rules = &self.config.rules;
        let mut state = DuelState::new(rules);
        for seat in &seats {
            let owner = seat.identity.kind;
            // 덱 맨 위가 벡터의 끝이므로 거꾸로 쌓습니다
            for id in seat.deck.main.iter().rev() {
                state
                    .field
                    .create_card(catalog.require(*id)?, owner, ZoneType::Deck)?;
            }
            for id in &seat.deck.extra {
                state
                    .field
                    .create_card(catalog.require(*id)?, owner, ZoneType::ExtraDeck)?;
            }
        }

        if rules.shuffle_decks {
            let mut rng = match rules.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            for player in PlayerKind::BOTH {
                state.field.shuffle_deck(player, &mut rng);
            }
        }
        for player in PlayerKind::BOTH {
            for _ in 0..rules.opening_hand {
                if state.field.draw(player, 0)?.is_none() {
                    warn!("{} deck ran out while dealing the opening hand", player);
                    break;
                }
            }
        }

        let mut events = vec![];
        state.enter_phase(catalog, rules, &mut events)?;
        state.settle(catalog, rules, &mut events)?;
        self.state = state;
        self.status = SessionStatus::Active;
        info!(
            "session {} started: {} to move in {}",
            self.id,
            self.state.turn.current_turn(),
            self.state.turn.phase()
        );
        // 첫 드로우에서 덱이 바닥나면 시작과 동시에 끝납니다
        if let Some((result, reason)) = end_condition(&self.state.field, &events) {
            self.finish(SessionStatus::Completed, result, reason);
        }
        Ok(())
    }

    /// 전송 계층의 요청을 처리합니다.
    pub fn handle(&mut self, request: ActionRequest) -> Result<StateSnapshot, GameError> {
        if request.session_id != self.id {
            return Err(GameplayError::SessionMismatch.into());
        }
        self.submit_action(request.player_id, request.action)
    }

    /// 행동 하나를 처리하고 행동한 플레이어 시점의 스냅샷을 돌려줍니다.
    ///
    /// 거부된 행동은 아무것도 바꾸지 않습니다. 내부 오류가 나면 세션은 `Abandoned` 가 됩니다.
    #[instrument(skip(self, action), fields(session_id = %self.id, action = ?action.kind()))]
    pub fn submit_action(&mut self, player_id: Uuid, action: Action) -> Result<StateSnapshot, GameError> {
        if self.status != SessionStatus::Active {
            return Err(GameplayError::SessionNotActive(self.status).into());
        }
        let actor = self.seat_of(player_id)?;
        if self.cancel.load(Ordering::SeqCst) {
            self.finish(SessionStatus::Abandoned, DuelResult::NoContest, EndReason::Disconnect);
            return Err(GameplayError::ActionDiscarded.into());
        }

        let mut scratch = self.state.clone();
        let step = match scratch.apply(self.catalog.as_ref(), &self.config.rules, actor, &action) {
            Ok(step) => step,
            Err(err) if err.is_fatal() => {
                self.fault(&err);
                return Err(err);
            }
            Err(err) => {
                debug!("{} {:?} rejected: {}", actor, action.kind(), err);
                return Err(err);
            }
        };
        if let Err(err) = scratch.field.verify_integrity() {
            let err = GameError::from(err);
            self.fault(&err);
            return Err(err);
        }
        if self.cancel.load(Ordering::SeqCst) {
            info!("session {} abandoned while {:?} was in flight", self.id, action.kind());
            self.finish(SessionStatus::Abandoned, DuelResult::NoContest, EndReason::Disconnect);
            return Err(GameplayError::ActionDiscarded.into());
        }
        self.state = scratch;

        if let Some(loser) = step.conceded {
            info!("{} conceded", loser);
            self.finish(
                SessionStatus::Completed,
                DuelResult::Win {
                    winner: loser.reverse(),
                },
                EndReason::Concession,
            );
        } else if let Some((result, reason)) = end_condition(&self.state.field, &step.events) {
            self.finish(SessionStatus::Completed, result, reason);
        }
        Ok(self.snapshot(Viewer::Player(actor)))
    }

    /// 응답 윈도우에서 대답을 기다리는 플레이어.
    pub fn awaiting_response(&self) -> Option<PlayerKind> {
        if self.status != SessionStatus::Active {
            return None;
        }
        self.state.chain.priority()
    }

    /// 응답 제한 시간이 지났을 때 우선권을 가진 플레이어 대신 패스합니다.
    pub fn apply_response_timeout(&mut self) -> Result<Option<StateSnapshot>, GameError> {
        let Some(holder) = self.awaiting_response() else {
            return Ok(None);
        };
        let player_id = self.player_id(holder)?;
        info!("response window timed out, {} passes implicitly", holder);
        self.submit_action(player_id, Action::pass()).map(Some)
    }

    /// 세션을 중단합니다. 이미 끝난 세션이면 `false`.
    pub fn abandon(&mut self) -> bool {
        self.cancel.store(true, Ordering::SeqCst);
        if self.status.is_terminal() {
            return false;
        }
        self.finish(SessionStatus::Abandoned, DuelResult::NoContest, EndReason::Disconnect);
        true
    }

    pub fn snapshot(&self, viewer: Viewer) -> StateSnapshot {
        project(
            self.id,
            self.status,
            self.outcome.as_ref().map(|o| o.result),
            &self.state.field,
            &self.state.turn,
            &self.state.chain,
            viewer,
        )
    }

    pub fn snapshot_for(&self, player_id: Uuid) -> Result<StateSnapshot, GameError> {
        Ok(self.snapshot(Viewer::Player(self.seat_of(player_id)?)))
    }

    /// 지금 `player_id` 가 제출해서 받아들여질 행동 목록.
    ///
    /// 융합/싱크로/엑시즈/링크 소환은 소재 조합이 많아 여기서 나열하지 않습니다.
    pub fn legal_actions(&self, player_id: Uuid) -> Result<Vec<Action>, GameError> {
        let actor = self.seat_of(player_id)?;
        if self.status != SessionStatus::Active {
            return Ok(vec![]);
        }
        let catalog = self.catalog.as_ref();
        let rules = &self.config.rules;
        Ok(self
            .state
            .candidate_actions(catalog, actor)
            .into_iter()
            .filter(|action| {
                let mut scratch = self.state.clone();
                scratch.apply(catalog, rules, actor, action).is_ok()
            })
            .collect())
    }

    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id,
            status: self.status,
            seats: self.seats.clone(),
            state: self.state.clone(),
            outcome: self.outcome.clone(),
        }
    }

    /// 기록에서 세션을 되살립니다. 카드 배치가 어긋난 기록은 받지 않습니다.
    pub fn restore(
        record: SessionRecord,
        config: &EngineConfig,
        catalog: Arc<dyn CardCatalog>,
    ) -> Result<Self, GameError> {
        record.state.field.verify_integrity()?;
        for card in record.state.field.cards() {
            catalog.require(card.catalog_id)?;
        }
        info!("session {} restored in {:?}", record.id, record.status);
        Ok(Self {
            id: record.id,
            config: config.clone(),
            catalog,
            seats: record.seats,
            state: record.state,
            status: record.status,
            outcome: record.outcome,
            sink: None,
            cancel: Arc::new(AtomicBool::new(record.status == SessionStatus::Abandoned)),
        })
    }

    fn fault(&mut self, err: &GameError) {
        error!(
            target: DIAGNOSTICS_TARGET,
            session_id = %self.id,
            "internal fault, abandoning session: {}", err
        );
        self.finish(SessionStatus::Abandoned, DuelResult::NoContest, EndReason::InternalFault);
    }

    /// 종료 상태로 옮기고 결과를 한 번만 발행합니다.
    fn finish(&mut self, status: SessionStatus, result: DuelResult, reason: EndReason) {
        if self.outcome.is_some() {
            return;
        }
        self.status = status;
        self.cancel.store(true, Ordering::SeqCst);
        let players = PlayerKind::BOTH.map(|kind| self.player_id(kind).unwrap_or_else(|_| Uuid::nil()));
        let event = OutcomeEvent::new(self.id, result, reason, players, self.state.turn.turn_count());
        info!(
            "session {} ended ({:?}): {:?} on turn {}",
            self.id, reason, result, event.turn_count
        );
        debug!("final field of {}: {:?}", self.id, self.state.field.summary());
        if let Some(sink) = &self.sink {
            sink.publish(event.clone());
        }
        self.outcome = Some(event);
    }
}

/// 라이프 포인트 0 과 덱 아웃을 확인합니다. 둘 다 동시에 지면 무승부.
fn end_condition(field: &FieldState, events: &[GameEvent]) -> Option<(DuelResult, EndReason)> {
    let defeated: Vec<PlayerKind> = PlayerKind::BOTH
        .into_iter()
        .filter(|p| field.player(*p).is_defeated())
        .collect();
    let decked: Vec<PlayerKind> = PlayerKind::BOTH
        .into_iter()
        .filter(|p| events.iter().any(|e| e.deck_out() == Some(*p)))
        .collect();

    let reason = if !defeated.is_empty() {
        EndReason::LifePoints
    } else if !decked.is_empty() {
        EndReason::DeckOut
    } else {
        return None;
    };
    let losers: Vec<PlayerKind> = PlayerKind::BOTH
        .into_iter()
        .filter(|p| defeated.contains(p) || decked.contains(p))
        .collect();
    let result = match losers.as_slice() {
        [loser] => DuelResult::Win {
            winner: loser.reverse(),
        },
        _ => DuelResult::Draw,
    };
    Some((result, reason))
}

fn ends_duel(field: &FieldState, events: &[GameEvent]) -> bool {
    end_condition(field, events).is_some()
}

fn validate_deck(catalog: &dyn CardCatalog, rules: &DeckRules, deck: &DeckList) -> Result<(), GameError> {
    let invalid = |reason: String| -> GameError { GameplayError::InvalidDeck { reason }.into() };

    if deck.main.len() < rules.min_main || deck.main.len() > rules.max_main {
        return Err(invalid(format!(
            "main deck has {} cards, expected {}-{}",
            deck.main.len(),
            rules.min_main,
            rules.max_main
        )));
    }
    if deck.extra.len() > rules.max_extra {
        return Err(invalid(format!(
            "extra deck has {} cards, at most {} allowed",
            deck.extra.len(),
            rules.max_extra
        )));
    }

    let mut copies: BTreeMap<CatalogId, usize> = BTreeMap::new();
    for (id, extra) in deck
        .main
        .iter()
        .map(|id| (id, false))
        .chain(deck.extra.iter().map(|id| (id, true)))
    {
        let def = catalog
            .get_card(*id)
            .ok_or_else(|| invalid(format!("unknown card {}", id)))?;
        if def.card_type.is_extra_deck() != extra {
            return Err(invalid(format!("{} is in the wrong deck", def.name)));
        }
        if rules.banned.contains(id) {
            return Err(invalid(format!("{} is banned", def.name)));
        }
        *copies.entry(*id).or_default() += 1;
    }
    if let Some((id, count)) = copies.iter().find(|(_, count)| **count > rules.max_copies) {
        return Err(invalid(format!(
            "{} copies of card {}, at most {} allowed",
            count, id, rules.max_copies
        )));
    }
    Ok(())
}

impl DuelState {
    pub fn new(rules: &RulesConfig) -> Self {
        Self {
            field: FieldState::new(rules),
            turn: TurnManager::new(PlayerKind::Player1, rules.first_turn_battle),
            chain: ChainEngine::new(rules.trigger_order),
            pending_draw: false,
        }
    }

    fn apply(
        &mut self,
        catalog: &dyn CardCatalog,
        rules: &RulesConfig,
        actor: PlayerKind,
        action: &Action,
    ) -> Result<Step, GameError> {
        let kind = action.kind();
        if !self.turn.may_perform(kind, actor, !self.chain.is_neutral()) {
            return Err(GameplayError::PhaseViolation {
                phase: self.turn.phase(),
                action: kind,
            }
            .into());
        }

        let mut step = Step::default();
        match action {
            Action::Draw => {
                if !self.pending_draw {
                    return Err(GameplayError::PhaseViolation {
                        phase: self.turn.phase(),
                        action: kind,
                    }
                    .into());
                }
                self.pending_draw = false;
                step.events.extend(self.draw_for_turn(actor)?);
                self.settle(catalog, rules, &mut step.events)?;
            }
            Action::NormalSummon {
                card,
                tributes,
                set,
            } => {
                let method = if tributes.is_empty() {
                    SummonMethod::Normal
                } else {
                    SummonMethod::Tribute
                };
                let request = SummonRequest {
                    card: *card,
                    method,
                    materials: tributes.clone(),
                    position: Position::Attack,
                    set: *set,
                };
                self.summon(catalog, actor, &request, &mut step.events)?;
            }
            Action::SpecialSummon {
                card,
                method,
                materials,
                position,
            } => {
                if method.is_normal() {
                    return Err(SummonError::NotSummonable {
                        reason: "use a normal summon".to_string(),
                    }
                    .into());
                }
                let request = SummonRequest {
                    card: *card,
                    method: *method,
                    materials: materials.clone(),
                    position: *position,
                    set: false,
                };
                self.summon(catalog, actor, &request, &mut step.events)?;
            }
            Action::SetCard { card } => self.set_card(actor, *card)?,
            Action::Activate {
                source,
                effect_index,
                targets,
                cost_cards,
            } => {
                let request = ActivationRequest {
                    source: *source,
                    effect_index: *effect_index,
                    targets: targets.clone(),
                    cost_cards: cost_cards.clone(),
                };
                let mut ctx = ChainContext {
                    field: &mut self.field,
                    catalog,
                    turn: &self.turn,
                };
                self.chain.activate(&mut ctx, actor, &request)?;
            }
            Action::Attack { attacker, target } => {
                let (_, events) = declare_attack(&mut self.field, &mut self.turn, actor, *attacker, *target)?;
                self.chain.clear_offers();
                self.raise(catalog, &events)?;
                step.events.extend(events);
            }
            Action::ChangePosition { card } => {
                let events = self.change_position(actor, *card)?;
                self.raise(catalog, &events)?;
                step.events.extend(events);
            }
            Action::Pass { until } => self.pass(catalog, rules, actor, *until, &mut step.events)?,
            Action::Concede => step.conceded = Some(actor),
        }
        Ok(step)
    }

    fn raise(&mut self, catalog: &dyn CardCatalog, events: &[GameEvent]) -> Result<(), GameError> {
        let mut ctx = ChainContext {
            field: &mut self.field,
            catalog,
            turn: &self.turn,
        };
        self.chain.raise(&mut ctx, events)
    }

    fn summon(
        &mut self,
        catalog: &dyn CardCatalog,
        actor: PlayerKind,
        request: &SummonRequest,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let plan = validate_summon(&self.field, catalog, actor, request)?;
        let committed = commit_summon(&mut self.field, &plan, self.turn.turn_count())?;
        self.chain.clear_offers();
        self.raise(catalog, &committed)?;
        events.extend(committed);
        Ok(())
    }

    /// 패의 마법/함정을 뒷면으로 놓습니다. 펜듈럼 몬스터는 스케일로 앞면으로 놓습니다.
    fn set_card(&mut self, actor: PlayerKind, card: InstanceId) -> Result<(), GameError> {
        let hand = ZoneRef::new(actor, ZoneType::Hand);
        let instance = self.field.card(card)?;
        if !self.field.is_in(card, hand) {
            return Err(GameplayError::IllegalZoneTransition {
                reason: format!("{} is not in your hand", card),
            }
            .into());
        }
        let (zone, placement) = match instance.card_type {
            CardType::Spell(SpellKind::Field) => (ZoneType::FieldZone, Placement::set()),
            CardType::Spell(_) | CardType::Trap(_) => (ZoneType::SpellTrapZone, Placement::set()),
            CardType::Monster(MonsterFrame::Pendulum) => {
                (ZoneType::SpellTrapZone, Placement::face_up(Position::Attack))
            }
            CardType::Monster(_) => {
                return Err(GameplayError::IllegalZoneTransition {
                    reason: "monsters are set with a normal summon".to_string(),
                }
                .into())
            }
        };
        self.field
            .move_card(card, hand, ZoneRef::new(actor, zone), Some(placement), self.turn.turn_count())?;
        self.chain.clear_offers();
        info!("{} set {} in {}", actor, card, zone);
        Ok(())
    }

    /// 표시 형식 변경. 뒷면 몬스터는 앞면 공격 표시로 반전 소환됩니다.
    fn change_position(&mut self, actor: PlayerKind, card: InstanceId) -> Result<Vec<GameEvent>, GameError> {
        let illegal = |reason: &str| -> GameError {
            GameplayError::IllegalPositionChange {
                reason: reason.to_string(),
            }
            .into()
        };
        let turn_count = self.turn.turn_count();
        if !self.field.is_in(card, ZoneRef::new(actor, ZoneType::MonsterZone)) {
            return Err(illegal("card is not on your monster zone"));
        }
        let instance = self.field.card_mut(card)?;
        if instance.entered_turn >= turn_count {
            return Err(illegal("monster was placed this turn"));
        }
        if instance.last_position_change_turn == Some(turn_count) {
            return Err(illegal("position already changed this turn"));
        }
        if instance.last_attack_turn == Some(turn_count) {
            return Err(illegal("monster attacked this turn"));
        }
        if instance.card_type == CardType::Monster(MonsterFrame::Link) {
            return Err(illegal("link monsters have no defense position"));
        }

        let mut events = vec![];
        if instance.face == Face::Down {
            instance.face = Face::Up;
            instance.position = Position::Attack;
            events.push(GameEvent::Summoned { card });
        } else {
            instance.position = instance.position.toggle();
        }
        instance.last_position_change_turn = Some(turn_count);
        info!("{} changed {} to {:?}", actor, card, instance.position);
        self.chain.clear_offers();
        Ok(events)
    }

    fn pass(
        &mut self,
        catalog: &dyn CardCatalog,
        rules: &RulesConfig,
        actor: PlayerKind,
        until: Option<Phase>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        if !self.chain.is_neutral() {
            let mut ctx = ChainContext {
                field: &mut self.field,
                catalog,
                turn: &self.turn,
            };
            if let PassOutcome::Resolved(resolution) = self.chain.pass(&mut ctx, actor)? {
                events.extend(resolution.events);
                if !resolution.terminal {
                    self.settle(catalog, rules, events)?;
                }
            }
            return Ok(());
        }

        let violation = GameplayError::PhaseViolation {
            phase: self.turn.phase(),
            action: ActionKind::Pass,
        };
        if !self.turn.is_active(actor) {
            // 상대 턴의 패스는 자신의 임의 유발 제안을 거절하는 것
            if self.chain.decline_offers(actor) {
                return Ok(());
            }
            return Err(violation.into());
        }
        if self.pending_draw {
            return Err(violation.into());
        }

        match until {
            None => self.advance(catalog, rules, events)?,
            Some(target) => {
                if !self.turn.can_reach(target) {
                    return Err(violation.into());
                }
                while self.turn.phase() != target {
                    self.advance(catalog, rules, events)?;
                    if !self.chain.is_neutral() || ends_duel(&self.field, events) {
                        break;
                    }
                }
            }
        }
        self.settle(catalog, rules, events)
    }

    /// 다음 페이즈로 넘어갑니다. 새 턴이면 두 플레이어의 턴 단위 플래그를 초기화합니다.
    fn advance(
        &mut self,
        catalog: &dyn CardCatalog,
        rules: &RulesConfig,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.chain.clear_offers();
        let transition = self.turn.advance_phase();
        if transition.new_turn {
            for player in PlayerKind::BOTH {
                self.field.player_mut(player).reset_turn_flags(rules);
            }
        }
        self.enter_phase(catalog, rules, events)
    }

    fn enter_phase(
        &mut self,
        catalog: &dyn CardCatalog,
        rules: &RulesConfig,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let active = self.turn.current_turn();
        let entered = GameEvent::PhaseEntered {
            phase: self.turn.phase(),
            active,
        };
        events.push(entered);
        match self.turn.phase() {
            Phase::Draw => {
                let first_turn = self.turn.turn_count() == 1;
                if !(rules.skip_first_draw && first_turn) {
                    if rules.auto_draw {
                        events.extend(self.draw_for_turn(active)?);
                    } else {
                        self.pending_draw = true;
                    }
                }
            }
            Phase::Standby => self.raise(catalog, &[entered])?,
            _ => {}
        }
        Ok(())
    }

    fn draw_for_turn(&mut self, player: PlayerKind) -> Result<Vec<GameEvent>, GameError> {
        Ok(match self.field.draw(player, self.turn.turn_count())? {
            Some(card) => vec![GameEvent::Drew { player, card }],
            None => {
                warn!("{} cannot draw: deck out", player);
                vec![GameEvent::DeckOut { player }]
            }
        })
    }

    /// 드로우/스탠바이 페이즈는 할 일이 없으면 곧바로 넘깁니다.
    fn settle(
        &mut self,
        catalog: &dyn CardCatalog,
        rules: &RulesConfig,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        while self.turn.phase().has_mandatory_actions()
            && self.chain.is_neutral()
            && self.chain.offers().is_empty()
            && !self.pending_draw
            && !ends_duel(&self.field, events)
        {
            self.advance(catalog, rules, events)?;
        }
        Ok(())
    }

    /// 검증 전의 후보 행동. 실제로 가능한지는 호출하는 쪽이 사본에 적용해 확인합니다.
    fn candidate_actions(&self, catalog: &dyn CardCatalog, actor: PlayerKind) -> Vec<Action> {
        let field = &self.field;
        let ids = |zone: ZoneType| field.zone(ZoneRef::new(actor, zone)).cards().to_vec();
        let own_monsters = ids(ZoneType::MonsterZone);
        let opposing = field
            .zone(ZoneRef::new(actor.reverse(), ZoneType::MonsterZone))
            .cards()
            .to_vec();

        let mut actions = vec![Action::pass(), Action::Concede, Action::Draw];
        for card in ids(ZoneType::Hand) {
            let Some(def) = field.get(card).and_then(|c| catalog.get_card(c.catalog_id)) else {
                continue;
            };
            if def.card_type.is_monster() {
                let tributes: Vec<InstanceId> = own_monsters
                    .iter()
                    .copied()
                    .take(def.tributes_required())
                    .collect();
                for set in [false, true] {
                    actions.push(Action::NormalSummon {
                        card,
                        tributes: tributes.clone(),
                        set,
                    });
                }
                actions.push(Action::SpecialSummon {
                    card,
                    method: SummonMethod::Pendulum,
                    materials: vec![],
                    position: Position::Attack,
                });
            }
            actions.push(Action::SetCard { card });
        }

        for zone in [
            ZoneType::Hand,
            ZoneType::MonsterZone,
            ZoneType::SpellTrapZone,
            ZoneType::FieldZone,
            ZoneType::Graveyard,
        ] {
            for source in ids(zone) {
                let Some(def) = field.get(source).and_then(|c| catalog.get_card(c.catalog_id)) else {
                    continue;
                };
                for (index, effect) in def.effects.iter().enumerate() {
                    let Some(req) = ChainEngine::auto_request(field, actor, source, index, effect) else {
                        continue;
                    };
                    if self.chain.can_activate(field, catalog, &self.turn, actor, &req) {
                        actions.push(Action::Activate {
                            source,
                            effect_index: index,
                            targets: req.targets,
                            cost_cards: req.cost_cards,
                        });
                    }
                }
            }
        }

        for attacker in &own_monsters {
            actions.push(Action::Attack {
                attacker: *attacker,
                target: None,
            });
            for target in &opposing {
                actions.push(Action::Attack {
                    attacker: *attacker,
                    target: Some(*target),
                });
            }
            actions.push(Action::ChangePosition { card: *attacker });
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{fixture_catalog, ids};

    #[test]
    fn deck_validation_rejects_extra_monster_in_main() {
        let catalog = fixture_catalog();
        let rules = DeckRules {
            min_main: 0,
            ..DeckRules::default()
        };
        let deck = DeckList {
            main: vec![ids::FOOTMAN, ids::CINDER_DRAGON],
            extra: vec![],
        };
        let result = validate_deck(catalog.as_ref(), &rules, &deck);
        assert!(matches!(
            result,
            Err(GameError::Gameplay(GameplayError::InvalidDeck { .. }))
        ));
    }

    #[test]
    fn deck_validation_enforces_copy_limit_and_ban_list() {
        let catalog = fixture_catalog();
        let mut rules = DeckRules {
            min_main: 0,
            ..DeckRules::default()
        };
        let four = DeckList {
            main: vec![ids::FOOTMAN; 4],
            extra: vec![],
        };
        assert!(validate_deck(catalog.as_ref(), &rules, &four).is_err());

        let three = DeckList {
            main: vec![ids::FOOTMAN; 3],
            extra: vec![],
        };
        assert!(validate_deck(catalog.as_ref(), &rules, &three).is_ok());
        rules.banned.push(ids::FOOTMAN);
        assert!(validate_deck(catalog.as_ref(), &rules, &three).is_err());
    }

    #[test]
    fn deck_validation_enforces_main_size() {
        let catalog = fixture_catalog();
        let deck = DeckList {
            main: vec![ids::FOOTMAN; 3],
            extra: vec![],
        };
        let result = validate_deck(catalog.as_ref(), &DeckRules::default(), &deck);
        assert!(matches!(
            result,
            Err(GameError::Gameplay(GameplayError::InvalidDeck { .. }))
        ));
    }

    #[test]
    fn simultaneous_defeat_is_a_draw() {
        let mut field = FieldState::new(&RulesConfig::default());
        field.adjust_life(PlayerKind::Player1, -8000);
        field.adjust_life(PlayerKind::Player2, -9000);
        assert_eq!(
            end_condition(&field, &[]),
            Some((DuelResult::Draw, EndReason::LifePoints))
        );
    }

    #[test]
    fn deck_out_loses() {
        let field = FieldState::new(&RulesConfig::default());
        let events = [GameEvent::DeckOut {
            player: PlayerKind::Player2,
        }];
        assert_eq!(
            end_condition(&field, &events),
            Some((
                DuelResult::Win {
                    winner: PlayerKind::Player1
                },
                EndReason::DeckOut
            ))
        );
    }
}
