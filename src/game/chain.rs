use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    card::{
        catalog::{CardCatalog, CardDefinition, CatalogId},
        types::{CardType, PlayerKind, Position, SpellKind},
        CardInstance, InstanceId,
    },
    config::TriggerOrder,
    effect::{
        handler::apply_effect,
        types::{Cost, EffectAction, EffectKind, EffectSpeed, Frequency, TargetSide, TargetSpec},
        EffectDefinition, EffectKey,
    },
    enums::ZoneType,
    exception::{ActivationError, GameError, GameplayError, InternalError},
    zone::ZoneRef,
};

use super::{
    action::ActionKind,
    event::GameEvent,
    field::{FieldState, Placement},
    turn::TurnManager,
};

// 체인 처리 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainState {
    Neutral,   // 체인 없음
    Open,      // 응답 대기 중 (링크 추가 가능)
    Resolving, // 역순 처리 중
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub card: InstanceId,
    /// 발동 시점의 위치. 처리 시 여기를 벗어났으면 불발입니다.
    pub zone: ZoneRef,
}

// 체인 링크 (효과와 발동 카드 연결)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    /// 1 부터 시작하는 체인 번호
    pub position: usize,
    pub source: InstanceId,
    pub catalog_id: CatalogId,
    pub effect_index: usize,
    pub controller: PlayerKind,
    pub speed: EffectSpeed,
    pub source_zone: ZoneRef,
    pub targets: Vec<LinkTarget>,
    /// 패/세트 상태에서 카드 자체를 발동했는지. 처리 후 일반 마법/함정은 묘지로 갑니다.
    pub card_activation: bool,
    pub negated: bool,
    /// 무효로 할 링크 번호
    pub negates: Option<usize>,
}

/// 임의 유발 효과가 발동을 기다리는 중.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerOffer {
    pub source: InstanceId,
    pub effect_index: usize,
    pub controller: PlayerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PendingTrigger {
    source: InstanceId,
    effect_index: usize,
    controller: PlayerKind,
    mandatory: bool,
    speed: EffectSpeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkOutcome {
    Applied,
    Fizzled,
    Negated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLink {
    pub position: usize,
    pub source: InstanceId,
    pub effect_index: usize,
    pub outcome: LinkOutcome,
}

/// 체인 하나가 끝까지 처리된 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// 처리된 순서대로
    pub resolved: Vec<ResolvedLink>,
    pub events: Vec<GameEvent>,
    /// 처리 도중 듀얼이 끝났는지
    pub terminal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Waiting { priority: PlayerKind },
    Resolved(Resolution),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub source: InstanceId,
    pub effect_index: usize,
    pub targets: Vec<InstanceId>,
    pub cost_cards: Vec<InstanceId>,
}

/// 체인 엔진이 한 번의 호출 동안 빌려 쓰는 듀얼 상태.
pub struct ChainContext<'a> {
    pub field: &'a mut FieldState,
    pub catalog: &'a dyn CardCatalog,
    pub turn: &'a TurnManager,
}

/// 체인(LIFO 스택)과 응답 윈도우, 유발 효과 대기열을 관리합니다.
///
/// 링크가 쌓이면 상대에게 우선권이 넘어가고, 두 플레이어가 연속으로 패스하면
/// 맨 위 링크부터 역순으로 처리합니다. 발동 검증은 모두 링크를 쌓기 전에 끝나므로
/// 한 번 쌓인 링크의 처리는 실패하지 않습니다(불발은 오류가 아닙니다).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEngine {
    state: ChainState,
    links: Vec<ChainLink>,
    passed: [bool; 2],
    priority: PlayerKind,
    offers: Vec<TriggerOffer>,
    pending: Vec<PendingTrigger>,
    last_resolution: Vec<ResolvedLink>,
    order: TriggerOrder,
}

impl ChainEngine {
    pub fn new(order: TriggerOrder) -> Self {
        Self {
            state: ChainState::Neutral,
            links: vec![],
            passed: [false; 2],
            priority: PlayerKind::Player1,
            offers: vec![],
            pending: vec![],
            last_resolution: vec![],
            order,
        }
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn is_neutral(&self) -> bool {
        self.state == ChainState::Neutral
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn depth(&self) -> usize {
        self.links.len()
    }

    /// 응답 윈도우에서 행동할 차례인 플레이어. 체인이 열려 있을 때만 의미가 있습니다.
    pub fn priority(&self) -> Option<PlayerKind> {
        (self.state == ChainState::Open).then_some(self.priority)
    }

    pub fn offers(&self) -> &[TriggerOffer] {
        &self.offers
    }

    pub fn last_resolution(&self) -> &[ResolvedLink] {
        &self.last_resolution
    }

    pub fn clear_offers(&mut self) {
        self.offers.clear();
    }

    pub fn decline_offers(&mut self, player: PlayerKind) -> bool {
        let before = self.offers.len();
        self.offers.retain(|offer| offer.controller != player);
        before != self.offers.len()
    }

    /// 효과를 발동해 체인에 링크를 쌓습니다.
    ///
    /// 검증과 코스트 지불은 필드 사본에서 이루어지고, 전부 성공했을 때만 반영됩니다.
    pub fn activate(
        &mut self,
        ctx: &mut ChainContext<'_>,
        actor: PlayerKind,
        req: &ActivationRequest,
    ) -> Result<(), GameError> {
        if self.state == ChainState::Resolving {
            return Err(ActivationError::ChainResolving.into());
        }
        if self.state == ChainState::Open && actor != self.priority {
            return Err(GameplayError::NotPriorityHolder.into());
        }

        let catalog = ctx.catalog;
        let source = ctx.field.card(req.source)?.clone();
        if source.owner != actor {
            return Err(ActivationError::NotOwner(source.id).into());
        }
        let def = catalog.require(source.catalog_id)?;
        let effect = def
            .effect(req.effect_index)
            .ok_or(ActivationError::UnknownEffect {
                catalog_id: def.id,
                index: req.effect_index,
            })?;

        self.check_timing(ctx.turn, actor, &source, def, effect, req.effect_index)?;

        let key = EffectKey {
            catalog_id: def.id,
            index: req.effect_index,
        };
        let player = ctx.field.player(actor);
        match effect.frequency {
            Frequency::OncePerTurn if player.once_per_turn.contains(&key) => {
                return Err(ActivationError::AlreadyUsedThisTurn.into())
            }
            Frequency::OncePerDuel if player.once_per_duel.contains(&key) => {
                return Err(ActivationError::AlreadyUsedThisDuel.into())
            }
            _ => {}
        }

        let mut scratch = ctx.field.clone();
        let turn_count = ctx.turn.turn_count();
        let card_activation = place_activated_card(&mut scratch, &source, def, effect, turn_count)?;
        let targets = validate_targets(&scratch, actor, effect, &req.targets)?;
        let cost_events = pay_costs(&mut scratch, actor, &source, effect, &req.cost_cards, turn_count)?;
        mark_frequency(&mut scratch, actor, effect.frequency, key);
        let source_zone = scratch.card(source.id)?.location;
        *ctx.field = scratch;

        if matches!(effect.kind, EffectKind::Trigger { .. }) {
            self.offers
                .retain(|o| !(o.source == source.id && o.effect_index == req.effect_index));
        }
        self.push_link(ChainLink {
            position: self.links.len() + 1,
            source: source.id,
            catalog_id: def.id,
            effect_index: req.effect_index,
            controller: actor,
            speed: effect.speed,
            source_zone,
            targets,
            card_activation,
            negated: false,
            negates: None,
        }, effect);
        self.state = ChainState::Open;
        self.passed = [false; 2];
        self.priority = actor.reverse();
        info!(
            "chain link {} opened by {}: {} effect {} ({:?})",
            self.links.len(),
            actor,
            def.name,
            req.effect_index,
            effect.speed
        );

        self.raise(ctx, &cost_events)
    }

    /// 실제로 바꾸지 않고 발동 가능한지만 확인합니다.
    pub fn can_activate(
        &self,
        field: &FieldState,
        catalog: &dyn CardCatalog,
        turn: &TurnManager,
        actor: PlayerKind,
        req: &ActivationRequest,
    ) -> bool {
        let mut field = field.clone();
        let mut engine = self.clone();
        let mut ctx = ChainContext {
            field: &mut field,
            catalog,
            turn,
        };
        engine.activate(&mut ctx, actor, req).is_ok()
    }

    /// 대상을 자동으로 골라 발동 요청을 만듭니다. 대상이 부족하면 `None`.
    pub fn auto_request(
        field: &FieldState,
        controller: PlayerKind,
        source: InstanceId,
        effect_index: usize,
        effect: &EffectDefinition,
    ) -> Option<ActivationRequest> {
        let targets = match effect.target {
            Some(spec) => auto_targets(field, controller, spec)?,
            None => vec![],
        };
        Some(ActivationRequest {
            source,
            effect_index,
            targets,
            cost_cards: vec![],
        })
    }

    /// 우선권을 가진 플레이어가 패스합니다. 두 플레이어가 연속으로 패스하면 체인을 처리합니다.
    pub fn pass(&mut self, ctx: &mut ChainContext<'_>, actor: PlayerKind) -> Result<PassOutcome, GameError> {
        if self.state != ChainState::Open {
            return Err(GameplayError::PhaseViolation {
                phase: ctx.turn.phase(),
                action: ActionKind::Pass,
            }
            .into());
        }
        if actor != self.priority {
            return Err(GameplayError::NotPriorityHolder.into());
        }
        self.passed[actor.index()] = true;
        self.priority = actor.reverse();
        debug!("{} passed on chain of {}", actor, self.links.len());

        if self.passed.iter().all(|p| *p) {
            return Ok(PassOutcome::Resolved(self.resolve(ctx)?));
        }
        Ok(PassOutcome::Waiting {
            priority: self.priority,
        })
    }

    /// 소환, 전투, 페이즈 진입 등에서 생긴 사건을 받아 유발 효과를 깨웁니다.
    ///
    /// 강제 유발은 체인이 비어 있으면 곧바로 새 체인을 만들고, 아니면 현재 체인이 끝난 뒤로 미룹니다.
    /// 임의 유발은 발동 제안(`offers`)으로만 남습니다.
    pub fn raise(&mut self, ctx: &mut ChainContext<'_>, events: &[GameEvent]) -> Result<(), GameError> {
        let triggers = self.collect_triggers(ctx.field, ctx.catalog, ctx.turn, events)?;
        self.absorb_triggers(ctx, triggers)?;
        if self.state == ChainState::Neutral && !self.pending.is_empty() {
            self.open_pending_chain(ctx)?;
        }
        Ok(())
    }

    fn check_timing(
        &self,
        turn: &TurnManager,
        actor: PlayerKind,
        source: &CardInstance,
        def: &CardDefinition,
        effect: &EffectDefinition,
        effect_index: usize,
    ) -> Result<(), ActivationError> {
        // 스피드 검사: 열린 체인 위에는 같거나 빠른 스피드만, 스피드 1 은 불가
        if self.state == ChainState::Open {
            if let Some(top) = self.links.last() {
                if !effect.speed.can_it_chain(top.speed) {
                    return Err(ActivationError::SpeedTooSlow {
                        chain: top.speed,
                        effect: effect.speed,
                    });
                }
            }
        }

        let is_trigger = matches!(effect.kind, EffectKind::Trigger { .. });
        if is_trigger {
            let offered = self.offers.iter().any(|o| {
                o.source == source.id && o.effect_index == effect_index && o.controller == actor
            });
            if !offered {
                return Err(ActivationError::NoTriggerOffer);
            }
            return Ok(());
        }

        let own_main = turn.is_active(actor) && turn.phase().is_main();
        if (effect.kind == EffectKind::Ignition || effect.speed == EffectSpeed::Normal)
            && (self.state != ChainState::Neutral || !own_main)
        {
            return Err(ActivationError::WrongTiming);
        }
        if matches!(effect.action, EffectAction::Negate { .. }) && self.state != ChainState::Open {
            return Err(ActivationError::WrongTiming);
        }

        let zone = source.location.zone;
        if let Some(location) = effect.location {
            if zone != location {
                return Err(ActivationError::WrongLocation(zone));
            }
            return Ok(());
        }
        match def.card_type {
            CardType::Spell(kind) => {
                let allowed = match kind {
                    SpellKind::Field => matches!(zone, ZoneType::Hand | ZoneType::FieldZone),
                    _ => matches!(zone, ZoneType::Hand | ZoneType::SpellTrapZone),
                };
                if !allowed {
                    return Err(ActivationError::WrongLocation(zone));
                }
                if kind == SpellKind::QuickPlay {
                    if zone == ZoneType::Hand && !turn.is_active(actor) {
                        return Err(ActivationError::WrongTiming);
                    }
                    if zone == ZoneType::SpellTrapZone
                        && !source.is_face_up()
                        && source.entered_turn >= turn.turn_count()
                    {
                        return Err(ActivationError::SetThisTurn);
                    }
                }
            }
            CardType::Trap(_) => {
                if zone != ZoneType::SpellTrapZone {
                    return Err(ActivationError::WrongLocation(zone));
                }
                if !source.is_face_up() && source.entered_turn >= turn.turn_count() {
                    return Err(ActivationError::SetThisTurn);
                }
            }
            CardType::Monster(_) => {
                if zone != ZoneType::MonsterZone || !source.is_face_up() {
                    return Err(ActivationError::WrongLocation(zone));
                }
            }
        }
        Ok(())
    }

    fn push_link(&mut self, mut link: ChainLink, effect: &EffectDefinition) {
        if matches!(effect.action, EffectAction::Negate { .. }) {
            link.negates = self.links.last().map(|l| l.position);
        }
        self.links.push(link);
    }

    fn collect_triggers(
        &self,
        field: &FieldState,
        catalog: &dyn CardCatalog,
        turn: &TurnManager,
        events: &[GameEvent],
    ) -> Result<Vec<PendingTrigger>, InternalError> {
        let mut triggers = vec![];
        for event in events {
            let Some((kind, card)) = event.trigger() else {
                continue;
            };
            let candidates = match card {
                Some(card) => vec![card],
                None => on_field_face_up(field, turn.current_turn()),
            };
            for id in candidates {
                let Some(instance) = field.get(id) else {
                    continue;
                };
                let def = catalog.require(instance.catalog_id)?;
                for (idx, effect) in def.effects.iter().enumerate() {
                    if effect.trigger_event() == Some(kind) {
                        triggers.push(PendingTrigger {
                            source: id,
                            effect_index: idx,
                            controller: instance.owner,
                            mandatory: effect.mandatory,
                            speed: effect.speed,
                        });
                    }
                }
            }
        }
        if self.order == TriggerOrder::TurnPlayerFirst {
            let active = turn.current_turn();
            triggers.sort_by_key(|t| t.controller != active);
        }
        Ok(triggers)
    }

    fn absorb_triggers(&mut self, ctx: &mut ChainContext<'_>, triggers: Vec<PendingTrigger>) -> Result<(), GameError> {
        for trigger in triggers {
            if !trigger.mandatory {
                debug!("optional trigger offered: {} effect {}", trigger.source, trigger.effect_index);
                self.offers.push(TriggerOffer {
                    source: trigger.source,
                    effect_index: trigger.effect_index,
                    controller: trigger.controller,
                });
            } else if self.state == ChainState::Resolving && trigger.speed >= EffectSpeed::Quick {
                // 스피드 2 이상의 강제 유발은 처리 중인 체인 위에 바로 올라갑니다
                self.push_trigger(ctx, trigger)?;
            } else {
                self.pending.push(trigger);
            }
        }
        Ok(())
    }

    /// 강제 유발을 자동으로 링크로 만듭니다. 대상이나 코스트가 안 되면 건너뜁니다.
    fn push_trigger(&mut self, ctx: &mut ChainContext<'_>, trigger: PendingTrigger) -> Result<(), GameError> {
        let catalog = ctx.catalog;
        let source = ctx.field.card(trigger.source)?.clone();
        let def = catalog.require(source.catalog_id)?;
        let effect = def
            .effect(trigger.effect_index)
            .ok_or(InternalError::UndefinedEffect {
                catalog_id: def.id,
                index: trigger.effect_index,
            })?;
        let key = EffectKey {
            catalog_id: def.id,
            index: trigger.effect_index,
        };
        let player = ctx.field.player(trigger.controller);
        let used = match effect.frequency {
            Frequency::OncePerTurn => player.once_per_turn.contains(&key),
            Frequency::OncePerDuel => player.once_per_duel.contains(&key),
            Frequency::Unlimited => false,
        };
        if used {
            debug!("mandatory trigger of {} already used", def.name);
            return Ok(());
        }
        let Some(req) = Self::auto_request(ctx.field, trigger.controller, source.id, trigger.effect_index, effect) else {
            warn!("mandatory trigger of {} has no legal target, skipped", def.name);
            return Ok(());
        };

        let turn_count = ctx.turn.turn_count();
        let mut scratch = ctx.field.clone();
        let targets = match validate_targets(&scratch, trigger.controller, effect, &req.targets) {
            Ok(targets) => targets,
            Err(err) => {
                warn!("mandatory trigger of {} skipped: {}", def.name, err);
                return Ok(());
            }
        };
        if let Err(err) = pay_costs(&mut scratch, trigger.controller, &source, effect, &[], turn_count) {
            warn!("mandatory trigger of {} skipped: {}", def.name, err);
            return Ok(());
        }
        mark_frequency(&mut scratch, trigger.controller, effect.frequency, key);
        let source_zone = scratch.card(source.id)?.location;
        *ctx.field = scratch;

        self.push_link(ChainLink {
            position: self.links.len() + 1,
            source: source.id,
            catalog_id: def.id,
            effect_index: trigger.effect_index,
            controller: trigger.controller,
            speed: effect.speed,
            source_zone,
            targets,
            card_activation: false,
            negated: false,
            negates: None,
        }, effect);
        info!(
            "mandatory trigger of {} added as chain link {}",
            def.name,
            self.links.len()
        );
        Ok(())
    }

    /// 대기 중인 강제 유발로 새 체인을 만듭니다. 우선권은 턴 플레이어부터.
    fn open_pending_chain(&mut self, ctx: &mut ChainContext<'_>) -> Result<(), GameError> {
        let pending = std::mem::take(&mut self.pending);
        for trigger in pending {
            self.push_trigger(ctx, trigger)?;
        }
        if !self.links.is_empty() {
            self.state = ChainState::Open;
            self.passed = [false; 2];
            self.priority = ctx.turn.current_turn();
        }
        Ok(())
    }

    fn resolve(&mut self, ctx: &mut ChainContext<'_>) -> Result<Resolution, GameError> {
        self.state = ChainState::Resolving;
        self.passed = [false; 2];
        let mut resolution = Resolution::default();
        let turn_count = ctx.turn.turn_count();

        while let Some(link) = self.links.pop() {
            let mut events = vec![];
            let outcome = self.resolve_link(ctx, &link, &mut events)?;
            resolution.resolved.push(ResolvedLink {
                position: link.position,
                source: link.source,
                effect_index: link.effect_index,
                outcome,
            });

            // 발동을 마친 일반 마법/함정은 묘지로
            if link.card_activation {
                if let Some(card) = ctx.field.get(link.source) {
                    if card.card_type.leaves_after_resolution() && card.location.zone.is_on_field() {
                        events.extend(
                            ctx.field
                                .send_to_graveyard(link.source, turn_count)
                                .map_err(|e| InternalError::inconsistent(e.to_string()))?,
                        );
                    }
                }
            }

            let terminal = events.iter().any(|e| e.deck_out().is_some())
                || PlayerKind::BOTH
                    .iter()
                    .any(|p| ctx.field.player(*p).is_defeated());
            resolution.events.extend(events.iter().copied());
            if terminal {
                info!("duel ended during chain resolution");
                resolution.terminal = true;
                self.links.clear();
                self.pending.clear();
                break;
            }

            let triggers = self.collect_triggers(ctx.field, ctx.catalog, ctx.turn, &events)?;
            self.absorb_triggers(ctx, triggers)?;
        }

        self.state = ChainState::Neutral;
        self.last_resolution = resolution.resolved.clone();
        info!("chain resolved: {} links", resolution.resolved.len());

        if !resolution.terminal && !self.pending.is_empty() {
            self.open_pending_chain(ctx)?;
        }
        Ok(resolution)
    }

    fn resolve_link(
        &mut self,
        ctx: &mut ChainContext<'_>,
        link: &ChainLink,
        events: &mut Vec<GameEvent>,
    ) -> Result<LinkOutcome, GameError> {
        let catalog = ctx.catalog;
        let def = catalog.require(link.catalog_id)?;
        let effect = def
            .effect(link.effect_index)
            .ok_or(InternalError::UndefinedEffect {
                catalog_id: link.catalog_id,
                index: link.effect_index,
            })?;

        if link.negated {
            info!("chain link {} ({}) negated", link.position, def.name);
            return Ok(LinkOutcome::Negated);
        }
        if fizzles(ctx.field, link, effect) {
            info!("chain link {} ({}) fizzled", link.position, def.name);
            return Ok(LinkOutcome::Fizzled);
        }

        let turn_count = ctx.turn.turn_count();
        match &effect.action {
            EffectAction::Negate { destroy_source } => {
                let Some(target) = link
                    .negates
                    .and_then(|pos| self.links.iter_mut().find(|l| l.position == pos))
                else {
                    return Ok(LinkOutcome::Applied);
                };
                target.negated = true;
                let negated_source = target.source;
                if *destroy_source
                    && ctx
                        .field
                        .location(negated_source)
                        .map_or(false, |loc| loc.zone.is_on_field())
                {
                    events.extend(
                        ctx.field
                            .destroy(negated_source, false, turn_count)
                            .map_err(|e| InternalError::inconsistent(e.to_string()))?,
                    );
                }
            }
            action => events.extend(apply_effect(ctx.field, catalog, turn_count, link, action)?),
        }
        info!("chain link {} ({}) resolved", link.position, def.name);
        Ok(LinkOutcome::Applied)
    }
}

fn fizzles(field: &FieldState, link: &ChainLink, effect: &EffectDefinition) -> bool {
    let source_gone = effect.source_dependent && !field.is_in(link.source, link.source_zone);
    let target_gone =
        effect.target_dependent && link.targets.iter().any(|t| !field.is_in(t.card, t.zone));
    source_gone || target_gone
}

fn on_field_face_up(field: &FieldState, player: PlayerKind) -> Vec<InstanceId> {
    [ZoneType::MonsterZone, ZoneType::SpellTrapZone, ZoneType::FieldZone]
        .iter()
        .flat_map(|zone| field.zone(ZoneRef::new(player, *zone)).cards().iter().copied())
        .filter(|id| field.get(*id).map_or(false, |c| c.is_face_up()))
        .collect()
}

fn target_matches(spec: &TargetSpec, controller: PlayerKind, card: &CardInstance) -> bool {
    let side_ok = match spec.side {
        TargetSide::Own => card.owner == controller,
        TargetSide::Opponent => card.owner != controller,
        TargetSide::Either => true,
    };
    side_ok && card.location.zone == spec.zone && (!spec.face_up_only || card.is_face_up())
}

fn auto_targets(field: &FieldState, controller: PlayerKind, spec: TargetSpec) -> Option<Vec<InstanceId>> {
    let sides = match spec.side {
        TargetSide::Own => vec![controller],
        TargetSide::Opponent => vec![controller.reverse()],
        TargetSide::Either => vec![controller.reverse(), controller],
    };
    let picked: Vec<InstanceId> = sides
        .into_iter()
        .flat_map(|owner| field.zone(ZoneRef::new(owner, spec.zone)).cards().iter().copied())
        .filter(|id| {
            field
                .get(*id)
                .map_or(false, |card| target_matches(&spec, controller, card))
        })
        .take(spec.count)
        .collect();
    (picked.len() == spec.count).then_some(picked)
}

fn validate_targets(
    field: &FieldState,
    controller: PlayerKind,
    effect: &EffectDefinition,
    targets: &[InstanceId],
) -> Result<Vec<LinkTarget>, ActivationError> {
    let expected = effect.expected_targets();
    if targets.len() != expected {
        return Err(ActivationError::TargetCountMismatch {
            expected,
            got: targets.len(),
        });
    }
    let Some(spec) = effect.target else {
        return Ok(vec![]);
    };
    let mut out: Vec<LinkTarget> = Vec::with_capacity(targets.len());
    for id in targets {
        if out.iter().any(|t| t.card == *id) {
            return Err(ActivationError::IllegalTarget(*id));
        }
        let card = field.get(*id).ok_or(ActivationError::IllegalTarget(*id))?;
        if !target_matches(&spec, controller, card) {
            return Err(ActivationError::IllegalTarget(*id));
        }
        out.push(LinkTarget {
            card: *id,
            zone: card.location,
        });
    }
    Ok(out)
}

/// 패의 마법 카드는 필드에 앞면으로 놓고, 세트된 카드는 앞면으로 뒤집습니다.
/// 카드 자체의 발동이면 `true`.
fn place_activated_card(
    field: &mut FieldState,
    source: &CardInstance,
    def: &CardDefinition,
    effect: &EffectDefinition,
    turn: u32,
) -> Result<bool, GameError> {
    if def.card_type.is_monster() || effect.trigger_event().is_some() {
        return Ok(false);
    }
    match source.location.zone {
        ZoneType::Hand => {
            let zone = if def.card_type.is_field_spell() {
                ZoneType::FieldZone
            } else {
                ZoneType::SpellTrapZone
            };
            field
                .move_card(
                    source.id,
                    source.location,
                    ZoneRef::new(source.owner, zone),
                    Some(Placement::face_up(Position::Attack)),
                    turn,
                )
                .map_err(|_| ActivationError::ZoneFull)?;
            Ok(true)
        }
        ZoneType::SpellTrapZone | ZoneType::FieldZone if !source.is_face_up() => {
            field.card_mut(source.id)?.face = crate::card::types::Face::Up;
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn cost_failed(reason: impl Into<String>) -> GameError {
    GameplayError::CostPaymentFailed {
        reason: reason.into(),
    }
    .into()
}

/// 코스트를 순서대로 지불합니다. 호출하는 쪽이 사본에서 부르므로 중간에 실패해도 원본은 그대로입니다.
fn pay_costs(
    field: &mut FieldState,
    actor: PlayerKind,
    source: &CardInstance,
    effect: &EffectDefinition,
    chosen: &[InstanceId],
    turn: u32,
) -> Result<Vec<GameEvent>, GameError> {
    let mut events = vec![];
    let mut chosen = chosen.iter().copied();
    let hand = ZoneRef::new(actor, ZoneType::Hand);

    for cost in &effect.costs {
        match *cost {
            Cost::PayLife { amount } => {
                if field.player(actor).life_points() < amount {
                    return Err(cost_failed(format!("cannot pay {} life points", amount)));
                }
                field.adjust_life(actor, -(amount as i64));
                events.push(GameEvent::LifeChanged {
                    player: actor,
                    life_points: field.player(actor).life_points(),
                });
            }
            Cost::Discard { count } => {
                let picks: Vec<InstanceId> = chosen.by_ref().take(count).collect();
                let picks = if picks.is_empty() {
                    field
                        .zone(hand)
                        .cards()
                        .iter()
                        .copied()
                        .filter(|id| *id != source.id)
                        .take(count)
                        .collect()
                } else {
                    picks
                };
                if picks.len() < count {
                    return Err(cost_failed(format!("need {} cards to discard", count)));
                }
                for id in picks {
                    if id == source.id || !field.is_in(id, hand) {
                        return Err(cost_failed(format!("{} cannot be discarded", id)));
                    }
                    events.extend(field.send_to_graveyard(id, turn)?);
                }
            }
            Cost::DetachMaterial { count } => {
                let materials = field.overlay_of(source.id);
                if materials.len() < count {
                    return Err(cost_failed(format!("need {} materials to detach", count)));
                }
                for id in materials.into_iter().take(count) {
                    events.extend(field.send_to_graveyard(id, turn)?);
                }
            }
            Cost::TributeSelf => {
                if !field.is_in(source.id, ZoneRef::new(actor, ZoneType::MonsterZone)) {
                    return Err(cost_failed("source is not on the field"));
                }
                events.extend(field.send_to_graveyard(source.id, turn)?);
            }
        }
    }
    Ok(events)
}

fn mark_frequency(field: &mut FieldState, actor: PlayerKind, frequency: Frequency, key: EffectKey) {
    let player = field.player_mut(actor);
    match frequency {
        Frequency::OncePerTurn => {
            player.once_per_turn.insert(key);
        }
        Frequency::OncePerDuel => {
            player.once_per_duel.insert(key);
        }
        Frequency::Unlimited => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RulesConfig,
        test::{fixture_catalog, ids, place},
    };

    const P1: PlayerKind = PlayerKind::Player1;
    const P2: PlayerKind = PlayerKind::Player2;

    struct Board {
        field: FieldState,
        turn: TurnManager,
        engine: ChainEngine,
    }

    fn board() -> Board {
        let mut turn = TurnManager::new(P1, false);
        turn.advance_to(crate::game::phase::Phase::Main1).unwrap();
        Board {
            field: FieldState::new(&RulesConfig::default()),
            turn,
            engine: ChainEngine::new(TriggerOrder::TurnPlayerFirst),
        }
    }

    fn request(source: InstanceId, targets: Vec<InstanceId>) -> ActivationRequest {
        ActivationRequest {
            source,
            targets,
            ..Default::default()
        }
    }

    impl Board {
        fn activate(&mut self, actor: PlayerKind, req: ActivationRequest) -> Result<(), GameError> {
            let catalog = fixture_catalog();
            let mut ctx = ChainContext {
                field: &mut self.field,
                catalog: catalog.as_ref(),
                turn: &self.turn,
            };
            self.engine.activate(&mut ctx, actor, &req)
        }

        fn pass(&mut self, actor: PlayerKind) -> Result<PassOutcome, GameError> {
            let catalog = fixture_catalog();
            let mut ctx = ChainContext {
                field: &mut self.field,
                catalog: catalog.as_ref(),
                turn: &self.turn,
            };
            self.engine.pass(&mut ctx, actor)
        }
    }

    #[test]
    fn links_resolve_in_reverse_order() {
        let catalog = fixture_catalog();
        let mut b = board();
        let mine = place(&mut b.field, &catalog, ids::FOOTMAN, P1, ZoneType::MonsterZone);
        let theirs = place(&mut b.field, &catalog, ids::FOOTMAN, P2, ZoneType::MonsterZone);
        let bolt = place(&mut b.field, &catalog, ids::SHATTERING_BOLT, P1, ZoneType::Hand);
        let ward = place(&mut b.field, &catalog, ids::MIRROR_WARD, P2, ZoneType::SpellTrapZone);

        b.activate(P1, request(bolt, vec![theirs])).unwrap();
        assert_eq!(b.engine.state(), ChainState::Open);
        assert_eq!(b.engine.priority(), Some(P2));

        b.activate(P2, request(ward, vec![mine])).unwrap();
        assert_eq!(b.engine.depth(), 2);
        assert_eq!(b.engine.priority(), Some(P1));

        assert_eq!(b.pass(P1).unwrap(), PassOutcome::Waiting { priority: P2 });
        let PassOutcome::Resolved(resolution) = b.pass(P2).unwrap() else {
            panic!("chain should resolve after both players pass");
        };
        let order: Vec<usize> = resolution.resolved.iter().map(|r| r.position).collect();
        assert_eq!(order, vec![2, 1]);
        assert!(b.engine.is_neutral());
        assert_eq!(b.field.location(mine).unwrap().zone, ZoneType::Banished);
        assert_eq!(b.field.location(theirs).unwrap().zone, ZoneType::Graveyard);
        assert_eq!(b.field.location(bolt).unwrap().zone, ZoneType::Graveyard);
    }

    #[test]
    fn normal_speed_cannot_respond() {
        let catalog = fixture_catalog();
        let mut b = board();
        let theirs = place(&mut b.field, &catalog, ids::FOOTMAN, P2, ZoneType::MonsterZone);
        let bolt = place(&mut b.field, &catalog, ids::SHATTERING_BOLT, P1, ZoneType::Hand);
        let burst = place(&mut b.field, &catalog, ids::SUNFIRE_BURST, P2, ZoneType::Hand);

        b.activate(P1, request(bolt, vec![theirs])).unwrap();
        let result = b.activate(P2, request(burst, vec![]));
        assert!(matches!(
            result,
            Err(GameError::Gameplay(GameplayError::Activation(
                ActivationError::SpeedTooSlow { .. }
            )))
        ));
        assert_eq!(b.engine.depth(), 1);
    }

    #[test]
    fn dry_run_leaves_everything_untouched() {
        let catalog = fixture_catalog();
        let mut b = board();
        let theirs = place(&mut b.field, &catalog, ids::FOOTMAN, P2, ZoneType::MonsterZone);
        let bolt = place(&mut b.field, &catalog, ids::SHATTERING_BOLT, P1, ZoneType::Hand);
        let field = b.field.clone();

        assert!(!b.engine.can_activate(&b.field, catalog.as_ref(), &b.turn, P1, &request(bolt, vec![])));
        assert!(b.engine.can_activate(&b.field, catalog.as_ref(), &b.turn, P1, &request(bolt, vec![theirs])));
        assert!(!b.engine.can_activate(&b.field, catalog.as_ref(), &b.turn, P2, &request(bolt, vec![theirs])));
        assert!(b.engine.is_neutral());
        assert_eq!(b.field, field);
    }

    #[test]
    fn pass_without_chain_is_rejected() {
        let mut b = board();
        assert!(matches!(
            b.pass(P1),
            Err(GameError::Gameplay(GameplayError::PhaseViolation { .. }))
        ));
    }
}
