use tracing::debug;

use crate::{
    card::{catalog::CardCatalog, InstanceId},
    enums::ZoneType,
    exception::{GameplayError, InternalError},
    game::{chain::ChainLink, event::GameEvent, field::FieldState},
    zone::ZoneRef,
};

use super::types::EffectAction;

fn inconsistent(err: GameplayError) -> InternalError {
    InternalError::inconsistent(format!("effect handler could not move a card: {}", err))
}

/// 체인 링크 하나의 동작을 필드에 적용합니다.
///
/// 발동 시점의 위치에 남아 있는 대상에게만 적용합니다.
/// `Negate` 는 체인 자체를 건드리므로 체인 엔진이 직접 처리합니다.
pub fn apply_effect(
    field: &mut FieldState,
    catalog: &dyn CardCatalog,
    turn: u32,
    link: &ChainLink,
    action: &EffectAction,
) -> Result<Vec<GameEvent>, InternalError> {
    let controller = link.controller;
    let present: Vec<InstanceId> = link
        .targets
        .iter()
        .filter(|t| field.is_in(t.card, t.zone))
        .map(|t| t.card)
        .collect();
    let mut events = vec![];

    match action {
        EffectAction::Destroy => {
            for id in present {
                events.extend(field.destroy(id, false, turn).map_err(inconsistent)?);
            }
        }
        EffectAction::Banish => {
            for id in present {
                events.extend(field.banish(id, turn).map_err(inconsistent)?);
            }
        }
        EffectAction::Draw { count } => {
            for _ in 0..*count {
                match field.draw(controller, turn).map_err(inconsistent)? {
                    Some(card) => events.push(GameEvent::Drew {
                        player: controller,
                        card,
                    }),
                    None => {
                        events.push(GameEvent::DeckOut { player: controller });
                        break;
                    }
                }
            }
        }
        EffectAction::SearchDeck { filter } => {
            let deck = ZoneRef::new(controller, ZoneType::Deck);
            let mut found = None;
            for id in field.zone(deck).cards().iter().rev() {
                let Some(card) = field.get(*id) else { continue };
                if filter.matches(catalog.require(card.catalog_id)?) {
                    found = Some(*id);
                    break;
                }
            }
            match found {
                Some(id) => field
                    .move_card(id, deck, ZoneRef::new(controller, ZoneType::Hand), None, turn)
                    .map_err(inconsistent)?,
                None => debug!("search by {} found nothing", link.source),
            }
        }
        EffectAction::ModifyStat { stat, amount } => {
            let subjects = if link.targets.is_empty() {
                vec![link.source]
            } else {
                present
            };
            for id in subjects {
                let card = field.card_mut(id).map_err(inconsistent)?;
                if card.location.zone == ZoneType::MonsterZone {
                    card.modify_stat(*stat, *amount);
                }
            }
        }
        EffectAction::Negate { .. } => {}
        EffectAction::Damage { amount } => {
            let opponent = controller.reverse();
            field.adjust_life(opponent, -(*amount as i64));
            events.push(GameEvent::LifeChanged {
                player: opponent,
                life_points: field.player(opponent).life_points(),
            });
        }
        EffectAction::Recover { amount } => {
            field.adjust_life(controller, *amount as i64);
            events.push(GameEvent::LifeChanged {
                player: controller,
                life_points: field.player(controller).life_points(),
            });
        }
    }
    Ok(events)
}
