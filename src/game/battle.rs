//! battle.rs
//!
//! 공격 선언과 대미지 계산.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    card::{
        types::{Face, PlayerKind, Position},
        InstanceId,
    },
    enums::ZoneType,
    exception::{GameError, GameplayError},
    zone::ZoneRef,
};

use super::{event::GameEvent, field::FieldState, turn::TurnManager};

/// 전투 한 번의 결과.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    pub attacker: InstanceId,
    pub target: Option<InstanceId>,
    /// 전투 대미지를 받은 플레이어와 그 양
    pub damage: Option<(PlayerKind, u32)>,
    pub destroyed: Vec<InstanceId>,
}

fn illegal(reason: impl Into<String>) -> GameError {
    GameplayError::IllegalAttack {
        reason: reason.into(),
    }
    .into()
}

/// 공격을 선언하고 곧바로 대미지 스텝에서 계산을 마칩니다.
///
/// 검증이 모두 끝난 뒤에만 필드를 바꿉니다.
pub fn declare_attack(
    field: &mut FieldState,
    turn: &mut TurnManager,
    actor: PlayerKind,
    attacker: InstanceId,
    target: Option<InstanceId>,
) -> Result<(BattleReport, Vec<GameEvent>), GameError> {
    let turn_count = turn.turn_count();
    let opponent = actor.reverse();
    let own_monsters = ZoneRef::new(actor, ZoneType::MonsterZone);
    let opposing_monsters = ZoneRef::new(opponent, ZoneType::MonsterZone);

    let card = field.card(attacker)?;
    if !field.is_in(attacker, own_monsters) {
        return Err(illegal(format!("{} is not on your monster zone", attacker)));
    }
    if !card.is_face_up() || card.position != Position::Attack {
        return Err(illegal(format!("{} is not in face-up attack position", attacker)));
    }
    if card.last_attack_turn == Some(turn_count) {
        return Err(illegal(format!("{} already attacked this turn", attacker)));
    }
    let attack = card.attack().max(0);

    match target {
        Some(id) if !field.is_in(id, opposing_monsters) => {
            return Err(illegal(format!("{} is not an opposing monster", id)));
        }
        None if !field.zone(opposing_monsters).is_empty() => {
            return Err(illegal("cannot attack directly while the opponent controls monsters"));
        }
        _ => {}
    }

    turn.enter_damage_step();
    field.card_mut(attacker)?.last_attack_turn = Some(turn_count);

    let mut report = BattleReport {
        attacker,
        target,
        damage: None,
        destroyed: vec![],
    };
    let mut events = vec![];

    match target {
        None => {
            report.damage = Some((opponent, attack as u32));
        }
        Some(defender) => {
            let defending = field.card_mut(defender)?;
            // 뒷면 수비 몬스터는 공격받으면 앞면으로 뒤집힙니다
            if defending.face == Face::Down {
                defending.face = Face::Up;
            }
            let in_attack = defending.position == Position::Attack;
            let value = if in_attack {
                defending.attack().max(0)
            } else {
                defending.defense().max(0)
            };

            match attack.cmp(&value) {
                Ordering::Greater => {
                    report.destroyed.push(defender);
                    if in_attack {
                        report.damage = Some((opponent, (attack - value) as u32));
                    }
                }
                Ordering::Less => {
                    if in_attack {
                        report.destroyed.push(attacker);
                    }
                    report.damage = Some((actor, (value - attack) as u32));
                }
                Ordering::Equal => {
                    if in_attack && attack > 0 {
                        report.destroyed.push(attacker);
                        report.destroyed.push(defender);
                    }
                }
            }
        }
    }

    if let Some((player, amount)) = report.damage {
        if amount > 0 {
            field.adjust_life(player, -(amount as i64));
            events.push(GameEvent::LifeChanged {
                player,
                life_points: field.player(player).life_points(),
            });
        }
    }
    for id in &report.destroyed {
        events.extend(field.destroy(*id, true, turn_count)?);
    }
    turn.leave_damage_step();

    info!(
        "{} attacked {} with {}: damage {:?}, destroyed {:?}",
        actor,
        target.map_or_else(|| "directly".to_string(), |t| t.to_string()),
        attacker,
        report.damage,
        report.destroyed
    );
    Ok((report, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RulesConfig,
        game::phase::Phase,
        test::{fixture_catalog, ids, place},
    };

    const P1: PlayerKind = PlayerKind::Player1;
    const P2: PlayerKind = PlayerKind::Player2;

    fn battle_turn() -> TurnManager {
        let mut turn = TurnManager::new(P1, true);
        turn.advance_to(Phase::BattleStep).unwrap();
        turn
    }

    #[test]
    fn stronger_attacker_destroys_and_deals_difference() {
        let catalog = fixture_catalog();
        let mut field = FieldState::new(&RulesConfig::default());
        let mut turn = battle_turn();
        let colossus = place(&mut field, &catalog, ids::COLOSSUS, P1, ZoneType::MonsterZone);
        let footman = place(&mut field, &catalog, ids::FOOTMAN, P2, ZoneType::MonsterZone);
        let gap = field.card(colossus).unwrap().attack() - field.card(footman).unwrap().attack();

        let (report, events) = declare_attack(&mut field, &mut turn, P1, colossus, Some(footman)).unwrap();

        assert_eq!(report.destroyed, vec![footman]);
        assert_eq!(report.damage, Some((P2, gap as u32)));
        assert_eq!(field.player(P2).life_points(), 8000 - gap as u32);
        assert!(events.contains(&GameEvent::Destroyed {
            card: footman,
            by_battle: true
        }));
        assert_eq!(turn.phase(), Phase::BattleStep);
    }

    #[test]
    fn monster_attacks_only_once_per_turn() {
        let catalog = fixture_catalog();
        let mut field = FieldState::new(&RulesConfig::default());
        let mut turn = battle_turn();
        let footman = place(&mut field, &catalog, ids::FOOTMAN, P1, ZoneType::MonsterZone);

        declare_attack(&mut field, &mut turn, P1, footman, None).unwrap();
        let life = field.player(P2).life_points();
        let second = declare_attack(&mut field, &mut turn, P1, footman, None);

        assert!(matches!(
            second,
            Err(GameError::Gameplay(GameplayError::IllegalAttack { .. }))
        ));
        assert_eq!(field.player(P2).life_points(), life);
    }

    #[test]
    fn direct_attack_blocked_by_monsters() {
        let catalog = fixture_catalog();
        let mut field = FieldState::new(&RulesConfig::default());
        let mut turn = battle_turn();
        let footman = place(&mut field, &catalog, ids::FOOTMAN, P1, ZoneType::MonsterZone);
        place(&mut field, &catalog, ids::FOOTMAN, P2, ZoneType::MonsterZone);

        let result = declare_attack(&mut field, &mut turn, P1, footman, None);
        assert!(result.is_err());
        assert_eq!(field.card(footman).unwrap().last_attack_turn, None);
    }

    #[test]
    fn attacking_stronger_defense_costs_attacker_life() {
        let catalog = fixture_catalog();
        let mut field = FieldState::new(&RulesConfig::default());
        let mut turn = battle_turn();
        let footman = place(&mut field, &catalog, ids::FOOTMAN, P1, ZoneType::MonsterZone);
        let colossus = place(&mut field, &catalog, ids::COLOSSUS, P2, ZoneType::MonsterZone);
        field.card_mut(colossus).unwrap().position = Position::Defense;
        field.card_mut(colossus).unwrap().face = Face::Down;
        let gap = field.card(colossus).unwrap().defense() - field.card(footman).unwrap().attack();

        let (report, _) = declare_attack(&mut field, &mut turn, P1, footman, Some(colossus)).unwrap();

        assert!(report.destroyed.is_empty());
        assert_eq!(report.damage, Some((P1, gap as u32)));
        assert!(field.card(colossus).unwrap().is_face_up());
    }
}
