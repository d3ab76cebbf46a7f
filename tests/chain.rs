mod common;

use duel_core::{
    card::types::PlayerKind,
    enums::ZoneType,
    exception::{ActivationError, GameError, GameplayError},
    game::{
        action::Action,
        chain::{ChainState, LinkOutcome},
        snapshot::Viewer,
    },
    test::{ids, TestDuel},
};

use common::{activate, in_hand, padded, summon, zone_of};

const P1: PlayerKind = PlayerKind::Player1;
const P2: PlayerKind = PlayerKind::Player2;

/// 1 턴에 P1 이 `p1_top` 의 첫 카드를 소환하고 나머지 마법/함정을 세트한 뒤 턴을 넘깁니다.
fn opponent_turn(p1_top: &[u32], p2_top: &[u32]) -> TestDuel {
    let mut duel = TestDuel::start(padded(p1_top, 8), padded(p2_top, 8));
    let monster = in_hand(&duel, P1, p1_top[0]);
    duel.act(P1, summon(monster)).unwrap();
    for id in &p1_top[1..] {
        let card = in_hand(&duel, P1, *id);
        duel.act(P1, Action::SetCard { card }).unwrap();
    }
    duel.end_turn();
    assert_eq!(duel.session.turn().current_turn(), P2);
    duel
}

fn outcomes(duel: &TestDuel) -> Vec<LinkOutcome> {
    duel.session
        .chain()
        .last_resolution()
        .iter()
        .map(|link| link.outcome)
        .collect()
}

// ============================================================
// 체인 구성과 처리 순서
// ============================================================

#[cfg(test)]
mod resolution_tests {
    use super::*;

    #[test]
    fn chain_resolves_last_in_first_out() {
        let mut duel = opponent_turn(&[ids::FOOTMAN, ids::MIRROR_WARD], &[ids::FOOTMAN, ids::SHATTERING_BOLT]);
        let footman = duel.find_in(P1, ZoneType::MonsterZone, ids::FOOTMAN).unwrap();
        let ward = duel.find_in(P1, ZoneType::SpellTrapZone, ids::MIRROR_WARD).unwrap();

        let enemy = in_hand(&duel, P2, ids::FOOTMAN);
        duel.act(P2, summon(enemy)).unwrap();
        let bolt = in_hand(&duel, P2, ids::SHATTERING_BOLT);
        duel.act(P2, activate(bolt, vec![footman])).unwrap();

        assert_eq!(duel.session.chain().state(), ChainState::Open);
        assert_eq!(duel.session.chain().priority(), Some(P1));

        duel.act(P1, activate(ward, vec![enemy])).unwrap();
        assert_eq!(duel.session.chain().depth(), 2);
        assert_eq!(duel.session.chain().priority(), Some(P2));

        duel.act(P2, Action::pass()).unwrap();
        assert_eq!(duel.session.chain().state(), ChainState::Open);
        duel.act(P1, Action::pass()).unwrap();

        let chain = duel.session.chain();
        assert_eq!(chain.state(), ChainState::Neutral);
        let order: Vec<usize> = chain.last_resolution().iter().map(|l| l.position).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(outcomes(&duel), vec![LinkOutcome::Applied, LinkOutcome::Applied]);

        assert_eq!(zone_of(&duel, enemy), ZoneType::Banished);
        assert_eq!(zone_of(&duel, footman), ZoneType::Graveyard);
        assert_eq!(zone_of(&duel, ward), ZoneType::Graveyard);
        assert_eq!(zone_of(&duel, bolt), ZoneType::Graveyard);
        duel.session.field().verify_integrity().unwrap();
    }

    #[test]
    fn only_priority_holder_may_pass() {
        let mut duel = opponent_turn(&[ids::FOOTMAN], &[ids::SHATTERING_BOLT]);
        let footman = duel.find_in(P1, ZoneType::MonsterZone, ids::FOOTMAN).unwrap();
        let bolt = in_hand(&duel, P2, ids::SHATTERING_BOLT);
        duel.act(P2, activate(bolt, vec![footman])).unwrap();

        let result = duel.act(P2, Action::pass());
        assert_eq!(
            result.unwrap_err(),
            GameError::Gameplay(GameplayError::NotPriorityHolder)
        );
        assert_eq!(duel.session.chain().priority(), Some(P1));
    }

    #[test]
    fn normal_speed_cannot_join_open_chain() {
        let mut duel = opponent_turn(&[ids::FOOTMAN, ids::SUNFIRE_BURST, ids::SWIFT_CUT], &[ids::SHATTERING_BOLT]);
        let footman = duel.find_in(P1, ZoneType::MonsterZone, ids::FOOTMAN).unwrap();
        let bolt = in_hand(&duel, P2, ids::SHATTERING_BOLT);
        duel.act(P2, activate(bolt, vec![footman])).unwrap();

        // 세트된 일반 마법은 스피드 1 이라 체인할 수 없습니다
        let burst = duel.find_in(P1, ZoneType::SpellTrapZone, ids::SUNFIRE_BURST).unwrap();
        let before = duel.session.state().clone();
        let result = duel.act(P1, activate(burst, vec![]));
        assert!(matches!(
            result,
            Err(GameError::Gameplay(GameplayError::Activation(ActivationError::SpeedTooSlow { .. })))
        ));
        assert_eq!(duel.session.state(), &before);
    }

    #[test]
    fn target_gone_before_resolution_fizzles() {
        let mut duel = opponent_turn(&[ids::FOOTMAN], &[ids::SHATTERING_BOLT, ids::SWIFT_CUT]);
        let footman = duel.find_in(P1, ZoneType::MonsterZone, ids::FOOTMAN).unwrap();
        let bolt = in_hand(&duel, P2, ids::SHATTERING_BOLT);
        let cut = in_hand(&duel, P2, ids::SWIFT_CUT);

        duel.act(P2, activate(bolt, vec![footman])).unwrap();
        duel.act(P1, Action::pass()).unwrap();
        duel.act(P2, activate(cut, vec![footman])).unwrap();
        duel.act(P1, Action::pass()).unwrap();
        duel.act(P2, Action::pass()).unwrap();

        assert_eq!(outcomes(&duel), vec![LinkOutcome::Applied, LinkOutcome::Fizzled]);
        assert_eq!(zone_of(&duel, footman), ZoneType::Graveyard);
        assert_eq!(zone_of(&duel, bolt), ZoneType::Graveyard);
    }

    #[test]
    fn counter_trap_negates_and_destroys_source() {
        let mut duel = opponent_turn(&[ids::FOOTMAN, ids::FINAL_VERDICT], &[ids::SUNFIRE_BURST]);
        let verdict = duel.find_in(P1, ZoneType::SpellTrapZone, ids::FINAL_VERDICT).unwrap();
        let burst = in_hand(&duel, P2, ids::SUNFIRE_BURST);

        duel.act(P2, activate(burst, vec![])).unwrap();
        duel.act(P1, activate(verdict, vec![])).unwrap();
        assert_eq!(duel.life(P1), 7000);

        duel.act(P2, Action::pass()).unwrap();
        duel.act(P1, Action::pass()).unwrap();

        assert_eq!(outcomes(&duel), vec![LinkOutcome::Applied, LinkOutcome::Negated]);
        assert_eq!(duel.life(P1), 7000);
        assert_eq!(zone_of(&duel, burst), ZoneType::Graveyard);
        assert_eq!(zone_of(&duel, verdict), ZoneType::Graveyard);
    }

    #[test]
    fn quick_play_from_hand_only_on_own_turn() {
        let mut duel = opponent_turn(&[ids::FOOTMAN], &[ids::SHATTERING_BOLT, ids::SWIFT_CUT]);
        let footman = duel.find_in(P1, ZoneType::MonsterZone, ids::FOOTMAN).unwrap();
        let bolt = in_hand(&duel, P2, ids::SHATTERING_BOLT);
        duel.act(P2, activate(bolt, vec![footman])).unwrap();
        duel.act(P1, Action::pass()).unwrap();
        duel.act(P2, Action::pass()).unwrap();

        // P1 의 턴이 되면 P2 는 패에서 속공 마법을 쓸 수 없습니다
        duel.end_turn();
        let enemy_cut = in_hand(&duel, P2, ids::SWIFT_CUT);
        let result = duel.act(P2, activate(enemy_cut, vec![]));
        assert!(matches!(
            result,
            Err(GameError::Gameplay(GameplayError::Activation(_)))
        ));
    }
}

// ============================================================
// 발동 제약과 코스트
// ============================================================

#[cfg(test)]
mod restriction_tests {
    use super::*;

    #[test]
    fn once_per_turn_rejects_second_copy() {
        let mut duel = TestDuel::start(
            padded(&[ids::POT_OF_PLENTY, ids::POT_OF_PLENTY], 8),
            padded(&[], 6),
        );
        let pots: Vec<_> = duel
            .hand(P1)
            .into_iter()
            .filter(|id| duel.session.field().get(*id).unwrap().catalog_id == ids::POT_OF_PLENTY)
            .collect();
        assert_eq!(pots.len(), 2);

        duel.act(P1, activate(pots[0], vec![])).unwrap();
        duel.act(P2, Action::pass()).unwrap();
        duel.act(P1, Action::pass()).unwrap();
        assert_eq!(duel.hand(P1).len(), 6);

        let before = duel.session.state().clone();
        let result = duel.act(P1, activate(pots[1], vec![]));
        assert_eq!(
            result.unwrap_err(),
            GameError::Gameplay(GameplayError::Activation(ActivationError::AlreadyUsedThisTurn))
        );
        assert_eq!(duel.session.state(), &before);
    }

    #[test]
    fn failed_cost_leaves_state_untouched() {
        let mut duel = TestDuel::start(padded(&[ids::DESPERATE_GAMBIT, ids::FOOTMAN], 8), padded(&[], 6));
        let gambit = in_hand(&duel, P1, ids::DESPERATE_GAMBIT);
        let before = duel.session.state().clone();

        // 버리기는 가능하지만 9000 LP 를 낼 수 없습니다
        let result = duel.act(P1, activate(gambit, vec![]));
        assert!(matches!(
            result,
            Err(GameError::Gameplay(GameplayError::CostPaymentFailed { .. }))
        ));
        assert_eq!(duel.session.state(), &before);
        assert_eq!(duel.hand(P1).len(), 5);
        assert_eq!(zone_of(&duel, gambit), ZoneType::Hand);
    }

    #[test]
    fn wrong_target_count_is_rejected() {
        let mut duel = TestDuel::start(padded(&[ids::SHATTERING_BOLT], 8), padded(&[], 6));
        let bolt = in_hand(&duel, P1, ids::SHATTERING_BOLT);
        let result = duel.act(P1, activate(bolt, vec![]));
        assert_eq!(
            result.unwrap_err(),
            GameError::Gameplay(GameplayError::Activation(ActivationError::TargetCountMismatch {
                expected: 1,
                got: 0
            }))
        );
    }
}

// ============================================================
// 유발 효과
// ============================================================

#[cfg(test)]
mod trigger_tests {
    use super::*;

    #[test]
    fn normal_mandatory_trigger_opens_new_chain() {
        let mut duel = opponent_turn(&[ids::GRAVE_WHISPER], &[ids::SHATTERING_BOLT]);
        let whisper = duel.find_in(P1, ZoneType::MonsterZone, ids::GRAVE_WHISPER).unwrap();
        let bolt = in_hand(&duel, P2, ids::SHATTERING_BOLT);

        duel.act(P2, activate(bolt, vec![whisper])).unwrap();
        duel.act(P1, Action::pass()).unwrap();
        duel.act(P2, Action::pass()).unwrap();

        // 파괴로 깨어난 강제 유발이 새 체인을 열고 턴 플레이어부터 응답합니다
        let chain = duel.session.chain();
        assert_eq!(chain.state(), ChainState::Open);
        assert_eq!(chain.depth(), 1);
        assert_eq!(chain.links()[0].catalog_id, ids::GRAVE_WHISPER);
        assert_eq!(chain.priority(), Some(P2));
        assert_eq!(duel.life(P2), 8000);

        duel.act(P2, Action::pass()).unwrap();
        duel.act(P1, Action::pass()).unwrap();
        assert_eq!(duel.life(P2), 7500);
        assert!(duel.session.chain().is_neutral());
    }

    #[test]
    fn quick_mandatory_trigger_joins_resolving_chain() {
        let mut duel = opponent_turn(&[ids::REACTIVE_GOLEM], &[ids::SHATTERING_BOLT]);
        let golem = duel.find_in(P1, ZoneType::MonsterZone, ids::REACTIVE_GOLEM).unwrap();
        let bolt = in_hand(&duel, P2, ids::SHATTERING_BOLT);

        duel.act(P2, activate(bolt, vec![golem])).unwrap();
        duel.act(P1, Action::pass()).unwrap();
        duel.act(P2, Action::pass()).unwrap();

        assert!(duel.session.chain().is_neutral());
        assert_eq!(duel.session.chain().last_resolution().len(), 2);
        assert_eq!(duel.life(P2), 7700);
    }

    #[test]
    fn optional_trigger_is_offered_to_controller_only() {
        let mut duel = TestDuel::start(padded(&[ids::ECHO_SPRITE], 8), padded(&[], 6));
        let sprite = in_hand(&duel, P1, ids::ECHO_SPRITE);
        duel.act(P1, summon(sprite)).unwrap();

        let mine = duel.session.snapshot(Viewer::Player(P1));
        let theirs = duel.session.snapshot(Viewer::Player(P2));
        assert_eq!(mine.offers.len(), 1);
        assert!(theirs.offers.is_empty());

        duel.act(P1, activate(sprite, vec![])).unwrap();
        duel.act(P2, Action::pass()).unwrap();
        duel.act(P1, Action::pass()).unwrap();
        assert_eq!(duel.hand(P1).len(), 5);
        assert!(duel.session.chain().offers().is_empty());
    }

    #[test]
    fn moving_on_drops_optional_trigger() {
        let mut duel = TestDuel::start(padded(&[ids::ECHO_SPRITE], 8), padded(&[], 6));
        let sprite = in_hand(&duel, P1, ids::ECHO_SPRITE);
        duel.act(P1, summon(sprite)).unwrap();
        duel.act(P1, Action::pass()).unwrap();

        let result = duel.act(P1, activate(sprite, vec![]));
        assert_eq!(
            result.unwrap_err(),
            GameError::Gameplay(GameplayError::Activation(ActivationError::NoTriggerOffer))
        );
    }

    #[test]
    fn standby_trigger_fires_on_owner_turn() {
        let mut duel = TestDuel::start(padded(&[ids::DAWN_HERALD], 8), padded(&[], 6));
        let herald = in_hand(&duel, P1, ids::DAWN_HERALD);
        duel.act(P1, summon(herald)).unwrap();
        duel.end_turn();
        duel.end_turn();

        assert_eq!(duel.session.turn().turn_count(), 3);
        assert_eq!(duel.session.chain().priority(), Some(P1));
        duel.act(P1, Action::pass()).unwrap();
        duel.act(P2, Action::pass()).unwrap();

        assert_eq!(duel.life(P1), 8300);
        assert_eq!(duel.session.turn().phase(), duel_core::game::phase::Phase::Main1);
    }
}
