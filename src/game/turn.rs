//! turn.rs
//!
//! 턴 진행과 페이즈별 행동 가능 여부를 관리합니다.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{card::types::PlayerKind, exception::GameplayError};

use super::{action::ActionKind, phase::Phase};

/// `TurnManager` 구조체는 게임 턴의 상태를 나타냅니다.
///
/// 현재 턴 플레이어, 턴 카운트, 현재 페이즈를 가지고 있습니다.
/// 체인 중의 우선권은 체인 엔진이 따로 관리합니다.
///
/// # Examples
///
/// ```
/// use duel_core::game::turn::TurnManager;
/// use duel_core::game::phase::Phase;
/// use duel_core::card::types::PlayerKind;
///
/// let turn = TurnManager::new(PlayerKind::Player1, false);
/// assert_eq!(turn.current_turn(), PlayerKind::Player1);
/// assert_eq!(turn.turn_count(), 1);
/// assert_eq!(turn.phase(), Phase::Draw);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnManager {
    current_turn_player: PlayerKind,
    turn_count: u32,
    current_phase: Phase,
    /// 선공 첫 턴에도 공격을 허용할지
    first_turn_battle: bool,
}

/// 페이즈 전환 결과. 턴이 바뀌었으면 `new_turn` 이 참입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub new_turn: bool,
}

impl TurnManager {
    pub fn new(starting_player: PlayerKind, first_turn_battle: bool) -> Self {
        Self {
            current_turn_player: starting_player,
            turn_count: 1,
            current_phase: Phase::Draw,
            first_turn_battle,
        }
    }

    pub fn current_turn(&self) -> PlayerKind {
        self.current_turn_player
    }

    pub fn opponent(&self) -> PlayerKind {
        self.current_turn_player.reverse()
    }

    pub fn is_active(&self, player: PlayerKind) -> bool {
        self.current_turn_player == player
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn phase(&self) -> Phase {
        self.current_phase
    }

    /// 한 페이즈 앞으로 진행합니다. 엔드 페이즈에서는 턴 플레이어가 바뀌고 드로우 페이즈가 됩니다.
    ///
    /// # Examples
    ///
    /// ```
    /// use duel_core::game::turn::TurnManager;
    /// use duel_core::game::phase::Phase;
    /// use duel_core::card::types::PlayerKind;
    ///
    /// let mut turn = TurnManager::new(PlayerKind::Player1, false);
    /// while turn.phase() != Phase::End {
    ///     turn.advance_phase();
    /// }
    /// let transition = turn.advance_phase();
    /// assert!(transition.new_turn);
    /// assert_eq!(turn.current_turn(), PlayerKind::Player2);
    /// assert_eq!(turn.turn_count(), 2);
    /// assert_eq!(turn.phase(), Phase::Draw);
    /// ```
    pub fn advance_phase(&mut self) -> PhaseTransition {
        let from = self.current_phase;
        let transition = match from.next() {
            Some(to) => {
                self.current_phase = to;
                PhaseTransition {
                    from,
                    to,
                    new_turn: false,
                }
            }
            None => {
                self.advance_turn();
                PhaseTransition {
                    from,
                    to: Phase::Draw,
                    new_turn: true,
                }
            }
        };
        info!(
            "turn {} ({}): {} -> {}",
            self.turn_count, self.current_turn_player, transition.from, transition.to
        );
        transition
    }

    /// 같은 턴 안의 `target` 페이즈까지 진행합니다.
    /// 뒤로 가거나 턴을 넘기는 목표는 거부합니다.
    pub fn advance_to(&mut self, target: Phase) -> Result<Vec<PhaseTransition>, GameplayError> {
        if !self.can_reach(target) {
            return Err(GameplayError::PhaseViolation {
                phase: self.current_phase,
                action: ActionKind::Pass,
            });
        }
        let mut transitions = vec![];
        while self.current_phase != target {
            transitions.push(self.advance_phase());
        }
        Ok(transitions)
    }

    /// 이번 턴 안에서 앞으로 진행해 `target` 에 닿을 수 있는지.
    pub fn can_reach(&self, target: Phase) -> bool {
        let mut phase = self.current_phase;
        while let Some(next) = phase.next() {
            if next == target {
                return true;
            }
            phase = next;
        }
        false
    }

    fn advance_turn(&mut self) {
        self.current_turn_player = self.current_turn_player.reverse();
        self.turn_count += 1;
        self.current_phase = Phase::Draw;
    }

    /// 공격 선언 후 대미지 계산을 위해 대미지 스텝으로 들어갑니다.
    pub fn enter_damage_step(&mut self) {
        self.current_phase = Phase::BattleDamage;
    }

    pub fn leave_damage_step(&mut self) {
        if self.current_phase == Phase::BattleDamage {
            self.current_phase = Phase::BattleStep;
        }
    }

    /// 현재 페이즈에서 `actor` 가 `kind` 행동을 할 수 있는지.
    ///
    /// 발동은 항상 통과시키고 세부 타이밍은 체인 엔진이 판단합니다.
    ///
    /// # Examples
    ///
    /// ```
    /// use duel_core::game::turn::TurnManager;
    /// use duel_core::game::action::ActionKind;
    /// use duel_core::card::types::PlayerKind;
    ///
    /// let mut turn = TurnManager::new(PlayerKind::Player1, false);
    /// turn.advance_phase();
    /// turn.advance_phase();
    /// assert!(turn.may_perform(ActionKind::NormalSummon, PlayerKind::Player1, false));
    /// assert!(!turn.may_perform(ActionKind::NormalSummon, PlayerKind::Player2, false));
    /// assert!(!turn.may_perform(ActionKind::NormalSummon, PlayerKind::Player1, true));
    /// assert!(!turn.may_perform(ActionKind::Attack, PlayerKind::Player1, false));
    /// ```
    pub fn may_perform(&self, kind: ActionKind, actor: PlayerKind, chain_open: bool) -> bool {
        let active = self.is_active(actor);
        let phase = self.current_phase;
        match kind {
            ActionKind::Pass | ActionKind::Concede | ActionKind::Activate => true,
            ActionKind::Draw => active && !chain_open && phase == Phase::Draw,
            ActionKind::NormalSummon
            | ActionKind::SpecialSummon
            | ActionKind::SetCard
            | ActionKind::ChangePosition => active && !chain_open && phase.is_main(),
            ActionKind::Attack => {
                active
                    && !chain_open
                    && phase == Phase::BattleStep
                    && (self.turn_count > 1 || self.first_turn_battle)
            }
        }
    }
}
