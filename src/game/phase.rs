//! phase.rs
//!
//! 한 턴을 구성하는 페이즈와 그 진행 순서.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Draw,
    Standby,
    Main1,
    BattleStart,
    BattleStep,
    BattleDamage,
    Main2,
    End,
}

impl Phase {
    /// 같은 턴 안에서 다음 페이즈. End 다음은 없습니다(턴 교대는 `TurnManager` 가 합니다).
    ///
    /// 대미지 스텝은 계산이 끝나면 배틀 스텝으로 되돌아갑니다. 순서가 뒤로 가는 유일한 경우입니다.
    /// 배틀 스텝에서 넘기면 대미지 스텝을 거치지 않고 메인 2 로 갑니다.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Draw => Some(Phase::Standby),
            Phase::Standby => Some(Phase::Main1),
            Phase::Main1 => Some(Phase::BattleStart),
            Phase::BattleStart => Some(Phase::BattleStep),
            Phase::BattleStep => Some(Phase::Main2),
            Phase::BattleDamage => Some(Phase::BattleStep),
            Phase::Main2 => Some(Phase::End),
            Phase::End => None,
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, Phase::Main1 | Phase::Main2)
    }

    /// 필수 처리(드로우, 스탠바이 유발)가 있어서 건너뛸 수 없는 페이즈.
    pub fn has_mandatory_actions(&self) -> bool {
        matches!(self, Phase::Draw | Phase::Standby)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Draw => "Draw",
            Phase::Standby => "Standby",
            Phase::Main1 => "Main1",
            Phase::BattleStart => "BattleStart",
            Phase::BattleStep => "BattleStep",
            Phase::BattleDamage => "BattleDamage",
            Phase::Main2 => "Main2",
            Phase::End => "End",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_walk_forward_to_end() {
        let mut phase = Phase::Draw;
        let mut visited = vec![phase];
        while let Some(next) = phase.next() {
            visited.push(next);
            phase = next;
        }
        assert_eq!(
            visited,
            vec![
                Phase::Draw,
                Phase::Standby,
                Phase::Main1,
                Phase::BattleStart,
                Phase::BattleStep,
                Phase::Main2,
                Phase::End
            ]
        );
    }

    #[test]
    fn damage_step_returns_to_battle_step() {
        assert_eq!(Phase::BattleDamage.next(), Some(Phase::BattleStep));
    }
}
