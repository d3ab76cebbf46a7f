use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::card::{types::Position, InstanceId};

use super::{phase::Phase, summon::SummonMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Draw,
    NormalSummon,
    SpecialSummon,
    SetCard,
    Activate,
    Attack,
    ChangePosition,
    Pass,
    Concede,
}

/// 플레이어가 제출하는 행동.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action_kind", content = "payload")]
pub enum Action {
    /// 자동 드로우가 꺼져 있을 때 드로우 페이즈에 직접 드로우합니다.
    Draw,
    /// 릴리스가 있으면 어드밴스 소환.
    NormalSummon {
        card: InstanceId,
        #[serde(default)]
        tributes: Vec<InstanceId>,
        #[serde(default)]
        set: bool,
    },
    SpecialSummon {
        card: InstanceId,
        method: SummonMethod,
        #[serde(default)]
        materials: Vec<InstanceId>,
        #[serde(default)]
        position: Position,
    },
    /// 마법/함정을 세트합니다.
    SetCard { card: InstanceId },
    Activate {
        source: InstanceId,
        #[serde(default)]
        effect_index: usize,
        #[serde(default)]
        targets: Vec<InstanceId>,
        #[serde(default)]
        cost_cards: Vec<InstanceId>,
    },
    Attack {
        attacker: InstanceId,
        #[serde(default)]
        target: Option<InstanceId>,
    },
    ChangePosition { card: InstanceId },
    /// 체인 중에는 우선권 넘기기, 아니면 페이즈 진행. `until` 이 있으면 그 페이즈까지 건너뜁니다.
    Pass {
        #[serde(default)]
        until: Option<Phase>,
    },
    Concede,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Draw => ActionKind::Draw,
            Action::NormalSummon { .. } => ActionKind::NormalSummon,
            Action::SpecialSummon { .. } => ActionKind::SpecialSummon,
            Action::SetCard { .. } => ActionKind::SetCard,
            Action::Activate { .. } => ActionKind::Activate,
            Action::Attack { .. } => ActionKind::Attack,
            Action::ChangePosition { .. } => ActionKind::ChangePosition,
            Action::Pass { .. } => ActionKind::Pass,
            Action::Concede => ActionKind::Concede,
        }
    }

    pub fn pass() -> Self {
        Action::Pass { until: None }
    }
}

/// 전송 계층에서 들어오는 행동 요청.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub session_id: Uuid,
    pub player_id: Uuid,
    #[serde(flatten)]
    pub action: Action,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_from_wire_json() {
        let session_id = Uuid::new_v4();
        let player_id = Uuid::new_v4();
        let json = format!(
            r#"{{
                "session_id": "{session_id}",
                "player_id": "{player_id}",
                "action_kind": "Activate",
                "payload": {{ "source": 7, "targets": [3] }}
            }}"#
        );
        let request: ActionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.session_id, session_id);
        assert_eq!(
            request.action,
            Action::Activate {
                source: InstanceId(7),
                effect_index: 0,
                targets: vec![InstanceId(3)],
                cost_cards: vec![],
            }
        );
        assert_eq!(request.action.kind(), ActionKind::Activate);
    }

    #[test]
    fn unit_actions_parse_without_payload() {
        let action: Action = serde_json::from_str(r#"{"action_kind": "Concede"}"#).unwrap();
        assert_eq!(action, Action::Concede);
    }
}
