pub mod handler;
pub mod types;

use serde::{Deserialize, Serialize};

use crate::{card::catalog::CatalogId, enums::ZoneType};
use types::{Cost, EffectAction, EffectKind, EffectSpeed, Frequency, TargetSpec, TriggerEvent};

fn default_true() -> bool {
    true
}

/// 카탈로그에 데이터로 기술된 효과 하나.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub kind: EffectKind,
    pub speed: EffectSpeed,
    /// 유발 효과에서만 의미가 있습니다. 강제 유발은 자동으로 체인에 올라갑니다.
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub costs: Vec<Cost>,
    #[serde(default)]
    pub target: Option<TargetSpec>,
    /// 발동 위치를 카드 종류의 기본값 대신 직접 지정할 때.
    #[serde(default)]
    pub location: Option<ZoneType>,
    /// 대상이 발동 시점의 위치를 벗어나면 불발.
    #[serde(default = "default_true")]
    pub target_dependent: bool,
    /// 발동한 카드가 발동 시점의 위치를 벗어나면 불발.
    #[serde(default)]
    pub source_dependent: bool,
    pub action: EffectAction,
}

impl EffectDefinition {
    pub fn trigger_event(&self) -> Option<TriggerEvent> {
        match self.kind {
            EffectKind::Trigger { event } => Some(event),
            _ => None,
        }
    }

    pub fn expected_targets(&self) -> usize {
        self.target.map_or(0, |spec| spec.count)
    }
}

/// 1턴에 1번 / 듀얼 중 1번 제약의 키. 카드 이름(카탈로그 id) 단위로 묶입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectKey {
    pub catalog_id: CatalogId,
    pub index: usize,
}
