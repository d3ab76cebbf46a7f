use std::{collections::HashMap, path::Path};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::{
    effect::EffectDefinition,
    exception::InternalError,
    game::summon::SummonMethod,
};

use super::types::{Attribute, CardType, MonsterFrame};

pub type CatalogId = u32;

/// 카드 카탈로그에 들어 있는 정적 카드 정의.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDefinition {
    pub id: CatalogId,
    pub name: String,
    pub card_type: CardType,
    #[serde(default)]
    pub attribute: Option<Attribute>,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub archetypes: Vec<String>,
    /// 레벨. 엑시즈는 랭크, 링크는 링크 마커 수로 씁니다.
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub defense: i32,
    #[serde(default)]
    pub tuner: bool,
    #[serde(default)]
    pub pendulum_scale: Option<u8>,
    #[serde(default)]
    pub materials: Option<MaterialRequirement>,
    #[serde(default)]
    pub effects: Vec<EffectDefinition>,
}

impl CardDefinition {
    pub fn effect(&self, index: usize) -> Option<&EffectDefinition> {
        self.effects.get(index)
    }

    /// 어드밴스 소환에 필요한 릴리스 수.
    pub fn tributes_required(&self) -> usize {
        match self.level {
            0..=4 => 0,
            5 | 6 => 1,
            _ => 2,
        }
    }

    pub fn has_archetype(&self, archetype: &str) -> bool {
        self.archetypes.iter().any(|a| a == archetype)
    }
}

/// 소재 조건, 서치 조건 등에 쓰이는 카드 술어.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CardPredicate {
    Any,
    Named(String),
    Archetype(String),
    Attribute(Attribute),
    Race(String),
    Level(u8),
    MinLevel(u8),
    Frame(MonsterFrame),
    Tuner,
    NonTuner,
    Monster,
    Spell,
    Trap,
}

impl CardPredicate {
    pub fn matches(&self, def: &CardDefinition) -> bool {
        match self {
            CardPredicate::Any => true,
            CardPredicate::Named(name) => def.name == *name,
            CardPredicate::Archetype(archetype) => def.has_archetype(archetype),
            CardPredicate::Attribute(attribute) => def.attribute == Some(*attribute),
            CardPredicate::Race(race) => def.race.as_deref() == Some(race.as_str()),
            CardPredicate::Level(level) => def.card_type.is_monster() && def.level == *level,
            CardPredicate::MinLevel(level) => def.card_type.is_monster() && def.level >= *level,
            CardPredicate::Frame(frame) => def.card_type == CardType::Monster(*frame),
            CardPredicate::Tuner => def.card_type.is_monster() && def.tuner,
            CardPredicate::NonTuner => def.card_type.is_monster() && !def.tuner,
            CardPredicate::Monster => def.card_type.is_monster(),
            CardPredicate::Spell => def.card_type.is_spell(),
            CardPredicate::Trap => def.card_type.is_trap(),
        }
    }
}

/// 엑스트라 덱 몬스터의 소재 조건.
///
/// `materials` 의 각 술어는 서로 다른 소재 한 장씩과 짝지어져야 하고,
/// `count` 가 있으면 그만큼의 소재를 정확히 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub method: SummonMethod,
    #[serde(default)]
    pub materials: Vec<CardPredicate>,
    #[serde(default)]
    pub count: Option<usize>,
}

impl MaterialRequirement {
    pub fn material_count(&self) -> usize {
        self.count.unwrap_or(self.materials.len()).max(self.materials.len())
    }
}

/// 카드 카탈로그 조회 인터페이스. 세션들이 읽기 전용으로 공유합니다.
pub trait CardCatalog: Send + Sync {
    fn get_card(&self, id: CatalogId) -> Option<&CardDefinition>;

    /// 덱 검증을 통과한 카드는 반드시 존재해야 하므로, 없으면 내부 오류입니다.
    fn require(&self, id: CatalogId) -> Result<&CardDefinition, InternalError> {
        self.get_card(id).ok_or(InternalError::CatalogMiss(id))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogJson {
    cards: Vec<CardDefinition>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    cards: HashMap<CatalogId, CardDefinition>,
}

impl InMemoryCatalog {
    pub fn from_definitions(defs: impl IntoIterator<Item = CardDefinition>) -> anyhow::Result<Self> {
        let mut cards = HashMap::new();
        for def in defs {
            let id = def.id;
            if cards.insert(id, def).is_some() {
                bail!("duplicate catalog id {}", id);
            }
        }
        Ok(Self { cards })
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let parsed: CatalogJson =
            serde_json::from_str(json).context("failed to parse card catalog json")?;
        Self::from_definitions(parsed.cards)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read card catalog {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardCatalog for InMemoryCatalog {
    fn get_card(&self, id: CatalogId) -> Option<&CardDefinition> {
        self.cards.get(&id)
    }
}
