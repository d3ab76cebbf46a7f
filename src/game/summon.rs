use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    card::{
        catalog::{CardCatalog, CardDefinition, CardPredicate},
        types::{CardType, MonsterFrame, PlayerKind, Position},
        CardInstance, InstanceId,
    },
    enums::ZoneType,
    exception::{GameError, SummonError},
    zone::ZoneRef,
};

use super::{
    event::GameEvent,
    field::{FieldState, Placement},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummonMethod {
    Normal,
    Tribute,
    Fusion,
    Synchro,
    Xyz,
    Pendulum,
    Link,
}

impl SummonMethod {
    pub fn is_normal(&self) -> bool {
        matches!(self, SummonMethod::Normal | SummonMethod::Tribute)
    }

    fn extra_deck_frame(&self) -> Option<MonsterFrame> {
        match self {
            SummonMethod::Fusion => Some(MonsterFrame::Fusion),
            SummonMethod::Synchro => Some(MonsterFrame::Synchro),
            SummonMethod::Xyz => Some(MonsterFrame::Xyz),
            SummonMethod::Link => Some(MonsterFrame::Link),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummonRequest {
    pub card: InstanceId,
    pub method: SummonMethod,
    pub materials: Vec<InstanceId>,
    pub position: Position,
    /// 뒷면 수비 표시로 세트. 일반 소환에서만 가능합니다.
    pub set: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialMove {
    pub card: InstanceId,
    pub from: ZoneRef,
    pub to: ZoneType,
}

/// 검증이 끝난 소환. `commit_summon` 으로 필드에 반영합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummonPlan {
    pub player: PlayerKind,
    pub card: InstanceId,
    pub method: SummonMethod,
    pub from: ZoneRef,
    pub destination: ZoneRef,
    pub materials: Vec<MaterialMove>,
    pub placement: Placement,
    pub attack: i32,
    pub defense: i32,
}

fn not_summonable(reason: impl Into<String>) -> GameError {
    SummonError::NotSummonable {
        reason: reason.into(),
    }
    .into()
}

fn mismatch(reason: impl Into<String>) -> GameError {
    SummonError::MaterialMismatch {
        reason: reason.into(),
    }
    .into()
}

type Material<'f, 'c> = (&'f CardInstance, &'c CardDefinition);

/// 소환 요청을 검증하고 실행 계획을 만듭니다. 필드는 바꾸지 않습니다.
pub fn validate_summon(
    field: &FieldState,
    catalog: &dyn CardCatalog,
    player: PlayerKind,
    request: &SummonRequest,
) -> Result<SummonPlan, GameError> {
    let card = field.card(request.card)?;
    if card.owner != player {
        return Err(not_summonable(format!("{} is not yours", card.id)));
    }
    let def = catalog.require(card.catalog_id)?;
    let CardType::Monster(frame) = def.card_type else {
        return Err(not_summonable(format!("{} is not a monster", def.name)));
    };
    let materials = collect_materials(field, catalog, player, request)?;

    let material_moves = match request.method {
        SummonMethod::Normal | SummonMethod::Tribute => {
            validate_tribute(field, player, request, card, def, frame, &materials)?
        }
        SummonMethod::Pendulum => validate_pendulum(field, catalog, player, card, def, &materials)?,
        SummonMethod::Fusion | SummonMethod::Synchro | SummonMethod::Xyz | SummonMethod::Link => {
            validate_extra_deck(request.method, card, def, frame, &materials)?
        }
    };

    let monster_zone = ZoneRef::new(player, ZoneType::MonsterZone);
    let freed = material_moves
        .iter()
        .filter(|m| m.from == monster_zone)
        .count();
    let zone = field.zone(monster_zone);
    if zone.len() - freed >= zone.capacity().unwrap_or(usize::MAX) {
        return Err(SummonError::ZoneFull.into());
    }

    let placement = if request.set {
        if !request.method.is_normal() {
            return Err(not_summonable("only a normal summon can be set"));
        }
        Placement::set()
    } else {
        if request.method == SummonMethod::Link && request.position == Position::Defense {
            return Err(not_summonable("link monsters are always in attack position"));
        }
        Placement::face_up(request.position)
    };

    debug!(
        "{} validated {:?} summon of {} with {} materials",
        player,
        request.method,
        def.name,
        material_moves.len()
    );
    Ok(SummonPlan {
        player,
        card: card.id,
        method: request.method,
        from: card.location,
        destination: monster_zone,
        materials: material_moves,
        placement,
        attack: card.attack(),
        defense: card.defense(),
    })
}

fn collect_materials<'f, 'c>(
    field: &'f FieldState,
    catalog: &'c dyn CardCatalog,
    player: PlayerKind,
    request: &SummonRequest,
) -> Result<Vec<Material<'f, 'c>>, GameError> {
    let mut out: Vec<Material> = Vec::with_capacity(request.materials.len());
    for id in &request.materials {
        if *id == request.card {
            return Err(mismatch("a card cannot be its own material"));
        }
        if out.iter().any(|(m, _)| m.id == *id) {
            return Err(mismatch(format!("{} selected twice", id)));
        }
        let instance = field.card(*id)?;
        if instance.owner != player {
            return Err(mismatch(format!("{} is not yours", id)));
        }
        out.push((instance, catalog.require(instance.catalog_id)?));
    }
    Ok(out)
}

fn validate_tribute(
    field: &FieldState,
    player: PlayerKind,
    request: &SummonRequest,
    card: &CardInstance,
    def: &CardDefinition,
    frame: MonsterFrame,
    materials: &[Material],
) -> Result<Vec<MaterialMove>, GameError> {
    if card.location.zone != ZoneType::Hand {
        return Err(not_summonable("normal summons come from the hand"));
    }
    if frame == MonsterFrame::Ritual {
        return Err(not_summonable("ritual monsters need a ritual spell"));
    }
    if !field.player(player).can_normal_summon() {
        return Err(SummonError::AllowanceExhausted.into());
    }

    let required = def.tributes_required();
    if request.method == SummonMethod::Tribute && required == 0 {
        return Err(mismatch(format!("level {} needs no tribute", def.level)));
    }
    if materials.len() < required {
        return Err(SummonError::InsufficientMaterial {
            required,
            available: materials.len(),
        }
        .into());
    }
    if materials.len() > required {
        return Err(mismatch(format!(
            "{} tributes offered, {} required",
            materials.len(),
            required
        )));
    }

    let monster_zone = ZoneRef::new(player, ZoneType::MonsterZone);
    materials
        .iter()
        .map(|(instance, _)| {
            if instance.location != monster_zone {
                return Err(mismatch(format!("{} is not on your monster zone", instance.id)));
            }
            Ok(MaterialMove {
                card: instance.id,
                from: instance.location,
                to: ZoneType::Graveyard,
            })
        })
        .collect()
}

fn validate_extra_deck(
    method: SummonMethod,
    card: &CardInstance,
    def: &CardDefinition,
    frame: MonsterFrame,
    materials: &[Material],
) -> Result<Vec<MaterialMove>, GameError> {
    if method.extra_deck_frame() != Some(frame) {
        return Err(not_summonable(format!("{:?} monsters cannot be {:?} summoned", frame, method)));
    }
    if card.location.zone != ZoneType::ExtraDeck {
        return Err(not_summonable("must be summoned from the extra deck"));
    }
    let requirement = def
        .materials
        .as_ref()
        .filter(|req| req.method == method)
        .ok_or_else(|| not_summonable(format!("{} has no {:?} materials", def.name, method)))?;

    let needed = requirement.material_count();
    if materials.len() < needed {
        return Err(SummonError::InsufficientMaterial {
            required: needed,
            available: materials.len(),
        }
        .into());
    }
    if materials.len() > needed {
        return Err(mismatch(format!("{} materials offered, {} required", materials.len(), needed)));
    }

    for (instance, _) in materials {
        let zone = instance.location.zone;
        let allowed = match method {
            SummonMethod::Fusion => matches!(zone, ZoneType::Hand | ZoneType::MonsterZone),
            _ => zone == ZoneType::MonsterZone && instance.is_face_up(),
        };
        if !allowed {
            return Err(mismatch(format!("{} cannot be used from {}", instance.id, zone)));
        }
    }

    let defs: Vec<&CardDefinition> = materials.iter().map(|(_, def)| *def).collect();
    if !assign_predicates(&requirement.materials, &defs, &mut vec![false; defs.len()]) {
        return Err(mismatch(format!("materials do not satisfy {}", def.name)));
    }

    match method {
        SummonMethod::Synchro => {
            let tuners = defs.iter().filter(|d| d.tuner).count();
            if tuners != 1 {
                return Err(mismatch(format!("synchro needs exactly one tuner, got {}", tuners)));
            }
            let total: u32 = defs.iter().map(|d| d.level as u32).sum();
            if total != def.level as u32 {
                return Err(mismatch(format!("levels sum to {}, need {}", total, def.level)));
            }
        }
        SummonMethod::Xyz => {
            if let Some(odd) = defs.iter().find(|d| d.level != def.level || d.card_type.is_extra_deck()) {
                return Err(mismatch(format!("{} is not level {}", odd.name, def.level)));
            }
        }
        SummonMethod::Link => {
            if needed != def.level as usize {
                return Err(mismatch(format!("link {} needs {} materials", def.level, def.level)));
            }
        }
        _ => {}
    }

    let to = if method == SummonMethod::Xyz {
        ZoneType::Overlay
    } else {
        ZoneType::Graveyard
    };
    Ok(materials
        .iter()
        .map(|(instance, _)| MaterialMove {
            card: instance.id,
            from: instance.location,
            to,
        })
        .collect())
}

fn validate_pendulum(
    field: &FieldState,
    catalog: &dyn CardCatalog,
    player: PlayerKind,
    card: &CardInstance,
    def: &CardDefinition,
    materials: &[Material],
) -> Result<Vec<MaterialMove>, GameError> {
    if card.location.zone != ZoneType::Hand {
        return Err(not_summonable("pendulum summons come from the hand"));
    }
    if field.player(player).pendulum_summoned {
        return Err(SummonError::AllowanceExhausted.into());
    }
    if !materials.is_empty() {
        return Err(mismatch("pendulum summon takes no materials"));
    }

    let mut scales = vec![];
    for id in field.zone(ZoneRef::new(player, ZoneType::SpellTrapZone)).cards() {
        let Some(instance) = field.get(*id) else { continue };
        if !instance.is_face_up() {
            continue;
        }
        if let Some(scale) = catalog.require(instance.catalog_id)?.pendulum_scale {
            scales.push(scale);
        }
    }
    if scales.len() < 2 {
        return Err(SummonError::InsufficientMaterial {
            required: 2,
            available: scales.len(),
        }
        .into());
    }
    let low = scales.iter().copied().min().unwrap_or(0);
    let high = scales.iter().copied().max().unwrap_or(0);
    if !(low < def.level && def.level < high) {
        return Err(mismatch(format!(
            "level {} is not between scales {} and {}",
            def.level, low, high
        )));
    }
    Ok(vec![])
}

/// 술어 하나당 서로 다른 소재 하나가 대응되는지 백트래킹으로 찾습니다.
fn assign_predicates(preds: &[CardPredicate], defs: &[&CardDefinition], used: &mut Vec<bool>) -> bool {
    let Some((first, rest)) = preds.split_first() else {
        return true;
    };
    for (idx, def) in defs.iter().enumerate() {
        if used[idx] || !first.matches(def) {
            continue;
        }
        used[idx] = true;
        if assign_predicates(rest, defs, used) {
            return true;
        }
        used[idx] = false;
    }
    false
}

/// 검증된 소환 계획을 필드에 반영합니다.
pub fn commit_summon(field: &mut FieldState, plan: &SummonPlan, turn: u32) -> Result<Vec<GameEvent>, GameError> {
    let mut events = vec![];
    for material in &plan.materials {
        let owner = field.card(material.card)?.owner;
        field.move_card(
            material.card,
            material.from,
            ZoneRef::new(owner, material.to),
            None,
            turn,
        )?;
        match material.to {
            ZoneType::Overlay => field.card_mut(material.card)?.attached_to = Some(plan.card),
            ZoneType::Graveyard => events.push(GameEvent::SentToGraveyard {
                card: material.card,
            }),
            _ => {}
        }
    }

    field.move_card(plan.card, plan.from, plan.destination, Some(plan.placement), turn)?;

    let player = field.player_mut(plan.player);
    match plan.method {
        SummonMethod::Normal | SummonMethod::Tribute => player.normal_summons_used += 1,
        SummonMethod::Pendulum => player.pendulum_summoned = true,
        _ => {}
    }
    if plan.placement.face == crate::card::types::Face::Up {
        events.push(GameEvent::Summoned { card: plan.card });
    }
    info!(
        "{} {:?} summoned {} ({} materials)",
        plan.player,
        plan.method,
        plan.card,
        plan.materials.len()
    );
    Ok(events)
}
