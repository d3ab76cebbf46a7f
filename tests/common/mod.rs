#![allow(dead_code)]

use ctor::ctor;
use duel_core::{
    card::{catalog::CatalogId, InstanceId},
    enums::ZoneType,
    game::{action::Action, session::DeckList},
    setup_logger,
    test::{deck, ids, TestDuel},
};

#[ctor]
fn init() {
    setup_logger();
}

/// 효과가 없는 몬스터로 채우는 카드. 한 종류당 3장을 넘지 않습니다.
const FILLER: [CatalogId; 6] = [
    ids::GATE_WARDEN,
    ids::GATE_WARDEN,
    ids::COLOSSUS,
    ids::COLOSSUS,
    ids::EMBER_TUNER,
    ids::EMBER_TUNER,
];

/// `top` 을 덱 맨 위부터 놓고 나머지를 채워 `len` 장으로 만듭니다.
pub fn padded(top: &[CatalogId], len: usize) -> DeckList {
    let mut main = top.to_vec();
    main.extend(FILLER.iter().copied().take(len.saturating_sub(top.len())));
    deck(&main)
}

pub fn activate(source: InstanceId, targets: Vec<InstanceId>) -> Action {
    Action::Activate {
        source,
        effect_index: 0,
        targets,
        cost_cards: vec![],
    }
}

pub fn summon(card: InstanceId) -> Action {
    Action::NormalSummon {
        card,
        tributes: vec![],
        set: false,
    }
}

pub fn zone_of(duel: &TestDuel, card: InstanceId) -> ZoneType {
    duel.session
        .field()
        .location(card)
        .map(|loc| loc.zone)
        .unwrap_or_else(|| panic!("{} is not tracked", card))
}

/// 카드를 패에서 찾습니다. 없으면 테스트 구성이 잘못된 것입니다.
pub fn in_hand(duel: &TestDuel, kind: duel_core::card::types::PlayerKind, id: CatalogId) -> InstanceId {
    duel.find_in(kind, ZoneType::Hand, id)
        .unwrap_or_else(|| panic!("card {} is not in the hand of {}", id, kind))
}
