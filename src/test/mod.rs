//! 테스트에서 같이 쓰는 카탈로그, 덱, 세션 도우미.

use std::sync::Arc;

use ctor::ctor;
use once_cell::sync::Lazy;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::{
    card::{
        catalog::{CardCatalog, CatalogId, InMemoryCatalog},
        types::{Face, PlayerKind},
        InstanceId,
    },
    config::EngineConfig,
    enums::ZoneType,
    exception::GameError,
    game::{
        action::Action,
        field::FieldState,
        outcome::{ChannelSink, OutcomeEvent},
        phase::Phase,
        session::{DeckList, DuelSession},
        snapshot::StateSnapshot,
    },
    setup_logger,
    zone::ZoneRef,
};

/// `resource/cards.json` 에 들어 있는 카드 id.
pub mod ids {
    use crate::card::catalog::CatalogId;

    pub const FOOTMAN: CatalogId = 1;
    pub const EMBER_TUNER: CatalogId = 2;
    pub const GATE_WARDEN: CatalogId = 3;
    pub const COLOSSUS: CatalogId = 4;
    pub const GRAVE_WHISPER: CatalogId = 5;
    pub const ECHO_SPRITE: CatalogId = 6;

    pub const SHATTERING_BOLT: CatalogId = 10;
    pub const SWIFT_CUT: CatalogId = 11;
    pub const POT_OF_PLENTY: CatalogId = 12;
    pub const MIRROR_WARD: CatalogId = 13;
    pub const FINAL_VERDICT: CatalogId = 14;
    pub const ASHEN_RECRUIT: CatalogId = 15;
    pub const RALLYING_CRY: CatalogId = 16;
    pub const SUNFIRE_BURST: CatalogId = 17;
    pub const BATTLE_TACTICS: CatalogId = 18;
    pub const DESPERATE_GAMBIT: CatalogId = 19;

    pub const ASHEN_WARLORD: CatalogId = 20;
    pub const CINDER_DRAGON: CatalogId = 21;
    pub const TWIN_BLADE_KNIGHT: CatalogId = 22;
    pub const CIRCUIT_HOUND: CatalogId = 23;

    pub const SCALE_SEER_LOW: CatalogId = 30;
    pub const SCALE_SEER_HIGH: CatalogId = 31;
    pub const DAWN_HERALD: CatalogId = 32;
    pub const REACTIVE_GOLEM: CatalogId = 33;
}

static FIXTURE: Lazy<Arc<InMemoryCatalog>> = Lazy::new(|| {
    let catalog = InMemoryCatalog::from_json_str(include_str!("../../resource/cards.json"))
        .expect("Failed to parse cards.json");
    Arc::new(catalog)
});

pub fn fixture_catalog() -> Arc<InMemoryCatalog> {
    FIXTURE.clone()
}

/// 카드를 만들어 곧바로 `zone` 에 앞면으로 놓습니다. 소환 절차를 거치지 않습니다.
pub fn place(
    field: &mut FieldState,
    catalog: &InMemoryCatalog,
    catalog_id: CatalogId,
    owner: PlayerKind,
    zone: ZoneType,
) -> InstanceId {
    let def = catalog
        .get_card(catalog_id)
        .unwrap_or_else(|| panic!("card {} is not in the fixture catalog", catalog_id));
    let id = field
        .create_card(def, owner, zone)
        .unwrap_or_else(|e| panic!("cannot place {} in {}: {}", def.name, zone, e));
    if let Ok(card) = field.card_mut(id) {
        card.face = Face::Up;
    }
    id
}

pub fn test_config() -> EngineConfig {
    EngineConfig::testing()
}

/// 첫 항목이 덱 맨 위인 메인 덱.
pub fn deck(main: &[CatalogId]) -> DeckList {
    DeckList {
        main: main.to_vec(),
        extra: vec![],
    }
}

/// 좌석 두 개가 찬 채로 시작한 세션.
pub struct TestDuel {
    pub session: DuelSession,
    pub players: [Uuid; 2],
    pub outcomes: UnboundedReceiver<OutcomeEvent>,
}

impl TestDuel {
    pub fn start(p1: DeckList, p2: DeckList) -> Self {
        Self::with_config(test_config(), p1, p2)
    }

    pub fn with_config(config: EngineConfig, p1: DeckList, p2: DeckList) -> Self {
        let catalog: Arc<dyn CardCatalog> = fixture_catalog();
        let (sink, outcomes) = ChannelSink::new();
        let mut session =
            DuelSession::new(Uuid::new_v4(), &config, catalog).with_outcome_sink(Arc::new(sink));
        let players = [Uuid::new_v4(), Uuid::new_v4()];
        session
            .bind_player(PlayerKind::Player1, players[0], p1)
            .expect("player1 deck rejected");
        session
            .bind_player(PlayerKind::Player2, players[1], p2)
            .expect("player2 deck rejected");
        session.start().expect("duel failed to start");
        Self {
            session,
            players,
            outcomes,
        }
    }

    pub fn id_of(&self, kind: PlayerKind) -> Uuid {
        self.players[kind.index()]
    }

    pub fn act(&mut self, kind: PlayerKind, action: Action) -> Result<StateSnapshot, GameError> {
        let player_id = self.id_of(kind);
        self.session.submit_action(player_id, action)
    }

    pub fn cards_in(&self, kind: PlayerKind, zone: ZoneType) -> Vec<InstanceId> {
        self.session
            .field()
            .zone(ZoneRef::new(kind, zone))
            .cards()
            .to_vec()
    }

    pub fn hand(&self, kind: PlayerKind) -> Vec<InstanceId> {
        self.cards_in(kind, ZoneType::Hand)
    }

    /// `zone` 에서 해당 카탈로그 id 를 가진 첫 카드.
    pub fn find_in(&self, kind: PlayerKind, zone: ZoneType, catalog_id: CatalogId) -> Option<InstanceId> {
        let field = self.session.field();
        self.cards_in(kind, zone)
            .into_iter()
            .find(|id| field.get(*id).map_or(false, |card| card.catalog_id == catalog_id))
    }

    pub fn life(&self, kind: PlayerKind) -> u32 {
        self.session.field().player(kind).life_points()
    }

    pub fn to_phase(&mut self, phase: Phase) {
        let active = self.session.turn().current_turn();
        self.act(active, Action::Pass { until: Some(phase) })
            .unwrap_or_else(|e| panic!("cannot move to {}: {}", phase, e));
    }

    /// 턴 플레이어가 엔드 페이즈까지 넘기고 턴을 마칩니다.
    pub fn end_turn(&mut self) {
        let active = self.session.turn().current_turn();
        if self.session.turn().phase() != Phase::End {
            self.to_phase(Phase::End);
        }
        self.act(active, Action::pass())
            .unwrap_or_else(|e| panic!("cannot end the turn: {}", e));
    }
}

#[ctor]
fn init() {
    setup_logger();
}
