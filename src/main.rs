use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use uuid::Uuid;

use duel_core::{
    card::{
        catalog::{CardCatalog, InMemoryCatalog},
        types::PlayerKind,
    },
    config::EngineConfig,
    enums::CARD_JSON_PATH,
    game::{
        session::{DeckList, DuelSession},
        snapshot::Viewer,
    },
    setup_logger_with, LogExt,
    sync::SessionHandle,
};

#[derive(Parser)]
#[command(
    name = "duel engine",                    // 프로그램 이름
    author = env!("CARGO_PKG_AUTHORS"),       // 작성자
    version = env!("CARGO_PKG_VERSION"),      // 버전
    about = env!("CARGO_PKG_DESCRIPTION"),    // 짧은 설명
    long_about = None,                        // 긴 설명 (None은 미사용)
)]
struct Args {
    #[arg(long = "p1_deck")]
    #[arg(required = true)]
    player_1_deck: PathBuf,

    #[arg(long = "p2_deck")]
    #[arg(required = true)]
    player_2_deck: PathBuf,

    #[arg(long, default_value = CARD_JSON_PATH)]
    catalog: PathBuf,

    /// 설정 파일. 없으면 `DUEL_CONFIG` 또는 기본 경로를 씁니다.
    #[arg(long)]
    config: Option<PathBuf>,

    /// 덱 셔플 시드
    #[arg(long)]
    seed: Option<u64>,
}

fn read_deck(path: &PathBuf) -> anyhow::Result<DeckList> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read deck {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse deck {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from(path.clone())?,
        None => duel_core::config::init()?.clone(),
    };
    setup_logger_with(&config.logging);
    if args.seed.is_some() {
        config.rules.seed = args.seed;
    }

    let catalog: Arc<dyn CardCatalog> = Arc::new(InMemoryCatalog::load(&args.catalog)?);
    let mut session = DuelSession::new(Uuid::new_v4(), &config, catalog);
    session.bind_player(PlayerKind::Player1, Uuid::new_v4(), read_deck(&args.player_1_deck)?)?;
    session.bind_player(PlayerKind::Player2, Uuid::new_v4(), read_deck(&args.player_2_deck)?)?;
    session.start().log_ok(|| {
        info!(
            "session {} ready, response window {:?}, disconnect grace {:?}",
            session.id(),
            config.timing.response_timeout(),
            config.timing.disconnect_grace()
        )
    })?;

    let (handle, task) = SessionHandle::spawn(session);
    for viewer in [
        Viewer::Player(PlayerKind::Player1),
        Viewer::Player(PlayerKind::Player2),
        Viewer::Spectator,
    ] {
        let snapshot = handle.snapshot(viewer).await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    handle.abandon().await?;
    drop(handle);
    let session = task.await?;
    info!("session {} closed as {:?}", session.id(), session.status());
    Ok(())
}
