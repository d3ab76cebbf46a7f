use std::{env as std_env, path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{card::catalog::CatalogId, enums::*};

/// 듀얼 엔진 전체 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rules: RulesConfig,
    pub deck: DeckRules,
    pub timing: TimingConfig,
    pub logging: LoggingConfig,
}

/// 동시에 발생한 유발 효과를 체인에 올리는 순서.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerOrder {
    /// 턴 플레이어의 유발을 먼저(아래에) 쌓습니다
    #[default]
    TurnPlayerFirst,
    /// 사건이 일어난 순서 그대로
    EventOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub starting_life_points: u32,
    pub opening_hand: usize,
    pub monster_zones: usize,
    pub spell_trap_zones: usize,
    pub normal_summon_allowance: u32,
    /// 선공 첫 턴 드로우 생략
    pub skip_first_draw: bool,
    pub first_turn_battle: bool,
    /// 드로우 페이즈 진입 시 자동으로 드로우
    pub auto_draw: bool,
    pub shuffle_decks: bool,
    pub seed: Option<u64>,
    pub trigger_order: TriggerOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckRules {
    pub min_main: usize,
    pub max_main: usize,
    pub max_extra: usize,
    pub max_copies: usize,
    pub banned: Vec<CatalogId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// 응답 윈도우 제한 시간. 지나면 암묵적으로 패스합니다.
    pub response_timeout_ms: u64,
    pub disconnect_grace_ms: u64,
}

impl TimingConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub filename: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            starting_life_points: STARTING_LIFE_POINTS,
            opening_hand: OPENING_HAND_SIZE,
            monster_zones: MONSTER_ZONE_SIZE,
            spell_trap_zones: SPELL_TRAP_ZONE_SIZE,
            normal_summon_allowance: NORMAL_SUMMON_ALLOWANCE,
            skip_first_draw: true,
            first_turn_battle: false,
            auto_draw: true,
            shuffle_decks: true,
            seed: None,
            trigger_order: TriggerOrder::default(),
        }
    }
}

impl Default for DeckRules {
    fn default() -> Self {
        Self {
            min_main: MIN_MAIN_DECK_SIZE,
            max_main: MAX_MAIN_DECK_SIZE,
            max_extra: MAX_EXTRA_DECK_SIZE,
            max_copies: MAX_COPIES_PER_CARD,
            banned: vec![],
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: RESPONSE_TIMEOUT_MS,
            disconnect_grace_ms: DISCONNECT_GRACE_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: LOG_DIR.to_string(),
            filename: LOG_FILE_NAME.to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules: RulesConfig::default(),
            deck: DeckRules::default(),
            timing: TimingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

static CONFIG: Lazy<EngineConfig> = Lazy::new(|| {
    dotenv::dotenv().ok();
    EngineConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config: {}. Using defaults.", e);
        EngineConfig::default()
    })
});

impl EngineConfig {
    /// 전역 설정 인스턴스 가져오기
    pub fn global() -> &'static EngineConfig {
        &CONFIG
    }

    /// 설정 파일 로드. `DUEL_CONFIG` 가 있으면 그 경로를 씁니다.
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std_env::var("DUEL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_PATH));
        Self::load_from(config_file)
    }

    pub fn load_from(config_file: PathBuf) -> Result<Self, ConfigError> {
        info!("Loading configuration from: {:?}", config_file);

        let settings = Config::builder()
            // 기본값 설정
            .add_source(Config::try_from(&Self::default())?)
            // 설정 파일 로드 (선택사항)
            .add_source(File::from(config_file).required(false))
            // 환경 변수 오버라이드 (DUEL__RULES__STARTING_LIFE_POINTS 형태)
            .add_source(Environment::with_prefix("DUEL").separator("__"))
            .build()?;

        let config: EngineConfig = settings.try_deserialize()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// 테스트 환경용 설정 생성. 덱 매수 제한을 풀고 셔플하지 않습니다.
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.logging.level = "trace".to_string();
        config.deck.min_main = 0;
        config.rules.shuffle_decks = false;
        config.rules.seed = Some(7);
        config.timing.response_timeout_ms = 200;
        config
    }
}

/// 설정 초기화 함수
pub fn init() -> anyhow::Result<&'static EngineConfig> {
    let config = EngineConfig::global();
    info!("Duel engine configuration initialized");
    debug!("Configuration: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_follow_advanced_format() {
        let config = EngineConfig::default();
        assert_eq!(config.rules.starting_life_points, 8000);
        assert_eq!(config.rules.opening_hand, 5);
        assert_eq!(config.deck.min_main, 40);
        assert_eq!(config.deck.max_main, 60);
        assert_eq!(config.deck.max_extra, 15);
        assert_eq!(config.rules.trigger_order, TriggerOrder::TurnPlayerFirst);
    }

    #[test]
    fn testing_preset_relaxes_deck_rules() {
        let config = EngineConfig::testing();
        assert_eq!(config.deck.min_main, 0);
        assert!(!config.rules.shuffle_decks);
        assert_eq!(config.timing.response_timeout(), Duration::from_millis(200));
    }

    #[test]
    #[serial]
    fn environment_overrides_file_defaults() {
        std_env::set_var("DUEL__RULES__STARTING_LIFE_POINTS", "4000");
        let config = EngineConfig::load_from(PathBuf::from("does/not/exist.toml")).unwrap();
        std_env::remove_var("DUEL__RULES__STARTING_LIFE_POINTS");

        assert_eq!(config.rules.starting_life_points, 4000);
        assert_eq!(config.rules.opening_hand, 5);
        assert!(config.deck.banned.is_empty());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    #[serial]
    fn partial_file_keeps_remaining_defaults() {
        let path = std_env::temp_dir().join("duel_core_partial_config.toml");
        std::fs::write(&path, "[deck]\nbanned = [12]\n\n[timing]\nresponse_timeout_ms = 500\n").unwrap();
        let config = EngineConfig::load_from(path.clone()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.deck.banned, vec![12]);
        assert_eq!(config.deck.max_main, 60);
        assert_eq!(config.timing.response_timeout(), Duration::from_millis(500));
        assert_eq!(config.rules, RulesConfig::default());
    }
}
