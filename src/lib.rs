use std::sync::Once;

use once_cell::sync::OnceCell;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod card;
pub mod config;
pub mod effect;
pub mod enums;
pub mod exception;
pub mod game;
pub mod player;
pub mod resource;
pub mod sync;
pub mod test;
pub mod zone;

use crate::config::LoggingConfig;

static INIT: Once = Once::new();
static GUARD: OnceCell<WorkerGuard> = OnceCell::new();

pub fn setup_logger() {
    setup_logger_with(&LoggingConfig::default());
}

/// `RUST_LOG` 가 있으면 그것을, 없으면 설정의 레벨을 씁니다.
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn setup_logger_with(logging: &LoggingConfig) {
    INIT.call_once(|| {
        // 1. 파일 로거 설정
        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &logging.directory, &logging.filename);
        let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(file_appender);

        // 2. 로그 레벨 필터 설정
        let filter = log_filter(&logging.level);

        // 3. 파일 출력 레이어 설정
        let file_layer = fmt::layer()
            .with_writer(non_blocking_file_writer)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .pretty();

        // 4. 레지스트리에 필터와 레이어 결합
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .try_init();

        let _ = GUARD.set(guard);

        tracing::info!(
            "로거 초기화 완료: 파일({}/{}) 출력 활성화.",
            logging.directory,
            logging.filename
        );
    });
}

pub trait LogExt<T, E> {
    fn log_ok(self, f: impl FnOnce()) -> Self;
    fn log_err(self, f: impl FnOnce(&E)) -> Self;
}

impl<T, E> LogExt<T, E> for Result<T, E> {
    fn log_ok(self, f: impl FnOnce()) -> Self {
        if self.is_ok() {
            f()
        }
        self
    }

    fn log_err(self, f: impl FnOnce(&E)) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}

#[cfg(test)]
mod logger_tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn filter_follows_configured_level_unless_env_overrides() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(log_filter("debug").to_string(), "debug");
        assert_eq!(log_filter("duel_core=trace").to_string(), "duel_core=trace");

        std::env::set_var("RUST_LOG", "warn");
        let filter = log_filter("debug");
        std::env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn default_logging_section_matches_log_constants() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.directory, crate::enums::LOG_DIR);
        assert_eq!(logging.filename, crate::enums::LOG_FILE_NAME);
        assert_eq!(logging.level, "info");
    }
}
