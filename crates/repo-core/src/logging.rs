//! tracing을 사용한 로깅 초기화.
//!
//! 수집기는 세 가지 출력 형식을 지원합니다:
//! - **pretty**: 개발용 사람이 읽기 쉬운 형식
//! - **json**: 로그 집계용 JSON 형식 (현재 수집 중인 기준일자 span 포함)
//! - **compact**: 장기간 수집 시 로그 크기를 줄이는 한 줄 형식

use crate::error::{CoreError, CoreResult};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// 로그 레벨을 적용할 수집기 크레이트
const COLLECTOR_TARGETS: [&str; 3] = ["repo_collector", "repo_data", "repo_core"];

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 색상이 포함된 사람이 읽기 쉬운 형식
    #[default]
    Pretty,
    /// JSON 형식
    Json,
    /// 간결한 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` 지시문 (예: "repo_collector=debug")
    pub level: String,
    /// 출력 형식
    pub format: LogFormat,
}

impl LogConfig {
    /// 새 로그 설정을 생성합니다.
    ///
    /// 단순 레벨("debug")은 수집기 크레이트에만 적용되어 sqlx/reqwest
    /// 내부 로그가 섞이지 않습니다.
    pub fn new(level: &str) -> Self {
        Self {
            level: crate_filter(level),
            format: LogFormat::default(),
        }
    }

    /// 로그 형식을 설정합니다.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// 단순 레벨을 수집기 크레이트별 필터로 확장합니다.
///
/// 이미 `target=level` 형태의 지시문이면 그대로 둡니다.
pub fn crate_filter(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    COLLECTOR_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// 주어진 설정으로 로깅 시스템을 초기화합니다.
///
/// `RUST_LOG`가 설정되어 있으면 `config.level`보다 우선합니다.
///
/// ```no_run
/// use repo_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::new("debug").with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> CoreResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CoreError::Logging(format!("잘못된 로그 필터 '{}': {}", config.level, e)))?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| CoreError::Logging(e.to_string()))?;

    tracing::debug!(format = ?config.format, level = %config.level, "Logging initialized");
    Ok(())
}

/// 기준일자 필드가 포함된 span을 생성하는 매크로.
#[macro_export]
macro_rules! collect_span {
    ($name:expr, $base_date:expr) => {
        tracing::info_span!($name, base_date = %$base_date)
    };
}
