//! 수집기 로깅 초기화.
//!
//! `tracing-subscriber` 레지스트리에 fmt 레이어와 `EnvFilter` 를 올립니다.
//! 형식은 pretty(개발), json(운영 로그 수집), compact 중 하나입니다.

use thiserror::Error;
use tracing_subscriber::{
    filter::ParseError,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer, Registry,
};

/// 로그 레벨을 적용할 워크스페이스 crate 목록.
const WORKSPACE_TARGETS: &[&str] = &[
    "tandem_core",
    "tandem_data",
    "tandem_vendor",
    "tandem_collector",
];

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("logger already installed: {0}")]
    Init(#[from] TryInitError),
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` 지시문 (예: "warn,tandem_collector=debug")
    pub filter: String,
    pub format: LogFormat,
    /// span 진입/종료 이벤트 출력 (사이클 소요 시간 확인용)
    pub span_events: bool,
    /// 파일명/줄 번호 출력
    pub with_file: bool,
}

impl LogConfig {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            format: LogFormat::default(),
            span_events: false,
            with_file: false,
        }
    }

    /// 외부 crate는 warn, 워크스페이스 crate는 `level` 로 거르는 설정.
    pub fn workspace(level: &str) -> Self {
        let mut filter = String::from("warn");
        for target in WORKSPACE_TARGETS {
            filter.push_str(&format!(",{target}={level}"));
        }
        Self::new(filter)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.span_events {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_file)
            .with_span_events(span_events);

        match self.format {
            LogFormat::Pretty => layer.pretty().boxed(),
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Compact => layer.compact().boxed(),
        }
    }
}

/// 전역 subscriber 를 설치합니다. `RUST_LOG` 가 있으면 `config.filter` 대신 사용합니다.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };

    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(filter)
        .try_init()?;

    tracing::debug!(format = ?config.format, filter = %config.filter, "로깅 초기화");
    Ok(())
}

/// 트리 ID를 필드로 가진 info span.
#[macro_export]
macro_rules! ingest_span {
    ($name:expr, $tree_id:expr) => {
        tracing::info_span!($name, tree_id = %$tree_id)
    };
}
