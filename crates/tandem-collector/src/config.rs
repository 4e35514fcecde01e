//! 트리별 설정 모듈.
//!
//! 설정 우선순위 (낮음 → 높음):
//! 1. 코드 기본값
//! 2. `config/tree-{id}.toml` (없어도 됨)
//! 3. `TANDEM__` 접두사 환경변수 (예: `TANDEM__SCHEDULER__INTERVAL_SECS=30`)
//! 4. `DATABASE_URL`, `KAIKO_API_KEY`

use crate::{CollectorError, Result};
use chrono::Duration as ChronoDuration;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tandem_data::DatabaseConfig;
use tandem_vendor::KaikoConfig;

/// 설정 파일 디렉터리 기본값
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Collector 전체 설정
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// 설정 트리 ID
    pub tree_id: i64,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 데이터 공급자 설정
    pub vendor: KaikoConfig,
    /// 수집 사이클 설정
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// 스케줄러 설정
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// 완료되지 않은 실행을 발견했을 때의 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenRunPolicy {
    /// 오류를 기록하고 운영자가 정리할 때까지 수집을 멈춤
    #[default]
    Halt,
    /// 열린 실행을 삭제하고 수집을 계속함
    Discard,
}

/// 수집 사이클 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// 이전 실행이 없을 때 거슬러 올라갈 기간 (초)
    pub default_lookback_secs: u64,
    /// 데이터를 가져오기 전에 열린 실행을 먼저 기록할지 여부
    pub journal_runs: bool,
    /// 열린 실행 처리 방식
    pub open_run_policy: OpenRunPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_lookback_secs: 3600,
            journal_runs: false,
            open_run_policy: OpenRunPolicy::Halt,
        }
    }
}

impl OrchestratorConfig {
    /// 기본 조회 기간을 chrono Duration으로 반환
    pub fn default_lookback(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.default_lookback_secs as i64)
    }
}

/// 스케줄러 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 사이클 사이 대기 시간 (초)
    pub interval_secs: u64,
    /// 한 사이클의 최대 실행 시간 (초)
    pub cycle_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            cycle_timeout_secs: 300,
        }
    }
}

impl SchedulerConfig {
    /// 사이클 사이 대기 시간을 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// 사이클 최대 실행 시간을 Duration으로 반환
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }
}

/// 트리 ID에 해당하는 설정 파일 경로
pub fn profile_path(dir: impl AsRef<Path>, tree_id: i64) -> PathBuf {
    dir.as_ref().join(format!("tree-{}.toml", tree_id))
}

impl CollectorConfig {
    /// 트리 ID의 설정을 기본 디렉터리에서 로드
    pub fn load(tree_id: i64) -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_DIR, tree_id)
    }

    /// 트리 ID의 설정을 주어진 디렉터리에서 로드
    pub fn load_from(dir: impl AsRef<Path>, tree_id: i64) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = profile_path(dir, tree_id);
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix("TANDEM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("vendor.api_key", std::env::var("KAIKO_API_KEY").ok())?;

        Self::build(builder, tree_id)
    }

    /// TOML 문자열에서 설정을 로드 (환경변수 미적용)
    pub fn from_toml_str(toml: &str, tree_id: i64) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::build(builder, tree_id)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        tree_id: i64,
    ) -> Result<Self> {
        let config: Self = builder
            .set_override("tree_id", tree_id)?
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.vendor.has_api_key() {
            return Err(CollectorError::Config(
                "vendor.api_key is empty (set KAIKO_API_KEY)".to_string(),
            ));
        }
        if self.orchestrator.default_lookback_secs == 0 {
            return Err(CollectorError::Config(
                "orchestrator.default_lookback_secs must be positive".to_string(),
            ));
        }
        if self.scheduler.cycle_timeout_secs == 0 {
            return Err(CollectorError::Config(
                "scheduler.cycle_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
