//! Tandem 시장 데이터 수집기.
//!
//! 이 crate는 주기적으로 체결 데이터를 증분 수집하는 바이너리를 제공합니다:
//! - 수집 사이클 (`Orchestrator`): 실행 기록 기반 구간 결정과 원자적 저장
//! - 수집 루프 (`Scheduler`): 주기 실행, 취소, 사이클 시간 제한
//! - 참조 데이터 동기화 (거래소, 심볼)
//! - 트리 ID별 설정

pub mod clock;
pub mod config;
pub mod error;
pub mod modules;
pub mod orchestrator;
pub mod scheduler;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CollectorConfig, OpenRunPolicy, OrchestratorConfig, SchedulerConfig};
pub use error::{CollectorError, Result};
pub use orchestrator::{CycleOutcome, CycleReport, Orchestrator};
pub use scheduler::Scheduler;
pub use stats::CollectionStats;
