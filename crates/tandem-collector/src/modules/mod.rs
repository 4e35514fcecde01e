//! 참조 데이터 동기화 모듈.

pub mod reference_sync;

pub use reference_sync::{sync_exchanges, sync_symbols};
