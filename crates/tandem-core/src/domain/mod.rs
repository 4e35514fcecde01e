//! 수집 운영을 위한 도메인 모델.

mod execution;
mod market_data;
mod reference;

pub use execution::*;
pub use market_data::*;
pub use reference::*;
