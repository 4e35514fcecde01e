//! 데이터 공급자 커넥터.

pub mod kaiko;

pub use kaiko::{KaikoClient, KaikoConfig};
