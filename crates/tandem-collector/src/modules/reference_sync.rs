//! 참조 데이터(거래소, 심볼) 동기화 모듈.
//!
//! 공급자 목록과 저장된 목록의 차이(새 코드)만 저장합니다.

use crate::{CollectionStats, Result};
use std::collections::HashSet;
use std::time::Instant;
use tandem_core::currency_type_ids;
use tandem_data::StorageGateway;
use tandem_vendor::MarketDataVendor;

/// 거래소 목록 동기화
pub async fn sync_exchanges(
    store: &dyn StorageGateway,
    vendor: &dyn MarketDataVendor,
) -> Result<CollectionStats> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    tracing::info!(vendor = vendor.name(), "거래소 동기화 시작");

    let fetched = vendor.fetch_exchanges().await?;
    let known: HashSet<String> = store
        .exchanges()
        .await?
        .into_iter()
        .map(|e| e.code)
        .collect();

    stats.total = fetched.len();
    stats.fetched = fetched.len();

    let new: Vec<_> = fetched
        .into_iter()
        .filter(|e| !known.contains(&e.code))
        .collect();
    stats.skipped = stats.total - new.len();

    if new.is_empty() {
        tracing::info!("새 거래소 없음");
    } else {
        stats.inserted = store.insert_exchanges(&new).await?;
        stats.success = stats.inserted;
        tracing::info!(count = stats.inserted, "거래소 저장 완료");
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// 심볼(자산) 목록 동기화
pub async fn sync_symbols(
    store: &dyn StorageGateway,
    vendor: &dyn MarketDataVendor,
) -> Result<CollectionStats> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    tracing::info!(vendor = vendor.name(), "심볼 동기화 시작");

    // 1. 통화 유형 이름 → ID
    let currency_types = currency_type_ids(&store.currency_types().await?);
    if currency_types.is_empty() {
        tracing::warn!("통화 유형이 없어 모든 자산이 건너뛰어집니다");
    }

    // 2. 공급자 자산 조회
    let fetched = vendor.fetch_assets(&currency_types).await?;
    let known: HashSet<String> = store
        .symbols()
        .await?
        .into_iter()
        .map(|s| s.code)
        .collect();

    stats.total = fetched.len();
    stats.fetched = fetched.len();

    // 3. 새 심볼만 저장
    let new: Vec<_> = fetched
        .into_iter()
        .filter(|s| !known.contains(&s.code))
        .collect();
    stats.skipped = stats.total - new.len();

    if !new.is_empty() {
        stats.inserted = store.insert_symbols(&new).await?;
        stats.success = stats.inserted;
        tracing::info!(count = stats.inserted, "심볼 저장 완료");
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}
