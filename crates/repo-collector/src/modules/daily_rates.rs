//! 일별 가중평균(VWAP) REPO 금리 생성 모듈.

use crate::config::RatesConfig;
use crate::Result;
use chrono::NaiveDate;
use repo_core::{parse_base_date, DailyRateTable};
use repo_data::{open_sqlite, write_daily_rates, RepoStore, VwapFilter};
use std::path::Path;

/// 설정과 기간으로 계산 필터 생성
pub fn rate_filter(config: &RatesConfig, from: NaiveDate, to: NaiveDate) -> VwapFilter {
    VwapFilter {
        currency_name: config.currency_name.clone(),
        term_name: config.term_name.clone(),
        from,
        to,
    }
}

/// 계산 기간 결정. 지정하지 않은 쪽은 저장된 데이터의 처음/끝 날짜를 씁니다.
///
/// 저장된 거래가 없고 기간도 없으면 `None`.
pub async fn resolve_range(
    store: &RepoStore,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Option<(NaiveDate, NaiveDate)>> {
    if let (Some(from), Some(to)) = (from, to) {
        return Ok(Some((from, to)));
    }

    let stats = store.stats().await?;
    let first = stats.first_date.as_deref().map(parse_base_date).transpose()?;
    let last = stats.last_date.as_deref().map(parse_base_date).transpose()?;

    Ok(match (from.or(first), to.or(last)) {
        (Some(from), Some(to)) => Some((from, to)),
        _ => None,
    })
}

/// 일별 금리 테이블 계산 (담보별 + 전체)
pub async fn compute_daily_rates(store: &RepoStore, filter: &VwapFilter) -> Result<DailyRateTable> {
    let points = store.vwap_points(filter).await?;
    let table = DailyRateTable::from_points(points);

    match table.date_range() {
        Some((first, last)) => tracing::info!(
            currency = %filter.currency_name,
            term = %filter.term_name,
            days = table.rows.len(),
            collaterals = table.columns.len().saturating_sub(1),
            first = %first,
            last = %last,
            "일별 가중평균 금리 계산 완료"
        ),
        None => tracing::warn!(
            currency = %filter.currency_name,
            term = %filter.term_name,
            from = %filter.from,
            to = %filter.to,
            "조건에 맞는 거래가 없습니다"
        ),
    }

    Ok(table)
}

/// 금리 테이블을 SQLite 파일에 저장 (기존 테이블 교체)
pub async fn write_rates_file(path: &Path, table: &DailyRateTable) -> Result<u64> {
    let pool = open_sqlite(&path.to_string_lossy()).await?;
    let written = write_daily_rates(&pool, table).await;
    pool.close().await;
    Ok(written?)
}

/// 계산 후 파일 저장까지 한 번에 수행
pub async fn build_daily_rates(
    store: &RepoStore,
    filter: &VwapFilter,
    output: &Path,
) -> Result<DailyRateTable> {
    let table = compute_daily_rates(store, filter).await?;
    let written = write_rates_file(output, &table).await?;
    tracing::info!(output = %output.display(), rows = written, "일별 금리 파일 저장 완료");
    Ok(table)
}
