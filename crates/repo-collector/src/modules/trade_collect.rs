//! REPO 거래 수집 모듈.
//!
//! 기준일자를 하루씩 순회하며 모든 페이지를 받아 저장하고, 결과를
//! `collection_status` 원장에 기록합니다. 중간에 중단되어도 upsert가
//! 멱등이므로 다시 실행하면 `completed`가 아닌 날짜부터 이어서 수집합니다.

use crate::config::CollectConfig;
use crate::{CollectionStats, Result};
use chrono::NaiveDate;
use repo_core::{
    collect_span, days_in_range, is_weekend, weekday_count, weekday_name, CollectionStatus,
    RepoTradePage,
};
use repo_data::{RepoStore, RepoTradeSource};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// 진행 상황 로그 주기 (페이지)
const PROGRESS_EVERY_PAGES: u32 = 5;

/// 수집 루프 설정
#[derive(Debug, Clone)]
pub struct CollectSettings {
    /// 페이지당 행 수
    pub page_size: u32,
    /// 페이지 요청 간 딜레이
    pub page_delay: Duration,
    /// 영업일 간 딜레이
    pub date_delay: Duration,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            page_delay: Duration::from_millis(500),
            date_delay: Duration::from_millis(500),
        }
    }
}

impl From<&CollectConfig> for CollectSettings {
    fn from(config: &CollectConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            page_delay: config.page_delay(),
            date_delay: config.date_delay(),
        }
    }
}

/// 기준일자 하루의 수집 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOutcome {
    /// 모든 페이지 저장
    Completed { total_count: u64, stored: u64 },
    /// 일부 페이지 실패
    Partial {
        total_count: u64,
        stored: u64,
        failed_pages: Vec<u32>,
    },
    /// 조회 성공, 거래 없음
    NoData,
    /// 첫 페이지 조회 실패 (원장 기록 없음)
    Failed(String),
}

/// 기간 내 REPO 거래 수집
pub async fn collect_range(
    store: &RepoStore,
    source: &dyn RepoTradeSource,
    settings: &CollectSettings,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<CollectionStats> {
    let started = Instant::now();
    let mut stats = CollectionStats::new();

    let total_days = days_in_range(start, end).count();
    let weekdays = weekday_count(start, end);
    tracing::info!(
        start = %start,
        end = %end,
        total_days,
        weekdays,
        weekends = total_days - weekdays,
        page_size = settings.page_size,
        "REPO 거래 수집 시작"
    );

    let mut processed = 0usize;
    for date in days_in_range(start, end) {
        if is_weekend(date) {
            stats.weekend += 1;
            tracing::debug!(base_date = %date, weekday = weekday_name(date), "주말 건너뜀");
            continue;
        }

        stats.total += 1;
        processed += 1;

        if store.is_completed(date).await? {
            stats.skipped += 1;
            tracing::debug!(base_date = %date, "이미 수집 완료, 건너뜀");
            continue;
        }

        tracing::info!(
            base_date = %date,
            weekday = weekday_name(date),
            progress = format!("{}/{}", processed, weekdays),
            "수집 시작"
        );

        let outcome = collect_date(store, source, settings, date)
            .instrument(collect_span!("collect_date", date))
            .await?;

        match outcome {
            DateOutcome::Completed { stored, .. } => {
                stats.success += 1;
                stats.total_trades += stored as usize;
            }
            DateOutcome::Partial { stored, .. } => {
                stats.partial += 1;
                stats.total_trades += stored as usize;
            }
            DateOutcome::NoData => stats.empty += 1,
            DateOutcome::Failed(_) => stats.errors += 1,
        }

        tokio::time::sleep(settings.date_delay).await;
    }

    stats.elapsed = started.elapsed();
    Ok(stats)
}

/// 기준일자 하루 수집.
///
/// API 실패는 결과로 돌려주고, 저장소 오류만 `Err`로 전파합니다.
pub async fn collect_date(
    store: &RepoStore,
    source: &dyn RepoTradeSource,
    settings: &CollectSettings,
    date: NaiveDate,
) -> Result<DateOutcome> {
    let first = match source.fetch_page(date, 1, settings.page_size).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!(base_date = %date, error = %e, "첫 페이지 조회 실패");
            return Ok(DateOutcome::Failed(e.to_string()));
        }
    };

    let total_count = first.total_count;
    if total_count == 0 {
        store
            .record_status(date, 0, 0, CollectionStatus::NoData)
            .await?;
        tracing::info!(base_date = %date, "데이터 없음 (휴일 가능)");
        return Ok(DateOutcome::NoData);
    }

    let total_pages = RepoTradePage::page_count(total_count, settings.page_size);
    tracing::info!(base_date = %date, total_count, total_pages, "전체 건수 확인");

    let mut stored = store.upsert_trades(&first.trades).await?;
    let mut failed_pages = Vec::new();

    for page_no in 2..=total_pages {
        tokio::time::sleep(settings.page_delay).await;

        match source.fetch_page(date, page_no, settings.page_size).await {
            Ok(page) => {
                stored += store.upsert_trades(&page.trades).await?;
            }
            Err(e) => {
                tracing::warn!(base_date = %date, page_no, error = %e, "페이지 조회 실패");
                failed_pages.push(page_no);
            }
        }

        if page_no % PROGRESS_EVERY_PAGES == 0 {
            tracing::info!(
                base_date = %date,
                progress = format!("{}/{}", page_no, total_pages),
                stored,
                "페이지 수집 중"
            );
        }
    }

    let status = if failed_pages.is_empty() {
        CollectionStatus::Completed
    } else {
        CollectionStatus::Partial
    };
    store
        .record_status(date, total_count as i64, stored as i64, status)
        .await?;

    if failed_pages.is_empty() {
        tracing::info!(base_date = %date, total_count, stored, "수집 및 저장 완료");
        Ok(DateOutcome::Completed {
            total_count,
            stored,
        })
    } else {
        tracing::warn!(
            base_date = %date,
            total_count,
            stored,
            failed_pages = ?failed_pages,
            "일부 페이지 누락, 다음 실행에서 재수집"
        );
        Ok(DateOutcome::Partial {
            total_count,
            stored,
            failed_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = CollectConfig {
            page_size: 0,
            page_delay_ms: 100,
            date_delay_ms: 200,
            start_date: None,
            end_date: None,
        };
        let settings = CollectSettings::from(&config);
        assert_eq!(settings.page_size, 1);
        assert_eq!(settings.page_delay, Duration::from_millis(100));
        assert_eq!(settings.date_delay, Duration::from_millis(200));
    }

    #[test]
    fn test_default_settings() {
        let settings = CollectSettings::default();
        assert_eq!(settings.page_size, 1000);
        assert_eq!(settings.page_delay, Duration::from_millis(500));
    }
}
