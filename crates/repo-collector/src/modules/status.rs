//! 수집 원장 조회 및 관리 모듈.
//!
//! - **상태 조회**: 최근 기준일자별 수집 상태, 기간 내 미수집 평일
//! - **초기화**: 특정 날짜를 다음 실행에서 다시 수집하도록 원장 행 삭제
//! - **연결 점검**: 작은 페이지로 API 응답 확인

use crate::Result;
use chrono::NaiveDate;
use repo_core::{days_in_range, format_base_date, is_weekend, weekday_name, CollectionRecord};
use repo_data::{FscRepoClient, RepoStore, StoreStats};
use std::fmt::Write as _;

/// 최근 원장 행 조회
pub async fn list_status(store: &RepoStore, limit: i64) -> Result<Vec<CollectionRecord>> {
    Ok(store.list_statuses(limit.max(1)).await?)
}

/// 원장 행 삭제. 삭제한 행이 있으면 `true`.
pub async fn reset_date(store: &RepoStore, date: NaiveDate) -> Result<bool> {
    let removed = store.clear_status(date).await?;
    if removed {
        tracing::info!(base_date = %date, "수집 상태 초기화 (다음 실행에서 재수집)");
    } else {
        tracing::warn!(base_date = %date, "초기화할 수집 상태가 없습니다");
    }
    Ok(removed)
}

/// 기간 내 아직 `completed`가 아닌 평일
pub async fn pending_dates(
    store: &RepoStore,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    let mut pending = Vec::new();
    for date in days_in_range(start, end).filter(|d| !is_weekend(*d)) {
        if !store.is_completed(date).await? {
            pending.push(date);
        }
    }
    Ok(pending)
}

/// API 연결 점검. 기준일자의 전체 건수를 반환합니다.
pub async fn check_api(client: &FscRepoClient, probe_date: NaiveDate) -> Result<u64> {
    tracing::info!(probe_date = %probe_date, "API 연결 확인 중");
    let total = client.ping(probe_date).await?;
    tracing::info!(probe_date = %probe_date, total_count = total, "API 연결 정상");
    Ok(total)
}

/// 원장 행을 표 형태 문자열로 변환
pub fn render_status_table(records: &[CollectionRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10}  {:<10}  {:>10}  {:>10}  {}",
        "basDt", "status", "total", "collected", "collected_at"
    );
    for record in records {
        let _ = writeln!(
            out,
            "{:<10}  {:<10}  {:>10}  {:>10}  {}",
            format_base_date(record.base_date),
            record.status.as_str(),
            record.total_count,
            record.collected_count,
            record.collected_at
        );
    }
    out
}

/// 미수집 평일 목록을 문자열로 변환
pub fn render_pending_dates(dates: &[NaiveDate]) -> String {
    let mut out = String::new();
    for date in dates {
        let _ = writeln!(out, "{}  {}", format_base_date(*date), weekday_name(*date));
    }
    let _ = writeln!(out, "미수집 평일: {}일", dates.len());
    out
}

/// 저장소 통계를 문자열로 변환
pub fn render_store_stats(stats: &StoreStats) -> String {
    format!(
        "총 거래 건수: {}\n데이터 기간: {} ~ {}\n수집 완료 일수: {}\n",
        stats.total_trades,
        stats.first_date.as_deref().unwrap_or("-"),
        stats.last_date.as_deref().unwrap_or("-"),
        stats.completed_dates
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_core::CollectionStatus;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_pending_dates_skips_weekend_and_completed() {
        let store = RepoStore::in_memory().await.unwrap();
        store
            .record_status(date(2), 1, 1, CollectionStatus::Completed)
            .await
            .unwrap();
        store
            .record_status(date(3), 2, 1, CollectionStatus::Partial)
            .await
            .unwrap();

        // 2025-01-02(목) ~ 2025-01-06(월)
        let pending = pending_dates(&store, date(2), date(6)).await.unwrap();
        assert_eq!(pending, vec![date(3), date(6)]);
    }

    #[tokio::test]
    async fn test_reset_date() {
        let store = RepoStore::in_memory().await.unwrap();
        store
            .record_status(date(2), 1, 1, CollectionStatus::Completed)
            .await
            .unwrap();

        assert!(reset_date(&store, date(2)).await.unwrap());
        assert!(!reset_date(&store, date(2)).await.unwrap());
        assert!(list_status(&store, 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_render_status_table() {
        let records = vec![CollectionRecord {
            base_date: date(2),
            total_count: 1200,
            collected_count: 1200,
            collected_at: "2025-01-03T09:00:00+09:00".to_string(),
            status: CollectionStatus::Completed,
        }];
        let table = render_status_table(&records);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("20250102"));
        assert!(lines[1].contains("completed"));
    }

    #[test]
    fn test_render_pending_dates() {
        let rendered = render_pending_dates(&[date(3), date(6)]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["20250103  금요일", "20250106  월요일", "미수집 평일: 2일"]);
    }

    #[test]
    fn test_render_store_stats_empty() {
        let rendered = render_store_stats(&StoreStats::default());
        assert!(rendered.contains("총 거래 건수: 0"));
        assert!(rendered.contains("- ~ -"));
    }
}
