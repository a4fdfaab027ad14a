//! 수집 루프 통합 테스트.
//!
//! 메모리 SQLite 저장소와 응답을 미리 정해둔 데이터 소스로 수집 루프 전체를
//! 실행합니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use repo_collector::modules::{collect_date, collect_range, CollectSettings, DateOutcome};
use repo_core::{CollectionStatus, RepoTrade, RepoTradePage};
use repo_data::{DataError, RepoStore, RepoTradeSource};
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// 날짜별 전체 건수로 페이지를 만들어 주는 데이터 소스
#[derive(Default)]
struct ScriptedSource {
    totals: HashMap<NaiveDate, u64>,
    failing: Mutex<HashSet<(NaiveDate, u32)>>,
    calls: Mutex<Vec<(NaiveDate, u32)>>,
}

impl ScriptedSource {
    fn with_day(mut self, date: NaiveDate, total: u64) -> Self {
        self.totals.insert(date, total);
        self
    }

    fn fail_page(&self, date: NaiveDate, page_no: u32) {
        self.failing.lock().unwrap().insert((date, page_no));
    }

    fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn calls_for(&self, date: NaiveDate) -> Vec<u32> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| *d == date)
            .map(|(_, p)| *p)
            .collect()
    }

    fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl RepoTradeSource for ScriptedSource {
    async fn fetch_page(
        &self,
        base_date: NaiveDate,
        page_no: u32,
        num_rows: u32,
    ) -> repo_data::Result<RepoTradePage> {
        self.calls.lock().unwrap().push((base_date, page_no));

        if self.failing.lock().unwrap().contains(&(base_date, page_no)) {
            return Err(DataError::FetchError("HTTP 500 - scripted".to_string()));
        }

        let total = self.totals.get(&base_date).copied().unwrap_or(0);
        let begin = u64::from(page_no - 1) * u64::from(num_rows);
        let end = (begin + u64::from(num_rows)).min(total);

        let trades = (begin..end)
            .map(|i| {
                let mut trade = RepoTrade::new(base_date, format!("{:05}", i + 1));
                trade.currency_name = Some("대한민국 원".to_string());
                trade.term_name = Some("1영업일".to_string());
                trade.interest_rate = Some(dec!(3.0));
                trade.securities_buy_amount = Some(dec!(100));
                trade
            })
            .collect();

        Ok(RepoTradePage {
            total_count: total,
            page_no,
            num_of_rows: num_rows,
            trades,
        })
    }
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
}

fn fast_settings(page_size: u32) -> CollectSettings {
    CollectSettings {
        page_size,
        page_delay: Duration::ZERO,
        date_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_collect_range_skips_weekends_and_records_ledger() {
    let store = RepoStore::in_memory().await.unwrap();
    // 2025-01-03(금) ~ 2025-01-06(월)
    let source = ScriptedSource::default()
        .with_day(date(1, 3), 5)
        .with_day(date(1, 6), 0);

    let stats = collect_range(&store, &source, &fast_settings(2), date(1, 3), date(1, 6))
        .await
        .unwrap();

    assert_eq!(stats.weekend, 2);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.empty, 1);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.total_trades, 5);

    assert_eq!(source.calls_for(date(1, 3)), vec![1, 2, 3]);
    assert!(source.calls_for(date(1, 4)).is_empty());
    assert!(source.calls_for(date(1, 5)).is_empty());

    let completed = store.status_of(date(1, 3)).await.unwrap().unwrap();
    assert_eq!(completed.status, CollectionStatus::Completed);
    assert_eq!(completed.total_count, 5);
    assert_eq!(completed.collected_count, 5);

    let empty = store.status_of(date(1, 6)).await.unwrap().unwrap();
    assert_eq!(empty.status, CollectionStatus::NoData);
    assert_eq!(store.count_trades_on(date(1, 3)).await.unwrap(), 5);
}

#[tokio::test]
async fn test_rerun_skips_completed_but_requeries_no_data() {
    let store = RepoStore::in_memory().await.unwrap();
    let source = ScriptedSource::default()
        .with_day(date(1, 2), 3)
        .with_day(date(1, 3), 0);
    let settings = fast_settings(10);

    collect_range(&store, &source, &settings, date(1, 2), date(1, 3))
        .await
        .unwrap();
    source.reset_calls();

    let stats = collect_range(&store, &source, &settings, date(1, 2), date(1, 3))
        .await
        .unwrap();

    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.empty, 1);
    assert!(source.calls_for(date(1, 2)).is_empty());
    assert_eq!(source.calls_for(date(1, 3)), vec![1]);
    assert_eq!(store.stats().await.unwrap().total_trades, 3);
}

#[tokio::test]
async fn test_partial_date_is_recollected() {
    let store = RepoStore::in_memory().await.unwrap();
    let source = ScriptedSource::default().with_day(date(1, 2), 5);
    source.fail_page(date(1, 2), 2);
    let settings = fast_settings(2);

    let outcome = collect_date(&store, &source, &settings, date(1, 2))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DateOutcome::Partial {
            total_count: 5,
            stored: 3,
            failed_pages: vec![2],
        }
    );
    assert!(!store.is_completed(date(1, 2)).await.unwrap());

    let partial = store.status_of(date(1, 2)).await.unwrap().unwrap();
    assert_eq!(partial.status, CollectionStatus::Partial);
    assert_eq!(partial.collected_count, 3);

    source.heal();
    let stats = collect_range(&store, &source, &settings, date(1, 2), date(1, 2))
        .await
        .unwrap();

    assert_eq!(stats.success, 1);
    assert_eq!(stats.partial, 0);
    assert!(store.is_completed(date(1, 2)).await.unwrap());
    assert_eq!(store.count_trades_on(date(1, 2)).await.unwrap(), 5);
}

#[tokio::test]
async fn test_first_page_failure_leaves_no_ledger_row() {
    let store = RepoStore::in_memory().await.unwrap();
    let source = ScriptedSource::default().with_day(date(1, 2), 5);
    source.fail_page(date(1, 2), 1);

    let stats = collect_range(&store, &source, &fast_settings(2), date(1, 2), date(1, 2))
        .await
        .unwrap();

    assert_eq!(stats.errors, 1);
    assert!(stats.has_failures());
    assert_eq!(source.calls_for(date(1, 2)), vec![1]);
    assert!(store.status_of(date(1, 2)).await.unwrap().is_none());
    assert_eq!(store.count_trades_on(date(1, 2)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_range_does_nothing() {
    let store = RepoStore::in_memory().await.unwrap();
    let source = ScriptedSource::default();

    let stats = collect_range(&store, &source, &fast_settings(10), date(1, 6), date(1, 2))
        .await
        .unwrap();

    assert_eq!(stats.total, 0);
    assert_eq!(stats.weekend, 0);
    assert!(source.calls.lock().unwrap().is_empty());
}
