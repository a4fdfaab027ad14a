//! 일별 금리 파일 병합 모듈.
//!
//! 여러 `daily_repo_rates` 파일을 하나로 합칩니다. 같은 날짜가 여러 파일에
//! 있으면 입력 순서상 먼저 나온 값을 유지합니다.

use super::daily_rates::write_rates_file;
use crate::error::CollectorError;
use crate::Result;
use repo_core::DailyRateTable;
use repo_data::{open_sqlite, read_daily_rates};
use std::path::{Path, PathBuf};

/// 병합 결과 요약
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// 읽기에 성공한 입력
    pub loaded: Vec<PathBuf>,
    /// 읽기에 실패하여 건너뛴 입력
    pub skipped: Vec<PathBuf>,
    /// 저장한 행 수
    pub rows: u64,
}

/// 파일 하나에서 일별 금리 테이블 읽기
pub async fn load_rates_file(path: &Path) -> Result<DailyRateTable> {
    if !path.exists() {
        return Err(CollectorError::InvalidInput(format!(
            "파일이 없습니다: {}",
            path.display()
        )));
    }
    let pool = open_sqlite(&path.to_string_lossy()).await?;
    let table = read_daily_rates(&pool).await;
    pool.close().await;
    Ok(table?)
}

/// 입력 파일들을 병합하여 `output`에 저장
pub async fn merge_daily_rates(inputs: &[PathBuf], output: &Path) -> Result<MergeSummary> {
    let mut tables = Vec::with_capacity(inputs.len());
    let mut loaded = Vec::new();
    let mut skipped = Vec::new();

    for input in inputs {
        match load_rates_file(input).await {
            Ok(table) => {
                tracing::info!(
                    input = %input.display(),
                    rows = table.rows.len(),
                    columns = table.columns.len(),
                    "입력 파일 로드"
                );
                tables.push(table);
                loaded.push(input.clone());
            }
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "입력 파일 건너뜀");
                skipped.push(input.clone());
            }
        }
    }

    if tables.is_empty() {
        return Err(CollectorError::InvalidInput(
            "로드된 입력 파일이 없습니다".to_string(),
        ));
    }

    let merged = DailyRateTable::merge_first_wins(&tables);
    let rows = write_rates_file(output, &merged).await?;

    if let Some((first, last)) = merged.date_range() {
        tracing::info!(
            output = %output.display(),
            rows,
            first = %first,
            last = %last,
            "병합 완료"
        );
    }

    Ok(MergeSummary {
        loaded,
        skipped,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use repo_core::{RatePoint, TOTAL_COLUMN};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn table(points: &[(u32, &str, f64)]) -> DailyRateTable {
        DailyRateTable::from_points(points.iter().map(|(d, c, r)| RatePoint {
            date: date(*d),
            collateral: c.to_string(),
            rate: *r,
        }))
    }

    #[tokio::test]
    async fn test_merge_keeps_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.db");
        let b = dir.path().join("b.db");
        let missing = dir.path().join("missing.db");
        let output = dir.path().join("merged.db");

        write_rates_file(&a, &table(&[(3, TOTAL_COLUMN, 3.0), (3, "국채", 2.9)]))
            .await
            .unwrap();
        write_rates_file(
            &b,
            &table(&[(2, TOTAL_COLUMN, 2.5), (3, TOTAL_COLUMN, 9.9), (2, "통안증권", 2.4)]),
        )
        .await
        .unwrap();

        let summary = merge_daily_rates(&[a.clone(), missing.clone(), b.clone()], &output)
            .await
            .unwrap();
        assert_eq!(summary.loaded, vec![a, b]);
        assert_eq!(summary.skipped, vec![missing]);
        assert_eq!(summary.rows, 2);

        let merged = load_rates_file(&output).await.unwrap();
        assert_eq!(
            merged.columns,
            vec![TOTAL_COLUMN.to_string(), "국채".to_string(), "통안증권".to_string()]
        );
        assert_eq!(merged.rows[0].date, date(2));
        assert_eq!(merged.get(date(3), TOTAL_COLUMN), Some(3.0));
        assert_eq!(merged.get(date(2), "통안증권"), Some(2.4));
        assert_eq!(merged.get(date(3), "통안증권"), None);
    }

    #[tokio::test]
    async fn test_merge_without_inputs_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.db");
        let missing = dir.path().join("nope.db");

        let err = merge_daily_rates(&[missing], &output).await.unwrap_err();
        assert!(matches!(err, CollectorError::InvalidInput(_)));
        assert!(!output.exists());
    }
}
