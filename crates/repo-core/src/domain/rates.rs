//! 일별 가중평균(VWAP) REPO 금리 테이블.
//!
//! 행은 기준일자, 열은 담보증권 종류입니다. 첫 열은 항상 담보 구분 없는
//! 전체 금리(`전체`)이고, 나머지 열은 이름순으로 정렬됩니다.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 담보 구분 없는 전체 금리 열 이름.
pub const TOTAL_COLUMN: &str = "전체";

/// 담보증권 종류명이 없는 거래의 열 이름.
pub const UNCLASSIFIED_COLUMN: &str = "미분류";

/// 금리 반올림 자릿수.
pub const RATE_DECIMALS: i32 = 3;

/// 담보별 일별 금리 한 점.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub date: NaiveDate,
    /// 담보증권 종류명 (`전체` 포함)
    pub collateral: String,
    pub rate: f64,
}

/// 테이블 한 행.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRateRow {
    pub date: NaiveDate,
    /// `DailyRateTable::columns`와 같은 순서
    pub values: Vec<Option<f64>>,
}

/// 피벗된 일별 금리 테이블.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRateTable {
    pub columns: Vec<String>,
    pub rows: Vec<DailyRateRow>,
}

/// 소수점 3자리 반올림.
pub fn round_rate(rate: f64) -> f64 {
    let factor = 10f64.powi(RATE_DECIMALS);
    (rate * factor).round() / factor
}

/// `전체`를 맨 앞에 두고 나머지를 이름순으로 정렬.
pub fn order_columns<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set: BTreeSet<String> = names.into_iter().map(Into::into).collect();
    let mut columns = Vec::with_capacity(set.len());
    if set.contains(TOTAL_COLUMN) {
        columns.push(TOTAL_COLUMN.to_string());
    }
    columns.extend(set.into_iter().filter(|c| c != TOTAL_COLUMN));
    columns
}

impl DailyRateTable {
    /// 금리 점들을 날짜 × 담보 테이블로 피벗합니다.
    ///
    /// 같은 (날짜, 담보)가 여러 번 나오면 마지막 값이 남습니다.
    pub fn from_points(points: impl IntoIterator<Item = RatePoint>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, BTreeMap<String, f64>> = BTreeMap::new();
        for point in points {
            by_date
                .entry(point.date)
                .or_default()
                .insert(point.collateral, round_rate(point.rate));
        }

        let columns = order_columns(by_date.values().flat_map(|m| m.keys().cloned()));

        let rows = by_date
            .into_iter()
            .map(|(date, cells)| DailyRateRow {
                date,
                values: columns.iter().map(|c| cells.get(c).copied()).collect(),
            })
            .collect();

        Self { columns, rows }
    }

    /// 여러 테이블을 하나로 합칩니다.
    ///
    /// 열은 합집합이며, 같은 날짜가 여러 테이블에 있으면 먼저 나온 행이
    /// 남습니다. 결과는 날짜 오름차순입니다.
    pub fn merge_first_wins(tables: &[DailyRateTable]) -> Self {
        let columns = order_columns(tables.iter().flat_map(|t| t.columns.iter().cloned()));

        let mut by_date: BTreeMap<NaiveDate, DailyRateRow> = BTreeMap::new();
        for table in tables {
            for row in &table.rows {
                by_date.entry(row.date).or_insert_with(|| DailyRateRow {
                    date: row.date,
                    values: columns
                        .iter()
                        .map(|c| table.value(row, c))
                        .collect(),
                });
            }
        }

        Self {
            columns,
            rows: by_date.into_values().collect(),
        }
    }

    /// 행의 특정 열 값.
    pub fn value(&self, row: &DailyRateRow, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        row.values.get(idx).copied().flatten()
    }

    /// 날짜와 열 이름으로 값 조회.
    pub fn get(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let row = self.rows.iter().find(|r| r.date == date)?;
        self.value(row, column)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (첫 날짜, 마지막 날짜).
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.rows.first()?.date, self.rows.last()?.date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn point(d: u32, collateral: &str, rate: f64) -> RatePoint {
        RatePoint {
            date: date(d),
            collateral: collateral.to_string(),
            rate,
        }
    }

    #[test]
    fn test_round_rate() {
        assert_eq!(round_rate(3.12349), 3.123);
        assert_eq!(round_rate(3.1236), 3.124);
        assert_eq!(round_rate(2.0), 2.0);
    }

    #[test]
    fn test_order_columns_total_first() {
        let cols = order_columns(["통안증권", "국채", "전체", "국채"]);
        assert_eq!(cols, vec!["전체", "국채", "통안증권"]);

        let cols = order_columns(["회사채", "국채"]);
        assert_eq!(cols, vec!["국채", "회사채"]);
    }

    #[test]
    fn test_pivot_fills_missing_cells_with_none() {
        let table = DailyRateTable::from_points(vec![
            point(3, "국채", 3.0),
            point(2, "국채", 3.1),
            point(2, "통안증권", 3.2),
            point(2, TOTAL_COLUMN, 3.15),
            point(3, TOTAL_COLUMN, 3.0),
        ]);

        assert_eq!(table.columns, vec!["전체", "국채", "통안증권"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].date, date(2));
        assert_eq!(table.rows[0].values, vec![Some(3.15), Some(3.1), Some(3.2)]);
        assert_eq!(table.rows[1].values, vec![Some(3.0), Some(3.0), None]);
        assert_eq!(table.date_range(), Some((date(2), date(3))));
    }

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let first = DailyRateTable::from_points(vec![
            point(2, TOTAL_COLUMN, 3.0),
            point(3, TOTAL_COLUMN, 3.1),
        ]);
        let second = DailyRateTable::from_points(vec![
            point(3, TOTAL_COLUMN, 9.9),
            point(3, "국채", 9.8),
            point(6, TOTAL_COLUMN, 3.3),
            point(6, "국채", 3.2),
        ]);

        let merged = DailyRateTable::merge_first_wins(&[first, second]);

        assert_eq!(merged.columns, vec!["전체", "국채"]);
        assert_eq!(merged.rows.len(), 3);
        assert_eq!(merged.get(date(3), TOTAL_COLUMN), Some(3.1));
        // 첫 테이블 행이 남으므로 국채 값은 없음
        assert_eq!(merged.get(date(3), "국채"), None);
        assert_eq!(merged.get(date(6), "국채"), Some(3.2));
    }

    #[test]
    fn test_empty_table() {
        let table = DailyRateTable::from_points(Vec::new());
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
        assert_eq!(table.date_range(), None);
    }
}
