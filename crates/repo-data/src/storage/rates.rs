//! 일별 가중평균 금리 테이블 (`daily_repo_rates`).
//!
//! 담보 종류에 따라 열이 달라지므로 쓸 때마다 테이블을 새로 만듭니다.
//! 첫 열은 `basDt` (YYYY-MM-DD), 나머지는 담보명 열(REAL)입니다.

use super::quote_ident;
use crate::error::{DataError, Result};
use chrono::NaiveDate;
use repo_core::{order_columns, parse_base_date, DailyRateRow, DailyRateTable};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use tracing::{debug, info};

/// 일별 금리 테이블 이름.
pub const DAILY_RATES_TABLE: &str = "daily_repo_rates";

/// 날짜 열로 인정하는 이름 (앞쪽 우선).
const DATE_COLUMN_CANDIDATES: [&str; 3] = ["basDt", "index", "date"];

/// 금리 테이블 저장 날짜 형식.
const RATE_DATE_FORMAT: &str = "%Y-%m-%d";

/// 테이블을 교체하여 저장합니다. 저장한 행 수를 반환합니다.
pub async fn write_daily_rates(pool: &SqlitePool, table: &DailyRateTable) -> Result<u64> {
    let mut tx = pool.begin().await?;

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(DAILY_RATES_TABLE)))
        .execute(&mut *tx)
        .await?;

    let mut defs = vec![format!("{} TEXT PRIMARY KEY", quote_ident("basDt"))];
    defs.extend(table.columns.iter().map(|c| format!("{} REAL", quote_ident(c))));
    sqlx::query(&format!(
        "CREATE TABLE {} ({})",
        quote_ident(DAILY_RATES_TABLE),
        defs.join(", ")
    ))
    .execute(&mut *tx)
    .await?;

    let mut names = vec![quote_ident("basDt")];
    names.extend(table.columns.iter().map(|c| quote_ident(c)));
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(DAILY_RATES_TABLE),
        names.join(", "),
        vec!["?"; names.len()].join(", ")
    );

    let mut written = 0u64;
    for row in &table.rows {
        let mut query = sqlx::query(&insert).bind(row.date.format(RATE_DATE_FORMAT).to_string());
        for value in &row.values {
            query = query.bind(*value);
        }
        written += query.execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    info!(
        table = DAILY_RATES_TABLE,
        rows = written,
        columns = table.columns.len(),
        "일별 금리 테이블 저장"
    );
    Ok(written)
}

/// 저장된 일별 금리 테이블을 읽습니다.
///
/// 날짜 열은 `basDt`, `index`, `date` 중 처음 발견된 것을 사용하고
/// 문자열(YYYY-MM-DD..., YYYYMMDD) 또는 정수(YYYYMMDD) 값을 허용합니다.
/// 테이블이 없으면 [`DataError::NotFound`]를 반환합니다.
pub async fn read_daily_rates(pool: &SqlitePool) -> Result<DailyRateTable> {
    let all_columns: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM pragma_table_info(?) ORDER BY cid",
    )
    .bind(DAILY_RATES_TABLE)
    .fetch_all(pool)
    .await?;

    if all_columns.is_empty() {
        return Err(DataError::NotFound(format!(
            "{} 테이블이 없습니다",
            DAILY_RATES_TABLE
        )));
    }

    let date_column = DATE_COLUMN_CANDIDATES
        .iter()
        .find(|candidate| all_columns.iter().any(|c| c == *candidate))
        .map(|c| c.to_string())
        .ok_or_else(|| {
            DataError::InvalidData(format!("{}에 날짜 열이 없습니다", DAILY_RATES_TABLE))
        })?;

    let value_columns: Vec<String> = all_columns
        .iter()
        .filter(|c| **c != date_column)
        .cloned()
        .collect();

    let mut select = vec![quote_ident(&date_column)];
    select.extend(value_columns.iter().map(|c| quote_ident(c)));
    let rows = sqlx::query(&format!(
        "SELECT {} FROM {}",
        select.join(", "),
        quote_ident(DAILY_RATES_TABLE)
    ))
    .fetch_all(pool)
    .await?;

    // 열 순서는 전체 우선 규칙으로 다시 정렬
    let columns = order_columns(value_columns.iter().cloned());
    let positions: Vec<usize> = columns
        .iter()
        .filter_map(|c| value_columns.iter().position(|v| v == c))
        .collect();

    let mut parsed = Vec::with_capacity(rows.len());
    for row in &rows {
        let Some(date) = decode_date(row, 0)? else {
            continue;
        };
        let mut values = Vec::with_capacity(positions.len());
        for &pos in &positions {
            values.push(decode_rate(row, pos + 1)?);
        }
        parsed.push(DailyRateRow { date, values });
    }
    parsed.sort_by_key(|r| r.date);

    debug!(rows = parsed.len(), columns = columns.len(), "일별 금리 테이블 조회");
    Ok(DailyRateTable {
        columns,
        rows: parsed,
    })
}

/// 날짜 셀 디코딩. NULL이면 `None`.
fn decode_date(row: &SqliteRow, index: usize) -> Result<Option<NaiveDate>> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(None);
    }
    let type_name = raw.type_info().name().to_string();

    let text = match type_name.as_str() {
        "INTEGER" => row.try_get::<i64, _>(index)?.to_string(),
        // TIMESTAMP 등 선언 타입과 무관하게 문자열로 읽음
        _ => row.try_get_unchecked::<String, _>(index)?,
    };
    parse_rate_date(&text).map(Some)
}

/// 금리 셀 디코딩. 숫자로 해석할 수 없으면 `None`.
fn decode_rate(row: &SqliteRow, index: usize) -> Result<Option<f64>> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(None);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "REAL" => Some(row.try_get::<f64, _>(index)?),
        "INTEGER" => Some(row.try_get::<i64, _>(index)? as f64),
        "TEXT" => row.try_get::<String, _>(index)?.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value)
}

/// `YYYY-MM-DD[ HH:MM:SS]` 또는 `YYYYMMDD` 형식 날짜 파싱.
pub(crate) fn parse_rate_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    if let Some(prefix) = text.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, RATE_DATE_FORMAT) {
            return Ok(date);
        }
    }
    Ok(parse_base_date(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_sqlite;
    use repo_core::{RatePoint, TOTAL_COLUMN};

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
    fn test_parse_rate_date_formats() {
        assert_eq!(parse_rate_date("2025-01-02").unwrap(), date(2));
        assert_eq!(parse_rate_date("2025-01-02 00:00:00").unwrap(), date(2));
        assert_eq!(parse_rate_date("20250102").unwrap(), date(2));
        assert!(parse_rate_date("02/01/2025").is_err());
    }

    #[tokio::test]
    async fn test_write_then_read_daily_rates() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_sqlite(dir.path().join("rates.db").to_str().unwrap())
            .await
            .unwrap();

        let table = DailyRateTable::from_points(vec![
            point(3, "국채", 3.1),
            point(2, "국채", 3.0),
            point(2, TOTAL_COLUMN, 3.05),
            point(3, TOTAL_COLUMN, 3.2),
        ]);

        assert_eq!(write_daily_rates(&pool, &table).await.unwrap(), 2);
        // 다시 써도 테이블을 교체
        assert_eq!(write_daily_rates(&pool, &table).await.unwrap(), 2);

        let loaded = read_daily_rates(&pool).await.unwrap();
        assert_eq!(loaded.columns, vec![TOTAL_COLUMN.to_string(), "국채".to_string()]);
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].date, date(2));
        assert_eq!(loaded.get(date(3), "국채"), Some(3.1));
        assert_eq!(loaded.get(date(2), TOTAL_COLUMN), Some(3.05));
    }

    #[tokio::test]
    async fn test_read_legacy_index_table() {
        let pool = open_sqlite("sqlite::memory:").await.unwrap();
        sqlx::query(
            r#"CREATE TABLE daily_repo_rates ("index" TIMESTAMP, "국채" REAL, "전체" INTEGER)"#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(r#"INSERT INTO daily_repo_rates VALUES ('2025-01-03 00:00:00', 3.2, 3)"#)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(r#"INSERT INTO daily_repo_rates VALUES ('2025-01-02 00:00:00', NULL, 2)"#)
            .execute(&pool)
            .await
            .unwrap();

        let loaded = read_daily_rates(&pool).await.unwrap();
        assert_eq!(loaded.columns[0], TOTAL_COLUMN);
        assert_eq!(loaded.rows[0].date, date(2));
        assert_eq!(loaded.get(date(2), "국채"), None);
        assert_eq!(loaded.get(date(3), TOTAL_COLUMN), Some(3.0));
    }

    #[tokio::test]
    async fn test_read_missing_table() {
        let pool = open_sqlite("sqlite::memory:").await.unwrap();
        let err = read_daily_rates(&pool).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(_)));
    }
}
