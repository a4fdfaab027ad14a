//! 임의 SQL 조회 결과를 CSV로 출력.

use crate::error::CollectorError;
use crate::Result;
use repo_data::RepoStore;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::io;

/// 허용하는 조회 문장 시작 키워드
const READ_KEYWORDS: [&str; 3] = ["SELECT", "WITH", "EXPLAIN"];

/// 단일 조회 문장인지 확인 (대소문자 무시)
pub fn is_read_query(sql: &str) -> bool {
    if statement_count(sql) != 1 {
        return false;
    }
    let head = sql
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    READ_KEYWORDS.contains(&head.as_str())
}

/// `;`로 구분된 비어 있지 않은 문장 수.
///
/// 문자열/식별자 리터럴과 주석 안의 `;`는 구분자로 보지 않습니다.
fn statement_count(sql: &str) -> usize {
    let mut count = 0;
    let mut has_content = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                has_content = true;
                for next in chars.by_ref() {
                    if next == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            ';' => {
                if has_content {
                    count += 1;
                }
                has_content = false;
            }
            c if c.is_whitespace() => {}
            _ => has_content = true,
        }
    }

    if has_content {
        count += 1;
    }
    count
}

/// SQL을 실행하고 결과를 CSV로 기록합니다. 기록한 행 수를 반환합니다.
///
/// 단일 조회 문장만 받으며, 실행 중에는 연결을 `query_only`로 전환하여
/// `WITH ... DELETE` 같은 쓰기 문장도 거부합니다.
/// 첫 줄은 열 이름, NULL은 빈 셀입니다. 결과가 없으면 아무것도 쓰지 않습니다.
pub async fn run_query<W: io::Write>(store: &RepoStore, sql: &str, writer: W) -> Result<usize> {
    if !is_read_query(sql) {
        return Err(CollectorError::InvalidInput(format!(
            "단일 조회 문장만 실행할 수 있습니다: {}",
            sql.trim()
        )));
    }

    let mut conn = store.pool().acquire().await?;
    sqlx::query("PRAGMA query_only = ON")
        .execute(&mut *conn)
        .await?;
    let fetched = sqlx::query(sql).fetch_all(&mut *conn).await;
    // 같은 연결을 저장소가 계속 쓰므로 결과와 무관하게 되돌림
    sqlx::query("PRAGMA query_only = OFF")
        .execute(&mut *conn)
        .await?;
    drop(conn);

    let rows = fetched?;
    let Some(first) = rows.first() else {
        tracing::info!("조회 결과가 없습니다");
        return Ok(0);
    };

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(first.columns().iter().map(|c| c.name()))?;
    for row in &rows {
        let cells = (0..row.len())
            .map(|i| cell_text(row, i))
            .collect::<Result<Vec<_>>>()?;
        wtr.write_record(&cells)?;
    }
    wtr.flush()?;

    tracing::debug!(rows = rows.len(), "쿼리 실행 완료");
    Ok(rows.len())
}

/// 셀 값을 문자열로 변환
fn cell_text(row: &SqliteRow, index: usize) -> Result<String> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(String::new());
    }
    let type_name = raw.type_info().name().to_string();

    let text = match type_name.as_str() {
        "INTEGER" => row.try_get::<i64, _>(index)?.to_string(),
        "REAL" => row.try_get::<f64, _>(index)?.to_string(),
        "BLOB" => format!("<{} bytes>", row.try_get::<Vec<u8>, _>(index)?.len()),
        _ => row.try_get_unchecked::<String, _>(index)?,
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use repo_core::RepoTrade;
    use rust_decimal_macros::dec;

    #[test]
    fn test_is_read_query() {
        assert!(is_read_query("SELECT 1"));
        assert!(is_read_query("  select basDt from repo_trades"));
        assert!(is_read_query("WITH t AS (SELECT 1) SELECT * FROM t"));
        assert!(!is_read_query("DELETE FROM repo_trades"));
        assert!(!is_read_query("DROP TABLE repo_trades"));
        assert!(!is_read_query(""));
        assert!(!is_read_query("PRAGMA query_only = OFF"));
    }

    #[test]
    fn test_is_read_query_rejects_multiple_statements() {
        assert!(!is_read_query("SELECT 1; DELETE FROM repo_trades"));
        assert!(!is_read_query("SELECT 1;DROP TABLE repo_trades;"));
        assert!(is_read_query("SELECT 1;"));
        assert!(is_read_query("SELECT ';' AS sep"));
        assert!(is_read_query("SELECT 1 -- trailing; comment"));
        assert!(is_read_query("SELECT /* a; b */ 1"));
    }

    #[tokio::test]
    async fn test_run_query_writes_csv() {
        let store = RepoStore::in_memory().await.unwrap();
        let mut trade = RepoTrade::new(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(), "1");
        trade.interest_rate = Some(dec!(3.5));
        store.upsert_trades(&[trade]).await.unwrap();

        let mut buf = Vec::new();
        let rows = run_query(
            &store,
            "SELECT basDt, rpInrt, scrsItmsKcdNm, COUNT(*) AS n FROM repo_trades GROUP BY basDt",
            &mut buf,
        )
        .await
        .unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "basDt,rpInrt,scrsItmsKcdNm,n\n20250102,3.5,,1\n");
    }

    #[tokio::test]
    async fn test_run_query_rejects_writes() {
        let store = RepoStore::in_memory().await.unwrap();
        let err = run_query(&store, "DELETE FROM repo_trades", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::InvalidInput(_)));
    }

    async fn store_with_one_trade() -> RepoStore {
        let store = RepoStore::in_memory().await.unwrap();
        let trade = RepoTrade::new(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(), "1");
        store.upsert_trades(&[trade]).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_run_query_rejects_chained_delete() {
        let store = store_with_one_trade().await;

        let err = run_query(&store, "SELECT 1; DELETE FROM repo_trades", Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::InvalidInput(_)));
        assert_eq!(store.stats().await.unwrap().total_trades, 1);
    }

    #[tokio::test]
    async fn test_run_query_blocks_writes_behind_with() {
        let store = store_with_one_trade().await;

        let result = run_query(
            &store,
            "WITH t AS (SELECT 1) DELETE FROM repo_trades",
            Vec::new(),
        )
        .await;

        assert!(matches!(result, Err(CollectorError::Database(_))));
        assert_eq!(store.stats().await.unwrap().total_trades, 1);

        // 조회 후에도 저장소는 다시 쓸 수 있어야 함
        let trade = RepoTrade::new(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(), "1");
        store.upsert_trades(&[trade]).await.unwrap();
        assert_eq!(store.stats().await.unwrap().total_trades, 2);
    }
}
