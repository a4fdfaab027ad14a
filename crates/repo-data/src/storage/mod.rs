//! SQLite 저장소.
//!
//! 단일 프로세스, 단일 writer를 전제로 풀의 연결 수를 1로 고정합니다.
//! `sqlite::memory:` 데이터베이스도 같은 연결을 계속 사용하므로 테스트에서
//! 그대로 쓸 수 있습니다.

pub mod rates;
pub mod repo_store;

use crate::error::{DataError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::debug;

/// SQLite 연결 풀을 엽니다. 파일이 없으면 생성합니다.
///
/// `sqlite:` 접두사가 있으면 URL로, 없으면 파일 경로로 해석합니다.
pub async fn open_sqlite(target: &str) -> Result<SqlitePool> {
    let options = if target.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(target)
            .map_err(|e| DataError::ConfigError(format!("잘못된 SQLite URL {}: {}", target, e)))?
    } else {
        SqliteConnectOptions::new().filename(target)
    };
    let options = options.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| DataError::ConnectionError(format!("{}: {}", target, e)))?;

    debug!(target = target, "SQLite 연결 완료");
    Ok(pool)
}

/// SQL 식별자 인용 (`"`는 두 번 씁니다).
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("전체"), "\"전체\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn test_open_sqlite_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.db");

        let pool = open_sqlite(path.to_str().unwrap()).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        pool.close().await;

        assert!(path.exists());
    }
}
