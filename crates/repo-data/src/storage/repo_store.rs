//! REPO 거래 테이블과 수집 원장 저장소.
//!
//! - `repo_trades`: 건별 거래, 기본키 `(basDt, rpSqno)`
//! - `collection_status`: 기준일자별 수집 상태
//!
//! 열 이름은 API 필드명을 그대로 사용하여 기존 DB 파일과 호환됩니다.

use super::open_sqlite;
use crate::error::{DataError, Result};
use chrono::{Local, NaiveDate};
use repo_core::{
    format_base_date, parse_base_date, CollectionRecord, CollectionStatus, RatePoint, RepoTrade,
    TOTAL_COLUMN, UNCLASSIFIED_COLUMN,
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::{debug, info, instrument};

/// `repo_trades` 열 (API 필드명, 저장 순서).
pub const TRADE_COLUMNS: [&str; 22] = [
    "basDt",
    "rpSqno",
    "rpBuyAplCurCd",
    "rpBuyAplCurCdNm",
    "rdptTermCcd",
    "rdptTermCcdNm",
    "rpRmngExprDcd",
    "rpRmngExprDcdNm",
    "rpInrt",
    "slngShtrFinBzcDcd",
    "slngShtrFinBzcDcdNm",
    "buynShtrFinBzcDcd",
    "buynShtrFinBzcDcdNm",
    "rpOpngDt",
    "rpBuyAmt",
    "rpMrgamRto",
    "scrsItmsKcd",
    "scrsItmsKcdNm",
    "isinCd",
    "isinCdNm",
    "buyScrtBuyAmt",
    "buyScrtEvlAmt",
];

const CREATE_TRADES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS repo_trades (
        basDt TEXT,
        rpSqno TEXT,
        rpBuyAplCurCd TEXT,
        rpBuyAplCurCdNm TEXT,
        rdptTermCcd TEXT,
        rdptTermCcdNm TEXT,
        rpRmngExprDcd TEXT,
        rpRmngExprDcdNm TEXT,
        rpInrt REAL,
        slngShtrFinBzcDcd TEXT,
        slngShtrFinBzcDcdNm TEXT,
        buynShtrFinBzcDcd TEXT,
        buynShtrFinBzcDcdNm TEXT,
        rpOpngDt TEXT,
        rpBuyAmt REAL,
        rpMrgamRto REAL,
        scrsItmsKcd TEXT,
        scrsItmsKcdNm TEXT,
        isinCd TEXT,
        isinCdNm TEXT,
        buyScrtBuyAmt REAL,
        buyScrtEvlAmt REAL,
        PRIMARY KEY (basDt, rpSqno)
    )
"#;

const CREATE_STATUS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS collection_status (
        basDt TEXT PRIMARY KEY,
        total_count INTEGER,
        collected_count INTEGER,
        collected_at TEXT,
        status TEXT
    )
"#;

const CREATE_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_basDt ON repo_trades(basDt)",
    "CREATE INDEX IF NOT EXISTS idx_slng ON repo_trades(slngShtrFinBzcDcdNm)",
    "CREATE INDEX IF NOT EXISTS idx_buyn ON repo_trades(buynShtrFinBzcDcdNm)",
];

/// 저장소 요약 통계.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// 전체 거래 건수
    pub total_trades: i64,
    /// 가장 이른 기준일자 (YYYYMMDD)
    pub first_date: Option<String>,
    /// 가장 늦은 기준일자 (YYYYMMDD)
    pub last_date: Option<String>,
    /// `completed` 상태 날짜 수
    pub completed_dates: i64,
}

/// 가중평균 금리 계산 대상 필터.
#[derive(Debug, Clone)]
pub struct VwapFilter {
    /// 매입적용통화코드명 (예: "대한민국 원")
    pub currency_name: String,
    /// 환매기간구분코드명 (예: "1영업일")
    pub term_name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// REPO 거래 저장소.
#[derive(Clone)]
pub struct RepoStore {
    pool: SqlitePool,
}

impl RepoStore {
    /// 데이터베이스를 열고 스키마를 초기화합니다.
    pub async fn connect(target: &str) -> Result<Self> {
        let pool = open_sqlite(target).await?;
        let store = Self { pool };
        store.init_schema().await?;
        info!(database = target, "REPO 저장소 초기화 완료");
        Ok(store)
    }

    /// 메모리 데이터베이스 (테스트용).
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// 내부 연결 풀을 반환합니다.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 연결 풀을 닫습니다.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// 테이블과 인덱스 생성 (이미 있으면 유지).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TRADES_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_STATUS_TABLE).execute(&self.pool).await?;
        for ddl in CREATE_INDEXES {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    // =========================================================================
    // 거래 테이블
    // =========================================================================

    /// 거래 upsert. 같은 `(basDt, rpSqno)`는 새 값으로 덮어씁니다.
    ///
    /// 한 트랜잭션으로 처리하며 저장한 행 수를 반환합니다.
    #[instrument(skip(self, trades), fields(count = trades.len()))]
    pub async fn upsert_trades(&self, trades: &[RepoTrade]) -> Result<u64> {
        if trades.is_empty() {
            return Ok(0);
        }

        let sql = upsert_sql();
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for trade in trades {
            let result = sqlx::query(&sql)
                .bind(format_base_date(trade.base_date))
                .bind(&trade.sequence_no)
                .bind(trade.currency_code.as_deref())
                .bind(trade.currency_name.as_deref())
                .bind(trade.term_code.as_deref())
                .bind(trade.term_name.as_deref())
                .bind(trade.remaining_expiry_code.as_deref())
                .bind(trade.remaining_expiry_name.as_deref())
                .bind(decimal_to_f64(trade.interest_rate))
                .bind(trade.seller_sector_code.as_deref())
                .bind(trade.seller_sector_name.as_deref())
                .bind(trade.buyer_sector_code.as_deref())
                .bind(trade.buyer_sector_name.as_deref())
                .bind(trade.opening_date.as_deref())
                .bind(decimal_to_f64(trade.buy_amount))
                .bind(decimal_to_f64(trade.margin_ratio))
                .bind(trade.collateral_code.as_deref())
                .bind(trade.collateral_name.as_deref())
                .bind(trade.isin_code.as_deref())
                .bind(trade.isin_name.as_deref())
                .bind(decimal_to_f64(trade.securities_buy_amount))
                .bind(decimal_to_f64(trade.securities_eval_amount))
                .execute(&mut *tx)
                .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        debug!(written, "거래 저장 완료");
        Ok(written)
    }

    /// 기간 내 거래 조회 (`basDt`, `rpSqno` 순). 기간이 없으면 전체.
    pub async fn trades_between(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<RepoTrade>> {
        let columns = TRADE_COLUMNS.join(", ");
        let rows = match (from, to) {
            (Some(from), Some(to)) => {
                sqlx::query(&format!(
                    "SELECT {} FROM repo_trades WHERE basDt BETWEEN ? AND ? ORDER BY basDt, rpSqno",
                    columns
                ))
                .bind(format_base_date(from))
                .bind(format_base_date(to))
                .fetch_all(&self.pool)
                .await?
            }
            (None, None) => {
                sqlx::query(&format!(
                    "SELECT {} FROM repo_trades ORDER BY basDt, rpSqno",
                    columns
                ))
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                return Err(DataError::InvalidData(
                    "시작일과 종료일은 함께 지정해야 합니다".to_string(),
                ))
            }
        };

        rows.iter().map(trade_from_row).collect()
    }

    /// 특정 기준일자의 저장 건수.
    pub async fn count_trades_on(&self, date: NaiveDate) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM repo_trades WHERE basDt = ?")
            .bind(format_base_date(date))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // 수집 원장
    // =========================================================================

    /// 해당 기준일자가 `completed`로 기록되어 있는지.
    pub async fn is_completed(&self, date: NaiveDate) -> Result<bool> {
        let found: Option<(String,)> = sqlx::query_as(
            "SELECT status FROM collection_status WHERE basDt = ? AND status = ?",
        )
        .bind(format_base_date(date))
        .bind(CollectionStatus::Completed.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    /// 수집 상태 기록 (기존 행은 교체, 시각은 현재 로컬 시각).
    pub async fn record_status(
        &self,
        date: NaiveDate,
        total_count: i64,
        collected_count: i64,
        status: CollectionStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collection_status (basDt, total_count, collected_count, collected_at, status)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (basDt) DO UPDATE SET
                total_count = excluded.total_count,
                collected_count = excluded.collected_count,
                collected_at = excluded.collected_at,
                status = excluded.status
            "#,
        )
        .bind(format_base_date(date))
        .bind(total_count)
        .bind(collected_count)
        .bind(Local::now().to_rfc3339())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// 특정 기준일자의 원장 행.
    pub async fn status_of(&self, date: NaiveDate) -> Result<Option<CollectionRecord>> {
        let row: Option<(String, Option<i64>, Option<i64>, Option<String>, Option<String>)> =
            sqlx::query_as(
                r#"
                SELECT basDt, total_count, collected_count, collected_at, status
                FROM collection_status
                WHERE basDt = ?
                "#,
            )
            .bind(format_base_date(date))
            .fetch_optional(&self.pool)
            .await?;

        row.map(record_from_tuple).transpose()
    }

    /// 최근 기준일자부터 원장 조회.
    pub async fn list_statuses(&self, limit: i64) -> Result<Vec<CollectionRecord>> {
        let rows: Vec<(String, Option<i64>, Option<i64>, Option<String>, Option<String>)> =
            sqlx::query_as(
                r#"
                SELECT basDt, total_count, collected_count, collected_at, status
                FROM collection_status
                ORDER BY basDt DESC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(record_from_tuple).collect()
    }

    /// 원장 행 삭제 (다음 실행에서 재수집). 삭제 여부를 반환합니다.
    pub async fn clear_status(&self, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query("DELETE FROM collection_status WHERE basDt = ?")
            .bind(format_base_date(date))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // 통계 / 분석
    // =========================================================================

    /// 저장소 요약 통계.
    pub async fn stats(&self) -> Result<StoreStats> {
        let total_trades: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM repo_trades")
            .fetch_one(&self.pool)
            .await?;

        let (first_date, last_date): (Option<String>, Option<String>) =
            sqlx::query_as("SELECT MIN(basDt), MAX(basDt) FROM repo_trades")
                .fetch_one(&self.pool)
                .await?;

        let completed_dates: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM collection_status WHERE status = ?")
                .bind(CollectionStatus::Completed.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(StoreStats {
            total_trades,
            first_date,
            last_date,
            completed_dates,
        })
    }

    /// 담보별 + 전체 일별 가중평균 금리.
    ///
    /// 금리 = Σ(rpInrt × buyScrtBuyAmt) / Σ(buyScrtBuyAmt). 매입금액이 0 이하인 거래는
    /// 제외합니다. 금리가 NULL인 거래는 분자에서만 빠지고 매입금액은 분모에 남습니다.
    #[instrument(skip(self))]
    pub async fn vwap_points(&self, filter: &VwapFilter) -> Result<Vec<RatePoint>> {
        const WHERE_CLAUSE: &str = r#"
            WHERE rpBuyAplCurCdNm = ?
              AND rdptTermCcdNm = ?
              AND basDt BETWEEN ? AND ?
              AND CAST(buyScrtBuyAmt AS REAL) > 0
        "#;
        const RATE_EXPR: &str = "SUM(CAST(rpInrt AS REAL) * CAST(buyScrtBuyAmt AS REAL)) \
                                 / SUM(CAST(buyScrtBuyAmt AS REAL))";

        let by_collateral = format!(
            "SELECT basDt, COALESCE(scrsItmsKcdNm, '{unclassified}') AS collateral, {rate} AS vwap_rate \
             FROM repo_trades {filter} \
             GROUP BY basDt, collateral ORDER BY basDt",
            unclassified = UNCLASSIFIED_COLUMN,
            rate = RATE_EXPR,
            filter = WHERE_CLAUSE,
        );
        let total = format!(
            "SELECT basDt, '{total}' AS collateral, {rate} AS vwap_rate \
             FROM repo_trades {filter} \
             GROUP BY basDt ORDER BY basDt",
            total = TOTAL_COLUMN,
            rate = RATE_EXPR,
            filter = WHERE_CLAUSE,
        );

        let from = format_base_date(filter.from);
        let to = format_base_date(filter.to);
        let mut points = Vec::new();

        for sql in [by_collateral, total] {
            let rows: Vec<(String, String, Option<f64>)> = sqlx::query_as(&sql)
                .bind(&filter.currency_name)
                .bind(&filter.term_name)
                .bind(&from)
                .bind(&to)
                .fetch_all(&self.pool)
                .await?;

            for (bas_dt, collateral, rate) in rows {
                let Some(rate) = rate else { continue };
                points.push(RatePoint {
                    date: parse_base_date(&bas_dt)?,
                    collateral,
                    rate,
                });
            }
        }

        debug!(points = points.len(), "가중평균 금리 계산 완료");
        Ok(points)
    }
}

/// upsert SQL (`ON CONFLICT ... DO UPDATE`).
fn upsert_sql() -> String {
    let placeholders = vec!["?"; TRADE_COLUMNS.len()].join(", ");
    let updates = TRADE_COLUMNS[2..]
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO repo_trades ({}) VALUES ({}) ON CONFLICT (basDt, rpSqno) DO UPDATE SET {}",
        TRADE_COLUMNS.join(", "),
        placeholders,
        updates
    )
}

fn decimal_to_f64(value: Option<Decimal>) -> Option<f64> {
    value.and_then(|d| d.to_f64())
}

fn f64_to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(Decimal::from_f64)
}

fn trade_from_row(row: &SqliteRow) -> Result<RepoTrade> {
    let bas_dt: String = row.try_get("basDt")?;
    let text = |name: &str| -> Result<Option<String>> { Ok(row.try_get(name)?) };
    let number = |name: &str| -> Result<Option<Decimal>> {
        Ok(f64_to_decimal(row.try_get::<Option<f64>, _>(name)?))
    };

    Ok(RepoTrade {
        base_date: parse_base_date(&bas_dt)?,
        sequence_no: row.try_get("rpSqno")?,
        currency_code: text("rpBuyAplCurCd")?,
        currency_name: text("rpBuyAplCurCdNm")?,
        term_code: text("rdptTermCcd")?,
        term_name: text("rdptTermCcdNm")?,
        remaining_expiry_code: text("rpRmngExprDcd")?,
        remaining_expiry_name: text("rpRmngExprDcdNm")?,
        interest_rate: number("rpInrt")?,
        seller_sector_code: text("slngShtrFinBzcDcd")?,
        seller_sector_name: text("slngShtrFinBzcDcdNm")?,
        buyer_sector_code: text("buynShtrFinBzcDcd")?,
        buyer_sector_name: text("buynShtrFinBzcDcdNm")?,
        opening_date: text("rpOpngDt")?,
        buy_amount: number("rpBuyAmt")?,
        margin_ratio: number("rpMrgamRto")?,
        collateral_code: text("scrsItmsKcd")?,
        collateral_name: text("scrsItmsKcdNm")?,
        isin_code: text("isinCd")?,
        isin_name: text("isinCdNm")?,
        securities_buy_amount: number("buyScrtBuyAmt")?,
        securities_eval_amount: number("buyScrtEvlAmt")?,
    })
}

fn record_from_tuple(
    (bas_dt, total_count, collected_count, collected_at, status): (
        String,
        Option<i64>,
        Option<i64>,
        Option<String>,
        Option<String>,
    ),
) -> Result<CollectionRecord> {
    let status = status
        .as_deref()
        .unwrap_or_default()
        .parse::<CollectionStatus>()?;

    Ok(CollectionRecord {
        base_date: parse_base_date(&bas_dt)?,
        total_count: total_count.unwrap_or(0),
        collected_count: collected_count.unwrap_or(0),
        collected_at: collected_at.unwrap_or_default(),
        status,
    })
}
