//! 거래 데이터 CSV 내보내기.

use crate::Result;
use chrono::NaiveDate;
use repo_core::{format_base_date, RepoTrade};
use repo_data::{RepoStore, TRADE_COLUMNS};
use rust_decimal::Decimal;
use std::io;
use std::path::Path;

/// 거래를 CSV로 기록 (헤더는 API 필드명). 기록한 행 수를 반환합니다.
pub fn write_trades_csv<W: io::Write>(trades: &[RepoTrade], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(TRADE_COLUMNS)?;
    for trade in trades {
        wtr.write_record(trade_record(trade))?;
    }
    wtr.flush()?;
    Ok(trades.len())
}

/// `repo_trades`를 CSV 파일로 내보냅니다.
///
/// 기간을 주면 해당 범위만, 없으면 전체를 `basDt, rpSqno` 순으로 씁니다.
/// 결과가 없으면 파일을 만들지 않고 0을 반환합니다.
pub async fn export_trades(
    store: &RepoStore,
    path: &Path,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<usize> {
    let trades = store.trades_between(from, to).await?;
    if trades.is_empty() {
        tracing::warn!("내보낼 데이터가 없습니다");
        return Ok(0);
    }

    let file = std::fs::File::create(path)?;
    let written = write_trades_csv(&trades, io::BufWriter::new(file))?;
    tracing::info!(output = %path.display(), rows = written, "CSV 내보내기 완료");
    Ok(written)
}

/// `TRADE_COLUMNS` 순서의 셀 값
fn trade_record(trade: &RepoTrade) -> Vec<String> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let number = |v: &Option<Decimal>| v.map(|d| d.normalize().to_string()).unwrap_or_default();

    vec![
        format_base_date(trade.base_date),
        trade.sequence_no.clone(),
        text(&trade.currency_code),
        text(&trade.currency_name),
        text(&trade.term_code),
        text(&trade.term_name),
        text(&trade.remaining_expiry_code),
        text(&trade.remaining_expiry_name),
        number(&trade.interest_rate),
        text(&trade.seller_sector_code),
        text(&trade.seller_sector_name),
        text(&trade.buyer_sector_code),
        text(&trade.buyer_sector_name),
        text(&trade.opening_date),
        number(&trade.buy_amount),
        number(&trade.margin_ratio),
        text(&trade.collateral_code),
        text(&trade.collateral_name),
        text(&trade.isin_code),
        text(&trade.isin_name),
        number(&trade.securities_buy_amount),
        number(&trade.securities_eval_amount),
    ]
}
