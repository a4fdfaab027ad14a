//! 수집 및 파생 작업 모듈.

pub mod daily_rates;
pub mod export;
pub mod merge;
pub mod query;
pub mod status;
pub mod trade_collect;

pub use daily_rates::{
    build_daily_rates, compute_daily_rates, rate_filter, resolve_range, write_rates_file,
};
pub use export::{export_trades, write_trades_csv};
pub use merge::{load_rates_file, merge_daily_rates, MergeSummary};
pub use query::{is_read_query, run_query};
pub use status::{
    check_api, list_status, pending_dates, render_pending_dates, render_status_table,
    render_store_stats, reset_date,
};
pub use trade_collect::{collect_date, collect_range, CollectSettings, DateOutcome};
