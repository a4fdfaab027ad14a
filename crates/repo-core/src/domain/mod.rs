//! REPO 거래 수집을 위한 도메인 모델.

mod ledger;
mod rates;
mod trade;

pub use ledger::*;
pub use rates::*;
pub use trade::*;
