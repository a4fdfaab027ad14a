//! 건별 REPO 거래 레코드.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 금융위원회 REPO거래정보 건별거래 1건.
///
/// `(base_date, sequence_no)`가 저장소 기본키입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoTrade {
    /// 기준일자 (basDt)
    pub base_date: NaiveDate,
    /// REPO 일련번호 (rpSqno)
    pub sequence_no: String,
    /// 매입적용통화코드
    pub currency_code: Option<String>,
    /// 매입적용통화코드명 (예: "대한민국 원")
    pub currency_name: Option<String>,
    /// 환매기간구분코드
    pub term_code: Option<String>,
    /// 환매기간구분코드명 (예: "1영업일")
    pub term_name: Option<String>,
    /// 잔존만기구분코드
    pub remaining_expiry_code: Option<String>,
    /// 잔존만기구분코드명
    pub remaining_expiry_name: Option<String>,
    /// REPO 금리 (%)
    pub interest_rate: Option<Decimal>,
    /// 매도측 금융업권구분코드
    pub seller_sector_code: Option<String>,
    /// 매도측 금융업권구분코드명
    pub seller_sector_name: Option<String>,
    /// 매수측 금융업권구분코드
    pub buyer_sector_code: Option<String>,
    /// 매수측 금융업권구분코드명
    pub buyer_sector_name: Option<String>,
    /// REPO 개시일자
    pub opening_date: Option<String>,
    /// REPO 매입금액
    pub buy_amount: Option<Decimal>,
    /// 증거금률
    pub margin_ratio: Option<Decimal>,
    /// 담보증권 종류코드
    pub collateral_code: Option<String>,
    /// 담보증권 종류코드명 (예: "국채")
    pub collateral_name: Option<String>,
    /// ISIN 코드
    pub isin_code: Option<String>,
    /// ISIN 코드명
    pub isin_name: Option<String>,
    /// 매입증권 매입금액 (VWAP 가중치)
    pub securities_buy_amount: Option<Decimal>,
    /// 매입증권 평가금액
    pub securities_eval_amount: Option<Decimal>,
}

impl RepoTrade {
    /// 키 필드만 채운 거래를 생성합니다. 나머지 필드는 비어 있습니다.
    pub fn new(base_date: NaiveDate, sequence_no: impl Into<String>) -> Self {
        Self {
            base_date,
            sequence_no: sequence_no.into(),
            currency_code: None,
            currency_name: None,
            term_code: None,
            term_name: None,
            remaining_expiry_code: None,
            remaining_expiry_name: None,
            interest_rate: None,
            seller_sector_code: None,
            seller_sector_name: None,
            buyer_sector_code: None,
            buyer_sector_name: None,
            opening_date: None,
            buy_amount: None,
            margin_ratio: None,
            collateral_code: None,
            collateral_name: None,
            isin_code: None,
            isin_name: None,
            securities_buy_amount: None,
            securities_eval_amount: None,
        }
    }
}

/// API 응답 한 페이지.
#[derive(Debug, Clone, Default)]
pub struct RepoTradePage {
    /// 해당 기준일자의 전체 건수 (totalCount)
    pub total_count: u64,
    /// 페이지 번호 (1부터)
    pub page_no: u32,
    /// 페이지당 건수
    pub num_of_rows: u32,
    /// 이 페이지의 거래
    pub trades: Vec<RepoTrade>,
}

impl RepoTradePage {
    /// 전체 건수를 모두 받기 위한 페이지 수.
    pub fn page_count(total_count: u64, page_size: u32) -> u32 {
        if page_size == 0 {
            return 0;
        }
        total_count.div_ceil(u64::from(page_size)) as u32
    }
}
