//! 수집 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 수집 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 처리한 영업일 수 (주말 제외)
    pub total: usize,
    /// 전체 페이지 수집 완료
    pub success: usize,
    /// 일부 페이지 실패
    pub partial: usize,
    /// 첫 페이지 조회 실패
    pub errors: usize,
    /// 건너뛴 날짜 (이미 완료)
    pub skipped: usize,
    /// 빈 데이터 (조회 성공, 거래 없음)
    pub empty: usize,
    /// 주말로 건너뛴 날짜
    pub weekend: usize,
    /// 저장된 총 거래 수
    pub total_trades: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%). 건너뛴 날짜는 분모에서 제외합니다.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.total.saturating_sub(self.skipped);
        if attempted == 0 {
            0.0
        } else {
            (self.success as f64 / attempted as f64) * 100.0
        }
    }

    /// 재수집이 필요한 날짜가 남았는지
    pub fn has_failures(&self) -> bool {
        self.errors > 0 || self.partial > 0
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            partial = self.partial,
            errors = self.errors,
            skipped = self.skipped,
            empty = self.empty,
            weekend = self.weekend,
            total_trades = self.total_trades,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}
