//! # Repo Core
//!
//! REPO 거래정보 수집기의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 수집기 전반에서 사용되는 기본 타입을 제공합니다:
//! - 건별 REPO 거래 레코드
//! - 일자별 수집 상태 (수집 원장)
//! - 일별 가중평균 금리 테이블
//! - 기준일자/영업일 유틸리티
//! - 로깅 인프라

pub mod calendar;
pub mod domain;
pub mod error;
pub mod logging;

pub use calendar::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
