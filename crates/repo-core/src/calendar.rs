//! 기준일자(basDt) 및 영업일 유틸리티.
//!
//! 수집 API와 저장소는 기준일자를 `YYYYMMDD` 문자열로 주고받습니다.
//! 공휴일 달력은 없으며 주말(토/일)만 비영업일로 취급합니다.

use crate::error::{CoreError, CoreResult};
use chrono::{Datelike, Days, NaiveDate, Weekday};

/// API/DB 기준일자 형식.
pub const BASE_DATE_FORMAT: &str = "%Y%m%d";

/// `YYYYMMDD` 문자열을 날짜로 파싱.
pub fn parse_base_date(s: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), BASE_DATE_FORMAT)
        .map_err(|_| CoreError::InvalidDate(s.to_string()))
}

/// 날짜를 `YYYYMMDD` 문자열로 변환.
pub fn format_base_date(date: NaiveDate) -> String {
    date.format(BASE_DATE_FORMAT).to_string()
}

/// 토요일/일요일 여부.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 요일 한글 이름.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "월요일",
        Weekday::Tue => "화요일",
        Weekday::Wed => "수요일",
        Weekday::Thu => "목요일",
        Weekday::Fri => "금요일",
        Weekday::Sat => "토요일",
        Weekday::Sun => "일요일",
    }
}

/// `start..=end` 범위의 모든 날짜.
///
/// `start > end`이면 빈 범위입니다.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let mut next = if start <= end { Some(start) } else { None };
    std::iter::from_fn(move || {
        let current = next?;
        next = current
            .checked_add_days(Days::new(1))
            .filter(|d| *d <= end);
        Some(current)
    })
}

/// 범위 내 평일 수.
pub fn weekday_count(start: NaiveDate, end: NaiveDate) -> usize {
    days_in_range(start, end).filter(|d| !is_weekend(*d)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_and_format_base_date() {
        assert_eq!(parse_base_date("20250102").unwrap(), date(2025, 1, 2));
        assert_eq!(format_base_date(date(2025, 12, 31)), "20251231");
        assert!(matches!(
            parse_base_date("2025-01-02"),
            Err(CoreError::InvalidDate(_))
        ));
        assert!(parse_base_date("20250230").is_err());
    }

    #[test]
    fn test_is_weekend() {
        // 2025-01-04 토요일, 2025-01-05 일요일, 2025-01-06 월요일
        assert!(is_weekend(date(2025, 1, 4)));
        assert!(is_weekend(date(2025, 1, 5)));
        assert!(!is_weekend(date(2025, 1, 6)));
        assert_eq!(weekday_name(date(2025, 1, 4)), "토요일");
    }

    #[test]
    fn test_days_in_range() {
        let days: Vec<_> = days_in_range(date(2024, 12, 30), date(2025, 1, 2)).collect();
        assert_eq!(
            days,
            vec![
                date(2024, 12, 30),
                date(2024, 12, 31),
                date(2025, 1, 1),
                date(2025, 1, 2)
            ]
        );

        assert_eq!(days_in_range(date(2025, 1, 2), date(2025, 1, 2)).count(), 1);
        assert_eq!(days_in_range(date(2025, 1, 3), date(2025, 1, 2)).count(), 0);
    }

    #[test]
    fn test_weekday_count() {
        // 2025-01-01(수) ~ 2025-01-12(일): 평일 8일
        assert_eq!(weekday_count(date(2025, 1, 1), date(2025, 1, 12)), 8);
    }
}
