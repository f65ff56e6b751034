use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Localタイムゾーンでの今日の日付を取得する。
pub fn today() -> NaiveDate {
    now().with_timezone(&Local).date_naive()
}

/// Localタイムゾーンでの今年を取得する。
pub fn current_year() -> i32 {
    today().year()
}

/// `YYYY-MM-DD`形式の日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}


#[cfg(test)]
pub use mock_datetime::now;
