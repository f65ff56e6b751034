use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::time_entry::{DayDuration, DaySummary, MINUTES_PER_DAY};

/// ヒートマップの色の段階。
const PALETTE: [&str; 5] = ["#ebedf0", "#9be9a8", "#40c463", "#30a14e", "#216e39"];

/// 1日の合計時間による強度の区分。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Intensity {
    None,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Intensity {
    pub const ALL: [Intensity; 5] = [
        Intensity::None,
        Intensity::Low,
        Intensity::Medium,
        Intensity::High,
        Intensity::VeryHigh,
    ];

    /// パレットの色を返す。
    pub fn color(self) -> &'static str {
        PALETTE[self as usize]
    }

    /// 端末表示用の文字を返す。
    pub fn glyph(self) -> char {
        match self {
            Intensity::None => '·',
            Intensity::Low => '░',
            Intensity::Medium => '▒',
            Intensity::High => '▓',
            Intensity::VeryHigh => '█',
        }
    }
}

/// 合計時間を強度に分類する。下限は含まず、上限を含む。
pub fn classify(total_minutes: u32) -> Intensity {
    match total_minutes {
        0 => Intensity::None,
        1..=60 => Intensity::Low,
        61..=120 => Intensity::Medium,
        121..=240 => Intensity::High,
        _ => Intensity::VeryHigh,
    }
}

/// 指定した年の1月1日から12月31日までの日毎の合計時間を返す。
///
/// 記録のない日も0分として含めるため、結果は常にその年の日数と同じ長さになる。
/// 対象年以外の日付を持つ値は無視する。
///
/// # Arguments
///
/// * `items` - time entryまたはAPIのサマリー
/// * `year` - 対象の年
pub fn build_year_series<T: DayDuration>(items: &[T], year: i32) -> Result<Vec<DaySummary>> {
    let first_day = NaiveDate::from_ymd_opt(year, 1, 1)
        .with_context(|| format!("Year out of range: {}", year))?;

    let totals: HashMap<NaiveDate, u32> = items
        .iter()
        .filter(|item| item.date().year() == year)
        .fold(HashMap::new(), |mut acc, item| {
            let total = acc.entry(item.date()).or_insert(0);
            *total = total.saturating_add(item.minutes());
            acc
        });

    let series = first_day
        .iter_days()
        .take_while(|date| date.year() == year)
        .map(|date| DaySummary {
            date,
            total_minutes: totals.get(&date).copied().unwrap_or(0),
        })
        .collect();

    Ok(series)
}

/// 1日分の合計時間。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotal {
    pub total_hours: u32,
    pub remaining_minutes: u32,
    /// 24時間を超えているか。警告表示のみに利用する。
    pub is_over_day: bool,
}

/// 指定した日付の合計時間を計算する。
pub fn day_total<T: DayDuration>(items: &[T], date: NaiveDate) -> DayTotal {
    let total_minutes = items
        .iter()
        .filter(|item| item.date() == date)
        .fold(0u32, |acc, item| acc.saturating_add(item.minutes()));

    DayTotal {
        total_hours: total_minutes / 60,
        remaining_minutes: total_minutes % 60,
        is_over_day: total_minutes > MINUTES_PER_DAY,
    }
}
