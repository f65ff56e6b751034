use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::NormalizedDuration;

/// 1日の上限となる分数(24時間)。
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// 時間と分から合計の分数を求める。
///
/// 永続化先から読み込んだ値は検証されていないため、`u32`に収まらない場合はエラーを返す。
pub fn duration_from_parts(hours: u32, minutes: u32) -> Result<u32> {
    hours
        .checked_mul(60)
        .and_then(|total| total.checked_add(minutes))
        .with_context(|| format!("Duration out of range: {}h {}m", hours, minutes))
}

/// 記録済みのコミット(作業記録)。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    /// 永続化先が割り当てるID。未保存の場合は`None`。
    pub id: Option<String>,
    /// 作業を記録する日付。`created_at`とは独立している。
    pub date: NaiveDate,
    pub message: String,
    pub duration_minutes: u32,
    /// 実際にコミットした日時。
    pub created_at: Option<DateTime<Utc>>,
}

/// 永続化前のコミット。
///
/// バリデーション済みの時間からのみ作成する。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimeEntry {
    pub date: NaiveDate,
    pub message: String,
    pub hours: u32,
    pub minutes: u32,
}

impl NewTimeEntry {
    /// バリデーション結果から新しい`NewTimeEntry`を返す。
    ///
    /// # Arguments
    ///
    /// * `date` - 記録する日付
    /// * `message` - タスク名。前後の空白は除去する
    /// * `duration` - 正規化済みの時間
    pub fn from_validated(date: NaiveDate, message: &str, duration: NormalizedDuration) -> Self {
        Self {
            date,
            message: message.trim().to_string(),
            hours: duration.hours,
            minutes: duration.minutes,
        }
    }

    pub fn duration_minutes(&self) -> u32 {
        self.hours * 60 + self.minutes
    }
}

/// APIのサマリーで返される1日分の集計。活動のない日は含まれないことがある。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPoint {
    pub date: NaiveDate,
    /// 分単位の合計時間。
    pub duration: u32,
}

/// ヒートマップの1マス分。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_minutes: u32,
}

/// 日付と分数を持つ値。集計の入力として利用する。
pub trait DayDuration {
    fn date(&self) -> NaiveDate;
    fn minutes(&self) -> u32;
}

impl DayDuration for TimeEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn minutes(&self) -> u32 {
        self.duration_minutes
    }
}

impl DayDuration for SummaryPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn minutes(&self) -> u32 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use rstest::rstest;

    use super::{duration_from_parts, NewTimeEntry};
    use crate::validation::NormalizedDuration;

    #[test]
    fn test_from_validated_trims_message() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let entry = NewTimeEntry::from_validated(
            date,
            "  Fix login bug \n",
            NormalizedDuration {
                hours: 2,
                minutes: 30,
            },
        );

        assert_eq!(entry.message, "Fix login bug");
        assert_eq!(entry.duration_minutes(), 150);
    }

    #[rstest]
    #[case(0, 45, 45)]
    #[case(24, 0, 1440)]
    #[case(71582788, 15, u32::MAX)]
    fn test_duration_from_parts(#[case] hours: u32, #[case] minutes: u32, #[case] expected: u32) {
        assert_eq!(duration_from_parts(hours, minutes).unwrap(), expected);
    }

    #[rstest]
    #[case::hours(u32::MAX, 0)]
    #[case::minutes(71582788, 16)]
    fn test_duration_from_parts_out_of_range(#[case] hours: u32, #[case] minutes: u32) {
        assert!(duration_from_parts(hours, minutes).is_err());
    }
}
