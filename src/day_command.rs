use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};

use crate::aggregate::day_total;
use crate::commits::CommitRepository;
use crate::datetime::{self, parse_date};
use crate::time_entry::TimeEntry;

/// 日毎のコミットを出力するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct DayArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Sets a custom date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,
}

pub struct DayCommand<'a, T: CommitRepository> {
    repository: &'a T,
}

impl<'a, T: CommitRepository> DayCommand<'a, T> {
    /// 新しい`DayCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - コミットを永続化するリポジトリ
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `day`サブコマンドの処理を行う。
    ///
    /// 指定された日付のコミットを取得する。日付が指定されていない場合は、Localタイムゾーンで今日の日付を利用する。
    /// 合計が24時間を超えている場合は警告するが、取得は止めない。
    ///
    /// # Arguments
    ///
    /// * `day` - `day`サブコマンドの引数
    pub async fn run(&self, day: DayArgs) -> Result<(NaiveDate, Vec<TimeEntry>)> {
        let date = day.date.unwrap_or_else(datetime::today);
        info!("Date: {}", date);

        let entries = self
            .repository
            .fetch_entries_for_date(date)
            .await
            .with_context(|| format!("Failed to retrieve commits on {}", date))?;
        info!("Commits retrieved successfully.");

        let total = day_total(&entries, date);
        if total.is_over_day {
            warn!(
                "Total time on {} is {}h {:02}m, which exceeds 24 hours",
                date, total.total_hours, total.remaining_minutes
            );
        }

        Ok((date, entries))
    }
}
