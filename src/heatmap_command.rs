use anyhow::{Context, Result};
use log::info;

use crate::aggregate::build_year_series;
use crate::commits::CommitRepository;
use crate::datetime;
use crate::time_entry::DaySummary;

/// `heatmap`サブコマンドの引数を表す構造体。
#[derive(Debug, clap::Args)]
pub struct HeatmapArgs {
    #[clap(short = 'y', long = "year", help = "Sets a custom year in the format YYYY")]
    pub year: Option<i32>,
}

pub struct HeatmapCommand<'a, T: CommitRepository> {
    repository: &'a T,
}

impl<'a, T: CommitRepository> HeatmapCommand<'a, T> {
    /// 新しい`HeatmapCommand`を返す。
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `heatmap`サブコマンドの処理を行う。
    ///
    /// 指定された年のサマリーを取得し、活動のない日を0分で補完した1年分の系列を返す。
    /// 年が指定されていない場合は、Localタイムゾーンで今年を利用する。
    ///
    /// # Arguments
    ///
    /// * `heatmap` - `heatmap`サブコマンドの引数
    pub async fn run(&self, heatmap: HeatmapArgs) -> Result<(i32, Vec<DaySummary>)> {
        let year = heatmap.year.unwrap_or_else(datetime::current_year);
        info!("Year: {}", year);

        let summary = self
            .repository
            .fetch_summary(year)
            .await
            .with_context(|| format!("Failed to retrieve summary for {}", year))?;
        info!("Summary retrieved successfully.");

        let series = build_year_series(&summary, year)
            .with_context(|| format!("Failed to build series for {}", year))?;

        Ok((year, series))
    }
}
