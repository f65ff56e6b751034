use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::Serialize;

use crate::add_command::AddedCommit;
use crate::aggregate::{classify, day_total, Intensity};
use crate::time_entry::{DaySummary, TimeEntry};

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// 行ラベルの幅(曜日3文字と空白)。
const ROW_LABEL_WIDTH: usize = 4;

/// Consoleにコミットとヒートマップを表示するためのtrait。
pub trait ConsolePresenter {
    /// 1日分のコミットと合計時間を表示する。
    ///
    /// # Arguments
    ///
    /// * `date` - 表示する日付
    /// * `entries` - その日のコミット
    fn show_day(&mut self, date: NaiveDate, entries: &[TimeEntry]) -> Result<()>;

    /// 1年分のヒートマップを表示する。
    ///
    /// # Arguments
    ///
    /// * `year` - 表示する年
    /// * `series` - 1月1日から12月31日までの日毎の合計時間
    fn show_heatmap(&mut self, year: i32, series: &[DaySummary]) -> Result<()>;

    /// 追加したコミットを表示する。
    fn show_added(&mut self, added: &AddedCommit) -> Result<()>;

    /// 削除したコミットのIDを表示する。
    fn show_deleted(&mut self, id: &str) -> Result<()>;
}

/// 分を`1h 05m`の形式にする。
pub fn format_duration(total_minutes: u32) -> String {
    format!("{}h {:02}m", total_minutes / 60, total_minutes % 60)
}

/// テキスト形式で表示する。
pub struct ConsoleText<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleText<'a, W> {
    /// 新しい`ConsoleText`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleText<'a, W> {
    // コミット時刻順にlist形式で表示する。
    fn show_day(&mut self, date: NaiveDate, entries: &[TimeEntry]) -> Result<()> {
        writeln!(self.writer, "## {}", date).context("Failed to write header")?;

        if entries.is_empty() {
            writeln!(self.writer, "No commits for this day.").context("Failed to write line")?;
            return Ok(());
        }

        let mut sorted_entries = entries.to_vec();
        sorted_entries.sort_by_key(|entry| entry.created_at);
        for entry in &sorted_entries {
            let time_str = entry
                .created_at
                .map(|created_at| created_at.with_timezone(&Local).format("%H:%M").to_string())
                .unwrap_or_else(|| "--:--".to_string());
            let id_str = entry.id.as_deref().unwrap_or("-");
            writeln!(
                self.writer,
                "- {} ({}) [{}]: {}",
                time_str,
                format_duration(entry.duration_minutes),
                id_str,
                entry.message
            )
            .with_context(|| format!("Failed to write commit: {:?}", entry))?;
        }

        let total = day_total(entries, date);
        let total_str = format_duration(total.total_hours * 60 + total.remaining_minutes);
        let written = if total.is_over_day {
            writeln!(self.writer, "Total: {} (exceeds 24 hours)", total_str)
        } else {
            writeln!(self.writer, "Total: {}", total_str)
        };
        written.context("Failed to write total")?;

        Ok(())
    }

    // 週を列、曜日を行としたグリッドで表示する。
    fn show_heatmap(&mut self, year: i32, series: &[DaySummary]) -> Result<()> {
        let Some(first) = series.first() else {
            return Ok(());
        };
        let grid_start =
            first.date - Duration::days(first.date.weekday().num_days_from_monday().into());
        let column_of = |date: NaiveDate| ((date - grid_start).num_days() / 7) as usize;
        let columns = series.last().map(|day| column_of(day.date) + 1).unwrap_or(0);

        let mut rows = vec![vec![' '; columns]; 7];
        for day in series {
            let row = day.date.weekday().num_days_from_monday() as usize;
            rows[row][column_of(day.date)] = classify(day.total_minutes).glyph();
        }

        writeln!(self.writer, "Commit Heatmap - {}", year).context("Failed to write title")?;
        writeln!(self.writer, "{}", month_label_line(series, column_of))
            .context("Failed to write month labels")?;
        for (label, cells) in WEEKDAY_LABELS.iter().zip(rows) {
            let cells_str = cells
                .iter()
                .map(|cell| cell.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(self.writer, "{} {}", label, cells_str.trim_end())
                .context("Failed to write heatmap row")?;
        }

        let legend = Intensity::ALL
            .iter()
            .map(|intensity| intensity.glyph().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.writer, "Less {} More", legend).context("Failed to write legend")?;

        let active_days = series.iter().filter(|day| day.total_minutes > 0).count();
        let total_minutes = series
            .iter()
            .fold(0u32, |acc, day| acc.saturating_add(day.total_minutes));
        writeln!(
            self.writer,
            "{} active days, total {}",
            active_days,
            format_duration(total_minutes)
        )
        .context("Failed to write totals")?;

        Ok(())
    }

    fn show_added(&mut self, added: &AddedCommit) -> Result<()> {
        let entry = &added.entry;
        writeln!(
            self.writer,
            "Commit successfully! [{}] {} on {}",
            entry.id.as_deref().unwrap_or("-"),
            format_duration(entry.duration_minutes),
            entry.date
        )
        .context("Failed to write commit")?;
        if added.day_total.map_or(false, |total| total.is_over_day) {
            writeln!(
                self.writer,
                "Warning: total time on {} exceeds 24 hours",
                entry.date
            )
            .context("Failed to write warning")?;
        }

        Ok(())
    }

    fn show_deleted(&mut self, id: &str) -> Result<()> {
        writeln!(self.writer, "Commit {} deleted.", id).context("Failed to write line")?;

        Ok(())
    }
}

/// 各月の1日がある列に月名を配置した行を作る。重なる場合は後の月を省略する。
fn month_label_line(series: &[DaySummary], column_of: impl Fn(NaiveDate) -> usize) -> String {
    let mut line = " ".repeat(ROW_LABEL_WIDTH);
    let mut next_free = ROW_LABEL_WIDTH;
    for day in series.iter().filter(|day| day.date.day() == 1) {
        let position = ROW_LABEL_WIDTH + column_of(day.date) * 2;
        if position < next_free {
            continue;
        }
        line.push_str(&" ".repeat(position - line.len()));
        line.push_str(MONTH_LABELS[day.date.month0() as usize]);
        next_free = line.len() + 1;
    }
    line.trim_end().to_string()
}

/// JSON形式で表示する。
pub struct ConsoleJson<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleJson<'a, W> {
    /// 新しい`ConsoleJson`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DayView<'a> {
    date: NaiveDate,
    entries: &'a [TimeEntry],
    total_minutes: u32,
    is_over_day: bool,
}

#[derive(Serialize)]
struct DeletedView<'a> {
    id: &'a str,
    deleted: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HeatmapCell {
    date: NaiveDate,
    total_minutes: u32,
    intensity: Intensity,
    color: &'static str,
}

impl<'a, W: Write> ConsolePresenter for ConsoleJson<'a, W> {
    fn show_day(&mut self, date: NaiveDate, entries: &[TimeEntry]) -> Result<()> {
        let total = day_total(entries, date);
        let view = DayView {
            date,
            entries,
            total_minutes: total.total_hours * 60 + total.remaining_minutes,
            is_over_day: total.is_over_day,
        };
        serde_json::to_writer_pretty(&mut *self.writer, &view).context("Failed to write JSON")?;
        writeln!(self.writer).context("Failed to write newline")?;

        Ok(())
    }

    fn show_heatmap(&mut self, _year: i32, series: &[DaySummary]) -> Result<()> {
        let cells = series
            .iter()
            .map(|day| {
                let intensity = classify(day.total_minutes);
                HeatmapCell {
                    date: day.date,
                    total_minutes: day.total_minutes,
                    intensity,
                    color: intensity.color(),
                }
            })
            .collect::<Vec<_>>();
        serde_json::to_writer_pretty(&mut *self.writer, &cells).context("Failed to write JSON")?;
        writeln!(self.writer).context("Failed to write newline")?;

        Ok(())
    }

    fn show_added(&mut self, added: &AddedCommit) -> Result<()> {
        serde_json::to_writer_pretty(&mut *self.writer, added).context("Failed to write JSON")?;
        writeln!(self.writer).context("Failed to write newline")?;

        Ok(())
    }

    fn show_deleted(&mut self, id: &str) -> Result<()> {
        let view = DeletedView { id, deleted: true };
        serde_json::to_writer_pretty(&mut *self.writer, &view).context("Failed to write JSON")?;
        writeln!(self.writer).context("Failed to write newline")?;

        Ok(())
    }
}
