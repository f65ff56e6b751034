use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;

use crate::aggregate::{day_total, DayTotal};
use crate::commits::CommitRepository;
use crate::datetime::{self, parse_date};
use crate::time_entry::{NewTimeEntry, TimeEntry};
use crate::validation::validate;

/// コミットを追加するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct AddArgs {
    #[clap(short = 'm', long = "message", default_value = "", help = "Task name")]
    pub message: String,

    #[clap(
        short = 'd',
        long = "date",
        help = "Sets a custom date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,

    #[clap(
        short = 'H',
        long = "hours",
        default_value = "0",
        allow_hyphen_values = true,
        help = "Hours spent"
    )]
    pub hours: i64,

    #[clap(
        short = 'M',
        long = "minutes",
        default_value = "0",
        allow_hyphen_values = true,
        help = "Minutes spent, carried over into hours when 60 or more"
    )]
    pub minutes: i64,
}

/// 追加したコミットと、追加後のその日の合計時間。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedCommit {
    pub entry: TimeEntry,
    /// 再取得に失敗した場合は`None`。
    pub day_total: Option<DayTotal>,
}

pub struct AddCommand<'a, T: CommitRepository> {
    repository: &'a T,
}

impl<'a, T: CommitRepository> AddCommand<'a, T> {
    /// 新しい`AddCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - コミットを永続化するリポジトリ
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `add`サブコマンドの処理を行う。
    ///
    /// 入力を検証し、問題がなければ正規化した時間でコミットを追加する。
    /// 検証に失敗した場合はリポジトリを呼び出さずに全てのエラーを返す。
    /// 追加後にその日のコミットを再取得し、合計が24時間を超える場合は警告する。
    /// 再取得に失敗してもコミットは保存済みのため、警告を出して追加結果を返す。
    ///
    /// # Arguments
    ///
    /// * `add` - `add`サブコマンドの引数
    pub async fn run(&self, add: AddArgs) -> Result<AddedCommit> {
        let duration = validate(&add.message, add.hours, add.minutes).context("Invalid commit")?;
        let date = add.date.unwrap_or_else(datetime::today);
        let new_entry = NewTimeEntry::from_validated(date, &add.message, duration);
        info!(
            "Adding commit on {}: {}h {:02}m",
            date, new_entry.hours, new_entry.minutes
        );

        let entry = self
            .repository
            .add_entry(&new_entry)
            .await
            .context("Failed to add commit! Please try again.")?;
        info!("Commit successfully!");

        let day_total = match self.repository.fetch_entries_for_date(date).await {
            Ok(entries) => Some(day_total(&entries, date)),
            Err(err) => {
                warn!("Failed to retrieve commits on {} after adding: {:#}", date, err);
                None
            }
        };
        if let Some(total) = day_total.filter(|total| total.is_over_day) {
            warn!(
                "Total time on {} is now {}h {:02}m, which exceeds 24 hours",
                date, total.total_hours, total.remaining_minutes
            );
        }

        Ok(AddedCommit { entry, day_total })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::{NaiveDate, Utc};
    use mockall::predicate::eq;
    use mockall::Sequence;

    use super::{AddArgs, AddCommand};
    use crate::commits::MockCommitRepository;
    use crate::time_entry::{NewTimeEntry, TimeEntry};
    use crate::validation::{FieldErrors, ValidationError};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn args(message: &str, hours: i64, minutes: i64) -> AddArgs {
        AddArgs {
            message: message.to_string(),
            date: Some(date()),
            hours,
            minutes,
        }
    }

    fn stored(entry: &NewTimeEntry, id: &str) -> TimeEntry {
        TimeEntry {
            id: Some(id.to_string()),
            date: entry.date,
            message: entry.message.clone(),
            duration_minutes: entry.duration_minutes(),
            created_at: Some(Utc::now()),
        }
    }

    /// 正規化した時間で追加し、追加後に再取得することを確認する。
    #[tokio::test]
    async fn test_add_command_normalizes_and_refetches() {
        let mut repository = MockCommitRepository::new();
        let mut seq = Sequence::new();
        repository
            .expect_add_entry()
            .withf(|entry| {
                entry.message == "Fix login bug" && entry.hours == 2 && entry.minutes == 30
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|entry| Ok(stored(entry, "a1")));
        repository
            .expect_fetch_entries_for_date()
            .with(eq(date()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|date| {
                Ok(vec![TimeEntry {
                    id: Some("a1".to_string()),
                    date,
                    message: "Fix login bug".to_string(),
                    duration_minutes: 150,
                    created_at: None,
                }])
            });

        let command = AddCommand::new(&repository);
        let added = command.run(args(" Fix login bug ", 1, 90)).await.unwrap();

        assert_eq!(added.entry.id.as_deref(), Some("a1"));
        assert_eq!(added.entry.duration_minutes, 150);
        let day_total = added.day_total.unwrap();
        assert_eq!(day_total.total_hours, 2);
        assert_eq!(day_total.remaining_minutes, 30);
        assert!(!day_total.is_over_day);
    }

    /// 検証に失敗した場合はリポジトリを呼び出さないことを確認する。
    #[tokio::test]
    async fn test_add_command_invalid_input() {
        let mut repository = MockCommitRepository::new();
        repository.expect_add_entry().never();
        repository.expect_fetch_entries_for_date().never();

        let command = AddCommand::new(&repository);
        let err = command.run(args("", 0, 0)).await.unwrap_err();

        let errors = err.downcast_ref::<FieldErrors>().unwrap();
        assert!(errors.contains(ValidationError::TaskNameRequired));
        assert!(errors.contains(ValidationError::DurationRequired));
    }

    /// 他のコミットと合わせて24時間を超えても追加は成功することを確認する。
    #[tokio::test]
    async fn test_add_command_over_day_is_advisory() {
        let mut repository = MockCommitRepository::new();
        repository
            .expect_add_entry()
            .times(1)
            .returning(|entry| Ok(stored(entry, "b2")));
        repository
            .expect_fetch_entries_for_date()
            .times(1)
            .returning(|date| {
                Ok([1200, 300]
                    .iter()
                    .map(|minutes| TimeEntry {
                        id: None,
                        date,
                        message: "task".to_string(),
                        duration_minutes: *minutes,
                        created_at: None,
                    })
                    .collect())
            });

        let command = AddCommand::new(&repository);
        let added = command.run(args("task", 5, 0)).await.unwrap();

        let day_total = added.day_total.unwrap();
        assert!(day_total.is_over_day);
        assert_eq!(day_total.total_hours, 25);
    }

    /// 追加後の再取得に失敗しても、保存済みのコミットを返すことを確認する。
    #[tokio::test]
    async fn test_add_command_refetch_error_keeps_added_commit() {
        let mut repository = MockCommitRepository::new();
        repository
            .expect_add_entry()
            .times(1)
            .returning(|entry| Ok(stored(entry, "a1")));
        repository
            .expect_fetch_entries_for_date()
            .with(eq(date()))
            .times(1)
            .returning(|_| Err(anyhow!("timeout")));

        let command = AddCommand::new(&repository);
        let added = command.run(args("task", 1, 0)).await.unwrap();

        assert_eq!(added.entry.id.as_deref(), Some("a1"));
        assert_eq!(added.entry.duration_minutes, 60);
        assert_eq!(added.day_total, None);
    }

    #[tokio::test]
    async fn test_add_command_repository_error() {
        let mut repository = MockCommitRepository::new();
        repository
            .expect_add_entry()
            .times(1)
            .returning(|_| Err(anyhow!("503 Service Unavailable")));
        repository.expect_fetch_entries_for_date().never();

        let command = AddCommand::new(&repository);
        let result = command.run(args("task", 1, 0)).await;

        assert!(result.is_err());
    }
}
