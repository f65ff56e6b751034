use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::commits::CommitRepository;
use crate::datetime;
use crate::time_entry::{duration_from_parts, NewTimeEntry, SummaryPoint, TimeEntry};

/// ファイルに保存するコミット。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCommit {
    id: String,
    date: NaiveDate,
    message: String,
    hours: u32,
    minutes: u32,
    created_at: DateTime<Utc>,
}

impl StoredCommit {
    fn duration_minutes(&self) -> Result<u32> {
        duration_from_parts(self.hours, self.minutes)
            .with_context(|| format!("Invalid duration in commit {}", self.id))
    }
}

impl TryFrom<StoredCommit> for TimeEntry {
    type Error = anyhow::Error;

    fn try_from(stored: StoredCommit) -> Result<Self> {
        let duration_minutes = stored.duration_minutes()?;

        Ok(TimeEntry {
            id: Some(stored.id),
            date: stored.date,
            message: stored.message,
            duration_minutes,
            created_at: Some(stored.created_at),
        })
    }
}

/// データファイルのデフォルトのパスを返す。
///
/// OSのデータディレクトリが取得できない場合はエラーを返す。
pub fn default_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("Failed to resolve data directory")?;
    Ok(data_dir.join("commitmap").join("commits.json"))
}

/// JSONファイルにコミットを保存するリポジトリ。
///
/// 呼び出し毎にファイル全体を読み込み、変更時は全体を書き直す。
pub struct LocalCommitStore {
    path: PathBuf,
}

impl LocalCommitStore {
    /// 新しい`LocalCommitStore`を返す。ファイルは最初の書き込み時に作成する。
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<StoredCommit>> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse data file: {}", self.path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("data file not found, starting empty: {}", self.path.display());
                Ok(Vec::new())
            }
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read data file: {}", self.path.display())),
        }
    }

    async fn persist(&self, commits: &[StoredCommit]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let payload = serde_json::to_vec_pretty(commits).context("Failed to serialize commits")?;
        fs::write(&self.path, payload)
            .await
            .with_context(|| format!("Failed to write data file: {}", self.path.display()))?;

        Ok(())
    }
}

#[async_trait]
impl CommitRepository for LocalCommitStore {
    async fn add_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry> {
        let mut commits = self.load().await?;
        let stored = StoredCommit {
            id: Uuid::new_v4().to_string(),
            date: entry.date,
            message: entry.message.clone(),
            hours: entry.hours,
            minutes: entry.minutes,
            created_at: datetime::now(),
        };
        commits.push(stored.clone());
        self.persist(&commits).await?;
        info!("Commit {} stored in {}", stored.id, self.path.display());

        TimeEntry::try_from(stored)
    }

    async fn delete_entry(&self, id: &str) -> Result<()> {
        let mut commits = self.load().await?;
        let before = commits.len();
        commits.retain(|commit| commit.id != id);
        if commits.len() == before {
            bail!("Commit not found: {}", id);
        }
        self.persist(&commits).await?;
        info!("Commit {} deleted.", id);

        Ok(())
    }

    async fn fetch_entries_for_date(&self, date: NaiveDate) -> Result<Vec<TimeEntry>> {
        self.load()
            .await?
            .into_iter()
            .filter(|commit| commit.date == date)
            .map(TimeEntry::try_from)
            .collect()
    }

    async fn fetch_summary(&self, year: i32) -> Result<Vec<SummaryPoint>> {
        // 活動のある日のみを返す
        let totals = self
            .load()
            .await?
            .into_iter()
            .filter(|commit| commit.date.year() == year)
            .try_fold(BTreeMap::new(), |mut acc, commit| -> Result<_> {
                let minutes = commit.duration_minutes()?;
                let total = acc.entry(commit.date).or_insert(0u32);
                *total = total.saturating_add(minutes);
                Ok(acc)
            })?;

        Ok(totals
            .into_iter()
            .map(|(date, duration)| SummaryPoint { date, duration })
            .collect())
    }
}
