use anyhow::{ensure, Context, Result};
use log::info;

use crate::commits::CommitRepository;

/// コミットを削除するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct DeleteArgs {
    #[clap(help = "ID of the commit to delete")]
    pub id: String,
}

pub struct DeleteCommand<'a, T: CommitRepository> {
    repository: &'a T,
}

impl<'a, T: CommitRepository> DeleteCommand<'a, T> {
    /// 新しい`DeleteCommand`を返す。
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `delete`サブコマンドの処理を行う。
    pub async fn run(&self, delete: DeleteArgs) -> Result<()> {
        let id = delete.id.trim();
        ensure!(!id.is_empty(), "Commit ID is required");

        self.repository
            .delete_entry(id)
            .await
            .with_context(|| format!("Failed to delete commit {}", id))?;
        info!("Commit {} deleted successfully.", id);

        Ok(())
    }
}
