//! JSON ファイルへのスナップショット保存
//!
//! データディレクトリに 2 つのファイルを置きます：
//!
//! - `backup.json`: 最新のスナップショット
//! - `backup.prev.json`: 1 つ前の `backup.json` のコピー
//!
//! 書き込み前に既存の `backup.json` を `backup.prev.json` へコピーします（失敗しても書き込みは続行）。

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

use crate::{
    domain::{PersistenceError, Snapshot, SnapshotStore},
    infrastructure::dto::snapshot::SnapshotDto,
};

pub const PRIMARY_FILE_NAME: &str = "backup.json";
pub const BACKUP_FILE_NAME: &str = "backup.prev.json";
const TEMP_FILE_NAME: &str = "backup.json.tmp";

/// `SnapshotStore` backed by a pretty-printed JSON file with one rotated backup.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    data_dir: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn primary_path(&self) -> PathBuf {
        self.data_dir.join(PRIMARY_FILE_NAME)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.data_dir.join(BACKUP_FILE_NAME)
    }

    /// Copy the current primary over the backup. Best-effort.
    async fn rotate(&self) {
        let primary = self.primary_path();
        match tokio::fs::try_exists(&primary).await {
            Ok(true) => {
                if let Err(e) = tokio::fs::copy(&primary, self.backup_path()).await {
                    tracing::warn!("Failed to rotate snapshot to {:?}: {}", self.backup_path(), e);
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to check {:?} before rotation: {}", primary, e),
        }
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let bytes = match tokio::fs::read(self.primary_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let dto: SnapshotDto = serde_json::from_slice(&bytes)?;
        Ok(Some(dto.into()))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        self.rotate().await;

        let bytes = serde_json::to_vec_pretty(&SnapshotDto::from(snapshot))?;
        // 途中で落ちても backup.json が壊れないように一時ファイル経由で置き換える
        let temp = self.data_dir.join(TEMP_FILE_NAME);
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, self.primary_path()).await?;
        tracing::debug!(
            "Snapshot written to {:?} ({} bytes)",
            self.primary_path(),
            bytes.len()
        );
        Ok(())
    }
}
