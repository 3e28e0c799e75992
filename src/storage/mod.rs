mod json_file;
mod memory;

pub use json_file::JsonSnapshotStore;
pub use memory::MemorySnapshotStore;

use std::path::PathBuf;

use anyhow::Result;

use crate::models::RunSnapshot;

/// Where a save put things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSnapshot {
    pub latest: PathBuf,
    /// The previous latest snapshot, if one was rotated out.
    pub archived: Option<PathBuf>,
}

/// One rotated-out snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedSnapshot {
    /// Archive name without extension, e.g. `2024-05-01T12-00-00Z`.
    pub name: String,
    pub path: PathBuf,
}

/// Append-only store of run snapshots: one "latest" plus archives.
///
/// Saving never overwrites history; the previous latest is archived first.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &RunSnapshot) -> Result<SavedSnapshot>;
    async fn latest(&self) -> Result<Option<RunSnapshot>>;
    /// Archives ordered by name, oldest first.
    async fn archives(&self) -> Result<Vec<ArchivedSnapshot>>;
    async fn read_archive(&self, archive: &ArchivedSnapshot) -> Result<RunSnapshot>;
}
