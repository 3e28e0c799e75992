//! In-memory snapshot store for testing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use super::{ArchivedSnapshot, SavedSnapshot, SnapshotStore};
use crate::models::RunSnapshot;

#[derive(Default)]
struct State {
    latest: Option<RunSnapshot>,
    archives: Vec<(String, RunSnapshot)>,
}

/// Keeps snapshots in memory. Archives are named after the rotated snapshot's
/// own timestamp.
#[derive(Default)]
pub struct MemorySnapshotStore {
    state: Mutex<State>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, snapshot: &RunSnapshot) -> Result<SavedSnapshot> {
        let mut state = self.state.lock().await;

        let archived = match state.latest.take() {
            Some(previous) => {
                let stem = previous
                    .timestamp
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
                    .replace(':', "-");
                let mut name = stem.clone();
                let mut suffix = 1;
                while state.archives.iter().any(|(existing, _)| *existing == name) {
                    name = format!("{stem}-{suffix}");
                    suffix += 1;
                }
                let path = PathBuf::from(format!("{name}.json"));
                state.archives.push((name, previous));
                Some(path)
            }
            None => None,
        };

        state.latest = Some(snapshot.clone());
        Ok(SavedSnapshot {
            latest: PathBuf::from("latest.json"),
            archived,
        })
    }

    async fn latest(&self) -> Result<Option<RunSnapshot>> {
        Ok(self.state.lock().await.latest.clone())
    }

    async fn archives(&self) -> Result<Vec<ArchivedSnapshot>> {
        let state = self.state.lock().await;
        let mut archives: Vec<ArchivedSnapshot> = state
            .archives
            .iter()
            .map(|(name, _)| ArchivedSnapshot {
                name: name.clone(),
                path: PathBuf::from(format!("{name}.json")),
            })
            .collect();
        archives.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(archives)
    }

    async fn read_archive(&self, archive: &ArchivedSnapshot) -> Result<RunSnapshot> {
        let state = self.state.lock().await;
        state
            .archives
            .iter()
            .find(|(name, _)| *name == archive.name)
            .map(|(_, snapshot)| snapshot.clone())
            .with_context(|| format!("Archive {} not found", archive.name))
    }
}
