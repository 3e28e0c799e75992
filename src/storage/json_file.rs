use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs;

use super::{ArchivedSnapshot, SavedSnapshot, SnapshotStore};
use crate::models::RunSnapshot;

const LATEST_FILE: &str = "latest.json";
const TEMP_FILE: &str = "latest.json.tmp";

/// JSON file-based snapshot store.
///
/// Directory structure:
/// ```text
/// results/
///   latest.json
///   2024-04-30T22-15-03Z.json
///   2024-05-01T09-41-57Z.json
/// ```
pub struct JsonSnapshotStore {
    results_dir: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(results_dir: impl AsRef<Path>) -> Self {
        Self {
            results_dir: results_dir.as_ref().to_path_buf(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    fn latest_file(&self) -> PathBuf {
        self.results_dir.join(LATEST_FILE)
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    /// Pick a free archive path for a file created at `created`.
    async fn archive_path(&self, created: DateTime<Utc>) -> Result<PathBuf> {
        let stem = archive_stem(created);
        let mut candidate = self.results_dir.join(format!("{stem}.json"));
        let mut suffix = 1;
        while fs::try_exists(&candidate)
            .await
            .with_context(|| format!("Failed to check {:?}", candidate))?
        {
            candidate = self.results_dir.join(format!("{stem}-{suffix}.json"));
            suffix += 1;
        }
        Ok(candidate)
    }

    async fn rotate_latest(&self) -> Result<Option<PathBuf>> {
        let latest = self.latest_file();
        let metadata = match fs::metadata(&latest).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to stat {:?}", latest)),
        };

        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or_else(|_| SystemTime::now());
        let target = self.archive_path(DateTime::<Utc>::from(created)).await?;

        fs::rename(&latest, &target)
            .await
            .with_context(|| format!("Failed to archive {:?} as {:?}", latest, target))?;
        tracing::debug!(archive = %target.display(), "archived previous snapshot");
        Ok(Some(target))
    }

    async fn write_latest(&self, snapshot: &RunSnapshot) -> Result<PathBuf> {
        let latest = self.latest_file();
        let temp = self.results_dir.join(TEMP_FILE);
        let content = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;

        if let Err(err) = fs::write(&temp, content).await {
            let _ = fs::remove_file(&temp).await;
            return Err(err).with_context(|| format!("Failed to write {:?}", temp));
        }
        if let Err(err) = fs::rename(&temp, &latest).await {
            let _ = fs::remove_file(&temp).await;
            return Err(err).with_context(|| format!("Failed to move {:?} into place", temp));
        }
        Ok(latest)
    }
}

/// ISO-8601 UTC timestamp with `:` replaced so it is a valid file name everywhere.
fn archive_stem(created: DateTime<Utc>) -> String {
    created
        .to_rfc3339_opts(SecondsFormat::Secs, true)
        .replace(':', "-")
}

#[async_trait::async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn save(&self, snapshot: &RunSnapshot) -> Result<SavedSnapshot> {
        fs::create_dir_all(&self.results_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", self.results_dir))?;

        let archived = self.rotate_latest().await?;
        let latest = self.write_latest(snapshot).await?;

        tracing::info!(
            path = %latest.display(),
            archived = archived.is_some(),
            "saved snapshot"
        );
        Ok(SavedSnapshot { latest, archived })
    }

    async fn latest(&self) -> Result<Option<RunSnapshot>> {
        self.read_json(&self.latest_file()).await
    }

    async fn archives(&self) -> Result<Vec<ArchivedSnapshot>> {
        let mut entries = match fs::read_dir(&self.results_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {:?}", self.results_dir))
            }
        };

        let mut archives = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if name == "latest" {
                continue;
            }
            archives.push(ArchivedSnapshot {
                name: name.to_string(),
                path: path.clone(),
            });
        }

        archives.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(archives)
    }

    async fn read_archive(&self, archive: &ArchivedSnapshot) -> Result<RunSnapshot> {
        self.read_json(&archive.path)
            .await?
            .with_context(|| format!("Archive {} no longer exists", archive.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn archive_names_are_filesystem_safe() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 9, 41, 57).unwrap();
        assert_eq!(archive_stem(created), "2024-05-01T09-41-57Z");
    }

    #[tokio::test]
    async fn archive_path_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path());
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 9, 41, 57).unwrap();

        std::fs::write(dir.path().join("2024-05-01T09-41-57Z.json"), "{}").unwrap();
        std::fs::write(dir.path().join("2024-05-01T09-41-57Z-1.json"), "{}").unwrap();

        let path = store.archive_path(created).await.unwrap();
        assert_eq!(path, dir.path().join("2024-05-01T09-41-57Z-2.json"));
    }

    #[tokio::test]
    async fn missing_directory_has_no_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("results"));
        assert!(store.latest().await.unwrap().is_none());
        assert!(store.archives().await.unwrap().is_empty());
    }
}
