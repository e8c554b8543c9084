use crate::domain::error::{AppError, Result};
use crate::domain::table::Table;
use crate::infrastructure::storage::{ensure_dir, sanitize_file_name};
use crate::infrastructure::tabular::write_xlsx;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const ARTIFACT_PREFIX: &str = "cleaned_";
pub const ARTIFACT_EXTENSION: &str = "xlsx";
pub const TEMP_INPUT_PREFIX: &str = "temp_input_";
const INCOMING_DIR: &str = "incoming";

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::IoError(msg.into())
}

/// Directory-backed store for cleaned artifacts and temporary inputs.
///
/// Layout under `root`:
/// - `cleaned_{uuid}.xlsx` finished artifacts
/// - `incoming/temp_input_{uuid}_{name}` downloaded sources awaiting load
///
/// Artifacts are write-once. They only appear under their final name
/// once fully written, so listings and the sweep never see partial files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    incoming: PathBuf,
    retention: Duration,
}

#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub id: Uuid,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl StoredArtifact {
    pub fn file_name(&self) -> String {
        artifact_file_name(&self.id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub size_bytes: u64,
    pub age_secs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub deleted: Vec<String>,
    pub freed_bytes: u64,
}

pub fn artifact_file_name(id: &Uuid) -> String {
    format!("{}{}.{}", ARTIFACT_PREFIX, id, ARTIFACT_EXTENSION)
}

/// Parse a client-supplied artifact id. Anything but a UUID is rejected
/// so ids can never address paths outside the store.
pub fn parse_artifact_id(file_id: &str) -> Result<Uuid> {
    Uuid::parse_str(file_id.trim())
        .map_err(|_| AppError::ValidationError(format!("Invalid file id: {}", file_id)))
}

impl ArtifactStore {
    pub fn new(root: &Path, retention: Duration) -> Self {
        Self {
            root: root.to_path_buf(),
            incoming: root.join(INCOMING_DIR),
            retention,
        }
    }

    pub fn ensure(&self) -> Result<()> {
        ensure_dir(&self.root)?;
        ensure_dir(&self.incoming)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn incoming_dir(&self) -> &Path {
        &self.incoming
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn artifact_path(&self, id: &Uuid) -> PathBuf {
        self.root.join(artifact_file_name(id))
    }

    /// Persist downloaded bytes under a collision-resistant name.
    pub async fn save_temp_input(&self, bytes: &[u8], filename: &str) -> Result<PathBuf> {
        let path = self.incoming.join(format!(
            "{}{}_{}",
            TEMP_INPUT_PREFIX,
            Uuid::new_v4(),
            sanitize_file_name(filename)
        ));

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            io_err(format!("Failed to write temp file {}: {e}", path.display()))
        })?;

        debug!(path = %path.display(), "Saved temp input");
        Ok(path)
    }

    /// Best-effort removal of a temp input. Failures are only logged.
    pub async fn discard_temp(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Cleaned up temp input file"),
            Err(e) => warn!(path = %path.display(), error = %e, "Couldn't delete temp file"),
        }
    }

    /// Encode `table` as xlsx and store it under a fresh id.
    pub fn save_table(&self, table: &Table) -> Result<StoredArtifact> {
        let bytes = write_xlsx(table)?;
        let id = Uuid::new_v4();
        let path = self.artifact_path(&id);

        atomic_write_bytes(&path, &bytes)?;

        let artifact = StoredArtifact {
            id,
            path,
            size_bytes: bytes.len() as u64,
            created_at: Utc::now(),
        };
        info!(
            file = %artifact.file_name(),
            size_bytes = artifact.size_bytes,
            "Saved cleaned file"
        );
        Ok(artifact)
    }

    /// Path of an existing artifact, or `NotFound` when absent or expired.
    pub fn find(&self, file_id: &str) -> Result<PathBuf> {
        let id = parse_artifact_id(file_id)?;
        let path = self.artifact_path(&id);
        if !path.is_file() {
            return Err(AppError::NotFound(format!(
                "File not found or expired. Files are kept for {} hours.",
                self.retention.as_secs() / 3600
            )));
        }
        Ok(path)
    }

    pub async fn read(&self, file_id: &str) -> Result<Vec<u8>> {
        let path = self.find(file_id)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| io_err(format!("Failed to read {}: {e}", path.display())))
    }

    pub fn delete(&self, file_id: &str) -> Result<()> {
        let path = self.find(file_id)?;
        fs::remove_file(&path)
            .map_err(|e| io_err(format!("Failed to delete {}: {e}", path.display())))?;
        info!(file = %path.display(), "Deleted artifact on request");
        Ok(())
    }

    /// All finished artifacts, newest first.
    pub fn list(&self) -> Result<Vec<ArtifactInfo>> {
        let now = SystemTime::now();
        let mut artifacts: Vec<ArtifactInfo> = Vec::new();

        for (path, meta) in files_in(&self.root)? {
            let name = file_name_of(&path);
            if !is_artifact_name(&name) {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            artifacts.push(ArtifactInfo {
                name,
                size_bytes: meta.len(),
                age_secs: now.duration_since(modified).unwrap_or_default().as_secs(),
            });
        }

        artifacts.sort_by_key(|a| a.age_secs);
        Ok(artifacts)
    }

    /// Delete artifacts, temp inputs and abandoned partial writes older
    /// than the retention window. Fresh files are never touched.
    pub fn sweep_expired(&self) -> Result<SweepReport> {
        let cutoff = SystemTime::now()
            .checked_sub(self.retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut report = SweepReport::default();

        let mut candidates = files_in(&self.root)?;
        if self.incoming.is_dir() {
            candidates.extend(files_in(&self.incoming)?);
        }

        for (path, meta) in candidates {
            let name = file_name_of(&path);
            let sweepable = is_artifact_name(&name)
                || name.starts_with(TEMP_INPUT_PREFIX)
                || is_partial_write(&name);
            if !sweepable {
                continue;
            }

            let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            if mtime >= cutoff {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(file = %name, "Deleted old file");
                    report.freed_bytes += meta.len();
                    report.deleted.push(name);
                }
                Err(e) => warn!(file = %name, error = %e, "Error deleting expired file"),
            }
        }

        if !report.deleted.is_empty() {
            info!(
                deleted = report.deleted.len(),
                freed_bytes = report.freed_bytes,
                "Cleanup complete"
            );
        }
        Ok(report)
    }
}

fn is_artifact_name(name: &str) -> bool {
    name.starts_with(ARTIFACT_PREFIX) && name.ends_with(&format!(".{}", ARTIFACT_EXTENSION))
}

fn is_partial_write(name: &str) -> bool {
    name.starts_with(ARTIFACT_PREFIX) && name.contains(".tmp-")
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn files_in(dir: &Path) -> Result<Vec<(PathBuf, fs::Metadata)>> {
    let mut out = Vec::new();
    for entry in
        fs::read_dir(dir).map_err(|e| io_err(format!("Failed to read dir {}: {e}", dir.display())))?
    {
        let entry = entry.map_err(|e| io_err(format!("Failed dir entry: {e}")))?;
        let path = entry.path();
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            // Removed between listing and stat.
            Err(_) => continue,
        };
        if meta.is_file() {
            out.push((path, meta));
        }
    }
    Ok(out)
}

/// Write to a sibling temp file, then rename into place.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| {
            io_err(format!(
                "Failed to create temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        if let Err(e) = file.write_all(bytes) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_err(format!(
                "Failed to write temp file {}: {e}",
                tmp_path.display()
            )));
        }
        file.sync_all().ok();
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(format!(
            "Failed to rename temp file {} to {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> ArtifactStore {
        let store = ArtifactStore::new(dir, Duration::from_secs(24 * 60 * 60));
        store.ensure().unwrap();
        store
    }

    fn sample_table() -> Table {
        Table::from_rows(
            vec!["Name_CHANGED".into()],
            vec![vec![Some("Alice".into())]],
        )
    }

    fn set_age(path: &Path, age: Duration) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_save_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let artifact = store.save_table(&sample_table()).unwrap();

        assert!(artifact.size_bytes > 0);
        assert_eq!(store.find(&artifact.id.to_string()).unwrap(), artifact.path);
        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(store.list().unwrap()[0].name, artifact.file_name());
    }

    #[test]
    fn test_no_partial_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.save_table(&sample_table()).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert!(names.iter().all(|n| !n.contains(".tmp-")));
    }

    #[test]
    fn test_find_rejects_non_uuid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let err = store.find("../../etc/passwd").unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_find_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let err = store.find(&Uuid::new_v4().to_string()).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let artifact = store.save_table(&sample_table()).unwrap();

        store.delete(&artifact.id.to_string()).unwrap();

        assert!(!artifact.path.exists());
        assert_eq!(
            store.delete(&artifact.id.to_string()).unwrap_err().kind(),
            "not_found"
        );
    }

    #[test]
    fn test_sweep_only_removes_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let old = store.save_table(&sample_table()).unwrap();
        let fresh = store.save_table(&sample_table()).unwrap();
        set_age(&old.path, Duration::from_secs(25 * 60 * 60));

        let old_temp = store.incoming_dir().join("temp_input_x_old.csv");
        let fresh_temp = store.incoming_dir().join("temp_input_y_new.csv");
        fs::write(&old_temp, "a").unwrap();
        fs::write(&fresh_temp, "b").unwrap();
        set_age(&old_temp, Duration::from_secs(30 * 60 * 60));

        let unrelated = dir.path().join("notes.txt");
        fs::write(&unrelated, "keep").unwrap();
        set_age(&unrelated, Duration::from_secs(100 * 60 * 60));

        let report = store.sweep_expired().unwrap();

        assert_eq!(report.deleted.len(), 2);
        assert!(!old.path.exists());
        assert!(fresh.path.exists());
        assert!(!old_temp.exists());
        assert!(fresh_temp.exists());
        assert!(unrelated.exists());
    }

    #[tokio::test]
    async fn test_temp_input_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let path = store
            .save_temp_input(b"a,b\n", "../../evil name.csv")
            .await
            .unwrap();

        assert_eq!(path.parent().unwrap(), store.incoming_dir());
        assert!(file_name_of(&path).ends_with("evil_name.csv"));

        store.discard_temp(&path).await;
        assert!(!path.exists());

        // Second discard only logs.
        store.discard_temp(&path).await;
    }
}
