use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use armada_model::{JobId, ResumptionToken};
use tracing::{debug, warn};

use crate::error::HostError;

/// Durable storage for parked resumption tokens, keyed by job id.
pub trait TokenStore: Send + Sync + 'static {
    fn save(&self, token: &ResumptionToken) -> Result<(), HostError>;

    /// Every token currently stored. Unreadable entries are skipped.
    fn load_all(&self) -> Result<Vec<ResumptionToken>, HostError>;

    /// Forget the token for `job_id`; missing entries are not an error.
    fn remove(&self, job_id: &JobId) -> Result<(), HostError>;
}

/// One JSON file per job in a directory.
///
/// Writes go to a temporary file first and are renamed into place, so a crash never
/// leaves a half-written token behind.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, HostError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| HostError::Store(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(job_id)))
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9_-]`, so distinct ids map to distinct files.
fn file_stem(job_id: &JobId) -> String {
    let mut stem = String::with_capacity(job_id.as_str().len());
    for byte in job_id.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &ResumptionToken) -> Result<(), HostError> {
        let raw = token.to_json().map_err(|e| HostError::Store(e.to_string()))?;
        let path = self.path_for(token.handle().job_id());
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| HostError::Store(format!("write {}: {e}", path.display())))?;
        debug!(path = %path.display(), "token saved");
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ResumptionToken>, HostError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| HostError::Store(format!("read {}: {e}", self.dir.display())))?;

        let mut tokens = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let decoded = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| ResumptionToken::from_json(&raw).map_err(|e| e.to_string()));
            match decoded {
                Ok(token) => tokens.push(token),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable token"),
            }
        }
        tokens.sort_by_key(|t| t.handle().submitted_at_ms());
        Ok(tokens)
    }

    fn remove(&self, job_id: &JobId) -> Result<(), HostError> {
        match fs::remove_file(self.path_for(job_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HostError::Store(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armada_model::{JobHandle, JobStatus, TriggerConfig};

    fn token(id: &str, submitted_at_ms: u64) -> ResumptionToken {
        ResumptionToken::new(
            JobHandle::new(JobId::from(id), "test", "test", submitted_at_ms),
            TriggerConfig::new(30_000, 3_600_000),
            submitted_at_ms,
        )
    }

    #[test]
    fn tokens_survive_reopening_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        store.save(&token("01b", 2_000)).unwrap();
        store
            .save(&token("01a", 1_000).observe(JobStatus::Running))
            .unwrap();

        let reopened = FileTokenStore::open(dir.path()).unwrap();
        let tokens = reopened.load_all().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].handle().job_id().as_str(), "01a");
        assert_eq!(tokens[0].last_status(), Some(&JobStatus::Running));
    }

    #[test]
    fn save_overwrites_and_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        let t = token("01a", 1_000);
        store.save(&t).unwrap();
        store.save(&t.clone().observe(JobStatus::Running)).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);

        store.remove(t.handle().job_id()).unwrap();
        store.remove(t.handle().job_id()).unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn corrupt_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        store.save(&token("01a", 1_000)).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn job_ids_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        let path = store.path_for(&JobId::from("../../etc/passwd"));
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("%2E%2E%2F%2E%2E%2Fetc%2Fpasswd.json")
        );
    }

    #[test]
    fn similar_job_ids_keep_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::open(dir.path()).unwrap();
        for id in ["a/b", "a_b", "a.b", "a%2Fb"] {
            store.save(&token(id, 1_000)).unwrap();
        }
        assert_eq!(store.load_all().unwrap().len(), 4);

        store.remove(&JobId::from("a/b")).unwrap();
        let mut left: Vec<_> = store
            .load_all()
            .unwrap()
            .iter()
            .map(|t| t.handle().job_id().as_str().to_string())
            .collect();
        left.sort();
        assert_eq!(left, ["a%2Fb", "a.b", "a_b"]);
    }
}
