use crate::constants::SESSION_EXTENSION;
use crate::extract::SessionExtractor;
use crate::types::{RefreshFailure, RefreshReport, SessionRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Freshness-checked cache of session records keyed by session id.
///
/// A cached record is fresh while its stored mtime is at least the source
/// file's current mtime. A stale or missing record is re-extracted in full
/// and replaces the previous entry wholesale. Records are never evicted.
pub struct SessionRecordStore {
    root: PathBuf,
    extractor: Box<dyn SessionExtractor>,
    records: HashMap<String, SessionRecord>,
}

struct SourceFile {
    session_id: String,
    path: PathBuf,
}

impl SessionRecordStore {
    pub fn new(root: impl Into<PathBuf>, extractor: Box<dyn SessionExtractor>) -> Self {
        Self {
            root: root.into(),
            extractor,
            records: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate `<root>/<project>/<session>.jsonl`.
    fn source_files(&self) -> Vec<SourceFile> {
        let project_dirs = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(root = ?self.root, error = %e, "source root not readable");
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        for project in project_dirs.flatten() {
            let project_path = project.path();
            if !project_path.is_dir() {
                continue;
            }

            let Ok(sessions) = std::fs::read_dir(&project_path) else {
                tracing::debug!(project = ?project_path, "project directory not readable");
                continue;
            };

            for session in sessions.flatten() {
                let path = session.path();
                if !path.is_file() || path.extension().is_none_or(|e| e != SESSION_EXTENSION) {
                    continue;
                }
                let Some(session_id) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if session_id.is_empty() {
                    continue;
                }
                files.push(SourceFile {
                    session_id: session_id.to_string(),
                    path,
                });
            }
        }

        files
    }

    fn is_fresh(&self, session_id: &str, mtime: SystemTime) -> bool {
        self.records
            .get(session_id)
            .is_some_and(|record| record.mtime >= mtime)
    }

    /// Re-extract every source file whose record is missing or stale.
    ///
    /// Failures are collected per file; one bad file never aborts the pass.
    pub fn ensure_fresh(&mut self) -> RefreshReport {
        let mut report = RefreshReport::default();

        for source in self.source_files() {
            report.scanned += 1;

            let mtime = match std::fs::metadata(&source.path).and_then(|m| m.modified()) {
                Ok(mtime) => mtime,
                Err(e) => {
                    report.failures.push(RefreshFailure {
                        path: source.path,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if self.is_fresh(&source.session_id, mtime) {
                continue;
            }

            match self.extractor.extract(&source.path) {
                Ok(mut record) => {
                    record.mtime = mtime;
                    record.file_path = source.path;
                    self.records.insert(source.session_id.clone(), record);
                    report.extracted.push(source.session_id);
                }
                Err(e) => report.failures.push(RefreshFailure {
                    path: source.path,
                    error: e.to_string(),
                }),
            }
        }

        report
    }

    pub fn get(&self, session_id: &str) -> Result<&SessionRecord, crate::Error> {
        self.records
            .get(session_id)
            .ok_or_else(|| crate::Error::SessionNotFound(session_id.to_string()))
    }

    /// Every cached record, for full scans.
    pub fn get_all(&self) -> &HashMap<String, SessionRecord> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::TranscriptExtractor;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingExtractor {
        calls: Arc<AtomicUsize>,
        inner: TranscriptExtractor,
    }

    impl SessionExtractor for CountingExtractor {
        fn extract(&self, path: &Path) -> Result<SessionRecord, crate::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.extract(path)
        }
    }

    fn counting_store(root: &Path) -> (SessionRecordStore, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = CountingExtractor {
            calls: Arc::clone(&calls),
            inner: TranscriptExtractor::default(),
        };
        (SessionRecordStore::new(root, Box::new(extractor)), calls)
    }

    fn write_session(root: &Path, project: &str, id: &str, prompt: &str) -> PathBuf {
        let dir = root.join(project);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{id}.jsonl"));
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"type":"user","timestamp":"2025-03-01T09:00:00Z","message":{{"content":"{prompt}"}}}}"#
        )
        .unwrap();
        path
    }

    #[test]
    fn test_second_refresh_without_changes_extracts_nothing() {
        let root = tempfile::tempdir().unwrap();
        write_session(root.path(), "proj", "s1", "hello");
        write_session(root.path(), "proj", "s2", "world");

        let (mut store, calls) = counting_store(root.path());
        let first = store.ensure_fresh();
        assert_eq!(first.extracted.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let second = store.ensure_fresh();
        assert_eq!(second.scanned, 2);
        assert!(second.extracted.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_changed_file_is_reextracted_once_and_replaced() {
        let root = tempfile::tempdir().unwrap();
        let path = write_session(root.path(), "proj", "s1", "before");
        write_session(root.path(), "proj", "s2", "untouched");

        let (mut store, calls) = counting_store(root.path());
        store.ensure_fresh();
        assert_eq!(store.get("s1").unwrap().first_message, "before");

        write_session(root.path(), "proj", "s1", "after");
        let later = SystemTime::now() + Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let report = store.ensure_fresh();
        assert_eq!(report.extracted, vec!["s1".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let record = store.get("s1").unwrap();
        assert_eq!(record.first_message, "after");
        assert!(record.mtime > SystemTime::now());
        assert_eq!(record.file_path, path);
    }

    #[test]
    fn test_failing_file_does_not_abort_batch() {
        struct PickyExtractor;

        impl SessionExtractor for PickyExtractor {
            fn extract(&self, path: &Path) -> Result<SessionRecord, crate::Error> {
                if path.file_stem().is_some_and(|s| s == "bad") {
                    return Err(crate::Error::Extraction {
                        path: path.to_path_buf(),
                        reason: "unreadable".to_string(),
                    });
                }
                TranscriptExtractor::default().extract(path)
            }
        }

        let root = tempfile::tempdir().unwrap();
        write_session(root.path(), "proj", "bad", "x");
        write_session(root.path(), "proj", "good", "y");

        let mut store = SessionRecordStore::new(root.path(), Box::new(PickyExtractor));
        let report = store.ensure_fresh();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.extracted, vec!["good".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert!(store.get("good").is_ok());
        assert!(matches!(
            store.get("bad"),
            Err(crate::Error::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_missing_root_and_foreign_files_are_ignored() {
        let root = tempfile::tempdir().unwrap();
        let (mut store, _) = counting_store(&root.path().join("absent"));
        assert_eq!(store.ensure_fresh().scanned, 0);

        let (mut store, _) = counting_store(root.path());
        std::fs::write(root.path().join("stray.jsonl"), "{}").unwrap();
        std::fs::create_dir_all(root.path().join("proj")).unwrap();
        std::fs::write(root.path().join("proj").join("notes.txt"), "x").unwrap();
        assert_eq!(store.ensure_fresh().scanned, 0);
        assert!(store.is_empty());
    }
}
