//! Durable file-backed storage engine
//!
//! Layout under the data directory:
//!
//! - `forms.json`: every form, rewritten atomically (temp file + rename)
//!   on each mutation
//! - `responses.log`: append-only response log, one checksummed frame per
//!   response, fsynced before an insert is acknowledged
//!
//! On open, a torn frame at the end of the log is truncated away so later
//! appends stay readable. Corruption anywhere else refuses the open.
//!
//! A failed append is rolled back to the previous end of the log. If the
//! rollback itself fails, the handle refuses further inserts until reopened.
//!
//! `open_read_only` is for readers running beside a live server: it never
//! creates, truncates or writes anything, and a torn tail simply ends a scan.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use chrono::Utc;
use tracing::{debug, error, warn};

use super::backend::{apply_publish, apply_update, new_form, FormStore, ResponseCursor, ResponseStore};
use super::errors::{StorageError, StorageResult};
use super::record::{encode_frame, FrameReader};
use super::response::Response;
use crate::schema::{Form, FormDraft};

const FORMS_FILE: &str = "forms.json";
const FORMS_TMP_FILE: &str = "forms.json.tmp";
const RESPONSES_FILE: &str = "responses.log";

/// Store persisting forms and responses under a data directory
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    forms: RwLock<HashMap<String, Form>>,
    /// `None` for read-only handles
    log: Option<Mutex<File>>,
    /// Set when a failed append could not be rolled back
    log_failed: AtomicBool,
}

impl FileStore {
    /// Opens or creates a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created, `forms.json` does not parse,
    /// or the response log holds a corrupted frame before its tail.
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| StorageError::io(format!("Failed to create {}", dir.display()), e))?;

        let forms = load_forms(&dir.join(FORMS_FILE))?;

        let log_path = dir.join(RESPONSES_FILE);
        let log = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| StorageError::io(format!("Failed to open {}", log_path.display()), e))?;
        truncate_torn_tail(&log_path, &log)?;

        debug!(dir = %dir.display(), forms = forms.len(), "opened file store");

        Ok(Self {
            dir,
            forms: RwLock::new(forms),
            log: Some(Mutex::new(log)),
            log_failed: AtomicBool::new(false),
        })
    }

    /// Opens an existing data directory for reading only.
    ///
    /// Safe while another process appends to the same log. Mutations fail
    /// with `ReadOnly`.
    pub fn open_read_only(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        let forms = load_forms(&dir.join(FORMS_FILE))?;

        debug!(dir = %dir.display(), forms = forms.len(), "opened file store read-only");

        Ok(Self {
            dir,
            forms: RwLock::new(forms),
            log: None,
            log_failed: AtomicBool::new(false),
        })
    }

    /// Root data directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_read_only(&self) -> bool {
        self.log.is_none()
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join(RESPONSES_FILE)
    }

    fn writable_log(&self) -> StorageResult<&Mutex<File>> {
        self.log
            .as_ref()
            .ok_or_else(|| StorageError::ReadOnly(self.dir.display().to_string()))
    }

    /// Write all forms to disk, replacing the previous snapshot atomically
    fn persist_forms<'a>(&self, forms: impl Iterator<Item = &'a Form>) -> StorageResult<()> {
        self.writable_log()?;

        let mut all: Vec<&Form> = forms.collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let bytes = serde_json::to_vec_pretty(&all)?;

        let tmp = self.dir.join(FORMS_TMP_FILE);
        let mut file = File::create(&tmp)
            .map_err(|e| StorageError::io("Failed to create forms snapshot", e))?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::io("Failed to write forms snapshot", e))?;
        fs::rename(&tmp, self.dir.join(FORMS_FILE))
            .map_err(|e| StorageError::io("Failed to replace forms snapshot", e))?;
        Ok(())
    }

    /// Apply `f` to a copy of the form and commit it only once it is on disk
    fn modify_form<F>(&self, id: &str, f: F) -> StorageResult<Form>
    where
        F: FnOnce(&mut Form) -> StorageResult<()>,
    {
        let mut forms = self.forms.write().map_err(|_| poisoned())?;
        let mut form = forms
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::FormNotFound(id.to_string()))?;
        f(&mut form)?;

        let others = forms.values().filter(|other| other.id != id);
        self.persist_forms(others.chain(std::iter::once(&form)))?;
        forms.insert(form.id.clone(), form.clone());
        Ok(form)
    }
}

fn poisoned() -> StorageError {
    StorageError::Internal("Lock poisoned".into())
}

fn load_forms(path: &Path) -> StorageResult<HashMap<String, Form>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(StorageError::io("Failed to read forms snapshot", e)),
    };
    let forms: Vec<Form> = serde_json::from_slice(&bytes)?;
    Ok(forms.into_iter().map(|f| (f.id.clone(), f)).collect())
}

/// Scan the log and cut off an incomplete trailing frame.
fn truncate_torn_tail(path: &Path, log: &File) -> StorageResult<()> {
    let file = File::open(path).map_err(|e| StorageError::io("Failed to scan response log", e))?;
    let mut reader = FrameReader::new(BufReader::new(file));
    while reader.read_next()?.is_some() {}

    let valid_end = reader.offset();
    let len = log
        .metadata()
        .map_err(|e| StorageError::io("Failed to stat response log", e))?
        .len();

    if len > valid_end {
        warn!(
            path = %path.display(),
            dropped_bytes = len - valid_end,
            "truncating torn tail of response log"
        );
        log.set_len(valid_end)
            .and_then(|_| log.sync_all())
            .map_err(|e| StorageError::io("Failed to truncate response log", e))?;
    }
    Ok(())
}

/// What the append path needs from the log file
trait AppendLog: Write {
    fn end(&self) -> io::Result<u64>;
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl AppendLog for File {
    fn end(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.sync_data()
    }
}

/// A failed append and whether the log was restored to its previous end
#[derive(Debug)]
struct AppendFailure {
    cause: io::Error,
    rolled_back: bool,
}

/// Append and fsync one frame. On failure the log is cut back to where it was.
fn append_frame<L: AppendLog>(log: &mut L, frame: &[u8]) -> Result<(), AppendFailure> {
    let start = log.end().map_err(|cause| AppendFailure {
        cause,
        rolled_back: true,
    })?;

    let result = log.write_all(frame).and_then(|_| log.sync());
    match result {
        Ok(()) => Ok(()),
        Err(cause) => {
            let rolled_back = log.truncate(start).is_ok();
            Err(AppendFailure { cause, rolled_back })
        }
    }
}

impl FormStore for FileStore {
    fn create_form(&self, draft: FormDraft) -> StorageResult<Form> {
        self.writable_log()?;
        let form = new_form(draft, Utc::now())?;
        let mut forms = self.forms.write().map_err(|_| poisoned())?;
        self.persist_forms(forms.values().chain(std::iter::once(&form)))?;
        forms.insert(form.id.clone(), form.clone());
        Ok(form)
    }

    fn get_form(&self, id: &str) -> StorageResult<Form> {
        let forms = self.forms.read().map_err(|_| poisoned())?;
        forms
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::FormNotFound(id.to_string()))
    }

    fn update_form(&self, id: &str, draft: FormDraft) -> StorageResult<Form> {
        self.modify_form(id, |form| apply_update(form, draft, Utc::now()))
    }

    fn publish_form(&self, id: &str) -> StorageResult<Form> {
        self.modify_form(id, |form| {
            apply_publish(form, Utc::now());
            Ok(())
        })
    }
}

impl ResponseStore for FileStore {
    fn insert(&self, response: Response) -> StorageResult<Response> {
        let frame = encode_frame(&serde_json::to_vec(&response)?)?;

        let mut log = self.writable_log()?.lock().map_err(|_| poisoned())?;
        if self.log_failed.load(Ordering::Acquire) {
            return Err(StorageError::Internal(
                "response log left in an unknown state by a failed append; reopen the store".into(),
            ));
        }

        match append_frame(&mut *log, &frame) {
            Ok(()) => Ok(response),
            Err(AppendFailure { cause, rolled_back }) => {
                if !rolled_back {
                    self.log_failed.store(true, Ordering::Release);
                    error!(path = %self.log_path().display(), error = %cause, "append rollback failed, refusing further inserts");
                }
                Err(StorageError::io("Failed to append response", cause))
            }
        }
    }

    fn find_by_form(&self, form_id: &str) -> StorageResult<ResponseCursor> {
        let path = self.log_path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound && self.is_read_only() => {
                return Ok(Box::new(std::iter::empty::<StorageResult<Response>>()))
            }
            Err(e) => return Err(StorageError::io(format!("Failed to open {}", path.display()), e)),
        };

        Ok(Box::new(LogCursor {
            reader: FrameReader::new(BufReader::new(file)),
            form_id: form_id.to_string(),
            done: false,
        }))
    }
}

/// Lazy scan of the response log filtered to one form
struct LogCursor {
    reader: FrameReader<BufReader<File>>,
    form_id: String,
    done: bool,
}

impl Iterator for LogCursor {
    type Item = StorageResult<Response>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.reader.read_next() {
                Ok(Some(payload)) => match serde_json::from_slice::<Response>(&payload) {
                    Ok(response) if response.form_id == self.form_id => return Some(Ok(response)),
                    Ok(_) => continue,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e.into()));
                    }
                },
                Ok(None) => self.done = true,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Answer, Field, FieldType};
    use crate::storage::record::MAX_PAYLOAD_LEN;
    use tempfile::TempDir;

    fn response(form_id: &str, value: &str) -> Response {
        Response::new(form_id, vec![Answer::new("q", value)], Default::default())
    }

    #[test]
    fn test_forms_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let id = {
            let store = FileStore::open(dir.path()).unwrap();
            let form = store
                .create_form(FormDraft::new("Persisted", vec![Field::new("q", FieldType::Text)]))
                .unwrap();
            store.publish_form(&form.id).unwrap();
            form.id
        };

        let store = FileStore::open(dir.path()).unwrap();
        let form = store.find_published_form(&id).unwrap();
        assert_eq!(form.title, "Persisted");
        assert_eq!(form.fields.len(), 1);
    }

    #[test]
    fn test_responses_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.insert(response("f1", "a")).unwrap();
            store.insert(response("f2", "b")).unwrap();
            store.insert(response("f1", "c")).unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        let found: Vec<Response> = store
            .find_by_form("f1")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.form_id == "f1"));
    }

    #[test]
    fn test_torn_tail_is_truncated_on_open() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.insert(response("f1", "a")).unwrap();
        }

        // Simulate a crash halfway through an append
        let log_path = dir.path().join(RESPONSES_FILE);
        let mut log = OpenOptions::new().append(true).open(&log_path).unwrap();
        let frame = encode_frame(br#"{"half": "#).unwrap();
        log.write_all(&frame[..frame.len() / 2]).unwrap();
        drop(log);

        let store = FileStore::open(dir.path()).unwrap();
        store.insert(response("f1", "b")).unwrap();

        let values: Vec<String> = store
            .find_by_form("f1")
            .unwrap()
            .map(|r| match &r.unwrap().answers[0].value {
                crate::schema::AnswerValue::Text(s) => s.clone(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_corrupted_frame_refuses_open() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.insert(response("f1", "a")).unwrap();
            store.insert(response("f1", "b")).unwrap();
        }

        let log_path = dir.path().join(RESPONSES_FILE);
        let mut bytes = fs::read(&log_path).unwrap();
        bytes[10] ^= 0xff;
        fs::write(&log_path, bytes).unwrap();

        assert!(matches!(
            FileStore::open(dir.path()),
            Err(StorageError::Corrupted { .. })
        ));
    }

    // =========================================================================
    // Size limit
    // =========================================================================

    #[test]
    fn test_oversized_response_refused_before_append() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.insert(response("f1", "small")).unwrap();

        let huge = "x".repeat(MAX_PAYLOAD_LEN as usize + 1);
        assert!(matches!(
            store.insert(response("f1", &huge)),
            Err(StorageError::PayloadTooLarge { .. })
        ));

        store.insert(response("f1", "after")).unwrap();
        drop(store);

        let store = FileStore::open(dir.path()).unwrap();
        let found: Vec<Response> = store
            .find_by_form("f1")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    // =========================================================================
    // Read-only handles
    // =========================================================================

    #[test]
    fn test_read_only_handle_leaves_in_flight_append_alone() {
        let dir = TempDir::new().unwrap();
        let writer = FileStore::open(dir.path()).unwrap();
        writer.insert(response("f1", "a")).unwrap();

        // Writer is midway through an append
        let log_path = dir.path().join(RESPONSES_FILE);
        let frame = encode_frame(&serde_json::to_vec(&response("f1", "b")).unwrap()).unwrap();
        let mut raw = OpenOptions::new().append(true).open(&log_path).unwrap();
        raw.write_all(&frame[..5]).unwrap();
        let len_before = fs::metadata(&log_path).unwrap().len();

        let reader = FileStore::open_read_only(dir.path()).unwrap();
        assert!(reader.is_read_only());
        let seen: Vec<Response> = reader
            .find_by_form("f1")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            reader.insert(response("f1", "c")),
            Err(StorageError::ReadOnly(_))
        ));
        assert!(matches!(
            reader.create_form(FormDraft::new("No", vec![])),
            Err(StorageError::ReadOnly(_))
        ));
        assert_eq!(fs::metadata(&log_path).unwrap().len(), len_before);

        // Append completes, writer keeps going
        raw.write_all(&frame[5..]).unwrap();
        drop(raw);
        writer.insert(response("f1", "c")).unwrap();
        drop(writer);

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.find_by_form("f1").unwrap().count(), 3);
    }

    #[test]
    fn test_read_only_open_of_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("never-created");

        let store = FileStore::open_read_only(&missing).unwrap();
        assert_eq!(store.find_by_form("f1").unwrap().count(), 0);
        assert!(!missing.exists());
    }

    // =========================================================================
    // Append rollback
    // =========================================================================

    /// In-memory log that fails on demand
    #[derive(Default)]
    struct FlakyLog {
        data: Vec<u8>,
        write_budget: Option<usize>,
        fail_sync: bool,
        fail_truncate: bool,
    }

    impl Write for FlakyLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = match self.write_budget {
                Some(0) => return Err(io::Error::new(ErrorKind::Other, "disk full")),
                Some(budget) => budget.min(buf.len()),
                None => buf.len(),
            };
            if let Some(budget) = self.write_budget.as_mut() {
                *budget -= n;
            }
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl AppendLog for FlakyLog {
        fn end(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn sync(&mut self) -> io::Result<()> {
            if self.fail_sync {
                return Err(io::Error::new(ErrorKind::Other, "fsync failed"));
            }
            Ok(())
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.fail_truncate {
                return Err(io::Error::new(ErrorKind::Other, "truncate failed"));
            }
            self.data.truncate(len as usize);
            Ok(())
        }
    }

    #[test]
    fn test_partial_write_is_rolled_back() {
        let mut log = FlakyLog {
            data: b"existing".to_vec(),
            write_budget: Some(3),
            ..Default::default()
        };

        let failure = append_frame(&mut log, &encode_frame(b"{}").unwrap()).unwrap_err();
        assert!(failure.rolled_back);
        assert_eq!(log.data, b"existing");
    }

    #[test]
    fn test_failed_sync_is_rolled_back() {
        let mut log = FlakyLog {
            fail_sync: true,
            ..Default::default()
        };

        let failure = append_frame(&mut log, &encode_frame(b"{}").unwrap()).unwrap_err();
        assert!(failure.rolled_back);
        assert!(log.data.is_empty());
    }

    #[test]
    fn test_failed_rollback_is_reported() {
        let mut log = FlakyLog {
            write_budget: Some(4),
            fail_truncate: true,
            ..Default::default()
        };

        let failure = append_frame(&mut log, &encode_frame(b"{}").unwrap()).unwrap_err();
        assert!(!failure.rolled_back);
        assert_eq!(log.data.len(), 4);
    }

    #[test]
    fn test_inserts_refused_after_failed_rollback() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.insert(response("f1", "a")).unwrap();

        store.log_failed.store(true, Ordering::Release);
        assert!(matches!(
            store.insert(response("f1", "b")),
            Err(StorageError::Internal(_))
        ));
        drop(store);

        let store = FileStore::open(dir.path()).unwrap();
        store.insert(response("f1", "b")).unwrap();
        assert_eq!(store.find_by_form("f1").unwrap().count(), 2);
    }
}
