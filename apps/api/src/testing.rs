//! In-memory fakes for every workflow capability. Test-only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::convert::{image_file_name, ConversionError, PdfConverter, PNG_CONTENT_TYPE};
use crate::ids::IdGenerator;
use crate::kv::{KeyValueStore, KvError};
use crate::llm_client::{FeedbackClient, FeedbackResponse, LlmError};
use crate::storage::{FileStore, FileStoreError, StoredFile, UploadFile};
use crate::submission::workflow::{ProgressSink, ResumeSubmissionWorkflow};

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload(String),
    Convert(String),
    Set(String),
    Feedback(String),
}

type CallLog = Arc<Mutex<Vec<Call>>>;

pub struct FakeFileStore {
    log: CallLog,
    uploads: AtomicUsize,
    fail_on: Mutex<Option<usize>>,
    stored: Mutex<Vec<(String, Bytes)>>,
}

impl FakeFileStore {
    /// Makes the n-th upload (1-based) fail.
    pub fn fail_upload_number(&self, n: usize) {
        *self.fail_on.lock().unwrap() = Some(n);
    }

    pub fn stored_paths(&self) -> Vec<String> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }
}

#[async_trait]
impl FileStore for FakeFileStore {
    async fn upload(&self, file: &UploadFile) -> Result<StoredFile, FileStoreError> {
        self.log.lock().unwrap().push(Call::Upload(file.name.clone()));
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_on.lock().unwrap() == Some(n) {
            return Err(FileStoreError::S3("injected failure".to_string()));
        }
        let path = format!("uploads/{n}-{}", file.name);
        self.stored
            .lock()
            .unwrap()
            .push((path.clone(), file.bytes.clone()));
        Ok(StoredFile {
            path,
            name: file.name.clone(),
            size: file.bytes.len() as u64,
        })
    }

    async fn read(&self, path: &str) -> Result<Bytes, FileStoreError> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| FileStoreError::NotFound(path.to_string()))
    }
}

pub struct FakeConverter {
    log: CallLog,
    fail: AtomicBool,
}

impl FakeConverter {
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PdfConverter for FakeConverter {
    async fn convert_to_image(&self, file: &UploadFile) -> Result<UploadFile, ConversionError> {
        self.log.lock().unwrap().push(Call::Convert(file.name.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConversionError::EmptyDocument);
        }
        Ok(UploadFile::new(
            image_file_name(&file.name),
            PNG_CONTENT_TYPE,
            Bytes::from_static(b"\x89PNG"),
        ))
    }
}

#[derive(Default)]
pub struct FakeKv {
    log: CallLog,
    fail: AtomicBool,
    writes: Mutex<Vec<(String, String)>>,
    values: Mutex<HashMap<String, String>>,
}

impl FakeKv {
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Every `set` in call order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl KeyValueStore for FakeKv {
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.log.lock().unwrap().push(Call::Set(key.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(KvError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "injected failure",
            ))));
        }
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        self.insert(key, value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }
}

/// Answers with the configured response, or fails when none is set.
pub struct FakeFeedback {
    log: CallLog,
    response: Mutex<Option<FeedbackResponse>>,
}

impl FakeFeedback {
    pub fn respond_with(&self, response: FeedbackResponse) {
        *self.response.lock().unwrap() = Some(response);
    }
}

#[async_trait]
impl FeedbackClient for FakeFeedback {
    async fn feedback(
        &self,
        resume_path: &str,
        _instructions: &str,
    ) -> Result<FeedbackResponse, LlmError> {
        self.log
            .lock()
            .unwrap()
            .push(Call::Feedback(resume_path.to_string()));
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or(LlmError::EmptyContent)
    }
}

/// Yields `id-1`, `id-2`, ...
#[derive(Default)]
pub struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// All fakes wired to one shared call log.
pub struct Harness {
    log: CallLog,
    pub files: Arc<FakeFileStore>,
    pub converter: Arc<FakeConverter>,
    pub kv: Arc<FakeKv>,
    pub ai: Arc<FakeFeedback>,
    pub ids: Arc<SequentialIds>,
}

impl Harness {
    pub fn new() -> Self {
        let log: CallLog = Arc::default();
        Self {
            files: Arc::new(FakeFileStore {
                log: log.clone(),
                uploads: AtomicUsize::new(0),
                fail_on: Mutex::new(None),
                stored: Mutex::new(Vec::new()),
            }),
            converter: Arc::new(FakeConverter {
                log: log.clone(),
                fail: AtomicBool::new(false),
            }),
            kv: Arc::new(FakeKv {
                log: log.clone(),
                ..FakeKv::default()
            }),
            ai: Arc::new(FakeFeedback {
                log: log.clone(),
                response: Mutex::new(None),
            }),
            ids: Arc::new(SequentialIds::default()),
            log,
        }
    }

    pub fn workflow(&self) -> ResumeSubmissionWorkflow {
        ResumeSubmissionWorkflow::new(
            self.files.clone(),
            self.kv.clone(),
            self.ai.clone(),
            self.converter.clone(),
            self.ids.clone(),
        )
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Processing(bool),
    Status(String),
    Navigate(String),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            SinkEvent::Status(s) => Some(s),
            _ => None,
        })
    }

    pub fn processing(&self) -> Option<bool> {
        self.events().into_iter().rev().find_map(|e| match e {
            SinkEvent::Processing(p) => Some(p),
            _ => None,
        })
    }

    pub fn navigations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Navigate(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn set_processing(&self, processing: bool) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Processing(processing));
    }

    fn set_status(&self, text: &str) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Status(text.to_string()));
    }

    fn navigate(&self, path: &str) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Navigate(path.to_string()));
    }
}
