//! Test helpers: build the create pipeline and the full router for
//! integration tests.
//!
//! Run from workspace root: `cargo test -p graphity-api`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use graphity_api::services::CreatePipeline;
use graphity_api::setup::initialize_app;
use graphity_api::state::AppState;
use graphity_core::constants::{FOLLOW_TARGET, STATUS_UPDATE_TYPE, TYPE, USER_ID};
use graphity_core::models::{FormFile, FormItemSet, TemplateDefinition};
use graphity_core::{ClientResponder, Config, IdentifierValidator, TemplateRegistry};
use graphity_storage::{FileStager, FileStore, LocalFileStore, StorageError, StorageResult};
use graphity_worker::{CommandQueue, CommandReceiver, CommandWorker};
use tempfile::TempDir;
use tokio::sync::oneshot;

pub const PHOTO_TEMPLATE: &str = "Photo";
pub const ALBUM_TEMPLATE: &str = "Album";

/// Registry with the built-in templates, a `Photo` template that needs a
/// `caption` field and a PNG `picture`, and an `Album` with two PNG slots.
pub fn test_registry() -> TemplateRegistry {
    TemplateRegistry::from_templates([
        TemplateDefinition::new("Plain", "1").with_field("message"),
        TemplateDefinition::new(PHOTO_TEMPLATE, "2")
            .with_field("caption")
            .with_file("picture", "image/png"),
        TemplateDefinition::new(ALBUM_TEMPLATE, "1")
            .with_file("cover", "image/png")
            .with_file("back", "image/png"),
    ])
    .expect("Failed to build test registry")
}

/// What a responder was finally told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Finished(Vec<String>),
    Error(u16, String),
}

pub struct Recorder {
    lines: Vec<String>,
    tx: oneshot::Sender<Outcome>,
}

pub struct OutcomeReceiver(oneshot::Receiver<Outcome>);

impl Recorder {
    pub fn new() -> (Box<dyn ClientResponder>, OutcomeReceiver) {
        let (tx, rx) = oneshot::channel();
        (
            Box::new(Recorder {
                lines: Vec::new(),
                tx,
            }),
            OutcomeReceiver(rx),
        )
    }
}

impl ClientResponder for Recorder {
    fn add_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn finish(self: Box<Self>) {
        let Recorder { lines, tx } = *self;
        let _ = tx.send(Outcome::Finished(lines));
    }

    fn error(self: Box<Self>, code: u16, message: &str) {
        let _ = self.tx.send(Outcome::Error(code, message.to_string()));
    }
}

impl OutcomeReceiver {
    /// The terminal call, if one has happened yet.
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        self.0.try_recv().ok()
    }
}

/// A pipeline wired to temp-dir storage and a queue nobody drains, so tests
/// can inspect exactly what was enqueued.
pub struct PipelineFixture {
    pub pipeline: CreatePipeline,
    pub receiver: CommandReceiver,
    pub storage_dir: TempDir,
    pub upload_dir: TempDir,
}

/// Local store whose `nth` persist call (1-based) fails.
pub struct FailingStore {
    inner: LocalFileStore,
    fail_on: usize,
    persists: AtomicUsize,
}

#[async_trait]
impl FileStore for FailingStore {
    async fn persist(
        &self,
        source: &Path,
        content_type: &str,
        original_filename: &str,
    ) -> StorageResult<PathBuf> {
        let call = self.persists.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(StorageError::PersistFailed("disk full".to_string()));
        }
        self.inner
            .persist(source, content_type, original_filename)
            .await
    }

    async fn remove(&self, path: &Path) -> StorageResult<()> {
        self.inner.remove(path).await
    }
}

impl PipelineFixture {
    pub async fn new(capacity: Option<usize>) -> Self {
        Self::build(capacity, |store| -> Arc<dyn FileStore> { Arc::new(store) }).await
    }

    /// Like [`new`](Self::new), but the `fail_on`-th file write fails.
    pub async fn with_failing_persist(capacity: Option<usize>, fail_on: usize) -> Self {
        Self::build(capacity, |inner| -> Arc<dyn FileStore> {
            Arc::new(FailingStore {
                inner,
                fail_on,
                persists: AtomicUsize::new(0),
            })
        })
        .await
    }

    async fn build(
        capacity: Option<usize>,
        wrap: impl FnOnce(LocalFileStore) -> Arc<dyn FileStore>,
    ) -> Self {
        let storage_dir = tempfile::tempdir().expect("Failed to create storage directory");
        let upload_dir = tempfile::tempdir().expect("Failed to create upload directory");

        let store = LocalFileStore::new(
            HashMap::from([(
                "image/png".to_string(),
                storage_dir.path().join("png"),
            )]),
            Some(storage_dir.path().join("other")),
        )
        .await
        .expect("Failed to create local file store");

        let (queue, receiver) = CommandQueue::new(capacity);
        let pipeline = CreatePipeline::new(
            IdentifierValidator::default(),
            test_registry(),
            FileStager::new(wrap(store)),
            queue,
        );

        Self {
            pipeline,
            receiver,
            storage_dir,
            upload_dir,
        }
    }

    /// Uploaded file parked in the upload directory, as multipart decoding
    /// leaves it.
    pub fn upload(&self, filename: &str, content_type: &str, data: &[u8]) -> FormFile {
        let mut transient = tempfile::NamedTempFile::new_in(self.upload_dir.path())
            .expect("Failed to create upload file");
        transient.write_all(data).expect("Failed to write upload");
        FormFile::new(filename, content_type, transient, data.len() as u64)
    }

    /// Every file under the storage directory.
    pub fn stored_files(&self) -> Vec<PathBuf> {
        list_files(self.storage_dir.path())
    }
}

pub fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(list_files(&path));
        } else {
            files.push(path);
        }
    }
    files
}

pub fn follow_form(actor: &str, target: Option<&str>) -> FormItemSet {
    let mut items = FormItemSet::new();
    items.add_field(USER_ID, actor).unwrap();
    items.add_field(TYPE, "follow").unwrap();
    if let Some(target) = target {
        items.add_field(FOLLOW_TARGET, target).unwrap();
    }
    items
}

pub fn status_update_form(actor: &str, template: &str) -> FormItemSet {
    let mut items = FormItemSet::new();
    items.add_field(USER_ID, actor).unwrap();
    items.add_field(TYPE, "status_update").unwrap();
    items.add_field(STATUS_UPDATE_TYPE, template).unwrap();
    items
}

/// The full application, served in-process.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub worker: CommandWorker,
    pub storage_dir: TempDir,
    pub _upload_dir: TempDir,
    pub _templates: tempfile::NamedTempFile,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn stored_files(&self) -> Vec<PathBuf> {
        list_files(self.storage_dir.path())
    }
}

/// Build the app through `initialize_app`, the way `main` does.
pub async fn setup_test_app() -> TestApp {
    let storage_dir = tempfile::tempdir().expect("Failed to create storage directory");
    let upload_dir = tempfile::tempdir().expect("Failed to create upload directory");

    let mut templates = tempfile::NamedTempFile::new().expect("Failed to create templates file");
    write!(
        templates,
        r#"[{{"identifier":"{}","version":"2","fields":[{{"name":"caption"}}],"files":[{{"name":"picture","content_type":"image/png"}}]}}]"#,
        PHOTO_TEMPLATE
    )
    .expect("Failed to write templates file");

    let config = Config {
        server_port: 0,
        environment: "test".to_string(),
        upload_temp_dir: upload_dir.path().to_path_buf(),
        storage_dirs: HashMap::from([(
            "image/png".to_string(),
            storage_dir.path().join("png"),
        )]),
        default_storage_dir: Some(storage_dir.path().join("other")),
        templates_path: Some(templates.path().to_path_buf()),
        max_upload_size_bytes: 1024 * 1024,
        command_queue_capacity: Some(64),
        command_workers: 2,
        command_max_retries: 0,
        response_timeout_secs: 5,
    };

    let (state, router, worker) = initialize_app(config)
        .await
        .expect("Failed to initialize app");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        worker,
        storage_dir,
        _upload_dir: upload_dir,
        _templates: templates,
    }
}

/// PNG signature. Uploaded content is never decoded.
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0, 0, 0, 0]
}
