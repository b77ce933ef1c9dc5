//! Test harness for isolated generation runs.
//!
//! The `TestHarness` owns a temporary directory for artifacts and config
//! files, an in-memory database and a progress recorder, and builds
//! generation services over them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use deckgen::capabilities::mock::RecordingProgress;
use deckgen::db::presentation_repo::PresentationRow;
use deckgen::{Capabilities, Database, FileStorage, GenerationService, ServiceSettings};

/// Upper bound on how long a test waits for a background run.
const WAIT_LIMIT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Isolated environment for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Directory generated decks are written to.
    pub output_dir: PathBuf,
    /// Directory config files are written to.
    pub config_dir: PathBuf,
    pub db: Database,
    pub progress: Arc<RecordingProgress>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let output_dir = temp_dir.path().join("output");
        let config_dir = temp_dir.path().join("config");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        Self {
            temp_dir,
            output_dir,
            config_dir,
            db: Database::open_in_memory().expect("Failed to open test database"),
            progress: Arc::new(RecordingProgress::new()),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn storage(&self) -> FileStorage {
        FileStorage::new(&self.output_dir)
    }

    /// A service with default settings reporting to the harness recorder.
    pub fn service(&self, capabilities: Capabilities) -> GenerationService {
        self.service_with_settings(capabilities, ServiceSettings::default())
    }

    pub fn service_with_settings(
        &self,
        capabilities: Capabilities,
        settings: ServiceSettings,
    ) -> GenerationService {
        GenerationService::with_progress(
            self.db.clone(),
            capabilities,
            self.storage(),
            settings,
            self.progress.clone(),
        )
    }

    /// Writes a config document to the config directory.
    pub fn write_config(&self, filename: &str, json: &str) -> PathBuf {
        let path = self.config_dir.join(filename);
        std::fs::write(&path, json).expect("Failed to write config file");
        path
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls `condition` until it holds, panicking after the wait limit.
pub async fn wait_for<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("Timed out waiting for {}", what);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Waits until no run is registered for `id` and returns the job row.
pub async fn wait_until_settled(service: &GenerationService, id: &str) -> PresentationRow {
    wait_for("run to settle", || !service.is_active(id)).await;
    service.get(id).expect("Presentation should exist")
}
