pub mod app;
pub mod assembler;
pub mod assets;
pub mod cache;
pub mod capabilities;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod model;
pub mod openai;
pub mod orchestrator;
pub mod research;
pub mod sanitize;
pub mod secrets;
pub mod storage;

pub use app::{build_capabilities, App};
pub use assembler::{AssemblyOutcome, DocumentAssembler, MarkdownDeckRenderer};
pub use cache::{CacheNamespace, CacheStore};
pub use capabilities::{Capabilities, CapabilityError, Generated};
pub use config::{load_config, load_config_from_str, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, DeckgenError, Result, StorageError};
pub use generator::ContentGenerator;
pub use orchestrator::{
    GenerationError, GenerationService, GenerationStatus, NewPresentation, NoopProgress,
    ProgressEvent, ProgressReporter, ServiceSettings,
};
pub use research::ResearchAggregator;
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use storage::FileStorage;
