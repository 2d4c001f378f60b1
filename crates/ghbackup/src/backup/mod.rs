//! Per-credential backup orchestration.

mod engine;
mod progress;
mod types;

pub use engine::backup_credential;
pub use progress::{BackupProgress, ProgressCallback, emit};
pub use types::{
    BackupError, BackupOptions, BackupReport, BackupState, DEFAULT_CONCURRENCY, ProcessedSet,
    RepositoryRef,
};
