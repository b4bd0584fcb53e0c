pub mod cycle;
pub mod error;
pub mod feed;
pub mod models;
pub mod sandbox;
pub mod scheduler;
pub mod snapshot;
pub mod status;
pub mod testutil;
pub mod traits;

pub use cycle::{CycleEvent, CycleReporter, TracingCycleReporter, UpdateCycle};
pub use error::AppError;
pub use models::{CycleStatus, NewSource, NewsItem, Snapshot, Source, SourceResult};
pub use sandbox::ScriptSandbox;
pub use scheduler::{Scheduler, SchedulerState, DEFAULT_REFRESH_MINUTES, REFRESH_MINUTES_KEY};
pub use snapshot::SnapshotCell;
pub use status::StatusPublisher;
pub use traits::{Extractor, Fetcher, SettingsStore, SourceStore};
