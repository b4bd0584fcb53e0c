//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::cycle::{CycleEvent, CycleReporter};
use crate::error::AppError;
use crate::models::{NewSource, Source, SourceSummary};
use crate::traits::{Fetcher, SettingsStore, SourceStore};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns configurable responses and records every
/// request (url and time) for assertions.
#[derive(Clone)]
pub struct MockFetcher {
    inner: Arc<Mutex<FetcherState>>,
}

struct FetcherState {
    /// Queue of responses. Each call pops the first element; when empty,
    /// `default` is returned instead.
    responses: Vec<Result<String, AppError>>,
    default: Option<String>,
    /// One-shot delays applied to upcoming calls, in order.
    delays: Vec<Duration>,
    requests: Vec<String>,
    instants: Vec<tokio::time::Instant>,
}

impl MockFetcher {
    /// Fetcher that returns the same body on every call.
    pub fn new(body: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FetcherState {
                responses: Vec::new(),
                default: Some(body.to_string()),
                delays: Vec::new(),
                requests: Vec::new(),
                instants: Vec::new(),
            })),
        }
    }

    /// Fetcher with an exact response queue; exhausting it is an error.
    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FetcherState {
                responses,
                default: None,
                delays: Vec::new(),
                requests: Vec::new(),
                instants: Vec::new(),
            })),
        }
    }

    /// Queue a delay for the next not-yet-delayed call.
    pub fn delay_next(&self, delay: Duration) {
        self.inner.lock().unwrap().delays.push(delay);
    }

    /// Urls fetched so far, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Start time of each call, for schedule assertions under a paused
    /// clock.
    pub fn request_instants(&self) -> Vec<tokio::time::Instant> {
        self.inner.lock().unwrap().instants.clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let delay = {
            let mut state = self.inner.lock().unwrap();
            state.requests.push(url.to_string());
            state.instants.push(tokio::time::Instant::now());
            if state.delays.is_empty() {
                None
            } else {
                Some(state.delays.remove(0))
            }
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.lock().unwrap();
        if state.responses.is_empty() {
            match &state.default {
                Some(body) => Ok(body.clone()),
                None => Err(AppError::Generic("mock fetcher exhausted".to_string())),
            }
        } else {
            state.responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySourceStore
// ---------------------------------------------------------------------------

/// In-memory [`SourceStore`] keeping sources in insertion order.
#[derive(Clone)]
pub struct MemorySourceStore {
    inner: Arc<Mutex<StoreState>>,
}

struct StoreState {
    sources: Vec<Source>,
    /// Error returned (once) by the next `list_active_ids` call.
    list_error: Option<AppError>,
    /// Ids that `read` pretends were deleted.
    vanished: HashSet<Uuid>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreState {
                sources: Vec::new(),
                list_error: None,
                vanished: HashSet::new(),
            })),
        }
    }

    /// Make the next enumeration fail.
    pub fn with_list_error(self, error: AppError) -> Self {
        self.inner.lock().unwrap().list_error = Some(error);
        self
    }

    /// Make `read` return `None` for `id` while enumeration still lists it,
    /// simulating a row deleted mid-cycle.
    pub fn with_vanishing(self, id: Uuid) -> Self {
        self.inner.lock().unwrap().vanished.insert(id);
        self
    }
}

impl Default for MemorySourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceStore for MemorySourceStore {
    async fn create(&self, source: &NewSource) -> Result<Uuid, AppError> {
        let now = Utc::now();
        let record = Source {
            id: Uuid::new_v4(),
            name: source.name.clone(),
            url: source.url.clone(),
            processing: source.processing.clone(),
            is_active: source.is_active,
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        self.inner.lock().unwrap().sources.push(record);
        Ok(id)
    }

    async fn read(&self, id: Uuid) -> Result<Option<Source>, AppError> {
        let state = self.inner.lock().unwrap();
        if state.vanished.contains(&id) {
            return Ok(None);
        }
        Ok(state.sources.iter().find(|s| s.id == id).cloned())
    }

    async fn update(&self, id: Uuid, source: &NewSource) -> Result<(), AppError> {
        let mut state = self.inner.lock().unwrap();
        let record = state
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("source {id}")))?;
        record.name = source.name.clone();
        record.url = source.url.clone();
        record.processing = source.processing.clone();
        record.is_active = source.is_active;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.inner.lock().unwrap();
        let before = state.sources.len();
        state.sources.retain(|s| s.id != id);
        if state.sources.len() == before {
            return Err(AppError::NotFound(format!("source {id}")));
        }
        Ok(())
    }

    async fn list_active_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(error) = state.list_error.take() {
            return Err(error);
        }
        Ok(state
            .sources
            .iter()
            .filter(|s| s.is_active)
            .map(|s| s.id)
            .collect())
    }

    async fn list_summaries(&self) -> Result<Vec<SourceSummary>, AppError> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .sources
            .iter()
            .map(|s| SourceSummary {
                id: s.id,
                name: s.name.clone(),
                is_active: s.is_active,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemorySettings
// ---------------------------------------------------------------------------

/// In-memory [`SettingsStore`].
#[derive(Clone)]
pub struct MemorySettings {
    values: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AppError> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), AppError> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn init_defaults(
        &self,
        defaults: &[(&str, serde_json::Value)],
    ) -> Result<(), AppError> {
        let mut values = self.values.lock().unwrap();
        for (key, value) in defaults {
            values
                .entry((*key).to_string())
                .or_insert_with(|| value.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that records the label of every event it receives.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    labels: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.labels.lock().unwrap().clone()
    }
}

impl CycleReporter for RecordingReporter {
    fn report(&self, event: CycleEvent<'_>) {
        let label = match event {
            CycleEvent::CycleStarted { .. } => "CycleStarted",
            CycleEvent::SourceUpdated { .. } => "SourceUpdated",
            CycleEvent::SourceFailed { .. } => "SourceFailed",
            CycleEvent::CycleFinished { .. } => "CycleFinished",
            CycleEvent::CycleAborted { .. } => "CycleAborted",
        };
        self.labels.lock().unwrap().push(label);
    }
}
