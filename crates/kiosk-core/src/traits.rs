use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewSource, NewsItem, Source, SourceSummary};

/// Fetches raw text content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Runs a source's extraction script against fetched content and returns
/// the normalized item list.
///
/// Implementations must collapse any script failure — a thrown error, a
/// non-array result, or an element that fails shape coercion — into a
/// single `ExtractionError`; partial item lists are never returned.
pub trait Extractor: Send + Sync + Clone {
    fn extract(&self, script: &str, raw: &str) -> Result<Vec<NewsItem>, AppError>;
}

/// Durable collection of source definitions.
pub trait SourceStore: Send + Sync + Clone {
    /// Create a source definition. Returns the store-assigned id.
    fn create(&self, source: &NewSource) -> impl Future<Output = Result<Uuid, AppError>> + Send;

    fn read(&self, id: Uuid) -> impl Future<Output = Result<Option<Source>, AppError>> + Send;

    /// Full replace by id.
    fn update(
        &self,
        id: Uuid,
        source: &NewSource,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Ids of active sources, in insertion order. Cycle processing order.
    fn list_active_ids(&self) -> impl Future<Output = Result<Vec<Uuid>, AppError>> + Send;

    fn list_summaries(&self)
        -> impl Future<Output = Result<Vec<SourceSummary>, AppError>> + Send;
}

/// Key-value settings store.
pub trait SettingsStore: Send + Sync + Clone {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, AppError>> + Send;

    fn set(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Write each default that is currently absent. Present keys are left
    /// untouched.
    fn init_defaults(
        &self,
        defaults: &[(&str, serde_json::Value)],
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}
