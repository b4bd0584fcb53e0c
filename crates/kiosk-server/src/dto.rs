use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kiosk_core::models::{
    CycleStatus, NewSource, NewsItem, Snapshot, Source, SourceOutcome, SourceResult, SourceSummary,
};
use kiosk_core::status::Indicator;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct NewsItemResponse {
    pub name: String,
    pub link: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<NewsItem> for NewsItemResponse {
    fn from(item: NewsItem) -> Self {
        Self {
            name: item.name,
            link: item.link,
            description: item.description,
            image: item.image,
        }
    }
}

/// Per-source slice of a snapshot: either items or an error message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceResultResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<NewsItemResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<SourceResult> for SourceResultResponse {
    fn from(result: SourceResult) -> Self {
        match result.outcome {
            SourceOutcome::Items(items) => Self {
                name: result.name,
                items: Some(items.into_iter().map(Into::into).collect()),
                error: None,
            },
            SourceOutcome::Error(message) => Self {
                name: result.name,
                items: None,
                error: Some(message),
            },
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SnapshotResponse {
    pub results: Vec<SourceResultResponse>,
    pub generated_at: DateTime<Utc>,
}

impl From<Snapshot> for SnapshotResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            results: snapshot.results.into_iter().map(Into::into).collect(),
            generated_at: snapshot.generated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct IndicatorResponse {
    /// Badge text, e.g. "OK" or "Error".
    pub text: String,
    /// Badge background as a CSS color.
    pub color: String,
}

impl From<Indicator> for IndicatorResponse {
    fn from(indicator: Indicator) -> Self {
        Self {
            text: indicator.text.to_string(),
            color: indicator.color.to_string(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    /// One of: idle, running, succeeded, failed.
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_sources: Option<usize>,
    pub indicator: IndicatorResponse,
}

impl StatusResponse {
    pub fn new(status: CycleStatus, indicator: Indicator) -> Self {
        let (state, failed_sources) = match status {
            CycleStatus::Idle => ("idle", None),
            CycleStatus::Running => ("running", None),
            CycleStatus::Succeeded => ("succeeded", None),
            CycleStatus::Failed { failed_sources } => ("failed", Some(failed_sources)),
        };
        Self {
            state: state.to_string(),
            failed_sources,
            indicator: indicator.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateSourceRequest {
    pub name: String,
    pub url: String,
    /// Extraction script, run against the fetched document.
    pub processing: String,
    /// Defaults to true.
    pub is_active: Option<bool>,
}

impl From<CreateSourceRequest> for NewSource {
    fn from(body: CreateSourceRequest) -> Self {
        Self {
            name: body.name,
            url: body.url,
            processing: body.processing,
            is_active: body.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateSourceResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateSourceRequest {
    pub name: String,
    pub url: String,
    pub processing: String,
    pub is_active: bool,
}

impl From<UpdateSourceRequest> for NewSource {
    fn from(body: UpdateSourceRequest) -> Self {
        Self {
            name: body.name,
            url: body.url,
            processing: body.processing,
            is_active: body.is_active,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceResponse {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub processing: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Source> for SourceResponse {
    fn from(source: Source) -> Self {
        Self {
            id: source.id,
            name: source.name,
            url: source.url,
            processing: source.processing,
            is_active: source.is_active,
            created_at: source.created_at,
            updated_at: source.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceSummaryResponse {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

impl From<SourceSummary> for SourceSummaryResponse {
    fn from(summary: SourceSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            is_active: summary.is_active,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceListResponse {
    pub sources: Vec<SourceSummaryResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SettingResponse {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PutSettingRequest {
    pub value: serde_json::Value,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
