use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configured feed/page to poll, with its own extraction script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    /// Display label, non-empty.
    pub name: String,
    /// Fetch target.
    pub url: String,
    /// Extraction script source text. The script sees the fetched content
    /// as an implicit `data` variable and must yield an array of items.
    pub processing: String,
    /// Only active sources participate in an update cycle.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for a source definition that has not been assigned an id yet.
/// Also the full-replace payload for updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSource {
    pub name: String,
    pub url: String,
    pub processing: String,
    pub is_active: bool,
}

/// One entry of the source list view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

/// A normalized item produced by an extraction script. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub name: String,
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Result of processing one source in one cycle: the extracted items, or
/// the failure that made the source drop out of this cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOutcome {
    Items(Vec<NewsItem>),
    Error(String),
}

impl SourceResult {
    pub fn ok(name: impl Into<String>, items: Vec<NewsItem>) -> Self {
        Self {
            name: name.into(),
            outcome: SourceOutcome::Items(items),
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: SourceOutcome::Error(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Error(_))
    }

    /// Items for successful sources, empty slice for failed ones.
    pub fn items(&self) -> &[NewsItem] {
        match &self.outcome {
            SourceOutcome::Items(items) => items,
            SourceOutcome::Error(_) => &[],
        }
    }
}

/// The latest complete aggregated result set, replaced wholesale each cycle.
///
/// Ordered by source processing order. Failed sources keep their slot with
/// an error outcome so diagnostics stay visible; presentation surfaces show
/// items from successful entries only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub results: Vec<SourceResult>,
    pub generated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(results: Vec<SourceResult>) -> Self {
        Self {
            results,
            generated_at: Utc::now(),
        }
    }

    /// An empty snapshot, published before the first cycle completes.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failed_sources(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    pub fn total_items(&self) -> usize {
        self.results.iter().map(|r| r.items().len()).sum()
    }
}

/// Outcome of the most recent update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum CycleStatus {
    /// No cycle has run yet.
    Idle,
    /// A cycle is currently executing.
    Running,
    /// The last cycle completed with no per-source failures.
    Succeeded,
    /// The last cycle completed but some sources failed.
    Failed { failed_sources: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let snapshot = Snapshot::new(vec![
            SourceResult::ok(
                "Feed",
                vec![NewsItem {
                    name: "T".into(),
                    link: "http://l".into(),
                    description: "d".into(),
                    image: None,
                }],
            ),
            SourceResult::failed("Broken", "HTTP error: 500"),
        ]);

        assert_eq!(snapshot.failed_sources(), 1);
        assert_eq!(snapshot.total_items(), 1);
        assert!(snapshot.results[1].items().is_empty());
    }

    #[test]
    fn test_news_item_serialization_omits_absent_image() {
        let item = NewsItem {
            name: "T".into(),
            link: "http://l".into(),
            description: String::new(),
            image: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("image").is_none());

        let item = NewsItem {
            image: Some("http://img".into()),
            ..item
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["image"], "http://img");
    }
}
