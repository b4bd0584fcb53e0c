use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::models::CycleStatus;

/// Short text + color pair for a status badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub text: &'static str,
    pub color: &'static str,
}

/// Observable cycle status. Pure observer: the update cycle sets it at
/// cycle start and end, presentation surfaces read it on demand.
#[derive(Clone)]
pub struct StatusPublisher {
    current: Arc<RwLock<CycleStatus>>,
}

impl StatusPublisher {
    pub fn new() -> Self {
        Self {
            current: Arc::new(RwLock::new(CycleStatus::Idle)),
        }
    }

    pub fn set(&self, status: CycleStatus) {
        *self.current.write().expect("status lock poisoned") = status;
    }

    pub fn current(&self) -> CycleStatus {
        *self.current.read().expect("status lock poisoned")
    }

    /// Badge rendering of the current status.
    pub fn indicator(&self) -> Indicator {
        match self.current() {
            CycleStatus::Idle => Indicator {
                text: "",
                color: "#888",
            },
            CycleStatus::Running => Indicator {
                text: "...",
                color: "#888",
            },
            CycleStatus::Succeeded => Indicator {
                text: "OK",
                color: "#252",
            },
            CycleStatus::Failed { .. } => Indicator {
                text: "Error",
                color: "#a22",
            },
        }
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let status = StatusPublisher::new();
        assert_eq!(status.current(), CycleStatus::Idle);

        status.set(CycleStatus::Running);
        assert_eq!(status.indicator().text, "...");

        status.set(CycleStatus::Succeeded);
        assert_eq!(status.indicator().text, "OK");
        assert_eq!(status.indicator().color, "#252");

        status.set(CycleStatus::Failed { failed_sources: 2 });
        assert_eq!(status.indicator().text, "Error");
        assert_eq!(status.indicator().color, "#a22");
    }
}
