use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cycle::{CycleReporter, UpdateCycle};
use crate::error::AppError;
use crate::models::Snapshot;
use crate::traits::{Extractor, Fetcher, SettingsStore, SourceStore};

/// Settings key holding the refresh interval in minutes (float).
pub const REFRESH_MINUTES_KEY: &str = "refresh_minutes";

/// Default refresh interval when the setting is absent.
pub const DEFAULT_REFRESH_MINUTES: f64 = 5.0;

// Upper bound on the interval so arming the next deadline can never
// overflow `Instant` arithmetic. A year between polls is already absurd.
const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    /// The next tick is armed; no cycle is executing.
    Scheduled,
    Executing,
}

/// Owns the one recurring update task.
///
/// Each firing re-reads the interval from the settings store, arms the next
/// deadline *before* running the cycle (a long cycle can never delay or
/// duplicate the following tick), then executes one cycle. Exactly one
/// deadline is pending at any time, and cycles never overlap: the loop is
/// sequential and manual triggers are skipped while a cycle is executing.
pub struct Scheduler<S, F, E, T>
where
    S: SourceStore,
    F: Fetcher,
    E: Extractor,
    T: SettingsStore,
{
    cycle: UpdateCycle<S, F, E>,
    settings: T,
    state: Arc<RwLock<SchedulerState>>,
    // Held for the duration of a cycle; try_lock failure means one is
    // already in flight.
    running: Arc<tokio::sync::Mutex<()>>,
}

impl<S, F, E, T> Scheduler<S, F, E, T>
where
    S: SourceStore,
    F: Fetcher,
    E: Extractor,
    T: SettingsStore,
{
    pub fn new(cycle: UpdateCycle<S, F, E>, settings: T) -> Self {
        Self {
            cycle,
            settings,
            state: Arc::new(RwLock::new(SchedulerState::Stopped)),
            running: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn cycle(&self) -> &UpdateCycle<S, F, E> {
        &self.cycle
    }

    pub fn settings(&self) -> &T {
        &self.settings
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.read().expect("scheduler state lock poisoned")
    }

    fn set_state(&self, state: SchedulerState) {
        *self.state.write().expect("scheduler state lock poisoned") = state;
    }

    /// Run the recurring loop until cancellation. One cycle runs
    /// immediately on start so results are available without waiting a
    /// full interval.
    pub async fn run<R: CycleReporter>(&self, cancel_token: CancellationToken, reporter: &R) {
        let mut last_valid = Duration::from_secs_f64(DEFAULT_REFRESH_MINUTES * 60.0);
        self.set_state(SchedulerState::Scheduled);

        loop {
            let interval = self.read_interval(last_valid).await;
            last_valid = interval;

            // Arm the next tick before executing.
            let deadline = Instant::now() + interval;
            self.set_state(SchedulerState::Executing);
            {
                let _guard = self.running.lock().await;
                // The cycle reports its own errors; an aborted cycle must
                // not stop the timer.
                let _ = self.cycle.run_cycle(reporter).await;
            }
            self.set_state(SchedulerState::Scheduled);

            tokio::select! {
                () = tokio::time::sleep_until(deadline) => {}
                () = cancel_token.cancelled() => break,
            }
        }

        self.set_state(SchedulerState::Stopped);
        tracing::info!("Scheduler stopped");
    }

    /// Manually trigger one cycle, outside the recurring schedule.
    ///
    /// Returns `Ok(None)` when a cycle is already executing (reentrancy
    /// guard) — the armed timer is unaffected either way.
    pub async fn run_now<R: CycleReporter>(
        &self,
        reporter: &R,
    ) -> Result<Option<Snapshot>, AppError> {
        let Ok(_guard) = self.running.try_lock() else {
            return Ok(None);
        };
        let snapshot = self.cycle.run_cycle(reporter).await?;
        Ok(Some(snapshot))
    }

    /// Read the refresh interval from the settings store. A missing,
    /// malformed, or non-positive value falls back to the last valid
    /// interval rather than stopping the timer.
    async fn read_interval(&self, last_valid: Duration) -> Duration {
        let value = match self.settings.get(REFRESH_MINUTES_KEY).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read refresh interval, keeping previous");
                return last_valid;
            }
        };

        match value.as_ref().and_then(|v| v.as_f64()).and_then(valid_interval) {
            Some(interval) => interval,
            None => {
                if let Some(bad) = value {
                    let err = AppError::ConfigError(format!(
                        "invalid {REFRESH_MINUTES_KEY} value: {bad}"
                    ));
                    tracing::warn!(error = %err, "Keeping previous refresh interval");
                }
                last_valid
            }
        }
    }
}

/// Convert a minutes value into a usable interval. Non-positive,
/// non-finite, and absurdly large values are rejected so a bad settings
/// write can never panic duration arithmetic.
fn valid_interval(minutes: f64) -> Option<Duration> {
    if minutes <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(minutes * 60.0)
        .ok()
        .filter(|d| *d <= MAX_REFRESH_INTERVAL)
}
