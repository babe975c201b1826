//! Save workflow: `Idle -> Saving -> {Succeeded, Failed} -> Idle`.
//!
//! A success returns to `Idle` by itself after the display interval. A failure
//! stays until dismissed or retried; nothing is retried automatically.

pub mod persistence;

use crate::bus::{Event, EventBus};
use persistence::{Persistence, SaveOutcome, SavePayload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const SAVING_MESSAGE: &str = "Saving Portfolio...";
pub const SUCCESS_MESSAGE: &str = "YAY, SUCCESS!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveState {
    Idle,
    Saving,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The coordinator was in this state when `save` was called.
    AlreadySaving(SaveState),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::AlreadySaving(state) => {
                write!(f, "a save is already in progress (state={state:?})")
            }
        }
    }
}

impl std::error::Error for SaveError {}

#[derive(Debug)]
struct Machine {
    state: SaveState,
    /// Bumped by every accepted `save`; stale timers compare against it.
    attempt: u64,
}

fn lock(machine: &Mutex<Machine>) -> MutexGuard<'_, Machine> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fails an attempt whose `save` future is dropped before the collaborator answers.
struct InFlight {
    machine: Arc<Mutex<Machine>>,
    attempt: u64,
    settled: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut machine = lock(&self.machine);
        if machine.attempt == self.attempt && machine.state == SaveState::Saving {
            machine.state = SaveState::Failed;
            tracing::warn!(attempt = self.attempt, "save abandoned before completion");
        }
    }
}

#[derive(Clone)]
pub struct SaveCoordinator {
    bus: EventBus,
    persistence: Arc<dyn Persistence>,
    machine: Arc<Mutex<Machine>>,
    display_interval: Duration,
}

impl fmt::Debug for SaveCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveCoordinator")
            .field("persistence", &self.persistence.persistence_name())
            .field("state", &self.state())
            .field("display_interval", &self.display_interval)
            .finish()
    }
}

impl SaveCoordinator {
    pub fn new(bus: EventBus, persistence: Arc<dyn Persistence>, display_interval: Duration) -> Self {
        Self {
            bus,
            persistence,
            machine: Arc::new(Mutex::new(Machine {
                state: SaveState::Idle,
                attempt: 0,
            })),
            display_interval,
        }
    }

    pub fn state(&self) -> SaveState {
        lock(&self.machine).state
    }

    /// Accepted from `Idle`, and from `Failed` as an explicit retry.
    ///
    /// Dropping the returned future mid-flight leaves the coordinator in
    /// `Failed`. The return to `Idle` after a success is timed on the Tokio
    /// runtime; polled elsewhere, a success stays displayed until `dismiss`.
    pub async fn save(&self, payload: SavePayload) -> Result<SaveOutcome, SaveError> {
        let attempt = {
            let mut machine = lock(&self.machine);
            match machine.state {
                SaveState::Idle | SaveState::Failed => {}
                state => {
                    tracing::warn!(?state, "save rejected; previous save not finished");
                    return Err(SaveError::AlreadySaving(state));
                }
            }
            machine.state = SaveState::Saving;
            machine.attempt += 1;
            machine.attempt
        };

        tracing::info!(
            attempt,
            total = payload.total,
            persistence = self.persistence.persistence_name(),
            "save started"
        );
        let mut in_flight = InFlight {
            machine: Arc::clone(&self.machine),
            attempt,
            settled: false,
        };
        self.bus.publish(Event::SaveStarted(SAVING_MESSAGE.to_string()));

        let outcome = self.persistence.submit(payload).await;
        in_flight.settled = true;

        match &outcome {
            SaveOutcome::Success => {
                self.finish(attempt, SaveState::Succeeded);
                tracing::info!(attempt, "save succeeded");
                self.bus.publish(Event::SaveSucceeded(SUCCESS_MESSAGE.to_string()));
                self.schedule_auto_return(attempt);
            }
            SaveOutcome::Failure { reason } => {
                self.finish(attempt, SaveState::Failed);
                tracing::warn!(attempt, %reason, "save failed");
                self.bus.publish(Event::SaveFailed(reason.clone()));
            }
        }
        Ok(outcome)
    }

    /// Closes a finished save. Returns `false` when there was nothing to close.
    pub fn dismiss(&self) -> bool {
        let mut machine = lock(&self.machine);
        match machine.state {
            SaveState::Succeeded | SaveState::Failed => {
                machine.state = SaveState::Idle;
                true
            }
            SaveState::Idle | SaveState::Saving => false,
        }
    }

    fn finish(&self, attempt: u64, state: SaveState) {
        let mut machine = lock(&self.machine);
        if machine.attempt == attempt {
            machine.state = state;
        }
    }

    fn schedule_auto_return(&self, attempt: u64) {
        let machine = Arc::clone(&self.machine);
        let interval = self.display_interval;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(attempt, "no Tokio runtime; save result stays until dismissed");
            return;
        };
        runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            let mut machine = lock(&machine);
            if machine.attempt == attempt && machine.state == SaveState::Succeeded {
                machine.state = SaveState::Idle;
                tracing::debug!(attempt, "save result display elapsed");
            }
        });
    }
}
