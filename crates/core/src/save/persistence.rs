use crate::config::Settings;
use crate::domain::allocation::AllocationSnapshot;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const FAILURE_MESSAGE: &str = "OH NOES!";

/// What gets submitted: `{ total, entries }`.
pub type SavePayload = AllocationSnapshot;

/// A failed save is an expected result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SaveOutcome {
    Success,
    Failure { reason: String },
}

#[async_trait::async_trait]
pub trait Persistence: Send + Sync {
    fn persistence_name(&self) -> &'static str;

    async fn submit(&self, payload: SavePayload) -> SaveOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Succeed,
    Fail,
    /// Succeeds when the wall clock's millisecond count is even.
    ClockParity,
}

impl FromStr for SaveMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "succeed" | "success" => Ok(Self::Succeed),
            "fail" | "failure" => Ok(Self::Fail),
            "clock-parity" | "clock_parity" | "random" => Ok(Self::ClockParity),
            other => anyhow::bail!(
                "unknown save mode {other:?} (expected succeed, fail or clock-parity)"
            ),
        }
    }
}

/// Stand-in for the remote save endpoint: waits, then resolves per [`SaveMode`].
#[derive(Debug, Clone)]
pub struct SimulatedPersistence {
    save_url: String,
    delay: Duration,
    mode: SaveMode,
}

impl SimulatedPersistence {
    pub fn new(save_url: impl Into<String>, delay: Duration, mode: SaveMode) -> Self {
        Self {
            save_url: save_url.into(),
            delay,
            mode,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.save_url.clone(), settings.save_delay, settings.save_mode)
    }

    fn resolve(&self) -> SaveOutcome {
        let ok = match self.mode {
            SaveMode::Succeed => true,
            SaveMode::Fail => false,
            SaveMode::ClockParity => chrono::Utc::now().timestamp_millis() % 2 == 0,
        };
        if ok {
            SaveOutcome::Success
        } else {
            SaveOutcome::Failure {
                reason: FAILURE_MESSAGE.to_string(),
            }
        }
    }
}

#[async_trait::async_trait]
impl Persistence for SimulatedPersistence {
    fn persistence_name(&self) -> &'static str {
        "simulated"
    }

    async fn submit(&self, payload: SavePayload) -> SaveOutcome {
        let body = serde_json::to_string(&payload).unwrap_or_default();
        tracing::info!(url = %self.save_url, %body, "saving portfolio");
        tokio::time::sleep(self.delay).await;
        self.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fixed_modes_resolve_after_the_delay() {
        let started = tokio::time::Instant::now();
        let ok = SimulatedPersistence::new("/save", Duration::from_secs(1), SaveMode::Succeed);
        assert_eq!(ok.submit(SavePayload::default()).await, SaveOutcome::Success);
        assert!(started.elapsed() >= Duration::from_secs(1));

        let bad = SimulatedPersistence::new("/save", Duration::ZERO, SaveMode::Fail);
        assert_eq!(
            bad.submit(SavePayload::default()).await,
            SaveOutcome::Failure {
                reason: "OH NOES!".to_string()
            }
        );
    }

    #[test]
    fn save_mode_parses() {
        assert_eq!("clock-parity".parse::<SaveMode>().unwrap(), SaveMode::ClockParity);
        assert_eq!(" FAIL ".parse::<SaveMode>().unwrap(), SaveMode::Fail);
        assert!("maybe".parse::<SaveMode>().is_err());
    }
}
