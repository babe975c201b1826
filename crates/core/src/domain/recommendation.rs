use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Invalid,
    OverConcentrated,
    Stupid,
    Balanced,
    Neutral,
}

impl Verdict {
    pub fn is_good(self) -> bool {
        matches!(self, Verdict::Balanced)
    }

    /// Verdicts that name offending entries.
    pub fn is_bad(self) -> bool {
        matches!(self, Verdict::OverConcentrated | Verdict::Stupid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub verdict: Verdict,
    pub message: String,
    pub offending: Vec<String>,
}

impl Recommendation {
    pub fn new(verdict: Verdict, message: &str, offending: &[&str]) -> Self {
        Self {
            verdict,
            message: message.to_string(),
            offending: offending.iter().map(|s| s.to_string()).collect(),
        }
    }
}
