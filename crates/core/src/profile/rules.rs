use crate::domain::allocation::AllocationSnapshot;
use crate::domain::recommendation::{Recommendation, Verdict};

pub const REQUIRED_TOTAL: u64 = 100;
pub const APPL_CEILING: u64 = 50;
pub const FB_CEILING: u64 = 1;
pub const BALANCE_FLOOR: u64 = 20;

type Rule = fn(&AllocationSnapshot) -> Option<Recommendation>;

// Order is significant: the first rule that matches decides the verdict.
const RULES: [Rule; 4] = [invalid_total, too_conservative, holds_fb, nicely_balanced];

fn invalid_total(s: &AllocationSnapshot) -> Option<Recommendation> {
    (s.total != REQUIRED_TOTAL)
        .then(|| Recommendation::new(Verdict::Invalid, "Invalid: does not total 100%", &[]))
}

fn too_conservative(s: &AllocationSnapshot) -> Option<Recommendation> {
    (s.weight_of("APPL") > APPL_CEILING)
        .then(|| Recommendation::new(Verdict::OverConcentrated, "Too Conservative", &["APPL"]))
}

fn holds_fb(s: &AllocationSnapshot) -> Option<Recommendation> {
    (s.weight_of("FB") > FB_CEILING).then(|| Recommendation::new(Verdict::Stupid, "Stupid!", &["FB"]))
}

fn nicely_balanced(s: &AllocationSnapshot) -> Option<Recommendation> {
    (s.weight_of("GOOG") > BALANCE_FLOOR && s.weight_of("MSFT") > BALANCE_FLOOR)
        .then(|| Recommendation::new(Verdict::Balanced, "Nicely Balanced", &[]))
}

/// Classifies an allocation. Pure: the snapshot is only read.
pub fn evaluate(snapshot: &AllocationSnapshot) -> Recommendation {
    RULES
        .iter()
        .find_map(|rule| rule(snapshot))
        .unwrap_or_else(|| Recommendation::new(Verdict::Neutral, "No Recommendations", &[]))
}
