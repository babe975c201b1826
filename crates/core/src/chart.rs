//! Chart-ready projections of an allocation. Drawing is left to the caller.

use crate::domain::allocation::AllocationSnapshot;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Pie,
    Bar,
}

impl FromStr for ChartKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pie" => Ok(Self::Pie),
            "bar" => Ok(Self::Bar),
            other => anyhow::bail!("unknown chart kind {other:?} (expected pie or bar)"),
        }
    }
}

/// One bar per entry, each with a single data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarSeries {
    pub name: String,
    pub data: Vec<u64>,
}

/// `[name, weight]` pairs.
pub fn pie_series(snapshot: &AllocationSnapshot) -> Vec<(String, u64)> {
    snapshot
        .entries
        .iter()
        .map(|(name, weight)| (name.clone(), *weight))
        .collect()
}

pub fn bar_series(snapshot: &AllocationSnapshot) -> Vec<BarSeries> {
    pie_series(snapshot)
        .into_iter()
        .map(|(name, weight)| BarSeries {
            name,
            data: vec![weight],
        })
        .collect()
}

pub fn render(kind: ChartKind, snapshot: &AllocationSnapshot) -> serde_json::Result<serde_json::Value> {
    match kind {
        ChartKind::Pie => serde_json::to_value(pie_series(snapshot)),
        ChartKind::Bar => serde_json::to_value(bar_series(snapshot)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pie_is_name_weight_pairs() {
        let s = AllocationSnapshot::from_weights([("MSFT", 45), ("GOOG", 55)]);
        assert_eq!(
            render(ChartKind::Pie, &s).unwrap(),
            json!([["GOOG", 55], ["MSFT", 45]])
        );
    }

    #[test]
    fn bar_has_one_point_per_series() {
        let s = AllocationSnapshot::from_weights([("FB", 10)]);
        assert_eq!(
            render(ChartKind::Bar, &s).unwrap(),
            json!([{"name": "FB", "data": [10]}])
        );
    }

    #[test]
    fn kind_parses() {
        assert_eq!("PIE".parse::<ChartKind>().unwrap(), ChartKind::Pie);
        assert!("line".parse::<ChartKind>().is_err());
    }
}
