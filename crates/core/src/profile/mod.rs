//! Portfolio profile: runs the rule set whenever the portfolio changes.

pub mod rules;

pub use rules::evaluate;

use crate::bus::{Channel, Event, EventBus, SubscriptionHandle, Topic};
use crate::domain::allocation::AllocationSnapshot;
use crate::domain::recommendation::Recommendation;

/// Publishes `portfolioUpdated` for every evaluation and, for verdicts that
/// name offenders, `troublesomeEntriesFound` right after it.
pub fn publish_evaluation(bus: &EventBus, snapshot: &AllocationSnapshot) -> Recommendation {
    let recommendation = evaluate(snapshot);
    tracing::debug!(
        verdict = ?recommendation.verdict,
        total = snapshot.total,
        "portfolio evaluated"
    );

    bus.publish(Event::PortfolioUpdated(recommendation.clone()));
    if recommendation.verdict.is_bad() {
        bus.publish(Event::TroublesomeEntriesFound(recommendation.offending.clone()));
    }
    recommendation
}

#[derive(Debug)]
pub struct ProfileAnalyzer {
    bus: EventBus,
    subscription: Option<SubscriptionHandle>,
}

impl ProfileAnalyzer {
    pub fn attach(bus: &EventBus) -> Self {
        let publisher = bus.clone();
        let subscription = bus.subscribe(Channel::PortfolioEditor, Topic::PortfolioChanged, move |event| {
            if let Event::PortfolioChanged(snapshot) = event {
                publish_evaluation(&publisher, snapshot);
            }
            Ok(())
        });
        Self {
            bus: bus.clone(),
            subscription: Some(subscription),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn detach(&mut self) {
        if let Some(handle) = self.subscription.take() {
            self.bus.unsubscribe(handle);
        }
    }
}

impl Drop for ProfileAnalyzer {
    fn drop(&mut self) {
        self.detach();
    }
}
