//! Composition root: one bus, one store, and the components around it.
//!
//! The session owns the cross-component wiring so that no component holds a
//! reference to another:
//!
//! - `AddInvestmentDialog/investmentSelected` adds the entry to the store,
//! - `PortfolioProfile/troublesomeEntriesFound` highlights the offenders,
//! - `PortfolioEditor/selectInvestments` opens the picker.
//!
//! Dropping the session removes every subscription it made.

use crate::bus::{Channel, Event, EventBus, SubscriptionHandle, Topic};
use crate::catalog::{CatalogSource, SelectionCatalog, StaticCatalog};
use crate::config::Settings;
use crate::portfolio::{DuplicatePolicy, PortfolioStore};
use crate::profile::ProfileAnalyzer;
use crate::save::persistence::{Persistence, SaveOutcome, SimulatedPersistence};
use crate::save::{SaveCoordinator, SaveError};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct PortfolioSession {
    bus: EventBus,
    store: Arc<PortfolioStore>,
    catalog: Arc<SelectionCatalog>,
    saver: SaveCoordinator,
    profile: ProfileAnalyzer,
    subscriptions: Vec<SubscriptionHandle>,
}

impl PortfolioSession {
    pub fn new(
        bus: EventBus,
        policy: DuplicatePolicy,
        source: Arc<dyn CatalogSource>,
        persistence: Arc<dyn Persistence>,
        display_interval: Duration,
    ) -> Self {
        let store = Arc::new(PortfolioStore::new(bus.clone(), policy));
        let catalog = Arc::new(SelectionCatalog::new(bus.clone(), source));
        let saver = SaveCoordinator::new(bus.clone(), persistence, display_interval);
        let profile = ProfileAnalyzer::attach(&bus);

        let mut subscriptions = vec![catalog.listen()];

        let s = Arc::clone(&store);
        subscriptions.push(bus.subscribe(
            Channel::AddInvestmentDialog,
            Topic::InvestmentSelected,
            move |event| {
                if let Event::InvestmentSelected(name) = event {
                    s.add_entry(name, 0)?;
                }
                Ok(())
            },
        ));

        let s = Arc::clone(&store);
        subscriptions.push(bus.subscribe(
            Channel::PortfolioProfile,
            Topic::TroublesomeEntriesFound,
            move |event| {
                if let Event::TroublesomeEntriesFound(names) = event {
                    s.highlight(names.as_slice());
                }
                Ok(())
            },
        ));

        let b = bus.clone();
        subscriptions.push(bus.subscribe(
            Channel::PortfolioEditor,
            Topic::SelectInvestments,
            move |event| {
                if let Event::SelectInvestments(names) = event {
                    b.publish(Event::Open(names.clone()));
                }
                Ok(())
            },
        ));

        tracing::debug!(?policy, subscriptions = subscriptions.len() + 1, "session wired");

        Self {
            bus,
            store,
            catalog,
            saver,
            profile,
            subscriptions,
        }
    }

    pub fn from_settings(bus: EventBus, settings: &Settings) -> Self {
        let source = match &settings.catalog_tickers {
            Some(tickers) => StaticCatalog::new(tickers.clone()),
            None => StaticCatalog::default(),
        };
        Self::new(
            bus,
            settings.duplicate_policy,
            Arc::new(source),
            Arc::new(SimulatedPersistence::from_settings(settings)),
            settings.save_display,
        )
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn store(&self) -> &PortfolioStore {
        &self.store
    }

    pub fn catalog(&self) -> &SelectionCatalog {
        &self.catalog
    }

    pub fn saver(&self) -> &SaveCoordinator {
        &self.saver
    }

    /// Submits the current snapshot.
    pub async fn save(&self) -> Result<SaveOutcome, SaveError> {
        self.saver.save(self.store.snapshot()).await
    }
}

impl Drop for PortfolioSession {
    fn drop(&mut self) {
        self.profile.detach();
        for handle in self.subscriptions.drain(..) {
            self.bus.unsubscribe(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::tests::{record, RecordingSink};
    use crate::domain::recommendation::Verdict;
    use crate::save::persistence::SaveMode;
    use crate::save::SaveState;
    use std::sync::Mutex;

    fn session_on(bus: EventBus, mode: SaveMode) -> PortfolioSession {
        PortfolioSession::new(
            bus,
            DuplicatePolicy::Reject,
            Arc::new(StaticCatalog::default()),
            Arc::new(SimulatedPersistence::new(
                "/api/portfolio",
                Duration::from_secs(1),
                mode,
            )),
            Duration::from_secs(2),
        )
    }

    fn highlighted(session: &PortfolioSession) -> Vec<String> {
        session
            .store()
            .entries()
            .into_iter()
            .filter(|e| e.highlighted)
            .map(|e| e.name)
            .collect()
    }

    #[test]
    fn offenders_get_highlighted_and_cleared_on_the_next_edit() {
        let session = session_on(EventBus::new(), SaveMode::Succeed);
        let verdicts: Arc<Mutex<Vec<Verdict>>> = Arc::default();
        let v = Arc::clone(&verdicts);
        session
            .bus()
            .subscribe(Channel::PortfolioProfile, Topic::PortfolioUpdated, move |event| {
                if let Event::PortfolioUpdated(r) = event {
                    v.lock().unwrap().push(r.verdict);
                }
                Ok(())
            });

        let ids = session
            .store()
            .add_entries([("APPL", 60), ("HP", 40)])
            .unwrap();
        assert_eq!(highlighted(&session), vec!["APPL".to_string()]);

        session.store().set_weight(ids[0], 50).unwrap();
        assert!(highlighted(&session).is_empty());

        session.store().set_weight(ids[1], 50).unwrap();
        assert_eq!(
            *verdicts.lock().unwrap(),
            vec![Verdict::OverConcentrated, Verdict::Invalid, Verdict::Neutral]
        );
    }

    #[test]
    fn picking_an_investment_adds_it_through_the_bus() {
        let session = session_on(EventBus::new(), SaveMode::Succeed);
        let log = record(
            session.bus(),
            &[
                (Channel::AddInvestmentDialog, Topic::AvailableChoicesReady),
                (Channel::AddInvestmentDialog, Topic::InvestmentSelected),
                (Channel::PortfolioEditor, Topic::PortfolioChanged),
            ],
        );
        session.store().add_entry("GOOG", 100).unwrap();

        assert_eq!(session.store().request_selection(), 1);
        let goog = session
            .catalog()
            .choices()
            .into_iter()
            .find(|c| c.name == "GOOG")
            .unwrap();
        assert!(goog.already_included);

        session.catalog().select("MSFT").unwrap();
        assert!(session.store().find("MSFT").is_some());
        assert_eq!(session.store().snapshot().weight_of("MSFT"), 0);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "portfolioChanged",
                "availableChoicesReady",
                // The store reacts before later subscribers see the selection.
                "portfolioChanged",
                "investmentSelected"
            ]
        );
    }

    #[test]
    fn rejected_selection_is_reported_not_raised() {
        let sink = Arc::new(RecordingSink::default());
        let session = session_on(EventBus::with_error_sink(sink.clone()), SaveMode::Succeed);
        session.store().add_entry("FB", 0).unwrap();

        session.bus().publish(Event::InvestmentSelected("FB".into()));

        assert_eq!(session.store().entries().len(), 1);
        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("AddInvestmentDialog/investmentSelected"));
    }

    #[tokio::test(start_paused = true)]
    async fn save_submits_the_current_snapshot() {
        let session = session_on(EventBus::new(), SaveMode::Succeed);
        session
            .store()
            .add_entries([("GOOG", 50), ("MSFT", 50)])
            .unwrap();

        assert_eq!(session.save().await, Ok(SaveOutcome::Success));
        assert_eq!(session.saver().state(), SaveState::Succeeded);
    }

    #[test]
    fn dropping_the_session_unwires_the_bus() {
        let bus = EventBus::new();
        let session = session_on(bus.clone(), SaveMode::Succeed);
        assert_eq!(
            bus.subscriber_count(Channel::PortfolioEditor, Topic::PortfolioChanged),
            1
        );

        drop(session);

        for (channel, topic) in [
            (Channel::PortfolioEditor, Topic::PortfolioChanged),
            (Channel::PortfolioEditor, Topic::SelectInvestments),
            (Channel::PortfolioProfile, Topic::TroublesomeEntriesFound),
            (Channel::AddInvestmentDialog, Topic::Open),
            (Channel::AddInvestmentDialog, Topic::InvestmentSelected),
        ] {
            assert_eq!(bus.subscriber_count(channel, topic), 0, "{channel}/{topic}");
        }
    }
}
