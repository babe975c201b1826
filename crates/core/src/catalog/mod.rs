//! Add-investment picker: offers the universe of names, flags the ones
//! already held and turns a pick into `investmentSelected`.

use crate::bus::{Channel, Choice, Event, EventBus, SubscriptionHandle, Topic};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_TICKERS: [&str; 7] = ["HP", "GOOG", "MSFT", "IBM", "FB", "APPL", "NVDA"];

/// Source of truth for selectable names.
pub trait CatalogSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    fn list_all(&self) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct StaticCatalog {
    tickers: Vec<String>,
}

impl StaticCatalog {
    pub fn new(tickers: Vec<String>) -> Self {
        Self { tickers }
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect())
    }
}

impl CatalogSource for StaticCatalog {
    fn source_name(&self) -> &'static str {
        "static"
    }

    fn list_all(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.tickers.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotOffered(String),
    AlreadyIncluded(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::NotOffered(name) => write!(f, "{name:?} is not among the offered choices"),
            CatalogError::AlreadyIncluded(name) => {
                write!(f, "{name:?} is already in the portfolio")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

pub struct SelectionCatalog {
    bus: EventBus,
    source: Arc<dyn CatalogSource>,
    offer: Mutex<Vec<Choice>>,
}

impl fmt::Debug for SelectionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionCatalog")
            .field("source", &self.source.source_name())
            .field("offer", &*self.offer())
            .finish()
    }
}

impl SelectionCatalog {
    pub fn new(bus: EventBus, source: Arc<dyn CatalogSource>) -> Self {
        Self {
            bus,
            source,
            offer: Mutex::new(Vec::new()),
        }
    }

    fn offer(&self) -> MutexGuard<'_, Vec<Choice>> {
        self.offer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers `AddInvestmentDialog/open` requests on `bus`.
    pub fn listen(self: &Arc<Self>) -> SubscriptionHandle {
        let catalog = Arc::clone(self);
        self.bus.subscribe(Channel::AddInvestmentDialog, Topic::Open, move |event| {
            if let Event::Open(excluded) = event {
                catalog.request_open(excluded.as_slice())?;
            }
            Ok(())
        })
    }

    pub fn request_open<S: AsRef<str>>(&self, excluded: &[S]) -> anyhow::Result<Vec<Choice>> {
        let universe = self.source.list_all()?;
        let choices: Vec<Choice> = universe
            .into_iter()
            .map(|name| {
                let already_included = excluded.iter().any(|x| x.as_ref() == name);
                Choice {
                    name,
                    already_included,
                }
            })
            .collect();

        tracing::debug!(
            source = self.source.source_name(),
            offered = choices.len(),
            excluded = excluded.len(),
            "picker opened"
        );
        *self.offer() = choices.clone();
        self.bus.publish(Event::AvailableChoicesReady(choices.clone()));
        Ok(choices)
    }

    pub fn select(&self, name: &str) -> Result<(), CatalogError> {
        {
            let mut offer = self.offer();
            let choice = offer
                .iter_mut()
                .find(|c| c.name == name)
                .ok_or_else(|| CatalogError::NotOffered(name.to_string()))?;
            if choice.already_included {
                return Err(CatalogError::AlreadyIncluded(name.to_string()));
            }
            choice.already_included = true;
        }

        self.bus.publish(Event::InvestmentSelected(name.to_string()));
        Ok(())
    }

    pub fn choices(&self) -> Vec<Choice> {
        self.offer().clone()
    }
}
