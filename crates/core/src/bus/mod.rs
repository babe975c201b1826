//! In-process publish/subscribe routing keyed by (channel, topic).
//!
//! Delivery is synchronous and depth-first: a handler that publishes has its
//! nested fan-out completed before the outer loop moves on. The registry lock
//! is never held while a handler runs, so handlers may freely subscribe,
//! unsubscribe or publish.

pub mod event;

pub use event::{Address, Channel, Choice, Event, Topic};

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type HandlerResult = anyhow::Result<()>;

type Handler = Arc<dyn Fn(&Event) -> HandlerResult + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    address: Address,
    id: u64,
}

impl SubscriptionHandle {
    pub fn address(&self) -> Address {
        self.address
    }
}

/// Destination for handler failures. Failures never reach the publisher.
pub trait ErrorSink: Send + Sync {
    fn report(&self, address: Address, subscription: SubscriptionHandle, error: &anyhow::Error);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, address: Address, subscription: SubscriptionHandle, error: &anyhow::Error) {
        tracing::error!(
            channel = %address.channel,
            topic = %address.topic,
            subscription = subscription.id,
            error = %error,
            "event handler failed"
        );
    }
}

struct Registration {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    routes: HashMap<Address, Vec<Registration>>,
}

struct Inner {
    registry: Mutex<Registry>,
    sink: Arc<dyn ErrorSink>,
}

/// Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_error_sink(Arc::new(TracingErrorSink))
    }

    pub fn with_error_sink(sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::default()),
                sink,
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe<F>(&self, channel: Channel, topic: Topic, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        let address = Address::new(channel, topic);
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.routes.entry(address).or_default().push(Registration {
            id,
            handler: Arc::new(handler),
        });
        tracing::trace!(%address, subscription = id, "subscribed");
        SubscriptionHandle { address, id }
    }

    /// Returns `false` when the handle was unknown or already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut registry = self.registry();
        let Some(route) = registry.routes.get_mut(&handle.address) else {
            return false;
        };
        let before = route.len();
        route.retain(|r| r.id != handle.id);
        let removed = route.len() != before;
        if route.is_empty() {
            registry.routes.remove(&handle.address);
        }
        removed
    }

    pub fn subscriber_count(&self, channel: Channel, topic: Topic) -> usize {
        self.registry()
            .routes
            .get(&Address::new(channel, topic))
            .map_or(0, Vec::len)
    }

    fn is_live(&self, handle: SubscriptionHandle) -> bool {
        self.registry()
            .routes
            .get(&handle.address)
            .is_some_and(|route| route.iter().any(|r| r.id == handle.id))
    }

    /// Delivers `event` to the handlers registered for its address when the call
    /// starts. Returns how many of them completed without error.
    pub fn publish(&self, event: Event) -> usize {
        let address = event.address();
        let targets: Vec<(u64, Handler)> = self
            .registry()
            .routes
            .get(&address)
            .map(|route| route.iter().map(|r| (r.id, Arc::clone(&r.handler))).collect())
            .unwrap_or_default();

        let mut delivered = 0;
        for (id, handler) in targets {
            let handle = SubscriptionHandle { address, id };
            // Removed by an earlier handler in this same pass.
            if !self.is_live(handle) {
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&event)));
            match outcome {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => self.inner.sink.report(address, handle, &err),
                Err(payload) => {
                    let err = anyhow::anyhow!("handler panicked: {}", panic_message(&*payload));
                    self.inner.sink.report(address, handle, &err);
                }
            }
        }

        tracing::debug!(%address, delivered, "published event");
        delivered
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) reports: Mutex<Vec<String>>,
    }

    impl ErrorSink for RecordingSink {
        fn report(&self, address: Address, _: SubscriptionHandle, error: &anyhow::Error) {
            self.reports
                .lock()
                .unwrap()
                .push(format!("{address}: {error}"));
        }
    }

    /// Records the topic of every event published on the given addresses.
    pub(crate) fn record(bus: &EventBus, addresses: &[(Channel, Topic)]) -> Log {
        let log = Log::default();
        for &(channel, topic) in addresses {
            let log = Arc::clone(&log);
            bus.subscribe(channel, topic, move |event| {
                log.lock().unwrap().push(event.topic().to_string());
                Ok(())
            });
        }
        log
    }

    fn push(log: &Log, s: &str) {
        log.lock().unwrap().push(s.to_string());
    }

    fn selected(name: &str) -> Event {
        Event::InvestmentSelected(name.to_string())
    }

    #[test]
    fn fan_out_runs_each_handler_to_completion_in_subscription_order() {
        let bus = EventBus::new();
        let log = Log::default();

        let l = Arc::clone(&log);
        bus.subscribe(Channel::AddInvestmentDialog, Topic::InvestmentSelected, move |_| {
            push(&l, "h1 start");
            push(&l, "h1 end");
            Ok(())
        });
        let l = Arc::clone(&log);
        bus.subscribe(Channel::AddInvestmentDialog, Topic::InvestmentSelected, move |_| {
            push(&l, "h2");
            Ok(())
        });

        assert_eq!(bus.publish(selected("HP")), 2);
        assert_eq!(*log.lock().unwrap(), vec!["h1 start", "h1 end", "h2"]);
    }

    #[test]
    fn routing_is_exact_match_only() {
        let bus = EventBus::new();
        let log = record(&bus, &[(Channel::SaveDialog, Topic::InvestmentSelected)]);

        assert_eq!(bus.publish(selected("HP")), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn handler_added_during_publish_waits_for_the_next_pass() {
        let bus = EventBus::new();
        let log = Log::default();

        let inner_bus = bus.clone();
        let l = Arc::clone(&log);
        bus.subscribe(Channel::AddInvestmentDialog, Topic::InvestmentSelected, move |_| {
            let l2 = Arc::clone(&l);
            inner_bus.subscribe(
                Channel::AddInvestmentDialog,
                Topic::InvestmentSelected,
                move |_| {
                    push(&l2, "late");
                    Ok(())
                },
            );
            push(&l, "first");
            Ok(())
        });

        assert_eq!(bus.publish(selected("HP")), 1);
        assert_eq!(*log.lock().unwrap(), vec!["first"]);

        bus.publish(selected("HP"));
        assert_eq!(*log.lock().unwrap(), vec!["first", "first", "late"]);
    }

    #[test]
    fn unsubscribe_inside_a_handler_stops_delivery_in_the_same_pass() {
        let bus = EventBus::new();
        let log = Log::default();
        let victim: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::default();

        let inner_bus = bus.clone();
        let v = Arc::clone(&victim);
        bus.subscribe(Channel::AddInvestmentDialog, Topic::InvestmentSelected, move |_| {
            if let Some(handle) = v.lock().unwrap().take() {
                assert!(inner_bus.unsubscribe(handle));
            }
            Ok(())
        });
        let l = Arc::clone(&log);
        let handle = bus.subscribe(Channel::AddInvestmentDialog, Topic::InvestmentSelected, move |_| {
            push(&l, "victim ran");
            Ok(())
        });
        *victim.lock().unwrap() = Some(handle);

        assert_eq!(bus.publish(selected("HP")), 1);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(
            bus.subscriber_count(Channel::AddInvestmentDialog, Topic::InvestmentSelected),
            1
        );
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let handle = bus.subscribe(Channel::SaveDialog, Topic::SaveStarted, |_| Ok(()));

        assert!(bus.unsubscribe(handle));
        assert!(!bus.unsubscribe(handle));
        assert_eq!(bus.publish(Event::SaveStarted("x".into())), 0);
    }

    #[test]
    fn failing_handlers_are_isolated_and_reported() {
        let sink = Arc::new(RecordingSink::default());
        let bus = EventBus::with_error_sink(sink.clone());
        let log = Log::default();

        bus.subscribe(Channel::SaveDialog, Topic::SaveFailed, |_| {
            anyhow::bail!("view detached")
        });
        bus.subscribe(Channel::SaveDialog, Topic::SaveFailed, |_| panic!("boom"));
        let l = Arc::clone(&log);
        bus.subscribe(Channel::SaveDialog, Topic::SaveFailed, move |_| {
            push(&l, "survivor");
            Ok(())
        });

        assert_eq!(bus.publish(Event::SaveFailed("OH NOES!".into())), 1);
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], "SaveDialog/saveFailed: view detached");
        assert_eq!(reports[1], "SaveDialog/saveFailed: handler panicked: boom");
    }

    #[test]
    fn nested_publish_is_processed_depth_first() {
        let bus = EventBus::new();
        let log = Log::default();

        let inner_bus = bus.clone();
        let l = Arc::clone(&log);
        bus.subscribe(Channel::AddInvestmentDialog, Topic::Open, move |_| {
            push(&l, "open");
            inner_bus.publish(Event::AvailableChoicesReady(vec![]));
            push(&l, "open done");
            Ok(())
        });
        let l = Arc::clone(&log);
        bus.subscribe(Channel::AddInvestmentDialog, Topic::Open, move |_| {
            push(&l, "second open handler");
            Ok(())
        });
        let l = Arc::clone(&log);
        bus.subscribe(
            Channel::AddInvestmentDialog,
            Topic::AvailableChoicesReady,
            move |_| {
                push(&l, "choices");
                Ok(())
            },
        );

        bus.publish(Event::Open(vec![]));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["open", "choices", "open done", "second open handler"]
        );
    }
}
