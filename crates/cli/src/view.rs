use desk_core::bus::{Channel, Event, EventBus, SubscriptionHandle, Topic};
use desk_core::domain::allocation::Entry;

/// Topics the console shows. Everything else stays internal to the core.
const PRESENTATION_TOPICS: [(Channel, Topic); 6] = [
    (Channel::PortfolioProfile, Topic::PortfolioUpdated),
    (Channel::PortfolioProfile, Topic::TroublesomeEntriesFound),
    (Channel::AddInvestmentDialog, Topic::AvailableChoicesReady),
    (Channel::SaveDialog, Topic::SaveStarted),
    (Channel::SaveDialog, Topic::SaveSucceeded),
    (Channel::SaveDialog, Topic::SaveFailed),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

#[derive(Debug)]
pub struct ConsoleView {
    bus: EventBus,
    subscriptions: Vec<SubscriptionHandle>,
}

impl ConsoleView {
    pub fn attach(bus: &EventBus, format: Format) -> Self {
        let subscriptions = PRESENTATION_TOPICS
            .iter()
            .map(|&(channel, topic)| {
                bus.subscribe(channel, topic, move |event| {
                    println!("{}", render_event(event, format)?);
                    Ok(())
                })
            })
            .collect();
        Self {
            bus: bus.clone(),
            subscriptions,
        }
    }

    pub fn detach(&mut self) {
        for handle in self.subscriptions.drain(..) {
            self.bus.unsubscribe(handle);
        }
    }
}

impl Drop for ConsoleView {
    fn drop(&mut self) {
        self.detach();
    }
}

pub fn render_event(event: &Event, format: Format) -> anyhow::Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string(&event.to_envelope()?)?);
    }

    let line = match event {
        Event::PortfolioUpdated(r) => {
            let mark = if r.verdict.is_good() {
                " (good)"
            } else if r.verdict.is_bad() {
                " (bad)"
            } else {
                ""
            };
            format!("profile: {}{mark}", r.message)
        }
        Event::TroublesomeEntriesFound(names) => format!("profile: look at {}", names.join(", ")),
        Event::AvailableChoicesReady(choices) => {
            let listed: Vec<String> = choices
                .iter()
                .map(|c| {
                    if c.already_included {
                        format!("{} (added)", c.name)
                    } else {
                        c.name.clone()
                    }
                })
                .collect();
            format!("picker: {}", listed.join(", "))
        }
        Event::SaveStarted(message) | Event::SaveSucceeded(message) | Event::SaveFailed(message) => {
            format!("save: {message}")
        }
        other => format!("{}: {}", other.address(), serde_json::to_string(other)?),
    };
    Ok(line)
}

/// Editor listing; highlighted entries are starred.
pub fn render_entries(entries: &[Entry], total: u64) -> String {
    let mut out = String::new();
    for entry in entries {
        let star = if entry.highlighted { " *" } else { "" };
        out.push_str(&format!("  {:<6} {:>3}%{star}\n", entry.name, entry.weight));
    }
    out.push_str(&format!("  total  {total:>3}%"));
    out
}
