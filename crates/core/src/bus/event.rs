use crate::domain::allocation::AllocationSnapshot;
use crate::domain::recommendation::Recommendation;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Channel {
    PortfolioEditor,
    PortfolioProfile,
    AddInvestmentDialog,
    SaveDialog,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::PortfolioEditor => "PortfolioEditor",
            Channel::PortfolioProfile => "PortfolioProfile",
            Channel::AddInvestmentDialog => "AddInvestmentDialog",
            Channel::SaveDialog => "SaveDialog",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    PortfolioChanged,
    SelectInvestments,
    PortfolioUpdated,
    TroublesomeEntriesFound,
    Open,
    AvailableChoicesReady,
    InvestmentSelected,
    SaveStarted,
    SaveSucceeded,
    SaveFailed,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::PortfolioChanged => "portfolioChanged",
            Topic::SelectInvestments => "selectInvestments",
            Topic::PortfolioUpdated => "portfolioUpdated",
            Topic::TroublesomeEntriesFound => "troublesomeEntriesFound",
            Topic::Open => "open",
            Topic::AvailableChoicesReady => "availableChoicesReady",
            Topic::InvestmentSelected => "investmentSelected",
            Topic::SaveStarted => "saveStarted",
            Topic::SaveSucceeded => "saveSucceeded",
            Topic::SaveFailed => "saveFailed",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing key of a subscription or a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub channel: Channel,
    pub topic: Topic,
}

impl Address {
    pub const fn new(channel: Channel, topic: Topic) -> Self {
        Self { channel, topic }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.topic)
    }
}

/// One selectable name offered by the add-investment picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub name: String,
    pub already_included: bool,
}

/// Every message the bus can carry. The variant fixes its own address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "topic", content = "payload", rename_all = "camelCase")]
pub enum Event {
    PortfolioChanged(AllocationSnapshot),
    /// Names already in the portfolio, sent when the editor asks for the picker.
    SelectInvestments(Vec<String>),
    PortfolioUpdated(Recommendation),
    TroublesomeEntriesFound(Vec<String>),
    /// Names to exclude from the picker.
    Open(Vec<String>),
    AvailableChoicesReady(Vec<Choice>),
    InvestmentSelected(String),
    SaveStarted(String),
    SaveSucceeded(String),
    SaveFailed(String),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::PortfolioChanged(_) => Topic::PortfolioChanged,
            Event::SelectInvestments(_) => Topic::SelectInvestments,
            Event::PortfolioUpdated(_) => Topic::PortfolioUpdated,
            Event::TroublesomeEntriesFound(_) => Topic::TroublesomeEntriesFound,
            Event::Open(_) => Topic::Open,
            Event::AvailableChoicesReady(_) => Topic::AvailableChoicesReady,
            Event::InvestmentSelected(_) => Topic::InvestmentSelected,
            Event::SaveStarted(_) => Topic::SaveStarted,
            Event::SaveSucceeded(_) => Topic::SaveSucceeded,
            Event::SaveFailed(_) => Topic::SaveFailed,
        }
    }

    pub fn channel(&self) -> Channel {
        match self.topic() {
            Topic::PortfolioChanged | Topic::SelectInvestments => Channel::PortfolioEditor,
            Topic::PortfolioUpdated | Topic::TroublesomeEntriesFound => Channel::PortfolioProfile,
            Topic::Open | Topic::AvailableChoicesReady | Topic::InvestmentSelected => {
                Channel::AddInvestmentDialog
            }
            Topic::SaveStarted | Topic::SaveSucceeded | Topic::SaveFailed => Channel::SaveDialog,
        }
    }

    pub fn address(&self) -> Address {
        Address::new(self.channel(), self.topic())
    }

    /// `{ "channel", "topic", "payload" }` form used by the console's JSON output.
    pub fn to_envelope(&self) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "channel".to_string(),
                serde_json::Value::String(self.channel().as_str().to_string()),
            );
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_variant_routes_to_its_channel() {
        let cases = [
            (Event::PortfolioChanged(AllocationSnapshot::default()), Channel::PortfolioEditor),
            (Event::SelectInvestments(vec![]), Channel::PortfolioEditor),
            (Event::TroublesomeEntriesFound(vec![]), Channel::PortfolioProfile),
            (Event::Open(vec![]), Channel::AddInvestmentDialog),
            (Event::InvestmentSelected("HP".into()), Channel::AddInvestmentDialog),
            (Event::SaveFailed("x".into()), Channel::SaveDialog),
        ];
        for (event, channel) in cases {
            assert_eq!(event.channel(), channel, "{:?}", event.topic());
        }
    }

    #[test]
    fn serialized_topic_matches_as_str() {
        let event = Event::TroublesomeEntriesFound(vec!["APPL".into()]);
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["topic"], json!(event.topic().as_str()));
    }

    #[test]
    fn envelope_carries_channel_topic_and_payload() {
        let event = Event::AvailableChoicesReady(vec![Choice {
            name: "GOOG".into(),
            already_included: true,
        }]);
        let v = event.to_envelope().unwrap();
        assert_eq!(
            v,
            json!({
                "channel": "AddInvestmentDialog",
                "topic": "availableChoicesReady",
                "payload": [{"name": "GOOG", "alreadyIncluded": true}],
            })
        );
    }
}
