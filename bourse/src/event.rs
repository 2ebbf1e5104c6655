use crate::strategy::signal::{SignalEvent, SignalTarget};
use bourse_data::MarketEvent;
use bourse_execution::{FillEvent, OrderEvent};
use serde::{Deserialize, Serialize};

/// Serializable envelope over every event kind in the system.
///
/// The wire form is `{"event_type": ..., "data": ...}` with
/// `event_type` one of `market`, `order`, `fill_ib`, `signal_fixed` or `signal_pct`. The
/// single-process core communicates through direct method calls; this envelope exists for
/// event-sourcing, persistence and inter-process variants.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum Event {
    Market(MarketEvent),
    Order(OrderEvent),
    FillIb(FillEvent),
    SignalFixed(SignalEvent),
    SignalPct(SignalEvent),
}

impl Event {
    pub fn as_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl From<MarketEvent> for Event {
    fn from(event: MarketEvent) -> Self {
        Self::Market(event)
    }
}

impl From<OrderEvent> for Event {
    fn from(event: OrderEvent) -> Self {
        Self::Order(event)
    }
}

impl From<FillEvent> for Event {
    fn from(event: FillEvent) -> Self {
        Self::FillIb(event)
    }
}

impl From<SignalEvent> for Event {
    fn from(event: SignalEvent) -> Self {
        match event.target {
            SignalTarget::Pct { .. } => Self::SignalPct(event),
            SignalTarget::Fixed { .. } => Self::SignalFixed(event),
        }
    }
}
