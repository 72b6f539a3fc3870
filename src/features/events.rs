//! Change notifications fired after store mutations

use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};

/// What changed. Each logical change fires one event; there is no batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureEvent {
    FeaturesChanged,
    ConfirmedViasChanged,
    ConnectorsChanged,
    NetlistModified,
}

impl FeatureEvent {
    /// Method name used when forwarding the event as a JSON-RPC notification
    pub fn method_name(self) -> &'static str {
        match self {
            FeatureEvent::FeaturesChanged => "featuresChanged",
            FeatureEvent::ConfirmedViasChanged => "confirmedViasChanged",
            FeatureEvent::ConnectorsChanged => "connectorsChanged",
            FeatureEvent::NetlistModified => "netlistModified",
        }
    }
}

/// Fan-out of events to any number of subscribers.
/// Subscribers whose receiver has been dropped are pruned on the next emit.
#[derive(Default)]
pub struct ChangeNotifier {
    subscribers: Vec<Sender<FeatureEvent>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<FeatureEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: FeatureEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
