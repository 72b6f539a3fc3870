//! The authoritative feature store
//!
//! Owns every via, confirmed via, connector, trace and net. The store is a
//! plain value: callers pass it by reference to the hit tester, the
//! consolidator and the authoring session. Collections are insertion-ordered
//! so serialized output is deterministic.

use crate::document::ProjectDocument;
use crate::error::NetlistError;
use crate::features::events::{ChangeNotifier, FeatureEvent};
use crate::features::spatial::TraceIndex;
use crate::features::types::{
    format_net_id, Connector, ConfirmedVia, ElectricalNet, Trace, Via,
};
use crate::geometry::{Point, Side};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Receiver;

/// Last sequence number handed out per entity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub via: u32,
    pub confirmed_via: u32,
    pub connector: u32,
    pub trace: u32,
    pub net: u32,
}

#[derive(Default)]
pub struct FeatureStore {
    vias: IndexMap<String, Via>,
    confirmed_vias: IndexMap<String, ConfirmedVia>,
    connectors: IndexMap<String, Connector>,
    traces: IndexMap<String, Trace>,
    nets: IndexMap<String, ElectricalNet>,
    counters: Counters,
    trace_index: TraceIndex,
    notifier: ChangeNotifier,
    generation: u64,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<FeatureEvent> {
        self.notifier.subscribe()
    }

    pub(crate) fn notify(&mut self, event: FeatureEvent) {
        self.notifier.emit(event);
    }

    /// Bumped whenever the whole context is replaced (clear, load).
    /// Background results captured under an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    // ==================== ID allocation ====================

    pub fn next_via_number(&mut self) -> u32 {
        self.counters.via += 1;
        self.counters.via
    }

    pub fn next_confirmed_via_number(&mut self) -> u32 {
        self.counters.confirmed_via += 1;
        self.counters.confirmed_via
    }

    pub fn next_connector_number(&mut self) -> u32 {
        self.counters.connector += 1;
        self.counters.connector
    }

    pub fn next_trace_number(&mut self) -> u32 {
        self.counters.trace += 1;
        self.counters.trace
    }

    /// Skips numbers whose `net-NNN` id is already taken (e.g. by a loaded net)
    pub fn next_net_number(&mut self) -> u32 {
        loop {
            self.counters.net += 1;
            if !self.nets.contains_key(&format_net_id(self.counters.net)) {
                return self.counters.net;
            }
        }
    }

    // ==================== Vias ====================

    pub fn add_via(&mut self, via: Via) -> Result<(), NetlistError> {
        if self.vias.contains_key(&via.id) {
            return Err(NetlistError::DuplicateId(via.id));
        }
        self.counters.via = self.counters.via.max(via.number);
        self.vias.insert(via.id.clone(), via);
        self.notify(FeatureEvent::FeaturesChanged);
        Ok(())
    }

    pub fn remove_via(&mut self, id: &str) -> Option<Via> {
        let removed = self.vias.shift_remove(id);
        if removed.is_some() {
            self.notify(FeatureEvent::FeaturesChanged);
        }
        removed
    }

    pub fn update_via(&mut self, via: Via) -> Result<(), NetlistError> {
        match self.vias.get_mut(&via.id) {
            Some(slot) => {
                *slot = via;
                self.notify(FeatureEvent::FeaturesChanged);
                Ok(())
            }
            None => Err(NetlistError::ViaNotFound(via.id)),
        }
    }

    pub fn via(&self, id: &str) -> Option<&Via> {
        self.vias.get(id)
    }

    pub fn vias(&self) -> impl Iterator<Item = &Via> {
        self.vias.values()
    }

    pub fn vias_by_side(&self, side: Side) -> Vec<&Via> {
        self.vias.values().filter(|v| v.side == side).collect()
    }

    // ==================== Confirmed vias ====================

    pub fn add_confirmed_via(&mut self, via: ConfirmedVia) -> Result<(), NetlistError> {
        if self.confirmed_vias.contains_key(&via.id) {
            return Err(NetlistError::DuplicateId(via.id));
        }
        self.counters.confirmed_via = self.counters.confirmed_via.max(via.number);
        self.confirmed_vias.insert(via.id.clone(), via);
        self.notify(FeatureEvent::ConfirmedViasChanged);
        Ok(())
    }

    /// Removes only the confirmed via itself; see `edit::delete_confirmed_via`
    /// for the cascading delete.
    pub fn remove_confirmed_via(&mut self, id: &str) -> Option<ConfirmedVia> {
        let removed = self.confirmed_vias.shift_remove(id);
        if removed.is_some() {
            self.notify(FeatureEvent::ConfirmedViasChanged);
        }
        removed
    }

    pub fn update_confirmed_via(&mut self, via: ConfirmedVia) -> Result<(), NetlistError> {
        match self.confirmed_vias.get_mut(&via.id) {
            Some(slot) => {
                *slot = via;
                self.notify(FeatureEvent::ConfirmedViasChanged);
                Ok(())
            }
            None => Err(NetlistError::ConfirmedViaNotFound(via.id)),
        }
    }

    pub fn confirmed_via(&self, id: &str) -> Option<&ConfirmedVia> {
        self.confirmed_vias.get(id)
    }

    pub fn confirmed_vias(&self) -> impl Iterator<Item = &ConfirmedVia> {
        self.confirmed_vias.values()
    }

    pub fn confirmed_via_count(&self) -> usize {
        self.confirmed_vias.len()
    }

    // ==================== Connectors ====================

    pub fn add_connector(&mut self, connector: Connector) -> Result<(), NetlistError> {
        if self.connectors.contains_key(&connector.id) {
            return Err(NetlistError::DuplicateId(connector.id));
        }
        self.counters.connector = self.counters.connector.max(connector.number);
        self.connectors.insert(connector.id.clone(), connector);
        self.notify(FeatureEvent::ConnectorsChanged);
        Ok(())
    }

    pub fn remove_connector(&mut self, id: &str) -> Option<Connector> {
        let removed = self.connectors.shift_remove(id);
        if removed.is_some() {
            self.notify(FeatureEvent::ConnectorsChanged);
        }
        removed
    }

    pub fn connector(&self, id: &str) -> Option<&Connector> {
        self.connectors.get(id)
    }

    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.values()
    }

    // ==================== Traces ====================

    pub fn add_trace(&mut self, trace: Trace) -> Result<(), NetlistError> {
        if self.traces.contains_key(&trace.id) {
            return Err(NetlistError::DuplicateId(trace.id));
        }
        if trace.points.len() < 2 {
            return Err(NetlistError::DegenerateTrace {
                id: trace.id,
                points: trace.points.len(),
            });
        }
        self.counters.trace = self.counters.trace.max(trace.number);
        self.trace_index.insert(&trace);
        self.traces.insert(trace.id.clone(), trace);
        self.notify(FeatureEvent::FeaturesChanged);
        Ok(())
    }

    pub fn remove_trace(&mut self, id: &str) -> Option<Trace> {
        let removed = self.traces.shift_remove(id)?;
        self.trace_index.remove(&removed);
        self.notify(FeatureEvent::FeaturesChanged);
        Some(removed)
    }

    /// Replaces a trace's polyline in place; id, layer and net membership stay.
    pub fn update_trace_points(&mut self, id: &str, points: Vec<Point>) -> Result<(), NetlistError> {
        if points.len() < 2 {
            return Err(NetlistError::DegenerateTrace {
                id: id.to_string(),
                points: points.len(),
            });
        }
        let trace = self
            .traces
            .get_mut(id)
            .ok_or_else(|| NetlistError::TraceNotFound(id.to_string()))?;
        self.trace_index.remove(trace);
        trace.points = points;
        self.trace_index.insert(trace);
        self.notify(FeatureEvent::FeaturesChanged);
        Ok(())
    }

    pub fn trace(&self, id: &str) -> Option<&Trace> {
        self.traces.get(id)
    }

    pub fn traces(&self) -> impl Iterator<Item = &Trace> {
        self.traces.values()
    }

    pub fn trace_count(&self) -> usize {
        self.traces.len()
    }

    pub fn trace_index(&self) -> &TraceIndex {
        &self.trace_index
    }

    // ==================== Nets ====================

    pub fn add_net(&mut self, net: ElectricalNet) -> Result<(), NetlistError> {
        if self.nets.contains_key(&net.id) {
            return Err(NetlistError::DuplicateId(net.id));
        }
        self.nets.insert(net.id.clone(), net);
        self.notify(FeatureEvent::NetlistModified);
        Ok(())
    }

    pub fn remove_net(&mut self, id: &str) -> Option<ElectricalNet> {
        let removed = self.nets.shift_remove(id);
        if removed.is_some() {
            self.notify(FeatureEvent::NetlistModified);
        }
        removed
    }

    pub fn net(&self, id: &str) -> Option<&ElectricalNet> {
        self.nets.get(id)
    }

    pub fn nets(&self) -> impl Iterator<Item = &ElectricalNet> {
        self.nets.values()
    }

    /// Direct membership scan. `None` just means the element has no net yet.
    pub fn net_for_element(&self, element_id: &str) -> Option<&ElectricalNet> {
        self.nets.values().find(|n| n.contains(element_id))
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Raw net access for multi-step edits that emit a single notification
    /// when they finish.
    pub(crate) fn nets_mut(&mut self) -> &mut IndexMap<String, ElectricalNet> {
        &mut self.nets
    }

    // ==================== Whole-store operations ====================

    pub fn is_empty(&self) -> bool {
        self.vias.is_empty()
            && self.confirmed_vias.is_empty()
            && self.connectors.is_empty()
            && self.traces.is_empty()
            && self.nets.is_empty()
    }

    /// Drops every feature and starts a new generation
    pub fn clear(&mut self) {
        self.vias.clear();
        self.confirmed_vias.clear();
        self.connectors.clear();
        self.traces.clear();
        self.nets.clear();
        self.counters = Counters::default();
        self.trace_index = TraceIndex::new();
        self.generation += 1;
        tracing::info!("[FeatureStore] Cleared (generation {})", self.generation);
        self.emit_all();
    }

    pub fn to_document(&self) -> ProjectDocument {
        ProjectDocument {
            version: ProjectDocument::CURRENT_VERSION,
            vias: self.vias.values().cloned().collect(),
            confirmed_vias: self.confirmed_vias.values().cloned().collect(),
            connectors: self.connectors.values().cloned().collect(),
            traces: self.traces.values().cloned().collect(),
            nets: self.nets.values().cloned().collect(),
            counters: self.counters,
        }
    }

    /// Replaces the whole store content with a loaded document.
    /// Subscribers are kept; the generation is bumped.
    pub fn replace_with(&mut self, doc: ProjectDocument) {
        let key = |id: &String| id.clone();
        self.vias = doc.vias.into_iter().map(|v| (key(&v.id), v)).collect();
        self.confirmed_vias = doc.confirmed_vias.into_iter().map(|v| (key(&v.id), v)).collect();
        self.connectors = doc.connectors.into_iter().map(|c| (key(&c.id), c)).collect();
        self.traces = doc
            .traces
            .into_iter()
            .filter(|t| t.points.len() >= 2)
            .map(|t| (key(&t.id), t))
            .collect();
        self.nets = doc.nets.into_iter().map(|n| (key(&n.id), n)).collect();

        // Never hand out a number that is already in use
        self.counters = Counters {
            via: self.vias.values().map(|v| v.number).fold(doc.counters.via, u32::max),
            confirmed_via: self
                .confirmed_vias
                .values()
                .map(|v| v.number)
                .fold(doc.counters.confirmed_via, u32::max),
            connector: self
                .connectors
                .values()
                .map(|c| c.number)
                .fold(doc.counters.connector, u32::max),
            trace: self.traces.values().map(|t| t.number).fold(doc.counters.trace, u32::max),
            net: doc.counters.net,
        };
        self.trace_index = TraceIndex::bulk_load(self.traces.values());
        self.generation += 1;
        tracing::info!(
            "[FeatureStore] Loaded {} vias, {} confirmed vias, {} connectors, {} traces, {} nets (generation {})",
            self.vias.len(),
            self.confirmed_vias.len(),
            self.connectors.len(),
            self.traces.len(),
            self.nets.len(),
            self.generation
        );
        self.emit_all();
    }

    fn emit_all(&mut self) {
        self.notify(FeatureEvent::FeaturesChanged);
        self.notify(FeatureEvent::ConfirmedViasChanged);
        self.notify(FeatureEvent::ConnectorsChanged);
        self.notify(FeatureEvent::NetlistModified);
    }
}
