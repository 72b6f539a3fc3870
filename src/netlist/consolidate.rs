//! Net consolidation
//!
//! Runs whenever a new trace joins two endpoints. Depending on which
//! endpoints already belong to nets, it creates a net, extends one, or merges
//! two. Every change happens under one `&mut FeatureStore` borrow and ends
//! with a single `NetlistModified` event. Endpoints naming elements that are
//! no longer in the store are rejected before anything is written.

use crate::endpoint::Endpoint;
use crate::error::NetlistError;
use crate::features::{format_net_id, ElectricalNet, ElementRef, FeatureEvent, FeatureStore};
use crate::netlist::naming::compare_names;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsolidationOutcome {
    /// Net the new trace ended up in, if any
    pub net_id: Option<String>,
    /// Nets created during this call (bare connectors included)
    pub created: Vec<String>,
    /// Net deleted by a merge
    pub absorbed: Option<String>,
}

pub struct NetConsolidator<'a> {
    store: &'a mut FeatureStore,
    junction_tolerance: f64,
}

impl<'a> NetConsolidator<'a> {
    pub fn new(store: &'a mut FeatureStore, junction_tolerance: f64) -> Self {
        Self {
            store,
            junction_tolerance,
        }
    }

    pub fn consolidate(
        &mut self,
        start: &Endpoint,
        end: &Endpoint,
        new_trace_id: &str,
        junction_trace_ids: &[String],
    ) -> Result<ConsolidationOutcome, NetlistError> {
        start.validate(self.store)?;
        end.validate(self.store)?;
        for trace_id in junction_trace_ids {
            if self.store.trace(trace_id).is_none() {
                return Err(NetlistError::TraceNotFound(trace_id.clone()));
            }
        }

        let mut outcome = ConsolidationOutcome::default();
        if start.is_none() && end.is_none() {
            tracing::debug!("[Netlist] {} has no endpoints, leaving it unnetted", new_trace_id);
            return Ok(outcome);
        }

        let start_net = self
            .resolve(start)
            .or_else(|| self.net_for_bare_connector(start, &mut outcome));
        let end_net = self
            .resolve(end)
            .or_else(|| self.net_for_bare_connector(end, &mut outcome));

        let keeper = match (start_net, end_net) {
            (Some(a), Some(b)) if a == b => a,
            (Some(a), Some(b)) => {
                let (keeper, loser) = self.merge(&a, &b);
                outcome.absorbed = Some(loser);
                keeper
            }
            (Some(a), None) => {
                if let Some(element) = end.element() {
                    self.attach(&a, element);
                }
                a
            }
            (None, Some(b)) => {
                if let Some(element) = start.element() {
                    self.attach(&b, element);
                }
                b
            }
            (None, None) => {
                let id = self.create_net(start, end);
                outcome.created.push(id.clone());
                id
            }
        };

        self.attach(&keeper, ElementRef::trace(new_trace_id));
        for trace_id in junction_trace_ids {
            self.attach(&keeper, ElementRef::trace(trace_id.clone()));
        }

        tracing::info!("[Netlist] {} joined {}", new_trace_id, keeper);
        outcome.net_id = Some(keeper);
        self.store.notify(FeatureEvent::NetlistModified);
        Ok(outcome)
    }

    /// Net currently holding the endpoint, if any
    fn resolve(&self, endpoint: &Endpoint) -> Option<String> {
        match endpoint {
            Endpoint::Via { id } | Endpoint::Connector { id } => {
                self.store.net_for_element(id).map(|n| n.id.clone())
            }
            Endpoint::Junction { trace_id, .. } => self
                .find_net_for_trace(trace_id)
                .or_else(|| self.store.net_for_element(trace_id).map(|n| n.id.clone())),
            Endpoint::None => None,
        }
    }

    /// Checks only the trace's own two endpoints against netted vias and
    /// connectors. Junction chains are not followed.
    pub fn find_net_for_trace(&self, trace_id: &str) -> Option<String> {
        let (first, last) = self.store.trace(trace_id)?.endpoints()?;
        for p in [first, last] {
            for via in self.store.confirmed_vias() {
                if via.center.distance(p) <= self.junction_tolerance {
                    if let Some(net) = self.store.net_for_element(&via.id) {
                        return Some(net.id.clone());
                    }
                }
            }
            for conn in self.store.connectors() {
                if conn.center.distance(p) <= self.junction_tolerance || conn.bounds.contains(p) {
                    if let Some(net) = self.store.net_for_element(&conn.id) {
                        return Some(net.id.clone());
                    }
                }
            }
        }
        None
    }

    /// A connector always carries a net once a trace touches it
    fn net_for_bare_connector(
        &mut self,
        endpoint: &Endpoint,
        outcome: &mut ConsolidationOutcome,
    ) -> Option<String> {
        let Endpoint::Connector { id } = endpoint else {
            return None;
        };
        let signal = self
            .store
            .connector(id)?
            .signal_name
            .clone()
            .filter(|s| !s.trim().is_empty());

        if let Some(name) = &signal {
            let existing = self
                .store
                .nets()
                .find(|n| &n.name == name)
                .map(|n| n.id.clone());
            if let Some(net_id) = existing {
                // Same signal name already has a net
                self.attach(&net_id, ElementRef::connector(id.clone()));
                return Some(net_id);
            }
        }

        let (net_id, name) = match signal {
            Some(name) => {
                let keyed = format!("net-{}", name);
                if name.chars().all(|c| c.is_ascii_digit()) || self.store.net(&keyed).is_some() {
                    // Numeric signal names would land in the generated `net-NNN` space
                    (format_net_id(self.store.next_net_number()), name)
                } else {
                    (keyed, name)
                }
            }
            None => {
                let generated = format_net_id(self.store.next_net_number());
                (generated.clone(), generated)
            }
        };

        let mut net = ElectricalNet::new(net_id.clone(), name);
        net.add(ElementRef::connector(id.clone()));
        self.store.nets_mut().insert(net_id.clone(), net);
        tracing::info!("[Netlist] Created {} for connector {}", net_id, id);
        outcome.created.push(net_id.clone());
        Some(net_id)
    }

    fn create_net(&mut self, start: &Endpoint, end: &Endpoint) -> String {
        let id = format_net_id(self.store.next_net_number());
        let name = [start, end]
            .iter()
            .find_map(|e| match e {
                Endpoint::Via { id } => self.store.confirmed_via(id).and_then(|v| v.pin_label()),
                _ => None,
            })
            .unwrap_or_else(|| id.clone());

        tracing::info!("[Netlist] Created {} ({})", id, name);
        self.store
            .nets_mut()
            .insert(id.clone(), ElectricalNet::new(id.clone(), name));
        for element in [start.element(), end.element()].into_iter().flatten() {
            self.attach(&id, element);
        }
        id
    }

    /// Keeps the better-named net and folds the other into it.
    /// Returns `(keeper, absorbed)`.
    fn merge(&mut self, a: &str, b: &str) -> (String, String) {
        let order = match (self.store.net(a), self.store.net(b)) {
            (Some(na), Some(nb)) => {
                compare_names(&na.name, &nb.name).then_with(|| na.id.cmp(&nb.id))
            }
            _ => a.cmp(b),
        };
        let (keeper, loser) = if order != Ordering::Greater { (a, b) } else { (b, a) };

        let nets = self.store.nets_mut();
        if let Some(absorbed) = nets.shift_remove(loser) {
            if let Some(target) = nets.get_mut(keeper) {
                for element in absorbed.elements {
                    target.add(element);
                }
            }
        }
        tracing::info!("[Netlist] Merged {} into {}", loser, keeper);
        (keeper.to_string(), loser.to_string())
    }

    /// Adds an element to a net, moving it out of any other net first
    fn attach(&mut self, net_id: &str, element: ElementRef) {
        let nets = self.store.nets_mut();
        let previous = nets
            .values()
            .find(|n| n.contains(&element.id))
            .map(|n| n.id.clone());
        match previous {
            Some(ref p) if p == net_id => return,
            Some(p) => {
                let emptied = nets
                    .get_mut(&p)
                    .map(|n| {
                        n.remove(&element.id);
                        n.is_empty()
                    })
                    .unwrap_or(false);
                if emptied {
                    nets.shift_remove(&p);
                }
                tracing::debug!("[Netlist] Moved {} from {} to {}", element.id, p, net_id);
            }
            None => {}
        }
        if let Some(net) = nets.get_mut(net_id) {
            net.add(element);
        }
    }
}
