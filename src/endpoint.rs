//! Trace endpoints
//!
//! A trace starts and ends on a confirmed via, a connector, a junction (a
//! vertex of another trace) or on nothing at all.

use crate::error::NetlistError;
use crate::features::{ElementRef, FeatureStore};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Endpoint {
    Via { id: String },
    Connector { id: String },
    Junction { trace_id: String, point_index: usize },
    #[default]
    None,
}

impl Endpoint {
    pub fn via(id: impl Into<String>) -> Self {
        Endpoint::Via { id: id.into() }
    }

    pub fn connector(id: impl Into<String>) -> Self {
        Endpoint::Connector { id: id.into() }
    }

    pub fn junction(trace_id: impl Into<String>, point_index: usize) -> Self {
        Endpoint::Junction {
            trace_id: trace_id.into(),
            point_index,
        }
    }

    /// Net element this endpoint contributes. Junctions are not graph nodes.
    pub fn element(&self) -> Option<ElementRef> {
        match self {
            Endpoint::Via { id } => Some(ElementRef::via(id.clone())),
            Endpoint::Connector { id } => Some(ElementRef::connector(id.clone())),
            Endpoint::Junction { .. } | Endpoint::None => None,
        }
    }

    pub fn junction_trace_id(&self) -> Option<&str> {
        match self {
            Endpoint::Junction { trace_id, .. } => Some(trace_id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Endpoint::None)
    }

    /// True when the endpoint names `id`, directly or as its junction trace
    pub fn references(&self, id: &str) -> bool {
        match self {
            Endpoint::Via { id: own } | Endpoint::Connector { id: own } => own == id,
            Endpoint::Junction { trace_id, .. } => trace_id == id,
            Endpoint::None => false,
        }
    }

    /// Errors when the element the endpoint names is no longer in the store.
    /// `None` is always valid.
    pub fn validate(&self, store: &FeatureStore) -> Result<(), NetlistError> {
        match self {
            Endpoint::Via { id } => match store.confirmed_via(id) {
                Some(_) => Ok(()),
                None => Err(NetlistError::ConfirmedViaNotFound(id.clone())),
            },
            Endpoint::Connector { id } => match store.connector(id) {
                Some(_) => Ok(()),
                None => Err(NetlistError::ConnectorNotFound(id.clone())),
            },
            Endpoint::Junction { trace_id, point_index } => {
                let trace = store
                    .trace(trace_id)
                    .ok_or_else(|| NetlistError::TraceNotFound(trace_id.clone()))?;
                if *point_index >= trace.points.len() {
                    return Err(NetlistError::PointIndexOutOfRange {
                        id: trace_id.clone(),
                        index: *point_index,
                        len: trace.points.len(),
                    });
                }
                Ok(())
            }
            Endpoint::None => Ok(()),
        }
    }

    /// Where a trace attaches to this endpoint: the via center or the junction
    /// vertex. Connectors have no fixed anchor; the click point is used instead.
    pub fn anchor(&self, store: &FeatureStore) -> Option<Point> {
        match self {
            Endpoint::Via { id } => store.confirmed_via(id).map(|v| v.center),
            Endpoint::Connector { id } => store.connector(id).map(|c| c.center),
            Endpoint::Junction { trace_id, point_index } => store
                .trace(trace_id)
                .and_then(|t| t.points.get(*point_index).copied()),
            Endpoint::None => None,
        }
    }
}
