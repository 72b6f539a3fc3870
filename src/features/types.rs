//! Feature entities: vias, confirmed vias, connectors, traces and nets
//!
//! Every entity carries the sequence `number` it was allocated with, so code
//! never has to parse a formatted id to recover it.

use crate::geometry::{IntRect, Point, Side};
use serde::{Deserialize, Serialize};

pub fn format_via_id(number: u32) -> String {
    format!("via-{:03}", number)
}

pub fn format_confirmed_via_id(number: u32) -> String {
    format!("cvia-{:03}", number)
}

pub fn format_connector_id(number: u32) -> String {
    format!("conn-{:03}", number)
}

pub fn format_trace_id(number: u32) -> String {
    format!("trace-{:03}", number)
}

pub fn format_net_id(number: u32) -> String {
    format!("net-{:03}", number)
}

/// How a via was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionMethod {
    #[default]
    Manual,
    Template,
    Contour,
    Hough,
    Imported,
}

/// A single-side detection of a plated hole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub id: String,
    pub number: u32,
    pub center: Point,
    pub radius: f64,
    pub side: Side,
    #[serde(default)]
    pub pad_boundary: Vec<Point>,
    pub confidence: f64,
    pub method: DetectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_via_id: Option<String>,
}

/// One physical plated hole, matched across both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedVia {
    pub id: String,
    pub number: u32,
    pub front_via_id: String,
    pub back_via_id: String,
    pub center: Point,
    pub radius: f64,
    #[serde(default)]
    pub intersection_boundary: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_number: Option<String>,
}

impl ConfirmedVia {
    pub fn contains(&self, p: Point) -> bool {
        self.center.distance(p) <= self.radius
    }

    /// `U1.3` style label, present only when both parts are assigned
    pub fn pin_label(&self) -> Option<String> {
        match (self.component_id.as_deref(), self.pin_number.as_deref()) {
            (Some(c), Some(p)) if !c.is_empty() && !p.is_empty() => Some(format!("{}.{}", c, p)),
            _ => None,
        }
    }
}

/// Board-edge contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
    pub number: u32,
    pub side: Side,
    pub bounds: IntRect,
    pub center: Point,
    pub pin_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TraceSource {
    #[default]
    Manual,
    Detected,
}

/// Copper polyline on one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    pub number: u32,
    pub layer: Side,
    pub points: Vec<Point>,
    pub source: TraceSource,
}

impl Trace {
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => Some((*a, *b)),
            _ => None,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }
}

/// Kind tag for an element of a net
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Via,
    Connector,
    Trace,
    Pad,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub id: String,
}

impl ElementRef {
    pub fn new(kind: ElementKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn via(id: impl Into<String>) -> Self {
        Self::new(ElementKind::Via, id)
    }

    pub fn connector(id: impl Into<String>) -> Self {
        Self::new(ElementKind::Connector, id)
    }

    pub fn trace(id: impl Into<String>) -> Self {
        Self::new(ElementKind::Trace, id)
    }
}

/// A set of electrically common elements.
///
/// `elements` is the only membership record; the typed id lists are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricalNet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub elements: Vec<ElementRef>,
}

impl ElectricalNet {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            elements: Vec::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.iter().any(|e| e.id == id)
    }

    /// Returns false when the element was already a member
    pub fn add(&mut self, element: ElementRef) -> bool {
        if self.contains(&element.id) {
            return false;
        }
        self.elements.push(element);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.elements.len();
        self.elements.retain(|e| e.id != id);
        self.elements.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn ids_of(&self, kind: ElementKind) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.id.as_str())
            .collect()
    }

    pub fn via_ids(&self) -> Vec<&str> {
        self.ids_of(ElementKind::Via)
    }

    pub fn connector_ids(&self) -> Vec<&str> {
        self.ids_of(ElementKind::Connector)
    }

    pub fn trace_ids(&self) -> Vec<&str> {
        self.ids_of(ElementKind::Trace)
    }

    pub fn pad_ids(&self) -> Vec<&str> {
        self.ids_of(ElementKind::Pad)
    }
}
