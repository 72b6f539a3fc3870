//! Feature model for the board netlist
//!
//! # Submodules
//! - `types` - Entities (vias, confirmed vias, connectors, traces, nets)
//! - `store` - The single-owner feature store with ID allocation
//! - `spatial` - R-tree index over trace vertices and segments
//! - `events` - Change notifications for dependent views

mod events;
mod spatial;
pub mod store;
mod types;

pub use events::{ChangeNotifier, FeatureEvent};
pub use spatial::{SegmentEntry, TraceIndex, VertexEntry};
pub use store::{Counters, FeatureStore};
pub use types::{
    format_confirmed_via_id, format_connector_id, format_net_id, format_trace_id, format_via_id,
    Connector, ConfirmedVia, DetectionMethod, ElectricalNet, ElementKind, ElementRef, Trace,
    TraceSource, Via,
};
