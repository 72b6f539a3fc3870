//! Interactive netlist reconstruction for scanned two-sided boards
//!
//! Operators mark plated holes, board-edge contacts and copper traces on
//! scans of both sides of a board. This crate keeps those features in a
//! single store, hit-tests pointer input against them, turns clicks into
//! traces, and maintains the electrical nets those traces imply.
//!
//! # Module Structure
//! - `geometry` - Points, rectangles, board sides and small geometric helpers
//! - `features` - Entities, the feature store, spatial index and change events
//! - `hit_test` - Tolerance-based picking of vias, connectors and traces
//! - `endpoint` - What a trace starts or ends on
//! - `authoring` - Pointer-driven trace drawing and vertex dragging
//! - `netlist` - Net consolidation, name ranking and pin guessing
//! - `edit` - Deletes, segment removal, labels and additions
//! - `worker` - Background side matching and auto-tracing
//! - `document` - Project save/load
//! - `config` - Engine tolerances
//! - `server` - Line-delimited JSON-RPC front end

pub mod authoring;
pub mod config;
pub mod document;
pub mod edit;
pub mod endpoint;
pub mod error;
pub mod features;
pub mod geometry;
pub mod hit_test;
pub mod netlist;
pub mod server;
pub mod worker;

pub use authoring::{SessionOutcome, TraceAuthoringSession};
pub use config::EngineConfig;
pub use endpoint::Endpoint;
pub use error::NetlistError;
pub use features::FeatureStore;
pub use geometry::{Point, Side};
