//! Netlist algorithms
//!
//! # Submodules
//! - `consolidate` - Net creation, extension and merging when a trace lands
//! - `naming` - Total order over net names used to pick a merge survivor
//! - `pins` - Pin number guessing from neighbouring labeled vias

pub mod consolidate;
pub mod naming;
pub mod pins;

pub use consolidate::{ConsolidationOutcome, NetConsolidator};
pub use naming::{better_name, compare_names};
pub use pins::guess_pin;
