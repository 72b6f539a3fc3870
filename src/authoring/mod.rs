//! Interactive trace authoring
//!
//! # Submodules
//! - `session` - Pointer-driven state machine for drawing traces and dragging vertices

pub mod session;

pub use session::{Preview, SessionOutcome, SessionState, TraceAuthoringSession};
