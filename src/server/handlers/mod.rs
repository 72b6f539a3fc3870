//! Handler module declarations and re-exports

pub mod edit;
pub mod file;
pub mod interaction;
pub mod jobs;
pub mod query;

pub use edit::*;
pub use file::*;
pub use interaction::*;
pub use jobs::*;
pub use query::{handle_get_features, handle_get_nets, handle_guess_pin, handle_hit_test};
