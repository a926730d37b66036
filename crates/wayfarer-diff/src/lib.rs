//! Wayfarer Sequence Differ
//!
//! Turns an old route sequence and a new one into a minimal edit script.
//! Stacks apply the script instead of rebuilding, so elements that survive
//! a mutation keep their identity (and their pending results).

mod myers;
mod script;

pub use myers::diff;
pub use script::{EditOp, EditScript};
