//! Image source rewriting driven by document child-list changes.
//!
//! - `dom`: a small document tree that batches child-list mutation records
//!   and hands them to registered observers
//! - `handler`: the observer that prefixes `src` on inserted images
//! - `script`: the same observer as a browser script

pub mod dom;
pub mod handler;
pub mod script;

pub use dom::{Document, DomError, MutationCallback, MutationRecord, NodeId, ObserveOptions};
pub use handler::{ImageSrcRewriter, PrefixPolicy, SrcPrefix, install};
pub use script::observer_script;
