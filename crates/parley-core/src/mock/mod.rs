//! In-memory test doubles for the store and the fragment source.

mod source;
mod store;

pub use source::{ScriptEnd, ScriptedSource};
pub use store::{MemoryStore, StoreUpdate};
