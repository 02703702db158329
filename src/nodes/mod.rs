//! Node system - core data structures and variadic slot management

// Core node system modules
pub mod graph;
pub mod node;
pub mod slot;
pub mod variadic;

// Re-export core types
pub use graph::{GraphError, Link, LinkId, NodeGraph};
pub use node::{Node, NodeId};
pub use slot::{DataType, Slot, SlotDirection, SlotId, SlotList, SlotOptions};

// Re-export variadic slot types
pub use variadic::{
    ConnectionChange, IndexedNaming, SlotError, SlotGroup, SlotListEdit, SlotNaming,
    VariadicSlots, DEFAULT_JOIN_TOKEN,
};
