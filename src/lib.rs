//! Slotgraph - a node graph core with variadic slots
//!
//! This library provides the data structures for node-based visual
//! programming interfaces whose nodes can expose an unbounded number of
//! connection points: a node declares a variadic slot group, and the graph
//! grows a fresh slot whenever the group's last slot gains a connection and
//! shrinks-and-renumbers when a slot loses its last one.

pub mod nodes;

pub use nodes::{GraphError, Link, LinkId, Node, NodeGraph, NodeId};
pub use nodes::{DataType, Slot, SlotDirection, SlotId, SlotList, SlotOptions};
pub use nodes::{ConnectionChange, SlotError, SlotGroup, SlotListEdit, SlotNaming, VariadicSlots};

// Re-export commonly used egui types
pub use egui::{Color32, Pos2, Vec2};
