//! Node graph data structures and operations

use super::node::{Node, NodeId};
use super::slot::{DataType, SlotDirection, SlotId};
use super::variadic::{ConnectionChange, SlotError, SlotListEdit};
use egui::Vec2;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Unique identifier for a link
pub type LinkId = usize;

/// Offset applied to a duplicated node so it does not cover the original
const DUPLICATE_OFFSET: f32 = 40.0;

/// Errors raised when editing graph connectivity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("cannot connect a node to itself")]
    SelfConnection,
    #[error("node {0} does not exist")]
    MissingNode(NodeId),
    #[error("node {node} has no {direction} slot at position {slot}")]
    MissingSlot {
        node: NodeId,
        direction: SlotDirection,
        slot: SlotId,
    },
    #[error("{} output cannot feed {} input", .from.name(), .to.name())]
    IncompatibleTypes { from: DataType, to: DataType },
    #[error("link {0} does not exist")]
    MissingLink(LinkId),
    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// Represents a connection between two slots on different nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub from_node: NodeId,
    pub from_slot: SlotId,
    pub to_node: NodeId,
    pub to_slot: SlotId,
}

/// A graph containing nodes and their links.
///
/// The graph is the host side of variadic slot handling: it maintains each
/// slot's link list, delivers a `ConnectionChange` to both endpoint nodes of
/// every connect and disconnect, and shifts link endpoint indices when a
/// node's reaction removes a slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeGraph {
    pub nodes: HashMap<NodeId, Node>,
    pub links: HashMap<LinkId, Link>,
    next_node_id: NodeId,
    next_link_id: LinkId,
}

impl NodeGraph {
    /// Creates a new empty node graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the graph and returns its ID
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = self.next_node_id;
        node.id = id;
        self.nodes.insert(id, node);
        self.next_node_id += 1;
        id
    }

    /// Removes a node after disconnecting every link attached to it.
    /// Peer nodes see ordinary disconnects, so their variadic groups shrink
    /// the same way they would for a manual disconnect.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Option<Node>, GraphError> {
        if !self.nodes.contains_key(&node_id) {
            return Ok(None);
        }
        let attached: Vec<LinkId> = self
            .links
            .values()
            .filter(|link| link.from_node == node_id || link.to_node == node_id)
            .map(|link| link.id)
            .collect();
        for link in attached {
            self.disconnect(link)?;
        }
        Ok(self.nodes.remove(&node_id))
    }

    /// Inserts a structural copy of a node: no links, variadic groups
    /// collapsed to their base slot, size refitted. Returns the copy's id.
    pub fn duplicate_node(&mut self, node_id: NodeId) -> Option<NodeId> {
        let copy = {
            let node = self.nodes.get(&node_id)?;
            let mut copy = node.duplicate();
            copy.position += Vec2::new(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
            copy
        };
        Some(self.add_node(copy))
    }

    /// Connects an output slot to an input slot.
    ///
    /// Validates both endpoints and their type compatibility, evicts the
    /// input's previous link if the slot is occupied (an input accepts one
    /// link), attaches the new link to both slots, and notifies both nodes.
    /// Eviction can restructure a variadic node's inputs; the new link then
    /// attaches to whatever slot occupies `to_slot` afterwards.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_slot: SlotId,
        to_node: NodeId,
        to_slot: SlotId,
    ) -> Result<LinkId, GraphError> {
        if from_node == to_node {
            return Err(GraphError::SelfConnection);
        }
        let from_type = {
            let node = self
                .nodes
                .get(&from_node)
                .ok_or(GraphError::MissingNode(from_node))?;
            let slot = node.outputs.get(from_slot).ok_or(GraphError::MissingSlot {
                node: from_node,
                direction: SlotDirection::Output,
                slot: from_slot,
            })?;
            slot.data_type.clone()
        };
        let (to_type, occupied) = {
            let node = self
                .nodes
                .get(&to_node)
                .ok_or(GraphError::MissingNode(to_node))?;
            let slot = node.inputs.get(to_slot).ok_or(GraphError::MissingSlot {
                node: to_node,
                direction: SlotDirection::Input,
                slot: to_slot,
            })?;
            (slot.data_type.clone(), slot.links.first().copied())
        };
        if !from_type.can_connect_to(&to_type) {
            return Err(GraphError::IncompatibleTypes {
                from: from_type,
                to: to_type,
            });
        }

        if let Some(previous) = occupied {
            self.disconnect(previous)?;
            // The eviction may have removed and renumbered input slots
            let node = self
                .nodes
                .get(&to_node)
                .ok_or(GraphError::MissingNode(to_node))?;
            if node.inputs.get(to_slot).is_none() {
                return Err(GraphError::MissingSlot {
                    node: to_node,
                    direction: SlotDirection::Input,
                    slot: to_slot,
                });
            }
        }

        let id = self.next_link_id;
        self.next_link_id += 1;
        self.links.insert(
            id,
            Link {
                id,
                from_node,
                from_slot,
                to_node,
                to_slot,
            },
        );
        if let Some(node) = self.nodes.get_mut(&from_node) {
            if let Some(slot) = node.outputs.get_mut(from_slot) {
                slot.attach_link(id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&to_node) {
            if let Some(slot) = node.inputs.get_mut(to_slot) {
                slot.attach_link(id);
            }
        }
        self.notify(from_node, SlotDirection::Output, from_slot, true, id)?;
        self.notify(to_node, SlotDirection::Input, to_slot, true, id)?;
        Ok(id)
    }

    /// Removes a link, detaches it from both end slots, and notifies both
    /// nodes. Returns the removed link.
    pub fn disconnect(&mut self, link_id: LinkId) -> Result<Link, GraphError> {
        let link = self
            .links
            .remove(&link_id)
            .ok_or(GraphError::MissingLink(link_id))?;
        if let Some(node) = self.nodes.get_mut(&link.from_node) {
            if let Some(slot) = node.outputs.get_mut(link.from_slot) {
                slot.detach_link(link_id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&link.to_node) {
            if let Some(slot) = node.inputs.get_mut(link.to_slot) {
                slot.detach_link(link_id);
            }
        }
        self.notify(link.from_node, SlotDirection::Output, link.from_slot, false, link_id)?;
        self.notify(link.to_node, SlotDirection::Input, link.to_slot, false, link_id)?;
        Ok(link)
    }

    /// Serializes the graph, including each node's variadic groups
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Restores a graph serialized with `to_json`
    pub fn from_json(json: &str) -> serde_json::Result<NodeGraph> {
        serde_json::from_str(json)
    }

    /// Delivers one connection change to a node and applies the resulting
    /// structural fix-ups to the graph's links
    fn notify(
        &mut self,
        node_id: NodeId,
        direction: SlotDirection,
        position: SlotId,
        connected: bool,
        link: LinkId,
    ) -> Result<(), GraphError> {
        let edit = match self.nodes.get_mut(&node_id) {
            Some(node) => {
                let slots = match direction {
                    SlotDirection::Input => &node.inputs,
                    SlotDirection::Output => &node.outputs,
                };
                let Some(slot) = slots.get(position) else {
                    debug!(
                        "node {} has no {} slot at {}; skipping notification",
                        node_id, direction, position
                    );
                    return Ok(());
                };
                let event = ConnectionChange {
                    direction,
                    position,
                    connected,
                    link,
                    slot_name: slot.name.clone(),
                    slot_links: slot.links.clone(),
                };
                node.on_connection_change(&event)?
            }
            None => {
                debug!("connection change for missing node {}; skipping", node_id);
                return Ok(());
            }
        };
        if let SlotListEdit::Removed { position } = edit {
            self.shift_links_after_removal(node_id, direction, position);
        }
        Ok(())
    }

    /// Slides link endpoints past a removed slot down by one position
    fn shift_links_after_removal(
        &mut self,
        node_id: NodeId,
        direction: SlotDirection,
        position: SlotId,
    ) {
        for link in self.links.values_mut() {
            match direction {
                SlotDirection::Input => {
                    if link.to_node == node_id && link.to_slot > position {
                        link.to_slot -= 1;
                    }
                }
                SlotDirection::Output => {
                    if link.from_node == node_id && link.from_slot > position {
                        link.from_slot -= 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::slot::DataType;
    use egui::Pos2;

    fn source(graph: &mut NodeGraph) -> NodeId {
        let mut node = Node::new(0, "Source", Pos2::ZERO);
        node.add_output("Out", DataType::Float);
        graph.add_node(node)
    }

    fn sink(graph: &mut NodeGraph) -> NodeId {
        let mut node = Node::new(0, "Sink", Pos2::new(300.0, 0.0));
        node.add_input("In", DataType::Float);
        graph.add_node(node)
    }

    fn merge(graph: &mut NodeGraph) -> NodeId {
        let mut node = Node::new(0, "Merge", Pos2::new(300.0, 100.0));
        node.add_variadic_input("V", DataType::Float);
        node.add_output("Out", DataType::Float);
        graph.add_node(node)
    }

    fn fanout(graph: &mut NodeGraph) -> NodeId {
        let mut node = Node::new(0, "Fanout", Pos2::new(0.0, 100.0));
        node.add_variadic_output("O", DataType::Float);
        graph.add_node(node)
    }

    #[test]
    fn connect_validates_endpoints() {
        let mut graph = NodeGraph::new();
        let a = source(&mut graph);
        let b = sink(&mut graph);

        assert_eq!(graph.connect(a, 0, a, 0), Err(GraphError::SelfConnection));
        assert_eq!(graph.connect(99, 0, b, 0), Err(GraphError::MissingNode(99)));
        assert!(matches!(
            graph.connect(a, 5, b, 0),
            Err(GraphError::MissingSlot { .. })
        ));

        let mut bool_node = Node::new(0, "Flag", Pos2::ZERO);
        bool_node.add_input("In", DataType::Boolean);
        let c = graph.add_node(bool_node);
        assert!(matches!(
            graph.connect(a, 0, c, 0),
            Err(GraphError::IncompatibleTypes { .. })
        ));
    }

    #[test]
    fn connect_grows_a_variadic_input() {
        let mut graph = NodeGraph::new();
        let a = source(&mut graph);
        let b = merge(&mut graph);

        let link = graph.connect(a, 0, b, 0).unwrap();

        let node = &graph.nodes[&b];
        assert_eq!(node.inputs.len(), 2);
        assert_eq!(node.inputs[0].name, "V- 0");
        assert_eq!(node.inputs[0].links, vec![link]);
        assert_eq!(node.inputs[1].name, "V- 1");
        assert!(!node.inputs[1].is_connected());
        // The source's plain output is untouched
        assert_eq!(graph.nodes[&a].outputs.len(), 1);
    }

    #[test]
    fn disconnect_shrinks_and_shifts_link_endpoints() {
        let mut graph = NodeGraph::new();
        let a = source(&mut graph);
        let b = merge(&mut graph);

        let first = graph.connect(a, 0, b, 0).unwrap();
        let second = graph.connect(a, 0, b, 1).unwrap();
        assert_eq!(graph.nodes[&b].inputs.len(), 3);

        graph.disconnect(first).unwrap();

        let node = &graph.nodes[&b];
        assert_eq!(node.inputs.len(), 2);
        assert_eq!(node.inputs[0].name, "V- 0");
        assert_eq!(node.inputs[0].links, vec![second]);
        assert_eq!(node.inputs[1].name, "V- 1");
        assert!(!node.inputs[1].is_connected());
        // The surviving link follows its slot to the new position
        assert_eq!(graph.links[&second].to_slot, 0);
        assert!(!graph.links.contains_key(&first));
    }

    #[test]
    fn occupied_input_evicts_its_previous_link() {
        let mut graph = NodeGraph::new();
        let a = source(&mut graph);
        let b = source(&mut graph);
        let c = sink(&mut graph);

        let first = graph.connect(a, 0, c, 0).unwrap();
        let second = graph.connect(b, 0, c, 0).unwrap();

        assert!(!graph.links.contains_key(&first));
        assert_eq!(graph.nodes[&c].inputs[0].links, vec![second]);
        assert!(graph.nodes[&a].outputs[0].links.is_empty());
    }

    #[test]
    fn variadic_output_grows_per_slot_not_per_link() {
        let mut graph = NodeGraph::new();
        let f = fanout(&mut graph);
        let x = sink(&mut graph);
        let y = sink(&mut graph);
        let z = sink(&mut graph);

        graph.connect(f, 0, x, 0).unwrap();
        assert_eq!(graph.nodes[&f].outputs.len(), 2);

        // Second link fans out of O- 0: no growth
        graph.connect(f, 0, y, 0).unwrap();
        assert_eq!(graph.nodes[&f].outputs.len(), 2);

        // First link on O- 1 grows again
        graph.connect(f, 1, z, 0).unwrap();
        assert_eq!(graph.nodes[&f].outputs.len(), 3);
        assert_eq!(graph.nodes[&f].outputs[2].name, "O- 2");
    }

    #[test]
    fn variadic_output_shrinks_when_a_slot_empties() {
        let mut graph = NodeGraph::new();
        let f = fanout(&mut graph);
        let x = sink(&mut graph);
        let y = sink(&mut graph);
        let z = sink(&mut graph);

        let to_x = graph.connect(f, 0, x, 0).unwrap();
        let to_y = graph.connect(f, 0, y, 0).unwrap();
        let to_z = graph.connect(f, 1, z, 0).unwrap();
        assert_eq!(graph.nodes[&f].outputs.len(), 3);

        // O- 0 still carries a link after losing one
        graph.disconnect(to_x).unwrap();
        assert_eq!(graph.nodes[&f].outputs.len(), 3);

        // Emptying O- 0 removes it; O- 1 and O- 2 slide down, the link to z
        // follows its slot
        graph.disconnect(to_y).unwrap();
        let node = &graph.nodes[&f];
        assert_eq!(node.outputs.len(), 2);
        assert_eq!(node.outputs[0].name, "O- 0");
        assert_eq!(node.outputs[0].links, vec![to_z]);
        assert_eq!(graph.links[&to_z].from_slot, 0);
    }

    #[test]
    fn removing_a_node_shrinks_its_peers() {
        let mut graph = NodeGraph::new();
        let a = source(&mut graph);
        let b = merge(&mut graph);

        graph.connect(a, 0, b, 0).unwrap();
        assert_eq!(graph.nodes[&b].inputs.len(), 2);

        let removed = graph.remove_node(a).unwrap();
        assert!(removed.is_some());
        assert!(graph.links.is_empty());
        let node = &graph.nodes[&b];
        assert_eq!(node.inputs.len(), 1);
        assert_eq!(node.inputs[0].name, "V- 0");
        assert!(!node.inputs[0].is_connected());
    }

    #[test]
    fn duplicating_a_node_collapses_its_groups() {
        let mut graph = NodeGraph::new();
        let a = source(&mut graph);
        let b = merge(&mut graph);
        graph.connect(a, 0, b, 0).unwrap();
        graph.connect(a, 0, b, 1).unwrap();
        assert_eq!(graph.nodes[&b].inputs.len(), 3);

        let copy_id = graph.duplicate_node(b).unwrap();
        let copy = &graph.nodes[&copy_id];
        assert_ne!(copy_id, b);
        assert_eq!(copy.inputs.len(), 1);
        assert_eq!(copy.inputs[0].name, "V- 0");
        assert!(!copy.inputs[0].is_connected());
        assert_eq!(copy.size, copy.preferred_size());
        // Original keeps its grown state
        assert_eq!(graph.nodes[&b].inputs.len(), 3);
    }

    #[test]
    fn json_round_trip_preserves_variadic_state() {
        let mut graph = NodeGraph::new();
        let a = source(&mut graph);
        let b = merge(&mut graph);
        graph.connect(a, 0, b, 0).unwrap();

        let json = graph.to_json().unwrap();
        let mut restored = NodeGraph::from_json(&json).unwrap();

        assert_eq!(restored.nodes.len(), 2);
        assert_eq!(restored.links.len(), 1);
        let node = &restored.nodes[&b];
        assert_eq!(node.inputs.len(), 2);
        assert_eq!(
            node.variadic
                .group(SlotDirection::Input, "V")
                .unwrap()
                .count,
            2
        );

        // The restored registry keeps reacting: connect to the fresh slot
        restored.connect(a, 0, b, 1).unwrap();
        assert_eq!(restored.nodes[&b].inputs.len(), 3);
        assert_eq!(restored.nodes[&b].inputs[2].name, "V- 2");
    }
}
