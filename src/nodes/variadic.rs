//! Variadic slot groups
//!
//! A node can declare a named slot group that grows and shrinks with its
//! connections instead of being fixed at construction:
//! - registering a group seeds it with one concrete slot
//! - connecting to an input slot of the group appends a fresh slot
//! - connecting the first link to the last output slot appends a fresh slot
//! - disconnecting a slot's last link removes it and renumbers the rest
//!
//! Concrete slot names carry the group base name and the slot index, joined
//! by a configurable token. The name codec is the only place that format
//! lives; growth and shrink logic goes through it exclusively.

use super::graph::LinkId;
use super::slot::{DataType, SlotDirection, SlotId, SlotList, SlotOptions};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Separator between a group's base name and the slot index
pub const DEFAULT_JOIN_TOKEN: &str = "- ";

/// Errors raised by variadic slot handling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// A slot name contains the join token but its trailing segment is not
    /// an index. The slot was renamed outside this system's control; the
    /// handler refuses to guess rather than corrupt the group's count.
    #[error("slot name `{name}` looks variadic but its suffix is not an index")]
    MalformedIndex { name: String },
}

/// Bidirectional mapping between `(base name, index)` and a concrete slot
/// name.
///
/// Override `join_token`, or `encode`/`decode` as a pair, to change the
/// naming scheme. Everything driving slot growth calls this trait and never
/// splits names itself.
pub trait SlotNaming: fmt::Debug + Send + Sync {
    /// Token joining a base name to a slot index
    fn join_token(&self) -> &str {
        DEFAULT_JOIN_TOKEN
    }

    /// Derive the concrete name for one slot of a group
    fn encode(&self, base: &str, index: usize) -> String {
        format!("{}{}{}", base, self.join_token(), index)
    }

    /// Parse a concrete slot name back into `(base name, index)`.
    ///
    /// Returns `Ok(None)` for names without the join token, which this
    /// system does not manage. A name with the token but a non-numeric
    /// suffix is a naming-consistency violation and fails.
    fn decode(&self, name: &str) -> Result<Option<(String, usize)>, SlotError> {
        let join = self.join_token();
        let mut parts: Vec<&str> = name.split(join).collect();
        if parts.len() < 2 {
            return Ok(None);
        }
        let Some(tail) = parts.pop() else {
            return Ok(None);
        };
        let index = tail.parse::<usize>().map_err(|_| SlotError::MalformedIndex {
            name: name.to_string(),
        })?;
        // Base names may themselves contain the join token
        Ok(Some((parts.join(join), index)))
    }

    /// Clone the codec for embedding in a duplicated node
    fn clone_box(&self) -> Box<dyn SlotNaming>;
}

/// Default codec: `base + "- " + index`
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedNaming;

impl SlotNaming for IndexedNaming {
    fn clone_box(&self) -> Box<dyn SlotNaming> {
        Box::new(*self)
    }
}

/// One dynamically sized family of slots sharing a base name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotGroup {
    pub base_name: String,
    pub data_type: DataType,
    pub direction: SlotDirection,
    /// Concrete slots exist for indices `0..count`, contiguously.
    /// Never drops below 1 once the group is registered.
    pub count: usize,
}

/// One connect or disconnect as delivered by the host.
///
/// Built after the host has updated the affected slot's link list, so
/// `slot_links` reflects the post-change state: on a connect the new link
/// is already present, on a disconnect it is already gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionChange {
    pub direction: SlotDirection,
    /// Position of the affected slot in its list
    pub position: usize,
    /// True for a connect, false for a disconnect
    pub connected: bool,
    /// Identity of the link that was attached or detached
    pub link: LinkId,
    /// Name of the affected slot at event time
    pub slot_name: String,
    /// The slot's full link list after the change
    pub slot_links: Vec<LinkId>,
}

/// Structural outcome of one reaction, reported back to the host so it can
/// shift link endpoint indices and refit the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotListEdit {
    /// Slot list untouched
    None,
    /// A fresh slot was appended at the end of the list
    Grew,
    /// The slot at this position was removed and later group slots renumbered
    Removed { position: usize },
}

/// Per-node registry of variadic slot groups.
///
/// Owned by the node it manages; mutated only through registration and the
/// connection-change reaction. The codec is not serialized; deserialized
/// nodes come back with the default `IndexedNaming`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VariadicSlots {
    groups: Vec<SlotGroup>,
    #[serde(skip, default = "default_naming")]
    naming: Box<dyn SlotNaming>,
}

fn default_naming() -> Box<dyn SlotNaming> {
    Box::new(IndexedNaming)
}

impl Default for VariadicSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for VariadicSlots {
    fn clone(&self) -> Self {
        Self {
            groups: self.groups.clone(),
            naming: self.naming.clone_box(),
        }
    }
}

impl VariadicSlots {
    /// Creates an empty registry with the default name codec
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            naming: default_naming(),
        }
    }

    /// Creates an empty registry with a custom name codec
    pub fn with_naming(naming: Box<dyn SlotNaming>) -> Self {
        Self {
            groups: Vec::new(),
            naming,
        }
    }

    /// The active name codec
    pub fn naming(&self) -> &dyn SlotNaming {
        self.naming.as_ref()
    }

    /// All registered groups
    pub fn groups(&self) -> &[SlotGroup] {
        &self.groups
    }

    /// Looks up a group by direction and base name
    pub fn group(&self, direction: SlotDirection, base: &str) -> Option<&SlotGroup> {
        self.group_index(direction, base).map(|i| &self.groups[i])
    }

    fn group_index(&self, direction: SlotDirection, base: &str) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.direction == direction && g.base_name == base)
    }

    /// Declares a slot group (first call for a base name) or materializes
    /// its next concrete slot (every later call), appending the slot to the
    /// given list. Growth during the connection reaction funnels through
    /// here as well. Returns the position of the created slot.
    pub fn register(
        &mut self,
        direction: SlotDirection,
        base: &str,
        data_type: DataType,
        options: SlotOptions,
        slots: &mut SlotList,
    ) -> SlotId {
        let index = match self.group_index(direction, base) {
            Some(index) => index,
            None => {
                self.groups.push(SlotGroup {
                    base_name: base.to_string(),
                    data_type,
                    direction,
                    count: 0,
                });
                self.groups.len() - 1
            }
        };
        let group = &self.groups[index];
        let name = self.naming.encode(base, group.count);
        debug!(
            "materializing {} slot `{}` for group `{}`",
            direction, name, base
        );
        let slot = slots.add(name, group.data_type.clone(), direction, options);
        self.groups[index].count += 1;
        slot
    }

    /// Reacts to one connect/disconnect on the slot list the event names.
    ///
    /// Events touching slots outside every registered group are ignored.
    /// On connect, an input group always grows so an unconnected successor
    /// stays available; an output group grows only when the slot gained its
    /// first link. On disconnect, an input slot is removed immediately and
    /// an output slot only once its link list is empty; later slots of the
    /// group are renamed one index down, and the group never shrinks below
    /// its single base slot.
    pub fn on_connection_change(
        &mut self,
        event: &ConnectionChange,
        slots: &mut SlotList,
    ) -> Result<SlotListEdit, SlotError> {
        let Some((base, slot_index)) = self.naming.decode(&event.slot_name)? else {
            return Ok(SlotListEdit::None);
        };
        let Some(index) = self.group_index(event.direction, &base) else {
            debug!(
                "no {} group `{}` registered; ignoring change on `{}`",
                event.direction, base, event.slot_name
            );
            return Ok(SlotListEdit::None);
        };

        if event.connected {
            let grow = match event.direction {
                SlotDirection::Input => true,
                SlotDirection::Output => event.slot_links.len() == 1,
            };
            if !grow {
                return Ok(SlotListEdit::None);
            }
            let data_type = self.groups[index].data_type.clone();
            self.register(event.direction, &base, data_type, SlotOptions::default(), slots);
            Ok(SlotListEdit::Grew)
        } else {
            let count = self.groups[index].count;
            if count <= 1 {
                return Ok(SlotListEdit::None);
            }
            let vacated = match event.direction {
                SlotDirection::Input => true,
                SlotDirection::Output => event.slot_links.is_empty(),
            };
            if !vacated {
                return Ok(SlotListEdit::None);
            }
            slots.remove(event.position);
            self.renumber_down(&base, slot_index, count, slots);
            self.groups[index].count = count - 1;
            Ok(SlotListEdit::Removed {
                position: event.position,
            })
        }
    }

    /// Shifts group slots above a removed index down by one name each,
    /// preserving their links. Only names change; link endpoints are the
    /// host's to fix.
    fn renumber_down(&self, base: &str, removed: usize, count: usize, slots: &mut SlotList) {
        for i in removed..count - 1 {
            let from = self.naming.encode(base, i + 1);
            match slots.position_of(&from) {
                Some(position) => slots.rename(position, self.naming.encode(base, i)),
                None => warn!("group `{}` has no slot `{}` to renumber", base, from),
            }
        }
    }

    /// Collapses every group back to its single base slot, the state a
    /// freshly registered node starts from. Used when duplicating a node,
    /// which never copies connections.
    pub fn collapse(&mut self, inputs: &mut SlotList, outputs: &mut SlotList) {
        for index in 0..self.groups.len() {
            let (base, direction, count) = {
                let group = &self.groups[index];
                (group.base_name.clone(), group.direction, group.count)
            };
            if count <= 1 {
                continue;
            }
            let slots = match direction {
                SlotDirection::Input => &mut *inputs,
                SlotDirection::Output => &mut *outputs,
            };
            for i in (1..count).rev() {
                let name = self.naming.encode(&base, i);
                match slots.position_of(&name) {
                    Some(position) => {
                        slots.remove(position);
                    }
                    None => warn!("group `{}` has no slot `{}` to collapse", base, name),
                }
            }
            self.groups[index].count = 1;
        }
    }
}
