//! Slot types and functionality for node connections

use super::graph::LinkId;
use egui::{Color32, Pos2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Unique identifier for a slot (its position in the owning list)
pub type SlotId = usize;

/// Direction of a slot (input or output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotDirection {
    Input,
    Output,
}

impl fmt::Display for SlotDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotDirection::Input => write!(f, "input"),
            SlotDirection::Output => write!(f, "output"),
        }
    }
}

/// Data types that can flow through slots
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Floating point number
    Float,
    /// 3D vector (x, y, z)
    Vector3,
    /// RGB color value
    Color,
    /// Text string
    String,
    /// Boolean value
    Boolean,
    /// Any type (for generic slots)
    Any,
}

impl DataType {
    /// Check if this data type can connect to another
    pub fn can_connect_to(&self, other: &DataType) -> bool {
        self == other || *self == DataType::Any || *other == DataType::Any
    }

    /// Get a human-readable name for this data type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Float => "Float",
            DataType::Vector3 => "Vector3",
            DataType::Color => "Color",
            DataType::String => "String",
            DataType::Boolean => "Boolean",
            DataType::Any => "Any",
        }
    }

    /// Get a color representing this data type
    pub fn color(&self) -> Color32 {
        match self {
            DataType::Float => Color32::from_rgb(100, 150, 255), // Blue
            DataType::Vector3 => Color32::from_rgb(255, 100, 100), // Red
            DataType::Color => Color32::from_rgb(255, 200, 100), // Orange
            DataType::String => Color32::from_rgb(100, 255, 100), // Green
            DataType::Boolean => Color32::from_rgb(255, 100, 255), // Magenta
            DataType::Any => Color32::from_rgb(150, 150, 150),   // Gray
        }
    }
}

/// Extra creation arguments forwarded unchanged to the slot constructor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotOptions {
    /// Display label shown instead of the slot name
    pub label: Option<String>,
    /// Override for the data type color
    #[serde(with = "color32_opt_serde")]
    pub tint: Option<Color32>,
}

/// Represents a connection point on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub name: String,
    pub data_type: DataType,
    pub direction: SlotDirection,
    #[serde(with = "pos2_serde")]
    pub position: Pos2,
    /// Links currently attached to this slot; an input carries at most one
    pub links: Vec<LinkId>,
    pub label: Option<String>,
    #[serde(with = "color32_opt_serde")]
    pub tint: Option<Color32>,
}

impl Slot {
    /// Creates a new slot
    pub fn new(
        id: SlotId,
        name: impl Into<String>,
        data_type: DataType,
        direction: SlotDirection,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
            direction,
            position: Pos2::ZERO,
            links: Vec::new(),
            label: None,
            tint: None,
        }
    }

    /// Checks if this slot is an input
    pub fn is_input(&self) -> bool {
        matches!(self.direction, SlotDirection::Input)
    }

    /// Checks if this slot is an output
    pub fn is_output(&self) -> bool {
        matches!(self.direction, SlotDirection::Output)
    }

    /// Checks if any link is attached
    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }

    /// Attach a link id, ignoring ids already present
    pub fn attach_link(&mut self, link: LinkId) {
        if !self.links.contains(&link) {
            self.links.push(link);
        }
    }

    /// Detach a link id if present
    pub fn detach_link(&mut self, link: LinkId) {
        self.links.retain(|l| *l != link);
    }
}

/// One direction's ordered slot list, exposing the primitives the
/// variadic manager drives: add, remove by position, find by name,
/// rename in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotList {
    slots: Vec<Slot>,
}

impl SlotList {
    /// Creates an empty slot list
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a slot, assigning it the next id
    pub fn add(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        direction: SlotDirection,
        options: SlotOptions,
    ) -> SlotId {
        let id = self.slots.len();
        let mut slot = Slot::new(id, name, data_type, direction);
        slot.label = options.label;
        slot.tint = options.tint;
        self.slots.push(slot);
        id
    }

    /// Removes the slot at a position, shifting the ids of later slots down
    pub fn remove(&mut self, position: usize) -> Option<Slot> {
        if position >= self.slots.len() {
            return None;
        }
        let removed = self.slots.remove(position);
        for (i, slot) in self.slots.iter_mut().enumerate().skip(position) {
            slot.id = i;
        }
        Some(removed)
    }

    /// Finds a slot position by name
    pub fn position_of(&self, name: &str) -> Option<SlotId> {
        self.slots.iter().position(|slot| slot.name == name)
    }

    /// Renames the slot at a position in place
    pub fn rename(&mut self, position: usize, name: impl Into<String>) {
        if let Some(slot) = self.slots.get_mut(position) {
            slot.name = name.into();
        }
    }
}

impl Deref for SlotList {
    type Target = [Slot];

    fn deref(&self) -> &Self::Target {
        &self.slots
    }
}

impl DerefMut for SlotList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.slots
    }
}

// Serde helper module for Pos2
mod pos2_serde {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(pos: &Pos2, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [pos.x, pos.y].serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Pos2, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [x, y] = <[f32; 2]>::deserialize(deserializer)?;
        Ok(Pos2::new(x, y))
    }
}

// Serde helper module for Option<Color32>
mod color32_opt_serde {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(color: &Option<Color32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        color
            .map(|c| [c.r(), c.g(), c.b(), c.a()])
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Color32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rgba = Option::<[u8; 4]>::deserialize(deserializer)?;
        Ok(rgba.map(|[r, g, b, a]| Color32::from_rgba_unmultiplied(r, g, b, a)))
    }
}
