//! Node types and core node functionality

use super::slot::{DataType, SlotDirection, SlotId, SlotList, SlotOptions};
use super::variadic::{ConnectionChange, SlotError, SlotListEdit, VariadicSlots};
use egui::{Color32, Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = usize;

/// Horizontal spacing between neighbouring slots
const SLOT_SPACING: f32 = 30.0;

/// Core node structure representing a visual node in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    #[serde(with = "pos2_serde")]
    pub position: Pos2,
    #[serde(with = "vec2_serde")]
    pub size: Vec2,
    pub inputs: SlotList,
    pub outputs: SlotList,
    #[serde(with = "color32_serde")]
    pub color: Color32,
    /// Variadic slot groups managed on this node
    pub variadic: VariadicSlots,
}

impl Node {
    /// Creates a new node with the specified properties
    pub fn new(id: NodeId, title: impl Into<String>, position: Pos2) -> Self {
        Self {
            id,
            title: title.into(),
            position,
            size: Vec2::new(150.0, 30.0),
            inputs: SlotList::new(),
            outputs: SlotList::new(),
            color: Color32::from_rgb(60, 60, 60),
            variadic: VariadicSlots::new(),
        }
    }

    /// Adds an input slot to the node
    pub fn add_input(&mut self, name: impl Into<String>, data_type: DataType) -> &mut Self {
        self.add_input_with(name, data_type, SlotOptions::default())
    }

    /// Adds an input slot with extra creation arguments
    pub fn add_input_with(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        options: SlotOptions,
    ) -> &mut Self {
        self.inputs.add(name, data_type, SlotDirection::Input, options);
        self
    }

    /// Adds an output slot to the node
    pub fn add_output(&mut self, name: impl Into<String>, data_type: DataType) -> &mut Self {
        self.add_output_with(name, data_type, SlotOptions::default())
    }

    /// Adds an output slot with extra creation arguments
    pub fn add_output_with(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        options: SlotOptions,
    ) -> &mut Self {
        self.outputs.add(name, data_type, SlotDirection::Output, options);
        self
    }

    /// Declares a variadic input group, seeding it with one concrete slot
    pub fn add_variadic_input(&mut self, base: impl Into<String>, data_type: DataType) -> &mut Self {
        self.add_variadic_input_with(base, data_type, SlotOptions::default())
    }

    /// Declares a variadic input group with extra creation arguments
    pub fn add_variadic_input_with(
        &mut self,
        base: impl Into<String>,
        data_type: DataType,
        options: SlotOptions,
    ) -> &mut Self {
        let base = base.into();
        self.variadic
            .register(SlotDirection::Input, &base, data_type, options, &mut self.inputs);
        self
    }

    /// Declares a variadic output group, seeding it with one concrete slot
    pub fn add_variadic_output(&mut self, base: impl Into<String>, data_type: DataType) -> &mut Self {
        self.add_variadic_output_with(base, data_type, SlotOptions::default())
    }

    /// Declares a variadic output group with extra creation arguments
    pub fn add_variadic_output_with(
        &mut self,
        base: impl Into<String>,
        data_type: DataType,
        options: SlotOptions,
    ) -> &mut Self {
        let base = base.into();
        self.variadic
            .register(SlotDirection::Output, &base, data_type, options, &mut self.outputs);
        self
    }

    /// Finds an input slot position by name
    pub fn find_input(&self, name: &str) -> Option<SlotId> {
        self.inputs.position_of(name)
    }

    /// Finds an output slot position by name
    pub fn find_output(&self, name: &str) -> Option<SlotId> {
        self.outputs.position_of(name)
    }

    /// Removes the input slot at a position
    pub fn remove_input(&mut self, position: usize) -> Option<super::slot::Slot> {
        self.inputs.remove(position)
    }

    /// Removes the output slot at a position
    pub fn remove_output(&mut self, position: usize) -> Option<super::slot::Slot> {
        self.outputs.remove(position)
    }

    /// Forwards a connection change to the variadic groups and refits the
    /// node when the slot list changed shape. Returns the structural edit so
    /// the graph can shift link endpoints past a removed slot.
    pub fn on_connection_change(
        &mut self,
        event: &ConnectionChange,
    ) -> Result<SlotListEdit, SlotError> {
        let slots = match event.direction {
            SlotDirection::Input => &mut self.inputs,
            SlotDirection::Output => &mut self.outputs,
        };
        let edit = self.variadic.on_connection_change(event, slots)?;
        if edit != SlotListEdit::None {
            self.fit_size();
        }
        Ok(edit)
    }

    /// Structural copy for duplication: links are never copied, variadic
    /// groups collapse back to their single base slot, and the size is
    /// recomputed for the reduced slot lists. The graph assigns the copy a
    /// fresh id on insertion.
    pub fn duplicate(&self) -> Node {
        let mut copy = self.clone();
        for slot in copy.inputs.iter_mut() {
            slot.links.clear();
        }
        for slot in copy.outputs.iter_mut() {
            slot.links.clear();
        }
        copy.variadic.collapse(&mut copy.inputs, &mut copy.outputs);
        copy.fit_size();
        copy
    }

    /// Computes the preferred size for the current slot lists
    pub fn preferred_size(&self) -> Vec2 {
        let widest = self.inputs.len().max(self.outputs.len());
        let width = (widest.saturating_sub(1) as f32 * SLOT_SPACING + 60.0).max(150.0);
        Vec2::new(width, 30.0)
    }

    /// Applies a size and lays the slots back out
    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
        self.update_slot_positions();
    }

    /// Resizes the node to its preferred size
    pub fn fit_size(&mut self) {
        self.set_size(self.preferred_size());
    }

    /// Updates the positions of all slots based on the node's position and size
    pub fn update_slot_positions(&mut self) {
        // Input slots on TOP of node
        let input_start_x = if self.inputs.len() > 1 {
            (self.size.x - (self.inputs.len() - 1) as f32 * SLOT_SPACING) / 2.0
        } else {
            self.size.x / 2.0
        };

        for (i, input) in self.inputs.iter_mut().enumerate() {
            input.position =
                self.position + Vec2::new(input_start_x + i as f32 * SLOT_SPACING, 0.0);
        }

        // Output slots on BOTTOM of node
        let output_start_x = if self.outputs.len() > 1 {
            (self.size.x - (self.outputs.len() - 1) as f32 * SLOT_SPACING) / 2.0
        } else {
            self.size.x / 2.0
        };

        for (i, output) in self.outputs.iter_mut().enumerate() {
            output.position =
                self.position + Vec2::new(output_start_x + i as f32 * SLOT_SPACING, self.size.y);
        }
    }

    /// Returns the bounding rectangle of the node
    pub fn get_rect(&self) -> Rect {
        Rect::from_min_size(self.position, self.size)
    }

    /// Sets the color of the node
    pub fn with_color(mut self, color: Color32) -> Self {
        self.color = color;
        self
    }

    /// Sets the size of the node
    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }
}

// Serde helper modules for egui types
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

mod vec2_serde {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(vec: &Vec2, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [vec.x, vec.y].serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec2, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [x, y] = <[f32; 2]>::deserialize(deserializer)?;
        Ok(Vec2::new(x, y))
    }
}

mod color32_serde {
    use super::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [color.r(), color.g(), color.b(), color.a()].serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Color32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [r, g, b, a] = <[u8; 4]>::deserialize(deserializer)?;
        Ok(Color32::from_rgba_unmultiplied(r, g, b, a))
    }
}
