//! The inventory data model as seen by the form engine.
//!
//! The engine never owns or mutates inventory contents. It reads them through
//! [`InventoryView`] to render and to validate the current selection, and it
//! requests mutations by issuing discrete [`InventoryAction`] values; whether
//! and when those take effect is the backend's business (it may involve a
//! server round trip).

use std::fmt;

// -------------------------------------------------------------------------------------------------

/// Identifies one inventory (a set of named lists) in the game world.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum InventoryLocation {
    /// The viewing player's own inventory.
    CurrentPlayer,
    /// A named player's inventory.
    Player(String),
    /// The metadata inventory of the map node at the given coordinates.
    NodeMeta {
        /// Node X coordinate.
        x: i32,
        /// Node Y coordinate.
        y: i32,
        /// Node Z coordinate.
        z: i32,
    },
    /// A world-detached inventory known by name.
    Detached(String),
}

/// Error parsing an [`InventoryLocation`] from its DSL serialization.
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[displaydoc("invalid inventory location {input:?}")]
#[non_exhaustive]
pub struct LocationError {
    /// The offending text.
    pub input: String,
}

impl core::error::Error for LocationError {}

impl InventoryLocation {
    /// Parses the serialization used by `list[]` and `listring[]` elements.
    ///
    /// `context`/`current_name` are *not* handled here; the parser resolves
    /// those against the menu's current inventory location before calling.
    pub fn parse(input: &str) -> Result<Self, LocationError> {
        let err = || LocationError {
            input: input.to_owned(),
        };
        if input == "current_player" {
            return Ok(InventoryLocation::CurrentPlayer);
        }
        if let Some(name) = input.strip_prefix("player:") {
            return Ok(InventoryLocation::Player(name.to_owned()));
        }
        if let Some(name) = input.strip_prefix("detached:") {
            return Ok(InventoryLocation::Detached(name.to_owned()));
        }
        if let Some(coords) = input.strip_prefix("nodemeta:") {
            let mut parts = coords.split(',').map(|p| p.trim().parse::<i32>());
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => {
                    return Ok(InventoryLocation::NodeMeta { x, y, z });
                }
                _ => return Err(err()),
            }
        }
        Err(err())
    }
}

impl fmt::Display for InventoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryLocation::CurrentPlayer => write!(f, "current_player"),
            InventoryLocation::Player(name) => write!(f, "player:{name}"),
            InventoryLocation::NodeMeta { x, y, z } => write!(f, "nodemeta:{x},{y},{z}"),
            InventoryLocation::Detached(name) => write!(f, "detached:{name}"),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A stack of identical items in one inventory slot.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct ItemStack {
    /// Item identifier; empty means the empty stack.
    pub name: String,
    /// Number of items; 0 means the empty stack.
    pub count: u32,
    /// The most items a single stack of this kind may hold.
    pub stack_max: u32,
}

impl ItemStack {
    /// The empty stack.
    pub fn empty() -> Self {
        ItemStack {
            name: String::new(),
            count: 0,
            stack_max: 99,
        }
    }

    /// A stack of `count` × `name` with the default stack limit.
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        ItemStack {
            name: name.into(),
            count,
            stack_max: 99,
        }
    }

    /// Whether this is the empty stack.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.count == 0
    }

    /// How many items of `other` this stack could absorb: all of them into an
    /// empty slot, up to `stack_max` for a same-name stack, none otherwise.
    pub fn room_for(&self, other: &ItemStack) -> u32 {
        if self.is_empty() {
            other.count
        } else if self.name == other.name {
            self.stack_max.saturating_sub(self.count).min(other.count)
        } else {
            0
        }
    }
}

impl Default for ItemStack {
    fn default() -> Self {
        Self::empty()
    }
}

// -------------------------------------------------------------------------------------------------

/// One slot of one inventory list: the target of clicks, moves, and drops.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct SlotRef {
    /// Which inventory.
    pub location: InventoryLocation,
    /// Which list within it.
    pub list: String,
    /// Zero-based slot index within the list.
    pub index: usize,
}

impl SlotRef {
    /// Convenience constructor.
    pub fn new(location: InventoryLocation, list: impl Into<String>, index: usize) -> Self {
        SlotRef {
            location,
            list: list.into(),
            index,
        }
    }
}

/// A mutation request the engine hands to the inventory backend.
///
/// The engine does not apply these itself and does not assume they take
/// effect synchronously; the selection is re-validated against live inventory
/// on every access instead.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum InventoryAction {
    /// Move `count` items from one slot to another.
    Move {
        /// Number of items to move.
        count: u32,
        /// Source slot.
        from: SlotRef,
        /// Destination slot; with `move_somewhere` set, only its location and
        /// list are meaningful and the backend picks free slots.
        to: SlotRef,
        /// Place the items anywhere in the destination list (shift-click
        /// transfer) rather than at the exact index.
        move_somewhere: bool,
    },
    /// Drop `count` items from a slot into the world.
    Drop {
        /// Number of items to drop.
        count: u32,
        /// Source slot.
        from: SlotRef,
    },
    /// Craft `count` times using the craft grid of the given inventory.
    Craft {
        /// Number of crafting repetitions.
        count: u32,
        /// The inventory whose craft list is used.
        location: InventoryLocation,
    },
}

/// Read access to live inventory data, plus the action sink.
///
/// Implementations should answer `None` for locations/lists that don't
/// exist; the engine treats that as "clear the selection", never as an error
/// worth surfacing to the user.
pub trait InventoryView {
    /// Number of slots in the given list, or `None` if inventory or list is
    /// missing.
    fn list_len(&self, location: &InventoryLocation, list: &str) -> Option<usize>;

    /// The stack in `slot`, or `None` if the slot does not exist.
    fn stack(&self, slot: &SlotRef) -> Option<ItemStack>;

    /// Requests a mutation. The engine never calls this with an action it
    /// hasn't validated against the view's current answers.
    fn issue(&mut self, action: InventoryAction);
}

// -------------------------------------------------------------------------------------------------

/// Trivial in-memory [`InventoryView`] that records issued actions instead of
/// applying them. Primarily for tests and demos.
#[derive(Debug, Default)]
pub struct VecInventory {
    lists: Vec<((InventoryLocation, String), Vec<ItemStack>)>,
    /// Actions issued so far, oldest first.
    pub actions: Vec<InventoryAction>,
}

impl VecInventory {
    /// Creates an empty inventory set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) one list.
    pub fn set_list(
        &mut self,
        location: InventoryLocation,
        list: impl Into<String>,
        stacks: Vec<ItemStack>,
    ) {
        let key = (location, list.into());
        if let Some(entry) = self.lists.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = stacks;
        } else {
            self.lists.push((key, stacks));
        }
    }

    fn list(&self, location: &InventoryLocation, list: &str) -> Option<&Vec<ItemStack>> {
        self.lists
            .iter()
            .find(|((loc, name), _)| loc == location && name == list)
            .map(|(_, stacks)| stacks)
    }
}

impl InventoryView for VecInventory {
    fn list_len(&self, location: &InventoryLocation, list: &str) -> Option<usize> {
        self.list(location, list).map(Vec::len)
    }

    fn stack(&self, slot: &SlotRef) -> Option<ItemStack> {
        self.list(&slot.location, &slot.list)?.get(slot.index).cloned()
    }

    fn issue(&mut self, action: InventoryAction) {
        self.actions.push(action);
    }
}

// -------------------------------------------------------------------------------------------------
