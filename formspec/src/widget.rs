//! Parsed widget records: the arena-allocated tree the layout driver builds
//! and the interaction controller reads and mutates.
//!
//! There is no widget-toolkit inheritance here. A widget is a rectangle plus
//! a [`WidgetKind`] carrying its per-kind live state (text, checked flag,
//! scrollbar position, ...); drawing it is the embedder's business. Nesting
//! is expressed through an explicit arena indexed by [`WidgetId`] handles,
//! not through toolkit parent/child machinery.

use std::collections::BTreeSet;

use euclid::vec2;

use crate::geometry::{PxRect, PxSize, PxVector};
use crate::inv::InventoryLocation;

// -------------------------------------------------------------------------------------------------

/// Field ids are assigned from this base upward, leaving room for the ids the
/// embedding toolkit reserves for built-in elements.
pub(crate) const FIELD_ID_BASE: i32 = 258;

/// Id of the implicit "Proceed" button appended to a simple-field form.
pub(crate) const PROCEED_ID: i32 = 257;

/// Handle to one widget in a [`WidgetArena`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct WidgetId(pub(crate) usize);

/// One node of the widget tree.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct WidgetNode {
    /// Parent node; `None` only for the root.
    pub parent: Option<WidgetId>,
    /// Rectangle relative to the parent's origin (the root's rectangle is
    /// absolute).
    pub rect: PxRect,
    /// Kind and per-kind state.
    pub kind: WidgetKind,
    /// Field id, if this widget reports as a field (0 otherwise).
    pub id: i32,
}

/// The tree of widgets built by one regeneration pass.
#[derive(Debug, Default)]
pub struct WidgetArena {
    nodes: Vec<WidgetNode>,
}

impl WidgetArena {
    /// Creates an arena containing only a root node of the given rectangle.
    pub fn new(root_rect: PxRect) -> Self {
        WidgetArena {
            nodes: vec![WidgetNode {
                parent: None,
                rect: root_rect,
                kind: WidgetKind::Root,
                id: 0,
            }],
        }
    }

    /// The root widget (the menu itself).
    pub fn root(&self) -> WidgetId {
        WidgetId(0)
    }

    /// Inserts a node under `parent` and returns its handle.
    pub fn insert(&mut self, parent: WidgetId, rect: PxRect, kind: WidgetKind, id: i32) -> WidgetId {
        let handle = WidgetId(self.nodes.len());
        self.nodes.push(WidgetNode {
            parent: Some(parent),
            rect,
            kind,
            id,
        });
        handle
    }

    /// Borrows a node.
    pub fn get(&self, id: WidgetId) -> &WidgetNode {
        &self.nodes[id.0]
    }

    /// Mutably borrows a node.
    pub fn get_mut(&mut self, id: WidgetId) -> &mut WidgetNode {
        &mut self.nodes[id.0]
    }

    /// All node handles in creation order (which is also the default draw
    /// order for formspec version ≥ 3).
    pub fn ids(&self) -> impl Iterator<Item = WidgetId> + '_ {
        (0..self.nodes.len()).map(WidgetId)
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds only the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// The node's rectangle in absolute pixels: its own rectangle translated
    /// by every ancestor's origin, including scroll-container offsets.
    pub fn absolute_rect(&self, id: WidgetId) -> PxRect {
        let mut rect = self.nodes[id.0].rect;
        let mut cursor = self.nodes[id.0].parent;
        while let Some(parent_id) = cursor {
            let parent = &self.nodes[parent_id.0];
            let mut origin = parent.rect.min.to_vector();
            if let WidgetKind::ScrollContainer { offset, .. } = parent.kind {
                origin += offset;
            }
            rect = rect.translate(origin);
            cursor = parent.parent;
        }
        rect
    }
}

// -------------------------------------------------------------------------------------------------

/// Live state of a scrollbar widget.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct ScrollbarState {
    /// Orientation, fixed at creation.
    pub horizontal: bool,
    /// Current thumb position.
    pub value: i32,
    /// Minimum value.
    pub min: i32,
    /// Maximum value.
    pub max: i32,
    /// Step for arrow clicks / wheel.
    pub small_step: i32,
    /// Step for trough clicks.
    pub large_step: i32,
    /// Thumb length in value units, derived from the declared thumb size and
    /// the scrollbar's own pixel length.
    pub page_size: i32,
    /// Whether arrow buttons are shown (`None` = automatic).
    pub arrows_visible: Option<bool>,
}

impl ScrollbarState {
    /// Clamps `value` into `min..=max` and stores it; returns whether it
    /// changed.
    pub fn set_value(&mut self, value: i32) -> bool {
        let clamped = value.clamp(self.min, self.max);
        let changed = clamped != self.value;
        self.value = clamped;
        changed
    }
}

/// Interactive state of a table/textlist that survives regeneration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct TableState {
    /// Selected row (zero-based), if any.
    pub selected: Option<usize>,
    /// Scroll position in rows.
    pub scroll: i32,
    /// Opened tree nodes, by row index.
    pub opened: BTreeSet<usize>,
}

/// An inventory-list widget: a grid of slots bound to one inventory list.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct ListSpec {
    /// Which inventory.
    pub location: InventoryLocation,
    /// Which list.
    pub list: String,
    /// Slot columns.
    pub cols: u32,
    /// Slot rows.
    pub rows: u32,
    /// Index of the first displayed slot.
    pub start_index: usize,
    /// Center-to-center slot distance in pixels.
    pub slot_spacing: PxVector,
    /// Side length of one slot body in pixels.
    pub slot_size: PxSize,
}

impl ListSpec {
    /// Rectangle of the `n`-th *displayed* slot, relative to the list
    /// widget's own origin.
    pub fn slot_rect(&self, n: u32) -> PxRect {
        let cols = self.cols.max(1);
        let col = n % cols;
        let row = n / cols;
        let min = euclid::point2(
            f32::from(u16::try_from(col).unwrap_or(u16::MAX)) * self.slot_spacing.x,
            f32::from(u16::try_from(row).unwrap_or(u16::MAX)) * self.slot_spacing.y,
        );
        PxRect::new(
            min,
            min + vec2(self.slot_size.width, self.slot_size.height),
        )
    }

    /// Number of displayed slots.
    pub fn slot_count(&self) -> u32 {
        self.cols * self.rows
    }
}

/// Widget kind and per-kind state.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum WidgetKind {
    /// The menu itself.
    Root,
    /// Push button. `exit` closes the menu when activated.
    Button {
        /// Visible caption (also the submitted value).
        label: String,
        /// Close the menu on activation.
        exit: bool,
        /// Foreground texture for `image_button`.
        image: Option<String>,
        /// Item to render for `item_image_button`.
        item: Option<String>,
    },
    /// Checkbox with a caption.
    Checkbox {
        /// Current state.
        checked: bool,
    },
    /// Single- or multi-line text input.
    EditBox {
        /// Current contents.
        text: String,
        /// Multi-line (`textarea[]`)?
        multiline: bool,
        /// Password entry (`pwdfield[]`); forces single-line.
        password: bool,
    },
    /// Static text; one entry per line.
    Label {
        /// Lines of text.
        lines: Vec<String>,
        /// Rendered top-to-bottom one character per line (`vertlabel[]`).
        vertical: bool,
    },
    /// Static image.
    Image {
        /// Texture name for the texture source.
        texture: String,
    },
    /// Image cycling through vertically stacked frames.
    AnimatedImage {
        /// Texture name.
        texture: String,
        /// Number of frames stacked in the texture.
        frame_count: u32,
        /// Frame duration in milliseconds; 0 pauses on `start_frame`.
        frame_duration_ms: u32,
        /// Current frame, zero-based.
        frame: u32,
        /// Time into the current frame.
        elapsed_ms: u32,
    },
    /// Rendered item stack.
    ItemImage {
        /// Item identifier.
        item: String,
    },
    /// Form or fullscreen background image.
    Background {
        /// Texture name.
        texture: String,
        /// 9-slice border sizes (`background9[]`), as given.
        middle: Option<String>,
        /// Stretch over the whole screen rather than the form rectangle.
        fullscreen: bool,
    },
    /// Filled rectangle.
    ColorBox {
        /// Color string as given in the DSL.
        color: String,
    },
    /// Inventory slot grid.
    List(ListSpec),
    /// Scrollbar.
    Scrollbar(ScrollbarState),
    /// Drop-down selection.
    Dropdown {
        /// Entries in display order.
        items: Vec<String>,
        /// Selected entry, zero-based.
        selected: Option<usize>,
        /// Submit the 1-based index instead of the entry text.
        index_event: bool,
    },
    /// Table or textlist.
    Table {
        /// `tableoptions[]` accumulated before this table, as `key=value`.
        options: Vec<(String, String)>,
        /// `tablecolumns[]` accumulated before this table.
        columns: Vec<String>,
        /// Cell texts in row-major order.
        cells: Vec<String>,
        /// Number of rows.
        rows: usize,
        /// Interactive state preserved across regeneration.
        state: TableState,
    },
    /// Row of tabs above the form.
    TabHeader {
        /// Tab captions.
        captions: Vec<String>,
        /// Active tab, zero-based.
        active: usize,
        /// Do not draw a background.
        transparent: bool,
        /// Draw a border.
        draw_border: bool,
    },
    /// Markup text region; interpretation belongs to the text renderer.
    Hypertext {
        /// Raw markup.
        text: String,
    },
    /// Clipped region whose contents are shifted by a bound scrollbar.
    ScrollContainer {
        /// Name of the scrollbar driving this container.
        scrollbar: String,
        /// Scroll along X rather than Y.
        horizontal: bool,
        /// Pixels (of imgsize multiples, pre-multiplied) per scrollbar unit.
        factor: f32,
        /// Current content offset in pixels, derived from the scrollbar.
        offset: PxVector,
    },
}

// -------------------------------------------------------------------------------------------------

/// Widget-kind tag recorded in a [`FieldSpec`], determining how the field's
/// value is extracted on submit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum FieldKind {
    /// Plain, image, or item button.
    Button,
    /// Table or textlist.
    Table,
    /// Tab row.
    TabHeader,
    /// Checkbox.
    Checkbox,
    /// Drop-down.
    DropDown,
    /// Scrollbar.
    ScrollBar,
    /// Colored box.
    Box,
    /// Item image.
    ItemImage,
    /// Hypertext region.
    HyperText,
    /// Animated image.
    AnimatedImage,
    /// Anything else (edit boxes, labels, images...).
    Unknown,
}

/// Per-widget metadata recorded during parsing; the whole collection is
/// cleared and rebuilt on every regeneration.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct FieldSpec {
    /// Internal name; empty for non-reporting decorative elements.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Default text/value.
    pub default_value: String,
    /// Small integer id, assigned monotonically from [`FIELD_ID_BASE`].
    pub id: i32,
    /// Widget-kind tag.
    pub kind: FieldKind,
    /// Include this field in submissions.
    pub send: bool,
    /// Activating this field closes the menu.
    pub is_exit: bool,
    /// Legacy z-order priority (formspec version < 3 only).
    pub priority: i8,
    /// Snapshot of the widget's rectangle relative to the form.
    pub rect: PxRect,
    /// Show a pointing-hand cursor when hovering.
    pub pointer_cursor: bool,
    /// Sound effect played on activation.
    pub sound: Option<String>,
    /// The widget this field belongs to.
    pub widget: Option<WidgetId>,
}

impl FieldSpec {
    /// A fresh spec with the given identity and everything else defaulted.
    pub fn new(name: impl Into<String>, label: impl Into<String>, id: i32) -> Self {
        FieldSpec {
            name: name.into(),
            label: label.into(),
            default_value: String::new(),
            id,
            kind: FieldKind::Unknown,
            send: false,
            is_exit: false,
            priority: 0,
            rect: PxRect::zero(),
            pointer_cursor: false,
            sound: None,
            widget: None,
        }
    }
}

/// Draw-order priority for formspec versions below 3, which sorted by element
/// class instead of creation order.
pub(crate) fn legacy_priority(kind: &WidgetKind) -> i8 {
    match kind {
        WidgetKind::Background { fullscreen: true, .. } => -3,
        WidgetKind::Background { .. } => -2,
        WidgetKind::ColorBox { .. } => -1,
        WidgetKind::Image { .. } | WidgetKind::AnimatedImage { .. } => 1,
        WidgetKind::ItemImage { .. } => 2,
        WidgetKind::Button { image: Some(_), .. } | WidgetKind::Button { item: Some(_), .. } => 0,
        WidgetKind::List(_) => 3,
        WidgetKind::Label { .. } => 4,
        _ => 0,
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::{point2, size2};
    use pretty_assertions::assert_eq;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> PxRect {
        PxRect::new(point2(x, y), point2(x + w, y + h))
    }

    #[test]
    fn absolute_rect_accumulates_ancestors_and_scroll() {
        let mut arena = WidgetArena::new(rect(100.0, 50.0, 400.0, 300.0));
        let scroller = arena.insert(
            arena.root(),
            rect(10.0, 20.0, 200.0, 100.0),
            WidgetKind::ScrollContainer {
                scrollbar: "sb".into(),
                horizontal: false,
                factor: 0.1,
                offset: vec2(0.0, -30.0),
            },
            0,
        );
        let child = arena.insert(
            scroller,
            rect(5.0, 5.0, 50.0, 10.0),
            WidgetKind::ColorBox {
                color: "red".into(),
            },
            0,
        );
        assert_eq!(
            arena.absolute_rect(child),
            rect(100.0 + 10.0 + 5.0, 50.0 + 20.0 + 5.0 - 30.0, 50.0, 10.0),
        );
    }

    #[test]
    fn slot_rects_form_a_grid() {
        let spec = ListSpec {
            location: InventoryLocation::CurrentPlayer,
            list: "main".into(),
            cols: 8,
            rows: 4,
            start_index: 0,
            slot_spacing: vec2(60.0, 55.0),
            slot_size: size2(48.0, 48.0),
        };
        assert_eq!(spec.slot_rect(0), rect(0.0, 0.0, 48.0, 48.0));
        assert_eq!(spec.slot_rect(9), rect(60.0, 55.0, 48.0, 48.0));
        assert_eq!(spec.slot_count(), 32);
    }

    #[test]
    fn scrollbar_clamps() {
        let mut sb = ScrollbarState {
            horizontal: false,
            value: 0,
            min: 0,
            max: 100,
            small_step: 10,
            large_step: 100,
            page_size: 10,
            arrows_visible: None,
        };
        assert!(sb.set_value(150));
        assert_eq!(sb.value, 100);
        assert!(!sb.set_value(200));
    }
}
