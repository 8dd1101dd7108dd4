//! Pointer and keyboard handling: widget activation and the inventory
//! drag-and-drop state machine.
//!
//! The "selection" here follows the game convention: picking up items does
//! not move them anywhere. The selected items stay in their slot until a
//! place, drop, or drag completes, and the selection is re-validated against
//! live inventory before every use, so a server-side change can never be
//! overdrawn.

use euclid::{point2, vec2};

use crate::geometry::{PxPoint, PxRect};
use crate::inv::{InventoryAction, InventoryView, SlotRef};
use crate::menu::{Menu, QuitMode};
use crate::widget::{FieldKind, WidgetKind};

// -------------------------------------------------------------------------------------------------

/// A pointer button, wheel ticks included.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum PointerButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Wheel click.
    Middle,
    /// One wheel tick away from the user.
    WheelUp,
    /// One wheel tick toward the user.
    WheelDown,
}

/// One pointer event delivered by the embedder.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum PointerEvent {
    /// The pointer moved to `pos` (absolute screen pixels).
    Moved {
        /// New position.
        pos: PxPoint,
    },
    /// A button went down at `pos`.
    Pressed {
        /// Position.
        pos: PxPoint,
        /// Which button.
        button: PointerButton,
        /// Whether a Shift key was held (inventory quick-transfer).
        shift: bool,
    },
    /// A button came up at `pos`.
    Released {
        /// Position.
        pos: PxPoint,
        /// Which button.
        button: PointerButton,
    },
}

/// Keyboard input the menu reacts to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Key {
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Return.
    Enter,
    /// Escape.
    Escape,
}

/// What the menu did with an event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum Response {
    /// Not for this menu; pass it on.
    Ignored,
    /// Handled; the menu stays open.
    Consumed,
    /// Handled; the embedder should close the menu now.
    Close,
}

/// The picked-up items: a reference into live inventory plus how many of the
/// stack the user is holding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Selection {
    pub(crate) slot: SlotRef,
    pub(crate) amount: u32,
    /// Set once the pointer leaves the source slot with the button held.
    pub(crate) dragging: bool,
}

// -------------------------------------------------------------------------------------------------

impl Menu {
    /// The currently selected slot and amount, if any.
    pub fn selected(&self) -> Option<(SlotRef, u32)> {
        self.selection
            .as_ref()
            .map(|sel| (sel.slot.clone(), sel.amount))
    }

    /// Clamps the selection to what the inventory actually holds right now,
    /// clearing it if the slot vanished or emptied. With nothing selected, a
    /// non-empty craft output becomes the implicit selection.
    pub(crate) fn verify_selection(&mut self, inv: &dyn InventoryView) {
        if let Some(sel) = &mut self.selection {
            match inv.stack(&sel.slot) {
                Some(stack) if !stack.is_empty() => {
                    // Craft output is always carried whole.
                    sel.amount = if sel.slot.list == "craftresult" {
                        stack.count
                    } else {
                        sel.amount.min(stack.count)
                    };
                }
                _ => self.selection = None,
            }
        }
        if self.selection.is_none() {
            self.selection = self.craft_output_selection(inv);
        }
    }

    /// The `craftresult` list backing a displayed `craftpreview`, if it holds
    /// an item.
    fn craft_output_selection(&self, inv: &dyn InventoryView) -> Option<Selection> {
        for id in self.arena.ids() {
            let WidgetKind::List(list) = &self.arena.get(id).kind else {
                continue;
            };
            if list.list != "craftpreview" {
                continue;
            }
            let slot = SlotRef::new(list.location.clone(), "craftresult", 0);
            if let Some(stack) = inv.stack(&slot) {
                if !stack.is_empty() {
                    return Some(Selection {
                        slot,
                        amount: stack.count,
                        dragging: false,
                    });
                }
            }
        }
        None
    }

    /// Shrinks any list widget declared larger than its backing inventory
    /// list, row-wise (degrading to a single partial row).
    pub fn trim_lists(&mut self, inv: &dyn InventoryView) {
        for id in self.arena.ids().collect::<Vec<_>>() {
            let (cols, rows) = {
                let WidgetKind::List(list) = &self.arena.get(id).kind else {
                    continue;
                };
                let Some(len) = inv.list_len(&list.location, &list.list) else {
                    continue;
                };
                if len >= list.slot_count() as usize + list.start_index {
                    continue;
                }
                let available =
                    u32::try_from(len.saturating_sub(list.start_index)).unwrap_or(u32::MAX);
                let cols = list.cols.max(1);
                let rows = available.div_ceil(cols);
                if rows <= 1 {
                    // Keep at least one column so slot geometry stays
                    // well-defined even when no slots remain.
                    (available.max(1), rows)
                } else {
                    (cols, rows)
                }
            };
            let node = self.arena.get_mut(id);
            if let WidgetKind::List(list) = &mut node.kind {
                list.cols = cols;
                list.rows = rows;
                #[allow(clippy::cast_precision_loss)]
                let size = vec2(
                    cols.saturating_sub(1) as f32 * list.slot_spacing.x + list.slot_size.width,
                    rows.saturating_sub(1) as f32 * list.slot_spacing.y + list.slot_size.height,
                );
                node.rect = PxRect::new(node.rect.min, node.rect.min + size);
            }
        }
    }

    /// The inventory slot under `pos`, if the topmost widget there is a list.
    pub fn slot_at(&self, pos: PxPoint, inv: &dyn InventoryView) -> Option<SlotRef> {
        for &id in self.draw_order.iter().rev() {
            let abs = self.arena.absolute_rect(id);
            if !abs.contains(pos) {
                continue;
            }
            let WidgetKind::List(list) = &self.arena.get(id).kind else {
                continue;
            };
            let rel = pos - abs.min.to_vector();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (col, row) = (
                (rel.x / list.slot_spacing.x).floor().max(0.0) as u32,
                (rel.y / list.slot_spacing.y).floor().max(0.0) as u32,
            );
            if col >= list.cols || row >= list.rows {
                continue;
            }
            // Between-slot gaps don't count.
            if !list.slot_rect(row * list.cols + col).contains(point2(rel.x, rel.y)) {
                continue;
            }
            let index = list.start_index + (row * list.cols + col) as usize;
            let slot = SlotRef::new(list.location.clone(), list.list.clone(), index);
            if inv.list_len(&slot.location, &slot.list).is_some_and(|len| index < len) {
                return Some(slot);
            }
        }
        None
    }

    /// Delivers one pointer event.
    pub fn pointer_event(
        &mut self,
        event: PointerEvent,
        inv: &mut dyn InventoryView,
    ) -> Response {
        self.trim_lists(inv);
        match event {
            PointerEvent::Moved { pos } => self.pointer_moved(pos, inv),
            PointerEvent::Pressed { pos, button, shift } => {
                self.pointer_pressed(pos, button, shift, inv)
            }
            PointerEvent::Released { pos, button } => self.pointer_released(pos, button, inv),
        }
    }

    fn pointer_moved(&mut self, pos: PxPoint, inv: &mut dyn InventoryView) -> Response {
        self.hovered = self
            .draw_order
            .iter()
            .rev()
            .copied()
            .find(|&id| self.arena.absolute_rect(id).contains(pos));

        if self.held == Some(PointerButton::Left) {
            self.verify_selection(inv);
            let over = self.slot_at(pos, inv);
            if let Some(sel) = &mut self.selection {
                if over.as_ref().is_some_and(|slot| *slot != sel.slot) {
                    sel.dragging = true;
                }
            }
        }
        if self.rect.contains(pos) {
            Response::Consumed
        } else {
            Response::Ignored
        }
    }

    fn pointer_pressed(
        &mut self,
        pos: PxPoint,
        button: PointerButton,
        shift: bool,
        inv: &mut dyn InventoryView,
    ) -> Response {
        if matches!(
            button,
            PointerButton::Left | PointerButton::Right | PointerButton::Middle
        ) {
            self.held = Some(button);
        }

        if !self.rect.contains(pos) {
            // Clicking past the form drops the selection into the world.
            self.verify_selection(inv);
            if self.selection.is_some() {
                self.drop_selected(button, inv);
                return Response::Consumed;
            }
            return Response::Ignored;
        }

        if let Some(slot) = self.slot_at(pos, inv) {
            self.inventory_click(slot, button, shift, inv);
            return Response::Consumed;
        }

        match button {
            PointerButton::WheelUp | PointerButton::WheelDown => {
                self.wheel_over_widget(pos, button);
            }
            PointerButton::Left => {
                if let Some(index) = self.field_index_at(pos) {
                    match self.fields[index].kind {
                        FieldKind::Button | FieldKind::Checkbox | FieldKind::TabHeader => {
                            self.armed = Some(index);
                        }
                        _ => {}
                    }
                    let field = &self.fields[index];
                    if !field.name.is_empty() {
                        if let Some(WidgetKind::EditBox { .. } | WidgetKind::Table { .. }) =
                            field.widget.map(|w| &self.arena.get(w).kind)
                        {
                            self.focused = Some(field.name.clone());
                        }
                    }
                }
            }
            _ => {}
        }
        Response::Consumed
    }

    fn pointer_released(
        &mut self,
        pos: PxPoint,
        button: PointerButton,
        inv: &mut dyn InventoryView,
    ) -> Response {
        if self.held == Some(button) {
            self.held = None;
        }
        if button != PointerButton::Left {
            return if self.rect.contains(pos) {
                Response::Consumed
            } else {
                Response::Ignored
            };
        }

        // A drag that ends over a different slot moves the whole selection.
        self.verify_selection(inv);
        if let Some(sel) = self.selection.take() {
            if sel.dragging {
                match self.slot_at(pos, inv) {
                    Some(target) if target != sel.slot => {
                        inv.issue(InventoryAction::Move {
                            count: sel.amount,
                            from: sel.slot,
                            to: target,
                            move_somewhere: false,
                        });
                    }
                    _ => {
                        self.selection = Some(Selection {
                            dragging: false,
                            ..sel
                        });
                    }
                }
                return Response::Consumed;
            }
            self.selection = Some(sel);
        }

        if let Some(index) = self.armed.take() {
            if self.field_index_at(pos) == Some(index) {
                return self.activate_field(index, pos);
            }
        }
        if self.rect.contains(pos) {
            Response::Consumed
        } else {
            Response::Ignored
        }
    }

    fn wheel_over_widget(&mut self, pos: PxPoint, button: PointerButton) {
        let Some(index) = self.field_index_at(pos) else {
            return;
        };
        if self.fields[index].kind != FieldKind::ScrollBar {
            return;
        }
        let name = self.fields[index].name.clone();
        let Some(widget) = self.fields[index].widget else {
            return;
        };
        let WidgetKind::Scrollbar(sb) = &self.arena.get(widget).kind else {
            return;
        };
        let step = if button == PointerButton::WheelUp {
            -sb.small_step
        } else {
            sb.small_step
        };
        let value = sb.value + step;
        self.set_scrollbar(&name, value);
    }

    /// A press-and-release on one interactive widget.
    fn activate_field(&mut self, index: usize, pos: PxPoint) -> Response {
        let Some(widget) = self.fields[index].widget else {
            return Response::Consumed;
        };
        match self.fields[index].kind {
            FieldKind::Button => {
                self.play_field_sound(index);
                self.pending.clicked = Some(index);
                if self.fields[index].is_exit && self.allow_close() {
                    self.accept_input(QuitMode::Accept);
                    Response::Close
                } else {
                    self.accept_input(QuitMode::No);
                    Response::Consumed
                }
            }
            FieldKind::Checkbox => {
                if let WidgetKind::Checkbox { checked } = &mut self.arena.get_mut(widget).kind {
                    *checked = !*checked;
                }
                self.play_field_sound(index);
                self.pending.clicked = Some(index);
                self.accept_input(QuitMode::No);
                Response::Consumed
            }
            FieldKind::TabHeader => {
                let tab_count = match &self.arena.get(widget).kind {
                    WidgetKind::TabHeader { captions, .. } => captions.len(),
                    _ => return Response::Consumed,
                };
                if tab_count == 0 {
                    return Response::Consumed;
                }
                let abs = self.arena.absolute_rect(widget);
                #[allow(clippy::cast_precision_loss)]
                let tab_width = abs.width() / tab_count as f32;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let tab = (((pos.x - abs.min.x) / tab_width).floor().max(0.0)) as usize;
                let name = self.fields[index].name.clone();
                self.play_field_sound(index);
                self.select_tab(&name, tab.min(tab_count - 1));
                Response::Consumed
            }
            _ => Response::Consumed,
        }
    }

    // --- The inventory click decision table ------------------------------------------------------

    fn inventory_click(
        &mut self,
        slot: SlotRef,
        button: PointerButton,
        shift: bool,
        inv: &mut dyn InventoryView,
    ) {
        self.verify_selection(inv);
        let clicked = inv.stack(&slot);
        let clicked_count = clicked.as_ref().map_or(0, |s| s.count);

        if shift {
            self.ring_transfer(&slot, button, clicked_count, inv);
            return;
        }

        // Clicking the craft preview requests a craft, but only while the
        // hand is free (the craft output counts as free).
        if slot.list == "craftpreview" {
            if self
                .selection
                .as_ref()
                .is_none_or(|sel| sel.slot.list == "craftresult")
            {
                let count = if button == PointerButton::Middle { 10 } else { 1 };
                inv.issue(InventoryAction::Craft {
                    count,
                    location: slot.location,
                });
            }
            return;
        }

        match self.selection.take() {
            None => {
                if clicked_count == 0 {
                    return;
                }
                let amount = match button {
                    PointerButton::Left => clicked_count,
                    PointerButton::Right => (clicked_count + 1) / 2,
                    PointerButton::Middle => clicked_count.min(10),
                    PointerButton::WheelDown => 1,
                    PointerButton::WheelUp => 0,
                };
                if amount > 0 {
                    self.selection = Some(Selection {
                        slot,
                        amount,
                        dragging: false,
                    });
                }
            }
            Some(mut sel) if sel.slot == slot => {
                // Clicking the source slot again.
                match button {
                    PointerButton::WheelDown => {
                        sel.amount = (sel.amount + 1).min(clicked_count);
                        self.selection = Some(sel);
                    }
                    PointerButton::WheelUp => {
                        sel.amount = sel.amount.saturating_sub(1);
                        if sel.amount > 0 {
                            self.selection = Some(sel);
                        }
                    }
                    // Putting the items back is a no-op; just deselect.
                    PointerButton::Left | PointerButton::Right | PointerButton::Middle => {}
                }
            }
            Some(mut sel) => {
                let wanted = match button {
                    PointerButton::Left => sel.amount,
                    PointerButton::Right | PointerButton::WheelUp => 1,
                    PointerButton::Middle => sel.amount.min(10),
                    PointerButton::WheelDown => 0,
                };
                if wanted == 0 {
                    self.selection = Some(sel);
                    return;
                }
                let Some(source) = inv.stack(&sel.slot) else {
                    return;
                };
                let room = clicked.as_ref().map_or(0, |target| target.room_for(&source));
                let moved = wanted.min(room).min(sel.amount);
                if moved == 0 {
                    // Different item with no room; keep holding.
                    self.selection = Some(sel);
                    return;
                }
                inv.issue(InventoryAction::Move {
                    count: moved,
                    from: sel.slot.clone(),
                    to: slot,
                    move_somewhere: false,
                });
                sel.amount -= moved;
                if sel.amount > 0 {
                    self.selection = Some(sel);
                }
            }
        }
    }

    /// Shift-click: send the stack along the list ring to the next list.
    fn ring_transfer(
        &mut self,
        slot: &SlotRef,
        button: PointerButton,
        clicked_count: u32,
        inv: &mut dyn InventoryView,
    ) {
        if clicked_count == 0 {
            return;
        }
        let count = match button {
            PointerButton::Left => clicked_count,
            PointerButton::Right => 1,
            _ => return,
        };
        let Some(position) = self
            .listring
            .iter()
            .position(|(loc, list)| *loc == slot.location && *list == slot.list)
        else {
            return;
        };
        let (to_location, to_list) = self.listring[(position + 1) % self.listring.len()].clone();
        if to_location == slot.location && to_list == slot.list {
            return;
        }
        inv.issue(InventoryAction::Move {
            count,
            from: slot.clone(),
            to: SlotRef::new(to_location, to_list, 0),
            move_somewhere: true,
        });
    }

    fn drop_selected(&mut self, button: PointerButton, inv: &mut dyn InventoryView) {
        let Some(mut sel) = self.selection.take() else {
            return;
        };
        let count = match button {
            PointerButton::Left => sel.amount,
            PointerButton::Right => 1,
            PointerButton::Middle => sel.amount.min(10),
            PointerButton::WheelUp | PointerButton::WheelDown => {
                self.selection = Some(sel);
                return;
            }
        };
        inv.issue(InventoryAction::Drop {
            count,
            from: sel.slot.clone(),
        });
        sel.amount = sel.amount.saturating_sub(count);
        if sel.amount > 0 {
            self.selection = Some(sel);
        }
    }

    // --- Keyboard --------------------------------------------------------------------------------

    /// Delivers one key press.
    pub fn key_event(&mut self, key: Key) -> Response {
        match key {
            Key::Escape => {
                if self.allow_close() {
                    self.accept_input(QuitMode::Cancel);
                    Response::Close
                } else {
                    self.pending.key_escape = true;
                    self.accept_input(QuitMode::No);
                    Response::Consumed
                }
            }
            Key::Enter => {
                self.pending.key_enter = true;
                let focused_editbox = self.focused.clone().filter(|name| {
                    self.field(name)
                        .and_then(|f| f.widget)
                        .is_some_and(|w| {
                            matches!(self.arena.get(w).kind, WidgetKind::EditBox { .. })
                        })
                });
                let closes = match &focused_editbox {
                    Some(name) => !self.no_close_on_enter.contains(name),
                    None => false,
                };
                self.pending.enter_field = focused_editbox;
                if closes && self.allow_close() {
                    self.accept_input(QuitMode::Accept);
                    Response::Close
                } else {
                    self.accept_input(QuitMode::No);
                    Response::Consumed
                }
            }
            Key::Up => {
                self.pending.key_up = true;
                self.accept_input(QuitMode::No);
                Response::Consumed
            }
            Key::Down => {
                self.pending.key_down = true;
                self.accept_input(QuitMode::No);
                Response::Consumed
            }
        }
    }
}
