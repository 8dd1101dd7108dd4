//! The menu object: owns one form's parsed state and drives regeneration.

use std::collections::{BTreeMap, HashMap, HashSet};

use euclid::{point2, size2, vec2};

use crate::dsl;
use crate::geometry::{
    DisplayMetrics, GuSize, LayoutScale, PxPoint, PxRect, PxSize, anchored_rect,
};
use crate::inv::InventoryLocation;
use crate::parse::ParserContext;
use crate::style::Theme;
use crate::widget::{
    FieldKind, FieldSpec, PROCEED_ID, TableState, WidgetArena, WidgetId, WidgetKind,
    legacy_priority,
};

// -------------------------------------------------------------------------------------------------

/// Supplies the current form text (and the server-wide prepend) on demand.
///
/// The menu pulls from this on every [`Menu::regenerate`], so a source backed
/// by live game state needs no push-style notification channel.
pub trait FormSource {
    /// The formspec text for this menu.
    fn form(&self) -> String;

    /// Formspec text parsed before the form proper, unless the form opts out
    /// with `no_prepend[]`. Always laid out in legacy grid coordinates.
    fn prepend(&self) -> String {
        String::new()
    }
}

/// A [`FormSource`] holding fixed strings.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct StaticFormSource {
    /// The form text.
    pub form: String,
    /// The prepend text.
    pub prepend: String,
}

impl StaticFormSource {
    /// Wraps a form string with no prepend.
    pub fn new(form: impl Into<String>) -> Self {
        StaticFormSource {
            form: form.into(),
            prepend: String::new(),
        }
    }
}

impl FormSource for StaticFormSource {
    fn form(&self) -> String {
        self.form.clone()
    }
    fn prepend(&self) -> String {
        self.prepend.clone()
    }
}

/// Receives field-map submissions (the `fields` table handed to the game
/// logic).
pub trait TextDest {
    /// Called with the collected fields whenever the menu submits, whether
    /// for a dynamic event or on quit.
    fn submit(&mut self, fields: &BTreeMap<String, String>);
}

/// Opaque handle to a texture resolved by the embedder.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct TextureRef(pub u64);

/// Resolves texture names appearing in the form to renderer handles.
pub trait TextureSource {
    /// The texture for `name`, or `None` if it does not exist.
    fn texture(&mut self, name: &str) -> Option<TextureRef>;
}

/// Plays interface sound effects named by `style[]` sound properties.
pub trait SoundPlayer {
    /// Fire-and-forget playback.
    fn play(&mut self, name: &str);
}

/// The silent sound player.
impl SoundPlayer for () {
    fn play(&mut self, _name: &str) {}
}

// -------------------------------------------------------------------------------------------------

/// How a submission relates to the menu's lifetime.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum QuitMode {
    /// A dynamic event; the menu stays open.
    No,
    /// The user accepted the form; all fields are sent with `quit` = `true`.
    Accept,
    /// The user dismissed the form; only `quit` = `true` is sent.
    Cancel,
}

/// Host-side configuration that is fixed for the menu's lifetime.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct MenuSettings {
    /// Display characteristics used for size fitting.
    pub metrics: DisplayMetrics,
    /// Whether the user may close the menu (Escape / exit buttons).
    pub allow_close: bool,
    /// The inventory that `list[context;...]` refers to, when the menu was
    /// opened for a particular node or detached inventory.
    pub context_inventory: Option<InventoryLocation>,
}

impl Default for MenuSettings {
    fn default() -> Self {
        MenuSettings {
            metrics: DisplayMetrics::default(),
            allow_close: true,
            context_inventory: None,
        }
    }
}

/// Colors the form sets for its own chrome, as uninterpreted color strings.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct MenuColors {
    /// Form background color (`bgcolor[]` first argument).
    pub bgcolor: String,
    /// Color behind the whole screen while the menu is open.
    pub fullscreen_bgcolor: String,
    /// Whether the fullscreen background is drawn.
    pub fullscreen: bool,
    /// `listcolors[]` slot background, normal state.
    pub slot_bg_normal: Option<String>,
    /// `listcolors[]` slot background, hovered state.
    pub slot_bg_hover: Option<String>,
    /// `listcolors[]` slot border.
    pub slot_border: Option<String>,
    /// `listcolors[]`/`tooltip[]` tooltip background.
    pub tooltip_bgcolor: Option<String>,
    /// `listcolors[]`/`tooltip[]` tooltip text color.
    pub tooltip_fontcolor: Option<String>,
}

impl Default for MenuColors {
    fn default() -> Self {
        MenuColors {
            bgcolor: "#0000008C".to_owned(),
            fullscreen_bgcolor: "#0000008C".to_owned(),
            fullscreen: false,
            slot_bg_normal: None,
            slot_bg_hover: None,
            slot_border: None,
            tooltip_bgcolor: None,
            tooltip_fontcolor: None,
        }
    }
}

/// One `tooltip[]` declaration.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TooltipSpec {
    pub(crate) target: TooltipTarget,
    pub(crate) text: String,
    pub(crate) bgcolor: Option<String>,
    pub(crate) fontcolor: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TooltipTarget {
    /// Attached to every field with this name.
    Field(String),
    /// Attached to a fixed region of the form.
    Rect(PxRect),
}

/// Input not yet delivered to the text destination: reserved-key flags and
/// which widgets changed since the last submission.
#[derive(Debug, Default)]
pub(crate) struct PendingInput {
    pub(crate) key_up: bool,
    pub(crate) key_down: bool,
    pub(crate) key_enter: bool,
    pub(crate) key_escape: bool,
    pub(crate) enter_field: Option<String>,
    /// Index of the button field being submitted, if any.
    pub(crate) clicked: Option<usize>,
    /// Scrollbars moved by the user (submit `CHG:` instead of `VAL:`).
    pub(crate) scrollbars: HashSet<String>,
}

impl PendingInput {
    fn clear(&mut self) {
        *self = PendingInput::default();
    }
}

/// Per-widget interactive state carried over a regeneration, keyed by field
/// name.
#[derive(Clone, Debug)]
enum Retained {
    Text(String),
    Table(TableState),
    Scroll(i32),
}

// -------------------------------------------------------------------------------------------------

/// A form menu: the parsed widget tree, the style tables, the interaction
/// state, and the collaborator handles, all together.
///
/// Construction is cheap; nothing is parsed until the first
/// [`regenerate()`](Self::regenerate).
pub struct Menu {
    source: Box<dyn FormSource>,
    text_dst: Box<dyn TextDest>,
    sound: Box<dyn SoundPlayer>,
    textures: Option<Box<dyn TextureSource>>,
    pub(crate) settings: MenuSettings,

    pub(crate) screen: PxSize,
    pub(crate) version: u16,
    pub(crate) scale: LayoutScale,
    pub(crate) rect: PxRect,
    pub(crate) arena: WidgetArena,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) theme: Theme,
    pub(crate) draw_order: Vec<WidgetId>,
    pub(crate) colors: MenuColors,
    pub(crate) tooltips: Vec<TooltipSpec>,
    pub(crate) listring: Vec<(InventoryLocation, String)>,
    pub(crate) focused: Option<String>,
    /// Fields whose `field_close_on_enter[]` was set to false.
    pub(crate) no_close_on_enter: HashSet<String>,
    pub(crate) pending: PendingInput,
    pub(crate) selection: Option<crate::interaction::Selection>,
    /// Field index of the button currently held down.
    pub(crate) armed: Option<usize>,
    /// Topmost widget under the pointer.
    pub(crate) hovered: Option<WidgetId>,
    /// Pointer button currently held, for drag detection.
    pub(crate) held: Option<crate::interaction::PointerButton>,
}

impl Menu {
    /// Creates a menu over the given form source and submission sink.
    pub fn new(
        source: Box<dyn FormSource>,
        text_dst: Box<dyn TextDest>,
        settings: MenuSettings,
    ) -> Self {
        Menu {
            source,
            text_dst,
            sound: Box::new(()),
            textures: None,
            settings,
            screen: PxSize::zero(),
            version: 1,
            scale: LayoutScale::from_imgsize(48.0),
            rect: PxRect::zero(),
            arena: WidgetArena::new(PxRect::zero()),
            fields: Vec::new(),
            theme: Theme::default(),
            draw_order: Vec::new(),
            colors: MenuColors::default(),
            tooltips: Vec::new(),
            listring: Vec::new(),
            focused: None,
            no_close_on_enter: HashSet::new(),
            pending: PendingInput::default(),
            selection: None,
            armed: None,
            hovered: None,
            held: None,
        }
    }

    /// Installs a sound player (the default is silent).
    pub fn set_sound_player(&mut self, sound: Box<dyn SoundPlayer>) {
        self.sound = sound;
    }

    /// Installs a texture source. Without one, textures are not validated.
    pub fn set_texture_source(&mut self, textures: Box<dyn TextureSource>) {
        self.textures = Some(textures);
    }

    // --- Inspection ------------------------------------------------------------------------------

    /// The menu rectangle on screen, as of the last regeneration.
    pub fn rect(&self) -> PxRect {
        self.rect
    }

    /// The pixel metrics of the last regeneration.
    pub fn scale(&self) -> &LayoutScale {
        &self.scale
    }

    /// The declared formspec language version (1 if undeclared).
    pub fn version(&self) -> u16 {
        self.version
    }

    /// The widget tree.
    pub fn arena(&self) -> &WidgetArena {
        &self.arena
    }

    /// All field specs in creation order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// The field with the given name, if any.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Widget handles in the order they should be drawn, back to front.
    pub fn draw_order(&self) -> &[WidgetId] {
        &self.draw_order
    }

    /// Chrome colors set by the form.
    pub fn colors(&self) -> &MenuColors {
        &self.colors
    }

    /// Name of the focused field, if any.
    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Whether the user may close this menu.
    pub fn allow_close(&self) -> bool {
        self.settings.allow_close
    }

    /// The tooltip text applicable at `pos`, if any. Field tooltips win over
    /// region tooltips; among each, the last declared wins.
    pub fn tooltip_at(&self, pos: PxPoint) -> Option<&str> {
        let field_name = self
            .field_index_at(pos)
            .map(|i| self.fields[i].name.as_str())
            .filter(|name| !name.is_empty());
        let mut hit = None;
        for tip in &self.tooltips {
            if let TooltipTarget::Field(name) = &tip.target {
                if Some(name.as_str()) == field_name {
                    hit = Some(tip.text.as_str());
                }
            }
        }
        if hit.is_some() {
            return hit;
        }
        for tip in &self.tooltips {
            if let TooltipTarget::Rect(rect) = &tip.target {
                if rect.translate(self.rect.min.to_vector()).contains(pos) {
                    hit = Some(tip.text.as_str());
                }
            }
        }
        hit
    }

    /// Resolves a texture name through the installed texture source.
    pub fn texture_for(&mut self, name: &str) -> Option<TextureRef> {
        self.textures.as_mut()?.texture(name)
    }

    pub(crate) fn textures_mut(&mut self) -> Option<&mut (dyn TextureSource + 'static)> {
        self.textures.as_deref_mut()
    }

    // --- Regeneration ----------------------------------------------------------------------------

    /// Discards and rebuilds everything from the form source.
    ///
    /// Interactive state that survives: the focused field (by name), table
    /// selections and scroll positions, scrollbar values, and edit box text,
    /// each matched by field name. The inventory item selection survives as
    /// well; it is re-validated against live inventory on the next event.
    pub fn regenerate(&mut self, screen: PxSize) {
        let form = self.source.form();
        let prepend = self.source.prepend();
        let retained = self.collect_retained();
        let old_focus = self.focused.take();

        self.screen = screen;
        self.version = 1;
        self.arena = WidgetArena::new(PxRect::zero());
        self.fields.clear();
        self.theme.clear();
        self.draw_order.clear();
        self.colors = MenuColors::default();
        self.tooltips.clear();
        self.listring.clear();
        self.no_close_on_enter.clear();
        self.armed = None;
        self.hovered = None;

        let elements = dsl::split_elements(&form);
        let prologue = self.scan_prologue(&elements);

        // Fit the layout scale and place the menu rectangle.
        if prologue.explicit_size {
            self.scale = LayoutScale::fit(
                screen,
                prologue.invsize,
                prologue.fixed_size,
                &self.settings.metrics,
            );
            let size = self.form_pixel_size(prologue.invsize, prologue.real_coordinates);
            self.rect = anchored_rect(screen, size, prologue.position, prologue.anchor, vec2(0.0, 0.0));
        } else {
            // A sizeless form gets the fixed-base-resolution scale and a
            // modest centered window sized for stacked text fields.
            self.scale = LayoutScale::fit(
                screen,
                size2(8.0, 9.0),
                true,
                &self.settings.metrics,
            );
            let s = self.settings.metrics.gui_scaling;
            let size = size2(580.0 * s, 300.0 * s);
            self.rect = anchored_rect(screen, size, prologue.position, prologue.anchor, vec2(0.0, 0.0));
        }
        self.arena = WidgetArena::new(self.rect);
        self.version = prologue.version;

        let mut ctx = ParserContext::new(
            prologue.version,
            prologue.real_coordinates,
            prologue.explicit_size,
            self.arena.root(),
        );

        // The prepend is parsed first, always in legacy grid coordinates.
        if !prologue.no_prepend && !prepend.is_empty() {
            ctx.real_coordinates = false;
            for raw in dsl::split_elements(&prepend) {
                self.run_element(&mut ctx, raw);
            }
            ctx.close_segment("prepend");
            ctx.real_coordinates = prologue.real_coordinates;
        }

        for raw in &elements[prologue.consumed..] {
            self.run_element(&mut ctx, raw);
        }
        ctx.close_segment("form");

        if !ctx.explicit_size && ctx.simple_fields > 0 {
            self.append_proceed_button();
        }

        let requested_focus = ctx.requested_focus.take();
        self.apply_retained(retained);
        self.update_scroll_containers();
        self.compute_draw_order();
        self.restore_focus(old_focus, requested_focus);
    }

    /// Total form size in pixels for an explicit `size[]`.
    fn form_pixel_size(&self, invsize: GuSize, real_coordinates: bool) -> PxSize {
        let scale = &self.scale;
        if real_coordinates {
            size2(scale.imgsize * invsize.width, scale.imgsize * invsize.height)
        } else {
            size2(
                scale.padding.x * 2.0 + scale.spacing.x * (invsize.width - 1.0) + scale.imgsize,
                scale.padding.y * 2.0
                    + scale.spacing.y * (invsize.height - 1.0)
                    + scale.imgsize
                    + scale.button_height * 2.0 / 3.0,
            )
        }
    }

    /// Appends the implicit "Proceed" button that closes a sizeless
    /// fields-only form.
    fn append_proceed_button(&mut self) {
        let size = self.rect.size();
        let h = self.scale.button_height;
        let min = point2(size.width / 2.0 - 70.0, size.height - h * 3.0);
        let rect = PxRect::new(min, min + vec2(140.0, h * 2.0));
        let widget = self.arena.insert(
            self.arena.root(),
            rect,
            WidgetKind::Button {
                label: "Proceed".to_owned(),
                exit: true,
                image: None,
                item: None,
            },
            PROCEED_ID,
        );
        let mut spec = FieldSpec::new("", "Proceed", PROCEED_ID);
        spec.kind = FieldKind::Button;
        spec.is_exit = true;
        spec.rect = rect;
        spec.pointer_cursor = true;
        spec.widget = Some(widget);
        self.fields.push(spec);
    }

    fn collect_retained(&self) -> HashMap<String, Retained> {
        let mut out = HashMap::new();
        for field in &self.fields {
            if field.name.is_empty() {
                continue;
            }
            let Some(widget) = field.widget else { continue };
            let retained = match &self.arena.get(widget).kind {
                WidgetKind::EditBox { text, .. } => Retained::Text(text.clone()),
                WidgetKind::Table { state, .. } => Retained::Table(state.clone()),
                WidgetKind::Scrollbar(sb) => Retained::Scroll(sb.value),
                _ => continue,
            };
            out.insert(field.name.clone(), retained);
        }
        out
    }

    fn apply_retained(&mut self, retained: HashMap<String, Retained>) {
        for i in 0..self.fields.len() {
            let Some(kept) = retained.get(&self.fields[i].name) else {
                continue;
            };
            let Some(widget) = self.fields[i].widget else {
                continue;
            };
            match (kept, &mut self.arena.get_mut(widget).kind) {
                (Retained::Text(text), WidgetKind::EditBox { text: t, .. }) => {
                    t.clone_from(text);
                }
                (Retained::Table(state), WidgetKind::Table { state: s, rows, .. }) => {
                    let mut state = state.clone();
                    if state.selected.is_some_and(|sel| sel >= *rows) {
                        state.selected = None;
                    }
                    *s = state;
                }
                (Retained::Scroll(value), WidgetKind::Scrollbar(sb)) => {
                    sb.set_value(*value);
                }
                _ => {}
            }
        }
    }

    /// Repositions every scroll container's contents from its bound
    /// scrollbar's current value.
    pub(crate) fn update_scroll_containers(&mut self) {
        let mut values: HashMap<String, i32> = HashMap::new();
        for field in &self.fields {
            if let Some(w) = field.widget {
                if let WidgetKind::Scrollbar(sb) = &self.arena.get(w).kind {
                    values.insert(field.name.clone(), sb.value);
                }
            }
        }
        let imgsize = self.scale.imgsize;
        for id in self.arena.ids().collect::<Vec<_>>() {
            let node = self.arena.get_mut(id);
            if let WidgetKind::ScrollContainer {
                scrollbar,
                horizontal,
                factor,
                offset,
            } = &mut node.kind
            {
                let value = values.get(scrollbar.as_str()).copied().unwrap_or(0);
                #[allow(clippy::cast_precision_loss)]
                let shift = -(value as f32) * *factor * imgsize;
                *offset = if *horizontal {
                    vec2(shift, 0.0)
                } else {
                    vec2(0.0, shift)
                };
            }
        }
    }

    fn compute_draw_order(&mut self) {
        let mut order: Vec<WidgetId> = self
            .arena
            .ids()
            .filter(|&id| id != self.arena.root())
            .collect();
        if self.version < 3 {
            // Old forms drew by element class, not declaration order.
            order.sort_by_key(|&id| legacy_priority(&self.arena.get(id).kind));
        }
        self.draw_order = order;
    }

    // --- Focus -----------------------------------------------------------------------------------

    /// Moves focus to the named field, if it exists.
    pub fn set_focus(&mut self, name: &str) -> bool {
        if self.fields.iter().any(|f| f.name == name) {
            self.focused = Some(name.to_owned());
            true
        } else {
            false
        }
    }

    fn restore_focus(&mut self, old: Option<String>, requested: Option<(String, bool)>) {
        if let Some((name, force)) = requested {
            if force || old.is_none() {
                if self.set_focus(&name) {
                    return;
                }
            }
        }
        if let Some(name) = old {
            if self.set_focus(&name) {
                return;
            }
        }
        self.focused = self.initial_focus();
    }

    /// Default focus, in decreasing precedence: first empty edit box, first
    /// edit box, first table, last button, first focusable element that is
    /// neither a label nor a tab header, first element.
    fn initial_focus(&self) -> Option<String> {
        let kind_of = |f: &FieldSpec| f.widget.map(|w| &self.arena.get(w).kind);
        let named = |f: &FieldSpec| (!f.name.is_empty()).then(|| f.name.clone());

        for f in &self.fields {
            if let Some(WidgetKind::EditBox { text, .. }) = kind_of(f) {
                if text.is_empty() {
                    return named(f);
                }
            }
        }
        for f in &self.fields {
            if matches!(kind_of(f), Some(WidgetKind::EditBox { .. })) {
                return named(f);
            }
        }
        for f in &self.fields {
            if f.kind == FieldKind::Table {
                return named(f);
            }
        }
        if let Some(f) = self
            .fields
            .iter()
            .rev()
            .find(|f| f.kind == FieldKind::Button)
        {
            return named(f);
        }
        for f in &self.fields {
            let skip = matches!(
                kind_of(f),
                Some(WidgetKind::Label { .. } | WidgetKind::TabHeader { .. })
            );
            if !skip && !f.name.is_empty() {
                return named(f);
            }
        }
        self.fields.first().and_then(named)
    }

    // --- Submission ------------------------------------------------------------------------------

    /// Submits the current field values.
    ///
    /// `Cancel` sends only `quit` = `true`; the other modes send every
    /// value-carrying field plus any pending reserved keys, and `Accept`
    /// adds `quit` = `true`.
    pub fn accept_input(&mut self, mode: QuitMode) {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        if mode == QuitMode::Cancel {
            map.insert("quit".to_owned(), "true".to_owned());
            self.text_dst.submit(&map);
            self.pending.clear();
            return;
        }

        if self.pending.key_up {
            map.insert("key_up".to_owned(), "true".to_owned());
        }
        if self.pending.key_down {
            map.insert("key_down".to_owned(), "true".to_owned());
        }
        if self.pending.key_enter {
            map.insert("key_enter".to_owned(), "true".to_owned());
        }
        if self.pending.key_escape {
            map.insert("key_escape".to_owned(), "true".to_owned());
        }
        if let Some(name) = &self.pending.enter_field {
            map.insert("key_enter_field".to_owned(), name.clone());
        }

        for i in 0..self.fields.len() {
            let field = &self.fields[i];
            if field.name.is_empty() {
                continue;
            }
            if !(field.send || self.pending.clicked == Some(i)) {
                continue;
            }
            if let Some(value) = self.field_value_by_index(i) {
                map.insert(self.fields[i].name.clone(), value);
            }
        }

        if mode == QuitMode::Accept {
            map.insert("quit".to_owned(), "true".to_owned());
        }
        self.text_dst.submit(&map);
        self.pending.clear();
    }

    /// The value the named field would submit right now.
    pub fn field_value(&self, name: &str) -> Option<String> {
        let index = self.fields.iter().position(|f| f.name == name)?;
        self.field_value_by_index(index)
    }

    fn field_value_by_index(&self, index: usize) -> Option<String> {
        let field = &self.fields[index];
        let kind = field.widget.map(|w| &self.arena.get(w).kind);
        match kind {
            Some(WidgetKind::Button { label, .. }) => Some(label.clone()),
            Some(WidgetKind::Checkbox { checked }) => {
                Some(if *checked { "true" } else { "false" }.to_owned())
            }
            Some(WidgetKind::EditBox { text, .. }) => Some(text.clone()),
            Some(WidgetKind::Dropdown {
                items,
                selected,
                index_event,
            }) => {
                if *index_event {
                    Some(selected.map_or(0, |s| s + 1).to_string())
                } else {
                    selected.and_then(|s| items.get(s).cloned()).or_else(|| Some(String::new()))
                }
            }
            Some(WidgetKind::Scrollbar(sb)) => {
                let tag = if self.pending.scrollbars.contains(&field.name) {
                    "CHG"
                } else {
                    "VAL"
                };
                Some(format!("{tag}:{}", sb.value))
            }
            Some(WidgetKind::Table { state, .. }) => Some(match state.selected {
                Some(row) => format!("CHG:{}", row + 1),
                None => "INV".to_owned(),
            }),
            Some(WidgetKind::TabHeader { active, .. }) => Some((active + 1).to_string()),
            Some(WidgetKind::AnimatedImage { frame, .. }) => Some((frame + 1).to_string()),
            _ => {
                if field.default_value.is_empty() {
                    None
                } else {
                    Some(field.default_value.clone())
                }
            }
        }
    }

    // --- Widget state APIs (the embedder's event plumbing) ---------------------------------------

    /// Replaces the text of a named edit box (as the user types).
    pub fn set_field_text(&mut self, name: &str, new_text: &str) -> bool {
        let Some(widget) = self.field(name).and_then(|f| f.widget) else {
            return false;
        };
        if let WidgetKind::EditBox { text, .. } = &mut self.arena.get_mut(widget).kind {
            new_text.clone_into(text);
            true
        } else {
            false
        }
    }

    /// Moves a scrollbar, shifts any bound scroll containers, and submits a
    /// `CHG:` event. Returns `false` for an unknown scrollbar.
    pub fn set_scrollbar(&mut self, name: &str, value: i32) -> bool {
        let Some(widget) = self.field(name).and_then(|f| f.widget) else {
            return false;
        };
        let WidgetKind::Scrollbar(sb) = &mut self.arena.get_mut(widget).kind else {
            return false;
        };
        if !sb.set_value(value) {
            return true;
        }
        self.pending.scrollbars.insert(name.to_owned());
        self.update_scroll_containers();
        self.accept_input(QuitMode::No);
        true
    }

    /// Selects a dropdown entry (1-based, 0 clears) and submits.
    pub fn select_dropdown(&mut self, name: &str, index: usize) -> bool {
        let Some(field_index) = self.fields.iter().position(|f| f.name == name) else {
            return false;
        };
        let Some(widget) = self.fields[field_index].widget else {
            return false;
        };
        let WidgetKind::Dropdown {
            items, selected, ..
        } = &mut self.arena.get_mut(widget).kind
        else {
            return false;
        };
        *selected = index.checked_sub(1).filter(|&i| i < items.len());
        self.pending.clicked = Some(field_index);
        self.accept_input(QuitMode::No);
        true
    }

    /// Selects (or clears, with `None`) a table row and submits the change.
    pub fn select_table_row(&mut self, name: &str, row: Option<usize>) -> bool {
        let Some(widget) = self.field(name).and_then(|f| f.widget) else {
            return false;
        };
        let WidgetKind::Table { state, rows, .. } = &mut self.arena.get_mut(widget).kind else {
            return false;
        };
        state.selected = row.filter(|&r| r < *rows);
        self.accept_input(QuitMode::No);
        true
    }

    /// Switches a tab header to the given tab (0-based) and submits.
    pub fn select_tab(&mut self, name: &str, tab: usize) -> bool {
        let Some(field_index) = self.fields.iter().position(|f| f.name == name) else {
            return false;
        };
        let Some(widget) = self.fields[field_index].widget else {
            return false;
        };
        let WidgetKind::TabHeader {
            captions, active, ..
        } = &mut self.arena.get_mut(widget).kind
        else {
            return false;
        };
        if tab >= captions.len() {
            return false;
        }
        *active = tab;
        self.pending.clicked = Some(field_index);
        self.accept_input(QuitMode::No);
        true
    }

    /// Advances animated images by `dt_ms` milliseconds.
    pub fn animate(&mut self, dt_ms: u32) {
        for id in self.arena.ids().collect::<Vec<_>>() {
            if let WidgetKind::AnimatedImage {
                frame_count,
                frame_duration_ms,
                frame,
                elapsed_ms,
                ..
            } = &mut self.arena.get_mut(id).kind
            {
                if *frame_duration_ms == 0 || *frame_count == 0 {
                    continue;
                }
                *elapsed_ms += dt_ms;
                let steps = *elapsed_ms / *frame_duration_ms;
                *elapsed_ms %= *frame_duration_ms;
                *frame = (*frame + steps) % *frame_count;
            }
        }
    }

    pub(crate) fn play_field_sound(&mut self, field_index: usize) {
        if let Some(sound) = self.fields[field_index].sound.clone() {
            if !sound.is_empty() {
                self.sound.play(&sound);
            }
        }
    }

    /// Topmost field whose rectangle contains `pos`, as an index into
    /// [`fields()`](Self::fields).
    pub(crate) fn field_index_at(&self, pos: PxPoint) -> Option<usize> {
        for &id in self.draw_order.iter().rev() {
            if !self.arena.absolute_rect(id).contains(pos) {
                continue;
            }
            if let Some(i) = self.fields.iter().position(|f| f.widget == Some(id)) {
                return Some(i);
            }
        }
        None
    }
}

impl std::fmt::Debug for Menu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Menu")
            .field("version", &self.version)
            .field("rect", &self.rect)
            .field("widgets", &self.arena.len())
            .field("fields", &self.fields.len())
            .field("focused", &self.focused)
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------

/// The prologue directives scanned before any layout happens.
pub(crate) struct Prologue {
    pub(crate) version: u16,
    pub(crate) explicit_size: bool,
    pub(crate) fixed_size: bool,
    pub(crate) invsize: GuSize,
    pub(crate) real_coordinates: bool,
    pub(crate) no_prepend: bool,
    pub(crate) position: euclid::default::Vector2D<f32>,
    pub(crate) anchor: euclid::default::Vector2D<f32>,
    /// Number of leading elements consumed by the scan.
    pub(crate) consumed: usize,
}

impl Menu {
    /// Reads the leading directives: an optional `formspec_version[]` first,
    /// then `size`, `position`, `anchor`, `padding`, `no_prepend`, and
    /// `real_coordinates`, in that relative order. Each directive may repeat,
    /// but once a later one has been seen an earlier one counts as a body
    /// element and ends the scan.
    fn scan_prologue(&self, elements: &[&str]) -> Prologue {
        let mut p = Prologue {
            version: 1,
            explicit_size: false,
            fixed_size: false,
            invsize: size2(0.0, 0.0),
            real_coordinates: false,
            no_prepend: false,
            position: euclid::default::Vector2D::new(0.5, 0.5),
            anchor: euclid::default::Vector2D::new(0.5, 0.5),
            consumed: 0,
        };
        let mut iter = elements.iter();

        if let Some(first) = elements.first() {
            if let Some(version) = dsl::parse_version(first) {
                p.version = version;
                p.consumed = 1;
                iter.next();
            }
        }
        p.real_coordinates = p.version >= 2;

        let mut phase = 0;
        for raw in iter {
            let Some(element) = crate::dsl::Element::from_raw(raw) else {
                break;
            };
            let rank = match element.keyword {
                "size" | "invsize" => 0,
                "position" => 1,
                "anchor" => 2,
                "padding" => 3,
                "no_prepend" => 4,
                "real_coordinates" => 5,
                _ => break,
            };
            if rank < phase {
                break;
            }
            phase = rank;
            let args: Vec<&str> = dsl::split_escaped(element.args, ';');
            match element.keyword {
                "size" | "invsize" => {
                    match crate::geometry::parse_vec2(args[0]) {
                        Ok(v) => {
                            p.invsize = size2(v.x, v.y);
                            p.explicit_size = true;
                            p.fixed_size =
                                args.get(1).and_then(|a| dsl::parse_bool(a)).unwrap_or(false);
                        }
                        Err(err) => log::error!("dropping malformed size element: {err}"),
                    }
                }
                "position" => match crate::geometry::parse_vec2(args[0]) {
                    Ok(v) => p.position = euclid::default::Vector2D::new(v.x, v.y),
                    Err(err) => log::error!("dropping malformed position element: {err}"),
                },
                "anchor" => match crate::geometry::parse_vec2(args[0]) {
                    Ok(v) => p.anchor = euclid::default::Vector2D::new(v.x, v.y),
                    Err(err) => log::error!("dropping malformed anchor element: {err}"),
                },
                "padding" => {
                    // Accepted for compatibility; the fitted padding is used.
                    log::trace!("padding[] directive noted");
                }
                "no_prepend" => p.no_prepend = true,
                "real_coordinates" => {
                    p.real_coordinates =
                        args.first().and_then(|a| dsl::parse_bool(a)).unwrap_or(true);
                }
                _ => {}
            }
            p.consumed += 1;
        }
        p
    }
}
