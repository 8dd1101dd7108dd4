//! The element parsers: one function per DSL keyword, dispatched by name.
//!
//! Every parser follows the same contract: validate the argument list, build
//! a widget node and (usually) a [`FieldSpec`], and return `Err` if the
//! element is malformed. The driver logs the error and continues with the
//! next element; a bad element never takes down the rest of the form.

use std::str::FromStr;

use euclid::{point2, size2, vec2};

use crate::dsl::{self, Element, FORMSPEC_API_VERSION};
use crate::geometry::{
    GuPoint, GuSize, GuVector, PxPoint, PxRect, PxSize, VectorError, parse_vec2,
};
use crate::inv::{InventoryLocation, LocationError};
use crate::menu::{Menu, TooltipSpec, TooltipTarget};
use crate::style::{SelectorKind, StyleProperty};
use crate::widget::{
    FIELD_ID_BASE, FieldKind, FieldSpec, ListSpec, ScrollbarState, TableState, WidgetId,
    WidgetKind,
};

// -------------------------------------------------------------------------------------------------

/// Why one element was dropped from the form.
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum ElementError {
    /// unknown element {0:?}
    UnknownElement(String),
    /// {keyword}[] given {got} arguments
    WrongArgCount {
        /// The element keyword.
        keyword: String,
        /// How many arguments it actually carried.
        got: usize,
    },
    /// {0}
    Vector(VectorError),
    /// invalid number {0:?}
    Number(String),
    /// {0}
    Location(LocationError),
    /// {0}[] without a matching open
    StrayClose(String),
    /// {0}[] requires real coordinate mode
    NeedsRealCoordinates(String),
    /// malformed style element
    MalformedStyle,
    /// list location `context` with no context inventory
    NoContextInventory,
}

impl core::error::Error for ElementError {}

impl From<VectorError> for ElementError {
    fn from(err: VectorError) -> Self {
        ElementError::Vector(err)
    }
}

impl From<LocationError> for ElementError {
    fn from(err: LocationError) -> Self {
        ElementError::Location(err)
    }
}

fn num<T: FromStr>(s: &str) -> Result<T, ElementError> {
    s.trim()
        .parse::<T>()
        .map_err(|_| ElementError::Number(s.to_owned()))
}

fn rect_from(pos: PxPoint, size: PxSize) -> PxRect {
    PxRect::new(pos, pos + vec2(size.width, size.height))
}

/// Argument-count check with the forward-compatibility rule: a form declaring
/// a language version newer than ours may carry extra trailing arguments.
fn check_args(
    keyword: &str,
    parts: &[&str],
    min: usize,
    max: usize,
    version: u16,
) -> Result<(), ElementError> {
    let n = parts.len();
    if n >= min && (n <= max || version > FORMSPEC_API_VERSION) {
        Ok(())
    } else {
        Err(ElementError::WrongArgCount {
            keyword: keyword.to_owned(),
            got: n,
        })
    }
}

// -------------------------------------------------------------------------------------------------

/// Accumulated `scrollbaroptions[]` values, applied to the next scrollbar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScrollbarOptions {
    pub(crate) min: i32,
    pub(crate) max: i32,
    pub(crate) small_step: i32,
    pub(crate) large_step: i32,
    pub(crate) thumb_size: i32,
    pub(crate) arrows: Option<bool>,
}

impl Default for ScrollbarOptions {
    fn default() -> Self {
        ScrollbarOptions {
            min: 0,
            max: 1000,
            small_step: 10,
            large_step: 100,
            thumb_size: 1,
            arrows: None,
        }
    }
}

enum Frame {
    Container { prev_offset: GuVector },
    Scroll { prev_offset: GuVector, prev_parent: WidgetId },
}

/// Transient state threaded through one parsing pass.
pub(crate) struct ParserContext {
    pub(crate) version: u16,
    pub(crate) real_coordinates: bool,
    pub(crate) explicit_size: bool,
    /// Current container position offset, in grid units.
    pub(crate) offset: GuVector,
    /// Widget under which new nodes are inserted.
    pub(crate) parent: WidgetId,
    stack: Vec<Frame>,
    pub(crate) table_options: Vec<(String, String)>,
    pub(crate) table_columns: Vec<String>,
    pub(crate) scrollbar_options: ScrollbarOptions,
    /// Number of fields laid out by the sizeless-form fallback.
    pub(crate) simple_fields: usize,
    pub(crate) requested_focus: Option<(String, bool)>,
    /// The lists parsed so far, for the bare `listring[]` shorthand.
    last_lists: Vec<(InventoryLocation, String)>,
}

impl ParserContext {
    pub(crate) fn new(
        version: u16,
        real_coordinates: bool,
        explicit_size: bool,
        parent: WidgetId,
    ) -> Self {
        ParserContext {
            version,
            real_coordinates,
            explicit_size,
            offset: vec2(0.0, 0.0),
            parent,
            stack: Vec::new(),
            table_options: Vec::new(),
            table_columns: Vec::new(),
            scrollbar_options: ScrollbarOptions::default(),
            simple_fields: 0,
            requested_focus: None,
            last_lists: Vec::new(),
        }
    }

    /// Closes out a parsing segment (prepend or form body), complaining once
    /// about any containers left open.
    pub(crate) fn close_segment(&mut self, segment: &str) {
        if !self.stack.is_empty() {
            log::error!(
                "{n} unclosed container(s) at end of {segment}",
                n = self.stack.len(),
            );
        }
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Container { prev_offset } => self.offset = prev_offset,
                Frame::Scroll { prev_offset, prev_parent } => {
                    self.offset = prev_offset;
                    self.parent = prev_parent;
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Dispatch table from keyword to parser.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
enum ElementKind {
    Container,
    ContainerEnd,
    ScrollContainer,
    ScrollContainerEnd,
    List,
    Listring,
    Listcolors,
    Checkbox,
    Image,
    AnimatedImage,
    ItemImage,
    Button,
    ButtonExit,
    ImageButton,
    ImageButtonExit,
    ItemImageButton,
    Field,
    Pwdfield,
    Textarea,
    Label,
    Vertlabel,
    Hypertext,
    Textlist,
    Tableoptions,
    Tablecolumns,
    Table,
    Dropdown,
    Scrollbaroptions,
    Scrollbar,
    Tabheader,
    Box,
    Bgcolor,
    Background,
    #[strum(serialize = "background9")]
    Background9,
    Tooltip,
    Style,
    StyleType,
    SetFocus,
    FieldCloseOnEnter,
    // Prologue directives; valid only before the first body element.
    Size,
    Invsize,
    Position,
    Anchor,
    Padding,
    NoPrepend,
    RealCoordinates,
    FormspecVersion,
}

impl Menu {
    /// Tokenizes and dispatches one raw element, logging instead of failing.
    pub(crate) fn run_element(&mut self, ctx: &mut ParserContext, raw: &str) {
        if raw.trim().is_empty() {
            return;
        }
        let Some(element) = Element::from_raw(raw) else {
            log::warn!("ignoring stray text in form: {raw:?}");
            return;
        };
        let parts = dsl::split_escaped(element.args, ';');
        if let Err(err) = self.parse_element(ctx, element.keyword, &parts) {
            log::error!(
                "dropping malformed element {keyword:?}: {err}",
                keyword = element.keyword,
            );
        }
    }

    fn parse_element(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        let kind = ElementKind::from_str(keyword)
            .map_err(|_| ElementError::UnknownElement(keyword.to_owned()))?;
        match kind {
            ElementKind::Container => self.parse_container(ctx, keyword, parts),
            ElementKind::ContainerEnd => Self::parse_container_end(ctx, keyword),
            ElementKind::ScrollContainer => self.parse_scroll_container(ctx, keyword, parts),
            ElementKind::ScrollContainerEnd => Self::parse_scroll_container_end(ctx, keyword),
            ElementKind::List => self.parse_list(ctx, keyword, parts),
            ElementKind::Listring => self.parse_listring(ctx, keyword, parts),
            ElementKind::Listcolors => self.parse_listcolors(ctx, keyword, parts),
            ElementKind::Checkbox => self.parse_checkbox(ctx, keyword, parts),
            ElementKind::Image => self.parse_image(ctx, keyword, parts),
            ElementKind::AnimatedImage => self.parse_animated_image(ctx, keyword, parts),
            ElementKind::ItemImage => self.parse_item_image(ctx, keyword, parts),
            ElementKind::Button => self.parse_button(ctx, keyword, parts, false),
            ElementKind::ButtonExit => self.parse_button(ctx, keyword, parts, true),
            ElementKind::ImageButton => self.parse_image_button(ctx, keyword, parts, false),
            ElementKind::ImageButtonExit => self.parse_image_button(ctx, keyword, parts, true),
            ElementKind::ItemImageButton => self.parse_item_image_button(ctx, keyword, parts),
            ElementKind::Field => self.parse_field(ctx, keyword, parts),
            ElementKind::Pwdfield => self.parse_pwdfield(ctx, keyword, parts),
            ElementKind::Textarea => self.parse_textarea(ctx, keyword, parts),
            ElementKind::Label => self.parse_label(ctx, keyword, parts, false),
            ElementKind::Vertlabel => self.parse_label(ctx, keyword, parts, true),
            ElementKind::Hypertext => self.parse_hypertext(ctx, keyword, parts),
            ElementKind::Textlist => self.parse_textlist(ctx, keyword, parts),
            ElementKind::Tableoptions => Self::parse_tableoptions(ctx, parts),
            ElementKind::Tablecolumns => Self::parse_tablecolumns(ctx, parts),
            ElementKind::Table => self.parse_table(ctx, keyword, parts),
            ElementKind::Dropdown => self.parse_dropdown(ctx, keyword, parts),
            ElementKind::Scrollbaroptions => Self::parse_scrollbaroptions(ctx, parts),
            ElementKind::Scrollbar => self.parse_scrollbar(ctx, keyword, parts),
            ElementKind::Tabheader => self.parse_tabheader(ctx, keyword, parts),
            ElementKind::Box => self.parse_box(ctx, keyword, parts),
            ElementKind::Bgcolor => self.parse_bgcolor(ctx, keyword, parts),
            ElementKind::Background => self.parse_background(ctx, keyword, parts, false),
            ElementKind::Background9 => self.parse_background(ctx, keyword, parts, true),
            ElementKind::Tooltip => self.parse_tooltip(ctx, keyword, parts),
            ElementKind::Style => self.parse_style(SelectorKind::Name, parts),
            ElementKind::StyleType => self.parse_style(SelectorKind::Type, parts),
            ElementKind::SetFocus => Self::parse_set_focus(ctx, keyword, parts),
            ElementKind::FieldCloseOnEnter => self.parse_field_close_on_enter(ctx, keyword, parts),
            ElementKind::Size
            | ElementKind::Invsize
            | ElementKind::Position
            | ElementKind::Anchor
            | ElementKind::Padding
            | ElementKind::NoPrepend
            | ElementKind::RealCoordinates
            | ElementKind::FormspecVersion => {
                log::warn!("{keyword}[] after the first body element has no effect");
                Ok(())
            }
        }
    }

    // --- Coordinate helpers ----------------------------------------------------------------------

    fn elem_pos(&self, ctx: &ParserContext, arg: &str) -> Result<PxPoint, ElementError> {
        let v = parse_vec2(arg)?;
        let p: GuPoint = point2(v.x, v.y);
        Ok(if ctx.real_coordinates {
            self.scale.real_pos(ctx.offset, p)
        } else {
            self.scale.grid_pos(ctx.offset, p)
        })
    }

    /// Element body size: abutting grid size in legacy mode, plain scaling in
    /// real-coordinate mode.
    fn elem_size(&self, ctx: &ParserContext, arg: &str) -> Result<PxSize, ElementError> {
        let v = parse_vec2(arg)?;
        let s: GuSize = size2(v.x, v.y);
        Ok(if ctx.real_coordinates {
            self.scale.real_size(s)
        } else {
            self.scale.grid_size(s)
        })
    }

    /// Size in image-size multiples regardless of coordinate mode (images and
    /// item images keep this unit even in legacy forms).
    fn image_size(&self, arg: &str) -> Result<PxSize, ElementError> {
        let v = parse_vec2(arg)?;
        Ok(self.scale.real_size(size2(v.x, v.y)))
    }

    fn alloc_field_id(&self) -> i32 {
        FIELD_ID_BASE + i32::try_from(self.fields.len()).unwrap_or(0)
    }

    /// Builds a field spec with the style-cascade sound attached.
    fn styled_spec(
        &self,
        type_name: &str,
        parent_type: Option<&str>,
        name: &str,
        label: &str,
    ) -> FieldSpec {
        let style = self.theme.resolve(type_name, name, parent_type);
        let mut spec = FieldSpec::new(name, label, self.alloc_field_id());
        spec.sound = style.get(StyleProperty::Sound);
        spec
    }

    fn location_of(&self, arg: &str) -> Result<InventoryLocation, ElementError> {
        if arg == "context" || arg == "current_name" {
            self.settings
                .context_inventory
                .clone()
                .ok_or(ElementError::NoContextInventory)
        } else {
            Ok(InventoryLocation::parse(arg)?)
        }
    }

    // --- Containers ------------------------------------------------------------------------------

    fn parse_container(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 1, 1, ctx.version)?;
        let shift = parse_vec2(parts[0])?;
        ctx.stack.push(Frame::Container {
            prev_offset: ctx.offset,
        });
        ctx.offset += shift;
        Ok(())
    }

    fn parse_container_end(ctx: &mut ParserContext, keyword: &str) -> Result<(), ElementError> {
        match ctx.stack.pop() {
            Some(Frame::Container { prev_offset }) => {
                ctx.offset = prev_offset;
                Ok(())
            }
            Some(frame @ Frame::Scroll { .. }) => {
                ctx.stack.push(frame);
                Err(ElementError::StrayClose(keyword.to_owned()))
            }
            None => Err(ElementError::StrayClose(keyword.to_owned())),
        }
    }

    fn parse_scroll_container(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 4, 5, ctx.version)?;
        if !ctx.real_coordinates {
            return Err(ElementError::NeedsRealCoordinates(keyword.to_owned()));
        }
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = self.elem_size(ctx, parts[1])?;
        let name = dsl::unescape(parts[2]).into_owned();
        let horizontal = parts[3].trim() == "horizontal";
        let factor = match parts.get(4) {
            Some(s) if !s.trim().is_empty() => num::<f32>(s)?,
            _ => 0.1,
        };

        let widget = self.arena.insert(
            ctx.parent,
            rect_from(pos, size),
            WidgetKind::ScrollContainer {
                scrollbar: name,
                horizontal,
                factor,
                offset: vec2(0.0, 0.0),
            },
            0,
        );
        ctx.stack.push(Frame::Scroll {
            prev_offset: ctx.offset,
            prev_parent: ctx.parent,
        });
        ctx.offset = vec2(0.0, 0.0);
        ctx.parent = widget;
        Ok(())
    }

    fn parse_scroll_container_end(
        ctx: &mut ParserContext,
        keyword: &str,
    ) -> Result<(), ElementError> {
        match ctx.stack.pop() {
            Some(Frame::Scroll { prev_offset, prev_parent }) => {
                ctx.offset = prev_offset;
                ctx.parent = prev_parent;
                Ok(())
            }
            Some(frame @ Frame::Container { .. }) => {
                ctx.stack.push(frame);
                Err(ElementError::StrayClose(keyword.to_owned()))
            }
            None => Err(ElementError::StrayClose(keyword.to_owned())),
        }
    }

    // --- Inventory -------------------------------------------------------------------------------

    fn parse_list(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 4, 5, ctx.version)?;
        let location = self.location_of(parts[0])?;
        let list = dsl::unescape(parts[1]).into_owned();
        let pos = self.elem_pos(ctx, parts[2])?;
        let geom = parse_vec2(parts[3])?;
        let start_index = match parts.get(4) {
            Some(s) if !s.trim().is_empty() => num::<usize>(s)?,
            _ => 0,
        };
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let (cols, rows) = (geom.x.max(0.0) as u32, geom.y.max(0.0) as u32);

        if !ctx.explicit_size {
            log::warn!("list[] without a size[] element");
        }

        let imgsize = self.scale.imgsize;
        let slot_spacing = if ctx.real_coordinates {
            vec2(imgsize * 1.25, imgsize * 1.25)
        } else {
            self.scale.spacing
        };
        #[allow(clippy::cast_precision_loss)]
        let size: PxSize = size2(
            (cols.max(1) - 1) as f32 * slot_spacing.x + imgsize,
            (rows.max(1) - 1) as f32 * slot_spacing.y + imgsize,
        );

        let spec = ListSpec {
            location: location.clone(),
            list: list.clone(),
            cols,
            rows,
            start_index,
            slot_spacing,
            slot_size: size2(imgsize, imgsize),
        };
        let id = self.alloc_field_id();
        let rect = rect_from(pos, size);
        let widget = self.arena.insert(ctx.parent, rect, WidgetKind::List(spec), id);

        let mut field = FieldSpec::new("", "", id);
        field.rect = rect;
        field.widget = Some(widget);
        self.fields.push(field);
        ctx.last_lists.push((location, list));
        Ok(())
    }

    fn parse_listring(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        if parts.len() == 1 && parts[0].trim().is_empty() {
            // Bare listring[]: link the last two lists.
            let n = ctx.last_lists.len();
            if n < 2 {
                return Err(ElementError::WrongArgCount {
                    keyword: keyword.to_owned(),
                    got: 0,
                });
            }
            self.listring.push(ctx.last_lists[n - 2].clone());
            self.listring.push(ctx.last_lists[n - 1].clone());
            return Ok(());
        }
        check_args(keyword, parts, 2, 2, ctx.version)?;
        let location = self.location_of(parts[0])?;
        let list = dsl::unescape(parts[1]).into_owned();
        self.listring.push((location, list));
        Ok(())
    }

    fn parse_listcolors(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        // A newer declared version only relaxes the upper bound.
        if parts.len() < 2
            || (!matches!(parts.len(), 2 | 3 | 5) && ctx.version <= FORMSPEC_API_VERSION)
        {
            return Err(ElementError::WrongArgCount {
                keyword: keyword.to_owned(),
                got: parts.len(),
            });
        }
        self.colors.slot_bg_normal = Some(parts[0].trim().to_owned());
        self.colors.slot_bg_hover = Some(parts[1].trim().to_owned());
        if let Some(border) = parts.get(2) {
            self.colors.slot_border = Some(border.trim().to_owned());
        }
        if parts.len() >= 5 {
            self.colors.tooltip_bgcolor = Some(parts[3].trim().to_owned());
            self.colors.tooltip_fontcolor = Some(parts[4].trim().to_owned());
        }
        Ok(())
    }

    // --- Simple widgets --------------------------------------------------------------------------

    fn parse_checkbox(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 3, 4, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let name = dsl::unescape(parts[1]).into_owned();
        let label = dsl::unescape(parts[2]).into_owned();
        let checked = parts.get(3).and_then(|s| dsl::parse_bool(s)).unwrap_or(false);

        let imgsize = self.scale.imgsize;
        let height = imgsize / 2.0;
        #[allow(clippy::cast_precision_loss)]
        let width = height + label.chars().count() as f32 * imgsize * 0.25 + 7.0;
        let rect = PxRect::new(
            point2(pos.x, pos.y - height / 2.0),
            point2(pos.x + width, pos.y + height / 2.0),
        );

        let mut spec = self.styled_spec("checkbox", None, &name, &label);
        spec.kind = FieldKind::Checkbox;
        spec.send = true;
        spec.rect = rect;
        spec.pointer_cursor = true;
        let widget = self
            .arena
            .insert(ctx.parent, rect, WidgetKind::Checkbox { checked }, spec.id);
        spec.widget = Some(widget);
        self.fields.push(spec);
        Ok(())
    }

    fn parse_image(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 2, 4, ctx.version)?;
        if !ctx.explicit_size {
            log::warn!("image[] without a size[] element");
        }
        let pos = self.elem_pos(ctx, parts[0])?;
        let (size, texture) = if parts.len() >= 3 {
            (self.image_size(parts[1])?, parts[2])
        } else {
            (size2(self.scale.imgsize, self.scale.imgsize), parts[1])
        };
        let texture = dsl::unescape(texture).into_owned();

        let id = self.alloc_field_id();
        let rect = rect_from(pos, size);
        let widget = self
            .arena
            .insert(ctx.parent, rect, WidgetKind::Image { texture: texture.clone() }, id);
        if let Some(textures) = self.textures_mut() {
            if textures.texture(&texture).is_none() {
                log::warn!("unknown texture {texture:?}");
            }
        }
        let mut field = FieldSpec::new("", "", id);
        field.rect = rect;
        field.widget = Some(widget);
        self.fields.push(field);
        Ok(())
    }

    fn parse_animated_image(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 6, 7, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = self.image_size(parts[1])?;
        let name = dsl::unescape(parts[2]).into_owned();
        let texture = dsl::unescape(parts[3]).into_owned();
        let frame_count = num::<u32>(parts[4])?;
        let frame_duration_ms = num::<u32>(parts[5])?;
        let start_frame: u32 = match parts.get(6) {
            Some(s) if !s.trim().is_empty() => num::<u32>(s)?,
            _ => 1,
        };

        let mut spec = self.styled_spec("animated_image", Some("image"), &name, "");
        spec.kind = FieldKind::AnimatedImage;
        spec.send = true;
        let rect = rect_from(pos, size);
        spec.rect = rect;
        let widget = self.arena.insert(
            ctx.parent,
            rect,
            WidgetKind::AnimatedImage {
                texture,
                frame_count,
                frame_duration_ms,
                frame: start_frame.saturating_sub(1).min(frame_count.saturating_sub(1)),
                elapsed_ms: 0,
            },
            spec.id,
        );
        spec.widget = Some(widget);
        self.fields.push(spec);
        Ok(())
    }

    fn parse_item_image(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 3, 3, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = self.image_size(parts[1])?;
        let item = dsl::unescape(parts[2]).into_owned();

        let id = self.alloc_field_id();
        let rect = rect_from(pos, size);
        let widget = self
            .arena
            .insert(ctx.parent, rect, WidgetKind::ItemImage { item }, id);
        let mut field = FieldSpec::new("", "", id);
        field.kind = FieldKind::ItemImage;
        field.rect = rect;
        field.widget = Some(widget);
        self.fields.push(field);
        Ok(())
    }

    // --- Buttons ---------------------------------------------------------------------------------

    fn button_rect(&self, ctx: &ParserContext, pos: PxPoint, geom: &str) -> Result<PxRect, ElementError> {
        if ctx.real_coordinates {
            Ok(rect_from(pos, self.elem_size(ctx, geom)?))
        } else {
            // Legacy buttons have a fixed height, vertically centered on the
            // declared geometry.
            let v = parse_vec2(geom)?;
            let width = v.x * self.scale.spacing.x - (self.scale.spacing.x - self.scale.imgsize);
            let center_y = pos.y + v.y * self.scale.imgsize / 2.0;
            let h = self.scale.button_height;
            Ok(PxRect::new(
                point2(pos.x, center_y - h),
                point2(pos.x + width, center_y + h),
            ))
        }
    }

    fn push_button(
        &mut self,
        ctx: &mut ParserContext,
        rect: PxRect,
        name: &str,
        label: &str,
        type_name: &str,
        exit: bool,
        image: Option<String>,
        item: Option<String>,
    ) {
        let mut spec = self.styled_spec(type_name, (type_name != "button").then_some("button"), name, label);
        spec.kind = FieldKind::Button;
        spec.is_exit = exit;
        spec.rect = rect;
        spec.pointer_cursor = true;
        let widget = self.arena.insert(
            ctx.parent,
            rect,
            WidgetKind::Button {
                label: label.to_owned(),
                exit,
                image,
                item,
            },
            spec.id,
        );
        spec.widget = Some(widget);
        self.fields.push(spec);
    }

    fn parse_button(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
        exit: bool,
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 4, 4, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let rect = self.button_rect(ctx, pos, parts[1])?;
        let name = dsl::unescape(parts[2]).into_owned();
        let label = dsl::unescape(parts[3]).into_owned();
        self.push_button(ctx, rect, &name, &label, "button", exit, None, None);
        Ok(())
    }

    fn parse_image_button(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
        exit: bool,
    ) -> Result<(), ElementError> {
        if parts.len() == 6 && ctx.version <= FORMSPEC_API_VERSION {
            return Err(ElementError::WrongArgCount {
                keyword: keyword.to_owned(),
                got: parts.len(),
            });
        }
        check_args(keyword, parts, 5, 8, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = if ctx.real_coordinates {
            self.elem_size(ctx, parts[1])?
        } else {
            self.image_size(parts[1])?
        };
        let texture = dsl::unescape(parts[2]).into_owned();
        let name = dsl::unescape(parts[3]).into_owned();
        let label = dsl::unescape(parts[4]).into_owned();
        // parts 5..8 (noclip, drawborder, pressed texture) only affect
        // rendering; the pressed texture is reachable through the style
        // cascade instead.
        self.push_button(
            ctx,
            rect_from(pos, size),
            &name,
            &label,
            "image_button",
            exit,
            Some(texture),
            None,
        );
        Ok(())
    }

    fn parse_item_image_button(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 5, 5, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = if ctx.real_coordinates {
            self.elem_size(ctx, parts[1])?
        } else {
            self.image_size(parts[1])?
        };
        let item = dsl::unescape(parts[2]).into_owned();
        let name = dsl::unescape(parts[3]).into_owned();
        let label = dsl::unescape(parts[4]).into_owned();
        self.push_button(
            ctx,
            rect_from(pos, size),
            &name,
            &label,
            "item_image_button",
            false,
            None,
            Some(item),
        );
        Ok(())
    }

    // --- Text entry ------------------------------------------------------------------------------

    fn push_editbox(
        &mut self,
        ctx: &mut ParserContext,
        rect: PxRect,
        type_name: &str,
        name: &str,
        label: &str,
        default: &str,
        multiline: bool,
        password: bool,
    ) {
        let mut spec = self.styled_spec(type_name, None, name, label);
        spec.send = !name.is_empty();
        spec.default_value = default.to_owned();
        spec.rect = rect;
        let widget = self.arena.insert(
            ctx.parent,
            rect,
            WidgetKind::EditBox {
                text: default.to_owned(),
                multiline,
                password,
            },
            spec.id,
        );
        spec.widget = Some(widget);
        self.fields.push(spec);
    }

    fn parse_field(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        if parts.len() == 3 {
            return self.parse_simple_field(ctx, parts);
        }
        check_args(keyword, parts, 5, 5, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let rect = if ctx.real_coordinates {
            rect_from(pos, self.elem_size(ctx, parts[1])?)
        } else {
            let v = parse_vec2(parts[1])?;
            let width = v.x * self.scale.spacing.x - (self.scale.spacing.x - self.scale.imgsize);
            let h = self.scale.button_height;
            PxRect::new(point2(pos.x, pos.y - h), point2(pos.x + width, pos.y + h))
        };
        let name = dsl::unescape(parts[2]).into_owned();
        let label = dsl::unescape(parts[3]).into_owned();
        let default = dsl::unescape(parts[4]).into_owned();
        self.push_editbox(ctx, rect, "field", &name, &label, &default, false, false);
        Ok(())
    }

    /// The sizeless-form variant, `field[name;label;default]`: fields stack
    /// vertically in a fixed window.
    fn parse_simple_field(
        &mut self,
        ctx: &mut ParserContext,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        let name = dsl::unescape(parts[0]).into_owned();
        let label = dsl::unescape(parts[1]).into_owned();
        let default = dsl::unescape(parts[2]).into_owned();

        let size = self.rect.size();
        #[allow(clippy::cast_precision_loss)]
        let top = (ctx.simple_fields as f32 + 2.0) * 60.0 * self.settings.metrics.gui_scaling;
        let h = self.scale.button_height;
        let rect = PxRect::new(
            point2(size.width / 2.0 - 150.0, top),
            point2(size.width / 2.0 + 150.0, top + h * 2.0),
        );
        ctx.simple_fields += 1;
        self.push_editbox(ctx, rect, "field", &name, &label, &default, false, false);
        Ok(())
    }

    fn parse_pwdfield(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 4, 4, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let rect = if ctx.real_coordinates {
            rect_from(pos, self.elem_size(ctx, parts[1])?)
        } else {
            let v = parse_vec2(parts[1])?;
            let width = v.x * self.scale.spacing.x - (self.scale.spacing.x - self.scale.imgsize);
            let h = self.scale.button_height;
            PxRect::new(point2(pos.x, pos.y - h), point2(pos.x + width, pos.y + h))
        };
        let name = dsl::unescape(parts[2]).into_owned();
        let label = dsl::unescape(parts[3]).into_owned();
        self.push_editbox(ctx, rect, "pwdfield", &name, &label, "", false, true);
        Ok(())
    }

    fn parse_textarea(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 5, 5, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = self.elem_size(ctx, parts[1])?;
        let name = dsl::unescape(parts[2]).into_owned();
        let label = dsl::unescape(parts[3]).into_owned();
        let default = dsl::unescape(parts[4]).into_owned();
        self.push_editbox(
            ctx,
            rect_from(pos, size),
            "textarea",
            &name,
            &label,
            &default,
            true,
            false,
        );
        Ok(())
    }

    // --- Static text -----------------------------------------------------------------------------

    fn parse_label(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
        vertical: bool,
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 2, 2, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let text = dsl::unescape(parts[1]).into_owned();
        let lines: Vec<String> = if vertical {
            text.chars().map(String::from).collect()
        } else {
            text.split('\n').map(str::to_owned).collect()
        };

        let imgsize = self.scale.imgsize;
        let line_h = self.scale.button_height;
        #[allow(clippy::cast_precision_loss)]
        let (width, height) = if vertical {
            (imgsize / 2.0, lines.len() as f32 * line_h)
        } else {
            let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
            (longest as f32 * imgsize * 0.25, lines.len() as f32 * line_h)
        };
        let rect = PxRect::new(
            point2(pos.x, pos.y - line_h / 2.0),
            point2(pos.x + width, pos.y - line_h / 2.0 + height),
        );

        let id = self.alloc_field_id();
        let widget = self
            .arena
            .insert(ctx.parent, rect, WidgetKind::Label { lines, vertical }, id);
        let mut field = FieldSpec::new("", text, id);
        field.rect = rect;
        field.widget = Some(widget);
        self.fields.push(field);
        Ok(())
    }

    fn parse_hypertext(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 4, 4, ctx.version)?;
        if !ctx.real_coordinates {
            return Err(ElementError::NeedsRealCoordinates(keyword.to_owned()));
        }
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = self.elem_size(ctx, parts[1])?;
        let name = dsl::unescape(parts[2]).into_owned();
        let text = dsl::unescape(parts[3]).into_owned();

        let mut spec = self.styled_spec("hypertext", None, &name, "");
        spec.kind = FieldKind::HyperText;
        let rect = rect_from(pos, size);
        spec.rect = rect;
        let widget = self
            .arena
            .insert(ctx.parent, rect, WidgetKind::Hypertext { text }, spec.id);
        spec.widget = Some(widget);
        self.fields.push(spec);
        Ok(())
    }

    // --- Tables ----------------------------------------------------------------------------------

    fn parse_textlist(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 4, 6, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = self.elem_size(ctx, parts[1])?;
        let name = dsl::unescape(parts[2]).into_owned();
        let cells: Vec<String> = dsl::split_escaped(parts[3], ',')
            .into_iter()
            .map(|c| dsl::unescape(c).into_owned())
            .collect();
        let selected = parts
            .get(4)
            .and_then(|s| s.trim().parse::<usize>().ok())
            .and_then(|sel| sel.checked_sub(1))
            .filter(|&sel| sel < cells.len());
        let transparent = parts.get(5).and_then(|s| dsl::parse_bool(s)).unwrap_or(false);

        let rows = cells.len();
        let mut options = Vec::new();
        if transparent {
            options.push(("transparent".to_owned(), "true".to_owned()));
        }
        self.push_table(ctx, rect_from(pos, size), "textlist", &name, options, Vec::new(), cells, rows, selected);
        Ok(())
    }

    fn parse_tableoptions(ctx: &mut ParserContext, parts: &[&str]) -> Result<(), ElementError> {
        for part in parts {
            match part.split_once('=') {
                Some((k, v)) => ctx
                    .table_options
                    .push((k.trim().to_owned(), v.trim().to_owned())),
                None => {
                    if !part.trim().is_empty() {
                        ctx.table_options.push((part.trim().to_owned(), String::new()));
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_tablecolumns(ctx: &mut ParserContext, parts: &[&str]) -> Result<(), ElementError> {
        ctx.table_columns = parts
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| (*p).to_owned())
            .collect();
        Ok(())
    }

    fn parse_table(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 4, 5, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = self.elem_size(ctx, parts[1])?;
        let name = dsl::unescape(parts[2]).into_owned();
        let cells: Vec<String> = dsl::split_escaped(parts[3], ',')
            .into_iter()
            .map(|c| dsl::unescape(c).into_owned())
            .collect();
        let columns = ctx.table_columns.clone();
        let options = ctx.table_options.clone();
        let per_row = columns.len().max(1);
        let rows = cells.len().div_ceil(per_row);
        let selected = parts
            .get(4)
            .and_then(|s| s.trim().parse::<usize>().ok())
            .and_then(|sel| sel.checked_sub(1))
            .filter(|&sel| sel < rows);

        self.push_table(ctx, rect_from(pos, size), "table", &name, options, columns, cells, rows, selected);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn push_table(
        &mut self,
        ctx: &mut ParserContext,
        rect: PxRect,
        type_name: &str,
        name: &str,
        options: Vec<(String, String)>,
        columns: Vec<String>,
        cells: Vec<String>,
        rows: usize,
        selected: Option<usize>,
    ) {
        let mut spec = self.styled_spec(type_name, None, name, "");
        spec.kind = FieldKind::Table;
        spec.send = true;
        spec.rect = rect;
        let widget = self.arena.insert(
            ctx.parent,
            rect,
            WidgetKind::Table {
                options,
                columns,
                cells,
                rows,
                state: TableState {
                    selected,
                    ..TableState::default()
                },
            },
            spec.id,
        );
        spec.widget = Some(widget);
        self.fields.push(spec);
    }

    // --- Selection widgets -----------------------------------------------------------------------

    fn parse_dropdown(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 5, 6, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let rect = if ctx.real_coordinates {
            rect_from(pos, self.elem_size(ctx, parts[1])?)
        } else {
            let width = num::<f32>(parts[1])? * self.scale.spacing.x
                - (self.scale.spacing.x - self.scale.imgsize);
            let h = self.scale.button_height;
            PxRect::new(point2(pos.x, pos.y), point2(pos.x + width, pos.y + h * 2.0))
        };
        let name = dsl::unescape(parts[2]).into_owned();
        let items: Vec<String> = dsl::split_escaped(parts[3], ',')
            .into_iter()
            .map(|c| dsl::unescape(c).into_owned())
            .collect();
        let selected = parts
            .get(4)
            .and_then(|s| s.trim().parse::<usize>().ok())
            .and_then(|sel| sel.checked_sub(1))
            .filter(|&sel| sel < items.len());
        let index_event = parts.get(5).and_then(|s| dsl::parse_bool(s)).unwrap_or(false);

        let mut spec = self.styled_spec("dropdown", None, &name, "");
        spec.kind = FieldKind::DropDown;
        spec.send = true;
        spec.rect = rect;
        spec.pointer_cursor = true;
        let widget = self.arena.insert(
            ctx.parent,
            rect,
            WidgetKind::Dropdown {
                items,
                selected,
                index_event,
            },
            spec.id,
        );
        spec.widget = Some(widget);
        self.fields.push(spec);
        Ok(())
    }

    fn parse_scrollbaroptions(
        ctx: &mut ParserContext,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                if !part.trim().is_empty() {
                    log::warn!("scrollbaroptions entry without value: {part:?}");
                }
                continue;
            };
            let opts = &mut ctx.scrollbar_options;
            match key.trim() {
                "min" => opts.min = num(value)?,
                "max" => opts.max = num(value)?,
                "smallstep" => opts.small_step = num::<i32>(value)?.max(0),
                "largestep" => opts.large_step = num::<i32>(value)?.max(0),
                "thumbsize" => opts.thumb_size = num::<i32>(value)?.max(1),
                "arrows" => {
                    opts.arrows = match value.trim() {
                        "show" => Some(true),
                        "hide" => Some(false),
                        "default" => None,
                        other => {
                            log::warn!("unknown scrollbar arrows mode {other:?}");
                            None
                        }
                    };
                }
                other => log::warn!("unknown scrollbaroptions key {other:?}"),
            }
        }
        Ok(())
    }

    fn parse_scrollbar(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 5, 5, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = if ctx.real_coordinates {
            self.elem_size(ctx, parts[1])?
        } else {
            let v = parse_vec2(parts[1])?;
            self.scale.grid_size_raw(size2(v.x, v.y))
        };
        let horizontal = parts[2].trim() == "horizontal";
        let name = dsl::unescape(parts[3]).into_owned();
        let value = num::<i32>(parts[4])?;

        let opts = ctx.scrollbar_options;
        let length = if horizontal { size.width } else { size.height };
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let page_size = (length * (opts.max - opts.min + 1) as f32 / opts.thumb_size as f32) as i32;

        let mut state = ScrollbarState {
            horizontal,
            value: 0,
            min: opts.min,
            max: opts.max,
            small_step: opts.small_step,
            large_step: opts.large_step,
            page_size,
            arrows_visible: opts.arrows,
        };
        state.set_value(value);

        let mut spec = self.styled_spec("scrollbar", None, &name, "");
        spec.kind = FieldKind::ScrollBar;
        spec.send = true;
        let rect = rect_from(pos, size);
        spec.rect = rect;
        let widget = self
            .arena
            .insert(ctx.parent, rect, WidgetKind::Scrollbar(state), spec.id);
        spec.widget = Some(widget);
        self.fields.push(spec);
        Ok(())
    }

    fn parse_tabheader(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        // A newer declared version only relaxes the upper bound.
        if parts.len() < 4
            || (!matches!(parts.len(), 4 | 6 | 7) && ctx.version <= FORMSPEC_API_VERSION)
        {
            return Err(ElementError::WrongArgCount {
                keyword: keyword.to_owned(),
                got: parts.len(),
            });
        }
        let has_geom = parts.len() >= 7;
        let pos = self.elem_pos(ctx, parts[0])?;
        let base = usize::from(has_geom);
        let name = dsl::unescape(parts[1 + base]).into_owned();
        let captions: Vec<String> = dsl::split_escaped(parts[2 + base], ',')
            .into_iter()
            .map(|c| dsl::unescape(c).into_owned())
            .collect();
        let active = parts[3 + base]
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|sel| sel.checked_sub(1))
            .filter(|&sel| sel < captions.len())
            .unwrap_or(0);
        let transparent = parts
            .get(4 + base)
            .and_then(|s| dsl::parse_bool(s))
            .unwrap_or(false);
        let draw_border = parts
            .get(5 + base)
            .and_then(|s| dsl::parse_bool(s))
            .unwrap_or(true);

        let rect = if has_geom {
            rect_from(pos, self.elem_size(ctx, parts[1])?)
        } else {
            // The header row sits above its anchor position.
            #[allow(clippy::cast_precision_loss)]
            let width = captions.len() as f32 * self.scale.imgsize * 2.0;
            let h = self.scale.button_height * 2.0;
            PxRect::new(point2(pos.x, pos.y - h), point2(pos.x + width, pos.y))
        };

        let mut spec = self.styled_spec("tabheader", None, &name, "");
        spec.kind = FieldKind::TabHeader;
        spec.send = true;
        spec.rect = rect;
        spec.pointer_cursor = true;
        let widget = self.arena.insert(
            ctx.parent,
            rect,
            WidgetKind::TabHeader {
                captions,
                active,
                transparent,
                draw_border,
            },
            spec.id,
        );
        spec.widget = Some(widget);
        self.fields.push(spec);
        Ok(())
    }

    // --- Decoration ------------------------------------------------------------------------------

    fn parse_box(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 3, 3, ctx.version)?;
        let pos = self.elem_pos(ctx, parts[0])?;
        let size = self.elem_size(ctx, parts[1])?;
        let color = parts[2].trim().to_owned();
        self.arena
            .insert(ctx.parent, rect_from(pos, size), WidgetKind::ColorBox { color }, 0);
        Ok(())
    }

    fn parse_bgcolor(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 1, 3, ctx.version)?;
        if !parts[0].trim().is_empty() {
            self.colors.bgcolor = parts[0].trim().to_owned();
        }
        match parts.get(1).map(|s| s.trim()) {
            None | Some("") => {}
            Some("both") => {
                self.colors.fullscreen = true;
                self.colors.fullscreen_bgcolor = self.colors.bgcolor.clone();
            }
            Some("neither") => self.colors.fullscreen = false,
            Some(other) => match dsl::parse_bool(other) {
                Some(fullscreen) => self.colors.fullscreen = fullscreen,
                None => log::warn!("invalid bgcolor fullscreen mode {other:?}"),
            },
        }
        if let Some(color) = parts.get(2) {
            if !color.trim().is_empty() {
                self.colors.fullscreen_bgcolor = color.trim().to_owned();
            }
        }
        Ok(())
    }

    fn parse_background(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
        nine_slice: bool,
    ) -> Result<(), ElementError> {
        let (min, max) = if nine_slice { (5, 5) } else { (3, 4) };
        check_args(keyword, parts, min, max, ctx.version)?;
        let raw_pos = parse_vec2(parts[0])?;
        let raw_geom = parse_vec2(parts[1])?;
        let texture = dsl::unescape(parts[2]).into_owned();
        let fullscreen = parts.get(3).and_then(|s| dsl::parse_bool(s)).unwrap_or(false);
        let middle = if nine_slice {
            Some(parts[4].trim().to_owned())
        } else {
            None
        };

        let rect = if ctx.real_coordinates {
            let pos = self.scale.real_pos(ctx.offset, point2(raw_pos.x, raw_pos.y));
            rect_from(pos, self.scale.real_size(size2(raw_geom.x, raw_geom.y)))
        } else {
            // Legacy backgrounds bleed half a slot border outward so they
            // frame the outermost inventory slots.
            let center = self.scale.grid_pos(ctx.offset, point2(raw_pos.x, raw_pos.y));
            let bleed = vec2(
                (self.scale.spacing.x - self.scale.imgsize) / 2.0,
                (self.scale.spacing.y - self.scale.imgsize) / 2.0,
            );
            let pos = center - bleed;
            rect_from(pos, self.scale.grid_size_raw(size2(raw_geom.x, raw_geom.y)))
        };

        self.arena.insert(
            ctx.parent,
            rect,
            WidgetKind::Background {
                texture,
                middle,
                fullscreen,
            },
            0,
        );
        Ok(())
    }

    fn parse_tooltip(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 2, 5, ctx.version)?;
        let rect_form = parts[0].contains(',');
        let (target, text_index) = if rect_form {
            check_args(keyword, parts, 3, 5, ctx.version)?;
            let pos = self.elem_pos(ctx, parts[0])?;
            let size = self.elem_size(ctx, parts[1])?;
            (TooltipTarget::Rect(rect_from(pos, size)), 2)
        } else {
            (
                TooltipTarget::Field(dsl::unescape(parts[0]).into_owned()),
                1,
            )
        };
        let text = dsl::unescape(parts[text_index]).into_owned();
        let bgcolor = parts.get(text_index + 1).map(|s| s.trim().to_owned());
        let fontcolor = parts.get(text_index + 2).map(|s| s.trim().to_owned());
        self.tooltips.push(TooltipSpec {
            target,
            text,
            bgcolor,
            fontcolor,
        });
        Ok(())
    }

    // --- Meta ------------------------------------------------------------------------------------

    fn parse_style(
        &mut self,
        kind: SelectorKind,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        if self.theme.push_from_args(kind, parts) {
            Ok(())
        } else {
            Err(ElementError::MalformedStyle)
        }
    }

    fn parse_set_focus(ctx: &mut ParserContext, keyword: &str, parts: &[&str]) -> Result<(), ElementError> {
        check_args(keyword, parts, 1, 2, ctx.version)?;
        let name = dsl::unescape(parts[0]).into_owned();
        let force = parts.get(1).and_then(|s| dsl::parse_bool(s)).unwrap_or(false);
        ctx.requested_focus = Some((name, force));
        Ok(())
    }

    fn parse_field_close_on_enter(
        &mut self,
        ctx: &mut ParserContext,
        keyword: &str,
        parts: &[&str],
    ) -> Result<(), ElementError> {
        check_args(keyword, parts, 2, 2, ctx.version)?;
        let name = dsl::unescape(parts[0]).into_owned();
        let closes = dsl::parse_bool(parts[1]).unwrap_or(true);
        if closes {
            self.no_close_on_enter.remove(&name);
        } else {
            self.no_close_on_enter.insert(name);
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_args_enforces_bounds() {
        assert!(check_args("button", &["a", "b", "c", "d"], 4, 4, 1).is_ok());
        assert!(matches!(
            check_args("button", &["a", "b"], 4, 4, 1),
            Err(ElementError::WrongArgCount { got: 2, .. }),
        ));
        assert!(matches!(
            check_args("button", &["a", "b", "c", "d", "e"], 4, 4, 1),
            Err(ElementError::WrongArgCount { got: 5, .. }),
        ));
    }

    #[test]
    fn check_args_tolerates_extras_from_newer_versions() {
        // A form declaring a newer language version may carry trailing
        // arguments we don't know about, but never fewer than the minimum.
        let newer = FORMSPEC_API_VERSION + 1;
        assert!(check_args("button", &["a", "b", "c", "d", "e"], 4, 4, newer).is_ok());
        assert!(check_args("button", &["a", "b"], 4, 4, newer).is_err());
    }

    #[test]
    fn element_kind_dispatch_is_snake_case() {
        assert_eq!(ElementKind::from_str("scroll_container"), Ok(ElementKind::ScrollContainer));
        assert_eq!(ElementKind::from_str("background9"), Ok(ElementKind::Background9));
        assert_eq!(ElementKind::from_str("field_close_on_enter"), Ok(ElementKind::FieldCloseOnEnter));
        assert!(ElementKind::from_str("frobnicate").is_err());
    }
}
