//! Layout and interaction engine for the *formspec* game-UI description language.
//!
//! A formspec is a compact textual description of a game dialog — inventory
//! screens, settings pages, shop windows — as a sequence of
//! `keyword[arg;arg;...]` elements. This crate parses such a description into
//! a tree of positioned widget records, resolves the style cascade, and runs
//! the inventory drag-and-drop state machine. It does **not** render anything:
//! fonts, textures, audio, and the actual pixels on screen belong to the
//! embedding application, which participates through the collaborator traits
//! [`TextureSource`], [`SoundPlayer`], [`FormSource`], [`TextDest`], and
//! [`inv::InventoryView`].
//!
//! The central type is [`Menu`]. Feed it a form source and a screen size,
//! call [`Menu::regenerate()`] whenever the source changes, deliver pointer
//! and keyboard events to it, and receive field-map submissions through your
//! [`TextDest`].
//!
//! Malformed input never aborts processing: a bad element is logged (via the
//! [`log`] facade) and skipped, and the rest of the form still builds.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

// -------------------------------------------------------------------------------------------------

mod dsl;
pub use dsl::FORMSPEC_API_VERSION;

pub mod geometry;
pub mod inv;
pub mod style;

mod widget;
pub use widget::{
    FieldKind, FieldSpec, ListSpec, ScrollbarState, TableState, WidgetArena, WidgetId, WidgetKind,
    WidgetNode,
};

mod parse;
pub use parse::ElementError;

mod menu;
pub use menu::{
    FormSource, Menu, MenuColors, MenuSettings, QuitMode, SoundPlayer, StaticFormSource, TextDest,
    TextureRef, TextureSource,
};

mod interaction;
pub use interaction::{Key, PointerButton, PointerEvent, Response};
