//! The style cascade: `style[]` / `style_type[]` property sets and their
//! resolution into a final per-state style for one widget instance.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr as _;

use bitflags::bitflags;

use crate::dsl;

// -------------------------------------------------------------------------------------------------

/// A visual property a `style[]` directive may set.
///
/// Values are kept as uninterpreted strings; their meaning (colors, texture
/// names, pixel counts) belongs to the rendering collaborator.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, strum::EnumString)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum StyleProperty {
    #[strum(serialize = "alpha")]
    Alpha,
    #[strum(serialize = "bgcolor")]
    BgColor,
    #[strum(serialize = "bgimg")]
    BgImg,
    #[strum(serialize = "bgimg_middle")]
    BgImgMiddle,
    #[strum(serialize = "border")]
    Border,
    #[strum(serialize = "content_offset")]
    ContentOffset,
    #[strum(serialize = "fgimg")]
    FgImg,
    #[strum(serialize = "font")]
    Font,
    #[strum(serialize = "font_size")]
    FontSize,
    #[strum(serialize = "noclip")]
    NoClip,
    #[strum(serialize = "padding")]
    Padding,
    #[strum(serialize = "size")]
    Size,
    #[strum(serialize = "sound")]
    Sound,
    #[strum(serialize = "spacing")]
    Spacing,
    #[strum(serialize = "textcolor")]
    TextColor,
}

bitflags! {
    /// Interaction states a [`StyleSpec`] applies to.
    ///
    /// The empty set is the default state. Combinations ("hovered+pressed")
    /// are valid selectors.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct StyleState: u8 {
        /// Pointer is over the element.
        const HOVERED = 1 << 0;
        /// Element is being pressed/activated.
        const PRESSED = 1 << 1;
    }
}

/// A sparse property map plus the set of interaction states it applies to.
///
/// Multiple `StyleSpec`s combine with "later-defined overrides earlier, only
/// for properties actually set" ([`StyleSpec::merge_from`]).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StyleSpec {
    states: StyleState,
    props: BTreeMap<StyleProperty, String>,
}

impl StyleSpec {
    /// An empty spec applying to the default state.
    pub fn new(states: StyleState) -> Self {
        StyleSpec {
            states,
            props: BTreeMap::new(),
        }
    }

    /// The interaction states this spec applies to.
    pub fn states(&self) -> StyleState {
        self.states
    }

    /// Whether any property is set.
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Sets one property.
    pub fn set(&mut self, prop: StyleProperty, value: impl Into<String>) {
        self.props.insert(prop, value.into());
    }

    /// Returns the property's value if this spec sets it.
    pub fn get(&self, prop: StyleProperty) -> Option<&str> {
        self.props.get(&prop).map(String::as_str)
    }

    /// Overwrites `self`'s properties with those `other` explicitly sets.
    pub fn merge_from(&mut self, other: &StyleSpec) {
        for (&prop, value) in &other.props {
            self.props.insert(prop, value.clone());
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Where a `style[]` selector points.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum SelectorKind {
    /// `style_type[...]` — keyed by element type name.
    Type,
    /// `style[...]` — keyed by element instance name.
    Name,
}

/// Accumulated style tables for one form, rebuilt on every regeneration.
///
/// This is an explicit value owned by the menu, not process-global state, so
/// independent form instances never share styles.
#[derive(Debug, Default)]
pub struct Theme {
    by_type: HashMap<String, Vec<StyleSpec>>,
    by_name: HashMap<String, Vec<StyleSpec>>,
    /// Unknown property names already complained about; each distinct name
    /// is logged once per form.
    warned_properties: HashSet<String>,
}

impl Theme {
    /// Empties both tables, keeping allocations.
    pub fn clear(&mut self) {
        self.by_type.clear();
        self.by_name.clear();
        self.warned_properties.clear();
    }

    /// Parses one `style[...]`/`style_type[...]` argument string and appends
    /// the resulting specs to the matching table.
    ///
    /// `parts` are the `;`-separated arguments: a comma-separated selector
    /// list (each selector optionally suffixed `:state+state`), then
    /// `property=value` pairs. Returns `false` if the element was malformed
    /// enough to be discarded entirely.
    pub fn push_from_args(&mut self, kind: SelectorKind, parts: &[&str]) -> bool {
        if parts.len() < 2 {
            return false;
        }

        let mut spec = StyleSpec::default();
        // Legacy `*_hovered`/`*_pressed` property variants synthesize
        // separate per-state specs for backward compatibility.
        let mut hovered_spec = StyleSpec::new(StyleState::HOVERED);
        let mut pressed_spec = StyleSpec::new(StyleState::PRESSED);

        for pair in &parts[1..] {
            let Some((raw_name, raw_value)) = pair.split_once('=') else {
                log::error!("style property missing value: {pair:?}");
                return false;
            };
            let name = raw_name.trim().to_ascii_lowercase();
            let value = dsl::unescape(raw_value.trim()).into_owned();

            if let Some(base) = name.strip_suffix("_hovered") {
                if let Ok(prop) = StyleProperty::from_str(base) {
                    hovered_spec.set(prop, value);
                    continue;
                }
            }
            if let Some(base) = name.strip_suffix("_pressed") {
                if let Ok(prop) = StyleProperty::from_str(base) {
                    pressed_spec.set(prop, value);
                    continue;
                }
            }

            match StyleProperty::from_str(&name) {
                Ok(prop) => spec.set(prop, value),
                Err(_) => {
                    if self.warned_properties.insert(name.clone()) {
                        log::warn!("unknown style property {name:?}");
                    }
                }
            }
        }

        let mut any = false;
        for raw_selector in parts[0].split(',') {
            let raw_selector = raw_selector.trim();
            if raw_selector.is_empty() {
                log::error!("empty style selector");
                continue;
            }
            let (selector, states) = match raw_selector.split_once(':') {
                None => (raw_selector, StyleState::empty()),
                Some((sel, state_str)) => match parse_states(state_str) {
                    Some(states) => (sel.trim(), states),
                    None => {
                        log::error!("invalid style state in selector {raw_selector:?}");
                        continue;
                    }
                },
            };

            let table = match kind {
                SelectorKind::Type => &mut self.by_type,
                SelectorKind::Name => &mut self.by_name,
            };
            let entry = table.entry(selector.to_owned()).or_default();
            let mut spec = spec.clone();
            spec.states = states;
            entry.push(spec);
            if !hovered_spec.is_empty() {
                entry.push(hovered_spec.clone());
            }
            if !pressed_spec.is_empty() {
                entry.push(pressed_spec.clone());
            }
            any = true;
        }
        any
    }

    /// Resolves the cascade for one element.
    ///
    /// Layers in increasing priority: wildcard type, wildcard name, parent
    /// type, exact type, exact name; within a layer, declaration order.
    pub fn resolve(&self, ty: &str, name: &str, parent_ty: Option<&str>) -> ResolvedStyle {
        let mut layers: Vec<StyleSpec> = Vec::new();
        let mut extend = |source: &HashMap<String, Vec<StyleSpec>>, key: &str| {
            if let Some(specs) = source.get(key) {
                layers.extend(specs.iter().cloned());
            }
        };
        extend(&self.by_type, "*");
        extend(&self.by_name, "*");
        if let Some(parent) = parent_ty {
            extend(&self.by_type, parent);
        }
        extend(&self.by_type, ty);
        if !name.is_empty() {
            extend(&self.by_name, name);
        }
        ResolvedStyle { layers }
    }
}

fn parse_states(s: &str) -> Option<StyleState> {
    let mut states = StyleState::empty();
    for part in s.split('+') {
        match part.trim() {
            "default" => {}
            "hovered" => states |= StyleState::HOVERED,
            "pressed" => states |= StyleState::PRESSED,
            _ => return None,
        }
    }
    Some(states)
}

/// The outcome of [`Theme::resolve`]: the cascade flattened for one element,
/// still queryable per interaction state.
#[derive(Clone, Debug, Default)]
pub struct ResolvedStyle {
    layers: Vec<StyleSpec>,
}

impl ResolvedStyle {
    /// Merged spec for the given state: every layer whose state set is a
    /// subset of `state`, applied in priority order.
    pub fn state(&self, state: StyleState) -> StyleSpec {
        let mut merged = StyleSpec::new(state);
        for layer in &self.layers {
            if state.contains(layer.states) {
                merged.merge_from(layer);
            }
        }
        merged
    }

    /// Shorthand for a default-state property lookup.
    pub fn get(&self, prop: StyleProperty) -> Option<String> {
        self.state(StyleState::empty()).get(prop).map(str::to_owned)
    }

    /// Default-state boolean property, with fallback.
    pub fn get_bool(&self, prop: StyleProperty, fallback: bool) -> bool {
        self.get(prop)
            .and_then(|v| dsl::parse_bool(&v))
            .unwrap_or(fallback)
    }
}

// -------------------------------------------------------------------------------------------------
