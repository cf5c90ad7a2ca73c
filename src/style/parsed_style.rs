use crate::error::StyleParseError;
use crate::style::color::Color;
use crate::style::computed_style::{Align, BorderDrawStyle, ComputedStyle, Display};
use crate::style::units::Value;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// A loosely typed property value, as found in property maps.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(SmolStr),
    Number(f32),
    Bool(bool),
    Length(Value),
    Color(Color),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn to_length(&self, key: &str) -> Result<Value, StyleParseError> {
        match self {
            PropValue::Length(v) => Ok(*v),
            PropValue::Number(n) => Ok(Value::px(*n)),
            PropValue::Str(s) => Value::parse(s).ok_or_else(|| StyleParseError::new(key, s, "a length")),
            other => Err(StyleParseError::new(key, other, "a length")),
        }
    }

    pub fn to_color(&self, key: &str) -> Result<Color, StyleParseError> {
        match self {
            PropValue::Color(c) => Ok(*c),
            PropValue::Str(s) => Color::parse(s).ok_or_else(|| StyleParseError::new(key, s, "a color")),
            other => Err(StyleParseError::new(key, other, "a color")),
        }
    }

    pub fn to_f32(&self, key: &str) -> Result<f32, StyleParseError> {
        match self {
            PropValue::Number(n) => Ok(*n),
            PropValue::Length(v) => Ok(v.val),
            PropValue::Str(s) => s
                .trim()
                .parse::<f32>()
                .map_err(|_| StyleParseError::new(key, s, "a number")),
            other => Err(StyleParseError::new(key, other, "a number")),
        }
    }

    pub fn to_bool(&self, key: &str) -> Result<bool, StyleParseError> {
        match self {
            PropValue::Bool(b) => Ok(*b),
            PropValue::Number(n) => Ok(*n != 0.0),
            PropValue::Str(s) => match s.trim() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(StyleParseError::new(key, s, "a boolean")),
            },
            other => Err(StyleParseError::new(key, other, "a boolean")),
        }
    }

    pub fn to_smol_str(&self, key: &str) -> Result<SmolStr, StyleParseError> {
        match self {
            PropValue::Str(s) => Ok(s.clone()),
            other => Err(StyleParseError::new(key, other, "a string")),
        }
    }

    pub fn to_keyword<K: Keyword>(&self, key: &str) -> Result<K, StyleParseError> {
        self.as_str()
            .and_then(|s| K::from_keyword(s.trim()))
            .ok_or_else(|| StyleParseError::new(key, self, K::EXPECTED))
    }

    fn to_font_weight(&self, key: &str) -> Result<u16, StyleParseError> {
        match self.as_str().map(str::trim) {
            Some("normal") => Ok(400),
            Some("bold") => Ok(700),
            Some("lighter") => Ok(300),
            Some("bolder") => Ok(800),
            _ => self
                .to_f32(key)
                .map(|w| w.clamp(100.0, 900.0) as u16),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(SmolStr::new(value))
    }
}

impl From<f32> for PropValue {
    fn from(value: f32) -> Self {
        PropValue::Number(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        PropValue::Length(value)
    }
}

impl From<Color> for PropValue {
    fn from(value: Color) -> Self {
        PropValue::Color(value)
    }
}

/// Enumerations settable from a keyword string.
pub trait Keyword: Sized {
    const EXPECTED: &'static str;
    fn from_keyword(raw: &str) -> Option<Self>;
}

impl Keyword for Align {
    const EXPECTED: &'static str = "left, top, center, right or bottom";

    fn from_keyword(raw: &str) -> Option<Self> {
        match raw {
            "left" | "top" | "start" => Some(Align::Start),
            "center" | "middle" => Some(Align::Center),
            "right" | "bottom" | "end" => Some(Align::End),
            _ => None,
        }
    }
}

impl Keyword for Display {
    const EXPECTED: &'static str = "inline, block or none";

    fn from_keyword(raw: &str) -> Option<Self> {
        match raw {
            "inline" => Some(Display::Inline),
            "block" => Some(Display::Block),
            "none" => Some(Display::None),
            _ => None,
        }
    }
}

impl Keyword for BorderDrawStyle {
    const EXPECTED: &'static str = "a border style";

    fn from_keyword(raw: &str) -> Option<Self> {
        Some(match raw {
            "solid" => BorderDrawStyle::Solid,
            "dotted" => BorderDrawStyle::Dotted,
            "dashed" => BorderDrawStyle::Dashed,
            "double" => BorderDrawStyle::Double,
            "groove" => BorderDrawStyle::Groove,
            "ridge" => BorderDrawStyle::Ridge,
            "inset" => BorderDrawStyle::Inset,
            "outset" => BorderDrawStyle::Outset,
            "none" => BorderDrawStyle::None,
            "hidden" => BorderDrawStyle::Hidden,
            _ => return None,
        })
    }
}

/// A string-keyed property map. Unknown keys are carried but ignored by styling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: FxHashMap<SmolStr, PropValue>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<PropValue>) -> Option<PropValue> {
        self.entries.insert(SmolStr::new(key), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &PropValue)> {
        self.entries.iter()
    }

    pub fn extend(&mut self, other: &Props) {
        for (k, v) in other.iter() {
            self.entries.insert(k.clone(), v.clone());
        }
    }
}

impl<const N: usize> From<[(&str, PropValue); N]> for Props {
    fn from(value: [(&str, PropValue); N]) -> Self {
        let mut props = Props::new();
        for (k, v) in value {
            props.set(k, v);
        }
        props
    }
}

pub type SetFn = fn(&mut ComputedStyle, &PropValue) -> Result<(), StyleParseError>;
pub type CopyFn = fn(&mut ComputedStyle, &ComputedStyle);

/// One row of the property table: a key, its setter and a field copier.
pub struct PropertyDef {
    pub key: &'static str,
    pub inherit: bool,
    /// Changing this property moves or resizes the node.
    pub affects_layout: bool,
    pub set: SetFn,
    pub copy: CopyFn,
}

macro_rules! property {
    ($key:literal, $($field:ident).+, $conv:ident, inherit: $inherit:expr, layout: $layout:expr) => {
        PropertyDef {
            key: $key,
            inherit: $inherit,
            affects_layout: $layout,
            set: {
                fn set(s: &mut ComputedStyle, v: &PropValue) -> Result<(), StyleParseError> {
                    s.$($field).+ = v.$conv($key)?;
                    Ok(())
                }
                set
            },
            copy: {
                fn copy(s: &mut ComputedStyle, from: &ComputedStyle) {
                    s.$($field).+ = from.$($field).+.clone();
                }
                copy
            },
        }
    };
}

static PROPERTIES: &[PropertyDef] = &[
    property!("display", display, to_keyword, inherit: false, layout: true),
    property!("visible", visible, to_bool, inherit: false, layout: true),
    property!("width", layout.width, to_length, inherit: false, layout: true),
    property!("height", layout.height, to_length, inherit: false, layout: true),
    property!("min-width", layout.min_width, to_length, inherit: false, layout: true),
    property!("min-height", layout.min_height, to_length, inherit: false, layout: true),
    property!("max-width", layout.max_width, to_length, inherit: false, layout: true),
    property!("max-height", layout.max_height, to_length, inherit: false, layout: true),
    property!("margin", layout.margin, to_length, inherit: false, layout: true),
    property!("x", layout.x, to_length, inherit: false, layout: true),
    property!("y", layout.y, to_length, inherit: false, layout: true),
    property!("align-horiz", layout.align_horiz, to_keyword, inherit: false, layout: true),
    property!("align-vert", layout.align_vert, to_keyword, inherit: false, layout: true),
    property!("border-style", border.style, to_keyword, inherit: false, layout: false),
    property!("border-width", border.width, to_length, inherit: false, layout: true),
    property!("border-radius", border.radius, to_length, inherit: false, layout: false),
    property!("border-color", border.color, to_color, inherit: false, layout: false),
    property!("outline-style", outline.style, to_keyword, inherit: false, layout: false),
    property!("outline-width", outline.width, to_length, inherit: false, layout: false),
    property!("outline-radius", outline.radius, to_length, inherit: false, layout: false),
    property!("outline-color", outline.color, to_color, inherit: false, layout: false),
    property!("box-shadow.h-offset", shadow.h_offset, to_length, inherit: false, layout: false),
    property!("box-shadow.v-offset", shadow.v_offset, to_length, inherit: false, layout: false),
    property!("box-shadow.blur", shadow.blur, to_length, inherit: false, layout: false),
    property!("box-shadow.spread", shadow.spread, to_length, inherit: false, layout: false),
    property!("box-shadow.color", shadow.color, to_color, inherit: false, layout: false),
    property!("box-shadow.inset", shadow.inset, to_bool, inherit: false, layout: false),
    property!("padding", padding, to_length, inherit: false, layout: true),
    property!("font-size", font.size, to_length, inherit: false, layout: true),
    property!("font-family", font.family, to_smol_str, inherit: true, layout: true),
    property!("font-weight", font.weight, to_font_weight, inherit: true, layout: true),
    property!("background-color", font.bg_color, to_color, inherit: false, layout: false),
    property!("color", color, to_color, inherit: true, layout: false),
    property!("opacity", opacity, to_f32, inherit: false, layout: false),
    property!("pointer-events", pointer_events, to_bool, inherit: false, layout: false),
    property!("inactive", inactive, to_bool, inherit: false, layout: false),
];

static PROPERTY_INDEX: Lazy<FxHashMap<&'static str, usize>> = Lazy::new(|| {
    PROPERTIES
        .iter()
        .enumerate()
        .map(|(i, def)| (def.key, i))
        .collect()
});

pub fn properties() -> &'static [PropertyDef] {
    PROPERTIES
}

pub fn property(key: &str) -> Option<&'static PropertyDef> {
    PROPERTY_INDEX.get(key).map(|&i| &PROPERTIES[i])
}

/// Whether setting `key` can change a node's size or position.
pub fn affects_layout(key: &str) -> bool {
    property(key).is_some_and(|def| def.affects_layout)
}

/// Copies every inheritable field from `parent`.
pub fn inherit_fields(style: &mut ComputedStyle, parent: &ComputedStyle) {
    for def in PROPERTIES.iter().filter(|def| def.inherit) {
        (def.copy)(style, parent);
    }
}

/// Applies `props` to `style` in table order.
///
/// `"inherit"` copies the parent's value (when there is a parent) and `"initial"`
/// copies from `defaults`, falling back to the blank style. Values that fail to
/// convert are logged and leave the field untouched.
pub fn apply_props(
    style: &mut ComputedStyle,
    parent: Option<&ComputedStyle>,
    defaults: Option<&ComputedStyle>,
    props: &Props,
) {
    if props.is_empty() {
        return;
    }
    for def in PROPERTIES {
        let Some(value) = props.get(def.key) else {
            continue;
        };
        match value.as_str().map(str::trim) {
            Some("inherit") => {
                if let Some(parent) = parent {
                    (def.copy)(style, parent);
                }
                continue;
            }
            Some("initial") => {
                match defaults {
                    Some(defaults) => (def.copy)(style, defaults),
                    None => (def.copy)(style, &ComputedStyle::default()),
                }
                continue;
            }
            _ => {}
        }
        if let Err(err) = (def.set)(style, value) {
            log::warn!(target: "trellis::style", "{err}");
        }
    }
}
