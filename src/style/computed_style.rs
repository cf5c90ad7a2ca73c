use crate::style::color::Color;
use crate::style::units::{Axis, UnitContext, Value};
use smol_str::SmolStr;

/// Alignment of a child inside the space its container gives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Inline,
    Block,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderDrawStyle {
    #[default]
    Solid,
    Dotted,
    Dashed,
    Double,
    Groove,
    Ridge,
    Inset,
    Outset,
    None,
    Hidden,
}

impl BorderDrawStyle {
    pub fn is_drawn(self) -> bool {
        !matches!(self, BorderDrawStyle::None | BorderDrawStyle::Hidden)
    }
}

/// Size constraints and placement. A negative max means "stretch to fill".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutStyle {
    pub width: Value,
    pub height: Value,
    pub min_width: Value,
    pub min_height: Value,
    pub max_width: Value,
    pub max_height: Value,
    pub margin: Value,
    pub x: Value,
    pub y: Value,
    pub align_horiz: Align,
    pub align_vert: Align,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BorderStyle {
    pub style: BorderDrawStyle,
    pub width: Value,
    pub radius: Value,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadowStyle {
    pub h_offset: Value,
    pub v_offset: Value,
    pub blur: Value,
    pub spread: Value,
    pub color: Color,
    pub inset: bool,
}

impl ShadowStyle {
    pub fn has_shadow(&self) -> bool {
        self.h_offset.dots > 0.0 || self.v_offset.dots > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontStyle {
    pub size: Value,
    pub family: SmolStr,
    pub weight: u16,
    pub bg_color: Color,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            size: Value::px(12.0),
            family: SmolStr::default(),
            weight: 400,
            bg_color: Color::TRANSPARENT,
        }
    }
}

/// The resolved style snapshot of one node.
///
/// Lengths keep their declared unit; `dots` on each of them is only valid after
/// [`ComputedStyle::set_unit_context`] ran against the current viewport and
/// container size.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub resolved: bool,
    pub display: Display,
    pub visible: bool,
    pub unit_ctx: UnitContext,
    pub layout: LayoutStyle,
    pub border: BorderStyle,
    pub outline: BorderStyle,
    pub shadow: ShadowStyle,
    pub padding: Value,
    pub font: FontStyle,
    pub color: Color,
    pub opacity: f32,
    pub pointer_events: bool,
    pub inactive: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            resolved: false,
            display: Display::Inline,
            visible: true,
            unit_ctx: UnitContext::default(),
            layout: LayoutStyle::default(),
            border: BorderStyle {
                color: Color::BLACK,
                ..BorderStyle::default()
            },
            outline: BorderStyle {
                style: BorderDrawStyle::None,
                ..BorderStyle::default()
            },
            shadow: ShadowStyle::default(),
            padding: Value::ZERO,
            font: FontStyle::default(),
            color: Color::BLACK,
            opacity: 1.0,
            pointer_events: true,
            inactive: false,
        }
    }
}

impl ComputedStyle {
    /// Space taken on each side before content starts.
    pub fn box_space(&self) -> f32 {
        self.layout.margin.dots + self.padding.dots + self.border.width.dots
    }

    pub fn is_displayed(&self) -> bool {
        self.display != Display::None && self.visible
    }

    /// Re-anchors relative units against `vp` (surface size) and `el` (container
    /// size), then recomputes every cached dot value.
    pub fn set_unit_context(&mut self, vp: [f32; 2], el: [f32; 2]) {
        self.unit_ctx.set_sizes(vp, el);
        // em on font-size itself is relative to the base size
        self.unit_ctx.font_size = UnitContext::default().font_size;
        let font = self.font.size.to_dots(&self.unit_ctx, Axis::Vertical);
        self.unit_ctx.font_size = font;
        self.to_dots();
    }

    pub fn to_dots(&mut self) {
        use Axis::{Horizontal as H, Vertical as V};
        let ctx = self.unit_ctx;
        let l = &mut self.layout;
        l.width.to_dots(&ctx, H);
        l.height.to_dots(&ctx, V);
        l.min_width.to_dots(&ctx, H);
        l.min_height.to_dots(&ctx, V);
        l.max_width.to_dots(&ctx, H);
        l.max_height.to_dots(&ctx, V);
        l.margin.to_dots(&ctx, H);
        l.x.to_dots(&ctx, H);
        l.y.to_dots(&ctx, V);
        for border in [&mut self.border, &mut self.outline] {
            border.width.to_dots(&ctx, H);
            border.radius.to_dots(&ctx, H);
        }
        let s = &mut self.shadow;
        s.h_offset.to_dots(&ctx, H);
        s.v_offset.to_dots(&ctx, V);
        s.blur.to_dots(&ctx, H);
        s.spread.to_dots(&ctx, H);
        self.padding.to_dots(&ctx, H);
    }
}

#[cfg(test)]
mod tests {
    use super::ComputedStyle;
    use crate::style::units::{Unit, Value};

    #[test]
    fn box_space_sums_insets() {
        let mut style = ComputedStyle::default();
        style.layout.margin = Value::px(2.0);
        style.padding = Value::px(3.0);
        style.border.width = Value::px(1.0);
        style.set_unit_context([800.0, 600.0], [200.0, 100.0]);
        assert_eq!(style.box_space(), 6.0);
    }

    #[test]
    fn em_lengths_follow_font_size() {
        let mut style = ComputedStyle::default();
        style.font.size = Value::px(20.0);
        style.layout.width = Value::new(2.0, Unit::Em);
        style.layout.height = Value::new(50.0, Unit::Pct);
        style.set_unit_context([800.0, 600.0], [200.0, 100.0]);
        assert_eq!(style.layout.width.dots, 40.0);
        assert_eq!(style.layout.height.dots, 50.0);
    }
}
