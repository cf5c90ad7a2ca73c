use std::fmt;

/// Length units understood by the style snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    #[default]
    Px,
    /// Raw device dots, never scaled.
    Dot,
    Pt,
    Em,
    Ex,
    /// Percent of the containing element along the field's axis.
    Pct,
    Vw,
    Vh,
}

impl Unit {
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Dot => "dot",
            Unit::Pt => "pt",
            Unit::Em => "em",
            Unit::Ex => "ex",
            Unit::Pct => "%",
            Unit::Vw => "vw",
            Unit::Vh => "vh",
        }
    }
}

/// Which container dimension a `%` length is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A length with its unit and the cached dot value from the last unit pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Value {
    pub val: f32,
    pub unit: Unit,
    pub dots: f32,
}

impl Value {
    pub const ZERO: Value = Value {
        val: 0.0,
        unit: Unit::Px,
        dots: 0.0,
    };

    pub const fn new(val: f32, unit: Unit) -> Self {
        Self {
            val,
            unit,
            dots: val,
        }
    }

    pub const fn px(val: f32) -> Self {
        Self::new(val, Unit::Px)
    }

    pub const fn dot(val: f32) -> Self {
        Self::new(val, Unit::Dot)
    }

    /// Parses `12`, `12px`, `1.5em`, `50%` and friends. A bare number is px.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let split = raw
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(raw.len());
        let (num, suffix) = raw.split_at(split);
        let val = num.parse::<f32>().ok()?;
        let unit = match suffix.trim() {
            "" | "px" => Unit::Px,
            "dot" => Unit::Dot,
            "pt" => Unit::Pt,
            "em" => Unit::Em,
            "ex" => Unit::Ex,
            "%" | "pct" => Unit::Pct,
            "vw" => Unit::Vw,
            "vh" => Unit::Vh,
            _ => return None,
        };
        Some(Self::new(val, unit))
    }

    pub fn to_dots(&mut self, ctx: &UnitContext, axis: Axis) -> f32 {
        self.dots = self.val * ctx.dots_factor(self.unit, axis);
        self.dots
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.val, self.unit.suffix())
    }
}

/// Everything a relative unit needs to become dots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitContext {
    pub dpi: f32,
    /// Font size in dots.
    pub font_size: f32,
    pub vp_width: f32,
    pub vp_height: f32,
    pub el_width: f32,
    pub el_height: f32,
}

impl Default for UnitContext {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            font_size: 12.0,
            vp_width: 0.0,
            vp_height: 0.0,
            el_width: 0.0,
            el_height: 0.0,
        }
    }
}

impl UnitContext {
    pub fn set_sizes(&mut self, vp: [f32; 2], el: [f32; 2]) {
        self.vp_width = vp[0];
        self.vp_height = vp[1];
        self.el_width = el[0];
        self.el_height = el[1];
    }

    pub fn dots_factor(&self, unit: Unit, axis: Axis) -> f32 {
        match unit {
            Unit::Px => self.dpi / 96.0,
            Unit::Dot => 1.0,
            Unit::Pt => self.dpi / 72.0,
            Unit::Em => self.font_size,
            Unit::Ex => self.font_size * 0.5,
            Unit::Pct => match axis {
                Axis::Horizontal => self.el_width * 0.01,
                Axis::Vertical => self.el_height * 0.01,
            },
            Unit::Vw => self.vp_width * 0.01,
            Unit::Vh => self.vp_height * 0.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Axis, Unit, UnitContext, Value};

    #[test]
    fn parse_reads_suffixes() {
        assert_eq!(Value::parse("12"), Some(Value::px(12.0)));
        assert_eq!(Value::parse("-1px"), Some(Value::px(-1.0)));
        assert_eq!(Value::parse("1.5em").map(|v| v.unit), Some(Unit::Em));
        assert_eq!(Value::parse("50%").map(|v| v.unit), Some(Unit::Pct));
        assert_eq!(Value::parse("wide"), None);
        assert_eq!(Value::parse("3parsecs"), None);
    }

    #[test]
    fn percent_follows_axis() {
        let mut ctx = UnitContext::default();
        ctx.set_sizes([800.0, 600.0], [200.0, 100.0]);
        let mut v = Value::new(50.0, Unit::Pct);
        assert_eq!(v.to_dots(&ctx, Axis::Horizontal), 100.0);
        assert_eq!(v.to_dots(&ctx, Axis::Vertical), 50.0);
        let mut vw = Value::new(10.0, Unit::Vw);
        assert_eq!(vw.to_dots(&ctx, Axis::Vertical), 80.0);
    }
}
