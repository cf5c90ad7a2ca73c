use crate::style::Color;
use crate::view::{Initializable, Layoutable, Movable, NodeKey, Paint, Renderable, Sizeable, Styleable, WidgetTree};
use glam::Vec2;
use smol_str::SmolStr;

/// A named glyph drawn as a filled, optionally stroked, square.
#[derive(Debug, Clone)]
pub struct Icon {
    pub name: SmolStr,
    pub fill: Color,
    pub stroke: Color,
}

impl Default for Icon {
    fn default() -> Self {
        Self {
            name: SmolStr::default(),
            fill: Color::BLACK,
            stroke: Color::TRANSPARENT,
        }
    }
}

impl Icon {
    pub fn new(name: &str) -> Self {
        Self {
            name: SmolStr::new(name),
            ..Self::default()
        }
    }

    /// Returns true when the name changed.
    pub fn set_icon(&mut self, name: &str) -> bool {
        if self.name == name {
            return false;
        }
        self.name = SmolStr::new(name);
        true
    }
}

impl Initializable for Icon {}
impl Styleable for Icon {}

impl Sizeable for Icon {
    fn size(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.size_widget_base(key);
        let Some(font) = tree.node(key).map(|n| n.style.unit_ctx.font_size) else {
            return;
        };
        tree.size_from_wh(key, font, font);
    }
}

impl Layoutable for Icon {}

impl Renderable for Icon {
    fn render(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        if !tree.push_bounds(key) {
            return;
        }
        tree.render_std_box(key);
        if !self.name.is_empty()
            && let Some(node) = tree.node(key)
        {
            let spc = node.style.box_space();
            let opacity = node.style.opacity;
            let pos = node.obj_bbox.min.as_vec2() + Vec2::splat(spc);
            let size = node.obj_bbox.size().as_vec2() - Vec2::splat(2.0 * spc);
            let fill = self.fill.with_opacity(opacity);
            let stroke = self.stroke.with_opacity(opacity);
            let surface = tree.surface_mut();
            if !fill.is_none() {
                surface.fill_rect(pos, size, 0.0, Paint::Solid(fill));
            }
            if !stroke.is_none() {
                surface.stroke_rect(pos, size, 0.0, 1.0, Paint::Solid(stroke));
            }
        }
        tree.pop_bounds(key);
    }
}

impl Movable for Icon {}

crate::impl_widget!(Icon, "Icon");

#[cfg(test)]
mod tests {
    use super::Icon;

    #[test]
    fn set_icon_reports_change() {
        let mut icon = Icon::new("gear");
        assert!(!icon.set_icon("gear"));
        assert!(icon.set_icon("close"));
        assert_eq!(icon.name, "close");
    }
}
