use crate::view::{Initializable, Layoutable, Movable, NodeKey, Renderable, Sizeable, Styleable, WidgetTree};
use glam::Vec2;

/// Average glyph advance and line height as fractions of the font size.
const CHAR_WIDTH: f32 = 0.6;
const LINE_HEIGHT: f32 = 1.2;

/// A single line of text.
#[derive(Debug, Default, Clone)]
pub struct Label {
    pub text: String,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Replaces the text of the label at `key`. Returns false when `key` is
    /// not a label.
    pub fn set_text(tree: &mut WidgetTree, key: NodeKey, text: &str) -> bool {
        let Some(label) = tree.widget_mut::<Label>(key) else {
            return false;
        };
        if label.text != text {
            label.text = text.to_string();
            let target = tree.parent(key).unwrap_or(key);
            tree.mark_full_rerender(target);
        }
        true
    }

    pub fn text_size(&self, font_size: f32) -> Vec2 {
        let chars = self.text.chars().count() as f32;
        Vec2::new(chars * font_size * CHAR_WIDTH, font_size * LINE_HEIGHT)
    }
}

impl Initializable for Label {}
impl Styleable for Label {}

impl Sizeable for Label {
    fn size(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.size_widget_base(key);
        let Some(font) = tree.node(key).map(|n| n.style.unit_ctx.font_size) else {
            return;
        };
        let size = self.text_size(font);
        tree.size_from_wh(key, size.x, size.y);
    }
}

impl Layoutable for Label {}

impl Renderable for Label {
    fn render(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        if !tree.push_bounds(key) {
            return;
        }
        tree.render_std_box(key);
        if let Some(node) = tree.node(key) {
            let st = &node.style;
            let pos = node.obj_bbox.min.as_vec2() + Vec2::splat(st.box_space());
            let font = st.unit_ctx.font_size;
            let color = st.color.with_opacity(st.opacity);
            if !self.text.is_empty() && !color.is_none() {
                tree.surface_mut().draw_text(pos, &self.text, font, color);
            }
        }
        tree.pop_bounds(key);
    }
}

impl Movable for Label {}

crate::impl_widget!(Label, "Label");

#[cfg(test)]
mod tests {
    use super::Label;
    use crate::view::{DrawCommand, Frame, RecordingSurface, Viewport, WidgetTree};

    #[test]
    fn sizes_to_text_plus_padding() {
        let mut tree = WidgetTree::new(RecordingSurface::new(400, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let row = tree.add_child(root, Frame::row(), "row");
        let label = tree.add_child(row, Label::new("abcde"), "l");
        tree.render();
        let size = tree.node(label).map(|n| n.layout.size.pref).unwrap_or_default();
        // 5 chars * 12 * 0.6 plus 2px padding each side
        assert_eq!(size.x, 40.0);
        assert!((size.y - 18.4).abs() < 1e-4);
    }

    #[test]
    fn set_text_marks_parent_and_redraws() {
        let mut tree = WidgetTree::new(RecordingSurface::new(400, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let row = tree.add_child(root, Frame::row(), "row");
        let label = tree.add_child(row, Label::new("old"), "l");
        tree.render();
        assert!(Label::set_text(&mut tree, label, "new"));
        assert!(tree.node(row).is_some_and(|n| n.needs_full_rerender()));
        assert!(!Label::set_text(&mut tree, row, "x"));

        if let Some(s) = tree.surface_as_mut::<RecordingSurface>() {
            s.clear();
        }
        tree.render();
        let drew_new = tree.surface_as::<RecordingSurface>().is_some_and(|s| {
            s.commands()
                .iter()
                .any(|c| matches!(c, DrawCommand::Text { text, .. } if text == "new"))
        });
        assert!(drew_new);
    }
}
