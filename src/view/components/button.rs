use crate::view::{
    BBox, Initializable, Layoutable, Movable, NodeKey, Renderable, Sizeable, Styleable, WidgetTree,
    config_parts_icon_label,
};
use glam::IVec2;
use smol_str::SmolStr;

/// Push button drawing an optional icon and a label as its parts.
#[derive(Debug, Default, Clone)]
pub struct Button {
    pub text: String,
    pub icon: SmolStr,
}

impl Button {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            icon: SmolStr::default(),
        }
    }

    pub fn with_icon(icon: &str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            icon: SmolStr::new(icon),
        }
    }

    /// Changes the text and icon of the button at `key`; the parts are rebuilt
    /// on the next render.
    pub fn set_icon_text(tree: &mut WidgetTree, key: NodeKey, icon: &str, text: &str) -> bool {
        let Some(button) = tree.widget_mut::<Button>(key) else {
            return false;
        };
        button.icon = SmolStr::new(icon);
        button.text = text.to_string();
        let target = tree.parent(key).unwrap_or(key);
        tree.mark_full_rerender(target);
        true
    }

    fn config_parts(&self, tree: &mut WidgetTree, key: NodeKey) {
        if !tree.parts_need_update_icon_label(key, &self.icon, &self.text) {
            return;
        }
        let (specs, _, _) = config_parts_icon_label(&self.icon, &self.text);
        tree.config_parts(key, &specs);
        tree.config_parts_set_icon_label(key, &self.icon, &self.text);
    }
}

impl Initializable for Button {
    fn init(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.widget_mouse_events(key);
        tree.hover_tooltip_event(key);
        tree.init_widget_base(key);
    }
}

impl Styleable for Button {
    fn style(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.style_widget_base(key);
        self.config_parts(tree, key);
        tree.style_parts(key);
    }
}

impl Sizeable for Button {
    fn size(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        tree.size_widget_base(key);
        tree.size_from_parts(key);
    }
}

impl Layoutable for Button {
    fn layout(&mut self, tree: &mut WidgetTree, key: NodeKey, par_bbox: BBox) {
        tree.layout_widget_base(key, par_bbox, true);
        tree.layout_parts(key);
        tree.layout_children(key);
    }
}

impl Renderable for Button {
    fn render(&mut self, tree: &mut WidgetTree, key: NodeKey) {
        if tree.push_bounds(key) {
            tree.render_std_box(key);
            tree.render_parts(key);
            tree.render_children(key);
            tree.pop_bounds(key);
        }
    }
}

impl Movable for Button {
    fn move_by(&mut self, tree: &mut WidgetTree, key: NodeKey, delta: IVec2, par_bbox: BBox) {
        tree.move_widget_base(key, delta, par_bbox);
        tree.move_parts(key, delta);
        tree.move_children(key, delta);
    }
}

crate::impl_widget!(Button, "Button");
