use super::{NodeFlags, NodeKey, Widget, WidgetTree};
use crate::style::Props;
use crate::view::{Frame, Icon, Label, Space};
use glam::{IVec2, Vec2};

/// One entry of a parts configuration: the widget kind and the name its
/// `#name` style selector is looked up under.
#[derive(Clone, Copy)]
pub struct PartSpec {
    pub type_name: &'static str,
    pub name: &'static str,
    pub make: fn() -> Box<dyn Widget>,
}

impl std::fmt::Debug for PartSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartSpec")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .finish()
    }
}

impl PartSpec {
    pub const ICON: PartSpec = PartSpec {
        type_name: "Icon",
        name: "icon",
        make: || Box::new(Icon::default()),
    };
    pub const SPACE: PartSpec = PartSpec {
        type_name: "Space",
        name: "space",
        make: || Box::new(Space),
    };
    pub const LABEL: PartSpec = PartSpec {
        type_name: "Label",
        name: "label",
        make: || Box::new(Label::default()),
    };
}

impl WidgetTree {
    /// The owner's parts root, created on first use. It is parented to the
    /// owner but is not one of its children.
    pub fn ensure_parts(&mut self, key: NodeKey) -> Option<NodeKey> {
        let node = self.nodes.get(key)?;
        if let Some(parts) = node.parts {
            return Some(parts);
        }
        let parts = self.insert_node(None, None, Box::new(Frame::row()), "parts", false);
        if let Some(p) = self.nodes.get_mut(parts) {
            p.parent = Some(key);
            p.flags.insert(NodeFlags::PART_ROOT);
        }
        if let Some(owner) = self.nodes.get_mut(key) {
            owner.parts = Some(parts);
        }
        Some(parts)
    }

    /// Makes the parts match `specs`. Returns true when they had to be rebuilt.
    pub fn config_parts(&mut self, key: NodeKey, specs: &[PartSpec]) -> bool {
        let Some(parts) = self.ensure_parts(key) else {
            return false;
        };
        let current: Vec<(&'static str, &str)> = self
            .children(parts)
            .iter()
            .filter_map(|&c| self.nodes.get(c))
            .map(|n| (n.type_name, n.name.as_str()))
            .collect();
        let same = current.len() == specs.len()
            && current
                .iter()
                .zip(specs)
                .all(|(&(ty, name), spec)| ty == spec.type_name && name == spec.name);
        if same {
            return false;
        }
        for child in self.children(parts).to_vec() {
            self.remove(child);
        }
        for spec in specs {
            self.insert_node(Some(parts), None, (spec.make)(), spec.name, false);
        }
        true
    }

    pub fn part_child(&self, key: NodeKey, name: &str) -> Option<NodeKey> {
        let parts = self.nodes.get(key)?.parts?;
        self.child_by_name(parts, name)
    }

    pub fn part_children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.nodes
            .get(key)
            .and_then(|n| n.parts)
            .map(|p| self.children(p).to_vec())
            .unwrap_or_default()
    }

    /// Gives `part` its default style from the owner type's `#name` selector,
    /// stacked on the part type's own default. The part's props are rebuilt
    /// from the owner's `#name` map each time. Icons also pick up `fill` and
    /// `stroke` from the owner's `#icon` maps.
    pub fn style_part(&mut self, owner: NodeKey, part: NodeKey) {
        let Some(owner_node) = self.nodes.get(owner) else {
            return;
        };
        let owner_type = owner_node.type_name;
        let Some(part_node) = self.nodes.get(part) else {
            return;
        };
        let selector = format!("#{}", part_node.name);
        let instance = owner_node.sub_props.get(selector.as_str()).cloned();
        if part_node.def_style.is_none() || self.resolver.cache.rebuild_defaults {
            let part_type = part_node.type_name;
            let def = self.resolver.default_style(owner_type, &selector, Some(part_type));
            if let Some(p) = self.nodes.get_mut(part) {
                p.def_style = Some(def);
            }
        }
        if let Some(p) = self.nodes.get_mut(part) {
            p.props = instance.clone().unwrap_or_default();
        }

        if selector != "#icon" {
            return;
        }
        let mut icon_props = Props::new();
        if let Some(sub) = self.resolver.registry.get(owner_type).and_then(|t| t.sub("#icon")) {
            icon_props.extend(sub);
        }
        if let Some(sub) = &instance {
            icon_props.extend(sub);
        }
        let color = |k: &str| icon_props.get(k).and_then(|v| v.to_color(k).ok());
        let (fill, stroke) = (color("fill"), color("stroke"));
        if let Some(icon) = self.widget_mut::<Icon>(part) {
            if let Some(fill) = fill {
                icon.fill = fill;
            }
            if let Some(stroke) = stroke {
                icon.stroke = stroke;
            }
        }
    }

    /// Parts root plus every part.
    pub fn style_parts(&mut self, key: NodeKey) {
        let Some(parts) = self.nodes.get(key).and_then(|n| n.parts) else {
            return;
        };
        self.style_part(key, parts);
        for part in self.children(parts).to_vec() {
            self.style_part(key, part);
        }
    }

    /// Content size from the parts' preferred size plus the owner's box space.
    pub fn size_from_parts(&mut self, key: NodeKey) {
        let Some(pref) = self
            .nodes
            .get(key)
            .and_then(|n| n.parts)
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.layout.size.pref)
        else {
            return;
        };
        self.size_from_wh(key, pref.x, pref.y);
    }

    /// Places the parts root over the owner's content area and lays it out.
    pub fn layout_parts(&mut self, key: NodeKey) {
        let Some(owner) = self.nodes.get(key) else {
            return;
        };
        let Some(parts) = owner.parts else {
            return;
        };
        let spc = owner.style.box_space();
        let pos = owner.layout.alloc_pos + Vec2::splat(spc);
        let size = (owner.layout.alloc_size - Vec2::splat(2.0 * spc)).max(Vec2::ZERO);
        let par_bbox = self.children_bbox(key);
        if let Some(p) = self.nodes.get_mut(parts) {
            p.layout.alloc_pos = pos;
            p.layout.alloc_size = size;
        }
        self.layout_node(parts, par_bbox);
    }

    pub fn render_parts(&mut self, key: NodeKey) {
        if let Some(parts) = self.nodes.get(key).and_then(|n| n.parts) {
            self.render_node(parts);
        }
    }

    pub fn move_parts(&mut self, key: NodeKey, delta: IVec2) {
        if let Some(parts) = self.nodes.get(key).and_then(|n| n.parts) {
            let par_bbox = self.children_bbox(key);
            self.move_node(parts, delta, par_bbox);
        }
    }

    /// Sets the icon name and label text on parts built from
    /// [`config_parts_icon_label`].
    pub fn config_parts_set_icon_label(&mut self, key: NodeKey, icon: &str, text: &str) {
        if let Some(part) = self.part_child(key, PartSpec::ICON.name)
            && let Some(w) = self.widget_mut::<Icon>(part)
        {
            w.set_icon(icon);
        }
        if let Some(part) = self.part_child(key, PartSpec::LABEL.name)
            && let Some(w) = self.widget_mut::<Label>(part)
        {
            w.text = text.to_string();
        }
    }

    /// Whether the parts still show a different icon or text than requested.
    pub fn parts_need_update_icon_label(&self, key: NodeKey, icon: &str, text: &str) -> bool {
        let Some(parts) = self.nodes.get(key).and_then(|n| n.parts) else {
            return true;
        };
        let (want, _, _) = config_parts_icon_label(icon, text);
        let have: Vec<&str> = self
            .children(parts)
            .iter()
            .filter_map(|&c| self.nodes.get(c))
            .map(|n| n.name.as_str())
            .collect();
        if have.len() != want.len() || have.iter().zip(&want).any(|(h, w)| *h != w.name) {
            return true;
        }
        let icon_differs = self
            .part_child(key, PartSpec::ICON.name)
            .and_then(|p| self.widget::<Icon>(p))
            .is_some_and(|w| w.name != icon);
        let text_differs = self
            .part_child(key, PartSpec::LABEL.name)
            .and_then(|p| self.widget::<Label>(p))
            .is_some_and(|w| w.text != text);
        icon_differs || text_differs
    }
}

/// Standard icon + label parts: an icon when `icon` is set, a label when
/// `text` is set, and a space between them when both are. Also returns the
/// positions of the icon and the label.
pub fn config_parts_icon_label(icon: &str, text: &str) -> (Vec<PartSpec>, Option<usize>, Option<usize>) {
    let mut specs = Vec::with_capacity(3);
    let mut icon_idx = None;
    let mut label_idx = None;
    if !icon.is_empty() {
        icon_idx = Some(specs.len());
        specs.push(PartSpec::ICON);
        if !text.is_empty() {
            specs.push(PartSpec::SPACE);
        }
    }
    if !text.is_empty() {
        label_idx = Some(specs.len());
        specs.push(PartSpec::LABEL);
    }
    (specs, icon_idx, label_idx)
}

#[cfg(test)]
mod tests {
    use super::{PartSpec, config_parts_icon_label};
    use crate::style::{Color, Props, TypeProps};
    use crate::view::{Button, Icon, Label, RecordingSurface, Viewport, WidgetTree};

    #[test]
    fn icon_label_layouts() {
        let (specs, icon, label) = config_parts_icon_label("gear", "Settings");
        let names: Vec<&str> = specs.iter().map(|s| s.name).collect();
        assert_eq!(names, ["icon", "space", "label"]);
        assert_eq!((icon, label), (Some(0), Some(2)));

        let (specs, icon, label) = config_parts_icon_label("", "Ok");
        assert_eq!(specs.len(), 1);
        assert_eq!((icon, label), (None, Some(0)));
        assert!(config_parts_icon_label("", "").0.is_empty());
    }

    #[test]
    fn config_parts_only_rebuilds_on_change() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let (specs, _, _) = config_parts_icon_label("gear", "Go");
        assert!(tree.config_parts(root, &specs));
        let first = tree.part_children(root);
        assert!(!tree.config_parts(root, &specs));
        assert_eq!(tree.part_children(root), first);
        assert!(tree.config_parts(root, &[PartSpec::LABEL]));
        assert_eq!(tree.part_children(root).len(), 1);
        assert!(first.iter().all(|&k| !tree.contains(k)));
    }

    #[test]
    fn parts_are_not_children_and_die_with_owner() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let button = tree.add_child(root, Button::with_icon("gear", "Go"), "go");
        tree.render();
        assert!(tree.children(button).is_empty());
        let label = tree.part_child(button, "label");
        assert!(label.is_some_and(|l| tree.widget::<Label>(l).is_some_and(|w| w.text == "Go")));
        assert!(!tree.parts_need_update_icon_label(button, "gear", "Go"));
        assert!(tree.parts_need_update_icon_label(button, "gear", "Stop"));

        let parts = tree.node(button).and_then(|n| n.parts());
        tree.remove(button);
        assert!(parts.is_some_and(|p| !tree.contains(p)));
        assert!(label.is_some_and(|l| !tree.contains(l)));
    }

    #[test]
    fn icon_part_takes_fill_from_owner_maps() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 100));
        tree.registry_mut().register(
            "Button",
            TypeProps::new(Props::new()).with_sub("#icon", Props::new().with("fill", "#ff0000").with("stroke", "#00ff00")),
        );
        let root = tree.set_root(Viewport::new(), "root");
        let button = tree.add_child(root, Button::with_icon("gear", "Go"), "go");
        tree.set_sub_prop(button, "#icon", "stroke", "#0000ff");
        tree.render();

        let icon = tree.part_child(button, "icon").and_then(|k| tree.widget::<Icon>(k));
        assert_eq!(icon.map(|i| i.fill), Some(Color::rgb(255, 0, 0)));
        assert_eq!(icon.map(|i| i.stroke), Some(Color::rgb(0, 0, 255)));
    }

    #[test]
    fn removed_owner_sub_prop_leaves_the_part() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let button = tree.add_child(root, Button::new("Go"), "go");
        tree.set_sub_prop(button, "#label", "opacity", 0.5);
        tree.render();
        let label = tree.part_child(button, "label");
        let opacity = |tree: &WidgetTree| label.and_then(|l| tree.node(l)).map(|n| n.style.opacity);
        assert_eq!(opacity(&tree), Some(0.5));

        tree.remove_sub_prop(button, "#label", "opacity");
        tree.render();
        assert_eq!(opacity(&tree), Some(1.0));
        assert!(label.and_then(|l| tree.node(l)).is_some_and(|n| !n.props.contains("opacity")));
    }

    #[test]
    fn part_label_sits_inside_owner() {
        let mut tree = WidgetTree::new(RecordingSurface::new(200, 100));
        let root = tree.set_root(Viewport::new(), "root");
        let button = tree.add_child(root, Button::new("Press"), "press");
        tree.render();
        let outer = tree.node(button).map(|n| n.vp_bbox).unwrap_or_default();
        let inner = tree
            .part_child(button, "label")
            .and_then(|l| tree.node(l))
            .map(|n| n.vp_bbox)
            .unwrap_or_default();
        assert!(!inner.is_empty());
        assert_eq!(inner.intersect(&outer), inner);
    }
}
