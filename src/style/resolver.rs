use crate::style::computed_style::ComputedStyle;
use crate::style::parsed_style::{Props, apply_props, inherit_fields};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::rc::Rc;

/// Style rules attached to a node: `(selector, props)` in declaration order.
///
/// A selector matches a node by type name, `.class` or `#name`. Rules attached
/// to an ancestor apply to the whole subtree.
pub type StyleSheet = Vec<(SmolStr, Props)>;

/// Compiled defaults for one widget type.
///
/// `sub` holds selector-scoped maps: `#part` for parts owned by this type,
/// `.class` for class rules and `:state` for pseudo-states.
#[derive(Debug, Clone, Default)]
pub struct TypeProps {
    pub base: Props,
    sub: FxHashMap<SmolStr, Props>,
}

impl TypeProps {
    pub fn new(base: Props) -> Self {
        Self {
            base,
            sub: FxHashMap::default(),
        }
    }

    pub fn with_sub(mut self, selector: &str, props: Props) -> Self {
        self.sub.insert(SmolStr::new(selector), props);
        self
    }

    pub fn sub(&self, selector: &str) -> Option<&Props> {
        self.sub.get(selector)
    }

    pub fn sub_mut(&mut self, selector: &str) -> &mut Props {
        self.sub.entry(SmolStr::new(selector)).or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: FxHashMap<SmolStr, TypeProps>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: &str, props: TypeProps) {
        self.types.insert(SmolStr::new(type_name), props);
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeProps> {
        self.types.get(type_name)
    }

    pub fn get_mut(&mut self, type_name: &str) -> Option<&mut TypeProps> {
        self.types.get_mut(type_name)
    }

    fn sub(&self, type_name: &str, selector: &str) -> Option<&Props> {
        self.get(type_name).and_then(|t| t.sub(selector))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DefaultKey {
    type_name: SmolStr,
    selector: SmolStr,
    part_type: Option<SmolStr>,
}

#[derive(Debug, Default)]
pub struct StyleCache {
    pub rebuild_defaults: bool,
    entries: FxHashMap<DefaultKey, Rc<ComputedStyle>>,
    computed: usize,
}

impl StyleCache {
    pub fn new(rebuild_defaults: bool) -> Self {
        Self {
            rebuild_defaults,
            ..Self::default()
        }
    }

    /// How many defaults have been computed (not served from cache).
    pub fn computed_count(&self) -> usize {
        self.computed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The default style of `type_name` under `selector`.
    ///
    /// With a selector, the plain default (of `part_type` when given, else of
    /// `type_name`) is the base and the selector map of `type_name` stacks on top.
    /// Defaults never see a parent style, so the result only depends on the
    /// registry.
    pub fn default_style(
        &mut self,
        registry: &TypeRegistry,
        type_name: &str,
        selector: &str,
        part_type: Option<&str>,
    ) -> Rc<ComputedStyle> {
        let key = DefaultKey {
            type_name: SmolStr::new(type_name),
            selector: SmolStr::new(selector),
            part_type: part_type.map(SmolStr::new),
        };
        if !self.rebuild_defaults
            && let Some(hit) = self.entries.get(&key)
        {
            return hit.clone();
        }

        let mut computed = if selector.is_empty() {
            let mut style = ComputedStyle::default();
            if let Some(t) = registry.get(type_name) {
                apply_props(&mut style, None, None, &t.base);
            }
            style
        } else {
            let base = self.default_style(registry, part_type.unwrap_or(type_name), "", None);
            let mut style = (*base).clone();
            if let Some(sub) = registry.sub(type_name, selector) {
                apply_props(&mut style, None, Some(&base), sub);
            }
            style
        };

        computed.resolved = false;
        self.computed += 1;
        let computed = Rc::new(computed);
        self.entries.insert(key, computed.clone());
        computed
    }
}

/// Everything needed to resolve one node's style.
#[derive(Debug, Clone, Copy)]
pub struct StyleRequest<'a> {
    pub type_name: &'a str,
    /// Pseudo-state selector such as `:hover`, empty for none.
    pub state: &'a str,
    pub name: &'a str,
    /// Whitespace-separated class list.
    pub class: &'a str,
    pub parent: Option<&'a ComputedStyle>,
    pub props: &'a Props,
    /// Style sheets from the root down to this node.
    pub css: &'a [&'a StyleSheet],
    /// Default handed down by the owning widget when this node is a part.
    pub part_default: Option<&'a ComputedStyle>,
}

/// Merges type defaults, inherited values, instance props, class rules and
/// attached style sheets into a snapshot.
#[derive(Debug, Default)]
pub struct StyleResolver {
    pub registry: TypeRegistry,
    pub cache: StyleCache,
}

impl StyleResolver {
    pub fn new(registry: TypeRegistry, rebuild_defaults: bool) -> Self {
        Self {
            registry,
            cache: StyleCache::new(rebuild_defaults),
        }
    }

    pub fn default_style(&mut self, type_name: &str, selector: &str, part_type: Option<&str>) -> Rc<ComputedStyle> {
        self.cache
            .default_style(&self.registry, type_name, selector, part_type)
    }

    /// Inheritable fields always follow the parent; only the instance props,
    /// class rules, style sheets and `initial` override them.
    pub fn resolve(&mut self, req: &StyleRequest<'_>) -> ComputedStyle {
        let cached;
        let def: &ComputedStyle = match req.part_default {
            Some(part) if !self.cache.rebuild_defaults => part,
            _ => {
                cached = self.default_style(req.type_name, req.state, None);
                &*cached
            }
        };

        let mut style = def.clone();
        style.resolved = false;
        if let Some(parent) = req.parent {
            inherit_fields(&mut style, parent);
        }
        apply_props(&mut style, req.parent, Some(def), req.props);

        for class in req.class.split_whitespace() {
            let selector = format!(".{class}");
            if let Some(sub) = self.registry.sub(req.type_name, &selector) {
                apply_props(&mut style, req.parent, Some(def), sub);
            }
        }

        for sheet in req.css {
            for (selector, props) in sheet.iter() {
                if selector_matches(selector, req) {
                    apply_props(&mut style, req.parent, Some(def), props);
                }
            }
        }

        style.resolved = true;
        style
    }
}

fn selector_matches(selector: &str, req: &StyleRequest<'_>) -> bool {
    if let Some(class) = selector.strip_prefix('.') {
        req.class.split_whitespace().any(|c| c == class)
    } else if let Some(name) = selector.strip_prefix('#') {
        name.eq_ignore_ascii_case(req.name)
    } else {
        selector == req.type_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::color::Color;
    use crate::style::units::Value;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(
            "Button",
            TypeProps::new(Props::new().with("padding", 4.0).with("color", "#00f"))
                .with_sub(":hover", Props::new().with("background-color", "#eee"))
                .with_sub("#label", Props::new().with("margin", 1.0))
                .with_sub(".primary", Props::new().with("border-width", 2.0)),
        );
        registry.register("Label", TypeProps::new(Props::new().with("padding", 2.0)));
        registry
    }

    fn request<'a>(props: &'a Props, parent: Option<&'a ComputedStyle>) -> StyleRequest<'a> {
        StyleRequest {
            type_name: "Label",
            state: "",
            name: "lbl",
            class: "",
            parent,
            props,
            css: &[],
            part_default: None,
        }
    }

    #[test]
    fn default_is_cached_until_rebuild() {
        let reg = registry();
        let mut cache = StyleCache::new(false);
        let a = cache.default_style(&reg, "Button", "", None);
        let b = cache.default_style(&reg, "Button", "", None);
        assert_eq!(a, b);
        assert_eq!(cache.computed_count(), 1);

        cache.rebuild_defaults = true;
        let c = cache.default_style(&reg, "Button", "", None);
        assert_eq!(cache.computed_count(), 2);
        assert_eq!(a, c);
    }

    #[test]
    fn selector_default_stacks_on_plain_default() {
        let reg = registry();
        let mut cache = StyleCache::new(false);
        let hover = cache.default_style(&reg, "Button", ":hover", None);
        assert_eq!(hover.padding, Value::px(4.0));
        assert_eq!(hover.font.bg_color, Color::rgb(0xee, 0xee, 0xee));

        let part = cache.default_style(&reg, "Button", "#label", Some("Label"));
        assert_eq!(part.padding, Value::px(2.0));
        assert_eq!(part.layout.margin, Value::px(1.0));

        let missing = cache.default_style(&reg, "Button", "#nothing", None);
        assert_eq!(missing, cache.default_style(&reg, "Button", "", None));
    }

    #[test]
    fn inheritable_fields_follow_parent() {
        let mut resolver = StyleResolver::new(registry(), false);
        let mut parent = ComputedStyle::default();
        parent.color = Color::rgb(10, 20, 30);
        parent.font.family = SmolStr::new("serif");
        parent.opacity = 0.5;

        let props = Props::new();
        let style = resolver.resolve(&request(&props, Some(&parent)));
        assert!(style.resolved);
        assert_eq!(style.color, parent.color);
        assert_eq!(style.font.family, parent.font.family);
        assert_eq!(style.opacity, 1.0);

        let props = Props::new().with("color", "#fff");
        let style = resolver.resolve(&request(&props, Some(&parent)));
        assert_eq!(style.color, Color::WHITE);
    }

    #[test]
    fn parent_wins_over_type_default_for_inherited_fields() {
        let mut resolver = StyleResolver::new(registry(), false);
        let mut parent = ComputedStyle::default();
        parent.color = Color::rgb(10, 20, 30);
        let props = Props::new();
        let req = StyleRequest {
            type_name: "Button",
            ..request(&props, Some(&parent))
        };
        let style = resolver.resolve(&req);
        assert_eq!(style.color, parent.color);
        assert_eq!(style.padding, Value::px(4.0));

        let class = StyleRequest {
            type_name: "Button",
            class: "tinted",
            ..request(&props, Some(&parent))
        };
        if let Some(button) = resolver.registry.get_mut("Button") {
            button.sub_mut(".tinted").set("color", "#0f0");
        }
        assert_eq!(resolver.resolve(&class).color, Color::rgb(0, 255, 0));
    }

    #[test]
    fn initial_restores_type_default_under_a_parent() {
        let mut resolver = StyleResolver::new(registry(), false);
        let mut parent = ComputedStyle::default();
        parent.color = Color::rgb(10, 20, 30);
        parent.font.weight = 700;
        let props = Props::new().with("color", "initial").with("font-weight", "inherit");
        let req = StyleRequest {
            type_name: "Button",
            ..request(&props, Some(&parent))
        };
        let style = resolver.resolve(&req);
        assert_eq!(style.color, Color::rgb(0, 0, 255));
        assert_eq!(style.font.weight, 700);

        let orphan = resolver.resolve(&StyleRequest {
            type_name: "Button",
            ..request(&props, None)
        });
        assert_eq!(orphan.color, Color::rgb(0, 0, 255));
    }

    #[test]
    fn class_and_sheet_rules_overlay_in_order() {
        let mut resolver = StyleResolver::new(registry(), false);
        let sheet: StyleSheet = vec![
            (SmolStr::new("Button"), Props::new().with("opacity", 0.5)),
            (SmolStr::new("#ok"), Props::new().with("opacity", 0.75)),
            (SmolStr::new(".other"), Props::new().with("opacity", 0.1)),
        ];
        let props = Props::new().with("border-width", 9.0);
        let css = [&sheet];
        let req = StyleRequest {
            type_name: "Button",
            name: "ok",
            class: "primary",
            css: &css,
            ..request(&props, None)
        };
        let style = resolver.resolve(&req);
        assert_eq!(style.border.width, Value::px(2.0));
        assert_eq!(style.opacity, 0.75);
    }
}
