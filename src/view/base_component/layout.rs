use super::{BBox, NodeKey, WidgetTree};
use crate::style::{Align, LayoutStyle};
use glam::Vec2;

/// Size constraints gathered during the size pass.
///
/// A max of zero means unconstrained, a negative max means stretch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SizePrefs {
    pub need: Vec2,
    pub pref: Vec2,
    pub max: Vec2,
}

impl SizePrefs {
    pub fn stretches(&self, dim: usize) -> bool {
        self.max[dim] < 0.0
    }
}

/// Allocation state of one node.
///
/// `alloc_pos` is absolute; `alloc_pos_rel` is the offset the container assigned
/// relative to its own `alloc_pos`. `alloc_pos_orig` is the baseline recorded at
/// layout time so moves can be applied as a delta.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayoutData {
    pub alloc_pos: Vec2,
    pub alloc_pos_rel: Vec2,
    pub alloc_pos_orig: Vec2,
    pub alloc_size: Vec2,
    pub size: SizePrefs,
    pub offset: Vec2,
    pub align_horiz: Align,
    pub align_vert: Align,
}

impl LayoutData {
    /// Resets the allocation and loads constraints from dot values.
    pub fn set_from_style(&mut self, style: &LayoutStyle) {
        self.alloc_size = Vec2::ZERO;
        self.alloc_pos_rel = Vec2::ZERO;
        self.size.need = Vec2::new(style.min_width.dots, style.min_height.dots);
        self.size.pref = Vec2::new(style.width.dots, style.height.dots);
        self.size.max = Vec2::new(style.max_width.dots, style.max_height.dots);
        self.offset = Vec2::new(style.x.dots, style.y.dots);
        self.align_horiz = style.align_horiz;
        self.align_vert = style.align_vert;
    }

    /// Folds the size pass result into the constraints a container reads:
    /// the content size becomes a lower bound on the preferred size.
    pub fn update_sizes(&mut self) {
        self.size.pref = self.size.pref.max(self.size.need).max(self.alloc_size);
    }

    pub fn delta(&self) -> Vec2 {
        self.alloc_pos - self.alloc_pos_orig
    }

    fn align(&self, dim: usize) -> Align {
        if dim == 0 { self.align_horiz } else { self.align_vert }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutDirection {
    #[default]
    Row,
    Column,
    /// Children overlap, each placed at its own x/y offset.
    Stacked,
}

impl LayoutDirection {
    fn main_dim(self) -> Option<usize> {
        match self {
            LayoutDirection::Row => Some(0),
            LayoutDirection::Column => Some(1),
            LayoutDirection::Stacked => None,
        }
    }
}

/// Combined constraints of `children` laid out along `dir`, without box space.
pub fn gather_sizes(dir: LayoutDirection, children: &[SizePrefs]) -> SizePrefs {
    let mut out = SizePrefs::default();
    for child in children {
        for dim in 0..2 {
            if dir.main_dim() == Some(dim) {
                out.need[dim] += child.need[dim];
                out.pref[dim] += child.pref[dim];
            } else {
                out.need[dim] = out.need[dim].max(child.need[dim]);
                out.pref[dim] = out.pref[dim].max(child.pref[dim]);
            }
        }
    }
    out
}

/// Size on a non-main axis: stretch fills `avail`, anything else is the
/// preferred size held between need and a positive max, never above `avail`.
fn cross_size(prefs: &SizePrefs, dim: usize, avail: f32) -> f32 {
    if prefs.stretches(dim) {
        return avail.max(0.0);
    }
    let mut size = prefs.pref[dim].max(prefs.need[dim]);
    if prefs.max[dim] > 0.0 {
        size = size.min(prefs.max[dim]);
    }
    size.min(avail).max(0.0)
}

fn align_offset(align: Align, avail: f32, size: f32) -> f32 {
    match align {
        Align::Start => 0.0,
        Align::Center => ((avail - size) * 0.5).max(0.0),
        Align::End => (avail - size).max(0.0),
    }
}

/// Positions (relative to the content origin) and sizes for `children`
/// sharing `avail`.
///
/// Along the main axis each child gets its preferred size; extra room is split
/// equally among stretchy children, and when preferred sizes do not fit the
/// shortfall is taken from the slack between pref and need.
pub fn allocate(dir: LayoutDirection, avail: Vec2, children: &[LayoutData]) -> Vec<(Vec2, Vec2)> {
    let mut out: Vec<(Vec2, Vec2)> = vec![(Vec2::ZERO, Vec2::ZERO); children.len()];
    for dim in 0..2 {
        if dir.main_dim() == Some(dim) {
            continue;
        }
        for (slot, child) in out.iter_mut().zip(children) {
            let size = cross_size(&child.size, dim, avail[dim]);
            slot.1[dim] = size;
            slot.0[dim] = align_offset(child.align(dim), avail[dim], size);
            if dir == LayoutDirection::Stacked {
                slot.0[dim] += child.offset[dim];
            }
        }
    }

    let Some(dim) = dir.main_dim() else {
        return out;
    };
    let prefs: Vec<f32> = children
        .iter()
        .map(|c| {
            let mut p = c.size.pref[dim].max(c.size.need[dim]);
            if c.size.max[dim] > 0.0 {
                p = p.min(c.size.max[dim]);
            }
            p
        })
        .collect();
    let sum_pref: f32 = prefs.iter().sum();
    let sum_need: f32 = children.iter().map(|c| c.size.need[dim]).sum();
    let stretchers = children.iter().filter(|c| c.size.stretches(dim)).count();

    let sizes: Vec<f32> = if avail[dim] >= sum_pref {
        let extra = avail[dim] - sum_pref;
        children
            .iter()
            .zip(&prefs)
            .map(|(c, &p)| {
                if stretchers > 0 && c.size.stretches(dim) {
                    p + extra / stretchers as f32
                } else {
                    p
                }
            })
            .collect()
    } else if avail[dim] > sum_need && sum_pref > sum_need {
        let ratio = (avail[dim] - sum_need) / (sum_pref - sum_need);
        children
            .iter()
            .zip(&prefs)
            .map(|(c, &p)| c.size.need[dim] + (p - c.size.need[dim]).max(0.0) * ratio)
            .collect()
    } else {
        children.iter().map(|c| c.size.need[dim]).collect()
    };

    let mut cursor = 0.0;
    for (slot, size) in out.iter_mut().zip(sizes) {
        slot.0[dim] = cursor;
        slot.1[dim] = size;
        cursor += size;
    }
    out
}

impl WidgetTree {
    /// Sets `alloc_size` from width/height (as minimums) plus box space.
    pub fn size_from_wh(&mut self, key: NodeKey, w: f32, h: f32) {
        let Some(node) = self.node_mut(key) else {
            return;
        };
        let st = &node.style;
        let mut w = w;
        let mut h = h;
        if st.layout.width.dots > 0.0 {
            w = w.max(st.layout.width.dots);
        }
        if st.layout.height.dots > 0.0 {
            h = h.max(st.layout.height.dots);
        }
        let spc = 2.0 * st.box_space();
        node.layout.alloc_size = Vec2::new(w + spc, h + spc);
    }

    pub fn size_add_space(&mut self, key: NodeKey) {
        if let Some(node) = self.node_mut(key) {
            let spc = 2.0 * node.style.box_space();
            node.layout.alloc_size += Vec2::splat(spc);
        }
    }

    /// `alloc_size` minus box space on both sides: the room left for content.
    pub fn size_sub_space(&self, key: NodeKey) -> Vec2 {
        self.node(key)
            .map(|n| n.layout.alloc_size - Vec2::splat(2.0 * n.style.box_space()))
            .unwrap_or(Vec2::ZERO)
    }

    /// Container size pass: own style constraints, then the gathered child
    /// sizes plus box space.
    pub fn gather_children_sizes(&mut self, key: NodeKey, dir: LayoutDirection) {
        let children: Vec<SizePrefs> = self
            .children(key)
            .iter()
            .filter_map(|&c| self.node(c))
            .filter(|n| n.style.is_displayed())
            .map(|n| n.layout.size)
            .collect();
        let gathered = gather_sizes(dir, &children);
        let Some(node) = self.node_mut(key) else {
            return;
        };
        let spc = Vec2::splat(2.0 * node.style.box_space());
        let need = node.layout.size.need.max(gathered.need + spc);
        let pref = node.layout.size.pref.max(gathered.pref + spc);
        node.layout.size.need = need;
        node.layout.size.pref = pref;
        node.layout.alloc_size = pref;
    }

    /// Assigns `alloc_pos_rel` and `alloc_size` to every displayed child.
    pub fn allocate_children(&mut self, key: NodeKey, dir: LayoutDirection) {
        let Some(node) = self.node(key) else {
            return;
        };
        let spc = node.style.box_space();
        let avail = (node.layout.alloc_size - Vec2::splat(2.0 * spc)).max(Vec2::ZERO);
        let children: Vec<NodeKey> = node
            .children
            .iter()
            .copied()
            .filter(|&c| self.node(c).is_some_and(|n| n.style.is_displayed()))
            .collect();
        let datas: Vec<LayoutData> = children
            .iter()
            .filter_map(|&c| self.node(c).map(|n| n.layout))
            .collect();
        let allocs = allocate(dir, avail, &datas);
        for (child, (pos, size)) in children.into_iter().zip(allocs) {
            if let Some(n) = self.node_mut(child) {
                n.layout.alloc_pos_rel = pos + Vec2::splat(spc);
                n.layout.alloc_size = size;
            }
        }
    }

    /// Box-model content area handed to children as their parent bbox.
    pub fn children_bbox(&self, key: NodeKey) -> BBox {
        self.node(key)
            .map(|n| n.vp_bbox.inset(n.style.box_space() as i32))
            .unwrap_or(BBox::ZERO)
    }
}
