use glam::{IVec2, Vec2};

/// Integer pixel rectangle, `min` inclusive and `max` exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BBox {
    pub min: IVec2,
    pub max: IVec2,
}

impl BBox {
    pub const ZERO: BBox = BBox {
        min: IVec2::ZERO,
        max: IVec2::ZERO,
    };

    pub const fn new(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    pub fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::new(IVec2::new(x, y), IVec2::new(x + w, y + h))
    }

    /// Truncates toward zero, matching how allocations become pixels.
    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        let max = pos + size;
        Self::new(pos.as_ivec2(), max.as_ivec2())
    }

    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> IVec2 {
        self.max - self.min
    }

    /// The overlap of both boxes; [`BBox::ZERO`] when they do not overlap.
    pub fn intersect(&self, other: &BBox) -> BBox {
        let r = BBox::new(self.min.max(other.min), self.max.min(other.max));
        if r.is_empty() { BBox::ZERO } else { r }
    }

    pub fn translate(&self, delta: IVec2) -> BBox {
        BBox::new(self.min + delta, self.max + delta)
    }

    /// Shrinks by `amount` on every side. May produce an empty box.
    pub fn inset(&self, amount: i32) -> BBox {
        BBox::new(self.min + IVec2::splat(amount), self.max - IVec2::splat(amount))
    }

    pub fn contains(&self, point: IVec2) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.y >= self.min.y && point.y < self.max.y
    }
}
