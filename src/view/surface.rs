use crate::style::Color;
use crate::view::BBox;
use glam::{IVec2, Vec2};
use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Color),
    /// Linear fade used for box shadows.
    Gradient { from: Color, to: Color },
}

impl Paint {
    pub fn is_none(&self) -> bool {
        match self {
            Paint::Solid(c) => c.is_none(),
            Paint::Gradient { from, to } => from.is_none() && to.is_none(),
        }
    }
}

/// The 2D drawing collaborator. Bounds follow stack discipline: every push is
/// matched by exactly one pop, and drawing is clipped to the top of the stack.
pub trait RenderSurface: Any {
    fn size(&self) -> IVec2;

    fn bounds(&self) -> BBox {
        BBox::new(IVec2::ZERO, self.size())
    }

    fn push_bounds(&mut self, bbox: BBox);
    fn pop_bounds(&mut self);

    /// Fills a rectangle; a positive `radius` rounds the corners.
    fn fill_rect(&mut self, pos: Vec2, size: Vec2, radius: f32, paint: Paint);
    fn stroke_rect(&mut self, pos: Vec2, size: Vec2, radius: f32, width: f32, paint: Paint);
    fn draw_text(&mut self, pos: Vec2, text: &str, font_size: f32, color: Color);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    PushBounds(BBox),
    PopBounds,
    Fill {
        pos: Vec2,
        size: Vec2,
        radius: f32,
        paint: Paint,
        clip: BBox,
    },
    Stroke {
        pos: Vec2,
        size: Vec2,
        radius: f32,
        width: f32,
        paint: Paint,
        clip: BBox,
    },
    Text {
        pos: Vec2,
        text: String,
        font_size: f32,
        color: Color,
        clip: BBox,
    },
}

impl DrawCommand {
    pub fn is_paint(&self) -> bool {
        !matches!(self, DrawCommand::PushBounds(_) | DrawCommand::PopBounds)
    }
}

/// Headless surface that records every call.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    size: IVec2,
    stack: Vec<BBox>,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            size: IVec2::new(width, height),
            ..Self::default()
        }
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.size = IVec2::new(width, height);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn paint_commands(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().filter(|c| c.is_paint())
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Current bounds stack depth; zero between frames.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn clip(&self) -> BBox {
        self.stack.last().copied().unwrap_or_else(|| self.bounds())
    }
}

impl RenderSurface for RecordingSurface {
    fn size(&self) -> IVec2 {
        self.size
    }

    fn push_bounds(&mut self, bbox: BBox) {
        self.stack.push(bbox);
        self.commands.push(DrawCommand::PushBounds(bbox));
    }

    fn pop_bounds(&mut self) {
        if self.stack.pop().is_none() {
            log::warn!(target: "trellis::render", "pop_bounds on an empty bounds stack");
        }
        self.commands.push(DrawCommand::PopBounds);
    }

    fn fill_rect(&mut self, pos: Vec2, size: Vec2, radius: f32, paint: Paint) {
        let clip = self.clip();
        self.commands.push(DrawCommand::Fill {
            pos,
            size,
            radius,
            paint,
            clip,
        });
    }

    fn stroke_rect(&mut self, pos: Vec2, size: Vec2, radius: f32, width: f32, paint: Paint) {
        let clip = self.clip();
        self.commands.push(DrawCommand::Stroke {
            pos,
            size,
            radius,
            width,
            paint,
            clip,
        });
    }

    fn draw_text(&mut self, pos: Vec2, text: &str, font_size: f32, color: Color) {
        let clip = self.clip();
        self.commands.push(DrawCommand::Text {
            pos,
            text: text.to_string(),
            font_size,
            color,
            clip,
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
