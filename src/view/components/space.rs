use crate::view::{Initializable, Layoutable, Movable, Renderable, Sizeable, Styleable};

/// Fixed gap, one em wide by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct Space;

impl Initializable for Space {}
impl Styleable for Space {}
impl Sizeable for Space {}
impl Layoutable for Space {}
impl Renderable for Space {}
impl Movable for Space {}

crate::impl_widget!(Space, "Space");
