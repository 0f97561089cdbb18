/// Marking rendering
///
/// Rendering happens in two steps:
/// - `shapes.rs` turns a marking into a display list of pixel-space shapes
///   (pure, no I/O, easy to inspect in tests)
/// - `raster.rs` paints shapes onto an RGBA image
///
/// Live preview and export both go through the same two steps, so the same
/// marking, raster size, arrow style and density always produce the same
/// pixels.

pub mod font;
pub mod raster;
pub mod shapes;

pub use shapes::{MarkingLayout, Shape};

use crate::state::data::{ArrowStyle, Marking, MarkingStyle};

/// Anything shapes can be painted onto
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn draw(&mut self, shape: &Shape);
}

/// A marking still being dragged out, before its distance is known
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draft {
    pub start: (f32, f32),
    pub end: (f32, f32),
}

/// Draw one committed marking: line, endpoint decoration and label
///
/// `image_width_px`/`image_height_px` are the size the normalized
/// coordinates refer to, which is usually the canvas size.
pub fn render_marking<C: Canvas + ?Sized>(
    target: &mut C,
    marking: &Marking,
    image_width_px: u32,
    image_height_px: u32,
    arrow_style: ArrowStyle,
    density: f32,
) {
    let list = shapes::marking_shapes(marking, image_width_px, image_height_px, arrow_style, density);
    paint(target, &list);
}

/// Draw a snapshot of markings bottom to top
pub fn render_markings<C: Canvas + ?Sized>(
    target: &mut C,
    markings: &[Marking],
    arrow_style: ArrowStyle,
    density: f32,
) {
    let (width, height) = (target.width(), target.height());
    let mut ordered: Vec<&Marking> = markings.iter().collect();
    ordered.sort_by_key(|m| m.display_order);
    for marking in ordered {
        render_marking(target, marking, width, height, arrow_style, density);
    }
}

/// Draw an in-progress marking: the line only, no decoration or label
pub fn render_draft<C: Canvas + ?Sized>(
    target: &mut C,
    draft: &Draft,
    style: &MarkingStyle,
    density: f32,
) {
    let (width, height) = (target.width(), target.height());
    let list = shapes::draft_shapes(draft, width, height, style, density);
    paint(target, &list);
}

/// Draw the drag handles of the selected marking (live view only)
pub fn render_selection_handles<C: Canvas + ?Sized>(
    target: &mut C,
    marking: &Marking,
    density: f32,
) {
    let (width, height) = (target.width(), target.height());
    let list = shapes::handle_shapes(marking, width, height, density);
    paint(target, &list);
}

fn paint<C: Canvas + ?Sized>(target: &mut C, list: &[Shape]) {
    for shape in list {
        target.draw(shape);
    }
}
