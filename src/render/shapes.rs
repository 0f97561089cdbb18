/// Display-list construction for markings
///
/// Converts normalized markings into pixel-space primitives. The raster
/// backend only has to know how to fill four kinds of shape.

use cgmath::Vector2;
use std::f32::consts::{FRAC_PI_2, PI};

use super::font;
use super::Draft;
use crate::color;
use crate::state::data::{ArrowStyle, Marking, MarkingStyle};

/// Arrow arm length as a multiple of the line width
pub const ARROW_ARM_FACTOR: f32 = 8.0;
/// Angle between each arrow arm and the reversed line direction
pub const ARROW_SPREAD_DEG: f32 = 30.0;
/// T-cap reach on each side of the endpoint, as a multiple of the line width
pub const T_CAP_FACTOR: f32 = 5.0;
/// Endpoint disc radius as a multiple of the line width
pub const CIRCLE_RADIUS_FACTOR: f32 = 3.0;
/// Label padding as a fraction of the text size
pub const LABEL_PADDING_FACTOR: f32 = 0.3;
/// Drag handle radius in density-independent pixels
pub const HANDLE_RADIUS_DP: f32 = 15.0;

/// A pixel-space drawing primitive
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Straight stroke with round caps
    Line {
        from: Vector2<f32>,
        to: Vector2<f32>,
        width: f32,
        color: u32,
    },
    /// Filled circle
    Disc {
        center: Vector2<f32>,
        radius: f32,
        color: u32,
    },
    /// Filled rectangle with rounded corners
    RoundRect {
        min: Vector2<f32>,
        max: Vector2<f32>,
        radius: f32,
        color: u32,
    },
    /// Bitmap text, `origin` is the top-left corner of the first glyph
    Text {
        origin: Vector2<f32>,
        text: String,
        scale: u32,
        color: u32,
    },
}

/// A marking resolved to pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkingLayout {
    pub start: Vector2<f32>,
    pub end: Vector2<f32>,
    pub line_width_px: f32,
    pub text_size_px: f32,
}

impl MarkingLayout {
    /// Denormalize coordinates and scale style magnitudes by `density`
    pub fn new(marking: &Marking, image_width_px: u32, image_height_px: u32, density: f32) -> Self {
        let (w, h) = (image_width_px as f32, image_height_px as f32);
        Self {
            start: Vector2::new(marking.start_x * w, marking.start_y * h),
            end: Vector2::new(marking.end_x * w, marking.end_y * h),
            line_width_px: marking.line_width_dp * density,
            text_size_px: marking.text_size_sp * density,
        }
    }

    /// Angle of the line from start to end, in radians
    pub fn angle(&self) -> f32 {
        let d = self.end - self.start;
        d.y.atan2(d.x)
    }

    pub fn midpoint(&self) -> Vector2<f32> {
        (self.start + self.end) * 0.5
    }
}

/// Full display list for a committed marking
pub fn marking_shapes(
    marking: &Marking,
    image_width_px: u32,
    image_height_px: u32,
    arrow_style: ArrowStyle,
    density: f32,
) -> Vec<Shape> {
    let layout = MarkingLayout::new(marking, image_width_px, image_height_px, density);
    let mut list = vec![Shape::Line {
        from: layout.start,
        to: layout.end,
        width: layout.line_width_px,
        color: marking.line_color,
    }];
    list.extend(decoration_shapes(&layout, arrow_style, marking.line_color));
    list.extend(label_shapes(
        &marking.label(),
        layout.midpoint(),
        layout.text_size_px,
        marking.text_color,
    ));
    list
}

/// Endpoint decoration for one marking
pub fn decoration_shapes(layout: &MarkingLayout, arrow_style: ArrowStyle, color: u32) -> Vec<Shape> {
    let width = layout.line_width_px;
    let angle = layout.angle();
    let line = |from: Vector2<f32>, to: Vector2<f32>| Shape::Line { from, to, width, color };

    match arrow_style {
        ArrowStyle::Arrow => {
            let arm = width * ARROW_ARM_FACTOR;
            let spread = ARROW_SPREAD_DEG.to_radians();
            [angle + PI - spread, angle + PI + spread]
                .into_iter()
                .map(|a| line(layout.end, layout.end + polar(arm, a)))
                .collect()
        }
        ArrowStyle::TCap => {
            let reach = polar(width * T_CAP_FACTOR, angle + FRAC_PI_2);
            [layout.start, layout.end]
                .into_iter()
                .map(|p| line(p + reach, p - reach))
                .collect()
        }
        ArrowStyle::Circle => {
            let radius = width * CIRCLE_RADIUS_FACTOR;
            [layout.start, layout.end]
                .into_iter()
                .map(|center| Shape::Disc { center, radius, color })
                .collect()
        }
    }
}

/// Backing rectangle and text of a label centred on `center`
pub fn label_shapes(text: &str, center: Vector2<f32>, text_size_px: f32, text_color: u32) -> [Shape; 2] {
    let scale = font::scale_for(text_size_px);
    let half = Vector2::new(
        font::text_width(text, scale) as f32 * 0.5,
        font::text_height(scale) as f32 * 0.5,
    );
    let padding = text_size_px * LABEL_PADDING_FACTOR;
    let pad = Vector2::new(padding, padding);
    [
        Shape::RoundRect {
            min: center - half - pad,
            max: center + half + pad,
            radius: padding,
            color: color::LABEL_BACKGROUND,
        },
        Shape::Text {
            origin: center - half,
            text: text.to_string(),
            scale,
            color: text_color,
        },
    ]
}

/// Line-only preview of a marking being created
pub fn draft_shapes(
    draft: &Draft,
    image_width_px: u32,
    image_height_px: u32,
    style: &MarkingStyle,
    density: f32,
) -> Vec<Shape> {
    let (w, h) = (image_width_px as f32, image_height_px as f32);
    vec![Shape::Line {
        from: Vector2::new(draft.start.0 * w, draft.start.1 * h),
        to: Vector2::new(draft.end.0 * w, draft.end.1 * h),
        width: style.line_width_dp * density,
        color: style.line_color,
    }]
}

/// Drag handles on both endpoints of the selected marking
pub fn handle_shapes(marking: &Marking, image_width_px: u32, image_height_px: u32, density: f32) -> Vec<Shape> {
    let layout = MarkingLayout::new(marking, image_width_px, image_height_px, density);
    let radius = HANDLE_RADIUS_DP * density;
    [layout.start, layout.end]
        .into_iter()
        .map(|center| Shape::Disc {
            center,
            radius,
            color: color::RED,
        })
        .collect()
}

fn polar(length: f32, angle: f32) -> Vector2<f32> {
    Vector2::new(length * angle.cos(), length * angle.sin())
}
