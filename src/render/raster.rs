/// CPU rasterizer for marking shapes
///
/// Paints directly onto an `image::RgbaImage`. Edges are antialiased with
/// a one-pixel coverage ramp computed from the distance between each pixel
/// centre and the shape, then blended source-over. Everything is plain
/// arithmetic on the shape parameters, so output is reproducible.

use cgmath::{InnerSpace, Vector2};
use image::RgbaImage;

use super::{font, Canvas, Shape};
use crate::color::blend_over;
use crate::geometry::segment_distance;

impl Canvas for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn draw(&mut self, shape: &Shape) {
        match shape {
            Shape::Line { from, to, width, color } => {
                let half = width * 0.5;
                let reach = Vector2::new(half, half);
                let (lo, hi) = (min(*from, *to) - reach, max(*from, *to) + reach);
                fill_by_distance(self, lo, hi, *color, |p| half - segment_distance(p, *from, *to));
            }
            Shape::Disc { center, radius, color } => {
                let reach = Vector2::new(*radius, *radius);
                let (center, radius) = (*center, *radius);
                fill_by_distance(self, center - reach, center + reach, *color, |p| {
                    radius - (p - center).magnitude()
                });
            }
            Shape::RoundRect { min: lo, max: hi, radius, color } => {
                fill_by_distance(self, *lo, *hi, *color, |p| -round_rect_sdf(p, *lo, *hi, *radius));
            }
            Shape::Text { origin, text, scale, color } => {
                fill_text(self, *origin, text, *scale, *color);
            }
        }
    }
}

/// Blend `color` into every pixel of the box whose centre lies inside the
/// shape. `inside` returns the signed distance to the edge, positive inside.
fn fill_by_distance<F>(image: &mut RgbaImage, lo: Vector2<f32>, hi: Vector2<f32>, color: u32, inside: F)
where
    F: Fn(Vector2<f32>) -> f32,
{
    let Some((x0, y0, x1, y1)) = pixel_bounds(image, lo, hi) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let centre = Vector2::new(x as f32 + 0.5, y as f32 + 0.5);
            let coverage = (inside(centre) + 0.5).clamp(0.0, 1.0);
            if coverage > 0.0 {
                let pixel = image.get_pixel_mut(x, y);
                *pixel = blend_over(*pixel, color, coverage);
            }
        }
    }
}

/// Bitmap glyphs are snapped to whole pixels, one `scale`×`scale` block per cell
fn fill_text(image: &mut RgbaImage, origin: Vector2<f32>, text: &str, scale: u32, color: u32) {
    let left = origin.x.round() as i64;
    let top = origin.y.round() as i64;
    let (w, h) = (image.width() as i64, image.height() as i64);
    let scale = scale as i64;
    for (col, row) in font::lit_cells(text) {
        let bx = left + col as i64 * scale;
        let by = top + row as i64 * scale;
        for y in by.max(0)..(by + scale).min(h) {
            for x in bx.max(0)..(bx + scale).min(w) {
                let pixel = image.get_pixel_mut(x as u32, y as u32);
                *pixel = blend_over(*pixel, color, 1.0);
            }
        }
    }
}

/// Integer pixel range covering [lo, hi] plus a pixel of antialiasing,
/// clipped to the image. None when nothing is visible.
fn pixel_bounds(image: &RgbaImage, lo: Vector2<f32>, hi: Vector2<f32>) -> Option<(u32, u32, u32, u32)> {
    if ![lo.x, lo.y, hi.x, hi.y].iter().all(|v| v.is_finite()) {
        return None;
    }
    let clip = |v: f32, extent: u32| (v.max(0.0) as i64).min(extent as i64) as u32;
    let x0 = clip((lo.x - 1.0).floor(), image.width());
    let y0 = clip((lo.y - 1.0).floor(), image.height());
    let x1 = clip((hi.x + 1.0).ceil(), image.width());
    let y1 = clip((hi.y + 1.0).ceil(), image.height());
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

/// Signed distance from `p` to a rounded rectangle, negative inside
fn round_rect_sdf(p: Vector2<f32>, lo: Vector2<f32>, hi: Vector2<f32>, radius: f32) -> f32 {
    let half = (hi - lo) * 0.5;
    let radius = radius.clamp(0.0, half.x.min(half.y).max(0.0));
    let centre = lo + half;
    let q = Vector2::new((p.x - centre.x).abs(), (p.y - centre.y).abs()) - half
        + Vector2::new(radius, radius);
    let outside = Vector2::new(q.x.max(0.0), q.y.max(0.0)).magnitude();
    outside + q.x.max(q.y).min(0.0) - radius
}

fn min(a: Vector2<f32>, b: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(a.x.min(b.x), a.y.min(b.y))
}

fn max(a: Vector2<f32>, b: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(a.x.max(b.x), a.y.max(b.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;
    use crate::render::{render_draft, render_marking, render_markings, render_selection_handles, Draft};
    use crate::state::data::{fixture_marking, ArrowStyle};
    use image::Rgba;

    const GREY: Rgba<u8> = Rgba([128, 128, 128, 255]);

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, GREY)
    }

    #[test]
    fn test_line_covers_its_pixels() {
        let mut img = blank(50, 50);
        img.draw(&Shape::Line {
            from: Vector2::new(5.0, 25.0),
            to: Vector2::new(45.0, 25.0),
            width: 4.0,
            color: color::RED,
        });
        assert_eq!(*img.get_pixel(25, 24), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(25, 10), GREY);
        // Round caps extend past the endpoints by half the width
        assert_eq!(*img.get_pixel(4, 25), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(1, 25), GREY);
    }

    #[test]
    fn test_disc_is_round() {
        let mut img = blank(40, 40);
        img.draw(&Shape::Disc {
            center: Vector2::new(20.0, 20.0),
            radius: 10.0,
            color: color::BLUE,
        });
        assert_eq!(*img.get_pixel(20, 20), Rgba([0, 0, 255, 255]));
        assert_eq!(*img.get_pixel(20, 11), Rgba([0, 0, 255, 255]));
        // Inside the bounding box but outside the circle
        assert_eq!(*img.get_pixel(12, 12), GREY);
        assert_eq!(*img.get_pixel(27, 27), GREY);
    }

    #[test]
    fn test_round_rect_corners_are_cut() {
        let mut img = blank(40, 40);
        img.draw(&Shape::RoundRect {
            min: Vector2::new(10.0, 10.0),
            max: Vector2::new(30.0, 30.0),
            radius: 6.0,
            color: color::BLACK,
        });
        assert_eq!(*img.get_pixel(20, 20), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(10, 10), GREY);
        assert_eq!(*img.get_pixel(20, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_shapes_outside_the_image_are_clipped() {
        let mut img = blank(10, 10);
        img.draw(&Shape::Disc {
            center: Vector2::new(-50.0, -50.0),
            radius: 5.0,
            color: color::RED,
        });
        img.draw(&Shape::Text {
            origin: Vector2::new(8.0, 8.0),
            text: "88".to_string(),
            scale: 3,
            color: color::WHITE,
        });
        img.draw(&Shape::Line {
            from: Vector2::new(f32::NAN, 0.0),
            to: Vector2::new(5.0, 5.0),
            width: 2.0,
            color: color::RED,
        });
        assert!(img.pixels().all(|p| *p == GREY || *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_label_text_is_drawn() {
        let mut img = blank(200, 200);
        render_marking(&mut img, &fixture_marking(1, 1, 0), 200, 200, ArrowStyle::Arrow, 1.0);
        let white = img.pixels().filter(|p| **p == Rgba([255, 255, 255, 255])).count();
        assert!(white > 0);
        // The label background darkens the midpoint region
        let p = img.get_pixel(60, 52);
        assert!(p[0] < 128 || *p == Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let markings = [fixture_marking(1, 1, 1), {
            let mut m = fixture_marking(2, 1, 0);
            m.end_x = 0.9;
            m.start_y = 0.8;
            m
        }];
        let mut a = blank(320, 240);
        let mut b = blank(320, 240);
        for style in [ArrowStyle::Arrow, ArrowStyle::TCap, ArrowStyle::Circle] {
            render_markings(&mut a, &markings, style, 1.5);
            render_markings(&mut b, &markings, style, 1.5);
        }
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_draft_has_no_label() {
        let marking = fixture_marking(1, 1, 0);
        let mut img = blank(200, 200);
        let draft = Draft {
            start: (marking.start_x, marking.start_y),
            end: (marking.end_x, marking.end_y),
        };
        render_draft(&mut img, &draft, &marking.style(), 1.0);
        assert!(!img.pixels().any(|p| *p == Rgba([255, 255, 255, 255])));
        assert_eq!(*img.get_pixel(60, 60), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_selection_handles_are_drawn_at_endpoints() {
        let marking = fixture_marking(1, 1, 0);
        let mut img = blank(400, 400);
        render_selection_handles(&mut img, &marking, 1.0);
        assert_eq!(*img.get_pixel(40, 40), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(200, 200), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(120, 120), GREY);
    }
}
