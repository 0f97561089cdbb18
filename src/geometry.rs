/// Geometry and hit-testing in normalized coordinate space
///
/// Every function here is pure. Positions are fractions of the displayed
/// image size, so thresholds are fractions too (0.03 = 3% of the image).

use cgmath::{InnerSpace, Vector2};

use crate::state::data::{Endpoint, Marking};

/// Default selection radius around a segment or endpoint
pub const DEFAULT_HIT_THRESHOLD: f32 = 0.03;

/// What a tap resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// An endpoint handle of the selected marking
    Endpoint(i64, Endpoint),
    /// The body of a marking
    Segment(i64),
}

/// Convert a raw gesture position into storage coordinates
///
/// Divides by the container size and clamps each axis to [0, 1].
/// A degenerate container maps the axis to 0.
pub fn normalize(raw_x: f32, raw_y: f32, width: f32, height: f32) -> (f32, f32) {
    (normalize_axis(raw_x, width), normalize_axis(raw_y, height))
}

fn normalize_axis(raw: f32, extent: f32) -> f32 {
    if extent <= 0.0 || !raw.is_finite() {
        return 0.0;
    }
    (raw / extent).clamp(0.0, 1.0)
}

/// Distance from P to the segment A-B
///
/// Projects P onto the line through A and B, clamps the projection
/// parameter to the segment and measures to the clamped point. A
/// zero-length segment degrades to point-to-point distance.
pub fn distance_to_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    segment_distance(
        Vector2::new(px, py),
        Vector2::new(ax, ay),
        Vector2::new(bx, by),
    )
}

pub(crate) fn segment_distance(p: Vector2<f32>, a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    let ab = b - a;
    let len2 = ab.magnitude2();
    if len2 == 0.0 {
        return (p - a).magnitude();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).magnitude()
}

/// True iff (x, y) lies within `threshold` of the marking's segment
pub fn is_near_segment(marking: &Marking, x: f32, y: f32, threshold: f32) -> bool {
    distance_to_segment(
        x,
        y,
        marking.start_x,
        marking.start_y,
        marking.end_x,
        marking.end_y,
    ) < threshold
}

/// True iff the two points are closer than `threshold`
pub fn is_near_endpoint(x1: f32, y1: f32, x2: f32, y2: f32, threshold: f32) -> bool {
    (Vector2::new(x2, y2) - Vector2::new(x1, y1)).magnitude() < threshold
}

/// Resolve a tap at (x, y) against a photo's markings
///
/// Precedence:
/// 1. start, then end handle of the currently selected marking
/// 2. segment proximity over all markings, topmost (highest display order) first
///
/// The first match wins. `markings` may be in any order.
pub fn hit_test(
    markings: &[Marking],
    selected: Option<i64>,
    x: f32,
    y: f32,
    threshold: f32,
) -> Option<Hit> {
    if let Some(marking) = selected.and_then(|id| markings.iter().find(|m| m.id == id)) {
        for endpoint in [Endpoint::Start, Endpoint::End] {
            let (ex, ey) = marking.endpoint(endpoint);
            if is_near_endpoint(x, y, ex, ey, threshold) {
                return Some(Hit::Endpoint(marking.id, endpoint));
            }
        }
    }

    let mut by_order: Vec<&Marking> = markings.iter().collect();
    // Stable sort keeps storage order for equal display orders
    by_order.sort_by_key(|m| m.display_order);
    by_order
        .into_iter()
        .rev()
        .find(|m| is_near_segment(m, x, y, threshold))
        .map(|m| Hit::Segment(m.id))
}
