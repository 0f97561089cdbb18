/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the database layer, the renderer and the interaction layer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Unit a marking's distance is expressed in
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    /// Millimeters
    Mm,
    /// Centimeters
    #[default]
    Cm,
}

impl DistanceUnit {
    /// Symbol used in distance labels
    pub fn symbol(self) -> &'static str {
        match self {
            DistanceUnit::Mm => "mm",
            DistanceUnit::Cm => "cm",
        }
    }

    /// Name stored in the catalog
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceUnit::Mm => "MM",
            DistanceUnit::Cm => "CM",
        }
    }

    /// Parse the catalog name, `None` for anything unknown
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MM" => Some(DistanceUnit::Mm),
            "CM" => Some(DistanceUnit::Cm),
            _ => None,
        }
    }
}

/// Endpoint decoration applied to every marking in a render pass
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrowStyle {
    /// Single arrow head at the end point
    #[default]
    Arrow,
    /// Perpendicular bar at both ends
    TCap,
    /// Filled disc at both ends
    Circle,
}

/// Which end of a marking a gesture refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

/// Represents a photo in the library
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    /// Unique database ID
    pub id: i64,
    /// Locator of the original image bytes (never mutated)
    pub original_uri: String,
    /// Cached thumbnail with rendered markings (None if not yet generated)
    pub thumbnail_path: Option<String>,
    /// Unix milliseconds when the photo was imported
    pub created_at: i64,
    /// Unix milliseconds of the last change to the photo or its markings
    pub modified_at: i64,
}

/// Visual style of a marking, in density-independent units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkingStyle {
    /// Packed ARGB
    pub line_color: u32,
    pub line_width_dp: f32,
    /// Packed ARGB
    pub text_color: u32,
    pub text_size_sp: f32,
}

/// One measured line segment on a photo
///
/// Coordinates are fractions (0.0 to 1.0) of the photo's width and height,
/// so a marking renders identically at any resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Marking {
    pub id: i64,
    pub photo_id: i64,
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    pub distance_value: f32,
    pub distance_unit: DistanceUnit,
    pub line_color: u32,
    pub line_width_dp: f32,
    pub text_color: u32,
    pub text_size_sp: f32,
    /// Higher values are drawn on top
    pub display_order: u32,
}

impl Marking {
    /// Text shown in the label, e.g. "12.5 cm"
    pub fn label(&self) -> String {
        format!("{} {}", format_tenths(self.distance_value), self.distance_unit.symbol())
    }

    pub fn style(&self) -> MarkingStyle {
        MarkingStyle {
            line_color: self.line_color,
            line_width_dp: self.line_width_dp,
            text_color: self.text_color,
            text_size_sp: self.text_size_sp,
        }
    }

    /// Coordinates of one endpoint
    pub fn endpoint(&self, endpoint: Endpoint) -> (f32, f32) {
        match endpoint {
            Endpoint::Start => (self.start_x, self.start_y),
            Endpoint::End => (self.end_x, self.end_y),
        }
    }

    /// Move one endpoint, leaving the other untouched
    pub fn set_endpoint(&mut self, endpoint: Endpoint, x: f32, y: f32) {
        match endpoint {
            Endpoint::Start => {
                self.start_x = x;
                self.start_y = y;
            }
            Endpoint::End => {
                self.end_x = x;
                self.end_y = y;
            }
        }
    }
}

/// One decimal place, ties away from zero.
/// Rounds the shortest decimal form, so 40.05 shows as "40.1".
fn format_tenths(value: f32) -> String {
    let shortest = value.abs().to_string();
    let (whole, fraction) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));
    let mut digits = fraction.bytes();
    let tenth = digits.next().map_or(0, |d| d - b'0');
    let round_up = digits.next().is_some_and(|d| d >= b'5');

    let tenths = whole
        .parse::<u64>()
        .ok()
        .and_then(|units| units.checked_mul(10))
        .and_then(|t| t.checked_add(u64::from(tenth) + u64::from(round_up)));
    match tenths {
        Some(tenths) => {
            let sign = if value.is_sign_negative() && tenths > 0 { "-" } else { "" };
            format!("{}{}.{}", sign, tenths / 10, tenths % 10)
        }
        // NaN, infinities and values too large for whole tenths
        None => format!("{:.1}", value),
    }
}

/// A marking that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarking {
    pub photo_id: i64,
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    pub distance_value: f32,
    pub distance_unit: DistanceUnit,
    pub style: MarkingStyle,
    pub display_order: u32,
}

impl NewMarking {
    /// Attach the id assigned by storage
    pub fn with_id(self, id: i64) -> Marking {
        Marking {
            id,
            photo_id: self.photo_id,
            start_x: self.start_x,
            start_y: self.start_y,
            end_x: self.end_x,
            end_y: self.end_y,
            distance_value: self.distance_value,
            distance_unit: self.distance_unit,
            line_color: self.style.line_color,
            line_width_dp: self.style.line_width_dp,
            text_color: self.style.text_color,
            text_size_sp: self.style.text_size_sp,
            display_order: self.display_order,
        }
    }
}

/// Changes made from the marking edit panel
///
/// The distance is kept as the raw text the user typed; it is only
/// accepted once it parses as a positive number.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkingEdit {
    pub distance_input: String,
    pub style: MarkingStyle,
}

/// Parse user-entered distance text
///
/// Rejects anything that is not a finite number greater than zero.
pub fn parse_distance(input: &str) -> Result<f32> {
    match input.trim().parse::<f32>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(Error::InvalidDistance(input.to_string())),
    }
}

/// Marking from (0.1, 0.1) to (0.5, 0.5) labelled "12.5 cm"
#[cfg(test)]
pub(crate) fn fixture_marking(id: i64, photo_id: i64, display_order: u32) -> Marking {
    Marking {
        id,
        photo_id,
        start_x: 0.1,
        start_y: 0.1,
        end_x: 0.5,
        end_y: 0.5,
        distance_value: 12.5,
        distance_unit: DistanceUnit::Cm,
        line_color: crate::color::RED,
        line_width_dp: 3.0,
        text_color: crate::color::WHITE,
        text_size_sp: 14.0,
        display_order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_marking() -> Marking {
        fixture_marking(1, 1, 0)
    }

    #[test]
    fn test_label_centimeters() {
        assert_eq!(sample_marking().label(), "12.5 cm");
    }

    #[test]
    fn test_label_rounds_to_one_decimal() {
        let mut marking = sample_marking();
        marking.distance_value = 40.0;
        marking.distance_unit = DistanceUnit::Mm;
        assert_eq!(marking.label(), "40.0 mm");
    }

    #[test]
    fn test_label_rounds_ties_up() {
        let mut marking = sample_marking();
        marking.distance_value = 1.25;
        assert_eq!(marking.label(), "1.3 cm");

        marking.distance_unit = DistanceUnit::Mm;
        for (value, expected) in [(0.25, "0.3 mm"), (2.75, "2.8 mm"), (40.05, "40.1 mm"), (0.04, "0.0 mm")] {
            marking.distance_value = value;
            assert_eq!(marking.label(), expected);
        }
    }

    #[test]
    fn test_format_tenths_edge_values() {
        assert_eq!(format_tenths(9.96), "10.0");
        assert_eq!(format_tenths(0.05), "0.1");
        assert_eq!(format_tenths(-1.25), "-1.3");
        assert_eq!(format_tenths(f32::NAN), "NaN");
    }

    #[test]
    fn test_unit_catalog_names() {
        for unit in [DistanceUnit::Mm, DistanceUnit::Cm] {
            assert_eq!(DistanceUnit::parse(unit.as_str()), Some(unit));
        }
        assert_eq!(DistanceUnit::parse("inch"), None);
    }

    #[test]
    fn test_parse_distance() {
        assert_eq!(parse_distance(" 12.5 ").unwrap(), 12.5);
        assert!(matches!(parse_distance("abc"), Err(Error::InvalidDistance(_))));
        assert!(parse_distance("0").is_err());
        assert!(parse_distance("-3").is_err());
        assert!(parse_distance("NaN").is_err());
        assert!(parse_distance("inf").is_err());
        assert!(parse_distance("").is_err());
    }

    #[test]
    fn test_set_endpoint_moves_only_one_end() {
        let mut marking = sample_marking();
        marking.set_endpoint(Endpoint::End, 0.9, 0.8);
        assert_eq!(marking.endpoint(Endpoint::Start), (0.1, 0.1));
        assert_eq!(marking.endpoint(Endpoint::End), (0.9, 0.8));
    }
}
