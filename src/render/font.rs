/// Embedded 5×7 bitmap font for distance labels
///
/// Labels only ever contain digits, a decimal point, a space and a unit
/// symbol, so the font covers exactly that set. Anything else renders as
/// a hollow box. Bitmap glyphs keep text output identical on every
/// platform, with no font files to ship.

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;

/// One row per byte, bits 4..0 are the five columns left to right
type Glyph = [u8; GLYPH_HEIGHT as usize];

#[rustfmt::skip]
const MISSING: Glyph = [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111];

#[rustfmt::skip]
fn glyph_for(ch: char) -> &'static Glyph {
    match ch {
        ' ' => &[0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '-' => &[0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '.' => &[0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00100, 0b00000],
        '0' => &[0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => &[0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => &[0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => &[0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110],
        '4' => &[0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => &[0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => &[0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => &[0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => &[0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => &[0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'c' => &[0b00000, 0b00000, 0b01110, 0b10000, 0b10000, 0b10001, 0b01110],
        'm' => &[0b00000, 0b00000, 0b11010, 0b10101, 0b10101, 0b10101, 0b10001],
        _ => &MISSING,
    }
}

/// Pixel scale of a glyph cell for a text size in pixels
pub fn scale_for(text_size_px: f32) -> u32 {
    if !text_size_px.is_finite() {
        return 1;
    }
    ((text_size_px / GLYPH_HEIGHT as f32).round() as u32).max(1)
}

/// Width of `text` in pixels, one scaled pixel of spacing between glyphs
pub fn text_width(text: &str, scale: u32) -> u32 {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return 0;
    }
    chars * GLYPH_WIDTH * scale + (chars - 1) * scale
}

pub fn text_height(scale: u32) -> u32 {
    GLYPH_HEIGHT * scale
}

/// Cells (column, row) of unscaled set pixels for `text`, left to right
pub fn lit_cells(text: &str) -> impl Iterator<Item = (u32, u32)> + '_ {
    text.chars().enumerate().flat_map(|(index, ch)| {
        let left = index as u32 * (GLYPH_WIDTH + 1);
        let glyph = glyph_for(ch);
        (0..GLYPH_HEIGHT).flat_map(move |row| {
            (0..GLYPH_WIDTH).filter_map(move |col| {
                let bit = 1u8 << (GLYPH_WIDTH - 1 - col);
                (glyph[row as usize] & bit != 0).then_some((left + col, row))
            })
        })
    })
}
