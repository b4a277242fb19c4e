use image::{Rgb, RgbImage};
use ml_core::Detection;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;
const LABEL_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const PERSON_TEXT: &str = "PERSON";
const GLYPH_ADVANCE: i32 = 6;
const GLYPH_HEIGHT: i32 = 7;

/// Draw a box and the fixed `PERSON` label for every detection, in place.
pub fn annotate_people(image: &mut RgbImage, people: &[Detection]) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }
    let max_x = image.width() as i32 - 1;
    let max_y = image.height() as i32 - 1;

    for person in people {
        let (l, t, r, b) = box_pixels(person, max_x, max_y);
        for inset in 0..BOX_THICKNESS {
            draw_rectangle(image, l + inset, t + inset, r - inset, b - inset, BOX_COLOR);
        }
    }

    for person in people {
        let (label_x, top, _, _) = box_pixels(person, max_x, max_y);
        let label_y = (top - 12).max(0);
        let text_width = PERSON_TEXT.chars().count() as i32 * GLYPH_ADVANCE;
        fill_rect(
            image,
            label_x,
            label_y,
            label_x + text_width,
            label_y + GLYPH_HEIGHT + 1,
            LABEL_BACKGROUND,
        );
        draw_label(image, label_x + 1, label_y + 1, PERSON_TEXT, BOX_COLOR);
    }
}

/// Print the current density in the bottom-right corner.
pub fn draw_density_overlay(image: &mut RgbImage, density: f64) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    if width == 0 || height == 0 {
        return;
    }
    let info = format!("DENSITY {density:.3}");
    let info_width = (info.chars().count() as i32 * GLYPH_ADVANCE).min(width);
    let info_x = (width - info_width - 4).max(0);
    let info_y = (height - 12).max(0);
    fill_rect(
        image,
        info_x,
        info_y,
        info_x + info_width + 4,
        info_y + GLYPH_HEIGHT + 1,
        LABEL_BACKGROUND,
    );
    draw_label(image, info_x + 2, info_y + 1, &info, OVERLAY_COLOR);
}

fn box_pixels(person: &Detection, max_x: i32, max_y: i32) -> (i32, i32, i32, i32) {
    let bbox = &person.bbox;
    let left = (bbox.x.round() as i32).clamp(0, max_x);
    let top = (bbox.y.round() as i32).clamp(0, max_y);
    let right = ((bbox.x + bbox.width).round() as i32 - 1).clamp(0, max_x);
    let bottom = ((bbox.y + bbox.height).round() as i32 - 1).clamp(0, max_y);
    (left, top, right, bottom)
}

fn draw_rectangle(
    image: &mut RgbImage,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: Rgb<u8>,
) {
    if right < left || bottom < top {
        return;
    }
    let width = image.width() as i32;
    let height = image.height() as i32;
    let left = left.clamp(0, width - 1);
    let right = right.clamp(0, width - 1);
    let top = top.clamp(0, height - 1);
    let bottom = bottom.clamp(0, height - 1);

    for x in left..=right {
        image.put_pixel(x as u32, top as u32, color);
        image.put_pixel(x as u32, bottom as u32, color);
    }
    for y in top..=bottom {
        image.put_pixel(left as u32, y as u32, color);
        image.put_pixel(right as u32, y as u32, color);
    }
}

fn fill_rect(
    image: &mut RgbImage,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: Rgb<u8>,
) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let left = left.clamp(0, width - 1);
    let right = right.clamp(0, width - 1);
    let top = top.clamp(0, height - 1);
    let bottom = bottom.clamp(0, height - 1);

    for y in top..=bottom {
        for x in left..=right {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn draw_label(image: &mut RgbImage, mut x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                let py = y + row as i32;
                if py < 0 || py >= height {
                    continue;
                }
                for col in 0..5 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        let px = x + col;
                        if px >= 0 && px < width {
                            image.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

/// 5x7 bitmap glyphs for the characters the overlays use.
fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'D' => Some([
            0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110,
        ]),
        'E' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111,
        ]),
        'I' => Some([
            0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        'N' => Some([
            0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001,
        ]),
        'O' => Some([
            0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110,
        ]),
        'P' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000,
        ]),
        'R' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001,
        ]),
        'S' => Some([
            0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        'T' => Some([
            0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100,
        ]),
        'Y' => Some([
            0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100,
        ]),
        '0' => Some([
            0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110,
        ]),
        '1' => Some([
            0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        '2' => Some([
            0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111,
        ]),
        '3' => Some([
            0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110,
        ]),
        '4' => Some([
            0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010,
        ]),
        '5' => Some([
            0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        '6' => Some([
            0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110,
        ]),
        '7' => Some([
            0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000,
        ]),
        '8' => Some([
            0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110,
        ]),
        '9' => Some([
            0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100,
        ]),
        '.' => Some([0, 0, 0, 0, 0, 0b00110, 0b00110]),
        ' ' => Some([0, 0, 0, 0, 0, 0, 0]),
        _ => None,
    }
}
