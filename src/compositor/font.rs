//! 3x5 bitmap font for HUD and overlay text: ASCII and Cyrillic.

use image::RgbImage;

pub const GLYPH_WIDTH: i32 = 3;
pub const GLYPH_HEIGHT: i32 = 5;
/// Horizontal advance per character, in glyph cells
const ADVANCE: i32 = GLYPH_WIDTH + 1;

fn glyph(ch: char) -> [u8; 5] {
    match ch.to_uppercase().next().unwrap_or(ch) {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '@' => [0b111, 0b101, 0b111, 0b100, 0b011],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        '"' => [0b101, 0b101, 0b000, 0b000, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b111, 0b001, 0b010, 0b000, 0b010],
        '&' => [0b010, 0b101, 0b010, 0b101, 0b011],
        '*' => [0b101, 0b010, 0b101, 0b000, 0b000],
        '<' => [0b001, 0b010, 0b100, 0b010, 0b001],
        '>' => [0b100, 0b010, 0b001, 0b010, 0b100],
        ' ' => [0b000; 5],
        // Cyrillic; letters shaped like Latin ones reuse their rows
        'А' => glyph('A'),
        'Б' => [0b111, 0b100, 0b110, 0b101, 0b110],
        'В' => glyph('B'),
        'Г' => [0b111, 0b100, 0b100, 0b100, 0b100],
        'Д' => [0b011, 0b011, 0b101, 0b111, 0b101],
        'Е' => glyph('E'),
        'Ё' => [0b101, 0b111, 0b110, 0b100, 0b111],
        'Ж' => [0b101, 0b111, 0b010, 0b111, 0b101],
        'З' => glyph('3'),
        'И' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'Й' => [0b010, 0b101, 0b111, 0b111, 0b101],
        'К' => glyph('K'),
        'Л' => [0b011, 0b101, 0b101, 0b101, 0b101],
        'М' => glyph('M'),
        'Н' => glyph('H'),
        'О' => glyph('O'),
        'П' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'Р' => glyph('P'),
        'С' => glyph('C'),
        'Т' => glyph('T'),
        'У' => [0b101, 0b101, 0b011, 0b001, 0b110],
        'Ф' => [0b010, 0b111, 0b101, 0b111, 0b010],
        'Х' => glyph('X'),
        'Ц' => [0b101, 0b101, 0b101, 0b111, 0b001],
        'Ч' => [0b101, 0b101, 0b011, 0b001, 0b001],
        'Ш' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'Щ' => [0b101, 0b101, 0b101, 0b111, 0b011],
        'Ъ' => [0b110, 0b010, 0b011, 0b010, 0b011],
        'Ы' => [0b101, 0b101, 0b111, 0b111, 0b111],
        'Ь' => [0b100, 0b100, 0b110, 0b101, 0b110],
        'Э' => [0b110, 0b001, 0b011, 0b001, 0b110],
        'Ю' => [0b101, 0b111, 0b111, 0b111, 0b101],
        'Я' => [0b011, 0b101, 0b011, 0b101, 0b101],
        // Outside the glyph set: small box
        _ => [0b000, 0b111, 0b101, 0b111, 0b000],
    }
}

/// Width of `text` in pixels at `scale`.
pub fn text_width(text: &str, scale: i32) -> i32 {
    let chars = text.chars().count() as i32;
    if chars == 0 {
        return 0;
    }
    (chars * ADVANCE - 1) * scale
}

/// Longest prefix of `text` that fits in `max_width` pixels, with ".."
/// appended when anything was cut.
pub fn fit_text(text: &str, max_width: i32, scale: i32) -> String {
    if text_width(text, scale) <= max_width {
        return text.to_string();
    }
    let max_chars = ((max_width / scale + 1) / ADVANCE).max(2) as usize;
    let kept: String = text.chars().take(max_chars - 2).collect();
    format!("{kept}..")
}

fn blend(img: &mut RgbImage, x: i32, y: i32, color: [u8; 3], alpha: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let v = px[c] as f32 * (1.0 - alpha) + color[c] as f32 * alpha;
        px[c] = v.round().clamp(0.0, 255.0) as u8;
    }
}

fn draw_char(img: &mut RgbImage, x: i32, y: i32, ch: char, scale: i32, color: [u8; 3], alpha: f32) {
    for (row, bits) in glyph(ch).iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    blend(
                        img,
                        x + col * scale + dx,
                        y + row as i32 * scale + dy,
                        color,
                        alpha,
                    );
                }
            }
        }
    }
}

/// Draw `text` with its top-left corner at (`x`, `y`); clipped to the image.
pub fn draw_text(
    img: &mut RgbImage,
    x: i32,
    y: i32,
    text: &str,
    scale: i32,
    color: [u8; 3],
    alpha: f32,
) {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut cursor = x;
    for ch in text.chars() {
        draw_char(img, cursor, y, ch, scale, color, alpha);
        cursor += ADVANCE * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn lowercase_shares_uppercase_glyphs() {
        assert_eq!(glyph('g'), glyph('G'));
        assert_ne!(glyph('G'), glyph(' '));
    }

    #[test]
    fn cyrillic_names_have_glyphs() {
        let missing = glyph('\u{2603}');
        for ch in "АБВГДЕЁЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯ".chars() {
            assert_ne!(glyph(ch), missing, "no glyph for {ch}");
        }
        assert_eq!(glyph('ж'), glyph('Ж'));
        assert_eq!(glyph('ё'), glyph('Ё'));
        assert_eq!(glyph('Р'), glyph('P'));
    }

    #[test]
    fn width_accounts_for_spacing() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("A", 2), 6);
        assert_eq!(text_width("FPS", 2), 22);
    }

    #[test]
    fn long_text_is_shortened() {
        let fitted = fit_text("GPU: some very long renderer name", 80, 2);
        assert!(fitted.ends_with(".."));
        assert!(text_width(&fitted, 2) <= 80);
        assert_eq!(fit_text("short", 80, 2), "short");
    }

    #[test]
    fn text_is_drawn_and_clipped() {
        let mut img = RgbImage::new(10, 10);
        draw_text(&mut img, 0, 0, "1", 1, [255, 255, 255], 1.0);
        // Top row of '1' is 0b010.
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([255, 255, 255]));
        // Partially off-image text does not panic.
        draw_text(&mut img, 8, 8, "WWW", 2, [255, 0, 0], 1.0);
        draw_text(&mut img, -20, -3, "hello", 2, [255, 0, 0], 0.5);
    }

    #[test]
    fn alpha_blends_with_the_background() {
        let mut img = RgbImage::from_pixel(4, 6, Rgb([0, 0, 0]));
        draw_text(&mut img, 0, 0, "1", 1, [200, 200, 200], 0.5);
        assert_eq!(img.get_pixel(1, 0), &Rgb([100, 100, 100]));
    }
}
