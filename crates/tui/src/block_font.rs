use std::collections::HashMap;

use once_cell::sync::Lazy;

const FONT_HEIGHT: usize = 5;
const FILL: &str = "██";
const BLANK: &str = "  ";
const SPACING: &str = " ";

type Glyph = [&'static str; FONT_HEIGHT];

// Digits and operators for questions, plus the letters of the title banner.
static GLYPHS: Lazy<HashMap<char, Glyph>> = Lazy::new(|| {
    HashMap::from([
        ('0', ["111", "1 1", "1 1", "1 1", "111"]),
        ('1', [" 1 ", "11 ", " 1 ", " 1 ", "111"]),
        ('2', ["111", "  1", "111", "1  ", "111"]),
        ('3', ["111", "  1", " 11", "  1", "111"]),
        ('4', ["1 1", "1 1", "111", "  1", "  1"]),
        ('5', ["111", "1  ", "111", "  1", "111"]),
        ('6', ["111", "1  ", "111", "1 1", "111"]),
        ('7', ["111", "  1", " 1 ", " 1 ", " 1 "]),
        ('8', ["111", "1 1", "111", "1 1", "111"]),
        ('9', ["111", "1 1", "111", "  1", "111"]),
        ('X', ["   ", "1 1", " 1 ", "1 1", "   "]),
        ('=', ["   ", "111", "   ", "111", "   "]),
        ('?', ["111", "  1", " 11", "   ", " 1 "]),
        (' ', ["  ", "  ", "  ", "  ", "  "]),
        ('A', [" 1 ", "1 1", "111", "1 1", "1 1"]),
        ('E', ["111", "1  ", "11 ", "1  ", "111"]),
        ('I', ["111", " 1 ", " 1 ", " 1 ", "111"]),
        ('L', ["1  ", "1  ", "1  ", "1  ", "111"]),
        ('M', ["1   1", "11 11", "1 1 1", "1   1", "1   1"]),
        ('N', ["1  1", "11 1", "1 11", "1  1", "1  1"]),
        ('R', ["11 ", "1 1", "11 ", "1 1", "1 1"]),
        ('T', ["111", " 1 ", " 1 ", " 1 ", " 1 "]),
        ('U', ["1 1", "1 1", "1 1", "1 1", "111"]),
        ('V', ["1 1", "1 1", "1 1", "1 1", " 1 "]),
    ])
});

/// Render `text` as rows of block characters. Unknown characters become `?`.
pub fn render(text: &str) -> Vec<String> {
    let glyphs: Vec<&Glyph> = text
        .chars()
        .map(|ch| ch.to_ascii_uppercase())
        .filter_map(|ch| GLYPHS.get(&ch).or_else(|| GLYPHS.get(&'?')))
        .collect();

    (0..FONT_HEIGHT)
        .map(|row| {
            glyphs
                .iter()
                .map(|glyph| {
                    glyph[row]
                        .chars()
                        .map(|cell| if cell == '1' { FILL } else { BLANK })
                        .collect::<String>()
                })
                .collect::<Vec<_>>()
                .join(SPACING)
                .trim_end()
                .to_string()
        })
        .collect()
}

/// Display width of the widest row.
pub fn width(lines: &[String]) -> usize {
    lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_row_per_font_line() {
        let lines = render("3 x 7 = ?");
        assert_eq!(lines.len(), FONT_HEIGHT);
        assert!(lines.iter().any(|line| line.contains(FILL)));
    }

    #[test]
    fn lowercase_and_unknown_characters_render() {
        assert_eq!(render("x"), render("X"));
        assert_eq!(render("#"), render("?"));
    }

    #[test]
    fn empty_text_renders_blank_rows() {
        assert!(render("").iter().all(String::is_empty));
        assert_eq!(width(&render("")), 0);
    }
}
