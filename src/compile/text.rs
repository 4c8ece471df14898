//! Standard-14 Helvetica metrics and WinAnsi text encoding.
//!
//! Generated pages only use the built-in Helvetica and Helvetica-Bold fonts,
//! so no font program is embedded. Widths are in 1/1000 text space units for
//! the printable ASCII range.

use lopdf::content::Operation;
use lopdf::{Dictionary, Object, StringFormat, dictionary};

const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for characters outside the printable ASCII range.
const FALLBACK_WIDTH: u16 = 556;

/// Built-in font used on generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// Helvetica.
    Helvetica,
    /// Helvetica-Bold.
    HelveticaBold,
}

impl Font {
    /// PostScript name of the font.
    pub fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name the font is registered under on generated pages.
    pub fn resource_name(self) -> &'static str {
        match self {
            Self::Helvetica => "BpHelv",
            Self::HelveticaBold => "BpHelvB",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            Self::Helvetica => &HELVETICA_WIDTHS,
            Self::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Advance width of one character in 1/1000 units.
    pub fn char_width(self, ch: char) -> u16 {
        let code = ch as u32;
        if (32..=126).contains(&code) {
            self.widths()[(code - 32) as usize]
        } else {
            FALLBACK_WIDTH
        }
    }

    /// Width of `text` set at `font_size`, in points.
    pub fn text_width(self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text.chars().map(|ch| u32::from(self.char_width(ch))).sum();
        units as f32 * font_size / 1000.0
    }

    /// Type1 font dictionary with WinAnsi encoding.
    pub fn dictionary(self) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font(),
            "Encoding" => "WinAnsiEncoding",
        }
    }
}

/// Encode a display string for a WinAnsi-encoded simple font.
///
/// Latin-1 characters map directly; the common typographic punctuation of
/// the 0x80-0x9F block is translated; anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => ch as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

/// Literal PDF string object for `text`.
pub fn text_object(text: &str) -> Object {
    Object::String(encode_win_ansi(text), StringFormat::Literal)
}

/// Operations drawing `text` with its baseline starting at `(x, y)`.
pub fn show_text(font: Font, font_size: f32, x: f32, y: f32, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font.resource_name().as_bytes().to_vec()), Object::Real(font_size)],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new("Tj", vec![text_object(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// Truncate `name` to at most `max_chars` characters, ending in "..." when cut.
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = name.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Run of dots that fits into `available` points at `font_size`.
pub fn dot_leader(font: Font, available: f32, font_size: f32) -> String {
    let dot = font.text_width(".", font_size);
    if available <= 0.0 || dot <= 0.0 {
        return String::new();
    }
    ".".repeat((available / dot).floor() as usize)
}
