//! Block palettes, board colours, and hex → ratatui Color.

use ratatui::style::Color;
use thiserror::Error;

/// Colours for the board and the block palette.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colours, indexed by `Block::color`.
    pub blocks: Vec<Color>,
    /// Gutter between cells / behind the board.
    pub bg: Color,
    /// Empty grid cell; fading blocks blend towards it.
    pub cell: Color,
    /// Board border glow.
    pub border: Color,
    pub title: Color,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThemeError {
    #[error("invalid hex colour: {0}")]
    InvalidHex(String),
    #[error("palette has {0} colours; at most 255 are supported")]
    TooManyColors(usize),
}

impl Default for Theme {
    fn default() -> Self {
        Self::for_palette(crate::Palette::Classic)
    }
}

impl Theme {
    pub fn for_palette(palette: crate::Palette) -> Self {
        let blocks = match palette {
            crate::Palette::Classic => vec![
                Color::Rgb(225, 0, 0),
                Color::Rgb(0, 225, 0),
                Color::Rgb(0, 0, 255),
            ],
            crate::Palette::Onedark => vec![
                Color::Rgb(0xE0, 0x6C, 0x75), // red
                Color::Rgb(0x98, 0xC3, 0x79), // green
                Color::Rgb(0x61, 0xAF, 0xEF), // blue
                Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
                Color::Rgb(0xC6, 0x78, 0xDD), // magenta
            ],
            // Avoids relying on red/green alone.
            crate::Palette::Colorblind => vec![
                Color::Rgb(0x00, 0x77, 0xBB), // blue
                Color::Rgb(0xEE, 0x77, 0x33), // orange
                Color::Rgb(0x00, 0x99, 0x88), // teal
                Color::Rgb(0xEE, 0x33, 0x77), // magenta
            ],
        };
        Self {
            blocks,
            bg: Color::Rgb(0x22, 0x22, 0x22),
            cell: Color::Rgb(0x33, 0x33, 0x33),
            border: Color::Rgb(0x00, 0xB4, 0xB4),
            title: Color::Rgb(0x00, 0xFF, 0xFF),
        }
    }

    /// Palette theme, with the block colours replaced by `overrides` when any are given.
    pub fn load(palette: crate::Palette, overrides: &[String]) -> Result<Self, ThemeError> {
        let mut theme = Self::for_palette(palette);
        if !overrides.is_empty() {
            if overrides.len() > usize::from(u8::MAX) {
                return Err(ThemeError::TooManyColors(overrides.len()));
            }
            theme.blocks = overrides
                .iter()
                .map(|s| parse_hex(s))
                .collect::<Result<_, _>>()?;
        }
        Ok(theme)
    }

    #[inline]
    pub fn palette_len(&self) -> u8 {
        self.blocks.len().min(usize::from(u8::MAX)) as u8
    }

    /// Colour for a block's palette index.
    #[inline]
    pub fn block_color(&self, index: u8) -> Color {
        self.blocks[usize::from(index) % self.blocks.len()]
    }
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |hex: &str| u8::from_str_radix(hex, 16).map_err(|_| invalid());
    if !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;

    #[test]
    fn test_parse_hex_6() {
        assert_eq!(parse_hex("#98C379"), Ok(Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        assert_eq!(parse_hex("#FFF"), Ok(Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGHHII").is_err());
        assert!(parse_hex("#éé").is_err());
    }

    #[test]
    fn test_parse_hex_rejects_signs() {
        assert_eq!(parse_hex("#+F+F+F"), Err(ThemeError::InvalidHex("+F+F+F".into())));
        assert!(parse_hex("+FF").is_err());
        assert!(parse_hex("-1-1-1").is_err());
    }

    #[test]
    fn test_classic_palette() {
        let theme = Theme::default();
        assert_eq!(theme.palette_len(), 3);
        assert_eq!(theme.block_color(0), Color::Rgb(225, 0, 0));
        assert_eq!(theme.block_color(2), Color::Rgb(0, 0, 255));
    }

    #[test]
    fn test_overrides_replace_palette() {
        let theme = Theme::load(Palette::Onedark, &["#000".into(), "#ffffff".into()]).unwrap();
        assert_eq!(theme.palette_len(), 2);
        assert_eq!(theme.block_color(1), Color::Rgb(255, 255, 255));
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let err = Theme::load(Palette::Classic, &["nope".into()]).unwrap_err();
        assert_eq!(err, ThemeError::InvalidHex("nope".into()));
    }
}
