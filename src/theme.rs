//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::board::Candy;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Candy colours in `Candy::index` order: red, orange, yellow, green, blue, purple.
    pub candy: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, level).
    pub main_fg: Color,
    /// Highlight / titles / cursor.
    pub title: Color,
    /// Secondary text (legend, key help).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_CANDY: [Color; 6] = [
    rgb(0xE0_6C_75),
    rgb(0xD1_9A_66),
    rgb(0xE5_C0_7B),
    rgb(0x98_C3_79),
    rgb(0x61_AF_EF),
    rgb(0xC6_78_DD),
];

impl Theme {
    /// Hardcoded One Dark defaults (onedark.theme hex values).
    pub fn onedark_default() -> Self {
        Self {
            candy: ONEDARK_CANDY,
            bg: rgb(0x31_35_3F),
            div_line: rgb(0x3F_44_4F),
            main_fg: rgb(0xAB_B2_BF),
            title: rgb(0xE5_C0_7B),
            inactive_fg: rgb(0x5C_63_70),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file is missing.
    /// `palette` selects colour variant: Normal (theme), HighContrast, or Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Default theme for a palette when no file is loaded.
    pub fn for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override candy colours for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.candy = [
                    rgb(0xFF_00_00),
                    rgb(0xFF_88_00),
                    rgb(0xFF_FF_00),
                    rgb(0x00_FF_00),
                    rgb(0x00_88_FF),
                    rgb(0xFF_00_FF),
                ];
            }
            crate::Palette::Colorblind => {
                // Paul Tol's vibrant set; no red/green pair relies on hue alone.
                self.candy = [
                    rgb(0xCC_33_11),
                    rgb(0xEE_77_33),
                    rgb(0xBB_BB_00),
                    rgb(0x00_99_88),
                    rgb(0x00_77_BB),
                    rgb(0xEE_33_77),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let d = Self::onedark_default();
        // Keys match onedark.theme.
        Self {
            candy: [
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(d.candy[0]),
                get("temp_mid").or_else(|| get("used_mid")).unwrap_or(d.candy[1]),
                get("cpu_mid").or_else(|| get("title")).unwrap_or(d.candy[2]),
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(d.candy[3]),
                get("cpu_box").unwrap_or(d.candy[4]),
                get("net_box").unwrap_or(d.candy[5]),
            ],
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
        }
    }

    #[inline]
    pub fn candy_color(&self, candy: Candy) -> Color {
        self.candy[candy.index() as usize]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let channel = |from: usize, to: usize| u8::from_str_radix(&s[from..to], 16).map_err(|_| invalid());
    let (r, g, b) = match s.len() {
        6 => (channel(0, 2)?, channel(2, 4)?, channel(4, 6)?),
        3 => (channel(0, 1)? * 17, channel(1, 2)? * 17, channel(2, 3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_keys_map_to_candies() {
        let map = parse_theme_file(
            "# comment\ntheme[cpu_end]=\"#FF0000\"\ntheme[net_box]='#00F'\ntheme[main_fg]=\"\"",
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.candy_color(Candy::Red), Color::Rgb(255, 0, 0));
        assert_eq!(theme.candy_color(Candy::Purple), Color::Rgb(0, 0, 255));
        assert_eq!(theme.candy_color(Candy::Blue), ONEDARK_CANDY[4]);
        assert_eq!(theme.main_fg, Theme::default().main_fg);
    }

    #[test]
    fn test_palettes_replace_candies_only() {
        let normal = Theme::for_palette(crate::Palette::Normal);
        let contrast = Theme::for_palette(crate::Palette::HighContrast);
        assert_eq!(normal.candy, ONEDARK_CANDY);
        assert_ne!(contrast.candy, normal.candy);
        assert_eq!(contrast.bg, normal.bg);
    }
}
