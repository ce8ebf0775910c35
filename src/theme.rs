//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::piece::BlockColor;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colours, indexed by `BlockColor::index`: red, blue, green, yellow.
    pub blocks: [Color; 4],
    /// Playfield background.
    pub bg: Color,
    /// Border and grid dots.
    pub div_line: Color,
    /// Text.
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Ghost piece (landing preview).
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

const ONEDARK_RED: u32 = 0xE06C75;
const ONEDARK_BLUE: u32 = 0x61AFEF;
const ONEDARK_GREEN: u32 = 0x98C379;
const ONEDARK_YELLOW: u32 = 0xE5C07B;
const ONEDARK_BG: u32 = 0x31353F;
const ONEDARK_DIV: u32 = 0x3F444F;
const ONEDARK_FG: u32 = 0xABB2BF;
const ONEDARK_INACTIVE: u32 = 0x5C6370;

impl Theme {
    /// Hardcoded One Dark defaults (hex values from onedark.theme).
    pub fn onedark_default() -> Self {
        Self {
            blocks: [
                Color::from_u32(ONEDARK_RED),
                Color::from_u32(ONEDARK_BLUE),
                Color::from_u32(ONEDARK_GREEN),
                Color::from_u32(ONEDARK_YELLOW),
            ],
            bg: Color::from_u32(ONEDARK_BG),
            div_line: Color::from_u32(ONEDARK_DIV),
            main_fg: Color::from_u32(ONEDARK_FG),
            title: Color::from_u32(ONEDARK_YELLOW),
            inactive_fg: Color::from_u32(ONEDARK_INACTIVE),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// No path, or a path that doesn't exist, gives the One Dark defaults.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override block colours for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.blocks = [
                    Color::from_u32(0xFF0000),
                    Color::from_u32(0x0088FF),
                    Color::from_u32(0x00FF00),
                    Color::from_u32(0xFFFF00),
                ];
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito style: no red/green pair.
                self.blocks = [
                    Color::from_u32(0xCC3311),
                    Color::from_u32(0x0077BB),
                    Color::from_u32(0x009988),
                    Color::from_u32(0xEE7733),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        // Keys match onedark.theme; fallbacks are the same file's hex values.
        Self {
            blocks: [
                get("cpu_end")
                    .or_else(|| get("temp_end"))
                    .unwrap_or(Color::from_u32(ONEDARK_RED)),
                get("cpu_box").unwrap_or(Color::from_u32(ONEDARK_BLUE)),
                get("mem_box")
                    .or_else(|| get("cpu_start"))
                    .unwrap_or(Color::from_u32(ONEDARK_GREEN)),
                get("cpu_mid")
                    .or_else(|| get("title"))
                    .unwrap_or(Color::from_u32(ONEDARK_YELLOW)),
            ],
            bg: get("meter_bg").unwrap_or(Color::from_u32(ONEDARK_BG)),
            div_line: get("div_line").unwrap_or(Color::from_u32(ONEDARK_DIV)),
            main_fg: get("main_fg").unwrap_or(Color::from_u32(ONEDARK_FG)),
            title: get("title").unwrap_or(Color::from_u32(ONEDARK_YELLOW)),
            inactive_fg: get("inactive_fg").unwrap_or(Color::from_u32(ONEDARK_INACTIVE)),
        }
    }

    #[inline]
    pub fn block_color(&self, color: BlockColor) -> Color {
        self.blocks[color.index()]
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
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}
