//! Background colour parsing for image resizing.
//!
//! Accepts anything CSS accepts (`#fff`, `rgb(...)`, `hsl(...)`, named
//! colours) plus the keyword `none`, which keeps transparency.

use image::Rgba;
use lightningcss::traits::Parse;
use lightningcss::values::color::{CssColor, FloatColor};
use thiserror::Error;

/// Error type for colour parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 3, 4, 6, or 8 hex digits after #)
    #[error("invalid color length {0}, expected 3, 4, 6, or 8")]
    InvalidLength(usize),
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// CSS parsing error from lightningcss
    #[error("CSS parse error: {0}")]
    CssParse(String),
}

/// A resize background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    /// Keep the alpha channel untouched
    Transparent,
    /// Flatten onto this colour
    Fill(Rgba<u8>),
}

impl Background {
    /// Parse `none` or a CSS colour
    pub fn parse(s: &str) -> Result<Self, ColorError> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(Background::Transparent);
        }
        parse_color(s).map(Background::Fill)
    }
}

/// Parse a CSS colour string into RGBA.
///
/// ```
/// use themeforge::color::parse_color;
///
/// assert_eq!(parse_color("#F00").unwrap(), image::Rgba([255, 0, 0, 255]));
/// assert_eq!(parse_color("white").unwrap(), image::Rgba([255, 255, 255, 255]));
/// ```
pub fn parse_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    if s.is_empty() {
        return Err(ColorError::Empty);
    }
    match s.strip_prefix('#') {
        Some(hex) => parse_hex(hex),
        None => {
            let color =
                CssColor::parse_string(s).map_err(|e| ColorError::CssParse(e.to_string()))?;
            css_color_to_rgba(color)
        }
    }
}

fn parse_hex(hex: &str) -> Result<Rgba<u8>, ColorError> {
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(bad));
    }
    // Every char is an ASCII hex digit at this point, so byte slicing is safe
    let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).unwrap_or(0);
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
    match hex.len() {
        3 => Ok(Rgba([digit(0) * 17, digit(1) * 17, digit(2) * 17, 255])),
        4 => Ok(Rgba([digit(0) * 17, digit(1) * 17, digit(2) * 17, digit(3) * 17])),
        6 => Ok(Rgba([pair(0), pair(2), pair(4), 255])),
        8 => Ok(Rgba([pair(0), pair(2), pair(4), pair(6)])),
        len => Err(ColorError::InvalidLength(len)),
    }
}

fn css_color_to_rgba(color: CssColor) -> Result<Rgba<u8>, ColorError> {
    let rgb = color
        .to_rgb()
        .map_err(|_| ColorError::CssParse("cannot convert color to RGB".to_string()))?;
    match rgb {
        CssColor::RGBA(c) => Ok(Rgba([c.red, c.green, c.blue, c.alpha])),
        CssColor::Float(float) => match float.as_ref() {
            FloatColor::RGB(c) => {
                let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                Ok(Rgba([channel(c.r), channel(c.g), channel(c.b), channel(c.alpha)]))
            }
            _ => Err(ColorError::CssParse("unexpected float color format".to_string())),
        },
        _ => Err(ColorError::CssParse("color conversion did not produce RGB".to_string())),
    }
}
