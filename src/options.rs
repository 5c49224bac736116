//! Task-scoped option records.
//!
//! Option records are filled from the command line once per invocation and
//! are read-only afterwards. Mandatory fields are plain `Option`s here; the
//! [`crate::validate`] rules decide what must be present, so a missing value
//! fails the single task that needs it instead of the whole command line.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::validate::OptionRecord;

/// A target dimension in pixels or as a percentage of the source size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Dimension {
    Pixels(u32),
    Percent(f32),
}

impl Dimension {
    /// Resolve against a source dimension
    pub fn resolve(&self, source: u32) -> u32 {
        match *self {
            Dimension::Pixels(px) => px,
            Dimension::Percent(pct) => ((source as f32) * pct / 100.0).round().max(1.0) as u32,
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            let value: f32 =
                pct.trim().parse().map_err(|_| format!("invalid percentage '{}'", s))?;
            if value <= 0.0 {
                return Err(format!("percentage must be positive, got '{}'", s));
            }
            return Ok(Dimension::Percent(value));
        }
        let px = s.strip_suffix("px").unwrap_or(s);
        match px.trim().parse::<u32>() {
            Ok(0) => Err("dimension must be positive".to_string()),
            Ok(value) => Ok(Dimension::Pixels(value)),
            Err(_) => Err(format!("invalid dimension '{}', expected pixels or a percentage", s)),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Pixels(px) => write!(f, "{}px", px),
            Dimension::Percent(pct) => write!(f, "{}%", pct),
        }
    }
}

/// Anchor used when cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum Gravity {
    #[value(name = "NorthWest")]
    NorthWest,
    #[value(name = "North")]
    North,
    #[value(name = "NorthEast")]
    NorthEast,
    #[value(name = "West")]
    West,
    #[value(name = "Center")]
    Center,
    #[value(name = "East")]
    East,
    #[value(name = "SouthWest")]
    SouthWest,
    #[value(name = "South")]
    South,
    #[value(name = "SouthEast")]
    SouthEast,
}

impl Gravity {
    /// Horizontal and vertical anchor as fractions of the free space (0, 0.5 or 1)
    pub fn anchor(&self) -> (f32, f32) {
        match self {
            Gravity::NorthWest => (0.0, 0.0),
            Gravity::North => (0.5, 0.0),
            Gravity::NorthEast => (1.0, 0.0),
            Gravity::West => (0.0, 0.5),
            Gravity::Center => (0.5, 0.5),
            Gravity::East => (1.0, 0.5),
            Gravity::SouthWest => (0.0, 1.0),
            Gravity::South => (0.5, 1.0),
            Gravity::SouthEast => (1.0, 1.0),
        }
    }
}

/// Output format override for resized images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[value(rename_all = "lower")]
pub enum ImageFormat {
    Gif,
    Png,
    Jpeg,
}

impl ImageFormat {
    /// File extension written for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Gif => "gif",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// Options of the `resize-images` task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeOptions {
    /// Input glob
    pub input: Option<String>,
    /// Output folder; the configured resized folder when absent
    pub output: Option<PathBuf>,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    /// Crop to the exact box instead of fitting inside it
    pub crop: bool,
    /// Allow results larger than the source
    pub upscale: bool,
    pub gravity: Option<Gravity>,
    pub format: Option<ImageFormat>,
    /// Output quality in `0.0..=1.0`
    pub quality: f32,
    /// Background colour, or `none` to keep transparency
    pub background: Option<String>,
    /// Scale both sides by this percentage
    pub percentage: Option<f32>,
    /// Keep the aspect ratio by overflowing the box (fill instead of fit)
    pub cover: bool,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            width: None,
            height: None,
            crop: false,
            upscale: false,
            gravity: None,
            format: None,
            quality: 1.0,
            background: None,
            percentage: None,
            cover: false,
        }
    }
}

impl ResizeOptions {
    /// Field names known to the validator
    pub const FIELDS: &'static [&'static str] = &[
        "input",
        "output",
        "width",
        "height",
        "crop",
        "upscale",
        "gravity",
        "format",
        "quality",
        "background",
        "percentage",
        "cover",
    ];

    /// JPEG quality on the encoder's 1..=100 scale
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
    }
}

impl OptionRecord for ResizeOptions {
    fn record_name(&self) -> &'static str {
        "resize-images"
    }

    fn fields(&self) -> &'static [&'static str] {
        Self::FIELDS
    }

    fn is_set(&self, field: &str) -> bool {
        match field {
            "input" => self.input.as_deref().is_some_and(|s| !s.trim().is_empty()),
            "output" => self.output.is_some(),
            "width" => self.width.is_some(),
            "height" => self.height.is_some(),
            "crop" | "upscale" | "quality" | "cover" => true,
            "gravity" => self.gravity.is_some(),
            "format" => self.format.is_some(),
            "background" => self.background.is_some(),
            "percentage" => self.percentage.is_some(),
            _ => false,
        }
    }
}

/// Options of the `optimize-media-images` task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaOptimizeOptions {
    /// Folder under the media root
    pub input: Option<String>,
    /// Destination folder under the media root; defaults to `input`
    pub output: Option<String>,
}

impl MediaOptimizeOptions {
    /// Field names known to the validator
    pub const FIELDS: &'static [&'static str] = &["input", "output"];

    /// Output folder with the `input` fallback applied
    pub fn output_folder(&self) -> Option<&str> {
        self.output.as_deref().or(self.input.as_deref())
    }
}

impl OptionRecord for MediaOptimizeOptions {
    fn record_name(&self) -> &'static str {
        "optimize-media-images"
    }

    fn fields(&self) -> &'static [&'static str] {
        Self::FIELDS
    }

    fn is_set(&self, field: &str) -> bool {
        match field {
            "input" => self.input.as_deref().is_some_and(|s| !s.trim().is_empty()),
            "output" => self.output.is_some(),
            _ => false,
        }
    }
}

/// Every task-scoped option record of one invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskOptions {
    pub resize: ResizeOptions,
    pub media: MediaOptimizeOptions,
}
