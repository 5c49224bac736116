//! Argument groups shared by the subcommands.

use clap::Args;
use std::path::PathBuf;

use crate::options::{Dimension, Gravity, ImageFormat, MediaOptimizeOptions, ResizeOptions};

/// Flags accepted by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Theme identifier from forge.toml (default: the first theme)
    #[arg(long, global = true)]
    pub theme: Option<String>,

    /// Config file (default: forge.toml found from the working directory up)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root (default: the config file's directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Override `project.static_dir`
    #[arg(long, global = true)]
    pub static_dir: Option<PathBuf>,

    /// Override `project.media_dir`
    #[arg(long, global = true)]
    pub media_dir: Option<PathBuf>,

    /// Override `watch.debounce_ms`
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub debounce_ms: Option<u32>,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// `optimize-media-images` flags
#[derive(Args, Debug, Clone, Default)]
pub struct MediaArgs {
    /// Folder under the media root
    #[arg(long)]
    pub input: Option<String>,

    /// Destination folder under the media root (default: --input)
    #[arg(long)]
    pub output: Option<String>,
}

impl From<MediaArgs> for MediaOptimizeOptions {
    fn from(args: MediaArgs) -> Self {
        Self { input: args.input, output: args.output }
    }
}

/// `resize-images` flags
#[derive(Args, Debug, Clone)]
pub struct ResizeArgs {
    /// Glob of images to resize, relative to the project root
    #[arg(long)]
    pub input: Option<String>,

    /// Output folder (default: project.resized_dir)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Target width in pixels or percent (e.g. 640, 50%)
    #[arg(long)]
    pub width: Option<Dimension>,

    /// Target height in pixels or percent
    #[arg(long)]
    pub height: Option<Dimension>,

    /// Crop to the exact box
    #[arg(long)]
    pub crop: bool,

    /// Allow output larger than the source
    #[arg(long)]
    pub upscale: bool,

    /// Crop anchor
    #[arg(long, value_enum)]
    pub gravity: Option<Gravity>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<ImageFormat>,

    /// Output quality between 0 and 1
    #[arg(long, default_value_t = 1.0)]
    pub quality: f32,

    /// Background colour for transparent areas (hex, CSS colour or "none")
    #[arg(long)]
    pub background: Option<String>,

    /// Scale both sides by this percentage
    #[arg(long)]
    pub percentage: Option<f32>,

    /// Fill the box and crop the overflow
    #[arg(long)]
    pub cover: bool,
}

impl From<ResizeArgs> for ResizeOptions {
    fn from(args: ResizeArgs) -> Self {
        Self {
            input: args.input,
            output: args.output,
            width: args.width,
            height: args.height,
            crop: args.crop,
            upscale: args.upscale,
            gravity: args.gravity,
            format: args.format,
            quality: args.quality,
            background: args.background,
            percentage: args.percentage,
            cover: args.cover,
        }
    }
}
