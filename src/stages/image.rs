//! In-process image stages: resizing and lossless-first optimization.
//!
//! Decoding and encoding are CPU bound and run on the blocking pool.

use async_trait::async_trait;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageEncoder, ImageOutputFormat, RgbaImage};
use regex::Regex;
use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

use crate::color::Background;
use crate::options::{Dimension, Gravity, ImageFormat, ResizeOptions};
use crate::pipeline::{FileRecord, StageError, StageErrorKind, Transform};

/// Quality used when re-encoding JPEG during optimization
pub const OPTIMIZE_JPEG_QUALITY: u8 = 85;

/// Resolved resize settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSpec {
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub percentage: Option<f32>,
    pub crop: bool,
    pub cover: bool,
    pub upscale: bool,
    pub gravity: Gravity,
    pub format: Option<ImageFormat>,
    pub jpeg_quality: u8,
    pub background: Background,
}

impl ResizeSpec {
    /// Build from validated options; fails only on an unparseable background
    pub fn from_options(options: &ResizeOptions) -> Result<Self, crate::color::ColorError> {
        let background = match &options.background {
            Some(text) => Background::parse(text)?,
            None => Background::Transparent,
        };
        Ok(Self {
            width: options.width,
            height: options.height,
            percentage: options.percentage,
            crop: options.crop,
            cover: options.cover,
            upscale: options.upscale,
            gravity: options.gravity.unwrap_or(Gravity::Center),
            format: options.format,
            jpeg_quality: options.jpeg_quality(),
            background,
        })
    }

    /// Target box for a source size, before fit/fill.
    ///
    /// A missing side follows the aspect ratio. Without `upscale` the box
    /// never exceeds the source.
    pub fn target_box(&self, src_w: u32, src_h: u32) -> (u32, u32) {
        let (mut w, mut h) = match self.percentage {
            Some(pct) => (Dimension::Percent(pct).resolve(src_w), Dimension::Percent(pct).resolve(src_h)),
            None => match (self.width, self.height) {
                (Some(w), Some(h)) => (w.resolve(src_w), h.resolve(src_h)),
                (Some(w), None) => {
                    let w = w.resolve(src_w);
                    (w, scale_side(src_h, w, src_w))
                }
                (None, Some(h)) => {
                    let h = h.resolve(src_h);
                    (scale_side(src_w, h, src_h), h)
                }
                (None, None) => (src_w, src_h),
            },
        };
        if !self.upscale {
            w = w.min(src_w);
            h = h.min(src_h);
        }
        (w.max(1), h.max(1))
    }

    /// Resize one decoded image
    pub fn apply(&self, img: &DynamicImage) -> DynamicImage {
        let (src_w, src_h) = img.dimensions();
        let (w, h) = self.target_box(src_w, src_h);

        let resized = if self.crop || self.cover {
            let scale = (w as f32 / src_w as f32).max(h as f32 / src_h as f32);
            let fill_w = ((src_w as f32 * scale).round() as u32).max(w);
            let fill_h = ((src_h as f32 * scale).round() as u32).max(h);
            let filled = img.resize_exact(fill_w, fill_h, FilterType::Lanczos3);
            if self.crop {
                let (ax, ay) = self.gravity.anchor();
                let x = ((fill_w - w) as f32 * ax).round() as u32;
                let y = ((fill_h - h) as f32 * ay).round() as u32;
                filled.crop_imm(x, y, w, h)
            } else {
                filled
            }
        } else if (w, h) == (src_w, src_h) {
            img.clone()
        } else {
            img.resize(w, h, FilterType::Lanczos3)
        };

        match self.background {
            Background::Transparent => resized,
            Background::Fill(color) => {
                let mut canvas = RgbaImage::from_pixel(resized.width(), resized.height(), color);
                imageops::overlay(&mut canvas, &resized.to_rgba8(), 0, 0);
                DynamicImage::ImageRgba8(canvas)
            }
        }
    }
}

fn scale_side(other: u32, target: u32, source: u32) -> u32 {
    ((other as f64) * (target as f64) / (source.max(1) as f64)).round().max(1.0) as u32
}

/// Output format from a file extension
fn format_for(path: &Path) -> Option<ImageFormat> {
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "gif" => Some(ImageFormat::Gif),
        _ => None,
    }
}

fn encode(img: &DynamicImage, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>, String> {
    let mut buf = Cursor::new(Vec::new());
    match format {
        ImageFormat::Png => img.write_to(&mut buf, ImageOutputFormat::Png),
        ImageFormat::Gif => img.write_to(&mut buf, ImageOutputFormat::Gif),
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut buf, ImageOutputFormat::Jpeg(jpeg_quality)),
    }
    .map_err(|e| e.to_string())?;
    Ok(buf.into_inner())
}

fn encode_png_best(img: &DynamicImage) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive);
    encoder
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())
        .map_err(|e| e.to_string())?;
    Ok(buf)
}

async fn blocking<T, F>(stage: &str, path: &Path, work: F) -> Result<T, StageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StageError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        StageError::new(stage, path, StageErrorKind::Encode, format!("worker failed: {}", e))
    })?
}

/// Resizes each image and optionally changes its format.
#[derive(Debug, Clone)]
pub struct Resize {
    spec: ResizeSpec,
}

impl Resize {
    pub fn new(spec: ResizeSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Transform for Resize {
    fn name(&self) -> &str {
        "resize"
    }

    async fn transform(&self, record: FileRecord) -> Result<Option<FileRecord>, StageError> {
        let Some(bytes) = record.contents.clone() else {
            return Ok(Some(record));
        };
        let path = record.path.clone();
        let spec = self.spec.clone();
        let source_format = format_for(&path);
        let format = spec.format.or(source_format).unwrap_or(ImageFormat::Png);
        // Sources outside gif/png/jpeg are written as PNG and must be renamed
        let rename = spec.format.is_some() || source_format.is_none();

        let err_path = path.clone();
        let encoded = blocking("resize", &path, move || {
            let img = image::load_from_memory(&bytes).map_err(|e| {
                StageError::new("resize", &err_path, StageErrorKind::Decode, e.to_string())
            })?;
            let out = spec.apply(&img);
            encode(&out, format, spec.jpeg_quality)
                .map_err(|msg| StageError::new("resize", &err_path, StageErrorKind::Encode, msg))
        })
        .await?;

        let mut record = record.with_contents(encoded);
        if rename {
            record = record.with_extension(format.extension());
        }
        Ok(Some(record))
    }
}

/// Recompresses images, keeping a result only when it is smaller.
///
/// PNG is re-encoded losslessly at maximum compression, JPEG at
/// [`OPTIMIZE_JPEG_QUALITY`], SVG has comments and inter-tag whitespace
/// stripped. Records that cannot be made smaller are dropped, so nothing is
/// rewritten needlessly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Optimize;

fn svg_noise() -> &'static (Regex, Regex) {
    static NOISE: OnceLock<(Regex, Regex)> = OnceLock::new();
    NOISE.get_or_init(|| {
        (
            Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"),
            Regex::new(r">\s+<").expect("whitespace pattern is valid"),
        )
    })
}

/// Strip comments and whitespace between tags
pub fn minify_svg(text: &str) -> String {
    let (comments, gaps) = svg_noise();
    let stripped = comments.replace_all(text, "");
    gaps.replace_all(stripped.trim(), "><").into_owned()
}

#[async_trait]
impl Transform for Optimize {
    fn name(&self) -> &str {
        "optimize"
    }

    async fn transform(&self, record: FileRecord) -> Result<Option<FileRecord>, StageError> {
        let Some(bytes) = record.contents.clone() else {
            return Ok(None);
        };
        let ext = record.extension().unwrap_or_default();
        let path = record.path.clone();
        let original_len = bytes.len();

        let optimized: Option<Vec<u8>> = match ext.as_str() {
            "svg" => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    StageError::new("optimize", &path, StageErrorKind::Decode, e.to_string())
                })?;
                Some(minify_svg(&text).into_bytes())
            }
            "png" | "jpg" | "jpeg" => {
                let err_path = path.clone();
                let is_png = ext == "png";
                blocking("optimize", &path, move || {
                    let img = image::load_from_memory(&bytes).map_err(|e| {
                        StageError::new("optimize", &err_path, StageErrorKind::Decode, e.to_string())
                    })?;
                    let encoded = if is_png {
                        encode_png_best(&img)
                    } else {
                        encode(&img, ImageFormat::Jpeg, OPTIMIZE_JPEG_QUALITY)
                    };
                    encoded.map(Some).map_err(|msg| {
                        StageError::new("optimize", &err_path, StageErrorKind::Encode, msg)
                    })
                })
                .await?
            }
            _ => None,
        };

        match optimized {
            Some(smaller) if smaller.len() < original_len => {
                tracing::debug!(
                    path = %path.display(),
                    before = original_len,
                    after = smaller.len(),
                    "optimized"
                );
                Ok(Some(record.with_contents(smaller)))
            }
            _ => Ok(None),
        }
    }
}
