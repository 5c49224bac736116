//! Image tasks: theme and media optimization, resizing.

use async_trait::async_trait;

use crate::options::{MediaOptimizeOptions, ResizeOptions};
use crate::pipeline::{Pipeline, Summary};
use crate::stages::{Optimize, Resize, ResizeSpec};
use crate::task::{Invocation, TaskBody, TaskError};
use crate::validate::{validate, Rules, ValidationError};

/// Optimizes the PNG, JPEG and SVG files of the theme tree in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeThemeImages;

#[async_trait]
impl TaskBody for OptimizeThemeImages {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        let ctx = inv.context();
        let paths = ctx.paths();
        let summary = Pipeline::new(&inv.task)
            .root(ctx.project_root())
            .sources(paths.image_globs(ctx.theme()))
            .transform(Optimize)
            .dest(paths.theme_dir(ctx.theme()))
            .run()
            .await?;
        Ok(Some(summary))
    }
}

fn media_rules(options: &MediaOptimizeOptions) -> Result<Rules, ValidationError> {
    Rules::for_record(options).required("input").optional("output").build()
}

/// Optimizes every file of a media folder into another (or the same) folder.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeMediaImages;

#[async_trait]
impl TaskBody for OptimizeMediaImages {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        let ctx = inv.context();
        let options = &ctx.options().media;
        validate(options, &media_rules(options)?)?;

        let input = options.input.as_deref().unwrap_or_default();
        let output = options.output_folder().unwrap_or(input);
        let paths = ctx.paths();
        let summary = Pipeline::new(&inv.task)
            .root(ctx.project_root())
            .source(paths.media_input_glob(input))
            .transform(Optimize)
            .dest(paths.media_output_dir(output))
            .run()
            .await?;
        Ok(Some(summary))
    }
}

fn resize_rules(options: &ResizeOptions) -> Result<Rules, ValidationError> {
    Rules::for_record(options)
        .required("input")
        .at_least_one_of(&["width", "height"])
        .optional("output")
        .optional("gravity")
        .optional("format")
        .optional("background")
        .optional("percentage")
        .build()
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::Invalid {
        task: "resize-images".to_string(),
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate resize options and resolve them into a stage spec.
///
/// Runs before any pipeline exists, so a rejected invocation touches no files.
pub fn resize_spec(options: &ResizeOptions) -> Result<ResizeSpec, ValidationError> {
    validate(options, &resize_rules(options)?)?;
    if !(0.0..=1.0).contains(&options.quality) {
        return Err(invalid("quality", format!("{} is outside 0..1", options.quality)));
    }
    if let Some(pct) = options.percentage {
        if pct <= 0.0 {
            return Err(invalid("percentage", "must be positive"));
        }
    }
    ResizeSpec::from_options(options).map_err(|e| invalid("background", e.to_string()))
}

/// Resizes the images matched by `--input` into `--output`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizeImages;

#[async_trait]
impl TaskBody for ResizeImages {
    async fn run(&self, inv: &Invocation) -> Result<Option<Summary>, TaskError> {
        let ctx = inv.context();
        let options = &ctx.options().resize;
        let spec = resize_spec(options)?;

        let output = options.output.clone().unwrap_or_else(|| ctx.config().project.resized_dir.clone());
        let input = options.input.clone().unwrap_or_default();
        let summary = Pipeline::new(&inv.task)
            .root(ctx.project_root())
            .source(input)
            .transform(Resize::new(spec))
            .dest(output)
            .run()
            .await?;
        Ok(Some(summary))
    }
}
