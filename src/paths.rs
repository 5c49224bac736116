//! Path templates derived from a theme descriptor.
//!
//! Every function here is pure: identical descriptors and layout produce
//! identical paths, and nothing touches the filesystem. Paths are relative
//! to the project root unless the layout itself holds absolute directories.

use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::theme::ThemeDescriptor;

/// Image extensions handled by `optimize-theme-images`
pub const THEME_IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "svg"];

/// Derives theme paths and globs from the project layout.
#[derive(Debug, Clone)]
pub struct PathTemplater<'a> {
    layout: &'a ProjectConfig,
}

impl<'a> PathTemplater<'a> {
    /// Create a templater over a project layout
    pub fn new(layout: &'a ProjectConfig) -> Self {
        Self { layout }
    }

    /// Deployed static root: `{static_dir}/{area}/{vendor}/{name}/{locale}`
    pub fn static_root(&self, theme: &ThemeDescriptor) -> PathBuf {
        self.layout
            .static_dir
            .join(&theme.area)
            .join(&theme.vendor)
            .join(&theme.name)
            .join(&theme.locale)
    }

    /// Theme source tree: `{design_dir}/{area}/{vendor}/{name}`
    pub fn theme_dir(&self, theme: &ThemeDescriptor) -> PathBuf {
        self.layout.design_dir.join(&theme.area).join(&theme.vendor).join(&theme.name)
    }

    /// Glob over the deployed stylesheet sources under the static root.
    ///
    /// This is what the compiler reads from and what the watcher follows.
    pub fn compiled_glob(&self, theme: &ThemeDescriptor) -> String {
        glob_under(&self.static_root(theme), &format!("**/*.{}", theme.source_extension))
    }

    /// Glob over the stylesheet sources in the theme tree
    pub fn source_glob(&self, theme: &ThemeDescriptor) -> String {
        glob_under(&self.theme_dir(theme), &format!("**/*.{}", theme.source_extension))
    }

    /// Glob over the scripts in the theme tree
    pub fn script_glob(&self, theme: &ThemeDescriptor) -> String {
        glob_under(&self.theme_dir(theme), "**/*.js")
    }

    /// One glob per optimizable image type in the theme tree
    pub fn image_globs(&self, theme: &ThemeDescriptor) -> Vec<String> {
        let dir = self.theme_dir(theme);
        THEME_IMAGE_EXTENSIONS.iter().map(|ext| glob_under(&dir, &format!("**/*.{}", ext))).collect()
    }

    /// Stylesheet entry points, in declared order: `{static_root}/{file}.{source_extension}`
    pub fn entry_paths(&self, theme: &ThemeDescriptor) -> Vec<PathBuf> {
        let root = self.static_root(theme);
        theme
            .files
            .iter()
            .map(|file| root.join(format!("{}.{}", file, theme.source_extension)))
            .collect()
    }

    /// Directory compiled stylesheets are written to
    pub fn css_output_dir(&self, theme: &ThemeDescriptor) -> PathBuf {
        self.static_root(theme).join(&theme.output_extension)
    }

    /// Output location of one compiled entry.
    ///
    /// Each entry is a literal source path, so only its file name survives
    /// into the output directory: `css/styles-m` → `{static_root}/css/styles-m.css`.
    pub fn output_path(&self, theme: &ThemeDescriptor, entry: &str) -> PathBuf {
        let stem = Path::new(entry).file_name().map(|n| n.to_string_lossy().into_owned());
        let stem = stem.unwrap_or_else(|| entry.to_string());
        self.css_output_dir(theme).join(format!("{}.{}", stem, theme.output_extension))
    }

    /// Globs removed by `clean-static`
    pub fn static_clean_globs(&self, theme: &ThemeDescriptor) -> Vec<String> {
        vec![
            glob_under(&self.static_root(theme), "*"),
            glob_under(&self.layout.preprocessed_dir, "*"),
        ]
    }

    /// Globs removed by `clean-cache`
    pub fn cache_clean_globs(&self) -> Vec<String> {
        self.layout.cache_dirs.iter().map(|dir| glob_under(dir, "*")).collect()
    }

    /// Media input glob for `optimize-media-images`
    pub fn media_input_glob(&self, folder: &str) -> String {
        glob_under(&self.layout.media_dir.join(folder), "**/*")
    }

    /// Media output folder for `optimize-media-images`
    pub fn media_output_dir(&self, folder: &str) -> PathBuf {
        self.layout.media_dir.join(folder)
    }
}

/// Join a directory and a glob tail with a forward slash.
fn glob_under(dir: &Path, tail: &str) -> String {
    let dir = dir.to_string_lossy();
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        tail.to_string()
    } else {
        format!("{}/{}", dir, tail)
    }
}
