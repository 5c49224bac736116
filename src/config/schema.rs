//! Configuration schema types for `forge.toml`
//!
//! Defines the structure and validation rules for a themeforge project.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project layout section. All paths are relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Theme source tree (`{design_dir}/{area}/{vendor}/{name}`)
    #[serde(default = "default_design_dir")]
    pub design_dir: PathBuf,
    /// Deployed static assets (`{static_dir}/{area}/{vendor}/{name}/{locale}`)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Media root used by `optimize-media-images`
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
    /// Default output folder for `resize-images`
    #[serde(default = "default_resized_dir")]
    pub resized_dir: PathBuf,
    /// Cache folders emptied by `clean-cache`
    #[serde(default = "default_cache_dirs")]
    pub cache_dirs: Vec<PathBuf>,
    /// Preprocessed view folder emptied together with the static root
    #[serde(default = "default_preprocessed_dir")]
    pub preprocessed_dir: PathBuf,
}

fn default_design_dir() -> PathBuf {
    PathBuf::from("app/design")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("pub/static")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("pub/media")
}

fn default_resized_dir() -> PathBuf {
    PathBuf::from("pub/media/resized")
}

fn default_cache_dirs() -> Vec<PathBuf> {
    ["var/page_cache", "var/cache", "var/di", "var/generation"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

fn default_preprocessed_dir() -> PathBuf {
    PathBuf::from("var/view_preprocessed")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            design_dir: default_design_dir(),
            static_dir: default_static_dir(),
            media_dir: default_media_dir(),
            resized_dir: default_resized_dir(),
            cache_dirs: default_cache_dirs(),
            preprocessed_dir: default_preprocessed_dir(),
        }
    }
}

/// One entry of the theme table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Vendor namespace (e.g. "Acme")
    pub vendor: String,
    /// Theme directory name
    pub name: String,
    /// Design area
    #[serde(default = "default_area")]
    pub area: String,
    /// Locale folder of the deployed static assets
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Stylesheet source language extension
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Compiled output extension
    #[serde(default = "default_output_ext")]
    pub output_ext: String,
    /// Ordered stylesheet entry names, without extension
    #[serde(default)]
    pub files: Vec<String>,
}

fn default_area() -> String {
    "frontend".to_string()
}

fn default_locale() -> String {
    "en_US".to_string()
}

fn default_lang() -> String {
    "less".to_string()
}

fn default_output_ext() -> String {
    "css".to_string()
}

/// An external program invoked by a stage.
///
/// Arguments may contain `{placeholder}` tokens that are filled in per
/// invocation, `{file}` being the most common one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Program to execute
    pub command: String,
    /// Argument template
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    /// Create a command config from a program and literal arguments
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self { command: command.to_string(), args: args.iter().map(|a| a.to_string()).collect() }
    }
}

/// A linter: an external program plus its failure policy and ignore list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    /// Program and argument template
    #[serde(flatten)]
    pub command: CommandConfig,
    /// Turn lint violations into a fatal task failure once the stream ends
    #[serde(default)]
    pub fail_on_error: bool,
    /// Exclusion globs appended after the task's own sources
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Vendor prefixing of compiled stylesheets.
///
/// Browser versions are major versions; `None` means the browser is not
/// targeted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoprefixConfig {
    /// Run the autoprefix stage after compilation
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub chrome: Option<u32>,
    #[serde(default)]
    pub firefox: Option<u32>,
    #[serde(default)]
    pub safari: Option<u32>,
    #[serde(default)]
    pub edge: Option<u32>,
    #[serde(default)]
    pub ios: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl Default for AutoprefixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chrome: Some(109),
            firefox: Some(115),
            safari: Some(15),
            edge: Some(109),
            ios: Some(15),
        }
    }
}

/// External tools used by the built-in tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Stylesheet linter
    #[serde(default = "default_style_lint")]
    pub style_lint: LintConfig,
    /// Script linter
    #[serde(default = "default_script_lint")]
    pub script_lint: LintConfig,
    /// Stylesheet compiler; writes the compiled stylesheet to stdout
    #[serde(default = "default_style_compiler")]
    pub style_compiler: CommandConfig,
    /// Vendor prefixing after compilation
    #[serde(default)]
    pub autoprefix: AutoprefixConfig,
    /// Application CLI used by the source/deploy tasks
    #[serde(default = "default_magento")]
    pub magento: CommandConfig,
}

fn default_style_lint() -> LintConfig {
    LintConfig {
        command: CommandConfig::new("npx", &["stylelint", "{file}"]),
        fail_on_error: false,
        ignore: vec!["**/_module.less".to_string(), "**/_widgets.less".to_string()],
    }
}

fn default_script_lint() -> LintConfig {
    LintConfig {
        command: CommandConfig::new("npx", &["eslint", "{file}"]),
        fail_on_error: true,
        ignore: vec!["**/*.min.js".to_string(), "**/requirejs-config.js".to_string()],
    }
}

fn default_style_compiler() -> CommandConfig {
    CommandConfig::new("lessc", &["{file}"])
}

fn default_magento() -> CommandConfig {
    CommandConfig::new("php", &["bin/magento"])
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            style_lint: default_style_lint(),
            script_lint: default_script_lint(),
            style_compiler: default_style_compiler(),
            autoprefix: AutoprefixConfig::default(),
            magento: default_magento(),
        }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

/// Complete forge.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Project layout
    #[serde(default)]
    pub project: ProjectConfig,
    /// Theme table; declaration order is significant (first = default)
    #[serde(default)]
    pub themes: IndexMap<String, ThemeConfig>,
    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "themes.luma.files")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "forge.toml: '{}' {}", self.field, self.message)
    }
}

impl ForgeConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        for (id, theme) in &self.themes {
            if theme.vendor.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("themes.{}.vendor", id),
                    message: "must be a non-empty string".to_string(),
                });
            }
            if theme.name.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("themes.{}.name", id),
                    message: "must be a non-empty string".to_string(),
                });
            }
            if theme.files.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("themes.{}.files", id),
                    message: "must list at least one stylesheet entry".to_string(),
                });
            }
        }

        let commands = [
            ("tools.style_lint.command", &self.tools.style_lint.command),
            ("tools.script_lint.command", &self.tools.script_lint.command),
            ("tools.style_compiler.command", &self.tools.style_compiler),
            ("tools.magento.command", &self.tools.magento),
        ];
        for (field, command) in commands {
            if command.command.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must name a program".to_string(),
                });
            }
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_parse() {
        let config: ForgeConfig = toml::from_str("").unwrap();
        assert!(config.themes.is_empty());
        assert_eq!(config.project.static_dir, PathBuf::from("pub/static"));
        assert_eq!(config.project.cache_dirs.len(), 4);
        assert_eq!(config.tools.style_compiler.command, "lessc");
        assert!(config.tools.script_lint.fail_on_error);
        assert!(!config.tools.style_lint.fail_on_error);
        assert_eq!(config.watch.debounce_ms, 100);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[project]
static_dir = "public/static"
cache_dirs = ["var/cache"]

[themes.luma]
vendor = "Acme"
name = "luma"
files = ["css/styles-m", "css/styles-l"]

[themes.blank]
vendor = "Acme"
name = "blank"
area = "adminhtml"
locale = "de_DE"
lang = "scss"
files = ["css/admin"]

[tools.style_lint]
command = "stylelint"
args = ["--formatter", "string", "{file}"]
fail_on_error = true
ignore = ["**/_extend.less"]

[tools.autoprefix]
enabled = false

[watch]
debounce_ms = 250
"#;
        let config: ForgeConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.project.static_dir, PathBuf::from("public/static"));
        assert_eq!(config.project.cache_dirs, vec![PathBuf::from("var/cache")]);
        assert_eq!(config.project.design_dir, PathBuf::from("app/design"));

        let ids: Vec<_> = config.themes.keys().cloned().collect();
        assert_eq!(ids, vec!["luma".to_string(), "blank".to_string()]);

        let luma = &config.themes["luma"];
        assert_eq!(luma.area, "frontend");
        assert_eq!(luma.locale, "en_US");
        assert_eq!(luma.lang, "less");
        assert_eq!(luma.output_ext, "css");
        assert_eq!(luma.files.len(), 2);

        let blank = &config.themes["blank"];
        assert_eq!(blank.area, "adminhtml");
        assert_eq!(blank.locale, "de_DE");
        assert_eq!(blank.lang, "scss");

        assert_eq!(config.tools.style_lint.command.command, "stylelint");
        assert_eq!(config.tools.style_lint.command.args.len(), 3);
        assert!(config.tools.style_lint.fail_on_error);
        assert_eq!(config.tools.style_lint.ignore, vec!["**/_extend.less".to_string()]);
        assert!(!config.tools.autoprefix.enabled);
        assert_eq!(config.watch.debounce_ms, 250);
    }

    #[test]
    fn test_theme_table_keeps_declaration_order() {
        let toml = r#"
[themes.zeta]
vendor = "V"
name = "zeta"
files = ["a"]

[themes.alpha]
vendor = "V"
name = "alpha"
files = ["a"]

[themes.mid]
vendor = "V"
name = "mid"
files = ["a"]
"#;
        let config: ForgeConfig = toml::from_str(toml).unwrap();
        let ids: Vec<_> = config.themes.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_validation_empty_files() {
        let toml = r#"
[themes.luma]
vendor = "Acme"
name = "luma"
"#;
        let config: ForgeConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "themes.luma.files"));
    }

    #[test]
    fn test_validation_empty_command() {
        let toml = r#"
[tools.style_compiler]
command = " "
"#;
        let config: ForgeConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "tools.style_compiler.command"));
    }

    #[test]
    fn test_validation_zero_debounce() {
        let toml = r#"
[watch]
debounce_ms = 0
"#;
        let config: ForgeConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().iter().any(|e| e.field == "watch.debounce_ms"));
    }

    #[test]
    fn test_validation_error_display() {
        let error = ConfigValidationError {
            field: "themes.luma.vendor".to_string(),
            message: "must be a non-empty string".to_string(),
        };
        assert_eq!(error.to_string(), "forge.toml: 'themes.luma.vendor' must be a non-empty string");
    }
}
