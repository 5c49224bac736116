//! Configuration loading and discovery for `forge.toml`
//!
//! Discovery walks up from the working directory; CLI flags are merged over
//! the file and the result is validated again.

use super::schema::ForgeConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up when discovering the project configuration
pub const CONFIG_FILE_NAME: &str = "forge.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse forge.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the static asset directory
    pub static_dir: Option<PathBuf>,
    /// Override the media directory
    pub media_dir: Option<PathBuf>,
    /// Override the watch debounce delay
    pub debounce_ms: Option<u32>,
}

/// Locate the project's `forge.toml`.
///
/// `tforge` is usually started somewhere inside a shop checkout (often from
/// `app/design/...` or `pub/static/...`), so the working directory and each of
/// its ancestors are tried first. A per-user file under
/// `$XDG_CONFIG_HOME/themeforge/` is the fallback for shops without one.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from).or_else(find_xdg_config)
}

/// Per-user `forge.toml`, `~/.config` standing in for an unset `XDG_CONFIG_HOME`.
pub fn find_xdg_config() -> Option<PathBuf> {
    let base = match env::var_os("XDG_CONFIG_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("themeforge").join(CONFIG_FILE_NAME)).filter(|p| p.is_file())
}

/// Nearest `forge.toml` in `start` or one of its ancestors.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE_NAME)).find(|p| p.is_file())
}

/// Load configuration from a forge.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns a default
/// configuration with an empty theme table.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("shop/forge.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<ForgeConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<ForgeConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration text.
pub fn parse_config(contents: &str) -> Result<ForgeConfig, ConfigError> {
    let config: ForgeConfig = toml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Check a configuration, collecting every problem into one error.
///
/// Run again after [`merge_cli_overrides`], since overrides bypass the file
/// checks.
pub fn validate_config(config: &ForgeConfig) -> Result<(), ConfigError> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}

/// Configuration used when no forge.toml is found.
pub fn default_config() -> ForgeConfig {
    ForgeConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut ForgeConfig, overrides: &CliOverrides) {
    if let Some(ref static_dir) = overrides.static_dir {
        config.project.static_dir = static_dir.clone();
    }

    if let Some(ref media_dir) = overrides.media_dir {
        config.project.media_dir = media_dir.clone();
    }

    if let Some(debounce_ms) = overrides.debounce_ms {
        config.watch.debounce_ms = debounce_ms;
    }
}

/// Shop root for a config file.
///
/// `forge.toml` sits next to `app/`, `pub/` and `var/`, so every layout path
/// in `[project]` is relative to its directory.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Anchor a layout path (`pub/static`, `var/cache`, ...) at the shop root.
/// Absolute paths, e.g. a media mount outside the checkout, are kept.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const THEME_TOML: &[u8] = br#"
[themes.luma]
vendor = "Acme"
name = "luma"
files = ["css/styles-m"]
"#;

    fn write_config(dir: &Path, contents: &[u8]) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, contents).expect("config file is writable");
        path
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("temp dir");
        let config_path = write_config(temp.path(), THEME_TOML);

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("temp dir");
        let config_path = write_config(temp.path(), THEME_TOML);

        let subdir = temp.path().join("app").join("design");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    #[serial_test::serial]
    fn test_find_config_from_working_directory() {
        let temp = TempDir::new().expect("temp dir");
        let config_path = write_config(temp.path(), THEME_TOML);
        let nested = temp.path().join("pub").join("static");
        fs::create_dir_all(&nested).expect("should create subdirectories");

        let previous = env::current_dir().expect("should read working directory");
        env::set_current_dir(&nested).expect("should enter nested directory");
        let found = find_config();
        env::set_current_dir(previous).expect("should restore working directory");

        let found = found.map(|p| p.canonicalize().expect("found path exists"));
        assert_eq!(found, Some(config_path.canonicalize().expect("config exists")));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("temp dir");
        let config_path = write_config(temp.path(), THEME_TOML);

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert!(config.themes.contains_key("luma"));
        assert_eq!(config.themes["luma"].vendor, "Acme");
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("temp dir");
        let config_path = temp.path().join("nonexistent.toml");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("temp dir");
        let config_path = write_config(temp.path(), b"this is not valid toml {{{");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let result = parse_config(
            r#"
[themes.broken]
vendor = ""
name = "broken"
files = []
"#,
        );
        match result {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config_has_no_themes() {
        let config = default_config();
        assert!(config.themes.is_empty());
        assert_eq!(config.project.media_dir, PathBuf::from("pub/media"));
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut config = default_config();
        let overrides = CliOverrides {
            static_dir: Some(PathBuf::from("public/static")),
            debounce_ms: Some(500),
            ..Default::default()
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.project.static_dir, PathBuf::from("public/static"));
        assert_eq!(config.project.media_dir, PathBuf::from("pub/media"));
        assert_eq!(config.watch.debounce_ms, 500);
    }

    #[test]
    fn test_zero_debounce_override_fails_validation() {
        let mut config = parse_config(std::str::from_utf8(THEME_TOML).expect("utf-8")).expect("valid");
        merge_cli_overrides(&mut config, &CliOverrides { debounce_ms: Some(0), ..Default::default() });
        match validate_config(&config) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("watch.debounce_ms"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_cli_overrides_empty() {
        let mut config = default_config();
        merge_cli_overrides(&mut config, &CliOverrides::default());
        assert_eq!(config.project.static_dir, PathBuf::from("pub/static"));
        assert_eq!(config.watch.debounce_ms, 100);
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/shop");
        assert_eq!(resolve_path(root, Path::new("pub/media")), PathBuf::from("/shop/pub/media"));
        assert_eq!(resolve_path(root, Path::new("/abs/media")), PathBuf::from("/abs/media"));
        assert_eq!(project_root(Path::new("/shop/forge.toml")), Some(Path::new("/shop")));
    }
}
