//! Theme resolution.
//!
//! Turns a requested theme identifier into an immutable [`ThemeDescriptor`]
//! using the ordered theme table from `forge.toml`.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::config::ThemeConfig;

/// Error during theme resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeError {
    /// A theme was requested that the table does not declare
    #[error("unknown theme '{requested}' (available: {})", .available.join(", "))]
    UnknownTheme {
        /// The identifier that was asked for
        requested: String,
        /// Declared identifiers, in table order
        available: Vec<String>,
    },
    /// The theme table is empty
    #[error("no themes configured; add a [themes.<id>] table to forge.toml")]
    NoThemes,
}

/// Resolved identity, languages and entry list of one themed asset set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ThemeDescriptor {
    /// Key of the theme in the table
    pub identifier: String,
    pub vendor: String,
    pub name: String,
    pub area: String,
    pub locale: String,
    /// Extension of compiled stylesheets (e.g. "css")
    pub output_extension: String,
    /// Extension of stylesheet sources (e.g. "less")
    pub source_extension: String,
    /// Ordered stylesheet entries, without extension
    pub files: Vec<String>,
}

impl ThemeDescriptor {
    fn from_config(identifier: &str, config: &ThemeConfig) -> Self {
        Self {
            identifier: identifier.to_string(),
            vendor: config.vendor.clone(),
            name: config.name.clone(),
            area: config.area.clone(),
            locale: config.locale.clone(),
            output_extension: config.output_ext.clone(),
            source_extension: config.lang.clone(),
            files: config.files.clone(),
        }
    }

    /// `Vendor/name`, the form the application CLI expects
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.vendor, self.name)
    }
}

/// Resolves theme identifiers against the configured table.
#[derive(Debug, Clone)]
pub struct ThemeResolver<'a> {
    themes: &'a IndexMap<String, ThemeConfig>,
}

impl<'a> ThemeResolver<'a> {
    /// Create a resolver over a theme table
    pub fn new(themes: &'a IndexMap<String, ThemeConfig>) -> Self {
        Self { themes }
    }

    /// Resolve a theme.
    ///
    /// With no identifier the first declared theme is returned. An identifier
    /// missing from the table is an error rather than a silent fallback, so a
    /// misspelled `--theme` never builds the wrong theme.
    pub fn resolve(&self, requested: Option<&str>) -> Result<ThemeDescriptor, ThemeError> {
        match requested {
            Some(id) => match self.themes.get(id) {
                Some(config) => Ok(ThemeDescriptor::from_config(id, config)),
                None => Err(ThemeError::UnknownTheme {
                    requested: id.to_string(),
                    available: self.themes.keys().cloned().collect(),
                }),
            },
            None => self
                .themes
                .get_index(0)
                .map(|(id, config)| ThemeDescriptor::from_config(id, config))
                .ok_or(ThemeError::NoThemes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForgeConfig;

    fn table() -> IndexMap<String, ThemeConfig> {
        let config: ForgeConfig = toml::from_str(
            r#"
[themes.luma]
vendor = "Acme"
name = "luma"
files = ["css/styles-m", "css/styles-l"]

[themes.backend]
vendor = "Acme"
name = "backend"
area = "adminhtml"
locale = "fr_FR"
files = ["css/admin"]
"#,
        )
        .unwrap();
        config.themes
    }

    #[test]
    fn test_resolve_known_theme() {
        let themes = table();
        let theme = ThemeResolver::new(&themes).resolve(Some("backend")).unwrap();
        assert_eq!(theme.identifier, "backend");
        assert_eq!(theme.area, "adminhtml");
        assert_eq!(theme.locale, "fr_FR");
        assert_eq!(theme.source_extension, "less");
        assert_eq!(theme.output_extension, "css");
        assert_eq!(theme.files, vec!["css/admin".to_string()]);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let themes = table();
        let resolver = ThemeResolver::new(&themes);
        for id in ["luma", "backend"] {
            let first = resolver.resolve(Some(id)).unwrap();
            let second = resolver.resolve(Some(id)).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_resolve_default_is_first_entry() {
        let themes = table();
        let resolver = ThemeResolver::new(&themes);
        // Resolve something else first; the default must not depend on call order
        resolver.resolve(Some("backend")).unwrap();
        let theme = resolver.resolve(None).unwrap();
        assert_eq!(theme.identifier, "luma");
        assert_eq!(resolver.resolve(None).unwrap(), theme);
    }

    #[test]
    fn test_resolve_unknown_theme() {
        let themes = table();
        let err = ThemeResolver::new(&themes).resolve(Some("nonexistent")).unwrap_err();
        assert_eq!(
            err,
            ThemeError::UnknownTheme {
                requested: "nonexistent".to_string(),
                available: vec!["luma".to_string(), "backend".to_string()],
            }
        );
        assert!(err.to_string().contains("luma, backend"));
    }

    #[test]
    fn test_resolve_empty_table() {
        let themes = IndexMap::new();
        let resolver = ThemeResolver::new(&themes);
        assert_eq!(resolver.resolve(None), Err(ThemeError::NoThemes));
        assert!(matches!(resolver.resolve(Some("luma")), Err(ThemeError::UnknownTheme { .. })));
    }

    #[test]
    fn test_qualified_name() {
        let themes = table();
        let theme = ThemeResolver::new(&themes).resolve(Some("luma")).unwrap();
        assert_eq!(theme.qualified_name(), "Acme/luma");
    }
}
