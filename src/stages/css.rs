//! Vendor prefixing of compiled stylesheets with lightningcss.

use async_trait::async_trait;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::config::AutoprefixConfig;
use crate::pipeline::{FileRecord, StageError, StageErrorKind, Transform};

/// lightningcss encodes versions as `major << 16 | minor << 8 | patch`
fn version(major: Option<u32>) -> Option<u32> {
    major.map(|v| v << 16)
}

/// Browser targets of an autoprefix configuration
pub fn browsers(config: &AutoprefixConfig) -> Browsers {
    Browsers {
        chrome: version(config.chrome),
        firefox: version(config.firefox),
        safari: version(config.safari),
        edge: version(config.edge),
        ios_saf: version(config.ios),
        ..Browsers::default()
    }
}

/// Adds the vendor prefixes the configured browsers need.
#[derive(Debug, Clone)]
pub struct Autoprefix {
    browsers: Browsers,
}

impl Autoprefix {
    pub fn new(config: &AutoprefixConfig) -> Self {
        Self { browsers: browsers(config) }
    }

    fn targets(&self) -> Targets {
        Targets::from(self.browsers)
    }

    /// Prefix one stylesheet
    pub fn process(&self, filename: &str, code: &str) -> Result<String, String> {
        let options = ParserOptions { filename: filename.to_string(), ..ParserOptions::default() };
        let mut sheet = StyleSheet::parse(code, options).map_err(|e| e.to_string())?;
        sheet
            .minify(MinifyOptions { targets: self.targets(), ..MinifyOptions::default() })
            .map_err(|e| e.to_string())?;
        let printed = sheet
            .to_css(PrinterOptions { targets: self.targets(), ..PrinterOptions::default() })
            .map_err(|e| e.to_string())?;
        Ok(printed.code)
    }
}

#[async_trait]
impl Transform for Autoprefix {
    fn name(&self) -> &str {
        "autoprefix"
    }

    async fn transform(&self, record: FileRecord) -> Result<Option<FileRecord>, StageError> {
        let Some(bytes) = record.contents.as_deref() else {
            return Ok(Some(record));
        };
        let code = std::str::from_utf8(bytes).map_err(|e| {
            StageError::new("autoprefix", &record.path, StageErrorKind::Decode, e.to_string())
        })?;
        let filename = record.path.to_string_lossy();
        let prefixed = self
            .process(&filename, code)
            .map_err(|msg| StageError::new("autoprefix", &record.path, StageErrorKind::Css, msg))?;
        Ok(Some(record.clone().with_contents(prefixed.into_bytes())))
    }
}
