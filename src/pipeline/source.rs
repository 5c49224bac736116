//! Source pattern lists and file enumeration.
//!
//! A source list is an ordered set of glob patterns. Patterns prefixed with
//! `!` are exclusions. A path survives when the last pattern in the list that
//! matches it is an inclusion, so an exclusion only removes files matched by
//! inclusions placed before it.

use glob::{glob_with, MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::result::PipelineError;
use super::stage::FileRecord;

/// Glob characters that end the literal prefix of a pattern
const GLOB_META: [char; 3] = ['*', '?', '['];

fn match_options() -> MatchOptions {
    MatchOptions { case_sensitive: true, require_literal_separator: true, require_literal_leading_dot: false }
}

/// One parsed entry of a source list.
#[derive(Debug, Clone)]
pub struct SourcePattern {
    /// Pattern text after root joining, without the `!` prefix
    pub glob: String,
    pub exclude: bool,
    /// Literal directory prefix of the pattern
    pub base: PathBuf,
    pattern: Pattern,
}

impl SourcePattern {
    /// Parse one entry, joining relative patterns onto `root`
    pub fn parse(root: &Path, raw: &str) -> Result<Self, PipelineError> {
        let (exclude, text) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let glob = if Path::new(text).is_absolute() || root.as_os_str().is_empty() {
            text.to_string()
        } else {
            format!("{}/{}", root.to_string_lossy().trim_end_matches('/'), text)
        };
        let pattern = Pattern::new(&glob).map_err(|e| PipelineError::InvalidPattern {
            pattern: raw.to_string(),
            message: e.msg.to_string(),
        })?;
        let base = glob_base(&glob);
        Ok(Self { glob, exclude, base, pattern })
    }

    /// True when the pattern has no glob characters and names a single path
    pub fn is_literal(&self) -> bool {
        !self.glob.contains(GLOB_META)
    }

    /// Whether the pattern matches a path
    pub fn matches(&self, path: &Path) -> bool {
        self.pattern.matches_path_with(path, match_options())
    }
}

/// Literal directory prefix of a glob.
///
/// For `a/b/**/*.less` this is `a/b`. A pattern without glob characters names
/// a single file, whose base is its parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut literal = Vec::new();
    let mut has_meta = false;
    for part in pattern.split('/') {
        if part.contains(GLOB_META) {
            has_meta = true;
            break;
        }
        literal.push(part);
    }
    if !has_meta {
        literal.pop();
    }
    let joined = literal.join("/");
    if joined.is_empty() && pattern.starts_with('/') {
        PathBuf::from("/")
    } else {
        PathBuf::from(joined)
    }
}

/// An ordered list of inclusion and exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct SourceList {
    patterns: Vec<SourcePattern>,
}

impl SourceList {
    /// Parse every entry up front; any invalid pattern fails the whole list
    pub fn parse<S: AsRef<str>>(root: &Path, raw: &[S]) -> Result<Self, PipelineError> {
        let patterns =
            raw.iter().map(|p| SourcePattern::parse(root, p.as_ref())).collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[SourcePattern] {
        &self.patterns
    }

    /// True when the last pattern matching `path` is an inclusion
    pub fn survives(&self, path: &Path) -> bool {
        self.patterns.iter().rev().find(|p| p.matches(path)).is_some_and(|p| !p.exclude)
    }

    /// Enumerate surviving paths in glob order, each once.
    ///
    /// Blocks; run it on the blocking pool. Sending blocks while the channel
    /// is full, which pauses enumeration until the consumer catches up.
    /// Returns the number of records sent.
    pub fn enumerate(&self, include_dirs: bool, tx: mpsc::Sender<FileRecord>) -> usize {
        let mut seen = HashSet::new();
        let mut sent = 0;
        for inclusion in self.patterns.iter().filter(|p| !p.exclude) {
            let entries = match glob_with(&inclusion.glob, match_options()) {
                Ok(entries) => entries,
                Err(e) => {
                    // Already validated by Pattern::new; kept for the glob walker's own checks
                    warn!(pattern = %inclusion.glob, "skipping pattern: {}", e);
                    continue;
                }
            };
            let mut found = 0usize;
            for entry in entries {
                found += 1;
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("error reading path: {}", e);
                        continue;
                    }
                };
                if !include_dirs && !path.is_file() {
                    continue;
                }
                if !seen.insert(path.clone()) {
                    continue;
                }
                if !self.survives(&path) {
                    debug!(path = %path.display(), "excluded");
                    continue;
                }
                let record = FileRecord::new(path, inclusion.base.clone());
                if tx.blocking_send(record).is_err() {
                    // Consumer went away
                    return sent;
                }
                sent += 1;
            }
            if found == 0 && inclusion.is_literal() {
                warn!(path = %inclusion.glob, "source file not found");
            }
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn list(patterns: &[&str]) -> SourceList {
        SourceList::parse(Path::new(""), patterns).unwrap()
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("a/b/**/*.less"), PathBuf::from("a/b"));
        assert_eq!(glob_base("a/b/*.less"), PathBuf::from("a/b"));
        assert_eq!(glob_base("a/b/app.less"), PathBuf::from("a/b"));
        assert_eq!(glob_base("*.less"), PathBuf::from(""));
        assert_eq!(glob_base("/*"), PathBuf::from("/"));
        assert_eq!(glob_base("/srv/x/[ab].css"), PathBuf::from("/srv/x"));
    }

    #[test]
    fn test_literal_patterns() {
        let sources = list(&["css/app.less", "css/*.less", "!css/_module.less", "img/[ab].png"]);
        let literal: Vec<bool> = sources.patterns().iter().map(SourcePattern::is_literal).collect();
        assert_eq!(literal, vec![true, false, true, false]);
    }

    #[test]
    fn test_exclusion_after_inclusion_removes() {
        let sources = list(&["css/*.less", "!css/_module.less"]);
        assert!(!sources.survives(Path::new("css/_module.less")));
        assert!(sources.survives(Path::new("css/app.less")));
    }

    #[test]
    fn test_exclusion_before_inclusion_has_no_effect() {
        let sources = list(&["!css/_module.less", "css/*.less"]);
        assert!(sources.survives(Path::new("css/_module.less")));
    }

    #[test]
    fn test_reinclusion_wins() {
        let sources = list(&["css/*.less", "!css/_*.less", "css/_keep.less"]);
        assert!(sources.survives(Path::new("css/_keep.less")));
        assert!(!sources.survives(Path::new("css/_drop.less")));
    }

    #[test]
    fn test_double_star_exclusion_crosses_directories() {
        let sources = list(&["theme/**/*.less", "!**/_widgets.less"]);
        assert!(!sources.survives(Path::new("theme/web/css/source/_widgets.less")));
        assert!(sources.survives(Path::new("theme/web/css/source/_buttons.less")));
    }

    #[test]
    fn test_single_star_stays_in_directory() {
        let sources = list(&["css/*.less"]);
        assert!(!sources.survives(Path::new("css/nested/app.less")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = SourceList::parse(Path::new(""), &["css/[.less"]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPattern { ref pattern, .. } if pattern == "css/[.less"));
    }

    #[test]
    fn test_relative_patterns_joined_to_root() {
        let sources = SourceList::parse(Path::new("/shop/"), &["pub/*.css", "!/abs/*.css"]).unwrap();
        assert_eq!(sources.patterns()[0].glob, "/shop/pub/*.css");
        assert_eq!(sources.patterns()[0].base, PathBuf::from("/shop/pub"));
        assert_eq!(sources.patterns()[1].glob, "/abs/*.css");
        assert!(sources.patterns()[1].exclude);
    }

    #[test]
    fn test_enumerate_dedupes_and_filters() {
        let temp = TempDir::new().unwrap();
        let css = temp.path().join("css");
        fs::create_dir_all(css.join("sub")).unwrap();
        fs::write(css.join("app.less"), "a").unwrap();
        fs::write(css.join("_module.less"), "m").unwrap();
        fs::write(css.join("sub").join("deep.less"), "d").unwrap();

        let sources =
            SourceList::parse(temp.path(), &["css/*.less", "css/**/*.less", "!css/_module.less"])
                .unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let sent = sources.enumerate(false, tx);
        assert_eq!(sent, 2);

        let mut names = Vec::new();
        while let Ok(record) = rx.try_recv() {
            names.push(record.relative_path());
        }
        assert_eq!(names, vec![PathBuf::from("app.less"), PathBuf::from("sub/deep.less")]);
    }

    #[test]
    fn test_enumerate_directories_on_request() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("cache").join("page")).unwrap();
        fs::write(temp.path().join("cache").join("entry"), "x").unwrap();

        let sources = SourceList::parse(temp.path(), &["cache/*"]).unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        assert_eq!(sources.enumerate(true, tx), 2);
        assert!(rx.try_recv().is_ok());

        let (tx, _rx) = mpsc::channel(16);
        assert_eq!(sources.enumerate(false, tx), 1);
    }

    #[test]
    fn test_enumerate_skips_missing_literal() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("css")).unwrap();
        fs::write(temp.path().join("css").join("print.less"), "p").unwrap();

        let sources =
            SourceList::parse(temp.path(), &["css/styles-m.less", "css/print.less"]).unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        assert_eq!(sources.enumerate(false, tx), 1);
        assert_eq!(rx.try_recv().unwrap().relative_path(), PathBuf::from("print.less"));
    }
}
