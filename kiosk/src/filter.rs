//! URL block list consulted by the webview's request hooks.
//!
//! The list is read once at startup from a line-oriented text file: one
//! pattern per line, blank lines and `#` comments ignored. A pattern
//! containing `*` is a glob matched against the whole URL (`*` spans any run
//! of characters, including none). A pattern without `*` matches any URL that
//! contains it.
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::{debug, info, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestVerdict {
    Allow,
    Cancel,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum UrlPattern {
    Glob(Vec<String>),
    Contains(String),
}

impl UrlPattern {
    fn parse(line: &str) -> Self {
        if line.contains('*') {
            UrlPattern::Glob(line.split('*').map(str::to_string).collect())
        } else {
            UrlPattern::Contains(line.to_string())
        }
    }

    fn matches(&self, url: &str) -> bool {
        match self {
            UrlPattern::Contains(needle) => url.contains(needle.as_str()),
            UrlPattern::Glob(segments) => glob_matches(segments, url),
        }
    }
}

/// `segments` is the pattern split on `*`, so there is an implicit wildcard
/// between every pair of segments.
fn glob_matches(segments: &[String], url: &str) -> bool {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return url.is_empty(),
    };

    let Some(mut remaining) = url.strip_prefix(first.as_str()) else {
        return false;
    };

    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };

    for segment in middle {
        match remaining.find(segment.as_str()) {
            Some(index) => remaining = &remaining[index + segment.len()..],
            None => return false,
        }
    }

    remaining.ends_with(last.as_str())
}

/// Immutable after load and shared read-only between request hooks.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BlockFilterList {
    patterns: Vec<UrlPattern>,
}

impl BlockFilterList {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let patterns = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(UrlPattern::parse)
            .collect();

        Self { patterns }
    }

    /// Never fails: an unreadable or missing file disables filtering.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => {
                let list = Self::parse(&text);
                info!(
                    "Loaded {} block pattern(s) from {}",
                    list.len(),
                    path.display()
                );
                list
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    "Block list {} not found; request filtering disabled",
                    path.display()
                );
                Self::empty()
            }
            Err(err) => {
                warn!(
                    "Failed to read block list {}: {}; \
                     request filtering disabled",
                    path.display(),
                    err
                );
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_blocked(&self, url: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(url))
    }

    pub fn check(&self, url: &str) -> RequestVerdict {
        if self.is_blocked(url) {
            debug!("Cancelled request to {}", url);
            RequestVerdict::Cancel
        } else {
            RequestVerdict::Allow
        }
    }
}
