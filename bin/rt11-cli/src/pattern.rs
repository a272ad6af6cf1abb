//! Name matching for file transfers
//!
//! Volume names are matched per component (`NAME` and `EXT`). Host names
//! are matched case-insensitively. Both compile `*` and `?` to a regex.

use regex::Regex;
use rt11_common::FileName;
use std::io;
use std::path::{Path, PathBuf};

/// Whether a name contains `*` or `?`
pub fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?'])
}

/// A `*`/`?` wildcard compiled to an anchored regex
pub struct Wildcard {
    pattern: String,
    regex: Option<Regex>,
}

impl Wildcard {
    /// Compile `pattern`; `*` matches any run of characters, `?` exactly one
    pub fn new(pattern: &str, ignore_case: bool) -> Self {
        let mut regex_pattern = String::from(if ignore_case { "(?i)^" } else { "^" });
        for c in pattern.chars() {
            match c {
                '*' => regex_pattern.push_str(".*"),
                '?' => regex_pattern.push('.'),
                c => regex_pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        regex_pattern.push('$');

        Self {
            pattern: pattern.to_string(),
            regex: Regex::new(&regex_pattern).ok(),
        }
    }

    pub fn is_match(&self, value: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(value),
            None => self.pattern == value,
        }
    }
}

/// A volume `NAME.EXT` pattern, matched per component
///
/// The pattern is upper-cased. An empty component, including a missing
/// extension, matches anything.
pub struct VolumePattern {
    base: Option<Wildcard>,
    ext: Option<Wildcard>,
}

impl VolumePattern {
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.to_ascii_uppercase();
        let (base, ext) = pattern.split_once('.').unwrap_or((pattern.as_str(), ""));
        let component = |p: &str| (!p.is_empty()).then(|| Wildcard::new(p, false));
        Self {
            base: component(base),
            ext: component(ext),
        }
    }

    pub fn matches(&self, name: &FileName) -> bool {
        let component = |w: &Option<Wildcard>, value: String| {
            w.as_ref().is_none_or(|w| w.is_match(&value))
        };
        component(&self.base, name.base()) && component(&self.ext, name.extension())
    }
}

/// Regular files in the pattern's directory whose names match its last component
///
/// An empty directory part means the current directory. Results are sorted.
pub fn expand_host_wildcard(pattern: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = match pattern.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_pattern = pattern
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();

    let wildcard = Wildcard::new(&file_pattern, true);
    let mut result = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if wildcard.is_match(&entry.file_name().to_string_lossy()) {
            result.push(entry.path());
        }
    }
    result.sort();
    Ok(result)
}
