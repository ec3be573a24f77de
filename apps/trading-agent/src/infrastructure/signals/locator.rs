//! Signal file discovery by file name pattern.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::Regex;

use crate::application::ports::SignalError;

/// A `dir/name-pattern` file pattern. Only the file name may contain `*` or `?`.
#[derive(Debug, Clone)]
pub struct FilePattern {
    raw: String,
    dir: PathBuf,
    name: Regex,
}

impl FilePattern {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// [`SignalError::InvalidPattern`] if the pattern has no file name or puts a
    /// wildcard in a directory component.
    pub fn new(pattern: &str) -> Result<Self, SignalError> {
        let invalid = |message: &str| SignalError::InvalidPattern {
            pattern: pattern.to_string(),
            message: message.to_string(),
        };

        let path = Path::new(pattern);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| invalid("missing file name"))?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if dir.to_string_lossy().contains(|c: char| c == '*' || c == '?') {
            return Err(invalid("wildcards are only supported in the file name"));
        }

        let mut expr = String::from("^");
        for c in name.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        expr.push('$');

        let name = Regex::new(&expr).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            raw: pattern.to_string(),
            dir,
            name,
        })
    }

    /// Directory searched.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `file_name` matches the name part.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        self.name.is_match(file_name)
    }

    /// The newest matching regular file by modification time, if any.
    ///
    /// A missing directory matches nothing. Ties go to the lexically first path.
    ///
    /// # Errors
    ///
    /// [`SignalError::Io`] if the directory exists but cannot be listed.
    pub fn newest(&self) -> Result<Option<PathBuf>, SignalError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SignalError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut candidates: Vec<(PathBuf, SystemTime)> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_str().is_some_and(|n| self.matches(n)))
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                Some((entry.path(), meta.modified().ok()?))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let mut newest: Option<(PathBuf, SystemTime)> = None;
        for (path, modified) in candidates {
            if newest.as_ref().is_none_or(|(_, best)| modified > *best) {
                newest = Some((path, modified));
            }
        }

        tracing::debug!(pattern = %self.raw, found = ?newest.as_ref().map(|(p, _)| p), "Signal file lookup");
        Ok(newest.map(|(path, _)| path))
    }
}

/// The newest file matching `pattern`, or `None` if nothing matches.
///
/// # Errors
///
/// See [`FilePattern::new`] and [`FilePattern::newest`].
pub fn find_latest_signal_file(pattern: &str) -> Result<Option<PathBuf>, SignalError> {
    FilePattern::new(pattern)?.newest()
}
