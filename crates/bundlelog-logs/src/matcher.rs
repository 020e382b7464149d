use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use bundlelog_types::{Error, LogRecord, Result};

/// Literal, case-sensitive line matcher with an optional exclude string
#[derive(Clone, Debug)]
pub struct LineMatcher {
    needle: String,
    exclude: Option<String>,
}

impl LineMatcher {
    /// An empty `exclude` disables exclusion
    pub fn new(needle: impl Into<String>, exclude: &str) -> Self {
        Self {
            needle: needle.into(),
            exclude: (!exclude.is_empty()).then(|| exclude.to_string()),
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        if !line.contains(&self.needle) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !line.contains(exclude.as_str()),
            None => true,
        }
    }

    /// All matching lines of one file, in file order
    pub fn records_in_file(&self, path: &Path) -> Result<Vec<LogRecord>> {
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
        let source_path = path.to_string_lossy().into_owned();

        let mut records = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).map_err(io_err)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(trim_newline(&buf));
            if self.matches(&line) {
                records.push(LogRecord::new(source_path.clone(), line.into_owned()));
            }
        }
        Ok(records)
    }

    /// Matching lines across files, tagged with their source path.
    ///
    /// A file that cannot be read is skipped with a warning.
    pub fn extract<'a, I>(&'a self, files: I) -> impl Iterator<Item = LogRecord> + 'a
    where
        I: IntoIterator<Item = PathBuf>,
        I::IntoIter: 'a,
    {
        files
            .into_iter()
            .flat_map(move |path| match self.records_in_file(&path) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    Vec::new()
                }
            })
    }
}

pub(crate) fn trim_newline(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_literal_match_and_exclude() {
        let matcher = LineMatcher::new("err.r", "");
        assert!(matcher.matches("an err.r here"));
        assert!(!matcher.matches("an error here"));

        let matcher = LineMatcher::new("ERROR", "healthz");
        assert!(matcher.matches("ERROR failed"));
        assert!(!matcher.matches("ERROR healthz probe"));
        assert!(!matcher.matches("error lowercase"));
    }

    #[test]
    fn test_records_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.log");
        fs::write(&path, "a hit\r\nmiss\nsecond hit\nhit but skip").unwrap();

        let matcher = LineMatcher::new("hit", "skip");
        let records = matcher.records_in_file(&path).unwrap();
        let lines: Vec<_> = records.iter().map(|r| r.raw_line.as_str()).collect();
        assert_eq!(lines, vec!["a hit", "second hit"]);
        assert_eq!(records[0].source_path, path.to_string_lossy());
        assert!(records[0].timestamp_key.is_none());
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.log");
        fs::write(&path, b"hit \xff\xfe\n").unwrap();

        let records = LineMatcher::new("hit", "").records_in_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].raw_line.starts_with("hit "));
    }

    #[test]
    fn test_extract_skips_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.log");
        fs::write(&good, "hit\n").unwrap();
        let files = vec![dir.path().join("missing.log"), good];

        let matcher = LineMatcher::new("hit", "");
        let records: Vec<_> = matcher.extract(files).collect();
        assert_eq!(records.len(), 1);
    }
}
