use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use bundlelog_types::{Error, Result};

/// Enumerates regular files under a root whose basename matches at least
/// one include pattern
#[derive(Clone, Debug)]
pub struct FileCollector {
    root: PathBuf,
    /// None matches every file
    include: Option<GlobSet>,
}

impl FileCollector {
    pub fn new(root: impl AsRef<Path>, patterns: &[String]) -> Result<Self> {
        let include = if patterns.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in patterns {
                let glob = GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| Error::InvalidPattern {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })?;
                builder.add(glob);
            }
            Some(builder.build().map_err(|e| Error::InvalidPattern {
                pattern: patterns.join(","),
                message: e.to_string(),
            })?)
        };

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            include,
        })
    }

    /// Lazily walk the root in file-name order.
    ///
    /// A missing or unreadable root fails before anything is yielded;
    /// entries that fail mid-walk are skipped with a warning.
    pub fn files(&self) -> Result<impl Iterator<Item = PathBuf> + '_> {
        if !self.root.is_dir() {
            return Err(Error::SearchRootMissing(self.root.clone()));
        }
        fs::read_dir(&self.root).map_err(|source| Error::SearchRootUnreadable {
            path: self.root.clone(),
            source,
        })?;

        let walk = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Failed to read entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(move |entry| self.is_included(entry.path()))
            .map(|entry| {
                debug!("Collected {}", entry.path().display());
                entry.into_path()
            });

        Ok(walk)
    }

    fn is_included(&self, path: &Path) -> bool {
        match &self.include {
            None => true,
            Some(set) => path.file_name().is_some_and(|name| set.is_match(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let pod = dir.path().join("logs/ns/pod-a");
        fs::create_dir_all(&pod).unwrap();
        fs::write(pod.join("app.log"), "x\n").unwrap();
        fs::write(pod.join("app.log.1"), "x\n").unwrap();
        fs::write(pod.join("notes.txt"), "x\n").unwrap();
        fs::write(dir.path().join("top.log"), "x\n").unwrap();
        dir
    }

    fn names(collector: &FileCollector) -> Vec<String> {
        collector
            .files()
            .unwrap()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_empty_patterns_match_everything() {
        let dir = tree();
        let collector = FileCollector::new(dir.path(), &[]).unwrap();
        assert_eq!(
            names(&collector),
            vec!["app.log", "app.log.1", "notes.txt", "top.log"]
        );
    }

    #[test]
    fn test_patterns_are_or_combined_on_basename() {
        let dir = tree();
        let patterns = vec!["*.log".to_string(), "*.log.*".to_string()];
        let collector = FileCollector::new(dir.path(), &patterns).unwrap();
        assert_eq!(names(&collector), vec!["app.log", "app.log.1", "top.log"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let collector = FileCollector::new(dir.path().join("nope"), &[]).unwrap();
        assert!(matches!(
            collector.files().map(|_| ()),
            Err(Error::SearchRootMissing(_))
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileCollector::new(dir.path(), &["[".to_string()]);
        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }
}
