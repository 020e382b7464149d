use std::path::{Path, PathBuf};

/// Finds the pod manifest for a namespace inside a bundle.
///
/// Candidates are checked in priority order and the first existing file
/// wins. Results are not cached here; the resolver caches per pod.
#[derive(Clone, Debug)]
pub struct ManifestLocator {
    bundle_root: PathBuf,
}

impl ManifestLocator {
    pub fn new(bundle_root: impl AsRef<Path>) -> Self {
        Self {
            bundle_root: bundle_root.as_ref().to_path_buf(),
        }
    }

    /// Candidate manifest paths for a namespace, highest priority first
    pub fn candidates(&self, namespace: &str) -> Vec<PathBuf> {
        vec![
            // namespaced API-group layout
            self.bundle_root
                .join("yamls")
                .join("namespaced")
                .join(namespace)
                .join("kubernetes")
                .join("pods.yaml"),
            // flat per-namespace layout
            self.bundle_root
                .join("yamls")
                .join(namespace)
                .join("pods.yaml"),
            self.bundle_root
                .join("manifests")
                .join(namespace)
                .join("pods.yaml"),
            self.bundle_root
                .join("objects")
                .join(namespace)
                .join("pods.yaml"),
        ]
    }

    /// First candidate that exists as a regular file
    pub fn locate(&self, namespace: &str) -> Option<PathBuf> {
        if namespace.is_empty() || namespace.contains('/') || namespace == ".." {
            return None;
        }
        self.candidates(namespace).into_iter().find(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "items: []\n").unwrap();
    }

    #[test]
    fn test_locate_none() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ManifestLocator::new(dir.path());
        assert!(locator.locate("longhorn-system").is_none());
    }

    #[test]
    fn test_locate_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ManifestLocator::new(dir.path());
        let candidates = locator.candidates("ns");

        touch(&candidates[3]);
        assert_eq!(locator.locate("ns"), Some(candidates[3].clone()));

        touch(&candidates[1]);
        assert_eq!(locator.locate("ns"), Some(candidates[1].clone()));

        touch(&candidates[0]);
        assert_eq!(locator.locate("ns"), Some(candidates[0].clone()));
    }

    #[test]
    fn test_locate_is_per_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ManifestLocator::new(dir.path());
        touch(&locator.candidates("ns")[2]);
        assert!(locator.locate("ns").is_some());
        assert!(locator.locate("ns-other").is_none());
    }

    #[test]
    fn test_locate_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ManifestLocator::new(dir.path());
        fs::create_dir_all(&locator.candidates("ns")[0]).unwrap();
        assert!(locator.locate("ns").is_none());
    }
}
