use bundlelog_k8s::IdentityResolver;
use bundlelog_types::{LogRecord, Resolution};

/// Rewrites the `path:` prefix of sorted records into an identity label
pub struct Annotator<'a> {
    /// None when annotation is disabled for the run
    resolver: Option<&'a mut IdentityResolver>,
}

impl<'a> Annotator<'a> {
    pub fn enabled(resolver: &'a mut IdentityResolver) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    pub fn disabled() -> Self {
        Self { resolver: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.resolver.is_some()
    }

    /// Render one record.
    ///
    /// - structural path, pod resolved: `[ns/owner node]:rest`
    /// - structural path, pod not resolved: `[ns]:rest`
    /// - structural path, annotation disabled: `path:line`
    /// - any other path: the raw line
    ///
    /// `rest` is the line content after the `path:` prefix, without a
    /// leading timestamp token.
    pub fn annotate(&mut self, record: &LogRecord) -> String {
        let Some(tag) = record.path_tag() else {
            return record.raw_line.clone();
        };
        let Some(resolver) = self.resolver.as_deref_mut() else {
            return record.tagged_line();
        };

        let rest = remainder(record);
        match resolver.resolve(&tag.namespace, &tag.pod) {
            Resolution::Found(identity) => format!("{}:{}", identity.label(), rest),
            Resolution::NotFound => format!("[{}]:{}", tag.namespace, rest),
        }
    }
}

fn remainder(record: &LogRecord) -> &str {
    match &record.timestamp_key {
        Some(ts) => record
            .raw_line
            .strip_prefix(ts.as_str())
            .unwrap_or(&record.raw_line),
        None => &record.raw_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlelog_k8s::{IdentityStrategy, Lookup};
    use bundlelog_types::{PodIdentity, PodKey};

    struct Fixed;

    impl IdentityStrategy for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn lookup(&self, key: &PodKey) -> Lookup {
            if key.pod == "pod-abc" {
                Lookup::Found(PodIdentity::new(
                    &key.namespace,
                    &key.pod,
                    Some("deploy-x"),
                    Some("node-1"),
                ))
            } else {
                Lookup::NotFound
            }
        }
    }

    fn keyed(path: &str, line: &str) -> LogRecord {
        let mut record = LogRecord::new(path, line);
        record.timestamp_key = crate::extract_timestamp(line).map(str::to_string);
        record
    }

    #[test]
    fn test_resolved_label() {
        let mut resolver = IdentityResolver::new(vec![Box::new(Fixed)]);
        let mut annotator = Annotator::enabled(&mut resolver);
        let record = keyed(
            "logs/longhorn-system/pod-abc/engine.log",
            "2024-01-01T00:00:01Z started",
        );
        assert_eq!(
            annotator.annotate(&record),
            "[longhorn-system/deploy-x node-1]: started"
        );
    }

    #[test]
    fn test_unresolved_label() {
        let mut resolver = IdentityResolver::new(vec![Box::new(Fixed)]);
        let mut annotator = Annotator::enabled(&mut resolver);
        let record = keyed(
            "/b/logs/longhorn-system/pod-zzz/engine.log",
            "2024-01-01T00:00:01Z started",
        );
        assert_eq!(annotator.annotate(&record), "[longhorn-system]: started");
    }

    #[test]
    fn test_embedded_timestamp_is_kept() {
        let mut resolver = IdentityResolver::new(vec![Box::new(Fixed)]);
        let mut annotator = Annotator::enabled(&mut resolver);
        let record = keyed(
            "logs/ns/pod-abc/app.log",
            "level=info ts=2024-01-01T00:00:01Z msg=ok",
        );
        assert_eq!(
            annotator.annotate(&record),
            "[ns/deploy-x node-1]:level=info ts=2024-01-01T00:00:01Z msg=ok"
        );
    }

    #[test]
    fn test_disabled_keeps_tagged_line() {
        let mut annotator = Annotator::disabled();
        assert!(!annotator.is_enabled());
        let record = keyed("logs/ns/pod-abc/app.log", "2024-01-01T00:00:01Z x");
        assert_eq!(
            annotator.annotate(&record),
            "logs/ns/pod-abc/app.log:2024-01-01T00:00:01Z x"
        );
    }

    #[test]
    fn test_non_structural_path_emits_raw_line() {
        let mut resolver = IdentityResolver::new(vec![Box::new(Fixed)]);
        let mut annotator = Annotator::enabled(&mut resolver);
        let record = keyed("bundle/nodes/node-1/kubelet.log", "2024-01-01T00:00:01Z x");
        assert_eq!(annotator.annotate(&record), "2024-01-01T00:00:01Z x");
    }
}
