//! Line-oriented scanner for pod list manifests
//!
//! Manifests are the YAML pod lists captured in a bundle. They are scanned
//! as text rather than deserialized: only the pod's name, its controller
//! owner reference and its node placement are needed, and captured files
//! are often truncated or hand-edited.

/// Owner and node found for one pod. Either field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestEntry {
    pub owner: Option<String>,
    pub node: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    /// Looking for the list item whose name matches the pod
    SeekingPod,
    /// Inside the matching item, collecting owner and node
    InOwnerBlock,
    Done,
}

/// Progress through an `ownerReferences:` list
#[derive(Debug)]
struct OwnerRefs {
    key_indent: usize,
    name: Option<String>,
    controller: bool,
}

/// One open level of the YAML structure above the current line
#[derive(Debug)]
enum Frame<'t> {
    /// A list item opened by a dash at this indent
    Item(usize),
    /// A mapping key at this indent
    Key(usize, &'t str),
}

impl Frame<'_> {
    fn indent(&self) -> usize {
        match self {
            Frame::Item(indent) | Frame::Key(indent, _) => *indent,
        }
    }
}

struct PodScan<'a, 't> {
    pod: &'a str,
    state: ScanState,
    /// Open items and keys enclosing the current line, outermost first
    frames: Vec<Frame<'t>>,
    /// Indent of the dash that opened the matching item, None for a
    /// single-object document
    item_indent: Option<usize>,
    owner_refs: Option<OwnerRefs>,
    controller_owner: Option<String>,
    first_owner: Option<String>,
    node: Option<String>,
}

/// Find `pod` in a pod list manifest.
///
/// Returns `None` when no item is named `pod`. The item's block runs until
/// the next list item at the same level (or a document separator, or end
/// of input). The owner is the reference flagged `controller: true`,
/// falling back to the first reference.
pub fn scan_manifest(text: &str, pod: &str) -> Option<ManifestEntry> {
    let mut scan = PodScan {
        pod,
        state: ScanState::SeekingPod,
        frames: Vec::new(),
        item_indent: None,
        owner_refs: None,
        controller_owner: None,
        first_owner: None,
        node: None,
    };

    for line in text.lines() {
        scan.feed(line);
        if scan.state == ScanState::Done {
            break;
        }
    }

    scan.finish()
}

impl<'t> PodScan<'_, 't> {
    fn feed(&mut self, line: &'t str) {
        let line = line.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }
        let indent = line.len() - trimmed.len();

        if trimmed == "---" || trimmed == "..." {
            if self.state == ScanState::InOwnerBlock {
                self.end_block();
            } else {
                self.frames.clear();
            }
            return;
        }

        // A dash line contributes both an item start and a key at indent + 2
        let (is_dash, key_indent, content) = match trimmed.strip_prefix('-') {
            Some(rest) if rest.is_empty() || rest.starts_with(' ') => {
                let content = rest.trim_start();
                (true, indent + (trimmed.len() - content.len()), content)
            }
            _ => (false, indent, trimmed),
        };

        match self.state {
            ScanState::SeekingPod => {
                if is_dash {
                    self.open(Frame::Item(indent));
                }
                let Some((key, value)) = split_key(content) else {
                    return;
                };
                self.open(Frame::Key(key_indent, key));
                if key == "name" && value == self.pod && self.at_object_name() {
                    self.item_indent = self.frames.iter().rev().find_map(|f| match f {
                        Frame::Item(indent) => Some(*indent),
                        Frame::Key(..) => None,
                    });
                    self.state = ScanState::InOwnerBlock;
                }
            }
            ScanState::InOwnerBlock => {
                if let Some(item_indent) = self.item_indent
                    && (indent < item_indent || (is_dash && indent == item_indent))
                {
                    self.end_block();
                    return;
                }
                self.collect(indent, is_dash, content);
            }
            ScanState::Done => {}
        }
    }

    /// Close every level at or below `frame`, then open it
    fn open(&mut self, frame: Frame<'t>) {
        let indent = frame.indent();
        while self.frames.last().is_some_and(|f| f.indent() >= indent) {
            self.frames.pop();
        }
        self.frames.push(frame);
    }

    /// True when the innermost key is an object's own `metadata.name`:
    /// `metadata` sits directly in a list item or at the document top
    fn at_object_name(&self) -> bool {
        match self.frames.as_slice() {
            [.., Frame::Key(_, "metadata"), Frame::Key(_, "name")] => {}
            _ => return false,
        }
        let depth = self.frames.len();
        depth == 2 || matches!(self.frames[depth - 3], Frame::Item(_))
    }

    fn collect(&mut self, indent: usize, is_dash: bool, content: &str) {
        if let Some(refs) = &self.owner_refs {
            let inside = indent > refs.key_indent || (is_dash && indent == refs.key_indent);
            if !inside {
                self.close_owner_refs();
            }
        }

        if let Some(refs) = self.owner_refs.as_mut() {
            // A dash at entry level closes the previous reference
            let finished = if is_dash && indent <= refs.key_indent + 2 {
                Some((refs.name.take(), std::mem::take(&mut refs.controller)))
            } else {
                None
            };
            match split_key(content) {
                Some(("name", value)) if refs.name.is_none() => {
                    refs.name = Some(value.to_string());
                }
                Some(("controller", value)) => {
                    refs.controller = value.eq_ignore_ascii_case("true");
                }
                _ => {}
            }
            if let Some((name, controller)) = finished {
                self.record_owner(name, controller);
            }
            return;
        }

        match split_key(content) {
            Some(("ownerReferences", "")) => {
                self.owner_refs = Some(OwnerRefs {
                    key_indent: indent,
                    name: None,
                    controller: false,
                });
            }
            Some(("nodeName", value)) if self.node.is_none() && !value.is_empty() => {
                self.node = Some(value.to_string());
            }
            _ => {}
        }

        if self.node.is_some() && self.controller_owner.is_some() && self.owner_refs.is_none() {
            self.state = ScanState::Done;
        }
    }

    fn record_owner(&mut self, name: Option<String>, controller: bool) {
        let Some(name) = name else {
            return;
        };
        if controller && self.controller_owner.is_none() {
            self.controller_owner = Some(name.clone());
        }
        if self.first_owner.is_none() {
            self.first_owner = Some(name);
        }
    }

    fn close_owner_refs(&mut self) {
        if let Some(refs) = self.owner_refs.take() {
            self.record_owner(refs.name, refs.controller);
        }
    }

    fn end_block(&mut self) {
        self.close_owner_refs();
        self.state = ScanState::Done;
    }

    fn finish(mut self) -> Option<ManifestEntry> {
        match self.state {
            ScanState::SeekingPod => None,
            ScanState::InOwnerBlock | ScanState::Done => {
                self.close_owner_refs();
                Some(ManifestEntry {
                    owner: self.controller_owner.or(self.first_owner),
                    node: self.node,
                })
            }
        }
    }
}

/// Split `key: value`, unquoting the value. Keys containing spaces are
/// not YAML mapping keys we care about.
fn split_key(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PODS: &str = r#"apiVersion: v1
items:
- apiVersion: v1
  kind: Pod
  metadata:
    managedFields:
    - apiVersion: v1
      manager: kubelet
    name: instance-manager-abc
    namespace: longhorn-system
    ownerReferences:
    - apiVersion: longhorn.io/v1beta2
      blockOwnerDeletion: true
      controller: true
      kind: InstanceManager
      name: instance-manager-abc
      uid: 1111
  spec:
    containers:
    - name: instance-manager
    nodeName: node-1
- apiVersion: v1
  kind: Pod
  metadata:
    name: longhorn-manager-xyz
    ownerReferences:
    - apiVersion: v1
      kind: Node
      name: not-the-controller
    - apiVersion: apps/v1
      controller: true
      kind: DaemonSet
      name: longhorn-manager
  spec:
    nodeName: "node-2"
- apiVersion: v1
  kind: Pod
  metadata:
    name: bare-pod
  spec:
    containers:
    - name: app
- apiVersion: v1
  kind: Pod
  metadata:
    name: orphan-ref
    ownerReferences:
    - kind: ReplicaSet
      name: rs-1
  spec:
    nodeName: node-3
kind: List
"#;

    #[test]
    fn test_scan_finds_owner_and_node() {
        let entry = scan_manifest(PODS, "instance-manager-abc").unwrap();
        assert_eq!(entry.owner.as_deref(), Some("instance-manager-abc"));
        assert_eq!(entry.node.as_deref(), Some("node-1"));
    }

    #[test]
    fn test_scan_prefers_controller_reference() {
        let entry = scan_manifest(PODS, "longhorn-manager-xyz").unwrap();
        assert_eq!(entry.owner.as_deref(), Some("longhorn-manager"));
        assert_eq!(entry.node.as_deref(), Some("node-2"));
    }

    #[test]
    fn test_scan_missing_fields_stay_empty() {
        let entry = scan_manifest(PODS, "bare-pod").unwrap();
        assert_eq!(entry, ManifestEntry::default());
    }

    #[test]
    fn test_scan_does_not_leak_into_next_item() {
        // bare-pod has no nodeName; orphan-ref's node must not be picked up
        let entry = scan_manifest(PODS, "bare-pod").unwrap();
        assert!(entry.node.is_none());
    }

    #[test]
    fn test_scan_falls_back_to_first_reference() {
        let entry = scan_manifest(PODS, "orphan-ref").unwrap();
        assert_eq!(entry.owner.as_deref(), Some("rs-1"));
        assert_eq!(entry.node.as_deref(), Some("node-3"));
    }

    #[test]
    fn test_scan_pod_absent() {
        assert!(scan_manifest(PODS, "no-such-pod").is_none());
        assert!(scan_manifest("", "pod").is_none());
    }

    #[test]
    fn test_scan_single_object_document() {
        let doc = r#"apiVersion: v1
kind: Pod
metadata:
  managedFields:
  - manager: kubelet
  name: solo
  ownerReferences:
  - controller: true
    kind: StatefulSet
    name: solo-set
spec:
  nodeName: node-9
"#;
        let entry = scan_manifest(doc, "solo").unwrap();
        assert_eq!(entry.owner.as_deref(), Some("solo-set"));
        assert_eq!(entry.node.as_deref(), Some("node-9"));
    }

    #[test]
    fn test_scan_truncated_block() {
        let doc = "- metadata:\n    name: cut\n    ownerReferences:\n    - controller: true\n";
        let entry = scan_manifest(doc, "cut").unwrap();
        assert!(entry.owner.is_none());
        assert!(entry.node.is_none());
    }

    #[test]
    fn test_scan_ignores_nested_names() {
        let doc = r#"items:
- metadata:
    name: web-1
    ownerReferences:
    - controller: true
      name: solo
  spec:
    containers:
    - name: solo
    volumes:
    - name: solo
    nodeName: node-a
- metadata:
    name: solo
    ownerReferences:
    - controller: true
      name: solo-set
  spec:
    nodeName: node-9
"#;
        let entry = scan_manifest(doc, "solo").unwrap();
        assert_eq!(entry.owner.as_deref(), Some("solo-set"));
        assert_eq!(entry.node.as_deref(), Some("node-9"));
    }

    #[test]
    fn test_scan_ignores_template_metadata() {
        let doc = "items:\n- metadata:\n    name: ds\n  spec:\n    template:\n      metadata:\n        name: target\n";
        assert!(scan_manifest(doc, "target").is_none());
    }

    #[test]
    fn test_split_key_unquotes() {
        assert_eq!(split_key("name: 'a b'"), Some(("name", "a b")));
        assert_eq!(split_key("nodeName: \"n\""), Some(("nodeName", "n")));
        assert_eq!(split_key("some text: here"), None);
        assert_eq!(split_key("no colon"), None);
    }
}
