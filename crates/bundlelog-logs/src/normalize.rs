/// Streaming filter that squeezes runs of empty lines down to one
#[derive(Clone, Copy, Debug, Default)]
pub struct BlankLineNormalizer {
    previous_blank: bool,
}

impl BlankLineNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `line` should be emitted
    pub fn accept(&mut self, line: &str) -> bool {
        let blank = line.is_empty();
        let keep = !(blank && self.previous_blank);
        self.previous_blank = blank;
        keep
    }
}

/// Collapse consecutive empty lines to a single one
pub fn collapse_blank_lines<I, S>(lines: I) -> impl Iterator<Item = S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalizer = BlankLineNormalizer::new();
    lines
        .into_iter()
        .filter(move |line| normalizer.accept(line.as_ref()))
}

/// Follow every line with an empty line
pub fn separate_records<I>(lines: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = String>,
{
    lines
        .into_iter()
        .flat_map(|line| [line, String::new()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collapse(lines: &[&str]) -> Vec<String> {
        collapse_blank_lines(lines.iter().map(|l| l.to_string())).collect()
    }

    #[test]
    fn test_collapse_runs() {
        assert_eq!(
            collapse(&["a", "", "", "", "b", "", "c", "", ""]),
            vec!["a", "", "b", "", "c", ""]
        );
    }

    #[test]
    fn test_leading_blank_kept_once() {
        assert_eq!(collapse(&["", "", "a"]), vec!["", "a"]);
    }

    #[test]
    fn test_whitespace_only_is_not_blank() {
        assert_eq!(collapse(&[" ", " ", "a"]), vec![" ", " ", "a"]);
    }

    #[test]
    fn test_idempotent() {
        let input = ["", "x", "", "", "y", "", "", "", "z", ""];
        let once = collapse(&input);
        let refs: Vec<&str> = once.iter().map(String::as_str).collect();
        assert_eq!(collapse(&refs), once);
    }

    #[test]
    fn test_separate_then_collapse() {
        let lines = vec!["a".to_string(), String::new(), "b".to_string()];
        let out: Vec<String> = collapse_blank_lines(separate_records(lines)).collect();
        assert_eq!(out, vec!["a", "", "b", ""]);
    }
}
