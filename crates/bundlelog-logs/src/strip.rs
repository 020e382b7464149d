use std::io::{self, BufRead, Write};

use crate::matcher::trim_newline;
use crate::normalize::BlankLineNormalizer;

/// Removes lines containing any of a list of literal substrings
#[derive(Clone, Debug, Default)]
pub struct SubstringFilter {
    needles: Vec<String>,
}

impl SubstringFilter {
    /// Parse a comma-separated removal list. Empty entries are ignored so
    /// that `foo,,bar` does not remove every line.
    pub fn parse(list: &str) -> Self {
        Self {
            needles: list
                .split(',')
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn needles(&self) -> &[String] {
        &self.needles
    }

    pub fn keeps(&self, line: &str) -> bool {
        !self.needles.iter().any(|n| line.contains(n.as_str()))
    }

    /// Drop listed lines, then squeeze blank runs
    pub fn apply<I, S>(&self, lines: I) -> impl Iterator<Item = S>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalizer = BlankLineNormalizer::new();
        lines
            .into_iter()
            .filter(move |line| self.keeps(line.as_ref()))
            .filter(move |line| normalizer.accept(line.as_ref()))
    }

    /// Stream `input` to `output` through [`SubstringFilter::apply`].
    /// Invalid UTF-8 is replaced rather than rejected. Returns the number of
    /// lines written.
    pub fn filter_stream<R, W>(&self, mut input: R, mut output: W) -> io::Result<usize>
    where
        R: BufRead,
        W: Write,
    {
        let mut read_error = None;
        let mut buf = Vec::new();
        let lines = std::iter::from_fn(|| {
            buf.clear();
            match input.read_until(b'\n', &mut buf) {
                Ok(0) => None,
                Ok(_) => Some(String::from_utf8_lossy(trim_newline(&buf)).into_owned()),
                Err(e) => {
                    read_error = Some(e);
                    None
                }
            }
        });

        let mut written = 0;
        for line in self.apply(lines) {
            writeln!(output, "{}", line)?;
            written += 1;
        }
        if let Some(e) = read_error {
            return Err(e);
        }
        output.flush()?;
        Ok(written)
    }
}
