use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use bundlelog_types::{Error, Result, SortOrder};

use crate::annotate::Annotator;
use crate::collector::FileCollector;
use crate::matcher::LineMatcher;
use crate::normalize::{collapse_blank_lines, separate_records};
use crate::sorter::TimestampSorter;

/// What to search and how to order it
#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub root: PathBuf,
    /// Basename globs, empty matches every file
    pub include: Vec<String>,
    /// Literal search string
    pub needle: String,
    /// Literal exclude string, empty disables exclusion
    pub exclude: String,
    pub order: SortOrder,
}

/// Counters from one search run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchSummary {
    pub files: usize,
    pub matched: usize,
    pub dropped_without_timestamp: usize,
    pub lines_written: usize,
}

/// Run collect → match → sort → annotate → separate → normalize and write
/// the stream to `out`.
///
/// Fails only on a missing/unreadable search root, a bad include pattern,
/// or when `out` cannot be written.
pub fn run_search<W: Write>(
    options: &SearchOptions,
    annotator: &mut Annotator<'_>,
    mut out: W,
) -> Result<SearchSummary> {
    let collector = FileCollector::new(&options.root, &options.include)?;
    let matcher = LineMatcher::new(options.needle.as_str(), &options.exclude);
    let sorter = TimestampSorter::new(options.order);

    let mut summary = SearchSummary::default();
    let files = collector.files()?.inspect(|_| summary.files += 1);
    let records: Vec<_> = matcher.extract(files).collect();
    summary.matched = records.len();

    let sorted = sorter.sort(records);
    summary.dropped_without_timestamp = sorted.dropped;
    info!(
        "Matched {} lines in {} files, {} sorted ({})",
        summary.matched,
        summary.files,
        sorted.records.len(),
        options.order.as_str()
    );

    let annotated = sorted.records.iter().map(|record| annotator.annotate(record));
    for line in collapse_blank_lines(separate_records(annotated)) {
        writeln!(out, "{}", line).map_err(Error::Output)?;
        summary.lines_written += 1;
    }
    out.flush().map_err(Error::Output)?;

    Ok(summary)
}
