//! Log processing for bundlelog
//!
//! This crate provides file collection, line matching, timestamp sorting,
//! annotation and blank-line normalization.

mod annotate;
mod collector;
mod matcher;
mod normalize;
mod pipeline;
mod sorter;
mod strip;

pub use annotate::Annotator;
pub use collector::FileCollector;
pub use matcher::LineMatcher;
pub use normalize::{BlankLineNormalizer, collapse_blank_lines, separate_records};
pub use pipeline::{SearchOptions, SearchSummary, run_search};
pub use sorter::{Sorted, TimestampSorter, extract_timestamp};
pub use strip::SubstringFilter;

// Re-export types used in our public API
pub use bundlelog_types::{LogRecord, SortOrder};
