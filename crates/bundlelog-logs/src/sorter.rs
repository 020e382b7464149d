use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use bundlelog_types::{LogRecord, SortOrder};

/// ISO-8601-like token: `YYYY-MM-DDT` followed by a run of digits, colons
/// and periods, with an optional `Z`
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9:.]+Z?").expect("timestamp pattern is valid")
});

/// First timestamp-looking token in a line
pub fn extract_timestamp(line: &str) -> Option<&str> {
    TIMESTAMP.find(line).map(|m| m.as_str())
}

/// Orders records globally by their timestamp token.
///
/// Tokens compare as plain strings, which matches chronological order as
/// long as the corpus uses one precision and zone convention.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimestampSorter {
    order: SortOrder,
}

/// Result of a sort pass
#[derive(Debug, Default)]
pub struct Sorted {
    pub records: Vec<LogRecord>,
    /// Records dropped for lacking a timestamp
    pub dropped: usize,
}

impl TimestampSorter {
    pub fn new(order: SortOrder) -> Self {
        Self { order }
    }

    /// Buffer every record, key it, and sort.
    ///
    /// Records without a timestamp are dropped. The sort is stable, and
    /// descending order is the exact reverse of ascending, ties included.
    pub fn sort<I>(&self, records: I) -> Sorted
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let mut dropped = 0;
        let mut keyed: Vec<LogRecord> = records
            .into_iter()
            .filter_map(|mut record| match extract_timestamp(&record.raw_line) {
                Some(ts) => {
                    record.timestamp_key = Some(ts.to_string());
                    Some(record)
                }
                None => {
                    dropped += 1;
                    None
                }
            })
            .collect();

        keyed.sort_by(|a, b| a.timestamp_key.cmp(&b.timestamp_key));
        if self.order == SortOrder::Descending {
            keyed.reverse();
        }

        if dropped > 0 {
            debug!("Dropped {} matched lines without a timestamp", dropped);
        }
        Sorted {
            records: keyed,
            dropped,
        }
    }
}
