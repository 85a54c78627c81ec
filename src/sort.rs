//! The ordering engine: total orders over entries, selected by `Config`.

use std::cmp::Ordering;

use crate::time::{TimeField, metadata_time_key};
use crate::{Config, Entry, Sort};

/// Order the slice according to `config.sort`, then apply `-r`.
///
/// Every comparator breaks ties by ascending name, so the result is
/// deterministic even though the underlying sort is unstable. Reversal is an
/// element-order inversion of the sorted sequence; with `Sort::None` nothing
/// happens at all, including no reversal.
pub fn sort_entries(entries: &mut [Entry], config: &Config) {
    match config.sort {
        Sort::None => return,
        Sort::Name => entries.sort_unstable_by(compare_names),
        Sort::Size => entries.sort_unstable_by(compare_sizes),
        Sort::Time(field) => entries.sort_unstable_by(|a, b| compare_times(a, b, field)),
    }

    if config.reverse {
        entries.reverse();
    }
}

/// Bytewise lexicographic name order.
pub fn compare_names(a: &Entry, b: &Entry) -> Ordering {
    a.name().cmp(b.name())
}

/// Largest size first, equal sizes by ascending name.
pub fn compare_sizes(a: &Entry, b: &Entry) -> Ordering {
    b.size().cmp(&a.size()).then_with(|| compare_names(a, b))
}

/// Most recent first, equal timestamps by ascending name. Entries without
/// metadata sort as infinitely old.
pub fn compare_times(a: &Entry, b: &Entry, field: TimeField) -> Ordering {
    let key = |e: &Entry| {
        e.metadata()
            .map_or((i64::MIN, i64::MIN), |md| metadata_time_key(md, field))
    };
    key(b).cmp(&key(a)).then_with(|| compare_names(a, b))
}
