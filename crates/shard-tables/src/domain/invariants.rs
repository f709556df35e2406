//! # Domain Invariants
//!
//! Rules every split result and every provisioned name must satisfy.

use chrono::{DateTime, TimeZone};

use super::errors::ShardError;
use super::value_objects::TimeRange;

/// Longest identifier MySQL-compatible catalogs accept.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Invariant: split ranges jointly reconstruct `[start, end]`.
///
/// Ranges must be ascending, contiguous (each starts where the previous one
/// ended), begin at `start`, finish at `end`, and only the final range may
/// carry `end_inclusive`, mirroring the request.
pub fn invariant_contiguous_coverage<Tz: TimeZone>(
    ranges: &[TimeRange<Tz>],
    start: &DateTime<Tz>,
    end: &DateTime<Tz>,
    end_inclusive: bool,
) -> Result<(), ShardError> {
    let (first, last) = match (ranges.first(), ranges.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(coverage("split produced no ranges")),
    };

    if first.start != *start {
        return Err(coverage("first range does not begin at the requested start"));
    }
    if last.end != *end {
        return Err(coverage("last range does not finish at the requested end"));
    }
    if last.end_inclusive != end_inclusive {
        return Err(coverage("last range inclusivity differs from the request"));
    }

    for (i, range) in ranges.iter().enumerate() {
        if range.end < range.start {
            return Err(coverage(format!("range {} ends before it starts", i)));
        }
        if i + 1 < ranges.len() && range.end_inclusive {
            return Err(coverage(format!("interior range {} is end-inclusive", i)));
        }
    }

    for (i, pair) in ranges.windows(2).enumerate() {
        if pair[0].end != pair[1].start {
            return Err(coverage(format!(
                "gap or overlap between ranges {} and {}",
                i,
                i + 1
            )));
        }
        if pair[1].start <= pair[0].start {
            return Err(coverage(format!("range {} is not after range {}", i + 1, i)));
        }
    }

    Ok(())
}

/// Invariant: a split never names the same shard table twice.
///
/// Buckets are wall-clock units, so a local hour repeated by a DST fall-back
/// is still a single range.
pub fn invariant_distinct_tables<Tz: TimeZone>(ranges: &[TimeRange<Tz>]) -> Result<(), ShardError> {
    let mut seen = std::collections::HashSet::new();
    for range in ranges {
        if !seen.insert(range.table_name.as_str()) {
            return Err(coverage(format!(
                "table {} appears in more than one range",
                range.table_name
            )));
        }
    }
    Ok(())
}

/// Invariant: schema and table names are plain identifiers.
///
/// Names are spliced into DDL and lock keys, so only ASCII letters, digits,
/// `_` and `$` are accepted.
pub fn invariant_valid_identifier(field: &'static str, name: &str) -> Result<(), ShardError> {
    if name.trim().is_empty() {
        return Err(ShardError::validation(field, "must not be blank"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(ShardError::validation(
            field,
            format!("{:?} is longer than {} characters", name, MAX_IDENTIFIER_LEN),
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '$'))
    {
        return Err(ShardError::validation(
            field,
            format!("{:?} contains unsupported character {:?}", name, bad),
        ));
    }
    Ok(())
}

fn coverage(reason: impl Into<String>) -> ShardError {
    ShardError::InvariantViolation(reason.into())
}
