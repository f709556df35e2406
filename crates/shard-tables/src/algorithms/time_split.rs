//! # Time Range Splitting
//!
//! Splits a query interval into per-shard sub-ranges.
//!
//! Example (`Day` granularity, `end_inclusive = false`):
//!
//! ```text
//! request  2025-08-19 17:45 ........................... 2025-08-21 10:20
//! ranges   [17:45, 08-20 00:00) orders_20250819
//!          [08-20 00:00, 08-21 00:00) orders_20250820
//!          [08-21 00:00, 10:20) orders_20250821
//! ```
//!
//! Every range except the last is half-open. When `end` sits exactly on a
//! bucket boundary and the end is exclusive, no range is emitted for the
//! bucket that starts at `end`.

use chrono::{DateTime, TimeZone};
use tracing::trace;

use crate::domain::{Granularity, ShardError, ShardRequest, TimeRange};

/// Split `request` into ordered shard ranges.
///
/// Buckets are evaluated in the calendar of the request's `start` time zone;
/// `end` is converted into that zone before any comparison.
///
/// # Errors
///
/// `ShardError::Validation` naming `primary`, `start`, `end` or
/// `granularity` when the request is incomplete or `start > end`.
pub fn split_range<Tz: TimeZone>(
    request: &ShardRequest<Tz>,
) -> Result<Vec<TimeRange<Tz>>, ShardError> {
    let (start, end, granularity) = validate(request)?;
    let end = end.with_timezone(&start.timezone());

    split_validated(&request.primary, start, end, request.end_inclusive, granularity)
}

fn validate<Tz: TimeZone>(
    request: &ShardRequest<Tz>,
) -> Result<(&DateTime<Tz>, &DateTime<Tz>, Granularity), ShardError> {
    if request.primary.trim().is_empty() {
        return Err(ShardError::validation("primary", "is required and must not be blank"));
    }
    let start = request
        .start
        .as_ref()
        .ok_or_else(|| ShardError::validation("start", "is required"))?;
    let end = request
        .end
        .as_ref()
        .ok_or_else(|| ShardError::validation("end", "is required"))?;
    let granularity = request
        .granularity
        .ok_or_else(|| ShardError::validation("granularity", "is required"))?;
    if end < start {
        return Err(ShardError::validation(
            "end",
            format!(
                "end {} is before start {}",
                end.naive_local(),
                start.naive_local()
            ),
        ));
    }
    Ok((start, end, granularity))
}

fn split_validated<Tz: TimeZone>(
    primary: &str,
    start: &DateTime<Tz>,
    end: DateTime<Tz>,
    end_inclusive: bool,
    granularity: Granularity,
) -> Result<Vec<TimeRange<Tz>>, ShardError> {
    if granularity.same_bucket(start, &end)? {
        return Ok(vec![TimeRange::new(
            granularity.table_name(primary, start),
            start.clone(),
            end,
            end_inclusive,
        )]);
    }

    let mut ranges = Vec::new();

    // Leading partial bucket: [start, next boundary)
    let mut cursor = granularity.next_boundary(start)?;
    ranges.push(TimeRange::new(
        granularity.table_name(primary, start),
        start.clone(),
        cursor.clone(),
        false,
    ));

    // Whole buckets up to the one holding `end`
    let end_bucket = granularity.floor(&end)?;
    while cursor < end_bucket {
        let next = granularity.next_boundary(&cursor)?;
        ranges.push(TimeRange::new(
            granularity.table_name(primary, &cursor),
            cursor.clone(),
            next.clone(),
            false,
        ));
        cursor = next;
    }

    // Trailing bucket, skipped when an exclusive end sits on its boundary
    if end == end_bucket && !end_inclusive {
        trace!(
            "[shard-tables] split {} into {} ranges (end on boundary)",
            primary,
            ranges.len()
        );
        return Ok(ranges);
    }

    ranges.push(TimeRange::new(
        granularity.table_name(primary, &end),
        cursor,
        end,
        end_inclusive,
    ));

    trace!("[shard-tables] split {} into {} ranges", primary, ranges.len());
    Ok(ranges)
}

/// Table names covering `request`, in order.
pub fn tables_for_range<Tz: TimeZone>(request: &ShardRequest<Tz>) -> Result<Vec<String>, ShardError> {
    Ok(split_range(request)?
        .into_iter()
        .map(|range| range.table_name)
        .collect())
}
