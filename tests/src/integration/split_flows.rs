//! # Split Flows
//!
//! Read path against tables created by the write path, and request decoding
//! from JSON.

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, TimeZone, Utc};
    use shard_tables::{
        invariant_contiguous_coverage, split_range, tables_for_range, Granularity,
        ProvisionRequest, RawShardRequest, ShardRequest, ShardTableApi,
    };

    use crate::fixtures::{in_memory_service, PRIMARY, SCHEMA};

    #[test]
    fn test_every_split_table_was_provisioned_by_writes() {
        let (catalog, _lock, service) = in_memory_service();
        let start = Utc.with_ymd_and_hms(2024, 12, 31, 21, 15, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap();

        let mut t = start;
        while t < end {
            let request = ProvisionRequest::new(SCHEMA, PRIMARY, t, Granularity::Hour);
            service.resolve_and_provision_table(&request).unwrap();
            t += Duration::minutes(20);
        }

        let request = ShardRequest::new(PRIMARY, start, end, false, Granularity::Hour);
        let ranges = service.split_range(&request).unwrap();
        assert_eq!(ranges.len(), 6);
        for range in &ranges {
            assert!(catalog.contains_table(SCHEMA, &range.table_name), "{} missing", range.table_name);
        }
        assert_eq!(catalog.execute_count(), ranges.len());
        invariant_contiguous_coverage(&ranges, &start, &end, false).unwrap();
    }

    #[test]
    fn test_inclusive_end_reaches_next_table() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let exclusive = tables_for_range(&ShardRequest::new("orders", start, end, false, Granularity::Month)).unwrap();
        let inclusive = tables_for_range(&ShardRequest::new("orders", start, end, true, Granularity::Month)).unwrap();

        assert_eq!(exclusive, ["orders_202401", "orders_202402"]);
        assert_eq!(inclusive, ["orders_202401", "orders_202402", "orders_202403"]);
    }

    #[test]
    fn test_json_request_splits_in_its_own_offset() {
        let raw: RawShardRequest = serde_json::from_str(
            r#"{
                "primary": "orders",
                "start": "2024-03-14T22:00:00+08:00",
                "end": "2024-03-15T02:00:00+08:00",
                "granularity": 20
            }"#,
        )
        .unwrap();
        let request = ShardRequest::try_from(raw).unwrap();
        let ranges = split_range(&request).unwrap();

        let names: Vec<_> = ranges.iter().map(|r| r.table_name.as_str()).collect();
        assert_eq!(names, ["orders_20240314", "orders_20240315"]);
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(
            ranges[1].start,
            tz.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_json_request_rejects_unknown_granularity() {
        let raw: RawShardRequest = serde_json::from_str(
            r#"{"primary":"orders","start":"2024-03-14T00:00:00Z","end":"2024-03-15T00:00:00Z","granularity":"week"}"#,
        )
        .unwrap();
        let err = ShardRequest::try_from(raw).unwrap_err();
        assert_eq!(err.field(), Some("granularity"));
    }
}
