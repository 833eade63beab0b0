//! End-to-end pagination over the in-memory executor and cache store
//!
//! Drives the full path: arguments, predicate building, cursor decoding,
//! one-page-ahead fetch, trimming and cursor stamping.

use relayhaus::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

fn parcel_schema() -> Arc<SchemaDescriptor> {
    Arc::new(
        SchemaDescriptor::builder("Parcel")
            .primary_key("id", FieldType::Int)
            .field_with("reference", FieldType::Char, FieldConstraints::new().with_max_length(35))
            .field("tracking_number", FieldType::Int)
            .field("fragile", FieldType::Boolean)
            .build()
            .unwrap(),
    )
}

fn parcels(count: i32) -> MemoryExecutor {
    let rows = (1..=count)
        .map(|i| {
            Row::new()
                .with("id", i)
                .with("reference", format!("REF-{:03}", i))
                .with("tracking_number", 1000 + i)
                .with("fragile", i % 2 == 0)
        })
        .collect();
    MemoryExecutor::new(parcel_schema(), rows)
}

fn id(row: &Row) -> i32 {
    match row.get("id") {
        Some(FieldValue::Integer(v)) => *v,
        other => panic!("unexpected id {:?}", other),
    }
}

#[tokio::test]
async fn test_single_page_covers_collection() {
    let page = RelayPaginator::new(parcel_schema())
        .paginate(&parcels(10), &PaginationArgs::new().first(10), id)
        .await
        .unwrap();

    assert_eq!(page.edges.len(), 10);
    assert!(!page.page_info.has_next_page);
    assert!(page.page_info.start_cursor.is_some());
    assert!(page.page_info.end_cursor.is_some());
    assert_eq!(page.nodes().copied().collect::<Vec<_>>(), (1..=10).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_following_end_cursor_has_no_overlap_or_gap() {
    let executor = parcels(10);
    let paginator = RelayPaginator::new(parcel_schema());

    let first = paginator
        .paginate(&executor, &PaginationArgs::new().first(5), id)
        .await
        .unwrap();
    assert!(first.page_info.has_next_page);

    let after = first.page_info.end_cursor.clone().unwrap();
    let second = paginator
        .paginate(&executor, &PaginationArgs::new().first(5).after(after), id)
        .await
        .unwrap();
    assert!(!second.page_info.has_next_page);

    let seen: Vec<i32> = first.nodes().chain(second.nodes()).copied().collect();
    assert_eq!(seen, (1..=10).rev().collect::<Vec<_>>());
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 10);
}

#[tokio::test]
async fn test_walks_whole_collection_page_by_page() {
    let executor = parcels(23);
    let paginator = RelayPaginator::new(parcel_schema());
    let mut args = PaginationArgs::new().first(4);
    let mut seen = Vec::new();

    loop {
        let page = paginator.paginate(&executor, &args, id).await.unwrap();
        assert!(page.edges.len() <= 4);
        seen.extend(page.nodes().copied());
        if !page.page_info.has_next_page {
            break;
        }
        args = args.after(page.page_info.end_cursor.unwrap());
    }

    assert_eq!(seen, (1..=23).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_camel_case_filter_with_cursor() {
    let executor = parcels(20);
    let paginator = RelayPaginator::new(parcel_schema());
    let filter = FilterExpression::from_json(json!({
        "trackingNumber": { "gte": 1005, "lt": 1015 },
        "fragile": true,
    }))
    .unwrap();

    let first = paginator
        .paginate(&executor, &PaginationArgs::new().first(3).filter(filter.clone()), id)
        .await
        .unwrap();
    assert_eq!(first.nodes().copied().collect::<Vec<_>>(), vec![14, 12, 10]);
    assert!(first.page_info.has_next_page);

    let args = PaginationArgs::new()
        .first(3)
        .filter(filter)
        .after(first.page_info.end_cursor.unwrap());
    let second = paginator.paginate(&executor, &args, id).await.unwrap();
    assert_eq!(second.nodes().copied().collect::<Vec<_>>(), vec![8, 6]);
    assert!(!second.page_info.has_next_page);
}

#[tokio::test]
async fn test_search_matches_any_eligible_field() {
    let page = RelayPaginator::new(parcel_schema())
        .paginate(&parcels(20), &PaginationArgs::new().search("1007"), id)
        .await
        .unwrap();
    assert_eq!(page.nodes().copied().collect::<Vec<_>>(), vec![7]);

    let page = RelayPaginator::new(parcel_schema())
        .paginate(&parcels(20), &PaginationArgs::new().search("REF-003"), id)
        .await
        .unwrap();
    assert_eq!(page.nodes().copied().collect::<Vec<_>>(), vec![3]);
}

#[tokio::test]
async fn test_unknown_filter_field_fails_whole_call() {
    let executor = parcels(5);
    let filter = FilterExpression::new().op("weight", "gt", json!(3));
    let result = RelayPaginator::new(parcel_schema())
        .paginate(&executor, &PaginationArgs::new().filter(filter), id)
        .await;

    assert!(matches!(
        result,
        Err(RelayError::Store(StoreError::UnknownField { ref field, .. })) if field == "weight"
    ));
    assert_eq!(executor.executions(), 0);
}

#[tokio::test]
async fn test_cursor_from_other_collection_rejected() {
    let cursor = CursorCodec::encode("Invoice", &FieldValue::Integer(3));
    let result = RelayPaginator::new(parcel_schema())
        .paginate(&parcels(5), &PaginationArgs::new().after(cursor), id)
        .await;
    assert!(matches!(
        result,
        Err(RelayError::InvalidCursor(CursorError::CollectionMismatch { .. }))
    ));
}

#[tokio::test]
async fn test_cached_pages_skip_the_executor() {
    let executor = parcels(12);
    let store = Arc::new(MemoryStore::new());
    let cache = ResultCache::new(store.clone(), "relay");
    let paginator = RelayPaginator::new(parcel_schema()).with_cache(cache, 60);
    let args = PaginationArgs::new().first(5);

    let cold = paginator.paginate(&executor, &args, id).await.unwrap();
    let warm = paginator.paginate(&executor, &args, id).await.unwrap();
    assert_eq!(cold, warm);
    assert_eq!(executor.executions(), 1);
    assert_eq!(store.len().await, 1);

    let other = args.clone().after(cold.page_info.end_cursor.clone().unwrap());
    paginator.paginate(&executor, &other, id).await.unwrap();
    assert_eq!(executor.executions(), 2);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_cached_rows_keep_their_types() {
    let executor = parcels(3);
    let cache = ResultCache::new(Arc::new(MemoryStore::new()), "relay");
    let paginator = RelayPaginator::new(parcel_schema()).with_cache(cache, 60);

    let cold = paginator
        .paginate(&executor, &PaginationArgs::new(), |row| row.clone())
        .await
        .unwrap();
    let warm = paginator
        .paginate(&executor, &PaginationArgs::new(), |row| row.clone())
        .await
        .unwrap();

    assert_eq!(executor.executions(), 1);
    assert_eq!(warm.edges[0].node.get("fragile"), Some(&FieldValue::Boolean(false)));
    assert_eq!(cold, warm);
}

fn reading_schema() -> Arc<SchemaDescriptor> {
    Arc::new(
        SchemaDescriptor::builder("Reading")
            .primary_key("id", FieldType::Int)
            .field("score", FieldType::Float)
            .field("created", FieldType::Timestamp)
            .paginate_on("created")
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn test_sub_microsecond_timestamps_page_without_gap() {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let rows = [(1, 300), (2, 500), (3, 1_700), (4, 2_000)]
        .into_iter()
        .map(|(id, nanos)| {
            Row::new()
                .with("id", id)
                .with("score", 1.0)
                .with("created", base + chrono::Duration::nanoseconds(nanos))
        })
        .collect();
    let executor = MemoryExecutor::new(reading_schema(), rows);
    let paginator = RelayPaginator::new(reading_schema());

    let mut args = PaginationArgs::new().first(1);
    let mut seen = Vec::new();
    loop {
        let page = paginator.paginate(&executor, &args, id).await.unwrap();
        seen.extend(page.nodes().copied());
        if !page.page_info.has_next_page {
            break;
        }
        args = args.after(page.page_info.end_cursor.unwrap());
    }

    assert_eq!(seen, vec![4, 3, 2, 1]);
}

#[tokio::test]
async fn test_non_finite_floats_served_from_cache() {
    let created = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let rows = vec![
        Row::new().with("id", 1).with("score", f64::NAN).with("created", created),
        Row::new()
            .with("id", 2)
            .with("score", f64::NEG_INFINITY)
            .with("created", created + chrono::Duration::seconds(1)),
    ];
    let executor = MemoryExecutor::new(reading_schema(), rows);
    let cache = ResultCache::new(Arc::new(MemoryStore::new()), "relay");
    let paginator = RelayPaginator::new(reading_schema()).with_cache(cache, 60);

    let score = |row: &Row| match row.get("score") {
        Some(FieldValue::Float(v)) => *v,
        other => panic!("unexpected score {:?}", other),
    };

    let cold = paginator.paginate(&executor, &PaginationArgs::new(), score).await.unwrap();
    let warm = paginator.paginate(&executor, &PaginationArgs::new(), score).await.unwrap();

    assert_eq!(executor.executions(), 1);
    assert_eq!(warm.edges[0].node, f64::NEG_INFINITY);
    assert!(warm.edges[1].node.is_nan());
    assert_eq!(cold.page_info, warm.page_info);
}
