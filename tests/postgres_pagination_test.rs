//! Pagination against a live PostgreSQL database
//!
//! Needs DATABASE_URL. Run with `cargo test -- --ignored`.

use chrono::{Duration, TimeZone, Utc};
use relayhaus::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

async fn setup_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");

    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

async fn cleanup_tables(pool: &PgPool) {
    let _ = sqlx::query("DROP TABLE IF EXISTS relay_parcels CASCADE")
        .execute(pool)
        .await;
}

async fn seed(pool: &PgPool, count: i32) {
    sqlx::query(
        "CREATE TABLE relay_parcels (
            id SERIAL PRIMARY KEY,
            reference VARCHAR(35) NOT NULL,
            tracking_number INTEGER NOT NULL,
            carrier_id UUID NOT NULL,
            created TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await
    .expect("Failed to create table");

    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    for i in 1..=count {
        sqlx::query(
            "INSERT INTO relay_parcels (reference, tracking_number, carrier_id, created) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(format!("REF-{:03}", i))
        .bind(1000 + i)
        .bind(Uuid::new_v4())
        .bind(base + Duration::milliseconds(i64::from(i) * 1500))
        .execute(pool)
        .await
        .expect("Failed to insert row");
    }
}

fn parcel_schema() -> SchemaDescriptor {
    SchemaDescriptor::builder("Parcel")
        .table("relay_parcels")
        .primary_key("id", FieldType::Int)
        .field_with("reference", FieldType::Char, FieldConstraints::new().with_max_length(35))
        .field("tracking_number", FieldType::Int)
        .field("carrier_id", FieldType::Uuid)
        .field("created", FieldType::TimestampTz)
        .paginate_on("created")
        .build()
        .unwrap()
}

fn reference(row: &Row) -> String {
    row.get("reference").map(|v| v.to_string()).unwrap_or_default()
}

async fn relayhaus(pool: PgPool) -> RelayHaus {
    let mut relay = RelayHaus::from_parts(pool, None, PaginationConfig::default());
    relay.register_schema(parcel_schema()).unwrap();
    relay
}

#[tokio::test]
#[ignore]
async fn test_timestamp_cursor_pages_through_table() {
    let pool = setup_pool().await;
    cleanup_tables(&pool).await;
    seed(&pool, 12).await;
    let relay = relayhaus(pool.clone()).await;

    let first = relay
        .resolve("Parcel", &PaginationArgs::new().first(5), reference)
        .await
        .unwrap();
    assert_eq!(first.edges.len(), 5);
    assert!(first.page_info.has_next_page);
    assert_eq!(first.edges[0].node, "REF-012");

    let mut seen: Vec<String> = first.nodes().cloned().collect();
    let mut args = PaginationArgs::new().first(5).after(first.page_info.end_cursor.unwrap());
    loop {
        let page = relay.resolve("Parcel", &args, reference).await.unwrap();
        seen.extend(page.nodes().cloned());
        if !page.page_info.has_next_page {
            break;
        }
        args = args.after(page.page_info.end_cursor.unwrap());
    }

    let expected: Vec<String> = (1..=12).rev().map(|i| format!("REF-{:03}", i)).collect();
    assert_eq!(seen, expected);

    cleanup_tables(&pool).await;
}

#[tokio::test]
#[ignore]
async fn test_filter_and_search_in_sql() {
    let pool = setup_pool().await;
    cleanup_tables(&pool).await;
    seed(&pool, 12).await;
    let relay = relayhaus(pool.clone()).await;

    let filter = FilterExpression::from_json(json!({
        "trackingNumber": { "in": [1002, 1004, 1011] },
        "reference": { "icontains": "ref-0" },
    }))
    .unwrap();
    let page = relay
        .resolve("Parcel", &PaginationArgs::new().filter(filter), reference)
        .await
        .unwrap();
    assert_eq!(page.nodes().cloned().collect::<Vec<_>>(), vec!["REF-011", "REF-004", "REF-002"]);

    let page = relay
        .resolve("Parcel", &PaginationArgs::new().search("1007"), reference)
        .await
        .unwrap();
    assert_eq!(page.nodes().cloned().collect::<Vec<_>>(), vec!["REF-007"]);

    cleanup_tables(&pool).await;
}

#[tokio::test]
#[ignore]
async fn test_raw_query_with_named_parameters() {
    let pool = setup_pool().await;
    cleanup_tables(&pool).await;
    seed(&pool, 12).await;
    let relay = relayhaus(pool.clone()).await;

    let mut params = BTreeMap::new();
    params.insert("min_tracking".to_string(), FieldValue::Integer(1006));

    let first = relay
        .resolve_raw(
            "Parcel",
            "SELECT id, reference, tracking_number, carrier_id, created \
             FROM relay_parcels WHERE tracking_number >= :min_tracking",
            params.clone(),
            &PaginationArgs::new().first(4),
            reference,
        )
        .await
        .unwrap();
    assert_eq!(first.nodes().cloned().collect::<Vec<_>>(), vec!["REF-012", "REF-011", "REF-010", "REF-009"]);
    assert!(first.page_info.has_next_page);

    let second = relay
        .resolve_raw(
            "Parcel",
            "SELECT id, reference, tracking_number, carrier_id, created \
             FROM relay_parcels WHERE tracking_number >= :min_tracking",
            params,
            &PaginationArgs::new().first(4).after(first.page_info.end_cursor.unwrap()),
            reference,
        )
        .await
        .unwrap();
    assert_eq!(second.nodes().cloned().collect::<Vec<_>>(), vec!["REF-008", "REF-007", "REF-006"]);
    assert!(!second.page_info.has_next_page);

    cleanup_tables(&pool).await;
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let pool = setup_pool().await;
    let relay = relayhaus(pool).await;
    relay.health_check().await.unwrap();
    relay.close().await;
}
