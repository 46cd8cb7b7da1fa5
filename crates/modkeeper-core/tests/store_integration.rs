//! Bookkeeping upserts against a SQLite file.

use modkeeper_core::status::StatusRegistry;
use modkeeper_core::store::{ConnectionConfig, PrincipalPresence, ResourceConnector};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

async fn connected(dir: &std::path::Path) -> (ResourceConnector, SqlitePool) {
    let path = dir.join("bookkeeping.db");
    let connector = ResourceConnector::new(Arc::new(StatusRegistry::new()))
        .with_ping_timeout(Duration::from_secs(2));
    let config = ConnectionConfig::sqlite(path.to_string_lossy().to_string()).with_pool_size(1, 2);
    connector.connect(&config).await.unwrap();

    let pool = SqlitePool::connect(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    (connector, pool)
}

#[tokio::test]
async fn tables_are_provisioned_on_connect() {
    let dir = tempfile::tempdir().unwrap();
    let (_connector, pool) = connected(dir.path()).await;

    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'modkeeper_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
    assert_eq!(
        names,
        vec!["modkeeper_modules", "modkeeper_peers", "modkeeper_principals"]
    );
}

#[tokio::test]
async fn tables_are_not_created_when_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bare.db");
    let connector = ResourceConnector::new(Arc::new(StatusRegistry::new()));
    let config = ConnectionConfig::sqlite(path.to_string_lossy().to_string())
        .with_pool_size(1, 1)
        .with_auto_create_tables(false);
    connector.connect(&config).await.unwrap();

    let pool = SqlitePool::connect(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn module_upsert_overwrites_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, pool) = connected(dir.path()).await;

    connector.record_module("Economy", "1.0", true).await;
    connector.record_module("Economy", "1.1", false).await;

    let rows: Vec<(String, bool)> =
        sqlx::query_as("SELECT version, enabled FROM modkeeper_modules WHERE name = 'Economy'")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(rows, vec![("1.1".to_string(), false)]);
}

#[tokio::test]
async fn peer_upsert_tracks_latest_status() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, pool) = connected(dir.path()).await;

    connector.record_peer("lobby", "10.0.0.2:25565", "online").await;
    connector.record_peer("lobby", "10.0.0.3:25565", "offline").await;

    let (address, status): (String, String) =
        sqlx::query_as("SELECT address, status FROM modkeeper_peers WHERE name = 'lobby'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(address, "10.0.0.3:25565");
    assert_eq!(status, "offline");
}

#[tokio::test]
async fn principal_join_and_leave() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, pool) = connected(dir.path()).await;
    let id = Uuid::new_v4();

    connector
        .record_principal(&PrincipalPresence::joined(id, "alex", "lobby"))
        .await;
    let (first_seen,): (i64,) =
        sqlx::query_as("SELECT first_seen FROM modkeeper_principals WHERE uuid = ?")
            .bind(id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    connector
        .record_principal(&PrincipalPresence::joined(id, "alex_renamed", "survival"))
        .await;
    connector
        .record_principal(&PrincipalPresence::left(id, "alex_renamed", "creative"))
        .await;

    let (name, first, last, peer): (String, i64, i64, String) = sqlx::query_as(
        "SELECT name, first_seen, last_seen, last_peer FROM modkeeper_principals WHERE uuid = ?",
    )
    .bind(id.to_string())
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(name, "alex_renamed");
    assert_eq!(first, first_seen);
    assert!(last > first);
    assert_eq!(peer, "creative");
}

#[tokio::test]
async fn upserts_after_disconnect_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, pool) = connected(dir.path()).await;

    connector.disconnect().await;
    connector.record_module("Economy", "1.0", true).await;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM modkeeper_modules")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert!(!connector.is_connected().await);
}
