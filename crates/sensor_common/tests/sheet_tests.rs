//! Sheet loading over HTTP.
//!
//! A local axum server stands in for the published spreadsheet export.

use axum::{http::StatusCode, routing::get, Router};
use sensor_common::sheet::{SheetClient, TableSource};
use std::net::SocketAddr;
use std::time::Duration;

const SENSORS_CSV: &str = "Position Name,Floor,apiUrl\n\
                           AHU-01,1,http://x/1\n\
                           CT-01,R,\n";

async fn spawn_sheet_server() -> SocketAddr {
    let app = Router::new()
        .route("/sensors.csv", get(|| async { SENSORS_CSV }))
        .route(
            "/broken.csv",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client() -> SheetClient {
    SheetClient::new(Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_remote_sheet_loads() {
    let addr = spawn_sheet_server().await;
    let source = TableSource::parse(&format!("http://{}/sensors.csv", addr));
    assert!(matches!(source, TableSource::Remote(_)));

    let table = client().load_table(&source, "apiUrl").await;
    assert_eq!(table.columns, vec!["Position Name", "Floor", "apiUrl"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.probe_targets(), vec!["http://x/1".to_string(), String::new()]);
}

#[tokio::test]
async fn test_missing_remote_sheet_is_empty_table() {
    let addr = spawn_sheet_server().await;
    let source = TableSource::parse(&format!("http://{}/gone.csv", addr));

    let table = client().load_table(&source, "apiUrl").await;
    assert!(table.is_empty());
    assert!(table.columns.is_empty());
}

#[tokio::test]
async fn test_failing_remote_sheet_is_empty_table() {
    let addr = spawn_sheet_server().await;
    let source = TableSource::parse(&format!("http://{}/broken.csv", addr));

    assert!(client().fetch_text(&source).await.is_err());
    assert!(client().load_table(&source, "apiUrl").await.is_empty());
}

#[tokio::test]
async fn test_unreachable_remote_sheet_is_empty_table() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = TableSource::parse(&format!("http://{}/sensors.csv", addr));
    assert!(client().load_table(&source, "apiUrl").await.is_empty());
}
