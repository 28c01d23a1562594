#![cfg(feature = "postgres")]

use std::net::TcpListener;

use pgpw::{exec_func, ConnectionDetails, Error, ExecOptions, Registry, RetryConfig};

/// A local port with nothing listening on it
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_closed_port_is_database_unavailable() {
    let port = closed_port();
    let mut details = ConnectionDetails::new("127.0.0.1", port, "app", "app", "secret");
    details.acquire_timeout_ms = 300;

    let registry = Registry::new();
    registry
        .init("main", &details, Some(RetryConfig::new(10, 1, 1.0).unwrap()))
        .unwrap();
    let db = registry.database("main");

    let err = exec_func(&db, "now", &[], &ExecOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.name(), "DatabaseUnavailable");
    match err {
        Error::DatabaseUnavailable { address, port: p } => {
            assert_eq!(address.as_deref(), Some("127.0.0.1"));
            assert_eq!(p, Some(port));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
