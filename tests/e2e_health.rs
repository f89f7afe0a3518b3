//! E2E tests for liveness and metrics endpoints

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("response body"), "OK");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_registry() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("response body");
    assert!(body.contains("linkgate_sessions_revoked_total"));
}
