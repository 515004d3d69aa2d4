use axum::{body::Body, http::Request, http::StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn livez_healthy_and_api_requires_auth() {
    let state = bs_api::test_state("test-key");
    let app = bs_api::create_router(state);

    let livez_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/livez")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(livez_response.status(), StatusCode::OK);
    assert!(livez_response.headers().contains_key("x-request-id"));

    let unauthorized = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/connections?user_id=8d6f4b7e-0a53-4f55-9a55-0f0f5a1e7c11")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    let wrong_key = app
        .oneshot(
            Request::builder()
                .uri("/api/notifications")
                .header("x-api-key", "nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(wrong_key.status(), StatusCode::UNAUTHORIZED);
}
