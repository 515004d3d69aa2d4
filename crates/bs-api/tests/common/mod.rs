#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const API_KEY: &str = "test-key";

pub fn app() -> Router {
    bs_api::create_router(bs_api::test_state(API_KEY))
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        headers,
        body,
    }
}

/// Creates a profile with every onboarding field filled in.
pub async fn complete_user(app: &Router, name: &str) -> Uuid {
    complete_user_in(app, name, "Computer Science").await
}

pub async fn complete_user_in(app: &Router, name: &str, branch: &str) -> Uuid {
    let reply = call(
        app,
        Method::POST,
        "/api/profiles",
        Some(json!({
            "email": format!("{}@pilani.bits-pilani.ac.in", name.to_lowercase()),
            "full_name": name,
            "profile": {
                "bio": "Builds things and walks around campus at night.",
                "branch": branch,
                "year": 2,
                "age": 20,
                "gender": "female",
                "interests": ["coding", "music", "hiking"],
                "food_preference": "vegetarian",
                "smoking": "never",
                "drinking": "occasionally"
            }
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["profile_completed"], true);
    reply.body["id"].as_str().unwrap().parse().unwrap()
}
