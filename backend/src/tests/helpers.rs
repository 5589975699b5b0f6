use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Request},
    response::Response,
};
use serde_json::Value;

pub fn create_auth_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let auth_value = format!("Bearer {}", token);

    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth_value).expect("Failed to create auth header"),
    );

    headers
}

/// Build a request, optionally authenticated and with a JSON body
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        for (name, value) in create_auth_headers(token).iter() {
            builder = builder.header(name, value);
        }
    }

    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).expect("serialize body")))
            .expect("Failed to build request"),
        None => builder.body(Body::empty()).expect("Failed to build request"),
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Response is not JSON")
}

/// Initialize test logging
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}
