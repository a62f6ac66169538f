#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use vix_career_api::config::AppConfig;
use vix_career_api::database::{ensure_indexes, DocumentStore, MemoryStore};
use vix_career_api::{app, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";

/// The real router wired to an in-process store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn test_config() -> Result<AppConfig> {
    Ok(AppConfig::from_lookup(|name| match name {
        "ACCESS_TOKEN_SECRET" => Some(TEST_SECRET.to_string()),
        _ => None,
    })?)
}

pub async fn test_app() -> Result<TestApp> {
    let store = Arc::new(MemoryStore::new());
    ensure_indexes(store.as_ref()).await?;
    let router = app(AppState::new(store.clone(), test_config()?));

    Ok(TestApp { router, store })
}

/// The real router over `store`, which the caller keeps a handle to.
pub async fn test_app_with_store(store: Arc<dyn DocumentStore>, memory: Arc<MemoryStore>) -> Result<TestApp> {
    ensure_indexes(store.as_ref()).await?;
    let router = app(AppState::new(store, test_config()?));

    Ok(TestApp { router, store: memory })
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Result<Response> {
        Ok(self.router.clone().oneshot(request).await?)
    }

    pub async fn get(&self, uri: &str) -> Result<Response> {
        self.send(Request::builder().uri(uri).body(Body::empty())?).await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Result<Response> {
        let request = Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn send_json(&self, method: Method, uri: &str, body: &Value) -> Result<Response> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?;
        self.send(request).await
    }

    pub async fn delete(&self, uri: &str) -> Result<Response> {
        let request = Request::builder().method(Method::DELETE).uri(uri).body(Body::empty())?;
        self.send(request).await
    }

    /// POSTs a job and returns its generated id.
    pub async fn create_job(&self, job: &Value) -> Result<String> {
        let res = self.send_json(Method::POST, "/all-jobs", job).await?;
        let ack = body_json(res).await?;
        ack["insertedId"]
            .as_str()
            .map(String::from)
            .context("insert ack without insertedId")
    }

    /// Signs in as `email` and returns the `name=value` pair for a Cookie header.
    pub async fn login(&self, email: &str) -> Result<String> {
        let res = self
            .send_json(Method::POST, "/jwt", &serde_json::json!({ "email": email }))
            .await?;
        let set_cookie = set_cookie(&res).context("no session cookie issued")?;
        Ok(cookie_pair(&set_cookie))
    }
}

pub async fn body_bytes(response: Response) -> Result<Vec<u8>> {
    Ok(axum::body::to_bytes(response.into_body(), usize::MAX).await?.to_vec())
}

pub async fn body_json(response: Response) -> Result<Value> {
    Ok(serde_json::from_slice(&body_bytes(response).await?)?)
}

pub async fn body_text(response: Response) -> Result<String> {
    Ok(String::from_utf8(body_bytes(response).await?)?)
}

pub fn set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// `token=abc; HttpOnly; ...` -> `token=abc`
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().trim().to_string()
}
