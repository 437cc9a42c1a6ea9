//! Route handlers (C12). Control-API responses use the `{"message", "error"}`
//! envelope throughout, matching the original tool's `HTTPReturnStruct`.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use engine::QueuedRequest;
use indexmap::IndexMap;
use runtime::Runtime;
use serde_json::json;

use crate::AppState;

pub async fn health_check() -> &'static str {
    "Looks good to me"
}

pub async fn metrics_handler() -> Response {
    match metrics::render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

pub async fn cloudfoundryapplication() -> StatusCode {
    StatusCode::OK
}

pub async fn sentinel() -> &'static str {
    "I LIKE PIE"
}

pub async fn launch_plan<RT: Runtime>(State(state): State<Arc<AppState<RT>>>, Path(plan): Path<String>) -> Response {
    match state.engine.launch_plan(&plan).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Plan changed successfully", "error": false }))).into_response(),
        Err(err) => (StatusCode::BAD_REQUEST, Json(json!({ "message": err.msg, "error": true }))).into_response(),
    }
}

pub async fn remove<RT: Runtime>(State(state): State<Arc<AppState<RT>>>) -> Response {
    state.engine.remove().await;
    (StatusCode::OK, Json(json!({ "message": "remove succeeded", "error": false }))).into_response()
}

pub async fn status<RT: Runtime>(State(state): State<Arc<AppState<RT>>>) -> Response {
    match state.engine.status().await {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => (StatusCode::OK, Json(json!({ "message": "no change", "error": false }))).into_response(),
    }
}

pub async fn config<RT: Runtime>(State(state): State<Arc<AppState<RT>>>) -> Response {
    match serde_yaml::to_string(&YamlConfig::from(&state.config)) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/x-yaml")], body).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

/// Serializable projection of [`engine::Config`] for `/capi/v1/config`'s
/// dump - the loaded plan catalogue has no `Serialize` impl of its own
/// since nothing else needs one, so this mirrors just the fields worth
/// reporting back to an operator.
#[derive(serde::Serialize)]
struct YamlConfig {
    default_plan: Option<String>,
    plans: Vec<String>,
    bases: IndexMap<String, String>,
}

impl From<&engine::Config> for YamlConfig {
    fn from(c: &engine::Config) -> Self {
        Self { default_plan: c.default_plan.clone(), plans: c.plan.iter().map(|p| p.name.clone()).collect(), bases: c.bases.clone() }
    }
}

/// Redirects to `https://` at the same host/path when the request arrived
/// over plain HTTP behind a TLS-terminating proxy.
pub async fn redirect_https(req: Request, next: axum::middleware::Next) -> Response {
    let is_forwarded_http = req.headers().get("x-forwarded-proto").and_then(|v| v.to_str().ok()) == Some("http");
    if is_forwarded_http {
        if let Some(host) = req.headers().get(header::HOST).and_then(|v| v.to_str().ok()) {
            let path_and_query = req.uri().path_and_query().map(|p| p.as_str()).unwrap_or("/");
            return Redirect::permanent(&format!("https://{host}{path_and_query}")).into_response();
        }
    }
    next.run(req).await
}

/// Records every response's method, status, and latency into the process
/// metrics served at `/metrics`.
pub async fn track_metrics(req: Request, next: axum::middleware::Next) -> Response {
    let method = req.method().as_str().to_string();
    let start = std::time::Instant::now();
    let response = next.run(req).await;
    metrics::observe_request(&method, response.status().as_u16(), start.elapsed().as_secs_f64());
    response
}

/// Everything not matched above falls through to the engine: enqueue,
/// block for the matched `url` action's response, answer with it verbatim.
pub async fn catch_all<RT: Runtime>(State(state): State<Arc<AppState<RT>>>, req: Request) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let headers: IndexMap<String, String> =
        req.headers().iter().filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string()))).collect();
    let body = match axum::body::to_bytes(req.into_body(), usize::MAX).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => Vec::new(),
    };

    match state.engine.enqueue_request(QueuedRequest { method, path, body, headers }).await {
        Ok(response) => {
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
            let mut builder = Response::builder().status(status);
            if let Some(content_type) = response.content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type);
            }
            builder.body(Body::from(response.body)).unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        },
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.msg).into_response(),
    }
}
