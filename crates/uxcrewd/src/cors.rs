use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::AppState;

fn origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= 256)
        .map(str::to_string)
}

fn allow(resp: &mut Response, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        resp.headers_mut().insert("access-control-allow-origin", v);
    }
}

/// Answer preflight requests and tag responses for allowed origins.
pub async fn cors_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = origin(req.headers());
    let allowed = origin
        .as_deref()
        .and_then(|o| state.config.allowed_origin(o))
        .map(str::to_string);

    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        if let Some(value) = allowed {
            allow(&mut resp, &value);
            resp.headers_mut().insert(
                "access-control-allow-methods",
                HeaderValue::from_static("GET,POST,OPTIONS"),
            );
            resp.headers_mut().insert(
                "access-control-allow-headers",
                HeaderValue::from_static("content-type"),
            );
        }
        return resp;
    }

    let mut resp = next.run(req).await;
    if let Some(value) = allowed {
        allow(&mut resp, &value);
    }
    resp
}
