//! CSRF protection middleware.
//!
//! Double-submit check: every mutating verb (POST/PUT/PATCH/DELETE) on a
//! session-protected route must carry an `X-CSRFToken` header matching the
//! `csrftoken` cookie. The pre-session auth endpoints (login, register,
//! token fetch, password reset) are mounted outside this layer.

use axum::{
    extract::Request,
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::{cookie_value, CSRF_COOKIE, CSRF_HEADER};

pub async fn csrf_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let mutating = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );

    if mutating {
        let csrf_failure = || {
            (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "detail": "CSRF token missing or incorrect",
                    "code": "forbidden"
                })),
            )
                .into_response()
        };

        let cookie = cookie_value(&headers, CSRF_COOKIE);
        let header = headers
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        match (cookie, header) {
            (Some(cookie), Some(header)) if cookie == header => {}
            _ => return Err(csrf_failure()),
        }
    }

    Ok(next.run(request).await)
}
