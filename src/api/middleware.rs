use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Log method, path, status and latency of every request and tag the response with a request id
pub async fn access_log(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(req).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis();
    if status.is_server_error() {
        log::error!("{} {} {} {}ms request_id={}", method, path, status.as_u16(), latency_ms, request_id);
    } else if status.is_client_error() {
        log::warn!("{} {} {} {}ms request_id={}", method, path, status.as_u16(), latency_ms, request_id);
    } else {
        log::info!("{} {} {} {}ms request_id={}", method, path, status.as_u16(), latency_ms, request_id);
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
