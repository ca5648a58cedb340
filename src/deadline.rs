use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;

use crate::error::AppError;

/// Request deadline. On expiry the handler future is dropped, which rolls
/// back any transaction it still holds.
pub async fn enforce(State(deadline): State<Duration>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match tokio::time::timeout(deadline, next.run(req)).await {
        Ok(resp) => resp,
        Err(_) => {
            tracing::warn!(%method, %path, ?deadline, "request deadline exceeded");
            AppError::Timeout.into_response()
        }
    }
}
