use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::shopping_list;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/recipes/download_shopping_cart", get(download_shopping_cart))
}

async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let body = shopping_list::for_user(&state.db, &user.id).await?;

    let content_disposition = format!("attachment; filename={}", shopping_list::FILENAME);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition)
            .map_err(|e| AppError::Internal(format!("bad header value: {e}")))?,
    );

    Ok((headers, body))
}
