use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::auth::{login_user, logout_user, verify_password, AuthUser};
use crate::error::AppError;
use crate::models::User;
use crate::routes::ApiJson;
use crate::views::UserView;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(form.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?;

    let Some(user) = user.filter(|u| verify_password(&form.password, &u.password_hash)) else {
        return Err(AppError::InvalidCredentials);
    };

    login_user(&session, &user).await?;
    tracing::info!(user_id = %user.id, "user logged in");

    let view = UserView::build(&state.db, user, None).await?;
    Ok(Json(view))
}

async fn logout(session: Session, AuthUser(user): AuthUser) -> Result<impl IntoResponse, AppError> {
    logout_user(&session).await?;
    tracing::info!(user_id = %user.id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}
