use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::auth::{hash_password, verify_password, AuthUser, CurrentUser};
use crate::error::{AppError, ValidationErrors};
use crate::models::{RelationKind, User};
use crate::pagination::{Page, QueryPairs};
use crate::relations;
use crate::routes::ApiJson;
use crate::views::{FollowView, RegisteredUser, UserView};
use crate::AppState;

const EMAIL_MAX: usize = 254;
const NAME_MAX: usize = 150;
const PASSWORD_MAX: usize = 150;
const RESERVED_USERNAME: &str = "me";

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    email: Option<String>,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
pub struct SetPasswordForm {
    new_password: String,
    current_password: String,
}

fn required<'a>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&'a str>,
    max: usize,
) -> Option<&'a str> {
    match value.map(str::trim) {
        None | Some("") => {
            errors.add(field, "required", "This field is required");
            None
        }
        Some(v) if v.chars().count() > max => {
            errors.add(field, "too_long", format!("Must be at most {max} characters"));
            None
        }
        Some(v) => Some(v),
    }
}

fn validate_registration(form: &RegisterForm) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if let Some(email) = required(&mut errors, "email", form.email.as_deref(), EMAIL_MAX) {
        if !EMAIL_RE.is_match(email) {
            errors.add("email", "invalid", "Enter a valid email address");
        }
    }

    if let Some(username) = required(&mut errors, "username", form.username.as_deref(), NAME_MAX) {
        if !USERNAME_RE.is_match(username) {
            errors.add(
                "username",
                "invalid",
                "Only letters, digits and @/./+/-/_ are allowed",
            );
        }
        if username == RESERVED_USERNAME {
            errors.add("username", "reserved", "The username \"me\" is reserved");
        }
    }

    required(&mut errors, "first_name", form.first_name.as_deref(), NAME_MAX);
    required(&mut errors, "last_name", form.last_name.as_deref(), NAME_MAX);
    required(&mut errors, "password", form.password.as_deref(), PASSWORD_MAX);

    errors
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(register))
        .route("/api/users/me", get(me))
        .route("/api/users/set_password", post(set_password))
        .route("/api/users/subscriptions", get(subscriptions))
        .route("/api/users/{id}", get(show_user))
        .route("/api/users/{id}/subscribe", post(subscribe).delete(unsubscribe))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegisterForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut errors = validate_registration(&form);

    let email = form.email.as_deref().unwrap_or_default().trim().to_lowercase();
    let username = form.username.as_deref().unwrap_or_default().trim().to_string();

    let (email_taken,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if email_taken > 0 {
        errors.add("email", "unique", "A user with that email already exists");
    }

    let (username_taken,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(&username)
        .fetch_one(&state.db)
        .await?;
    if username_taken > 0 {
        errors.add("username", "unique", "A user with that username already exists");
    }

    errors.into_result()?;

    let password_hash = hash_password(form.password.as_deref().unwrap_or_default())?;
    let user = User::new(
        email,
        username,
        form.first_name.unwrap_or_default().trim().to_string(),
        form.last_name.unwrap_or_default().trim().to_string(),
        password_hash,
    );

    sqlx::query(
        r#"
        INSERT INTO users (id, email, username, first_name, last_name, password_hash, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(&user.created_at)
    .execute(&state.db)
    .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(RegisteredUser::from(user))))
}

async fn list_users(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let query = QueryPairs::parse(raw.as_deref());
    let window = query.window(state.page_size);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;

    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY email LIMIT ? OFFSET ?")
        .bind(window.limit)
        .bind(window.offset())
        .fetch_all(&state.db)
        .await?;

    let mut views = Vec::with_capacity(users.len());
    for user in users {
        views.push(UserView::build(&state.db, user, viewer.as_ref()).await?);
    }

    Ok(Json(Page::new(views, count, window, "/api/users", &query)))
}

async fn me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let viewer = user.clone();
    Ok(Json(UserView::build(&state.db, user, Some(&viewer)).await?))
}

async fn show_user(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or(AppError::NotFound)?;
    Ok(Json(UserView::build(&state.db, user, viewer.as_ref()).await?))
}

async fn set_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(form): ApiJson<SetPasswordForm>,
) -> Result<impl IntoResponse, AppError> {
    let mut errors = ValidationErrors::new();
    required(&mut errors, "new_password", Some(form.new_password.as_str()), PASSWORD_MAX);
    errors.into_result()?;

    if !verify_password(&form.current_password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let password_hash = hash_password(&form.new_password)?;
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    tracing::info!(user_id = %user.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

async fn subscriptions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let query = QueryPairs::parse(raw.as_deref());
    let window = query.window(state.page_size);
    let recipes_limit = query.get_i64("recipes_limit").filter(|l| *l >= 0);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM relations WHERE kind = ? AND user_id = ?")
            .bind(RelationKind::Follow)
            .bind(&user.id)
            .fetch_one(&state.db)
            .await?;

    let authors: Vec<User> = sqlx::query_as(
        r#"
        SELECT u.* FROM users u
        JOIN relations r ON r.target_id = u.id
        WHERE r.kind = ? AND r.user_id = ?
        ORDER BY r.created_at, r.rowid
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(RelationKind::Follow)
    .bind(&user.id)
    .bind(window.limit)
    .bind(window.offset())
    .fetch_all(&state.db)
    .await?;

    let mut views = Vec::with_capacity(authors.len());
    for author in authors {
        views.push(FollowView::build(&state.db, author, recipes_limit).await?);
    }

    Ok(Json(Page::new(views, count, window, "/api/users/subscriptions", &query)))
}

async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    relations::add(&state.db, RelationKind::Follow, &user, &id).await?;

    let author: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
    let recipes_limit = QueryPairs::parse(raw.as_deref())
        .get_i64("recipes_limit")
        .filter(|l| *l >= 0);

    let view = FollowView::build(&state.db, author, recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    relations::remove(&state.db, RelationKind::Follow, &user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
