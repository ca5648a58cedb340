pub mod auth;
pub mod ingredients;
pub mod recipes;
pub mod shopping_list;
pub mod tags;
pub mod users;

use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` whose rejection is rendered as an `AppError` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
