#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tempfile::TempDir;

use foodgram::config::Config;

/// A 1x1 transparent PNG.
pub const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub media: TempDir,
}

/// A registered, logged-in user.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub cookie: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let media = tempfile::tempdir().expect("Failed to create media dir");
        let config = Config {
            media_root: media.path().to_string_lossy().into_owned(),
            ..Config::default()
        };

        let router = foodgram::build_app(pool.clone(), &config)
            .await
            .expect("Failed to build app");

        Self {
            router,
            db: pool,
            media,
        }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.request(req).await
    }

    /// Send a GET request with an optional session cookie.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send("GET", uri, None, cookie).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        self.send("POST", uri, Some(body), cookie).await
    }

    pub async fn patch_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response {
        self.send("PATCH", uri, Some(body), cookie).await
    }

    /// POST with no body, as used by the relation endpoints.
    pub async fn post(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send("POST", uri, None, cookie).await
    }

    /// Send a DELETE request with an optional session cookie.
    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Response {
        self.send("DELETE", uri, None, cookie).await
    }

    /// Register through the API and return the new user's id.
    pub async fn register(&self, username: &str, password: &str) -> String {
        let resp = self
            .post_json(
                "/api/users",
                json!({
                    "email": format!("{username}@example.com"),
                    "username": username,
                    "first_name": "Test",
                    "last_name": "Cook",
                    "password": password,
                }),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await["id"].as_str().unwrap().to_string()
    }

    /// Log in and return the session cookie string.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .post_json(
                "/api/auth/login",
                json!({ "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        resp.headers()
            .get("set-cookie")
            .expect("Login should set a session cookie")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    pub async fn user(&self, username: &str) -> TestUser {
        let id = self.register(username, "s3cret-pass").await;
        let email = format!("{username}@example.com");
        let cookie = self.login(&email, "s3cret-pass").await;
        TestUser { id, email, cookie }
    }

    /// Insert a tag directly and return its id.
    pub async fn seed_tag(&self, name: &str, slug: &str) -> String {
        let tag = foodgram::models::Tag::new(name, &random_color(), slug).unwrap();
        sqlx::query("INSERT INTO tags (id, name, color, slug) VALUES (?, ?, ?, ?)")
            .bind(&tag.id)
            .bind(&tag.name)
            .bind(&tag.color)
            .bind(&tag.slug)
            .execute(&self.db)
            .await
            .expect("Failed to seed tag");
        tag.id
    }

    /// Insert an ingredient directly and return its id.
    pub async fn seed_ingredient(&self, name: &str, unit: &str) -> String {
        let ingredient = foodgram::models::Ingredient::new(name, unit);
        sqlx::query(
            "INSERT INTO ingredients (id, name, measurement_unit, search_name) VALUES (?, ?, ?, ?)",
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.measurement_unit)
        .bind(foodgram::models::Ingredient::search_key(&ingredient.name))
        .execute(&self.db)
        .await
        .expect("Failed to seed ingredient");
        ingredient.id
    }

    /// Create a recipe through the API and return its JSON body.
    pub async fn create_recipe(
        &self,
        cookie: &str,
        name: &str,
        tags: &[&str],
        ingredients: &[(&str, i64)],
    ) -> Value {
        let resp = self
            .post_json("/api/recipes", recipe_body(name, tags, ingredients), Some(cookie))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }
}

pub fn recipe_body(name: &str, tags: &[&str], ingredients: &[(&str, i64)]) -> Value {
    json!({
        "name": name,
        "text": "Mix everything and cook.",
        "cooking_time": 20,
        "image": PNG_DATA_URI,
        "tags": tags,
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect::<Vec<_>>(),
    })
}

fn random_color() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("#{}", &hex[..6])
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}

/// Assert an error response of the given status and kind, returning the body.
pub async fn assert_error(resp: Response, status: StatusCode, kind: &str) -> Value {
    assert_eq!(resp.status(), status);
    let body = body_json(resp).await;
    assert_eq!(body["kind"], kind, "unexpected error body: {body}");
    body
}
