//! In-memory stand-in for the bookshelf backend.
//!
//! Serves the user and book endpoints with the same paths, status codes and
//! `{"message": ...}` error bodies as the real service, so clients can be
//! tested end-to-end without it.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub genre: String,
    pub description: String,
    pub author: String,
    pub cover_image: String,
    pub file: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

struct User {
    name: String,
    password: String,
}

#[derive(Default)]
pub struct Store {
    users: HashMap<String, User>,
    // access token -> user email
    tokens: HashMap<String, String>,
    books: Vec<Book>,
    // book id -> owner email
    owners: HashMap<String, String>,
}

impl Store {
    fn issue_token(&mut self, email: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), email.to_string());
        token
    }
}

pub type Db = Arc<RwLock<Store>>;

/// An error response with a `{"message": ...}` body.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    message: &'static str,
}

impl ApiFailure {
    const fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    const fn missing_fields() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "All fields are required")
    }

    const fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "message": self.message }))).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/books/", get(list_books).post(create_book))
        .route("/api/books/{id}", delete(delete_book))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiFailure> {
    if input.name.is_empty() || input.email.is_empty() || input.password.is_empty() {
        return Err(ApiFailure::missing_fields());
    }
    let mut store = db.write().await;
    if store.users.contains_key(&input.email) {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "User already exists with this email.",
        ));
    }
    store.users.insert(
        input.email.clone(),
        User {
            name: input.name,
            password: input.password,
        },
    );
    let access_token = store.issue_token(&input.email);
    tracing::info!(email = %input.email, "user registered");
    Ok((StatusCode::CREATED, Json(TokenResponse { access_token })))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginInput>,
) -> Result<Json<TokenResponse>, ApiFailure> {
    if input.email.is_empty() || input.password.is_empty() {
        return Err(ApiFailure::missing_fields());
    }
    let mut store = db.write().await;
    let user = store
        .users
        .get(&input.email)
        .ok_or(ApiFailure::new(StatusCode::NOT_FOUND, "User not found."))?;
    if user.password != input.password {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "Username or password incorrect!",
        ));
    }
    let access_token = store.issue_token(&input.email);
    Ok(Json(TokenResponse { access_token }))
}

async fn list_books(State(db): State<Db>) -> Json<Vec<Book>> {
    Json(db.read().await.books.clone())
}

/// Multipart fields collected from a create request.
#[derive(Default)]
struct UploadForm {
    title: Option<String>,
    genre: Option<String>,
    description: Option<String>,
    cover_image: Option<String>,
    file: Option<String>,
}

async fn create_book(
    State(db): State<Db>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Book>), ApiFailure> {
    let email = {
        let store = db.read().await;
        authenticate(&store, &headers)?
    };

    let mut form = UploadForm::default();
    let invalid = |_| ApiFailure::new(StatusCode::BAD_REQUEST, "Invalid multipart body");
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = Some(field.text().await.map_err(invalid)?),
            "genre" => form.genre = Some(field.text().await.map_err(invalid)?),
            "description" => form.description = Some(field.text().await.map_err(invalid)?),
            "coverImage" | "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(invalid)?;
                tracing::debug!(field = %name, %file_name, size = bytes.len(), "received upload");
                if name == "coverImage" {
                    form.cover_image = Some(file_name);
                } else {
                    form.file = Some(file_name);
                }
            }
            _ => {}
        }
    }

    let (Some(title), Some(genre), Some(description), Some(cover_image), Some(file)) = (
        form.title.filter(|s| !s.is_empty()),
        form.genre.filter(|s| !s.is_empty()),
        form.description.filter(|s| !s.is_empty()),
        form.cover_image,
        form.file,
    ) else {
        return Err(ApiFailure::missing_fields());
    };

    let mut store = db.write().await;
    let author = store
        .users
        .get(&email)
        .map(|user| user.name.clone())
        .unwrap_or_default();
    let id = Uuid::new_v4().simple().to_string();
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let book = Book {
        cover_image: format!("/uploads/covers/{id}-{cover_image}"),
        file: format!("/uploads/books/{id}-{file}"),
        id,
        title,
        genre,
        description,
        author,
        created_at: now.clone(),
        updated_at: now,
    };
    store.owners.insert(book.id.clone(), email);
    store.books.push(book.clone());
    tracing::info!(id = %book.id, title = %book.title, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

async fn delete_book(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let mut store = db.write().await;
    let email = authenticate(&store, &headers)?;
    let index = store
        .books
        .iter()
        .position(|book| book.id == id)
        .ok_or(ApiFailure::new(StatusCode::NOT_FOUND, "Book not found"))?;
    if store.owners.get(&id) != Some(&email) {
        return Err(ApiFailure::new(
            StatusCode::FORBIDDEN,
            "You can not delete others book.",
        ));
    }
    store.books.remove(index);
    store.owners.remove(&id);
    tracing::info!(%id, "book deleted");
    Ok(Json(serde_json::json!({ "_id": id })))
}

/// Resolve `Authorization: Bearer <token>` to the user's email.
fn authenticate(store: &Store, headers: &HeaderMap) -> Result<String, ApiFailure> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| store.tokens.get(token))
        .cloned()
        .ok_or(ApiFailure::unauthorized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_serializes_with_backend_field_names() {
        let book = Book {
            id: "abc".to_string(),
            title: "Test".to_string(),
            genre: "Drama".to_string(),
            description: "d".to_string(),
            author: "Ann".to_string(),
            cover_image: "/uploads/covers/c.png".to_string(),
            file: "/uploads/books/b.pdf".to_string(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["_id"], "abc");
        assert_eq!(json["coverImage"], "/uploads/covers/c.png");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00.000Z");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn login_input_tolerates_missing_fields() {
        let input: LoginInput = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        assert_eq!(input.email, "a@b.com");
        assert!(input.password.is_empty());
    }

    #[test]
    fn authenticate_requires_known_bearer_token() {
        let mut store = Store::default();
        let token = store.issue_token("a@b.com");

        let mut headers = HeaderMap::new();
        assert!(authenticate(&store, &headers).is_err());

        headers.insert(header::AUTHORIZATION, token.parse().unwrap());
        assert!(authenticate(&store, &headers).is_err(), "missing Bearer prefix");

        headers.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        assert_eq!(authenticate(&store, &headers).unwrap(), "a@b.com");
    }
}
