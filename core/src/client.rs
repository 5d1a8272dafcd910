//! Stateless HTTP request builder and response parser for the bookshelf API.
//!
//! # Design
//! `BookClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Executing the round-trip is someone else's job (see `ApiClient`), which
//! keeps this half deterministic and free of I/O.
//!
//! The authorization value is a parameter of the authenticated builders: the
//! caller reads it from its credential provider at call time. `None` means the
//! header is omitted, not that the call is refused.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{normalize, ApiError, ErrorKind, Failure};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::{self, Part};
use crate::types::{Ack, AuthResult, Book, BookId, Credentials, NewBook, RegistrationRequest};

pub const LOGIN_PATH: &str = "/api/users/login";
pub const REGISTER_PATH: &str = "/api/users/register";
pub const BOOKS_PATH: &str = "/api/books/";

/// Synchronous, stateless client for the bookshelf API.
#[derive(Debug, Clone)]
pub struct BookClient {
    base_url: String,
}

impl BookClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_post(LOGIN_PATH, credentials, ErrorKind::Auth)
    }

    pub fn build_register(&self, request: &RegistrationRequest) -> Result<HttpRequest, ApiError> {
        self.json_post(REGISTER_PATH, request, ErrorKind::Auth)
    }

    pub fn build_list_books(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url(BOOKS_PATH),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Build the multipart create request with a fresh random boundary.
    pub fn build_create_book(&self, book: &NewBook, authorization: Option<&str>) -> HttpRequest {
        let boundary = format!("bookshelf-{}", Uuid::new_v4().simple());
        self.build_create_book_with_boundary(book, authorization, &boundary)
    }

    pub fn build_create_book_with_boundary(
        &self,
        book: &NewBook,
        authorization: Option<&str>,
        boundary: &str,
    ) -> HttpRequest {
        let body = multipart::encode(
            boundary,
            &[
                Part::Text { name: "title", value: &book.title },
                Part::Text { name: "genre", value: &book.genre },
                Part::Text { name: "description", value: &book.description },
                Part::File { name: "coverImage", attachment: &book.cover_image },
                Part::File { name: "file", attachment: &book.file },
            ],
        );
        let mut headers = vec![("content-type".to_string(), multipart::content_type(boundary))];
        push_authorization(&mut headers, authorization);
        HttpRequest {
            method: HttpMethod::Post,
            url: self.url(BOOKS_PATH),
            headers,
            body: Some(body),
        }
    }

    pub fn build_delete_book(&self, id: &BookId, authorization: Option<&str>) -> HttpRequest {
        let mut headers = Vec::new();
        push_authorization(&mut headers, authorization);
        HttpRequest {
            method: HttpMethod::Delete,
            url: format!("{}{BOOKS_PATH}{id}", self.base_url),
            headers,
            body: None,
        }
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<AuthResult, ApiError> {
        decode(ErrorKind::Auth, response)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<AuthResult, ApiError> {
        decode(ErrorKind::Auth, response)
    }

    pub fn parse_list_books(&self, response: HttpResponse) -> Result<Vec<Book>, ApiError> {
        decode(ErrorKind::Fetch, response)
    }

    pub fn parse_create_book(&self, response: HttpResponse) -> Result<Book, ApiError> {
        decode(ErrorKind::Fetch, response)
    }

    /// An empty success body decodes to `Value::Null`.
    pub fn parse_delete_book(&self, response: HttpResponse) -> Result<Ack, ApiError> {
        if response.is_success() && response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        decode(ErrorKind::Fetch, response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn json_post<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
        kind: ErrorKind,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(payload).map_err(|e| normalize(kind, Failure::Encode(e)))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.url(path),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }
}

fn push_authorization(headers: &mut Vec<(String, String)>, authorization: Option<&str>) {
    if let Some(value) = authorization {
        headers.push(("authorization".to_string(), value.to_string()));
    }
}

/// Reject non-2xx responses, then decode the JSON body.
fn decode<T: DeserializeOwned>(kind: ErrorKind, response: HttpResponse) -> Result<T, ApiError> {
    if !response.is_success() {
        return Err(normalize(
            kind,
            Failure::Backend {
                status: response.status,
                body: response.body,
            },
        ));
    }
    serde_json::from_slice(&response.body).map_err(|e| normalize(kind, Failure::Decode(e)))
}
