//! Async API client: builds with `BookClient`, sends with a `Transport`,
//! parses with `BookClient` again.

use crate::client::BookClient;
use crate::credentials::CredentialProvider;
use crate::error::{normalize, ApiError, ErrorKind};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{Ack, AuthResult, Book, BookId, Credentials, NewBook, RegistrationRequest};

/// The five backend operations with uniform error normalization.
///
/// Every failure, whether the backend rejected the call or no response
/// arrived, comes back as one `ApiError`. Nothing is retried.
pub struct ApiClient<T, C> {
    client: BookClient,
    transport: T,
    credentials: C,
}

impl<T: Transport, C: CredentialProvider> ApiClient<T, C> {
    pub fn new(base_url: &str, transport: T, credentials: C) -> Self {
        Self {
            client: BookClient::new(base_url),
            transport,
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResult, ApiError> {
        let request = self.client.build_login(credentials)?;
        let response = self.send(ErrorKind::Auth, request).await?;
        self.client.parse_login(response)
    }

    pub async fn register(&self, request: &RegistrationRequest) -> Result<AuthResult, ApiError> {
        let request = self.client.build_register(request)?;
        let response = self.send(ErrorKind::Auth, request).await?;
        self.client.parse_register(response)
    }

    pub async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
        let request = self.client.build_list_books();
        let response = self.send(ErrorKind::Fetch, request).await?;
        self.client.parse_list_books(response)
    }

    pub async fn create_book(&self, book: &NewBook) -> Result<Book, ApiError> {
        let authorization = self.credentials.authorization();
        let request = self.client.build_create_book(book, authorization.as_deref());
        let response = self.send(ErrorKind::Fetch, request).await?;
        self.client.parse_create_book(response)
    }

    pub async fn delete_book(&self, id: &BookId) -> Result<Ack, ApiError> {
        let authorization = self.credentials.authorization();
        let request = self.client.build_delete_book(id, authorization.as_deref());
        let response = self.send(ErrorKind::Fetch, request).await?;
        self.client.parse_delete_book(response)
    }

    async fn send(&self, kind: ErrorKind, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.transport
            .execute(request)
            .await
            .map_err(|e| normalize(kind, e.into()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::credentials::{MemoryTokenStore, TokenStore};
    use crate::error::{TransportError, RESPONSE_FALLBACK, UNKNOWN_FALLBACK};
    use crate::types::Attachment;

    /// Records requests and answers with one canned result.
    struct Canned {
        answer: Mutex<Option<Result<HttpResponse, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Canned {
        fn respond(status: u16, body: &str) -> Self {
            Self::with(Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.as_bytes().to_vec(),
            }))
        }

        fn unreachable() -> Self {
            Self::with(Err(TransportError::Request("connection refused".to_string())))
        }

        fn with(answer: Result<HttpResponse, TransportError>) -> Self {
            Self {
                answer: Mutex::new(Some(answer)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.answer.lock().unwrap().take().expect("one request per test")
        }
    }

    fn creds() -> Credentials {
        Credentials {
            email: "a@b.com".to_string(),
            password: "secret".to_string(),
        }
    }

    fn new_book() -> NewBook {
        let attachment = Attachment {
            file_name: "x".to_string(),
            content_type: "application/octet-stream".to_string(),
            bytes: Vec::new(),
        };
        NewBook {
            title: "T".to_string(),
            genre: "G".to_string(),
            description: "D".to_string(),
            cover_image: attachment.clone(),
            file: attachment,
        }
    }

    #[tokio::test]
    async fn login_returns_payload_unchanged() {
        let api = ApiClient::new("http://api", Canned::respond(200, r#"{"accessToken":"tok123","role":"admin"}"#), MemoryTokenStore::new());
        let result = api.login(&creds()).await.unwrap();
        assert_eq!(result.access_token, "tok123");
        assert_eq!(result.extra["role"], "admin");
    }

    #[tokio::test]
    async fn login_network_failure_uses_unknown_fallback() {
        let api = ApiClient::new("http://api", Canned::unreachable(), MemoryTokenStore::new());
        let err = api.login(&creds()).await.unwrap_err();
        assert_eq!(err, ApiError::Auth { message: UNKNOWN_FALLBACK.to_string() });
    }

    #[tokio::test]
    async fn list_network_failure_uses_fetch_fallback() {
        let api = ApiClient::new("http://api", Canned::unreachable(), MemoryTokenStore::new());
        let err = api.list_books().await.unwrap_err();
        assert_eq!(err, ApiError::Fetch { message: RESPONSE_FALLBACK.to_string() });
    }

    #[tokio::test]
    async fn authorization_is_read_at_call_time() {
        let store = std::sync::Arc::new(MemoryTokenStore::new());
        let api = ApiClient::new("http://api", Canned::respond(200, r#"{"_id":"1"}"#), store.clone());
        store.store("Bearer late").unwrap();

        api.delete_book(&BookId::new("1")).await.unwrap();

        let seen = api.transport.seen.lock().unwrap();
        assert_eq!(seen[0].header("authorization"), Some("Bearer late"));
    }

    #[tokio::test]
    async fn create_without_token_is_sent_and_backend_rejection_surfaces() {
        let api = ApiClient::new("http://api", Canned::respond(401, r#"{"message":"Unauthorized"}"#), MemoryTokenStore::new());
        let err = api.create_book(&new_book()).await.unwrap_err();
        assert_eq!(err, ApiError::Fetch { message: "Unauthorized".to_string() });

        let seen = api.transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].header("authorization").is_none());
    }
}
