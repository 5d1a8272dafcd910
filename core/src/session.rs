//! Orchestration between the presentation layer and the API client.
//!
//! # Design
//! `Session` owns the query cache and mutation tracker and shares the token
//! store with its `ApiClient`. Reads go through the cache under a
//! `QueryKey`; writes run as tracked mutations and, only when they succeed,
//! invalidate the keys they affect. Invalidation is the sole consistency
//! mechanism: the cached list is never patched locally.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::credentials::TokenStore;
use crate::error::{ApiError, ErrorKind};
use crate::mutation::{MutationKind, MutationStatus, MutationTracker};
use crate::query::{QueryClient, QueryKey, QueryStatus};
use crate::transport::Transport;
use crate::types::{Ack, AuthResult, Book, BookId, Credentials, NewBook, RegistrationRequest};

pub const TOKEN_SAVE_FAILED: &str = "Failed to save session token";
pub const TOKEN_CLEAR_FAILED: &str = "Failed to clear session token";

pub struct Session<T, S> {
    api: ApiClient<T, Arc<S>>,
    tokens: Arc<S>,
    queries: QueryClient,
    mutations: MutationTracker,
}

impl<T: Transport, S: TokenStore> Session<T, S> {
    pub fn new(config: &ClientConfig, transport: T, tokens: Arc<S>) -> Self {
        Self {
            api: ApiClient::new(&config.base_url, transport, Arc::clone(&tokens)),
            tokens,
            queries: QueryClient::new(config.stale_after()),
            mutations: MutationTracker::new(),
        }
    }

    pub fn api(&self) -> &ApiClient<T, Arc<S>> {
        &self.api
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.authorization().is_some()
    }

    /// Log in and persist `Bearer <accessToken>`.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResult, ApiError> {
        self.mutations
            .run(MutationKind::Login, async {
                let result = self.api.login(credentials).await?;
                self.save_token(&result)?;
                Ok::<_, ApiError>(result)
            })
            .await
    }

    /// Register, drop any previous token, and persist the new one.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<AuthResult, ApiError> {
        self.mutations
            .run(MutationKind::Register, async {
                let result = self.api.register(request).await?;
                self.tokens.clear().map_err(|e| store_failure(TOKEN_CLEAR_FAILED, &e))?;
                self.save_token(&result)?;
                Ok::<_, ApiError>(result)
            })
            .await
    }

    /// Forget the token and every cached query.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.tokens.clear().map_err(|e| store_failure(TOKEN_CLEAR_FAILED, &e))?;
        self.queries.clear();
        for kind in [
            MutationKind::Login,
            MutationKind::Register,
            MutationKind::CreateBook,
            MutationKind::DeleteBook,
        ] {
            self.mutations.reset(kind);
        }
        tracing::info!("logged out");
        Ok(())
    }

    /// The book list, from cache while fresh.
    pub async fn books(&self) -> Result<Arc<Vec<Book>>, ApiError> {
        self.queries.fetch(QueryKey::Books, || self.api.list_books()).await
    }

    /// User-triggered refresh: refetch even if the cached list is fresh.
    pub async fn refresh_books(&self) -> Result<Arc<Vec<Book>>, ApiError> {
        self.queries.invalidate(&QueryKey::Books);
        self.books().await
    }

    pub async fn create_book(&self, book: &NewBook) -> Result<Book, ApiError> {
        self.mutations
            .run(MutationKind::CreateBook, async {
                let created = self.api.create_book(book).await?;
                self.queries.invalidate(&QueryKey::Books);
                Ok::<_, ApiError>(created)
            })
            .await
    }

    pub async fn delete_book(&self, id: &BookId) -> Result<Ack, ApiError> {
        self.mutations
            .run(MutationKind::DeleteBook, async {
                let ack = self.api.delete_book(id).await?;
                self.queries.invalidate(&QueryKey::Books);
                self.queries.invalidate(&QueryKey::Book(id.clone()));
                Ok::<_, ApiError>(ack)
            })
            .await
    }

    pub fn books_status(&self) -> QueryStatus {
        self.queries.status(&QueryKey::Books)
    }

    pub fn mutation_status(&self, kind: MutationKind) -> MutationStatus {
        self.mutations.status(kind)
    }

    fn save_token(&self, result: &AuthResult) -> Result<(), ApiError> {
        self.tokens
            .store(&result.bearer())
            .map_err(|e| store_failure(TOKEN_SAVE_FAILED, &e))
    }
}

fn store_failure(message: &str, err: &crate::credentials::StoreError) -> ApiError {
    tracing::warn!(error = %err, "{message}");
    ErrorKind::Auth.error(message)
}
