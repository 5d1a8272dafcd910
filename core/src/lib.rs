//! API client core for the bookshelf catalog service.
//!
//! # Overview
//! Lets a presentation layer log in, register, and list, create and delete
//! books against a REST backend, with a keyed query cache that is invalidated
//! after successful writes.
//!
//! # Design
//! - `BookClient` is stateless: it builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network.
//! - `ApiClient` runs those requests through a `Transport` and reads the
//!   authorization value from an injected `CredentialProvider` on every call.
//! - Every failure is normalized into one `ApiError` carrying a single
//!   message. Nothing is retried.
//! - `Session` ties the client to a `QueryClient` (reads, cached by
//!   `QueryKey`) and a `MutationTracker` (writes, which invalidate keys on
//!   success).
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod multipart;
pub mod mutation;
pub mod query;
pub mod session;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use client::BookClient;
pub use config::{ClientConfig, ConfigError};
pub use credentials::{CredentialProvider, MemoryTokenStore, StoreError, TokenStore};
pub use error::{ApiError, ErrorKind, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use mutation::{MutationKind, MutationStatus, MutationTracker};
pub use query::{QueryClient, QueryKey, QueryStatus};
pub use session::Session;
pub use transport::{Transport, UreqTransport};
pub use types::{Ack, Attachment, AuthResult, Book, BookId, Credentials, NewBook, RegistrationRequest};
