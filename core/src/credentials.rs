//! Where the authorization value comes from.
//!
//! The API client never reaches into global storage: it is handed a
//! `CredentialProvider` at construction and asks it for the current value on
//! every authenticated call. A `TokenStore` is a provider that the session can
//! also write to after login, register and logout.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

/// Persisting or removing a token failed.
#[derive(Debug, Error)]
#[error("token store error: {message}")]
pub struct StoreError {
    pub message: String,
    #[source]
    pub source: Option<std::io::Error>,
}

impl StoreError {
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Supplies the `Authorization` header value, read fresh per call.
pub trait CredentialProvider: Send + Sync {
    /// The full header value (e.g. `Bearer abc`), or `None` when logged out.
    fn authorization(&self) -> Option<String>;
}

/// A credential provider that can be written to.
///
/// Implementations must make `store` atomic with respect to `authorization`:
/// a reader sees either the old value or the new one, never a partial write.
pub trait TokenStore: CredentialProvider {
    fn store(&self, value: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

impl<P: CredentialProvider + ?Sized> CredentialProvider for Arc<P> {
    fn authorization(&self) -> Option<String> {
        (**self).authorization()
    }
}

impl<S: TokenStore + ?Sized> TokenStore for Arc<S> {
    fn store(&self, value: &str) -> Result<(), StoreError> {
        (**self).store(value)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}

/// Process-local token storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(value: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(value.into())),
        }
    }
}

impl CredentialProvider for MemoryTokenStore {
    fn authorization(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn store(&self, value: &str) -> Result<(), StoreError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.authorization(), None);

        store.store("Bearer one").unwrap();
        assert_eq!(store.authorization().as_deref(), Some("Bearer one"));

        store.store("Bearer two").unwrap();
        assert_eq!(store.authorization().as_deref(), Some("Bearer two"));

        store.clear().unwrap();
        assert_eq!(store.authorization(), None);
    }

    #[test]
    fn shared_store_sees_writes_through_arc() {
        let store = Arc::new(MemoryTokenStore::new());
        let provider: Arc<dyn CredentialProvider> = store.clone();
        store.store("Bearer shared").unwrap();
        assert_eq!(provider.authorization().as_deref(), Some("Bearer shared"));
    }
}
