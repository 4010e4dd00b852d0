//! Credential pool with a process-wide rotation cursor.

use crate::error::VivaError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Environment variable holding comma-separated API keys
pub const API_KEYS_ENV: &str = "VIVA_API_KEYS";

/// Ordered API keys plus the index of the one currently in use.
///
/// The cursor is shared by every session. Two requests hitting quota at the
/// same moment may both rotate, skipping a key; that only affects which key
/// is tried next, never the reply.
#[derive(Debug)]
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    pub fn new(keys: Vec<String>) -> Result<Self, VivaError> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(VivaError::EmptyCredentialPool);
        }

        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Build the pool from `VIVA_API_KEYS`.
    pub fn from_env() -> Result<Self, VivaError> {
        let raw = std::env::var(API_KEYS_ENV).unwrap_or_default();
        Self::from_list(&raw)
    }

    /// Build the pool from a comma-separated list.
    pub fn from_list(raw: &str) -> Result<Self, VivaError> {
        Self::new(raw.split(',').map(str::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.cursor.load(Ordering::Relaxed) % self.keys.len()
    }

    pub fn current(&self) -> &str {
        self.key(self.current_index())
    }

    /// Key at `index`, wrapping around the pool.
    pub fn key(&self, index: usize) -> &str {
        &self.keys[index % self.keys.len()]
    }

    /// Advance the cursor cyclically and return the new index.
    pub fn rotate(&self) -> usize {
        let len = self.keys.len();
        let previous = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);
        (previous + 1) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(keys: &[&str]) -> CredentialPool {
        CredentialPool::new(keys.iter().map(|k| k.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        assert_eq!(
            CredentialPool::new(vec![]).unwrap_err(),
            VivaError::EmptyCredentialPool
        );
        assert_eq!(
            CredentialPool::from_list(" , ,").unwrap_err(),
            VivaError::EmptyCredentialPool
        );
    }

    #[test]
    fn test_from_list_trims_and_skips_blanks() {
        let pool = CredentialPool::from_list("alpha, beta,,gamma ").unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.current(), "alpha");
    }

    #[test]
    fn test_rotation_is_cyclic() {
        let pool = pool(&["a", "b", "c"]);
        assert_eq!(pool.rotate(), 1);
        assert_eq!(pool.current(), "b");
        assert_eq!(pool.rotate(), 2);
        assert_eq!(pool.rotate(), 0);
        assert_eq!(pool.current(), "a");
    }

    #[test]
    fn test_single_key_rotates_onto_itself() {
        let pool = pool(&["only"]);
        assert_eq!(pool.rotate(), 0);
        assert_eq!(pool.current(), "only");
    }
}
