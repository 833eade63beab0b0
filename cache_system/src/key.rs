//! Cache key derivation
//!
//! A key is the call-site name followed by a SHA-256 digest of the call's
//! parameters in canonical JSON form. Identical parameters always produce the
//! same key; different parameters produce different keys.

use crate::errors::CacheError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key from a call-site name and the parameters that shape the result
    pub fn derive<P>(call_site: &str, params: &P) -> Result<Self, CacheError>
    where
        P: Serialize + ?Sized,
    {
        // Going through Value sorts object keys, so map ordering never leaks into the key
        let canonical = serde_json::to_vec(&serde_json::to_value(params)?)?;
        let digest = Sha256::digest(&canonical);

        Ok(Self(format!("{}:query:{:x}", call_site, digest)))
    }

    /// Use a caller-chosen key verbatim
    pub fn raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
