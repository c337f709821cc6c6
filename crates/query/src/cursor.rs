//! Opaque resume tokens for ordered scans.
//!
//! A cursor encodes a [`Position`] (the number of records that precede a
//! boundary under the declared sort) together with a scope fingerprint of
//! the filter and sort it was issued for. Tokens are URL-safe base64 over a
//! small JSON payload so they survive query strings and GraphQL arguments.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as B64, Engine as _};
use folio_store::{Filter, SortSpec};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CursorError;

const CURSOR_VERSION: u32 = 1;

/// Hex characters of the SHA-256 scope digest kept in a token.
const SCOPE_LEN: usize = 16;

/// An opaque position token. The empty cursor means "start of sequence".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Cursor(s)
    }
}

impl From<&str> for Cursor {
    fn from(s: &str) -> Self {
        Cursor(s.to_string())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Absolute boundary in a sorted scan: `offset` records precede it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub offset: u64,
}

impl Position {
    pub fn new(offset: u64) -> Self {
        Self { offset }
    }
}

#[derive(Serialize, Deserialize)]
struct Payload {
    v: u32,
    scope: String,
    offset: u64,
}

/// Encodes and decodes cursors for one (filter, sort) scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorCodec {
    scope: String,
}

impl CursorCodec {
    pub fn for_query(filter: &Filter, sort: &SortSpec) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(filter.to_canonical_json().as_bytes());
        hasher.update(b"|");
        hasher.update(sort.fingerprint().as_bytes());
        let scope: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>()
            .chars()
            .take(SCOPE_LEN)
            .collect();
        Self { scope }
    }

    pub fn encode(&self, position: Position) -> Cursor {
        let payload = Payload {
            v: CURSOR_VERSION,
            scope: self.scope.clone(),
            offset: position.offset,
        };
        // A struct of plain scalars always serializes.
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        Cursor(B64.encode(json))
    }

    pub fn decode(&self, cursor: &Cursor) -> Result<Position, CursorError> {
        if cursor.is_empty() {
            return Err(CursorError::Empty);
        }
        let bytes = B64
            .decode(cursor.as_str())
            .map_err(|e| CursorError::Base64(e.to_string()))?;
        let payload: Payload =
            serde_json::from_slice(&bytes).map_err(|e| CursorError::Json(e.to_string()))?;
        if payload.v != CURSOR_VERSION {
            return Err(CursorError::UnsupportedVersion(payload.v));
        }
        if payload.scope != self.scope {
            return Err(CursorError::ScopeMismatch);
        }
        Ok(Position::new(payload.offset))
    }
}
