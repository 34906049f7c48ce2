//! Game identifiers
//!
//! A [`GameId`] is a fixed-width decimal string. Ids are only ever built from
//! a random draw inside the registry or by [`GameId::parse`], which rejects
//! anything that is not pure ASCII digits of the expected width. That keeps
//! untrusted request paths from ever reaching the filesystem as `..` or `/`.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Default id width, giving 1,000,000 possible ids
pub const DEFAULT_ID_WIDTH: usize = 6;

/// Unique identifier naming one game's history store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Parse an id of exactly `width` ASCII digits
    pub fn parse(raw: &str, width: usize) -> StoreResult<Self> {
        if raw.len() != width || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StoreError::InvalidGameId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Draw a random candidate id of `width` digits
    ///
    /// Candidates are not unique on their own; the registry confirms a
    /// candidate by atomically creating its directory.
    pub(crate) fn random<R: Rng + ?Sized>(rng: &mut R, width: usize) -> Self {
        let id = (0..width)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GameId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
