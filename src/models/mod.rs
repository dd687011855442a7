pub mod conversation;
pub mod message;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;

/// Separator between the two participant identities in a conversation key.
/// `UserId` construction rejects it, which is what keeps key derivation
/// collision-free across distinct pairs.
pub(crate) const KEY_SEPARATOR: char = ':';

/// Opaque user identifier, as issued by the identity provider.
///
/// Construction is fallible: the `':'` key separator is reserved and never
/// appears in a valid identity. The empty string is representable so that a
/// blank receiver field can reach the router's own validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.contains(KEY_SEPARATOR) {
            return Err(AppError::BadRequest(format!(
                "identity contains reserved character {KEY_SEPARATOR:?}"
            )));
        }
        Ok(Self(s))
    }
}

impl TryFrom<&str> for UserId {
    type Error = AppError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_from(s.to_string())
    }
}

impl std::str::FromStr for UserId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}
