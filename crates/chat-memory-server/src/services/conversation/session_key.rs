//! Canonical storage keys for caller-supplied session tokens.
//!
//! A token that already parses as a UUID is kept as is. Anything else is
//! hashed into a name-based (v5, SHA-1) UUID under [`SESSION_NAMESPACE`].
//! Both the namespace and the hashing scheme are part of the storage format:
//! changing either one orphans every stored conversation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace for name-based session keys. Never change this value.
pub const SESSION_NAMESPACE: Uuid = Uuid::from_u128(0x8c4d6a3e_1f2b_4c5d_9e7f_0a1b2c3d4e5f);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(Uuid);

impl SessionKey {
    /// Resolve any session token to its canonical key. Never fails.
    pub fn resolve(token: &str) -> Self {
        match Uuid::parse_str(token) {
            Ok(uuid) => Self(uuid),
            Err(_) => Self(Uuid::new_v5(&SESSION_NAMESPACE, token.as_bytes())),
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for SessionKey {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
