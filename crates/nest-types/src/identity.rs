//! Identity types consumed from the external identity provider.
//!
//! The provider itself (sign-in flows, token verification) is an external
//! collaborator; this crate only models the snapshot the state layer reads.

use serde::{Deserialize, Serialize};

/// The currently signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable unique identifier, used to key per-user remote resources.
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }
}

/// Claims decoded from a bearer token.
///
/// Only the claims this layer actually consumes are modeled; everything
/// else the token carries is opaque.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    pub admin: bool,
}

/// A bearer token together with its decoded claims.
#[derive(Debug, Clone)]
pub struct IdToken {
    /// Raw token value, sent as `Authorization: Bearer <raw>`.
    pub raw: String,
    pub claims: Claims,
}

impl IdToken {
    pub fn new(raw: impl Into<String>, claims: Claims) -> Self {
        Self {
            raw: raw.into(),
            claims,
        }
    }
}
