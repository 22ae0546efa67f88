//! Current-user identity supplied by the authentication layer
//!
//! Credentials and tokens are handled elsewhere; this crate only needs to know
//! who, if anyone, is making the request.

use serde::{Deserialize, Serialize};

/// An authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

/// Resolves the user behind the current request
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<Identity>;
}

/// Provider that always returns the same (possibly absent) identity
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<Identity>);

impl StaticIdentity {
    pub fn signed_in(identity: Identity) -> Self {
        Self(Some(identity))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl From<Option<Identity>> for StaticIdentity {
    fn from(identity: Option<Identity>) -> Self {
        Self(identity)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<Identity> {
        self.0.clone()
    }
}
