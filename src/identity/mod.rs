pub mod google;

use async_trait::async_trait;
use serde::Deserialize;

/// Profile fields returned by an identity provider's userinfo endpoint.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Profile {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug)]
pub enum IdentityError {
    /// The provider answered with a non-success status.
    Rejected { status: u16, body: String },
    /// The request never produced a usable answer (timeout, connect, bad JSON).
    Transport(String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::Rejected { status, body } => write!(f, "{status}: {body}"),
            IdentityError::Transport(msg) => write!(f, "{msg}"),
        }
    }
}

/// Exchanges an external OAuth access token for the holder's profile.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange(&self, token: &str) -> Result<Profile, IdentityError>;
}
