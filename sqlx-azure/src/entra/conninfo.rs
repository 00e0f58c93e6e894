use std::fmt::{self, Debug, Formatter};

use futures_util::FutureExt;

use crate::entra::{
    resolve_username, Claims, Credential, AZURE_DB_FOR_POSTGRES_SCOPE, AZURE_MANAGEMENT_SCOPE,
};
use crate::error::Error;

/// A username and the access token to use as its password.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub(crate) username: String,
    pub(crate) password: String,
}

impl CredentialPair {
    /// Pair an explicit username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        CredentialPair {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Acquire a database token from `credential` and determine who it was issued to.
    ///
    /// If the database-scoped token does not identify its principal, exactly one more token is
    /// requested for [`AZURE_MANAGEMENT_SCOPE`]. When that token identifies the principal it is
    /// also the one returned as the password.
    ///
    /// # Errors
    /// * [`Error::TokenAcquisition`] if either token could not be acquired.
    /// * [`Error::ClaimsDecode`] if either token is malformed. A malformed database token does
    ///   not trigger the fallback.
    /// * [`Error::UsernameResolution`] if neither token identifies its principal.
    pub async fn derive(credential: &Credential) -> Result<Self, Error> {
        for scope in [AZURE_DB_FOR_POSTGRES_SCOPE, AZURE_MANAGEMENT_SCOPE] {
            let token = credential.get_token(scope).await?.token;
            let claims = Claims::decode(&token)?;

            if let Some(username) = resolve_username(&claims) {
                tracing::debug!(%username, scope, "resolved postgres username from token claims");

                return Ok(CredentialPair {
                    username,
                    password: token,
                });
            }

            tracing::debug!(scope, "token claims do not identify the principal");
        }

        Err(Error::UsernameResolution)
    }

    /// Like [`derive()`](Self::derive), but runs to completion on the calling thread.
    ///
    /// Uses the blocking face of `credential`. A [`Credential::Async`] has none and is rejected
    /// before any token is requested.
    pub fn derive_blocking(credential: &Credential) -> Result<Self, Error> {
        let credential = credential.to_blocking().ok_or_else(|| {
            Error::invalid_credential(
                "an asynchronous credential cannot be used to connect from blocking code",
            )
        })?;

        // `Credential::get_token` never suspends for a blocking credential.
        Self::derive(&credential).now_or_never().ok_or_else(|| {
            Error::invalid_credential("blocking credential suspended while acquiring a token")
        })?
    }

    /// The database username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The access token used as the database password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for CredentialPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
