use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::Display;

use crate::entra::DecodeError;

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type credentials report failures with.
pub type BoxDynError = Box<dyn StdError + 'static + Send + Sync>;

/// Represents all the ways deriving credentials or connecting can fail.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error occurred while parsing a connection string.
    #[error("error occurred while parsing a connection string: {0}")]
    Configuration(#[source] BoxDynError),

    /// The credential cannot be used in the requested mode, or does not name a known credential.
    #[error("invalid credential: {0}")]
    InvalidCredential(Cow<'static, str>),

    /// The identity provider rejected the request or could not be reached.
    #[error("failed to acquire an access token for scope `{scope}`: {source}")]
    TokenAcquisition {
        /// The scope the token was requested for.
        scope: String,

        /// The error reported by the credential, unchanged.
        #[source]
        source: BoxDynError,
    },

    /// An access token did not carry a decodable claims payload.
    #[error("failed to decode access token claims: {0}")]
    ClaimsDecode(#[from] DecodeError),

    /// Neither the database-scoped nor the management-scoped token identified a principal.
    #[error(
        "could not determine username from token claims; \
         ensure the identity has the proper Microsoft Entra ID attributes"
    )]
    UsernameResolution,

    /// Error returned by the underlying SQLx connection.
    #[error(transparent)]
    Sqlx(#[from] sqlx_core::Error),
}

impl Error {
    #[doc(hidden)]
    pub fn config(err: impl StdError + Send + Sync + 'static) -> Self {
        Error::Configuration(err.into())
    }

    pub(crate) fn invalid_credential(msg: impl Display) -> Self {
        Error::InvalidCredential(msg.to_string().into())
    }
}
