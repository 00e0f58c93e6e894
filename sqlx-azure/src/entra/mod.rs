//! Microsoft Entra ID authentication for Azure Database for PostgreSQL.
//!
//! Connecting happens in three steps:
//!
//! 1. an access token is requested from a [`Credential`] for [`AZURE_DB_FOR_POSTGRES_SCOPE`];
//! 2. the username is resolved from the token's claims (see [`resolve_username`]). Some
//!    identities omit identifying claims from database-scoped tokens, in which case a second
//!    token is requested for [`AZURE_MANAGEMENT_SCOPE`] only to discover the username;
//! 3. the resulting [`CredentialPair`] is merged into the [`PgConnectOptions`] used to connect.
//!
//! Tokens are never cached: every call to [`EntraConnectOptions::connect`] (or any of the other
//! resolving methods) derives a fresh pair. Tokens issued by Entra ID are short-lived, so
//! long-running pools should call [`EntraConnectOptions::refresh_pool`] periodically.
//!
//! [`PgConnectOptions`]: sqlx_postgres::PgConnectOptions

mod azure_cli;
mod claims;
mod conninfo;
mod credential;
mod options;
mod principal;

pub use azure_cli::{AzureCliCredential, AzureCliError};
pub use claims::{Claims, DecodeError};
pub use conninfo::CredentialPair;
pub use credential::{
    AccessToken, AsyncTokenCredential, Credential, DefaultCredential, TokenCredential,
};
pub use options::EntraConnectOptions;
pub use principal::{parse_principal_name, resolve_username};

/// Scope of tokens accepted as passwords by Azure Database for PostgreSQL.
pub const AZURE_DB_FOR_POSTGRES_SCOPE: &str = "https://ossrdbms-aad.database.windows.net/.default";

/// Scope of Azure Resource Manager tokens.
///
/// Only used to discover the username when the database-scoped token lacks identifying claims.
pub const AZURE_MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
