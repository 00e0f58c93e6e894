use std::fmt::{self, Debug, Formatter};

use sqlx_postgres::{PgConnectOptions, PgSslMode};

use crate::entra::{Credential, DefaultCredential};

mod connect;
mod parse;

/// Options for connecting to Azure Database for PostgreSQL with Microsoft Entra ID.
///
/// Wraps a [`PgConnectOptions`] that carries everything except the username and password. Those
/// are derived from an access token each time a connection is opened, unless both were given
/// explicitly. A username or password that *was* given explicitly always wins over the derived
/// one.
///
/// # Parsing
/// Options can be parsed from a `postgres://` URL, which accepts all the parameters
/// [`PgConnectOptions`] does plus:
///
/// | Parameter    | Default   | Description |
/// |--------------|-----------|-------------|
/// | `credential` | `default` | `azure_cli` (asynchronous), `azure_cli_blocking`, or `default` for the [`DefaultCredential`]. |
///
/// ```rust,no_run
/// # async fn example() -> sqlx_azure::Result<()> {
/// use sqlx_azure::entra::EntraConnectOptions;
/// use sqlx_postgres::PgSslMode;
///
/// // Derive the username and password from the signed-in Azure CLI account.
/// let options = EntraConnectOptions::new()
///     .host("my-server.postgres.database.azure.com")
///     .database("postgres")
///     .ssl_mode(PgSslMode::Require);
///
/// let conn = options.connect().await?;
///
/// // Or the same, from a URL.
/// let options: EntraConnectOptions =
///     "postgres://my-server.postgres.database.azure.com/postgres?sslmode=require&credential=azure_cli"
///         .parse()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EntraConnectOptions {
    pub(crate) inner: PgConnectOptions,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) credential: Option<Credential>,
    pub(crate) default_credential: &'static DefaultCredential,
}

impl Default for EntraConnectOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl EntraConnectOptions {
    /// Create options populated from the `PG*` environment variables, like
    /// [`PgConnectOptions::new()`].
    ///
    /// `PGUSER` and `PGPASSWORD` are ignored: the username and password are derived unless set
    /// with [`username()`](Self::username) and [`password()`](Self::password).
    pub fn new() -> Self {
        Self::from_pg(PgConnectOptions::new())
    }

    /// Use `options` for everything except the username and password.
    pub fn from_pg(options: PgConnectOptions) -> Self {
        EntraConnectOptions {
            inner: options,
            username: None,
            password: None,
            credential: None,
            default_credential: DefaultCredential::azure_cli(),
        }
    }

    /// Sets the name of the host to connect to.
    pub fn host(mut self, host: &str) -> Self {
        self.inner = self.inner.host(host);
        self
    }

    /// Sets the port to connect to at the server host.
    pub fn port(mut self, port: u16) -> Self {
        self.inner = self.inner.port(port);
        self
    }

    /// Sets the database name.
    pub fn database(mut self, database: &str) -> Self {
        self.inner = self.inner.database(database);
        self
    }

    /// Sets whether or with what priority a secure SSL TCP/IP connection will be negotiated.
    ///
    /// Azure Database for PostgreSQL requires at least [`PgSslMode::Require`].
    pub fn ssl_mode(mut self, mode: PgSslMode) -> Self {
        self.inner = self.inner.ssl_mode(mode);
        self
    }

    /// Sets the username to connect as instead of the one found in the token.
    ///
    /// An empty username is treated as unset.
    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_owned());
        self
    }

    /// Sets the password to connect with instead of an access token.
    ///
    /// An empty password is treated as unset.
    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_owned());
        self
    }

    /// Sets the credential to acquire tokens from.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Sets the credential used when none was given with [`credential()`](Self::credential).
    ///
    /// Defaults to [`DefaultCredential::azure_cli()`].
    pub fn default_credential(mut self, default: &'static DefaultCredential) -> Self {
        self.default_credential = default;
        self
    }

    /// Modify the wrapped [`PgConnectOptions`].
    ///
    /// Any username or password set here is overwritten when connecting.
    pub fn pg_options(mut self, f: impl FnOnce(PgConnectOptions) -> PgConnectOptions) -> Self {
        self.inner = f(self.inner);
        self
    }

    /// The explicitly set username, if any.
    pub fn get_username(&self) -> Option<&str> {
        non_empty(&self.username)
    }

    /// The explicitly set credential, if any.
    pub fn get_credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// The wrapped options, before a username and password are merged in.
    pub fn get_pg_options(&self) -> &PgConnectOptions {
        &self.inner
    }

    /// The explicitly set password, if any.
    pub fn get_password(&self) -> Option<&str> {
        non_empty(&self.password)
    }

    /// The credential derivation uses: the explicit one, or else the default.
    pub(crate) fn effective_credential(&self) -> &Credential {
        match &self.credential {
            Some(credential) => credential,
            None => self.default_credential.get(),
        }
    }
}

impl Debug for EntraConnectOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntraConnectOptions")
            .field("inner", &self.inner)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("credential", &self.credential)
            .field("default_credential", &self.default_credential)
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
