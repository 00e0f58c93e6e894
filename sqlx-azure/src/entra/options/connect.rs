use std::future::Future;

use sqlx_core::connection::ConnectOptions;
use sqlx_postgres::{PgConnectOptions, PgConnection, PgPool};

use crate::entra::{CredentialPair, EntraConnectOptions};
use crate::error::Error;

impl EntraConnectOptions {
    /// The username and password a new connection will use.
    ///
    /// If both were set explicitly they are returned as-is and no token is requested. Otherwise
    /// a fresh pair is derived (see [`CredentialPair::derive`]) and any explicitly set field
    /// replaces its derived counterpart.
    pub async fn credential_pair(&self) -> Result<CredentialPair, Error> {
        if let Some(pair) = self.explicit_pair() {
            return Ok(pair);
        }

        let derived = CredentialPair::derive(self.effective_credential()).await?;

        Ok(self.merge(derived))
    }

    /// Like [`credential_pair()`](Self::credential_pair), but runs on the calling thread.
    ///
    /// The credential in use must be able to block, which the default credential can; see
    /// [`CredentialPair::derive_blocking`].
    pub fn credential_pair_blocking(&self) -> Result<CredentialPair, Error> {
        if let Some(pair) = self.explicit_pair() {
            return Ok(pair);
        }

        let derived = CredentialPair::derive_blocking(self.effective_credential())?;

        Ok(self.merge(derived))
    }

    /// Produce the [`PgConnectOptions`] for a single connection attempt.
    pub async fn resolve(&self) -> Result<PgConnectOptions, Error> {
        let pair = self.credential_pair().await?;

        Ok(self.apply(&pair))
    }

    /// Like [`resolve()`](Self::resolve), but runs on the calling thread.
    pub fn resolve_blocking(&self) -> Result<PgConnectOptions, Error> {
        let pair = self.credential_pair_blocking()?;

        Ok(self.apply(&pair))
    }

    /// Resolve the options and hand them to `connect`, returning whatever it returns.
    ///
    /// ```rust,no_run
    /// # async fn example() -> sqlx_azure::Result<()> {
    /// use sqlx_azure::entra::EntraConnectOptions;
    /// use sqlx_postgres::PgPoolOptions;
    ///
    /// let pool = EntraConnectOptions::new()
    ///     .connect_with(|options| PgPoolOptions::new().max_connections(5).connect_with(options))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect_with<F, Fut, T>(&self, connect: F) -> Result<T, Error>
    where
        F: FnOnce(PgConnectOptions) -> Fut,
        Fut: Future<Output = Result<T, sqlx_core::Error>>,
    {
        let options = self.resolve().await?;

        Ok(connect(options).await?)
    }

    /// Establish a new connection.
    pub async fn connect(&self) -> Result<PgConnection, Error> {
        self.connect_with(|options| async move { options.connect().await })
            .await
    }

    /// Derive a fresh username and password for connections `pool` opens from now on.
    ///
    /// Access tokens expire, so a long-lived pool that was created with a derived token must be
    /// refreshed before then. Connections that are already open are not affected.
    pub async fn refresh_pool(&self, pool: &PgPool) -> Result<(), Error> {
        let options = self.resolve().await?;

        pool.set_connect_options(options);

        Ok(())
    }

    fn explicit_pair(&self) -> Option<CredentialPair> {
        match (self.get_username(), self.get_password()) {
            (Some(username), Some(password)) => {
                tracing::debug!(username, "using explicitly configured postgres credentials");
                Some(CredentialPair::new(username, password))
            }
            _ => None,
        }
    }

    fn merge(&self, derived: CredentialPair) -> CredentialPair {
        CredentialPair {
            username: self
                .get_username()
                .map_or(derived.username, str::to_owned),
            password: self
                .get_password()
                .map_or(derived.password, str::to_owned),
        }
    }

    fn apply(&self, pair: &CredentialPair) -> PgConnectOptions {
        self.inner
            .clone()
            .username(pair.username())
            .password(pair.password())
    }
}
