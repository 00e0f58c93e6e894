use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, OnceLock};

use futures_core::future::BoxFuture;

use crate::entra::AzureCliCredential;
use crate::error::{BoxDynError, Error};

/// An access token issued by Microsoft Entra ID.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The compact-serialized token, used verbatim as the database password.
    pub token: String,

    /// Expiry as seconds since the Unix epoch, if the credential reported one.
    pub expires_on: Option<i64>,
}

impl AccessToken {
    /// Wrap a raw token string with no known expiry.
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken {
            token: token.into(),
            expires_on: None,
        }
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// A credential that acquires access tokens by blocking the calling thread.
pub trait TokenCredential: Send + Sync {
    /// Request a token valid for `scope`.
    fn get_token(&self, scope: &str) -> Result<AccessToken, BoxDynError>;
}

/// A credential that acquires access tokens asynchronously.
///
/// If the returned future is dropped before it completes, the implementation must abandon the
/// request and release anything it opened for it.
pub trait AsyncTokenCredential: Send + Sync {
    /// Request a token valid for `scope`.
    fn get_token<'a>(&'a self, scope: &'a str) -> BoxFuture<'a, Result<AccessToken, BoxDynError>>;
}

/// A blocking or asynchronous token credential.
///
/// Cloning is cheap; clones share the same underlying credential.
#[derive(Clone)]
pub enum Credential {
    /// Tokens are acquired on the calling thread.
    Blocking(Arc<dyn TokenCredential>),

    /// Tokens are acquired by awaiting the credential.
    Async(Arc<dyn AsyncTokenCredential>),

    /// One credential that can do both. Blocking derivation uses `blocking`, everything else
    /// awaits `asynchronous`.
    Dual {
        /// The blocking face.
        blocking: Arc<dyn TokenCredential>,
        /// The asynchronous face.
        asynchronous: Arc<dyn AsyncTokenCredential>,
    },
}

impl Credential {
    /// Wrap a blocking credential.
    pub fn blocking(credential: impl TokenCredential + 'static) -> Self {
        Credential::Blocking(Arc::new(credential))
    }

    /// Wrap an asynchronous credential.
    pub fn from_async(credential: impl AsyncTokenCredential + 'static) -> Self {
        Credential::Async(Arc::new(credential))
    }

    /// Wrap a credential that can acquire tokens both ways.
    pub fn dual<C>(credential: C) -> Self
    where
        C: TokenCredential + AsyncTokenCredential + 'static,
    {
        let credential = Arc::new(credential);

        Credential::Dual {
            blocking: credential.clone(),
            asynchronous: credential,
        }
    }

    /// `true` if tokens can be acquired without suspending.
    pub fn supports_blocking(&self) -> bool {
        !matches!(self, Credential::Async(_))
    }

    /// The blocking face of this credential, if it has one.
    pub fn to_blocking(&self) -> Option<Credential> {
        match self {
            Credential::Blocking(credential) | Credential::Dual { blocking: credential, .. } => {
                Some(Credential::Blocking(credential.clone()))
            }
            Credential::Async(_) => None,
        }
    }

    /// Acquire a token for `scope`.
    ///
    /// A [`Credential::Dual`] is awaited through its asynchronous face.
    /// A blocking credential is called directly and blocks the current thread for the length of
    /// the round-trip. Errors from the credential are returned unchanged inside
    /// [`Error::TokenAcquisition`]; there is no retry.
    pub async fn get_token(&self, scope: &str) -> Result<AccessToken, Error> {
        tracing::info!(scope, "acquiring Entra token for postgres password");

        let res = match self {
            Credential::Blocking(credential) => credential.get_token(scope),
            Credential::Async(credential) | Credential::Dual { asynchronous: credential, .. } => {
                credential.get_token(scope).await
            }
        };

        match res {
            Ok(token) => {
                tracing::debug!(scope, expires_on = ?token.expires_on, "acquired Entra token");
                Ok(token)
            }
            Err(source) => Err(Error::TokenAcquisition {
                scope: scope.to_owned(),
                source,
            }),
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Blocking(_) => f.write_str("Credential::Blocking"),
            Credential::Async(_) => f.write_str("Credential::Async"),
            Credential::Dual { .. } => f.write_str("Credential::Dual"),
        }
    }
}

/// A credential that is created on first use and shared afterwards.
///
/// Used whenever a connection is made without an explicit [`Credential`]. The initializer runs
/// at most once, no matter how many tasks race on the first [`get()`](Self::get).
///
/// ```rust
/// use sqlx_azure::entra::{AzureCliCredential, Credential, DefaultCredential};
///
/// static CREDENTIAL: DefaultCredential =
///     DefaultCredential::new(|| Credential::blocking(AzureCliCredential::new()));
///
/// assert!(!CREDENTIAL.is_initialized());
/// assert!(CREDENTIAL.get().supports_blocking());
/// assert!(CREDENTIAL.is_initialized());
/// ```
pub struct DefaultCredential {
    cell: OnceLock<Credential>,
    init: fn() -> Credential,
}

impl DefaultCredential {
    /// Create a default that will be built by `init` on first use.
    pub const fn new(init: fn() -> Credential) -> Self {
        DefaultCredential {
            cell: OnceLock::new(),
            init,
        }
    }

    /// The process-wide default: an [`AzureCliCredential`], usable from blocking and
    /// asynchronous code.
    pub fn azure_cli() -> &'static DefaultCredential {
        static AZURE_CLI: DefaultCredential =
            DefaultCredential::new(|| Credential::dual(AzureCliCredential::new()));

        &AZURE_CLI
    }

    /// Get the credential, creating it if this is the first call.
    pub fn get(&self) -> &Credential {
        self.cell.get_or_init(|| {
            tracing::debug!("creating default Entra credential");
            (self.init)()
        })
    }

    /// `true` once the credential has been created.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Debug for DefaultCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCredential")
            .field("credential", &self.cell.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Rejecting;

    impl TokenCredential for Rejecting {
        fn get_token(&self, _scope: &str) -> Result<AccessToken, BoxDynError> {
            Err("unauthorized".into())
        }
    }

    struct Fixed;

    impl AsyncTokenCredential for Fixed {
        fn get_token<'a>(
            &'a self,
            scope: &'a str,
        ) -> BoxFuture<'a, Result<AccessToken, BoxDynError>> {
            Box::pin(async move { Ok(AccessToken::new(format!("token-for-{scope}"))) })
        }
    }

    #[test]
    fn it_wraps_credential_errors_with_the_scope() {
        let err = Credential::blocking(Rejecting)
            .get_token("https://example.com/.default")
            .now_or_never()
            .unwrap()
            .unwrap_err();

        match err {
            Error::TokenAcquisition { scope, source } => {
                assert_eq!(scope, "https://example.com/.default");
                assert_eq!(source.to_string(), "unauthorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn it_awaits_async_credentials() {
        let token = Credential::from_async(Fixed).get_token("a").await.unwrap();
        assert_eq!(token.token, "token-for-a");
    }

    struct Both;

    impl TokenCredential for Both {
        fn get_token(&self, _scope: &str) -> Result<AccessToken, BoxDynError> {
            Ok(AccessToken::new("blocking"))
        }
    }

    impl AsyncTokenCredential for Both {
        fn get_token<'a>(
            &'a self,
            _scope: &'a str,
        ) -> BoxFuture<'a, Result<AccessToken, BoxDynError>> {
            Box::pin(async { Ok(AccessToken::new("async")) })
        }
    }

    #[tokio::test]
    async fn it_picks_the_face_of_dual_credentials() {
        let credential = Credential::dual(Both);
        assert!(credential.supports_blocking());

        let token = credential.get_token("a").await.unwrap();
        assert_eq!(token.token, "async");

        let blocking = credential.to_blocking().unwrap();
        assert!(matches!(blocking, Credential::Blocking(_)));

        let token = blocking.get_token("a").now_or_never().unwrap().unwrap();
        assert_eq!(token.token, "blocking");

        assert!(Credential::from_async(Fixed).to_blocking().is_none());
    }

    #[test]
    fn it_defaults_to_a_credential_usable_from_blocking_code() {
        let credential = DefaultCredential::azure_cli().get();

        assert!(matches!(credential, Credential::Dual { .. }));
        assert!(credential.to_blocking().is_some());
    }

    #[test]
    fn it_initializes_the_default_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        static DEFAULT: DefaultCredential = DefaultCredential::new(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Credential::blocking(Rejecting)
        });

        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| DEFAULT.get().supports_blocking()))
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }

        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn it_redacts_tokens_in_debug_output() {
        let token = AccessToken::new("secret");
        assert!(!format!("{token:?}").contains("secret"));
    }
}
