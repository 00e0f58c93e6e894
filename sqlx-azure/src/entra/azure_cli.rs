use std::ffi::{OsStr, OsString};
use std::io;
use std::process::{ExitStatus, Output};

use futures_core::future::BoxFuture;
use serde::Deserialize;

use crate::entra::{AccessToken, AsyncTokenCredential, TokenCredential};
use crate::error::BoxDynError;

/// Acquires tokens from the Azure CLI (`az account get-access-token`).
///
/// Uses whatever account is signed in with `az login`. Implements both [`TokenCredential`] and
/// [`AsyncTokenCredential`]; the asynchronous form kills the `az` process if the request is
/// cancelled.
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: OsString,
    tenant_id: Option<String>,
}

/// An error returned when the Azure CLI could not produce a token.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AzureCliError {
    /// The `az` program could not be started.
    #[error("failed to run the Azure CLI (is it installed and on `PATH`?): {0}")]
    Spawn(#[source] io::Error),

    /// `az` ran but exited unsuccessfully, e.g. because nobody is logged in.
    #[error("the Azure CLI exited with {status}: {stderr}")]
    Failed {
        /// Exit status of the process.
        status: ExitStatus,
        /// Standard error, trimmed.
        stderr: String,
    },

    /// `az` succeeded but its output was not the expected JSON document.
    #[error("unexpected output from the Azure CLI: {0}")]
    InvalidOutput(#[source] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliAccessToken {
    access_token: String,

    // Only present in newer versions of the CLI.
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
}

impl AzureCliCredential {
    /// Use the `az` program from `PATH` with the tenant it is signed in to.
    pub fn new() -> Self {
        let program = if cfg!(target_os = "windows") {
            "az.cmd"
        } else {
            "az"
        };

        AzureCliCredential {
            program: program.into(),
            tenant_id: None,
        }
    }

    /// Request tokens from the given tenant instead of the CLI's current one.
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Run a different executable instead of `az`.
    pub fn program(mut self, program: impl AsRef<OsStr>) -> Self {
        self.program = program.as_ref().to_owned();
        self
    }

    fn args<'a>(&'a self, scope: &'a str) -> Vec<&'a str> {
        let mut args = vec![
            "account",
            "get-access-token",
            "--output",
            "json",
            "--scope",
            scope,
        ];

        if let Some(tenant_id) = &self.tenant_id {
            args.extend(["--tenant", tenant_id.as_str()]);
        }

        args
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCredential for AzureCliCredential {
    fn get_token(&self, scope: &str) -> Result<AccessToken, BoxDynError> {
        let output = std::process::Command::new(&self.program)
            .args(self.args(scope))
            .output()
            .map_err(AzureCliError::Spawn)?;

        Ok(parse_output(output)?)
    }
}

impl AsyncTokenCredential for AzureCliCredential {
    fn get_token<'a>(&'a self, scope: &'a str) -> BoxFuture<'a, Result<AccessToken, BoxDynError>> {
        Box::pin(async move {
            let output = tokio::process::Command::new(&self.program)
                .args(self.args(scope))
                .kill_on_drop(true)
                .output()
                .await
                .map_err(AzureCliError::Spawn)?;

            Ok(parse_output(output)?)
        })
    }
}

fn parse_output(output: Output) -> Result<AccessToken, AzureCliError> {
    if !output.status.success() {
        return Err(AzureCliError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    parse_token(&output.stdout)
}

fn parse_token(stdout: &[u8]) -> Result<AccessToken, AzureCliError> {
    let token: CliAccessToken =
        serde_json::from_slice(stdout).map_err(AzureCliError::InvalidOutput)?;

    Ok(AccessToken {
        token: token.access_token,
        expires_on: token.expires_on,
    })
}

#[test]
fn test_parse_token() {
    let token = parse_token(
        br#"{
            "accessToken": "eyJ0eXAi.eyJ1cG4i.c2ln",
            "expiresOn": "2024-05-01 12:00:00.000000",
            "expires_on": 1714564800,
            "subscription": "00000000-0000-0000-0000-000000000000",
            "tenant": "11111111-1111-1111-1111-111111111111",
            "tokenType": "Bearer"
        }"#,
    )
    .unwrap();

    assert_eq!(token.token, "eyJ0eXAi.eyJ1cG4i.c2ln");
    assert_eq!(token.expires_on, Some(1714564800));

    // older CLI versions only report `expiresOn`
    let token = parse_token(br#"{"accessToken": "a.b.c", "expiresOn": "2024-05-01"}"#).unwrap();
    assert_eq!(token.expires_on, None);

    assert!(matches!(
        parse_token(b"ERROR: Please run 'az login' to setup account."),
        Err(AzureCliError::InvalidOutput(_))
    ));
}

#[test]
fn test_args() {
    let credential = AzureCliCredential::new();
    assert_eq!(
        credential.args("scope"),
        ["account", "get-access-token", "--output", "json", "--scope", "scope"]
    );

    let credential = credential.tenant_id("contoso");
    assert_eq!(&credential.args("scope")[6..], ["--tenant", "contoso"]);
}
