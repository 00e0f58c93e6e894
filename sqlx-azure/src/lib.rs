//! Azure specific helpers for using SQLx.
//!
//! The [`entra`] module connects to **Azure Database for PostgreSQL** with Microsoft Entra ID
//! authentication: an access token issued for the database is used as the password, and the
//! username is read from the claims embedded in that token.
//!
//! ```rust,no_run
//! # async fn example() -> sqlx_azure::Result<()> {
//! use sqlx_azure::entra::EntraConnectOptions;
//!
//! let options: EntraConnectOptions =
//!     "postgres://my-server.postgres.database.azure.com/postgres?sslmode=require".parse()?;
//!
//! let conn = options.connect().await?;
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![warn(future_incompatible, rust_2018_idioms, missing_docs)]

pub mod entra;

mod error;

pub use error::{BoxDynError, Error, Result};
