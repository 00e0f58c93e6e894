//! Connects to Azure Database for PostgreSQL with Microsoft Entra ID authentication.
//!
//! Sign in with `az login`, then point `DATABASE_URL` (or a `.env` file) at the server:
//!
//! ```text
//! DATABASE_URL=postgres://my-server.postgres.database.azure.com/postgres?sslmode=require
//! ```
//!
//! Access tokens issued by Entra ID expire (after one hour by default). A long-running
//! application must call `EntraConnectOptions::refresh_pool` before that happens.

use clap::{Parser, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx_azure::entra::EntraConnectOptions;

#[derive(Parser)]
#[command(about = "Demonstrate connections with Microsoft Entra ID authentication")]
struct Args {
    /// Derive credentials synchronously, asynchronously, or both.
    #[arg(long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    Sync,
    Async,
    Both,
}

async fn run_async(options: &EntraConnectOptions) -> anyhow::Result<()> {
    let pool = options
        .connect_with(|options| {
            PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .connect_with(options)
        })
        .await?;

    let (version,): (String,) = sqlx::query_as("SELECT version()").fetch_one(&pool).await?;
    println!("Async - Server version: {version}");

    pool.close().await;

    Ok(())
}

async fn run_sync(options: &EntraConnectOptions) -> anyhow::Result<()> {
    let options = options.clone();

    // Derive on a thread that is allowed to block.
    let resolved = tokio::task::spawn_blocking(move || options.resolve_blocking()).await??;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy_with(resolved);

    let (now,): (String,) = sqlx::query_as("SELECT now()::text").fetch_one(&pool).await?;
    println!("Sync - Database time: {now}");

    pool.close().await;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let options: EntraConnectOptions = args.database_url.parse()?;

    if matches!(args.mode, Mode::Sync | Mode::Both) {
        println!("=== Running Synchronous Example ===");
        match run_sync(&options).await {
            Ok(()) => println!("Sync example completed successfully!"),
            Err(e) => println!("Sync example failed: {e:#}"),
        }
    }

    if matches!(args.mode, Mode::Async | Mode::Both) {
        println!("=== Running Asynchronous Example ===");
        match run_async(&options).await {
            Ok(()) => println!("Async example completed successfully!"),
            Err(e) => println!("Async example failed: {e:#}"),
        }
    }

    Ok(())
}
