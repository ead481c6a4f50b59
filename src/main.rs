// Entrypoint for the CLI application.
// - Loads `.env`, sets up logging, authorizes against B2 and hands the
//   client to the UI loop.
// - Returns `anyhow::Result` so startup failures print with context.

use anyhow::Context;
use b2_client::{ui::main_menu, Client};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("b2_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = Client::from_env().context("Failed to authorize with B2")?;

    // Blocks until the user picks "Exit".
    main_menu(&client)?;
    Ok(())
}
