//! band-trader - Band automaton for spread and single-instrument strategies

use anyhow::Result;
use band_trader::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (BAND_TRADER_BARS, RUST_LOG)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
