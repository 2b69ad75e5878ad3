#![cfg(not(tarpaulin_include))]

use insa_db::app;
use insa_db::config::Config;

/// Main entry point for the HR records web application
///
/// Reads configuration from the environment (see `Config::from_env`), creates
/// the private directories and the employee table if they are missing, and
/// serves the web interface until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    app::run(config).await
}
