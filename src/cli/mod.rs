//! Command-line entry points

pub mod args;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

pub use args::{Cli, Commands};

use crate::app::{self, AppConfig};
use crate::modes::Mode;
use crate::server::{self, AppState, Operation};

/// Layer configuration: file, then environment, then flags
pub fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?.with_verbose(cli.verbose);
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Commands::Serve {
        listen: Some(listen),
    } = &cli.command
    {
        config = config.with_listen(listen.clone());
    }
    Ok(config)
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let state = app::initialize_app(&config).await?;

    match cli.command {
        Commands::Serve { .. } => {
            let listener = TcpListener::bind(&config.listen)
                .await
                .with_context(|| format!("Failed to bind {}", config.listen))?;
            server::serve(listener, state).await
        }
        Commands::Run { mode } => {
            let modes = match mode {
                Some(mode) => vec![mode],
                None => Mode::ALL.to_vec(),
            };
            for mode in modes {
                run_mode(&state, mode).await?;
            }
            Ok(())
        }
    }
}

async fn run_mode(state: &AppState, mode: Mode) -> Result<()> {
    for operation in Operation::ALL {
        let envelope = server::execute(state, mode, operation).await;
        println!(
            "/v1/couch/{}/{}\n{}",
            mode,
            operation.path_segment(),
            serde_json::to_string_pretty(&envelope)?
        );
    }
    Ok(())
}
