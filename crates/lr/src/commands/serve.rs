//! `lr serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use lr_config::{CliSettings, Config};
use lr_server::{run_server, server_config_from_lr_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover lr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to watch and serve (overrides config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Debounce window in milliseconds (overrides config).
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Enable verbose output (log every change and broadcast).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(path = ?config.config_path, "Configuration loaded");

        let url = format!("http://{}:{}", config.server.host, config.server.port);
        output.highlight(&format!("Serving {url}"));
        output.info(&format!("Watching: {}", config.watch_resolved.root.display()));
        output.info(&format!(
            "Live reload: {} (debounce {}ms)",
            config.live_reload.endpoint, config.live_reload.debounce_ms
        ));
        output.info(r#"Add <script src="/lr-client.js"></script> to pages to reload them"#);

        run_server(server_config_from_lr_config(&config)).await?;

        Ok(())
    }

    /// CLI overrides applied on top of the loaded configuration.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            port: self.port,
            root: self.root.clone(),
            debounce_ms: self.debounce_ms,
        }
    }
}
