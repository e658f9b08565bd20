use anyhow::{Context, Result};

use crate::config::Config;
use crate::server::ValidationServer;

/// Run the validation HTTP server
pub async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    let server = ValidationServer::new(config).context("Failed to create validation server")?;
    server.serve().await.context("Server terminated")?;

    Ok(())
}
