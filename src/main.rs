use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "bojang",
    version,
    about = "Korean insurance report extraction and LLM validation service",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the validation HTTP server
    Serve {
        /// Bind host (overrides BOJANG_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides BOJANG_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate a single report PDF
    Validate {
        /// Report PDF to validate
        file: PathBuf,

        /// Draft record JSON from the heuristic parser
        #[arg(short, long)]
        draft: Option<PathBuf>,

        /// Backend selector (auto, gemini, openai, claude)
        #[arg(short, long, default_value = "auto")]
        backend: String,

        /// Request chunked parallel processing for large documents
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// As-of date for payment-status arithmetic (YYYY-MM-DD, default today)
        #[arg(long)]
        as_of: Option<String>,

        /// Write the validated record to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Serve { host, port } => {
            tracing::info!(host = ?host, port = ?port, "Starting serve command");
            bojang::commands::serve(host, port).await?;
        }

        Commands::Validate {
            file,
            draft,
            backend,
            parallel,
            as_of,
            output,
        } => {
            tracing::info!(
                file = %file.display(),
                backend = %backend,
                parallel = %parallel,
                "Starting validate command"
            );
            bojang::commands::validate(file, draft, backend, parallel, as_of, output).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("bojang=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("bojang=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}
