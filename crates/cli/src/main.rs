mod ask_commands;
mod config_commands;
mod run_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    onika_config::OnikaConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "onika", about = "ÖNIKA LI: Telegram assistant with LLM failover", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/onika/).
    #[arg(long, global = true, env = "ONIKA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind the HTTP server to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Long-poll Telegram and serve health endpoints (default).
    Poll,
    /// Serve the webhook intake and health endpoints.
    Gateway {
        /// Register `telegram.webhook_url` with Telegram before serving.
        #[arg(long)]
        register: bool,
    },
    /// Point Telegram at a webhook URL and print the registration.
    SetWebhook {
        /// Public URL; defaults to `telegram.webhook_url`.
        url: Option<String>,
    },
    /// Generate an article from a topic and print it.
    Generate {
        /// Topic; empty uses the persona's default topic.
        #[arg(default_value = "")]
        topic: String,
    },
    /// Run a web search and print the results.
    Search { query: String },
    /// Print backend availability and the failover order.
    Status,
    /// Validate the configuration and report errors and warnings.
    CheckConfig,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Explicit `--config` must load; discovery falls back to defaults.
fn load_config(cli: &Cli) -> anyhow::Result<OnikaConfig> {
    let mut config = match cli.config {
        Some(ref path) => onika_config::load_config(path)?,
        None => onika_config::discover_and_load(),
    };
    if let Some(ref bind) = cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "onika starting");

    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Poll) => run_commands::poll(config).await,
        Some(Commands::Gateway { register }) => run_commands::gateway(config, register).await,
        Some(Commands::SetWebhook { url }) => run_commands::set_webhook(&config, url).await,
        Some(Commands::Generate { topic }) => ask_commands::generate(&config, &topic).await,
        Some(Commands::Search { query }) => ask_commands::search(&config, &query).await,
        Some(Commands::Status) => ask_commands::status(&config),
        Some(Commands::CheckConfig) => config_commands::check(&config, cli.config.as_deref()),
    }
}
