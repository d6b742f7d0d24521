use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bitcake_agent::agent::{AgentRuntime, AgentScheduler};
use bitcake_agent::config::Config;
use bitcake_agent::llm::OpenAiClient;
use bitcake_agent::skills::builtin::predefined_skills;
use bitcake_agent::transmission::TransmissionClient;

fn print_help() {
    println!(
        "\
bitcake-agent v{}

An AI assistant that manages a Transmission torrent client.

USAGE:
    bitcake-agent [OPTIONS] [CONFIG_PATH]

ARGUMENTS:
    CONFIG_PATH    Path to TOML configuration file [default: config/agent.toml]

OPTIONS:
    -h, --help       Print this help message and exit
    -V, --version    Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG                 Log level filter for tracing
                             (e.g. debug, bitcake_agent=debug,warn)
    OPENAI_API_KEY           API key for the chat-completions endpoint
    TRANSMISSION_PASSWORD    Password for the Transmission RPC

EXAMPLES:
    bitcake-agent                              # uses config/agent.toml
    bitcake-agent /etc/bitcake/agent.toml      # custom config path
    RUST_LOG=debug bitcake-agent               # with debug logging",
        env!("CARGO_PKG_VERSION"),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("bitcake-agent v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => config_path = Some(arg),
        }
    }

    // Logs go to stderr so stdout stays the conversation
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bitcake_agent=info")),
        )
        .init();

    println!(
        r#"
   ___  _ _    ___      _
  | _ )(_) |_ / __|__ _| |_____
  | _ \| |  _| (__/ _` | / / -_)
  |___/|_|\__|\___\__,_|_\_\___|   v{}
"#,
        env!("CARGO_PKG_VERSION")
    );

    let config_path = config_path.unwrap_or_else(|| "config/agent.toml".to_string());
    info!("Loading configuration from {config_path}");
    let config = Config::load(&config_path)?;

    if !config.ai.is_configured() {
        bail!("AI endpoint and API key must be set in the [ai] section of {config_path}");
    }

    info!(
        "AI: {} (model: {})",
        config.ai.base_url(),
        config.ai.model.as_deref().unwrap_or("server default")
    );
    info!("Transmission: {}", config.transmission.url);

    let llm = Arc::new(OpenAiClient::new(config.ai.clone()));
    let torrents = Arc::new(TransmissionClient::new(config.transmission.clone()));

    let mut scheduler = AgentScheduler::new(llm).with_agent_config(&config.agent);
    scheduler.register_skills(predefined_skills(torrents))?;
    info!("Skills: {} registered", scheduler.skills().len());

    let status = scheduler.test_connection().await;
    if status.success {
        info!("AI connection: {}", status.message);
    } else {
        warn!(
            "AI connection: {} ({})",
            status.message,
            status.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut runtime = AgentRuntime::new(scheduler, config.agent.clone());
    runtime.run().await
}
