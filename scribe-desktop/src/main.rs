//! Scribe Desktop: terminal host for a collaborative editing session.
//!
//! Reads the room and user from a query string, the public key from the
//! environment, and prints the session surface whenever it changes.

mod host;

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use scribe_collab::{ClientConfig, RoomBackend, SharedTextEditor};
use scribe_session::{Credential, QueryParams, SessionBootstrap};

use host::Host;

#[derive(Debug, Parser)]
#[command(name = "scribe-desktop", version, about = "Join a collaborative editing room")]
struct Cli {
    /// Page URL or query string carrying `roomId` and `userName`
    #[arg(long, default_value = "")]
    query: String,

    /// Public API key (starts with pk_)
    #[arg(long, env = "SCRIBE_PUBLIC_KEY", default_value = "", hide_env_values = true)]
    public_key: String,

    /// Room server WebSocket endpoint
    #[arg(long, env = "SCRIBE_ENDPOINT", default_value = "ws://127.0.0.1:9090")]
    endpoint: String,

    /// Minimum interval between presence updates
    #[arg(long, default_value_t = 100)]
    throttle_ms: u64,

    #[arg(long, default_value_t = 10)]
    connect_timeout_secs: u64,

    /// Text to append to the shared document once connected
    #[arg(long)]
    append: Option<String>,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            throttle: Duration::from_millis(self.throttle_ms),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ..ClientConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let bootstrap = SessionBootstrap::new(
        Credential::new(cli.public_key.as_str()),
        QueryParams::parse(&cli.query),
        RoomBackend::new(cli.client_config()),
        SharedTextEditor::new(),
    );
    let mut host = Host::new(bootstrap, cli.append, io::stdout());

    match host.run().await {
        Ok(surface) if surface.is_error() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Failed to write output: {e}");
            ExitCode::FAILURE
        }
    }
}
