use std::net::SocketAddr;
use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use anyhow::anyhow;

use voice_relay::{
    ServerConfig,
    core::telephony::CallRequest,
    routes,
    state::AppState,
};

/// Voice Relay - bridges phone calls to a realtime AI voice assistant
#[derive(Parser, Debug)]
#[command(name = "voice-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Port to listen on (overrides configuration)
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },

    /// Place an outbound call bridged to the AI assistant
    Call {
        /// Destination number (defaults to TO_PHONE_NUMBER)
        to: Option<String>,

        /// Caller number (defaults to TWILIO_PHONE_NUMBER)
        from: Option<String>,

        /// Public base URL of the relay server (defaults to PUBLIC_URL)
        #[arg(long = "server-url")]
        server_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file or environment
    let mut config = if let Some(config_path) = &cli.config {
        println!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        Commands::Call {
            to,
            from,
            server_url,
        } => {
            if let Some(server_url) = server_url {
                config.public_url = Some(server_url.trim_end_matches('/').to_string());
            }
            place_call(config, to, from).await
        }
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    // Credentials are a startup precondition, not a per-call failure
    config.realtime_config().map_err(|e| anyhow!(e))?;

    let address = config.address();
    let tls_config = config.tls.clone();
    println!("Starting server on {address}");

    let app_state = AppState::new(config);
    let app = routes::create_app(app_state);

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    // Start server with or without TLS
    if let Some(tls) = tls_config {
        // Load TLS configuration from certificate and key files
        let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to load TLS certificates from {} and {}: {}",
                    tls.cert_path.display(),
                    tls.key_path.display(),
                    e
                )
            })?;

        info!("Server listening on https://{} (TLS enabled)", socket_addr);

        axum_server::bind_rustls(socket_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|e| anyhow!("TLS server error: {}", e))?;
    } else {
        info!("Server listening on http://{}", socket_addr);

        let listener = TcpListener::bind(&socket_addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}

async fn place_call(
    config: ServerConfig,
    to: Option<String>,
    from: Option<String>,
) -> anyhow::Result<()> {
    let to = to
        .or_else(|| config.default_to_number.clone())
        .ok_or_else(|| anyhow!("No destination number given and TO_PHONE_NUMBER is not set"))?;
    let from = from
        .or_else(|| config.twilio_phone_number.clone())
        .ok_or_else(|| anyhow!("No caller number given and TWILIO_PHONE_NUMBER is not set"))?;
    let url = config
        .incoming_call_url()
        .ok_or_else(|| anyhow!("No server URL given and PUBLIC_URL is not set"))?;

    let client = config.twilio_client()?;
    let record = client.place_call(&CallRequest { to, from, url }).await?;

    println!("Call SID: {}", record.sid);
    println!("Status:   {}", record.status.as_deref().unwrap_or("unknown"));
    println!("From:     {}", record.from.as_deref().unwrap_or("-"));
    println!("To:       {}", record.to.as_deref().unwrap_or("-"));

    Ok(())
}
