use clap::Parser;
use humanizer_relay::{AppState, UpstreamConfig, serve};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "humanizer-relay")]
struct RelayArgs {
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind_address: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = RelayArgs::parse();
    let config = UpstreamConfig::from_env();
    info!(
        "forwarding to {} with model {}",
        config.base_url, config.model
    );

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(err) => {
            error!("failed to initialize relay state: {}", err);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(&args.bind_address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {}: {}", args.bind_address, err);
            std::process::exit(1);
        }
    };

    info!("relay starting on {}", args.bind_address);
    if let Err(err) = serve(listener, state).await {
        warn!("relay server exited: {}", err);
    }
}
