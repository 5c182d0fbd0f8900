use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rail_gateway::config::Config;
use rail_gateway::darwin::DarwinClient;
use rail_gateway::stations::{StationClient, StationNames};
use rail_gateway::web::{AppState, create_router};

/// How often to refresh station names (24 hours).
const STATION_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rail_gateway=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let mut darwin = DarwinClient::new(config.darwin)?;
    if let Some(staff) = config.staff {
        darwin = darwin.with_staff(staff)?;
    } else {
        info!("DARWIN_STAFF_API_KEY not set, RID lookups disabled");
    }
    let darwin = Arc::new(darwin);

    // Station names load in the background; lookups report "not ready" until then
    let stations = StationNames::new(StationClient::new(config.stations)?);
    stations.spawn_refresh(STATION_REFRESH_INTERVAL);

    let mut state = AppState::new(darwin.clone(), darwin.clone(), darwin, stations)
        .with_delay_threshold(config.delay_threshold_minutes);
    if let Some(token) = config.client_access_token {
        info!("client access token required to use the configured keys");
        state = state.with_client_token(token);
    }
    info!(
        threshold_minutes = config.delay_threshold_minutes,
        "delay threshold"
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "rail gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
