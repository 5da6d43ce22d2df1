mod config;
mod cycle;
mod error;
mod game;
mod network;
mod protocol;

use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use crate::config::{Profile, Settings};
use crate::cycle::CycleController;
use crate::network::http_api::{HttpComboFeed, HttpGameClient};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };

    let profile = match Profile::load(&settings.profile_dir, settings.profile.as_deref()) {
        Ok(profile) => profile,
        Err(e) => {
            error!("Failed to load profile: {}", e);
            std::process::exit(1);
        }
    };

    let client = match HttpGameClient::new(&settings.api_base_url, &profile) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create game client: {}", e);
            std::process::exit(1);
        }
    };
    let feed = HttpComboFeed::new(settings.daily_json_url.clone());

    let span = info_span!("account", name = %profile.name);
    let mut controller = CycleController::new(client, feed, settings);

    info!(parent: &span, "Starting autopilot");
    tokio::select! {
        result = controller.run().instrument(span.clone()) => {
            let Err(e) = result;
            error!(parent: &span, "Stopped: {}", e);
            std::process::exit(2);
        }
        _ = tokio::signal::ctrl_c() => {
            info!(parent: &span, "Shutting down");
        }
    }
}
