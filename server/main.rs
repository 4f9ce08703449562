//! Optic HTTP API.
//!
//! Serves `POST /predict` (and `/api/predict`) plus liveness routes on a
//! synchronous tiny_http server, one thread per request. The model backend
//! and bind address come from the environment; see `optic::Config`.
//!
//! Run with:
//!   OPTIC_MODEL_PATH=model.json cargo run --bin server --release

mod handlers;
mod routes;
mod state;
mod util;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tiny_http::Server;

use optic::{classifier, Config};
use state::AppState;

fn main() -> Result<()> {
    optic::logging::init();
    let config = Config::from_env()?;

    let model = Arc::new(classifier::from_config(&config));
    let state = Arc::new(AppState::new(model));

    // Load in the background; requests arriving before it finishes get 503.
    if let Some(model) = state.model.clone() {
        std::thread::spawn(move || model.warm());
    }

    let server = Server::http(&config.bind_addr)
        .map_err(|e| anyhow!("failed to bind {}: {}", config.bind_addr, e))?;
    log::info!("Optic API listening on http://{}", config.bind_addr);

    for request in server.incoming_requests() {
        let state = state.clone();
        std::thread::spawn(move || routes::dispatch(request, state));
    }
    Ok(())
}
