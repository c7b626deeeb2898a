mod csv;
mod enrich;
mod health;
mod scan;
mod token;
mod ws;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let jobs = Router::new()
        .route("/jobs/enrich", post(enrich::enrich))
        .route("/jobs/csv", post(csv::import_csv))
        .route("/jobs/scan", post(scan::scan))
        .route("/jobs/token/refresh", post(token::refresh))
        .route_layer(axum::middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            crate::middleware::rate_limit,
        ));

    Router::new()
        .merge(jobs)
        .route("/ws/progress", get(ws::progress))
        .route("/healthz", get(health::healthz))
        .with_state(state)
}
