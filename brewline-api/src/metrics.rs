use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::{error::AppError, state::AppState};

pub struct Metrics {
    registry: Registry,
    pub orders_placed: IntCounter,
    /// Labelled by rejection kind, e.g. `insufficient_stock`
    pub orders_rejected: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("orders_placed_total", "Orders committed")?;
        let orders_rejected = IntCounterVec::new(
            Opts::new("orders_rejected_total", "Order placements that did not commit"),
            &["kind"],
        )?;

        registry.register(Box::new(orders_placed.clone()))?;
        registry.register(Box::new(orders_rejected.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            orders_rejected,
        })
    }

    pub fn render(&self) -> Result<String, AppError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| AppError::InternalServerError(e.to_string()))
    }
}

pub async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
