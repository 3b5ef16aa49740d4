use std::sync::Arc;

use brewline_catalog::PricingEngine;
use brewline_core::{OrderStore, SessionStore};
use brewline_order::{OrderManager, PlacementEngine};
use brewline_store::app_config::Config;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
}

#[derive(Clone)]
pub struct AppState {
    pub placement: Arc<PlacementEngine>,
    pub orders: Arc<OrderManager>,
    pub metrics: Arc<Metrics>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OrderStore>,
        sessions: Arc<dyn SessionStore>,
        config: &Config,
    ) -> Result<Self, prometheus::Error> {
        let placement = PlacementEngine::new(store.clone(), PricingEngine::new(config.pricing.clone()))
            .with_timeout(config.orders.placement_timeout());
        let orders = OrderManager::new(store, sessions).with_page_size(config.orders.page_size);

        Ok(Self {
            placement: Arc::new(placement),
            orders: Arc::new(orders),
            metrics: Arc::new(Metrics::new()?),
            auth: AuthConfig {
                secret: config.auth.jwt_secret.clone(),
                issuer: config.auth.jwt_issuer.clone(),
            },
        })
    }
}
