use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use menu::catalog::Catalog;
use menu::orders::Order;
use tracing::info;
use uuid::Uuid;

use super::{config::Config, registry::Registry};

pub struct AppState {
    pub config: Config,
    pub catalog: Catalog,
    pub registry: Registry,
    pub orders: Mutex<HashMap<Uuid, Order>>,
    pub coupons: HashMap<String, i64>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let catalog = if let Some(url) = &config.menu_url {
            Catalog::load_remote(url).await.expect("Menu misconfigured!")
        } else if let Some(path) = &config.menu_path {
            Catalog::load_file(path).expect("Menu misconfigured!")
        } else {
            Catalog::sample()
        };

        info!(products = catalog.len(), "Catalog loaded");

        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(config: Config, catalog: Catalog) -> Arc<Self> {
        Arc::new(Self {
            config,
            catalog,
            registry: Registry::new(),
            orders: Mutex::new(HashMap::new()),
            coupons: default_coupons(),
        })
    }
}

// Boundary stand-in for the coupon table; eligibility rules beyond
// existence live with the collaborator that owns coupons.
fn default_coupons() -> HashMap<String, i64> {
    HashMap::from([
        ("welcome10".to_string(), 1000),
        ("freeship".to_string(), 500),
    ])
}
