use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::{AppConfig, OrderPolicy},
    notify::Notifier,
    services::auth_service::AdminGate,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub gate: Arc<AdminGate>,
    pub notifier: Notifier,
    pub orders: OrderPolicy,
}

impl AppState {
    pub fn from_config(orm: DatabaseConnection, config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            orm,
            gate: Arc::new(AdminGate::new(&config.admin)?),
            notifier: Notifier::new(config.contact_webhook_url.clone())?,
            orders: config.orders,
        })
    }
}
