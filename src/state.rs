use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::BillingStore;
use crate::services::BillingService;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: Arc<dyn BillingStore>,
    pub billing: Arc<BillingService>,
}
