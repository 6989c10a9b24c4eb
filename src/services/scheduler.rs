use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::services::billing_service::BillingService;

/// Periodically rolls the monthly charge horizon forward so active students
/// always have a full horizon of charges on file.
pub struct HorizonScheduler {
    billing: Arc<BillingService>,
    interval: Duration,
}

impl HorizonScheduler {
    pub fn new(billing: Arc<BillingService>, interval_secs: u64) -> Self {
        Self {
            billing,
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs until the task is aborted. Waits one interval before the first pass.
    pub async fn start(self) {
        info!("Starting horizon scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;
            self.run_once().await;
        }
    }

    pub async fn run_once(&self) {
        let report = self.billing.extend_horizon().await;
        if report.failed > 0 {
            // next pass retries whatever was missed
            tracing::warn!(
                "Horizon refresh finished with {} failure(s) - created: {}, skipped: {}",
                report.failed,
                report.created,
                report.skipped
            );
        } else {
            info!(
                "Horizon refresh completed - created: {}, skipped: {}",
                report.created, report.skipped
            );
        }
    }
}
