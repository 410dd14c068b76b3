use crate::consumer::{HandlerError, MessageHandler};
use crate::models::RefinedReportEvent;
use crate::store::ReportStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Folds refined readings into per-vehicle fuel aggregates.
pub struct ReportHandler {
    reports: Arc<dyn ReportStore>,
}

impl ReportHandler {
    pub fn new(reports: Arc<dyn ReportStore>) -> Self {
        Self { reports }
    }
}

#[async_trait]
impl MessageHandler for ReportHandler {
    type Event = RefinedReportEvent;

    fn kind(&self) -> &'static str {
        "report"
    }

    async fn handle(&self, event: RefinedReportEvent) -> Result<(), HandlerError> {
        let applied = self.reports.apply(&event).await.map_err(HandlerError::new)?;
        if applied {
            info!(
                fuel_log_id = %event.fuel_log_id,
                vehicle_id = %event.vehicle_id,
                "Report aggregated"
            );
        } else {
            debug!(fuel_log_id = %event.fuel_log_id, "Report already aggregated");
        }
        Ok(())
    }
}
