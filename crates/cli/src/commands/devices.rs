//! Manual push device sweep.

use std::sync::Arc;

use chrono::Utc;

use plateful_admin::db::PgDeviceStore;
use plateful_admin::push::{NotificationService, SweepReport};

use super::{CommandError, connect};

/// Run the stale-device sweep once, as the daily job does.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the restaurant list
/// cannot be read. Per-restaurant failures are part of the report.
pub async fn sweep() -> Result<SweepReport, CommandError> {
    let pool = connect().await?;

    // Sweeping needs no push transport.
    let service = NotificationService::new(Arc::new(PgDeviceStore::new(pool)), None, "");
    let report = service.sweep_stale_devices(Utc::now()).await?;

    for failure in &report.failures {
        tracing::warn!(
            restaurant_id = %failure.restaurant_id,
            error = %failure.error,
            "Sweep failed for restaurant"
        );
    }
    Ok(report)
}
