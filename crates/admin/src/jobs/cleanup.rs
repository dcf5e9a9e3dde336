//! Daily stale-device sweep.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info};

use crate::push::NotificationService;

/// The first `hour:00:00` UTC strictly after `now`.
///
/// Returns `None` if `hour` is not a valid hour of the day.
#[must_use]
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> Option<DateTime<Utc>> {
    let today = now.date_naive().and_hms_opt(hour, 0, 0)?.and_utc();
    if today > now {
        Some(today)
    } else {
        Some(today + TimeDelta::days(1))
    }
}

/// Sweep stale devices once a day at `hour` UTC, forever.
pub async fn run_cleanup_scheduler(notifications: NotificationService, hour: u32) {
    loop {
        let now = Utc::now();
        let Some(next) = next_run_after(now, hour) else {
            error!(hour, "Invalid cleanup hour; device sweep disabled");
            return;
        };
        info!(next_run = %next, "Next device sweep scheduled");
        tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

        match notifications.sweep_stale_devices(Utc::now()).await {
            Ok(report) => info!(
                deleted = report.deleted,
                failures = report.failures.len(),
                "Scheduled device sweep finished"
            ),
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                error!(error = %e, sentry_event_id = %event_id, "Scheduled device sweep failed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, 0).unwrap()
    }

    #[test]
    fn test_later_today() {
        assert_eq!(next_run_after(at(1, 30), 3), Some(at(3, 0)));
    }

    #[test]
    fn test_already_passed_runs_tomorrow() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 15, 3, 0, 0).unwrap();
        assert_eq!(next_run_after(at(3, 0), 3), Some(expected));
        assert_eq!(next_run_after(at(22, 15), 3), Some(expected));
    }

    #[test]
    fn test_invalid_hour() {
        assert_eq!(next_run_after(at(1, 0), 24), None);
    }
}
