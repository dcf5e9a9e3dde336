//! Push notifications for restaurant staff.
//!
//! Provides device registration, new-order fan-out via FCM with pruning of
//! dead tokens, the daily stale-device sweep, and the client setup protocol.

mod error;
mod fcm;
mod payload;
mod service;
pub mod setup;
mod types;

pub use error::PushError;
pub use fcm::FcmClient;
pub use payload::{NEW_ORDER_TITLE, dashboard_link, new_order_message};
pub use service::{DeviceStore, NotificationService, PushTransport, STALE_AFTER_DAYS};
pub use types::{
    DeliveryFailure, Device, DeviceRegistration, DeviceRow, FanOutSummary, PushClientConfig,
    PushMessage, RegisterDeviceRequest, SendOutcome, SweepFailure, SweepReport,
};

#[cfg(test)]
pub(crate) use service::tests as fakes;
