//! Background jobs run by the admin binary.
//!
//! - `new_orders` - push fan-out for every inserted order (`LISTEN order_created`)
//! - `cleanup` - daily stale-device sweep at a fixed UTC hour

pub mod cleanup;
pub mod new_orders;

pub use cleanup::{next_run_after, run_cleanup_scheduler};
pub use new_orders::{
    MAX_CONCURRENT_FAN_OUTS, ORDER_CREATED_CHANNEL, dispatch_new_orders, notify_new_order,
    run_new_order_notifier,
};
