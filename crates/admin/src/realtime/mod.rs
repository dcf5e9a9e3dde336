//! Realtime order board synchronisation.
//!
//! An [`OrderFeed`] yields full snapshots of one restaurant's orders. The
//! adapter spawned by [`SyncAdapter::start`] turns those snapshots into
//! [`SyncEvent`]s: the snapshot itself, a transient new-order alert, and a
//! sticky error that ends the subscription. Dropping the returned
//! [`SyncHandle`] stops the task and releases the listener connection.

mod adapter;
mod arrivals;
mod feed;

pub use adapter::{
    ALERT_DURATION, PlatformNotifier, SyncAdapter, SyncControl, SyncEvent, SyncHandle,
};
pub use arrivals::ArrivalTracker;
pub use feed::{ORDER_CHANGES_CHANNEL, OrderFeed, PgOrderFeed, SnapshotStream, SyncError};
