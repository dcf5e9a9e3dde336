//! Order lifecycle status and its transition rules.
//!
//! ```text
//! pending → confirmed → preparing → ready → delivering → delivered
//!    │          │           │         │          │
//!    └──────────┴───────────┴─────────┴──────────┴──→ cancelled
//! ```
//!
//! The restaurant dashboard only ever offers one forward step per order
//! ([`OrderStatus::admin_next`]). That table skips `confirmed`, which stays a
//! valid state reachable through the strict lifecycle step.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivering,
    Delivered,
    Cancelled,
}

/// Errors produced when a status transition is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The order is already in a terminal state.
    #[error("order is already {from} and cannot change")]
    Terminal {
        /// Current status.
        from: OrderStatus,
    },
    /// The target is not a legal successor of the current status.
    #[error("cannot move order from {from} to {to}")]
    NotAllowed {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Delivering,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Statuses that get a column on the order board (everything but `cancelled`).
    pub const BOARD_COLUMNS: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Delivering,
        Self::Delivered,
    ];

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Delivering => "delivering",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label for dashboards.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Preparing => "Preparing",
            Self::Ready => "Ready",
            Self::Delivering => "Out for delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The next status in strict lifecycle order.
    #[must_use]
    pub const fn lifecycle_next(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Delivering),
            Self::Delivering => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// The single forward transition the dashboard offers for this status.
    #[must_use]
    pub const fn admin_next(&self) -> Option<Self> {
        match self {
            Self::Pending | Self::Confirmed => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Delivering),
            Self::Delivering => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Label for the dashboard button that applies [`Self::admin_next`].
    #[must_use]
    pub const fn admin_action_label(&self) -> Option<&'static str> {
        match self {
            Self::Pending | Self::Confirmed => Some("Start preparing"),
            Self::Preparing => Some("Mark ready"),
            Self::Ready => Some("Out for delivery"),
            Self::Delivering => Some("Mark delivered"),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Check whether moving to `target` is a legal transition.
    ///
    /// Legal targets are the dashboard successor, the strict lifecycle
    /// successor, and `cancelled` from any non-terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Terminal`] if the current status is
    /// terminal, or [`TransitionError::NotAllowed`] for any other target.
    pub fn check_transition(self, target: Self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal { from: self });
        }
        if target == Self::Cancelled
            || Some(target) == self.admin_next()
            || Some(target) == self.lifecycle_next()
        {
            return Ok(());
        }
        Err(TransitionError::NotAllowed {
            from: self,
            to: target,
        })
    }

    /// Apply a transition, returning the new status.
    ///
    /// # Errors
    ///
    /// See [`Self::check_transition`].
    pub fn transition_to(self, target: Self) -> Result<Self, TransitionError> {
        self.check_transition(target)?;
        Ok(target)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}
