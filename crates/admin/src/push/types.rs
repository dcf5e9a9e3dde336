//! Push notification types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plateful_core::order::FieldError;
use plateful_core::{Email, RestaurantId, UserId};

/// Longest token accepted at registration. FCM tokens are ~160 chars.
pub const MAX_TOKEN_LENGTH: usize = 4096;

/// A registered push delivery address for one browser installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub restaurant_id: RestaurantId,
    pub token: String,
    pub user_id: UserId,
    pub user_email: Email,
    pub platform: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub deleted: bool,
}

/// Raw `devices` row, validated into a [`Device`] with `TryFrom`.
#[derive(Debug, sqlx::FromRow)]
pub struct DeviceRow {
    pub restaurant_id: String,
    pub token: String,
    pub user_id: String,
    pub user_email: String,
    pub platform: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub deleted: bool,
}

impl TryFrom<DeviceRow> for Device {
    type Error = String;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        if row.token.is_empty() {
            return Err("device has an empty token".to_string());
        }
        Ok(Self {
            restaurant_id: RestaurantId::try_from(row.restaurant_id).map_err(|e| e.to_string())?,
            token: row.token,
            user_id: UserId::try_from(row.user_id).map_err(|e| e.to_string())?,
            user_email: Email::parse(&row.user_email).map_err(|e| e.to_string())?,
            platform: row.platform,
            user_agent: row.user_agent,
            created_at: row.created_at,
            last_used: row.last_used,
            deleted: row.deleted,
        })
    }
}

/// `POST /restaurants/{id}/devices` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// A validated device registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegistration {
    pub token: String,
    pub user_id: UserId,
    pub user_email: Email,
    pub platform: String,
    pub user_agent: String,
}

impl RegisterDeviceRequest {
    /// Validate the registration body.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per invalid field.
    pub fn validate(self) -> Result<DeviceRegistration, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut invalid = |field: &'static str, message: String| {
            errors.push(FieldError { field, message });
        };

        let token = self.token.trim().to_owned();
        if token.is_empty() {
            invalid("token", "token is required".to_string());
        } else if token.len() > MAX_TOKEN_LENGTH {
            invalid("token", format!("token exceeds {MAX_TOKEN_LENGTH} characters"));
        }
        let user_id = UserId::parse(&self.user_id)
            .inspect_err(|e| invalid("userId", e.to_string()))
            .ok();
        let user_email = Email::parse(&self.user_email)
            .inspect_err(|e| invalid("userEmail", e.to_string()))
            .ok();

        match (user_id, user_email) {
            (Some(user_id), Some(user_email)) if errors.is_empty() => Ok(DeviceRegistration {
                token,
                user_id,
                user_email,
                platform: self
                    .platform
                    .map(|p| p.trim().to_owned())
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| "web".to_string()),
                user_agent: self.user_agent.unwrap_or_default(),
            }),
            _ => Err(errors),
        }
    }
}

/// One notification to deliver to many devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Structured payload; FCM requires every value to be a string.
    pub data: BTreeMap<String, String>,
    /// Page opened when the notification is clicked.
    pub link: String,
    pub sound: Option<String>,
}

/// Why delivery to one token failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The token is no longer registered with FCM.
    Unregistered,
    /// The token is malformed or belongs to another project.
    InvalidArgument,
    /// Transient or unclassified failure; the token is kept.
    Other(String),
}

impl DeliveryFailure {
    /// Whether the token can never succeed again and should be pruned.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Unregistered | Self::InvalidArgument)
    }
}

/// Per-token result of a multicast dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub token: String,
    pub result: Result<(), DeliveryFailure>,
}

impl SendOutcome {
    #[must_use]
    pub fn delivered(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            result: Ok(()),
        }
    }

    #[must_use]
    pub fn failed(token: impl Into<String>, failure: DeliveryFailure) -> Self {
        Self {
            token: token.into(),
            result: Err(failure),
        }
    }
}

/// Counts reported after a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutSummary {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub pruned: usize,
}

/// A restaurant whose sweep failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    pub restaurant_id: RestaurantId,
    pub error: String,
}

/// Result of a stale-device sweep across all restaurants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub deleted: u64,
    pub failures: Vec<SweepFailure>,
}

/// `GET /api/push/config` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushClientConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vapid_public_key: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> RegisterDeviceRequest {
        RegisterDeviceRequest {
            token: " fcm-token-1 ".into(),
            user_id: "user-1".into(),
            user_email: "owner@thaigarden.com".into(),
            platform: None,
            user_agent: Some("Mozilla/5.0".into()),
        }
    }

    #[test]
    fn test_registration_defaults_platform_to_web() {
        let registration = request().validate().unwrap();
        assert_eq!(registration.token, "fcm-token-1");
        assert_eq!(registration.platform, "web");
        assert_eq!(registration.user_agent, "Mozilla/5.0");
    }

    #[test]
    fn test_registration_reports_every_field() {
        let errors = RegisterDeviceRequest::default().validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["token", "userId", "userEmail"]);
    }

    #[test]
    fn test_only_unregistered_and_invalid_are_permanent() {
        assert!(DeliveryFailure::Unregistered.is_permanent());
        assert!(DeliveryFailure::InvalidArgument.is_permanent());
        assert!(!DeliveryFailure::Other("UNAVAILABLE".into()).is_permanent());
    }

    #[test]
    fn test_disabled_config_omits_key() {
        let json = serde_json::to_value(PushClientConfig {
            enabled: false,
            vapid_public_key: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "enabled": false }));
    }
}
