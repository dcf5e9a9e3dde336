//! Client-side push setup.
//!
//! The dashboard client runs these steps in order and stops at the first one
//! that does not succeed:
//!
//! 1. the platform must support messaging, else [`PushSetupStatus::Unsupported`];
//! 2. notification permission is requested if undecided; a refusal ends in
//!    [`PushSetupStatus::Denied`];
//! 3. a device token is acquired with the server's VAPID public key;
//! 4. the token is registered with the server, which upserts it.
//!
//! Any failure after permission was granted is [`PushSetupStatus::Error`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use plateful_core::RestaurantId;

use super::types::PushClientConfig;

/// Browser notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// The user has not decided yet.
    Default,
    Granted,
    Denied,
}

/// Final state of a setup attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum PushSetupStatus {
    Unsupported,
    Denied,
    Error(String),
    Granted,
}

/// Why setup failed after permission was granted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("failed to load push config: {0}")]
    Config(String),

    #[error("push notifications are not enabled on the server")]
    Disabled,

    #[error("messaging platform could not issue a token: {0}")]
    Token(String),

    #[error("messaging platform returned an empty token")]
    EmptyToken,

    #[error("failed to register device: {0}")]
    Registration(String),
}

/// A message received while the dashboard is in the foreground.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForegroundMessage {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: std::collections::BTreeMap<String, String>,
}

/// Callback invoked for foreground messages.
pub type ForegroundHandler = Arc<dyn Fn(ForegroundMessage) + Send + Sync>;

/// The device's messaging subsystem.
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    /// Whether push messaging is available at all.
    async fn is_supported(&self) -> bool;

    /// The current permission, without prompting.
    fn permission(&self) -> NotificationPermission;

    /// Prompt the user for permission.
    async fn request_permission(&self) -> NotificationPermission;

    /// Obtain this device's delivery token.
    ///
    /// Failures are reported as [`SetupError::Token`].
    async fn token(&self, vapid_public_key: &str) -> Result<String, SetupError>;

    /// Route foreground messages to `handler`.
    fn set_foreground_handler(&self, handler: ForegroundHandler);
}

/// Who is registering the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceOwner {
    pub user_id: String,
    pub user_email: String,
    pub platform: String,
    pub user_agent: String,
}

/// The server side of setup.
#[async_trait]
pub trait RegistrationBackend: Send + Sync {
    /// Fetch the push configuration (VAPID key).
    async fn config(&self) -> Result<PushClientConfig, SetupError>;

    /// Register a token for a restaurant.
    async fn register(
        &self,
        restaurant_id: &RestaurantId,
        token: &str,
        owner: &DeviceOwner,
    ) -> Result<(), SetupError>;
}

/// Runs the setup steps against a platform and a backend.
pub struct PushSetup<P, B> {
    platform: P,
    backend: B,
    foreground: Option<ForegroundHandler>,
}

impl<P: MessagingPlatform, B: RegistrationBackend> PushSetup<P, B> {
    /// Create a new setup flow.
    pub const fn new(platform: P, backend: B) -> Self {
        Self {
            platform,
            backend,
            foreground: None,
        }
    }

    /// Install `handler` for foreground messages once setup succeeds.
    #[must_use]
    pub fn with_foreground_handler(mut self, handler: ForegroundHandler) -> Self {
        self.foreground = Some(handler);
        self
    }

    /// Run the setup steps for `restaurant_id`.
    #[instrument(skip(self, owner), fields(restaurant_id = %restaurant_id))]
    pub async fn run(&self, restaurant_id: &RestaurantId, owner: &DeviceOwner) -> PushSetupStatus {
        if !self.platform.is_supported().await {
            info!("Push messaging not supported on this platform");
            return PushSetupStatus::Unsupported;
        }

        let permission = match self.platform.permission() {
            NotificationPermission::Default => self.platform.request_permission().await,
            decided => decided,
        };
        if permission != NotificationPermission::Granted {
            info!("Notification permission denied");
            return PushSetupStatus::Denied;
        }

        match self.acquire_and_register(restaurant_id, owner).await {
            Ok(()) => {
                if let Some(handler) = &self.foreground {
                    self.platform.set_foreground_handler(Arc::clone(handler));
                }
                info!("Push notifications enabled");
                PushSetupStatus::Granted
            }
            Err(e) => {
                warn!(error = %e, "Push setup failed");
                PushSetupStatus::Error(e.to_string())
            }
        }
    }

    async fn acquire_and_register(
        &self,
        restaurant_id: &RestaurantId,
        owner: &DeviceOwner,
    ) -> Result<(), SetupError> {
        let config = self.backend.config().await?;
        let vapid_public_key = config
            .vapid_public_key
            .filter(|_| config.enabled)
            .ok_or(SetupError::Disabled)?;

        let token = self.platform.token(&vapid_public_key).await?;
        if token.is_empty() {
            return Err(SetupError::EmptyToken);
        }
        self.backend.register(restaurant_id, &token, owner).await
    }
}

/// [`RegistrationBackend`] talking to the admin HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRegistrationBackend {
    client: Client,
    base_url: String,
}

impl HttpRegistrationBackend {
    /// Create a backend for the dashboard at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    token: &'a str,
    #[serde(flatten)]
    owner: &'a DeviceOwner,
}

#[async_trait]
impl RegistrationBackend for HttpRegistrationBackend {
    async fn config(&self) -> Result<PushClientConfig, SetupError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ConfigBody {
            enabled: bool,
            vapid_public_key: Option<String>,
        }

        let body: ConfigBody = self
            .client
            .get(format!("{}/api/push/config", self.base_url))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SetupError::Config(e.to_string()))?
            .json()
            .await
            .map_err(|e| SetupError::Config(e.to_string()))?;

        Ok(PushClientConfig {
            enabled: body.enabled,
            vapid_public_key: body.vapid_public_key,
        })
    }

    async fn register(
        &self,
        restaurant_id: &RestaurantId,
        token: &str,
        owner: &DeviceOwner,
    ) -> Result<(), SetupError> {
        self.client
            .post(format!(
                "{}/restaurants/{restaurant_id}/devices",
                self.base_url
            ))
            .json(&RegisterBody { token, owner })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SetupError::Registration(e.to_string()))?;
        Ok(())
    }
}
