//! Firebase Cloud Messaging HTTP v1 client.
//!
//! FCM v1 has no multicast endpoint, so a multicast is one `messages:send`
//! request per token, issued concurrently. Per-token failures are classified
//! so the caller can prune dead tokens.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::error::PushError;
use super::service::PushTransport;
use super::types::{DeliveryFailure, PushMessage, SendOutcome};
use crate::config::FcmConfig;

/// FCM API base URL.
const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1";

/// FCM HTTP v1 client.
#[derive(Clone)]
pub struct FcmClient {
    client: Client,
    project_id: String,
    access_token: SecretString,
}

impl std::fmt::Debug for FcmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcmClient")
            .field("project_id", &self.project_id)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: WireMessage<'a>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    token: &'a str,
    notification: WireNotification<'a>,
    data: &'a BTreeMap<String, String>,
    webpush: WebpushConfig<'a>,
}

#[derive(Debug, Serialize)]
struct WireNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct WebpushConfig<'a> {
    headers: BTreeMap<&'static str, &'static str>,
    notification: WebpushNotification<'a>,
    fcm_options: WebpushFcmOptions<'a>,
}

#[derive(Debug, Serialize)]
struct WebpushNotification<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    sound: Option<&'a str>,
    #[serde(rename = "requireInteraction")]
    require_interaction: bool,
}

#[derive(Debug, Serialize)]
struct WebpushFcmOptions<'a> {
    link: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Outcome of one `messages:send` request.
enum SendError {
    /// FCM answered and rejected this token.
    Token(DeliveryFailure),
    /// FCM was unreachable or refused the request as a whole.
    Request(String),
}

/// Build the JSON body for one token.
fn request_body<'a>(token: &'a str, message: &'a PushMessage) -> SendRequest<'a> {
    SendRequest {
        message: WireMessage {
            token,
            notification: WireNotification {
                title: &message.title,
                body: &message.body,
            },
            data: &message.data,
            webpush: WebpushConfig {
                headers: BTreeMap::from([("Urgency", "high")]),
                notification: WebpushNotification {
                    sound: message.sound.as_deref(),
                    require_interaction: true,
                },
                fcm_options: WebpushFcmOptions {
                    link: &message.link,
                },
            },
        },
    }
}

/// Whether an `INVALID_ARGUMENT` message is about the token rather than the
/// payload. FCM also uses `INVALID_ARGUMENT` for malformed messages, which
/// would fail for every token alike.
fn names_token(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("registration token") || message.contains("message.token")
}

/// Classify an error response from FCM.
///
/// `UNREGISTERED` and token-level `INVALID_ARGUMENT` are permanent. Auth,
/// quota and payload failures apply to every token and count as request
/// failures; anything else is a transient token failure.
fn classify_error(status: StatusCode, body: &str) -> SendError {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();

    let error_code = parsed.as_ref().and_then(|r| {
        r.error
            .details
            .iter()
            .find_map(|d| d.error_code.clone())
    });
    let (api_status, message) = parsed
        .map(|r| (r.error.status, r.error.message))
        .unwrap_or_default();

    match error_code.as_deref().unwrap_or(api_status.as_str()) {
        "UNREGISTERED" => return SendError::Token(DeliveryFailure::Unregistered),
        "INVALID_ARGUMENT" if names_token(&message) => {
            return SendError::Token(DeliveryFailure::InvalidArgument);
        }
        "INVALID_ARGUMENT" => return SendError::Request(format!("{status}: {message}")),
        _ => {}
    }
    if status == StatusCode::NOT_FOUND {
        return SendError::Token(DeliveryFailure::Unregistered);
    }
    if matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    ) {
        return SendError::Request(format!("{status}: {message}"));
    }

    let reason = error_code.unwrap_or(if api_status.is_empty() {
        status.to_string()
    } else {
        api_status
    });
    SendError::Token(DeliveryFailure::Other(reason))
}

/// Fold per-token results into outcomes, or fail if nothing got through to FCM.
fn collect_outcomes(
    results: Vec<(String, Result<(), SendError>)>,
) -> Result<Vec<SendOutcome>, PushError> {
    let attempted = results.len();
    let request_failures = results
        .iter()
        .filter(|(_, r)| matches!(r, Err(SendError::Request(_))))
        .count();

    if attempted > 0 && request_failures == attempted {
        let reason = results
            .into_iter()
            .find_map(|(_, r)| match r {
                Err(SendError::Request(reason)) => Some(reason),
                _ => None,
            })
            .unwrap_or_default();
        return Err(PushError::DispatchFailed { attempted, reason });
    }

    Ok(results
        .into_iter()
        .map(|(token, result)| match result {
            Ok(()) => SendOutcome::delivered(token),
            Err(SendError::Token(failure)) => SendOutcome::failed(token, failure),
            Err(SendError::Request(reason)) => {
                SendOutcome::failed(token, DeliveryFailure::Other(reason))
            }
        })
        .collect())
}

impl FcmClient {
    /// Create a new FCM client.
    #[must_use]
    pub fn new(config: &FcmConfig) -> Self {
        Self {
            client: Client::new(),
            project_id: config.project_id.clone(),
            access_token: config.access_token.clone(),
        }
    }

    /// Send one message to one token.
    async fn send_one(&self, token: &str, message: &PushMessage) -> Result<(), SendError> {
        let response = self
            .client
            .post(format!(
                "{FCM_API_BASE}/projects/{}/messages:send",
                self.project_id
            ))
            .bearer_auth(self.access_token.expose_secret())
            .json(&request_body(token, message))
            .send()
            .await
            .map_err(|e| SendError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.is_server_error() {
            return Err(SendError::Request(format!("FCM returned {status}")));
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }
}

#[async_trait]
impl PushTransport for FcmClient {
    #[instrument(skip(self, tokens, message), fields(tokens = tokens.len()))]
    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<Vec<SendOutcome>, PushError> {
        let results = join_all(tokens.iter().map(|token| async move {
            (token.clone(), self.send_one(token, message).await)
        }))
        .await;

        let outcomes = collect_outcomes(results)?;
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            warn!(failed, "Some FCM deliveries failed");
        }
        debug!(delivered = outcomes.len() - failed, "FCM multicast complete");
        Ok(outcomes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn message() -> PushMessage {
        PushMessage {
            title: "New Order!".into(),
            body: "Order #A1B2C3D4 • 3 item(s) • $27.50".into(),
            data: BTreeMap::from([("type".to_string(), "new_order".to_string())]),
            link: "https://admin.plateful.app/restaurants/r1/orders".into(),
            sound: Some("default".into()),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let message = message();
        let json = serde_json::to_value(request_body("tok-1", &message)).unwrap();
        let m = &json["message"];
        assert_eq!(m["token"], "tok-1");
        assert_eq!(m["notification"]["title"], "New Order!");
        assert_eq!(m["data"]["type"], "new_order");
        assert_eq!(m["webpush"]["headers"]["Urgency"], "high");
        assert_eq!(m["webpush"]["notification"]["sound"], "default");
        assert_eq!(
            m["webpush"]["fcm_options"]["link"],
            "https://admin.plateful.app/restaurants/r1/orders"
        );
    }

    #[test]
    fn test_classify_unregistered_detail() {
        let body = r#"{"error":{"code":404,"status":"NOT_FOUND","message":"Requested entity was not found.",
            "details":[{"@type":"type.googleapis.com/google.firebase.fcm.v1.FcmError","errorCode":"UNREGISTERED"}]}}"#;
        assert!(matches!(
            classify_error(StatusCode::NOT_FOUND, body),
            SendError::Token(DeliveryFailure::Unregistered)
        ));
    }

    #[test]
    fn test_classify_invalid_token() {
        let body = r#"{"error":{"code":400,"status":"INVALID_ARGUMENT",
            "message":"The registration token is not a valid FCM registration token",
            "details":[{"@type":"type.googleapis.com/google.firebase.fcm.v1.FcmError","errorCode":"INVALID_ARGUMENT"}]}}"#;
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, body),
            SendError::Token(DeliveryFailure::InvalidArgument)
        ));
    }

    #[test]
    fn test_payload_rejection_prunes_nothing() {
        let body = r#"{"error":{"code":400,"status":"INVALID_ARGUMENT",
            "message":"Invalid value at 'message.webpush.fcm_options.link' (TYPE_STRING), must be HTTPS",
            "details":[{"@type":"type.googleapis.com/google.firebase.fcm.v1.FcmError","errorCode":"INVALID_ARGUMENT"}]}}"#;
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, body),
            SendError::Request(_)
        ));

        let results = ["t1", "t2", "t3"]
            .into_iter()
            .map(|t| (t.to_string(), Err(classify_error(StatusCode::BAD_REQUEST, body))))
            .collect();
        assert!(matches!(
            collect_outcomes(results),
            Err(PushError::DispatchFailed { attempted: 3, .. })
        ));
    }

    #[test]
    fn test_partial_payload_rejection_is_transient() {
        let body = r#"{"error":{"code":400,"status":"INVALID_ARGUMENT","message":"Request contains an invalid argument."}}"#;
        let results = vec![
            ("a".to_string(), Ok(())),
            ("b".to_string(), Err(classify_error(StatusCode::BAD_REQUEST, body))),
        ];
        let outcomes = collect_outcomes(results).unwrap();
        let failure = outcomes[1].result.clone().unwrap_err();
        assert!(!failure.is_permanent());
    }

    #[test]
    fn test_classify_auth_failure_as_transport() {
        let body = r#"{"error":{"code":401,"status":"UNAUTHENTICATED","message":"expired"}}"#;
        assert!(matches!(
            classify_error(StatusCode::UNAUTHORIZED, body),
            SendError::Request(_)
        ));
    }

    #[test]
    fn test_classify_unknown_is_transient() {
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, "not json"),
            SendError::Token(DeliveryFailure::Other(_))
        ));
    }

    #[test]
    fn test_all_transport_failures_is_an_error() {
        let results = vec![
            ("a".to_string(), Err(SendError::Request("down".into()))),
            ("b".to_string(), Err(SendError::Request("down".into()))),
        ];
        assert!(matches!(
            collect_outcomes(results),
            Err(PushError::DispatchFailed { attempted: 2, .. })
        ));
    }

    #[test]
    fn test_partial_failure_keeps_successes() {
        let results = vec![
            ("a".to_string(), Ok(())),
            (
                "b".to_string(),
                Err(SendError::Token(DeliveryFailure::Unregistered)),
            ),
            ("c".to_string(), Err(SendError::Request("timeout".into()))),
        ];
        let outcomes = collect_outcomes(results).unwrap();
        assert_eq!(outcomes[0], SendOutcome::delivered("a"));
        assert_eq!(
            outcomes[1],
            SendOutcome::failed("b", DeliveryFailure::Unregistered)
        );
        assert!(matches!(
            outcomes[2].result,
            Err(DeliveryFailure::Other(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = FcmClient::new(&FcmConfig {
            project_id: "plateful".into(),
            access_token: SecretString::from("ya29.secret-value"),
            vapid_public_key: "key".into(),
        });
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-value"));
    }
}
