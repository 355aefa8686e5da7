//! Remote actuation dispatch
//!
//! Sends one control command per scheduled event to the OpenShock API.
//! Delivery is best effort: every outcome is reported as a [`DispatchOutcome`]
//! for logging and is never turned into an error for the caller.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::Options;
use crate::schedule::ActuationKind;

pub const DEFAULT_API_URL: &str = "https://api.shocklink.net/2/shockers/control";
pub const DEFAULT_LABEL: &str = "ImmersiveASMR";

/// Result of a single dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The service accepted the command
    Sent,
    /// No credentials configured; nothing was sent
    Disabled,
    /// The service answered with a non-success status
    Rejected(u16),
    /// The request never produced a response
    Failed(String),
}

/// Something that can deliver an actuation command
#[cfg_attr(test, mockall::automock)]
pub trait Actuator {
    fn dispatch(&self, intensity: u8, duration_ms: u32, kind: ActuationKind) -> DispatchOutcome;
}

/// Credentials for the actuation service
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub device_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &mask_secret(&self.token))
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Replace every character of a secret with `*`
pub fn mask_secret(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

#[derive(Debug, Serialize)]
struct ControlRequest<'a> {
    shocks: [ShockerControl<'a>; 1],
    #[serde(rename = "customName")]
    custom_name: &'a str,
}

#[derive(Debug, Serialize)]
struct ShockerControl<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    intensity: u8,
    duration: u32,
}

/// HTTP dispatcher for the OpenShock control endpoint
#[derive(Debug)]
pub struct OpenShockDispatcher {
    credentials: Option<Credentials>,
    client: Option<Client>,
    url: String,
    label: String,
}

impl OpenShockDispatcher {
    /// Create a dispatcher. `None` credentials yield a disabled dispatcher.
    pub fn new(credentials: Option<Credentials>, url: &str, label: &str) -> Self {
        let client = match &credentials {
            Some(_) => match Client::builder().build() {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::error!("Failed to build HTTP client: {}", e);
                    None
                }
            },
            None => None,
        };

        OpenShockDispatcher {
            credentials,
            client,
            url: url.to_string(),
            label: label.to_string(),
        }
    }

    /// Create a dispatcher from loaded options
    pub fn from_options(opts: &Options) -> Self {
        let credentials = match (&opts.api_token, &opts.device_id) {
            (Some(token), Some(device_id)) if opts.actuation_enabled => Some(Credentials {
                token: token.clone(),
                device_id: device_id.clone(),
            }),
            _ => None,
        };

        if credentials.is_none() {
            tracing::warn!("API key or Shock ID not found. OpenShock features will be disabled.");
        }

        Self::new(credentials, &opts.api_url, &opts.label)
    }

    /// Dispatch is live only with credentials and a working client
    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some() && self.client.is_some()
    }

    fn request_body(&self, device_id: &str, intensity: u8, duration_ms: u32, kind: ActuationKind) -> serde_json::Value {
        let request = ControlRequest {
            shocks: [ShockerControl {
                id: device_id,
                kind: kind.as_str(),
                intensity,
                duration: duration_ms,
            }],
            custom_name: &self.label,
        };
        serde_json::to_value(&request).unwrap_or(serde_json::Value::Null)
    }
}

impl Actuator for OpenShockDispatcher {
    fn dispatch(&self, intensity: u8, duration_ms: u32, kind: ActuationKind) -> DispatchOutcome {
        let (Some(credentials), Some(client)) = (&self.credentials, &self.client) else {
            tracing::warn!("OpenShock API key or Shock ID not set. Skipping {}.", kind.as_str().to_lowercase());
            return DispatchOutcome::Disabled;
        };

        tracing::info!(
            "Attempting to send {} with intensity: {} and duration: {} milliseconds",
            kind.as_str().to_lowercase(),
            intensity,
            duration_ms
        );

        let body = self.request_body(&credentials.device_id, intensity, duration_ms, kind);
        let response = client
            .post(&self.url)
            .header("accept", "application/json")
            .header("OpenShockToken", &credentials.token)
            .json(&body)
            .send();

        match response {
            Ok(response) => {
                let status = response.status();
                let text = response.text().unwrap_or_default();
                tracing::debug!("API Response: {} - {}", status.as_u16(), text);

                if status == StatusCode::OK {
                    tracing::info!("{} sent successfully.", kind);
                    DispatchOutcome::Sent
                } else {
                    tracing::error!(
                        "Failed to send {}. Status code: {}",
                        kind.as_str().to_lowercase(),
                        status.as_u16()
                    );
                    DispatchOutcome::Rejected(status.as_u16())
                }
            }
            Err(e) => {
                tracing::error!("Error sending request to OpenShock API: {}", e);
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}
