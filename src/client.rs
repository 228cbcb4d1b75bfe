//! HTTP client for the YoLink cloud API.
//!
//! [`YoLinkClient`] wraps one `reqwest::Client` (reused for connection
//! pooling) and exposes the two read operations the MCP tools need:
//! [`list_devices`](YoLinkClient::list_devices) and
//! [`get_device_status`](YoLinkClient::get_device_status).
//!
//! ## Authentication
//!
//! The API uses OAuth client credentials. An access token is fetched lazily
//! on the first call and cached with its expiry; every API call goes through
//! [`authenticate`](YoLinkClient::authenticate), which only hits the token
//! endpoint when the cached token is missing or expired.
//!
//! The cache is a plain field behind `&mut self`. The server handles one
//! request at a time, so there is exactly one writer.
//!
//! ## Error handling
//!
//! Nothing is retried. Transport failures, non-2xx statuses, envelope codes
//! other than `"000000"` and undecodable bodies each map to their own
//! [`ClientError`] variant.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use tracing::{debug, error, info, Span};

use crate::config::{Credentials, Endpoints};
use crate::devices::{
    ApiRequest, Device, DeviceList, DeviceState, Envelope, TokenRequest, TokenResponse,
};

/// A bearer token and the instant it stops being valid.
#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_valid(&self) -> bool {
        !self.value.is_empty() && Instant::now() < self.expires_at
    }
}

/// Client for a single YoLink account.
pub struct YoLinkClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    credentials: Credentials,
    token: Option<AccessToken>,
    log: Span,
}

impl YoLinkClient {
    /// Build a client. Fails only if the TLS backend cannot be initialized.
    pub fn new(
        credentials: Credentials,
        endpoints: Endpoints,
        log: Span,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10).min(endpoints.timeout))
            .timeout(endpoints.timeout)
            .build()
            .map_err(ClientError::Request)?;

        info!(
            parent: &log,
            client_id_len = credentials.client_id.len(),
            client_secret_len = credentials.client_secret.len(),
            api_url = %endpoints.api_url,
            "YoLink client created"
        );

        Ok(Self {
            http,
            endpoints,
            credentials,
            token: None,
            log,
        })
    }

    /// Ensure a valid access token is cached, fetching one if needed.
    ///
    /// Calling this while the cached token is still valid performs no I/O.
    pub async fn authenticate(&mut self) -> Result<(), ClientError> {
        if self.token.as_ref().is_some_and(AccessToken::is_valid) {
            return Ok(());
        }

        info!(parent: &self.log, "Authenticating with YoLink API");

        let body = TokenRequest::client_credentials(
            &self.credentials.client_id,
            &self.credentials.client_secret,
        );
        let resp = self
            .http
            .post(&self.endpoints.token_url)
            .json(&body)
            .send()
            .await
            .map_err(ClientError::Request)?;

        let status = resp.status();
        let text = resp.text().await.map_err(ClientError::Request)?;
        if !status.is_success() {
            error!(
                parent: &self.log,
                status_code = status.as_u16(),
                response_body = %text,
                "Authentication failed"
            );
            return Err(ClientError::Auth {
                status: status.as_u16(),
                body: text,
            });
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("auth response: {e}")))?;

        debug!(parent: &self.log, code = ?token.code, message = ?token.message, "Token response");
        self.token = Some(AccessToken {
            value: token.access_token,
            expires_at: expiry_after(token.expires_in),
        });

        info!(
            parent: &self.log,
            expires_in = token.expires_in,
            token_type = token.token_type.as_deref().unwrap_or("unknown"),
            "Successfully authenticated with YoLink API"
        );
        Ok(())
    }

    /// `Home.getDeviceList` — every device registered to the account.
    pub async fn list_devices(&mut self) -> Result<Vec<Device>, ClientError> {
        info!(parent: &self.log, "Fetching device list from YoLink API");

        let envelope: Envelope<DeviceList> =
            self.call(&ApiRequest::device_list(unix_timestamp())).await?;
        if !envelope.is_success() {
            return Err(ClientError::Api {
                code: envelope.code.clone(),
                message: envelope.error_message(),
            });
        }

        let devices = envelope.data.unwrap_or_default().devices;
        info!(parent: &self.log, count = devices.len(), "Fetched devices");
        Ok(devices)
    }

    /// `<DeviceType>.getState` for one device.
    ///
    /// The device list is fetched first to find the device's type and
    /// per-device token; nothing is cached between calls.
    pub async fn get_device_status(&mut self, device_id: &str) -> Result<DeviceState, ClientError> {
        info!(parent: &self.log, device_id, "Fetching device status");

        let devices = self.list_devices().await?;
        let Some(device) = devices
            .into_iter()
            .find(|d| d.device_id == device_id)
            .filter(Device::has_token)
        else {
            return Err(ClientError::DeviceNotFound(device_id.to_string()));
        };

        let envelope: Envelope<DeviceState> = self
            .call(&ApiRequest::device_state(&device, unix_timestamp()))
            .await?;
        if !envelope.is_success() {
            return Err(ClientError::Api {
                code: envelope.code.clone(),
                message: envelope.error_message(),
            });
        }

        info!(parent: &self.log, device_id, "Fetched device status");
        Ok(envelope.data.unwrap_or_default())
    }

    /// Authenticate, POST `body` to the API endpoint and decode the envelope.
    async fn call<T: DeserializeOwned>(
        &mut self,
        body: &ApiRequest<'_>,
    ) -> Result<Envelope<T>, ClientError> {
        self.authenticate().await?;
        let token = self.token.as_ref().map(|t| t.value.as_str()).unwrap_or_default();

        let resp = self
            .http
            .post(&self.endpoints.api_url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(ClientError::Request)?;

        let status = resp.status();
        let text = resp.text().await.map_err(ClientError::Request)?;
        if !status.is_success() {
            error!(
                parent: &self.log,
                status_code = status.as_u16(),
                method = %body.method,
                response_body = %text,
                "API request failed"
            );
            return Err(ClientError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("{} response: {e}", body.method)))?;
        debug!(
            parent: &self.log,
            method = envelope.method.as_deref().unwrap_or(&body.method),
            code = %envelope.code,
            msgid = envelope.msgid,
            time = envelope.time,
            "API response"
        );
        Ok(envelope)
    }

    #[cfg(test)]
    fn expire_token(&mut self) {
        if let Some(token) = self.token.as_mut() {
            token.expires_at = Instant::now();
        }
    }
}

/// `now + lifetime`, saturating to one year for absurd lifetimes.
fn expiry_after(lifetime_secs: u64) -> Instant {
    let now = Instant::now();
    now.checked_add(Duration::from_secs(lifetime_secs))
        .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 3600))
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Errors returned by [`YoLinkClient`] methods.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The token endpoint returned a non-2xx status.
    #[error("Authentication failed (HTTP {status}): {body}")]
    Auth { status: u16, body: String },
    /// HTTP transport error (connection refused, timeout, DNS failure, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),
    /// The API endpoint returned a non-2xx status.
    #[error("API request failed (HTTP {status}): {body}")]
    Http { status: u16, body: String },
    /// The envelope carried a code other than `"000000"`.
    #[error("API error: {code} - {message}")]
    Api { code: String, message: String },
    /// A response body did not match the expected shape.
    #[error("Failed to decode {0}")]
    Decode(String),
    #[error("Device {0} not found or device token not available")]
    DeviceNotFound(String),
}
